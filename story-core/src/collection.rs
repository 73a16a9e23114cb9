//! Endings collection: which endings each player has discovered.

use crate::ending::Rarity;
use crate::story::{Genre, RunId};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from the endings collection.
#[derive(Debug, Error)]
pub enum CollectionError {
    #[error("Collection unavailable: {0}")]
    Unavailable(String),

    #[error("Discovery rejected: {0}")]
    Rejected(String),
}

/// One ending a user has reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingDiscovery {
    pub user_id: String,
    /// The run that first reached this ending.
    pub story_run_id: RunId,
    pub ending_tag: String,
    pub title: String,
    pub rarity: Rarity,
    pub genre: Genre,
    pub first_discovered_at: DateTime<Utc>,
    pub times_reached: u32,
}

/// What recording a discovery changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiscoveryOutcome {
    /// First time this user reached this ending tag.
    pub is_new: bool,
    pub times_reached: u32,
}

/// Details of a newly reached ending.
#[derive(Debug, Clone)]
pub struct NewDiscovery<'a> {
    pub user_id: &'a str,
    pub story_run_id: RunId,
    pub ending_tag: &'a str,
    pub title: &'a str,
    pub rarity: Rarity,
    pub genre: Genre,
}

/// Records ending discoveries.
#[async_trait]
pub trait EndingCollection: Send + Sync {
    async fn record_discovery(&self, discovery: NewDiscovery<'_>) -> Result<DiscoveryOutcome, CollectionError>;
}

/// In-memory endings collection, deduplicated by (user, tag).
#[derive(Debug, Default)]
pub struct MemoryEndingCollection {
    by_user: RwLock<HashMap<String, Vec<EndingDiscovery>>>,
}

impl MemoryEndingCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// All endings a user has found, in discovery order.
    pub async fn discoveries(&self, user_id: &str) -> Vec<EndingDiscovery> {
        self.by_user
            .read()
            .await
            .get(user_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Distinct endings found per rarity tier.
    pub async fn rarity_counts(&self, user_id: &str) -> HashMap<Rarity, usize> {
        let mut counts = HashMap::new();
        for discovery in self.discoveries(user_id).await {
            *counts.entry(discovery.rarity).or_insert(0) += 1;
        }
        counts
    }
}

#[async_trait]
impl EndingCollection for MemoryEndingCollection {
    async fn record_discovery(&self, discovery: NewDiscovery<'_>) -> Result<DiscoveryOutcome, CollectionError> {
        if discovery.ending_tag.is_empty() {
            return Err(CollectionError::Rejected("empty ending tag".to_string()));
        }

        let mut by_user = self.by_user.write().await;
        let entries = by_user.entry(discovery.user_id.to_string()).or_default();

        if let Some(existing) = entries.iter_mut().find(|d| d.ending_tag == discovery.ending_tag) {
            existing.times_reached += 1;
            return Ok(DiscoveryOutcome {
                is_new: false,
                times_reached: existing.times_reached,
            });
        }

        entries.push(EndingDiscovery {
            user_id: discovery.user_id.to_string(),
            story_run_id: discovery.story_run_id,
            ending_tag: discovery.ending_tag.to_string(),
            title: discovery.title.to_string(),
            rarity: discovery.rarity,
            genre: discovery.genre,
            first_discovered_at: Utc::now(),
            times_reached: 1,
        });
        Ok(DiscoveryOutcome {
            is_new: true,
            times_reached: 1,
        })
    }
}
