//! Choice statistics: how often each option is shown and picked.
//!
//! Counters are keyed by the step's representative slug, the option id and
//! the genre. From the orchestrator's side every call is fire-and-forget.

use crate::choice::ChoiceId;
use crate::story::Genre;
use async_trait::async_trait;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors from the statistics backend.
#[derive(Debug, Error)]
pub enum StatisticsError {
    #[error("Statistics unavailable: {0}")]
    Unavailable(String),
}

/// Counter key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChoiceKey {
    pub slug: String,
    pub option: ChoiceId,
    pub genre: Genre,
}

impl ChoiceKey {
    pub fn new(slug: impl Into<String>, option: ChoiceId, genre: Genre) -> Self {
        Self {
            slug: slug.into(),
            option,
            genre,
        }
    }
}

/// Impression/selection counts for one option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ChoiceCounts {
    pub impressions: u64,
    pub selections: u64,
}

/// Share of players who picked an option at a decision point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionShare {
    pub option: ChoiceId,
    pub selections: u64,
    /// 0.0 to 100.0.
    pub percentage: f64,
}

/// Receives impression and selection increments.
#[async_trait]
pub trait ChoiceStatistics: Send + Sync {
    async fn record_impression(&self, key: &ChoiceKey) -> Result<(), StatisticsError>;
    async fn record_selection(&self, key: &ChoiceKey) -> Result<(), StatisticsError>;
}

/// In-memory counters.
#[derive(Debug, Default)]
pub struct MemoryChoiceStatistics {
    counts: RwLock<HashMap<ChoiceKey, ChoiceCounts>>,
}

impl MemoryChoiceStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Counts for a single option.
    pub async fn counts(&self, key: &ChoiceKey) -> ChoiceCounts {
        self.counts.read().await.get(key).copied().unwrap_or_default()
    }

    /// Selection shares for every option seen under a slug and genre,
    /// ordered by option id. Percentages are of total selections.
    pub async fn selection_shares(&self, slug: &str, genre: Genre) -> Vec<OptionShare> {
        let counts = self.counts.read().await;
        let mut options: Vec<(ChoiceId, u64)> = counts
            .iter()
            .filter(|(k, _)| k.slug == slug && k.genre == genre)
            .map(|(k, c)| (k.option, c.selections))
            .collect();
        options.sort_by_key(|(id, _)| *id);

        let total: u64 = options.iter().map(|(_, s)| s).sum();
        options
            .into_iter()
            .map(|(option, selections)| OptionShare {
                option,
                selections,
                percentage: if total == 0 {
                    0.0
                } else {
                    selections as f64 * 100.0 / total as f64
                },
            })
            .collect()
    }
}

#[async_trait]
impl ChoiceStatistics for MemoryChoiceStatistics {
    async fn record_impression(&self, key: &ChoiceKey) -> Result<(), StatisticsError> {
        self.counts.write().await.entry(key.clone()).or_default().impressions += 1;
        Ok(())
    }

    async fn record_selection(&self, key: &ChoiceKey) -> Result<(), StatisticsError> {
        self.counts.write().await.entry(key.clone()).or_default().selections += 1;
        Ok(())
    }
}
