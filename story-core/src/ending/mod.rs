//! Ending detection and classification.
//!
//! Runs once per generated step. Detection decides whether the narrative has
//! concluded; classification then assigns a category, a rarity tier, a
//! deterministic ending tag, and a title/description from the template table.
//!
//! Category, rarity and tag are pure functions of their inputs. Only the
//! title/description pick is random, and it goes through an injectable RNG.

mod classifier;
mod detector;
mod templates;

pub use classifier::{
    classify_category, classify_ending, classify_ending_with_rng, classify_rarity,
    ending_tag, OutcomeScores,
};
pub use detector::{detect_ending, EndingDecision, ENDING_KEYWORDS, RESOLUTION_MARKERS};
pub use templates::{templates_for, EndingTemplate};

use serde::{Deserialize, Serialize};

/// Tone of an ending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EndingCategory {
    Heroic,
    Tragic,
    Mysterious,
    Triumphant,
    Bittersweet,
}

impl EndingCategory {
    pub fn name(&self) -> &'static str {
        match self {
            EndingCategory::Heroic => "heroic",
            EndingCategory::Tragic => "tragic",
            EndingCategory::Mysterious => "mysterious",
            EndingCategory::Triumphant => "triumphant",
            EndingCategory::Bittersweet => "bittersweet",
        }
    }
}

/// How unusual an ending is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rarity {
    Common,
    Uncommon,
    Rare,
    UltraRare,
}

impl Rarity {
    pub fn name(&self) -> &'static str {
        match self {
            Rarity::Common => "common",
            Rarity::Uncommon => "uncommon",
            Rarity::Rare => "rare",
            Rarity::UltraRare => "ultra-rare",
        }
    }
}

impl std::fmt::Display for Rarity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Result of classifying a detected ending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndingClassification {
    pub ending_tag: String,
    pub title: String,
    pub description: String,
    pub rarity: Rarity,
    pub category: EndingCategory,
}
