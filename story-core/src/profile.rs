//! Personality profile derived from the trait vector at the end of a run.

use crate::state::{PersonalityTraits, Trait};
use serde::{Deserialize, Serialize};

/// Traits at or above this value are listed as strong.
pub const STRONG_TRAIT_THRESHOLD: i32 = 65;

/// Traits at or below this value are listed as weak.
pub const WEAK_TRAIT_THRESHOLD: i32 = 35;

/// Maximum spread between axes for a profile to count as balanced.
pub const BALANCED_SPREAD: i32 = 10;

/// Label used when no axis stands out.
pub const BALANCED_ARCHETYPE: &str = "Balanced Soul";

/// A single axis and its value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraitScore {
    #[serde(rename = "trait")]
    pub axis: Trait,
    pub score: i32,
}

/// Summary of a player's personality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonalityProfile {
    pub dominant: Trait,
    pub archetype: String,
    pub balanced: bool,
    /// Highest first.
    pub strong: Vec<TraitScore>,
    /// Lowest first.
    pub weak: Vec<TraitScore>,
    pub traits: PersonalityTraits,
}

impl PersonalityProfile {
    pub fn from_traits(traits: &PersonalityTraits) -> Self {
        let traits = traits.clamped();
        let dominant = traits.dominant();

        let (min, max) = traits
            .iter()
            .fold((i32::MAX, i32::MIN), |(lo, hi), (_, v)| (lo.min(v), hi.max(v)));
        let balanced = max - min <= BALANCED_SPREAD;

        let mut strong: Vec<TraitScore> = traits
            .iter()
            .filter(|(_, v)| *v >= STRONG_TRAIT_THRESHOLD)
            .map(|(axis, score)| TraitScore { axis, score })
            .collect();
        strong.sort_by(|a, b| b.score.cmp(&a.score));

        let mut weak: Vec<TraitScore> = traits
            .iter()
            .filter(|(_, v)| *v <= WEAK_TRAIT_THRESHOLD)
            .map(|(axis, score)| TraitScore { axis, score })
            .collect();
        weak.sort_by_key(|t| t.score);

        let archetype = if balanced {
            BALANCED_ARCHETYPE.to_string()
        } else {
            archetype_for(dominant).to_string()
        };

        Self {
            dominant,
            archetype,
            balanced,
            strong,
            weak,
            traits,
        }
    }
}

/// Archetype label for a dominant axis.
pub fn archetype_for(axis: Trait) -> &'static str {
    match axis {
        Trait::RiskTaking => "The Daredevil",
        Trait::Empathy => "The Guardian",
        Trait::Pragmatism => "The Strategist",
        Trait::Creativity => "The Visionary",
        Trait::Leadership => "The Commander",
    }
}
