//! Stage two: what kind of ending is it?

use super::templates::templates_for;
use super::{EndingCategory, EndingClassification, Rarity};
use crate::state::GameState;
use crate::story::Genre;
use rand::seq::SliceRandom;
use rand::Rng;

const POSITIVE_WORDS: [&str; 10] = [
    "victory", "triumph", "success", "saved", "won", "celebrate", "hero", "peace", "rescued", "glory",
];

const NEGATIVE_WORDS: [&str; 10] = [
    "defeat", "death", "died", "tragedy", "lost", "fallen", "ruin", "despair", "doom", "mourn",
];

const MYSTERIOUS_WORDS: [&str; 10] = [
    "mystery", "vanished", "enigma", "unknown", "riddle", "unexplained", "disappeared", "strange",
    "shadow", "whisper",
];

const RARE_FLAG_MARKERS: [&str; 3] = ["rare", "secret", "hidden"];

/// Relationship score above which a bond counts as strong.
const STRONG_BOND: i32 = 80;

/// Relationship score below which a bond counts as weak.
const WEAK_BOND: i32 = 20;

/// Keyword frequencies over the lowercased narrative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OutcomeScores {
    pub positive: usize,
    pub negative: usize,
    pub mysterious: usize,
}

impl OutcomeScores {
    /// Count keyword occurrences in `text`.
    pub fn score(text: &str) -> Self {
        let text = text.to_lowercase();
        let count = |words: &[&str]| -> usize { words.iter().map(|w| text.matches(w).count()).sum() };
        Self {
            positive: count(&POSITIVE_WORDS),
            negative: count(&NEGATIVE_WORDS),
            mysterious: count(&MYSTERIOUS_WORDS),
        }
    }
}

fn strong_bonds(state: &GameState) -> usize {
    state.relationships.values().filter(|v| **v > STRONG_BOND).count()
}

fn weak_bonds(state: &GameState) -> usize {
    state.relationships.values().filter(|v| **v < WEAK_BOND).count()
}

/// Pick the ending category from narrative tone and player state.
pub fn classify_category(scores: OutcomeScores, state: &GameState, genre: Genre) -> EndingCategory {
    if scores.positive > scores.negative && scores.positive > scores.mysterious {
        if state.personality_traits.leadership > 70 && strong_bonds(state) > 2 {
            EndingCategory::Triumphant
        } else {
            EndingCategory::Heroic
        }
    } else if scores.negative > scores.positive {
        EndingCategory::Tragic
    } else if scores.mysterious > 0 || genre == Genre::Mystery {
        EndingCategory::Mysterious
    } else {
        EndingCategory::Bittersweet
    }
}

/// Pick the rarity tier. Independent of category.
pub fn classify_rarity(state: &GameState) -> Rarity {
    let rare_flags = state.count_flags_containing(&RARE_FLAG_MARKERS);
    let strong = strong_bonds(state);
    let weak = weak_bonds(state);
    let traits = &state.personality_traits;

    if rare_flags > 2 || (traits.risk_taking > 70 && traits.creativity > 70 && strong > 3) {
        Rarity::UltraRare
    } else if rare_flags > 0 || strong > 2 || weak > 2 {
        Rarity::Rare
    } else if state.relationships.len() > 3 || traits.iter().any(|(_, v)| v > 80) {
        Rarity::Uncommon
    } else {
        Rarity::Common
    }
}

/// Deterministic `{genre}_{condition}` tag.
pub fn ending_tag(state: &GameState, genre: Genre) -> String {
    let condition = if state.any_flag_containing(&["sacrifice"]) {
        "noble_sacrifice".to_string()
    } else if state.any_flag_containing(&["betray"]) {
        "betrayed_trust".to_string()
    } else if state.any_flag_containing(&["alliance"]) {
        "united_front".to_string()
    } else if state.any_flag_containing(&["secret"]) {
        "hidden_truth".to_string()
    } else {
        format!("{}_path", state.personality_traits.dominant().slug())
    };
    format!("{}_{}", genre.as_str(), condition)
}

/// Classify using the thread RNG for the title pick.
pub fn classify_ending(story_text: &str, state: &GameState, genre: Genre) -> EndingClassification {
    classify_ending_with_rng(story_text, state, genre, &mut rand::thread_rng())
}

/// Classify with a caller-supplied RNG, making titles reproducible.
pub fn classify_ending_with_rng<R: Rng + ?Sized>(
    story_text: &str,
    state: &GameState,
    genre: Genre,
    rng: &mut R,
) -> EndingClassification {
    let scores = OutcomeScores::score(story_text);
    let category = classify_category(scores, state, genre);
    let rarity = classify_rarity(state);
    let ending_tag = ending_tag(state, genre);

    let options = templates_for(genre, category);
    let (title, description) = match options.choose(rng) {
        Some(t) => (t.title.to_string(), t.description.to_string()),
        None => (
            "The Story Ends".to_string(),
            "Your journey has reached its close.".to_string(),
        ),
    };

    tracing::debug!(?scores, ?category, %rarity, tag = %ending_tag, "ending classified");

    EndingClassification {
        ending_tag,
        title,
        description,
        rarity,
        category,
    }
}
