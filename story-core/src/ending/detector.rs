//! Stage one: has the story concluded?

use crate::state::GameState;
use crate::story::StoryLength;

/// Phrases that mark narrative closure (matched case-insensitively).
pub const ENDING_KEYWORDS: [&str; 10] = [
    "the end",
    "finally",
    "at last",
    "years later",
    "epilogue",
    "concluded",
    "finished",
    "completed",
    "resolution",
    "farewell",
];

/// Flag fragments that mark a resolved plot thread.
pub const RESOLUTION_MARKERS: [&str; 6] = ["resolved", "concluded", "ended", "complete", "defeated", "solved"];

/// Detector verdict for a narrative step.
///
/// True if the text carries a closure keyword, or if the story is deep enough
/// (act 3, or act 2 for quick stories) and a resolution flag is set. Either
/// branch alone suffices.
pub fn detect_ending(story_text: &str, state: &GameState, length: StoryLength) -> bool {
    let text = story_text.to_lowercase();
    let keyword_hit = ENDING_KEYWORDS.iter().any(|k| text.contains(k));

    let min_act = match length {
        StoryLength::Quick => 2,
        _ => 3,
    };
    let resolved = state.act >= min_act && state.any_flag_containing(&RESOLUTION_MARKERS);

    tracing::debug!(keyword_hit, resolved, act = state.act, "ending detector");
    keyword_hit || resolved
}

/// The independent signals that can end a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndingDecision {
    /// The keyword/flag detector fired.
    pub detector_says_ending: bool,
    /// The narrator marked its segment as the ending.
    pub narrator_says_ending: bool,
    /// The new step reaches the length ceiling.
    pub step_limit_reached: bool,
}

impl EndingDecision {
    /// Gather every signal for the step about to be created.
    pub fn evaluate(
        story_text: &str,
        state: &GameState,
        length: StoryLength,
        narrator_says_ending: bool,
        next_step_number: u32,
    ) -> Self {
        Self {
            detector_says_ending: detect_ending(story_text, state, length),
            narrator_says_ending,
            step_limit_reached: next_step_number >= length.max_steps(),
        }
    }

    /// Any signal is enough.
    pub fn is_ending(&self) -> bool {
        self.detector_says_ending || self.narrator_says_ending || self.step_limit_reached
    }
}
