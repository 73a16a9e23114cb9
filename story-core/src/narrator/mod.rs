//! Narrative generation.
//!
//! The orchestrator asks a [`NarrativeGenerator`] for each new beat. The
//! shipped implementation is [`ClaudeNarrator`]; tests use
//! [`ScriptedNarrator`](crate::testing::ScriptedNarrator).

mod claude;

pub use claude::{ClaudeNarrator, NarratorConfig};

use crate::choice::Choice;
use crate::state::GameState;
use crate::story::{Challenge, Genre, RunId, StoryLength};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from narrative generation.
#[derive(Debug, Error)]
pub enum NarrativeError {
    #[error("No API key configured - set ANTHROPIC_API_KEY environment variable")]
    NoApiKey,

    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to parse narrative: {0}")]
    Parse(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Narrator unavailable: {0}")]
    Unavailable(String),
}

/// Context handed to the narrator for one beat.
#[derive(Debug, Clone, Serialize)]
pub struct NarrativeRequest {
    pub genre: Genre,
    pub length: StoryLength,
    pub challenge: Challenge,
    pub session_id: String,
    pub user_id: Option<String>,
    /// Present when continuing an existing run.
    pub story_run_id: Option<RunId>,
    /// Number of the step being continued from.
    pub current_step: Option<u32>,
    pub game_state: Option<GameState>,
    /// Text of the choice the player just made.
    pub previous_choice: Option<String>,
}

impl NarrativeRequest {
    /// Whether this request opens a new story.
    pub fn is_opening(&self) -> bool {
        self.story_run_id.is_none()
    }
}

/// One generated beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeSegment {
    pub story_text: String,
    #[serde(default)]
    pub choices: Vec<Choice>,
    /// State proposed by the narrator. Only the opening segment's state is
    /// used, to seed the run.
    #[serde(default)]
    pub game_state: Option<GameState>,
    #[serde(default)]
    pub is_ending: bool,
    #[serde(default)]
    pub ending_type: Option<String>,
}

impl NarrativeSegment {
    /// A segment with text and choices only.
    pub fn new(story_text: impl Into<String>, choices: Vec<Choice>) -> Self {
        Self {
            story_text: story_text.into(),
            choices,
            game_state: None,
            is_ending: false,
            ending_type: None,
        }
    }

    pub fn with_game_state(mut self, state: GameState) -> Self {
        self.game_state = Some(state);
        self
    }

    /// Mark the segment as the narrator's chosen ending.
    pub fn as_ending(mut self, ending_type: Option<String>) -> Self {
        self.is_ending = true;
        self.ending_type = ending_type;
        self
    }
}

/// Source of narrative beats.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Produce the next beat for the given context.
    async fn generate(&self, request: &NarrativeRequest) -> Result<NarrativeSegment, NarrativeError>;
}
