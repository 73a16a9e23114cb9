//! Story runs, steps, and the settings that shape them.

use crate::choice::{Choice, ChoiceId};
use crate::ending::{EndingCategory, EndingClassification, Rarity};
use crate::ids::{generate_decision_key_hash, generate_step_choice_slug};
use crate::state::{GameState, PersonalityTraits};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Unique identifier for a story run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(Uuid);

impl RunId {
    /// Create a new unique run ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a story step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StepId(Uuid);

impl StepId {
    /// Create a new unique step ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for StepId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for StepId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Error for unrecognized setting names.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown {kind}: '{value}'")]
pub struct UnknownSetting {
    pub kind: &'static str,
    pub value: String,
}

/// Story genre.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Genre {
    Fantasy,
    #[serde(alias = "sci-fi")]
    Scifi,
    Mystery,
    Horror,
    Romance,
}

impl Genre {
    pub const ALL: [Genre; 5] = [
        Genre::Fantasy,
        Genre::Scifi,
        Genre::Mystery,
        Genre::Horror,
        Genre::Romance,
    ];

    /// Lowercase name, used as the prefix of ending tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Genre::Fantasy => "fantasy",
            Genre::Scifi => "scifi",
            Genre::Mystery => "mystery",
            Genre::Horror => "horror",
            Genre::Romance => "romance",
        }
    }
}

impl std::fmt::Display for Genre {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fantasy" => Ok(Genre::Fantasy),
            "scifi" | "sci-fi" | "sci_fi" => Ok(Genre::Scifi),
            "mystery" => Ok(Genre::Mystery),
            "horror" => Ok(Genre::Horror),
            "romance" => Ok(Genre::Romance),
            _ => Err(UnknownSetting {
                kind: "genre",
                value: s.to_string(),
            }),
        }
    }
}

/// How long a run may last.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoryLength {
    Quick,
    #[default]
    Medium,
    Standard,
}

impl StoryLength {
    /// Step ceiling: reaching it ends the run regardless of the detector.
    pub fn max_steps(&self) -> u32 {
        match self {
            StoryLength::Quick => 6,
            StoryLength::Standard => 10,
            StoryLength::Medium => 8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StoryLength::Quick => "quick",
            StoryLength::Medium => "medium",
            StoryLength::Standard => "standard",
        }
    }
}

impl FromStr for StoryLength {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "quick" => Ok(StoryLength::Quick),
            "medium" => Ok(StoryLength::Medium),
            "standard" => Ok(StoryLength::Standard),
            _ => Err(UnknownSetting {
                kind: "story length",
                value: s.to_string(),
            }),
        }
    }
}

/// Difficulty passed through to the narrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Challenge {
    Easy,
    #[default]
    Normal,
    Hard,
}

impl Challenge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Challenge::Easy => "easy",
            Challenge::Normal => "normal",
            Challenge::Hard => "hard",
        }
    }
}

impl FromStr for Challenge {
    type Err = UnknownSetting;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "easy" => Ok(Challenge::Easy),
            "normal" => Ok(Challenge::Normal),
            "hard" => Ok(Challenge::Hard),
            _ => Err(UnknownSetting {
                kind: "challenge",
                value: s.to_string(),
            }),
        }
    }
}

/// Everything needed to start a new run.
#[derive(Debug, Clone)]
pub struct StoryRequest {
    pub genre: Genre,
    pub length: StoryLength,
    pub challenge: Challenge,
    /// Client session identifier, passed through to the narrator.
    pub session_id: String,
    /// Owning user, if signed in.
    pub user_id: Option<String>,
    /// Starting traits. The narrator's opening state may override these.
    pub initial_traits: Option<PersonalityTraits>,
}

impl StoryRequest {
    /// Create a request for an anonymous player.
    pub fn new(genre: Genre, length: StoryLength) -> Self {
        Self {
            genre,
            length,
            challenge: Challenge::default(),
            session_id: Uuid::new_v4().to_string(),
            user_id: None,
            initial_traits: None,
        }
    }

    pub fn with_challenge(mut self, challenge: Challenge) -> Self {
        self.challenge = challenge;
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = session_id.into();
        self
    }

    pub fn with_initial_traits(mut self, traits: PersonalityTraits) -> Self {
        self.initial_traits = Some(traits);
        self
    }
}

/// The ending written onto a completed run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEnding {
    pub title: String,
    pub description: String,
    pub tag: String,
    pub rarity: Rarity,
    pub category: EndingCategory,
}

impl From<&EndingClassification> for RunEnding {
    fn from(c: &EndingClassification) -> Self {
        Self {
            title: c.title.clone(),
            description: c.description.clone(),
            tag: c.ending_tag.clone(),
            rarity: c.rarity,
            category: c.category,
        }
    }
}

/// One full playthrough.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryRun {
    pub id: RunId,
    pub genre: Genre,
    pub length: StoryLength,
    pub challenge: Challenge,
    /// Client session the run was started from.
    pub session_id: String,
    pub user_id: Option<String>,
    pub completed: bool,
    /// Present once `completed` is set.
    pub ending: Option<RunEnding>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl StoryRun {
    /// A fresh, active run for the given request.
    pub fn new(request: &StoryRequest) -> Self {
        Self {
            id: RunId::new(),
            genre: request.genre,
            length: request.length,
            challenge: request.challenge,
            session_id: request.session_id.clone(),
            user_id: request.user_id.clone(),
            completed: false,
            ending: None,
            created_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Mark the run completed with its ending.
    pub fn complete(&mut self, ending: RunEnding) {
        self.completed = true;
        self.ending = Some(ending);
        self.completed_at = Some(Utc::now());
    }

    /// Step ceiling for this run.
    pub fn max_steps(&self) -> u32 {
        self.length.max_steps()
    }
}

/// One narrative beat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryStep {
    pub id: StepId,
    pub run_id: RunId,
    /// 1-based, strictly increasing within a run.
    pub step_number: u32,
    pub story_text: String,
    /// Empty when this step is an ending.
    pub choices: Vec<Choice>,
    /// State after this step's setup.
    pub game_state: GameState,
    pub personality_traits: PersonalityTraits,
    /// Representative slug of the choice set.
    pub choice_slug: String,
    /// Decision key hash of the choice set.
    pub decision_key: String,
    pub selected_choice: Option<ChoiceId>,
    pub created_at: DateTime<Utc>,
}

impl StoryStep {
    /// Build a step, deriving its slug and decision key.
    pub fn new(
        run_id: RunId,
        step_number: u32,
        story_text: impl Into<String>,
        choices: Vec<Choice>,
        game_state: GameState,
    ) -> Self {
        let choice_slug = generate_step_choice_slug(&choices);
        let decision_key = generate_decision_key_hash(&run_id.to_string(), step_number, &choices);
        Self {
            id: StepId::new(),
            run_id,
            step_number,
            story_text: story_text.into(),
            personality_traits: game_state.personality_traits,
            choices,
            game_state,
            choice_slug,
            decision_key,
            selected_choice: None,
            created_at: Utc::now(),
        }
    }

    /// Find an offered choice by id.
    pub fn find_choice(&self, id: ChoiceId) -> Option<&Choice> {
        self.choices.iter().find(|c| c.id == id)
    }

    /// Whether this step ends the story.
    pub fn is_ending(&self) -> bool {
        self.choices.is_empty()
    }
}
