//! Interactive fiction engine with an AI narrator.
//!
//! This crate provides:
//! - A typed game state (flags, relationships, inventory, act, personality)
//! - Consequence directives folded into that state as pure transformations
//! - Ending detection, category/rarity classification and titles
//! - A story flow orchestrator over pluggable narrator and store backends
//! - Retention features: endings collection, choice statistics, profiles
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use story_core::{ClaudeNarrator, ChoiceId, Genre, MemoryStore, StoryFlow, StoryLength, StoryRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let narrator = ClaudeNarrator::from_env()?;
//!     let flow = StoryFlow::new(Arc::new(narrator), Arc::new(MemoryStore::new()));
//!
//!     let request = StoryRequest::new(Genre::Fantasy, StoryLength::Medium).with_user("player-1");
//!     let session = flow.create_story_session(request).await?;
//!     println!("{}", session.step.story_text);
//!
//!     let next = flow.select_choice(session.step.id, ChoiceId::A, None).await?;
//!     println!("{}", next.step.story_text);
//!     Ok(())
//! }
//! ```

pub mod analytics;
pub mod choice;
pub mod collection;
pub mod config;
pub mod consequence;
pub mod ending;
pub mod error;
pub mod flow;
pub mod headless;
pub mod ids;
pub mod narrator;
pub mod profile;
pub mod state;
pub mod statistics;
pub mod store;
pub mod story;
pub mod testing;

// Primary public API
pub use analytics::{Analytics, AnalyticsEvent, NoopAnalytics, TracingAnalytics};
pub use choice::{Choice, ChoiceId};
pub use collection::{EndingCollection, MemoryEndingCollection};
pub use config::StoryConfig;
pub use consequence::{apply_choice, apply_consequence, apply_consequences, Consequence};
pub use ending::{EndingCategory, EndingClassification, Rarity};
pub use error::StoryError;
pub use flow::{StoryFlow, StorySession};
pub use headless::HeadlessStory;
pub use ids::{generate_decision_key_hash, generate_step_choice_slug};
pub use narrator::{ClaudeNarrator, NarrativeError, NarrativeGenerator, NarrativeRequest, NarrativeSegment};
pub use profile::PersonalityProfile;
pub use state::{update_traits, GameState, PersonalityTraits, Trait};
pub use statistics::{ChoiceStatistics, MemoryChoiceStatistics};
pub use store::{JsonFileStore, MemoryStore, StoreError, StoryStore};
pub use story::{Challenge, Genre, RunId, StepId, StoryLength, StoryRequest, StoryRun, StoryStep};
pub use testing::{ScriptedNarrator, TestHarness};
