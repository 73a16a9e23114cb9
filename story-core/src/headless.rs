//! Headless story interface for programmatic play.
//!
//! Useful for:
//! - Automated runs against the real narrator
//! - Scripts and agents that pick choices themselves
//!
//! # Example
//!
//! ```ignore
//! use story_core::headless::HeadlessStory;
//! use story_core::{Genre, StoryConfig, StoryLength, StoryRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let request = StoryRequest::new(Genre::Mystery, StoryLength::Quick);
//!     let mut story = HeadlessStory::from_env(request, StoryConfig::from_env()).await?;
//!
//!     println!("{}", story.current_step().story_text);
//!     let finished = story.play_to_end(|step| step.choices[0].id).await?;
//!
//!     if let Some(ending) = &finished.run.ending {
//!         println!("{} ({})", ending.title, ending.rarity);
//!     }
//!     Ok(())
//! }
//! ```

use crate::choice::ChoiceId;
use crate::config::StoryConfig;
use crate::error::StoryError;
use crate::flow::{StoryFlow, StorySession};
use crate::narrator::{ClaudeNarrator, NarrativeGenerator};
use crate::profile::PersonalityProfile;
use crate::store::MemoryStore;
use crate::story::{StoryRequest, StoryRun, StoryStep};
use std::sync::Arc;

/// A story run driven from code.
pub struct HeadlessStory {
    flow: StoryFlow,
    session: StorySession,
    transcript: Vec<String>,
}

impl HeadlessStory {
    /// Start a run with the Claude narrator and an in-memory store.
    ///
    /// Requires `ANTHROPIC_API_KEY` environment variable to be set.
    pub async fn from_env(request: StoryRequest, config: StoryConfig) -> Result<Self, StoryError> {
        let narrator = ClaudeNarrator::from_env()
            .map_err(StoryError::narrative("Failed to configure narrator"))?
            .with_config(config.narrator_config());
        let flow = StoryFlow::new(Arc::new(narrator), Arc::new(MemoryStore::new())).with_config(&config);
        Self::start(flow, request).await
    }

    /// Start a run with any narrator and an in-memory store.
    pub async fn new(narrator: Arc<dyn NarrativeGenerator>, request: StoryRequest) -> Result<Self, StoryError> {
        Self::start(StoryFlow::new(narrator, Arc::new(MemoryStore::new())), request).await
    }

    /// Start a run on a preconfigured flow.
    pub async fn start(flow: StoryFlow, request: StoryRequest) -> Result<Self, StoryError> {
        let session = flow.create_story_session(request).await?;
        let transcript = vec![session.step.story_text.clone()];
        Ok(Self {
            flow,
            session,
            transcript,
        })
    }

    /// Pick a choice at the current step.
    pub async fn choose(&mut self, choice: ChoiceId) -> Result<&StorySession, StoryError> {
        let next = self.flow.select_choice(self.session.step.id, choice, None).await?;
        if next.step.id != self.session.step.id {
            self.transcript.push(next.step.story_text.clone());
        }
        self.session = next;
        Ok(&self.session)
    }

    /// Keep choosing with `pick` until the run ends.
    pub async fn play_to_end<F>(&mut self, mut pick: F) -> Result<&StorySession, StoryError>
    where
        F: FnMut(&StoryStep) -> ChoiceId,
    {
        // The step ceiling ends every run, so this bounds the loop.
        let max_turns = self.session.run.max_steps();
        for _ in 0..max_turns {
            if self.is_complete() || self.session.step.choices.is_empty() {
                break;
            }
            let choice = pick(&self.session.step);
            self.choose(choice).await?;
        }
        Ok(&self.session)
    }

    pub fn session(&self) -> &StorySession {
        &self.session
    }

    pub fn run(&self) -> &StoryRun {
        &self.session.run
    }

    pub fn current_step(&self) -> &StoryStep {
        &self.session.step
    }

    pub fn is_complete(&self) -> bool {
        self.session.is_complete()
    }

    /// Story text of every step so far, in order.
    pub fn transcript(&self) -> &[String] {
        &self.transcript
    }

    /// Personality profile at the current step.
    pub fn profile(&self) -> PersonalityProfile {
        PersonalityProfile::from_traits(&self.session.step.personality_traits)
    }

    pub fn flow(&self) -> &StoryFlow {
        &self.flow
    }
}
