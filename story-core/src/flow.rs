//! StoryFlow - the orchestrator that drives a run from opening to ending.
//!
//! A run is either active or completed. `create_story_session` opens it with
//! step 1; every `select_choice` on an active run folds the chosen option into
//! the game state, asks the narrator for the next beat, decides whether the
//! story has ended, and persists the new step.
//!
//! Persistence and generation failures are returned with context. Side
//! effects that must not block play (ending discoveries, choice statistics,
//! analytics) are logged and ignored when they fail.

use crate::analytics::{Analytics, AnalyticsEvent, NoopAnalytics};
use crate::choice::{validate_choices, Choice, ChoiceId};
use crate::collection::{EndingCollection, MemoryEndingCollection, NewDiscovery};
use crate::config::StoryConfig;
use crate::consequence::apply_consequences;
use crate::ending::{classify_ending_with_rng, EndingDecision};
use crate::error::StoryError;
use crate::narrator::{NarrativeGenerator, NarrativeRequest};
use crate::profile::PersonalityProfile;
use crate::state::{GameState, PersonalityTraits};
use crate::statistics::{ChoiceKey, ChoiceStatistics, MemoryChoiceStatistics};
use crate::store::StoryStore;
use crate::story::{RunEnding, RunId, StepId, StoryRequest, StoryRun, StoryStep};
use futures::future::join_all;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::{Arc, Mutex};

/// A run together with its current step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorySession {
    pub run: StoryRun,
    pub step: StoryStep,
}

impl StorySession {
    /// Whether the run has reached an ending.
    pub fn is_complete(&self) -> bool {
        self.run.completed
    }

    /// Choices offered at the current step.
    pub fn choices(&self) -> &[Choice] {
        &self.step.choices
    }

    /// Current game state.
    pub fn game_state(&self) -> &GameState {
        &self.step.game_state
    }
}

/// Orchestrates story runs over injected collaborators.
pub struct StoryFlow {
    narrator: Arc<dyn NarrativeGenerator>,
    store: Arc<dyn StoryStore>,
    collection: Arc<dyn EndingCollection>,
    statistics: Arc<dyn ChoiceStatistics>,
    analytics: Arc<dyn Analytics>,
    rng: Mutex<StdRng>,
}

impl StoryFlow {
    /// Create a flow with in-memory side-effect collaborators and no analytics.
    pub fn new(narrator: Arc<dyn NarrativeGenerator>, store: Arc<dyn StoryStore>) -> Self {
        Self {
            narrator,
            store,
            collection: Arc::new(MemoryEndingCollection::new()),
            statistics: Arc::new(MemoryChoiceStatistics::new()),
            analytics: Arc::new(NoopAnalytics),
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Set the endings collection.
    pub fn with_collection(mut self, collection: Arc<dyn EndingCollection>) -> Self {
        self.collection = collection;
        self
    }

    /// Set the choice statistics sink.
    pub fn with_statistics(mut self, statistics: Arc<dyn ChoiceStatistics>) -> Self {
        self.statistics = statistics;
        self
    }

    /// Set the analytics client.
    pub fn with_analytics(mut self, analytics: Arc<dyn Analytics>) -> Self {
        self.analytics = analytics;
        self
    }

    /// Seed the RNG used to pick ending titles.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    /// Apply the flow-level parts of a config.
    pub fn with_config(self, config: &StoryConfig) -> Self {
        match config.seed {
            Some(seed) => self.with_seed(seed),
            None => self,
        }
    }

    /// Start a new run.
    ///
    /// The opening traits come from the narrator's game state when it supplies
    /// one, then from the request, then default to 50 on every axis.
    pub async fn create_story_session(&self, request: StoryRequest) -> Result<StorySession, StoryError> {
        let narrative_request = NarrativeRequest {
            genre: request.genre,
            length: request.length,
            challenge: request.challenge,
            session_id: request.session_id.clone(),
            user_id: request.user_id.clone(),
            story_run_id: None,
            current_step: None,
            game_state: None,
            previous_choice: None,
        };
        let segment = self
            .narrator
            .generate(&narrative_request)
            .await
            .map_err(StoryError::narrative("Failed to create story session"))?;
        validate_choices(&segment.choices)?;

        let game_state = match segment.game_state {
            Some(state) => state.normalized(),
            None => GameState::default().with_traits(request.initial_traits.unwrap_or_default()),
        };

        let run = self
            .store
            .create_run(StoryRun::new(&request))
            .await
            .map_err(StoryError::store("Failed to create story session"))?;
        let step = self
            .store
            .create_step(StoryStep::new(run.id, 1, segment.story_text, segment.choices, game_state))
            .await
            .map_err(StoryError::store("Failed to create story session"))?;

        self.record_impressions(&run, &step).await;
        self.analytics.track(AnalyticsEvent::StoryStarted {
            run_id: run.id,
            genre: run.genre,
            length: run.length,
        });
        tracing::info!(run_id = %run.id, genre = %run.genre, length = run.length.as_str(), "story session created");

        Ok(StorySession { run, step })
    }

    /// Record the player's choice at a step and, if the run is still going,
    /// progress to the next step.
    ///
    /// Only the latest step of a run accepts a selection; an earlier step
    /// fails with [`StoryError::StaleStep`] before anything is recorded. The
    /// choice is looked up by id, then by `slug` if given. A completed run,
    /// or a step already at the length ceiling, returns the current step with
    /// the selection recorded.
    pub async fn select_choice(
        &self,
        step_id: StepId,
        choice_id: ChoiceId,
        slug: Option<&str>,
    ) -> Result<StorySession, StoryError> {
        let mut step = self
            .store
            .get_step(step_id)
            .await
            .map_err(StoryError::store("Failed to load story step"))?
            .ok_or(StoryError::StepNotFound(step_id))?;
        let run = self
            .store
            .get_run(step.run_id)
            .await
            .map_err(StoryError::store("Failed to load story run"))?
            .ok_or(StoryError::RunNotFound(step.run_id))?;

        let latest = self
            .store
            .latest_step(run.id)
            .await
            .map_err(StoryError::store("Failed to load story step"))?
            .ok_or(StoryError::EmptyRun(run.id))?;
        if latest.id != step.id {
            return Err(StoryError::StaleStep {
                step_id,
                step_number: step.step_number,
                latest: latest.step_number,
            });
        }

        let choice = step
            .find_choice(choice_id)
            .or_else(|| slug.and_then(|s| step.choices.iter().find(|c| c.slug == s)))
            .cloned()
            .ok_or_else(|| StoryError::choice_not_found(step_id, choice_id, slug))?;

        self.store
            .record_selection(step.id, choice.id)
            .await
            .map_err(StoryError::store("Failed to record choice selection"))?;
        step.selected_choice = Some(choice.id);

        let key = ChoiceKey::new(step.choice_slug.clone(), choice.id, run.genre);
        if let Err(e) = self.statistics.record_selection(&key).await {
            tracing::warn!(error = %e, slug = %key.slug, "failed to record choice selection statistic");
        }
        self.analytics.track(AnalyticsEvent::ChoiceSelected {
            run_id: run.id,
            step_number: step.step_number,
            choice_id: choice.id,
            slug: choice.slug.clone(),
        });

        let traits = step.personality_traits.updated(&choice.traits_impact);

        if run.completed || step.step_number >= run.max_steps() {
            tracing::debug!(
                run_id = %run.id,
                step = step.step_number,
                completed = run.completed,
                "selection recorded without progressing"
            );
            return Ok(StorySession { run, step });
        }

        self.progress_story(run, &step, &choice, traits).await
    }

    /// Build and persist the step that follows `step` after `choice`.
    ///
    /// Ends the run when the detector, the narrator, or the step ceiling says
    /// so. The ending step carries no choices.
    pub async fn progress_story(
        &self,
        mut run: StoryRun,
        step: &StoryStep,
        choice: &Choice,
        traits: PersonalityTraits,
    ) -> Result<StorySession, StoryError> {
        let report = apply_consequences(&step.game_state, &choice.consequences);
        let game_state = report.state.with_traits(traits);
        let next_number = step.step_number + 1;

        let narrative_request = NarrativeRequest {
            genre: run.genre,
            length: run.length,
            challenge: run.challenge,
            session_id: run.session_id.clone(),
            user_id: run.user_id.clone(),
            story_run_id: Some(run.id),
            current_step: Some(step.step_number),
            game_state: Some(game_state.clone()),
            previous_choice: Some(choice.text.clone()),
        };
        let segment = self
            .narrator
            .generate(&narrative_request)
            .await
            .map_err(StoryError::narrative("Failed to progress story"))?;

        let decision = EndingDecision::evaluate(
            &segment.story_text,
            &game_state,
            run.length,
            segment.is_ending,
            next_number,
        );
        tracing::debug!(
            run_id = %run.id,
            step = next_number,
            detector = decision.detector_says_ending,
            narrator = decision.narrator_says_ending,
            step_limit = decision.step_limit_reached,
            "ending signals"
        );

        if !decision.is_ending() {
            validate_choices(&segment.choices)?;
            let next = self
                .store
                .create_step(StoryStep::new(
                    run.id,
                    next_number,
                    segment.story_text,
                    segment.choices,
                    game_state,
                ))
                .await
                .map_err(StoryError::store("Failed to save story step"))?;
            self.record_impressions(&run, &next).await;
            return Ok(StorySession { run, step: next });
        }

        let classification = {
            let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            classify_ending_with_rng(&segment.story_text, &game_state, run.genre, &mut *rng)
        };

        let next = self
            .store
            .create_step(StoryStep::new(
                run.id,
                next_number,
                segment.story_text,
                Vec::new(),
                game_state,
            ))
            .await
            .map_err(StoryError::store("Failed to save story step"))?;

        run.complete(RunEnding::from(&classification));
        self.store
            .update_run(&run)
            .await
            .map_err(StoryError::store("Failed to complete story run"))?;

        if let Some(user_id) = run.user_id.as_deref() {
            let discovery = NewDiscovery {
                user_id,
                story_run_id: run.id,
                ending_tag: &classification.ending_tag,
                title: &classification.title,
                rarity: classification.rarity,
                genre: run.genre,
            };
            match self.collection.record_discovery(discovery).await {
                Ok(outcome) => tracing::debug!(
                    user_id,
                    ending_tag = %classification.ending_tag,
                    is_new = outcome.is_new,
                    "ending discovery recorded"
                ),
                Err(e) => tracing::warn!(
                    error = %e,
                    user_id,
                    ending_tag = %classification.ending_tag,
                    "failed to record ending discovery"
                ),
            }
        }

        self.analytics.track(AnalyticsEvent::EndingReached {
            run_id: run.id,
            ending_tag: classification.ending_tag.clone(),
            rarity: classification.rarity,
            category: classification.category,
            steps: next_number,
        });
        tracing::info!(
            run_id = %run.id,
            ending_tag = %classification.ending_tag,
            rarity = %classification.rarity,
            category = classification.category.name(),
            steps = next_number,
            "story completed"
        );

        Ok(StorySession { run, step: next })
    }

    /// Load a run and its latest step.
    pub async fn session(&self, run_id: RunId) -> Result<StorySession, StoryError> {
        let run = self
            .store
            .get_run(run_id)
            .await
            .map_err(StoryError::store("Failed to load story session"))?
            .ok_or(StoryError::RunNotFound(run_id))?;
        let step = self
            .store
            .latest_step(run_id)
            .await
            .map_err(StoryError::store("Failed to load story session"))?
            .ok_or(StoryError::EmptyRun(run_id))?;
        Ok(StorySession { run, step })
    }

    /// Every step of a run, in order.
    pub async fn history(&self, run_id: RunId) -> Result<Vec<StoryStep>, StoryError> {
        self.store
            .steps_for_run(run_id)
            .await
            .map_err(StoryError::store("Failed to load story history"))
    }

    /// Personality profile from a run's latest traits.
    pub async fn profile(&self, run_id: RunId) -> Result<PersonalityProfile, StoryError> {
        let session = self.session(run_id).await?;
        Ok(PersonalityProfile::from_traits(&session.step.personality_traits))
    }

    async fn record_impressions(&self, run: &StoryRun, step: &StoryStep) {
        let keys: Vec<ChoiceKey> = step
            .choices
            .iter()
            .map(|choice| ChoiceKey::new(step.choice_slug.clone(), choice.id, run.genre))
            .collect();
        let results = join_all(keys.iter().map(|key| self.statistics.record_impression(key))).await;
        for (key, result) in keys.iter().zip(results) {
            if let Err(e) = result {
                tracing::warn!(error = %e, slug = %key.slug, option = %key.option, "failed to record choice impression");
            }
        }
    }
}
