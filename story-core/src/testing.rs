//! Testing utilities for story runs.
//!
//! This module provides tools for integration testing:
//! - `ScriptedNarrator` for deterministic beats without API calls
//! - `TestHarness` wiring a `StoryFlow` to in-memory collaborators
//! - Failing collaborators for exercising error paths
//! - Assertion helpers for verifying sessions

use crate::analytics::RecordingAnalytics;
use crate::choice::{Choice, ChoiceId};
use crate::collection::{CollectionError, DiscoveryOutcome, EndingCollection, MemoryEndingCollection, NewDiscovery};
use crate::error::StoryError;
use crate::flow::{StoryFlow, StorySession};
use crate::narrator::{NarrativeError, NarrativeGenerator, NarrativeRequest, NarrativeSegment};
use crate::state::Trait;
use crate::statistics::{ChoiceKey, ChoiceStatistics, MemoryChoiceStatistics, StatisticsError};
use crate::store::{MemoryStore, StoreError, StoryStore};
use crate::story::{RunId, StepId, StoryRequest, StoryRun, StoryStep};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Text of the beat returned once the script runs out.
pub const FALLBACK_TEXT: &str = "The path winds onward into the unknown.";

/// Three generic choices with no consequences.
pub fn standard_choices() -> Vec<Choice> {
    vec![
        Choice::new(ChoiceId::A, "Press forward", "press_forward"),
        Choice::new(ChoiceId::B, "Wait and watch", "wait_and_watch"),
        Choice::new(ChoiceId::C, "Turn back", "turn_back"),
    ]
}

/// A beat with the given text and [`standard_choices`].
pub fn beat(text: impl Into<String>) -> NarrativeSegment {
    NarrativeSegment::new(text, standard_choices())
}

/// A narrator that returns scripted segments in order.
///
/// Every request is recorded so tests can check the context it was given.
#[derive(Debug, Default)]
pub struct ScriptedNarrator {
    segments: Mutex<VecDeque<NarrativeSegment>>,
    requests: Mutex<Vec<NarrativeRequest>>,
}

impl ScriptedNarrator {
    pub fn new(segments: Vec<NarrativeSegment>) -> Self {
        Self {
            segments: Mutex::new(segments.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Add a segment to the end of the script.
    pub fn push(&self, segment: NarrativeSegment) {
        lock(&self.segments).push_back(segment);
    }

    /// Requests received so far.
    pub fn requests(&self) -> Vec<NarrativeRequest> {
        lock(&self.requests).clone()
    }

    pub fn request_count(&self) -> usize {
        lock(&self.requests).len()
    }

    /// Segments not yet returned.
    pub fn remaining(&self) -> usize {
        lock(&self.segments).len()
    }
}

#[async_trait]
impl NarrativeGenerator for ScriptedNarrator {
    async fn generate(&self, request: &NarrativeRequest) -> Result<NarrativeSegment, NarrativeError> {
        lock(&self.requests).push(request.clone());
        Ok(lock(&self.segments).pop_front().unwrap_or_else(|| beat(FALLBACK_TEXT)))
    }
}

/// A narrator that always fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingNarrator;

#[async_trait]
impl NarrativeGenerator for FailingNarrator {
    async fn generate(&self, _request: &NarrativeRequest) -> Result<NarrativeSegment, NarrativeError> {
        Err(NarrativeError::Unavailable("scripted failure".to_string()))
    }
}

/// An endings collection that rejects every discovery.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingCollection;

#[async_trait]
impl EndingCollection for FailingCollection {
    async fn record_discovery(&self, _discovery: NewDiscovery<'_>) -> Result<DiscoveryOutcome, CollectionError> {
        Err(CollectionError::Unavailable("scripted failure".to_string()))
    }
}

/// A statistics sink that fails every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStatistics;

#[async_trait]
impl ChoiceStatistics for FailingStatistics {
    async fn record_impression(&self, _key: &ChoiceKey) -> Result<(), StatisticsError> {
        Err(StatisticsError::Unavailable("scripted failure".to_string()))
    }

    async fn record_selection(&self, _key: &ChoiceKey) -> Result<(), StatisticsError> {
        Err(StatisticsError::Unavailable("scripted failure".to_string()))
    }
}

/// A store whose writes fail. Reads return nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingStore;

fn backend_down() -> StoreError {
    StoreError::Backend("connection refused".to_string())
}

#[async_trait]
impl StoryStore for FailingStore {
    async fn create_run(&self, _run: StoryRun) -> Result<StoryRun, StoreError> {
        Err(backend_down())
    }

    async fn get_run(&self, _id: RunId) -> Result<Option<StoryRun>, StoreError> {
        Ok(None)
    }

    async fn update_run(&self, _run: &StoryRun) -> Result<(), StoreError> {
        Err(backend_down())
    }

    async fn create_step(&self, _step: StoryStep) -> Result<StoryStep, StoreError> {
        Err(backend_down())
    }

    async fn get_step(&self, _id: StepId) -> Result<Option<StoryStep>, StoreError> {
        Ok(None)
    }

    async fn latest_step(&self, _run_id: RunId) -> Result<Option<StoryStep>, StoreError> {
        Ok(None)
    }

    async fn steps_for_run(&self, _run_id: RunId) -> Result<Vec<StoryStep>, StoreError> {
        Ok(Vec::new())
    }

    async fn record_selection(&self, _step_id: StepId, _choice: ChoiceId) -> Result<(), StoreError> {
        Err(backend_down())
    }
}

/// Test harness for running story scenarios.
pub struct TestHarness {
    pub flow: StoryFlow,
    pub narrator: Arc<ScriptedNarrator>,
    pub store: Arc<MemoryStore>,
    pub collection: Arc<MemoryEndingCollection>,
    pub statistics: Arc<MemoryChoiceStatistics>,
    pub analytics: Arc<RecordingAnalytics>,
}

impl TestHarness {
    /// A harness with an empty script and a fixed seed.
    pub fn new() -> Self {
        let narrator = Arc::new(ScriptedNarrator::default());
        let store = Arc::new(MemoryStore::new());
        let collection = Arc::new(MemoryEndingCollection::new());
        let statistics = Arc::new(MemoryChoiceStatistics::new());
        let analytics = Arc::new(RecordingAnalytics::new());

        let flow = StoryFlow::new(narrator.clone(), store.clone())
            .with_collection(collection.clone())
            .with_statistics(statistics.clone())
            .with_analytics(analytics.clone())
            .with_seed(0);

        Self {
            flow,
            narrator,
            store,
            collection,
            statistics,
            analytics,
        }
    }

    /// Queue the next narrator segment.
    pub fn expect_segment(&mut self, segment: NarrativeSegment) -> &mut Self {
        self.narrator.push(segment);
        self
    }

    /// Queue a plain beat with standard choices.
    pub fn expect_beat(&mut self, text: impl Into<String>) -> &mut Self {
        self.expect_segment(beat(text))
    }

    /// Start a run.
    pub async fn start(&self, request: StoryRequest) -> Result<StorySession, StoryError> {
        self.flow.create_story_session(request).await
    }

    /// Pick a choice at the session's current step.
    pub async fn choose(&self, session: &StorySession, choice: ChoiceId) -> Result<StorySession, StoryError> {
        self.flow.select_choice(session.step.id, choice, None).await
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

// Assertion helpers

#[track_caller]
pub fn assert_step_number(session: &StorySession, expected: u32) {
    assert_eq!(
        session.step.step_number, expected,
        "Expected step {}, got {}",
        expected, session.step.step_number
    );
}

#[track_caller]
pub fn assert_completed(session: &StorySession) {
    assert!(session.run.completed, "Expected run to be completed");
    assert!(session.run.ending.is_some(), "Completed run has no ending");
    assert!(session.step.choices.is_empty(), "Ending step still offers choices");
}

#[track_caller]
pub fn assert_active(session: &StorySession) {
    assert!(!session.run.completed, "Expected run to be active");
    assert!(!session.step.choices.is_empty(), "Active step offers no choices");
}

#[track_caller]
pub fn assert_has_flag(session: &StorySession, flag: &str) {
    assert!(
        session.step.game_state.has_flag(flag),
        "Expected flag '{}' in {:?}",
        flag,
        session.step.game_state.flags
    );
}

#[track_caller]
pub fn assert_relationship(session: &StorySession, character: &str, expected: i32) {
    let actual = session.step.game_state.relationship(character);
    assert_eq!(
        actual, expected,
        "Expected relationship with {} to be {}, got {}",
        character, expected, actual
    );
}

#[track_caller]
pub fn assert_trait(session: &StorySession, axis: Trait, expected: i32) {
    let actual = session.step.personality_traits.get(axis);
    assert_eq!(
        actual, expected,
        "Expected {} to be {}, got {}",
        axis.key(),
        expected,
        actual
    );
}
