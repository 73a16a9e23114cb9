//! Errors surfaced by the story orchestrator.

use crate::choice::{ChoiceId, ChoiceValidationError};
use crate::narrator::NarrativeError;
use crate::store::StoreError;
use crate::story::{RunId, StepId};
use thiserror::Error;

/// Errors from [`StoryFlow`](crate::flow::StoryFlow) operations.
#[derive(Debug, Error)]
pub enum StoryError {
    #[error("Story run not found: {0}")]
    RunNotFound(RunId),

    #[error("Story step not found: {0}")]
    StepNotFound(StepId),

    #[error("Story run {0} has no steps")]
    EmptyRun(RunId),

    #[error("Step {step_id} is no longer current (step {step_number}, latest is {latest})")]
    StaleStep {
        step_id: StepId,
        step_number: u32,
        latest: u32,
    },

    #[error("Choice {choice_id} not found in step {step_id}")]
    ChoiceNotFound { step_id: StepId, choice_id: String },

    #[error("Generated choices are invalid: {0}")]
    InvalidChoice(#[from] ChoiceValidationError),

    #[error("{context}: {source}")]
    Store {
        context: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("{context}: {source}")]
    Narrative {
        context: &'static str,
        #[source]
        source: NarrativeError,
    },
}

impl StoryError {
    pub(crate) fn store(context: &'static str) -> impl FnOnce(StoreError) -> Self {
        move |source| StoryError::Store { context, source }
    }

    pub(crate) fn narrative(context: &'static str) -> impl FnOnce(NarrativeError) -> Self {
        move |source| StoryError::Narrative { context, source }
    }

    pub(crate) fn choice_not_found(step_id: StepId, choice_id: ChoiceId, slug: Option<&str>) -> Self {
        let choice_id = match slug {
            Some(slug) => format!("{choice_id} ({slug})"),
            None => choice_id.to_string(),
        };
        StoryError::ChoiceNotFound { step_id, choice_id }
    }

    /// Whether the error is a missing run, step or choice.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoryError::RunNotFound(_)
                | StoryError::StepNotFound(_)
                | StoryError::EmptyRun(_)
                | StoryError::ChoiceNotFound { .. }
        )
    }
}
