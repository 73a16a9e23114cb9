//! Product analytics events.
//!
//! The analytics client is constructed by the caller and handed to the
//! [`StoryFlow`](crate::flow::StoryFlow); nothing here is global. Tracking is
//! fire-and-forget and never fails the caller.

use crate::choice::ChoiceId;
use crate::ending::{EndingCategory, Rarity};
use crate::story::{Genre, RunId, StoryLength};
use std::sync::Mutex;

/// Something worth counting.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyticsEvent {
    StoryStarted {
        run_id: RunId,
        genre: Genre,
        length: StoryLength,
    },
    ChoiceSelected {
        run_id: RunId,
        step_number: u32,
        choice_id: ChoiceId,
        slug: String,
    },
    EndingReached {
        run_id: RunId,
        ending_tag: String,
        rarity: Rarity,
        category: EndingCategory,
        steps: u32,
    },
}

impl AnalyticsEvent {
    pub fn name(&self) -> &'static str {
        match self {
            AnalyticsEvent::StoryStarted { .. } => "story_started",
            AnalyticsEvent::ChoiceSelected { .. } => "choice_selected",
            AnalyticsEvent::EndingReached { .. } => "ending_reached",
        }
    }
}

/// Destination for analytics events.
pub trait Analytics: Send + Sync {
    fn track(&self, event: AnalyticsEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAnalytics;

impl Analytics for NoopAnalytics {
    fn track(&self, _event: AnalyticsEvent) {}
}

/// Emits events as `tracing` records under the `analytics` target.
#[derive(Debug, Clone)]
pub struct TracingAnalytics {
    session_id: String,
}

impl TracingAnalytics {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
        }
    }
}

impl Analytics for TracingAnalytics {
    fn track(&self, event: AnalyticsEvent) {
        tracing::info!(
            target: "analytics",
            session_id = %self.session_id,
            event = event.name(),
            details = ?event,
            "analytics event"
        );
    }
}

/// Keeps every event in memory, for assertions.
#[derive(Debug, Default)]
pub struct RecordingAnalytics {
    events: Mutex<Vec<AnalyticsEvent>>,
}

impl RecordingAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<AnalyticsEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Names of recorded events, in order.
    pub fn event_names(&self) -> Vec<&'static str> {
        self.events().iter().map(AnalyticsEvent::name).collect()
    }
}

impl Analytics for RecordingAnalytics {
    fn track(&self, event: AnalyticsEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event);
    }
}
