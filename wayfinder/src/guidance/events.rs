//! Guidance events and the UI projection.

use std::fmt;

use serde::Serialize;

use crate::geo::CardinalDirection;
use crate::route::RouteSource;

/// Lifecycle state of the guidance engine.
///
/// ```text
/// Idle --[start]--> Active --[arrival]--> Arrived
///                     │
///                     └--[stop]--> Stopped
/// Arrived / Stopped --[start]--> Active
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NavigationState {
    #[default]
    Idle,
    Active,
    Arrived,
    Stopped,
}

impl NavigationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            NavigationState::Idle => "idle",
            NavigationState::Active => "active",
            NavigationState::Arrived => "arrived",
            NavigationState::Stopped => "stopped",
        }
    }

    /// Whether guidance has ended (arrived or stopped).
    pub fn is_terminal(&self) -> bool {
        matches!(self, NavigationState::Arrived | NavigationState::Stopped)
    }
}

impl fmt::Display for NavigationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Read-only snapshot of guidance progress for display.
///
/// Every field except `state` is `None` outside an active session.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GuidanceProjection {
    pub state: NavigationState,
    /// Index of the step being walked.
    pub step_index: Option<usize>,
    pub step_count: Option<usize>,
    /// Instruction for the current step.
    pub instruction: Option<String>,
    /// Straight-line distance to the end of the current step.
    pub distance_to_step_end_m: Option<f64>,
    /// Remaining distance to the destination along the route.
    pub remaining_distance_m: Option<f64>,
    pub remaining_distance_text: Option<String>,
    /// Estimated time to the destination.
    pub eta_seconds: Option<f64>,
    pub eta_text: Option<String>,
    /// Compass bearing from the user to the current step's end.
    pub bearing_degrees: Option<f64>,
    pub direction: Option<CardinalDirection>,
}

impl GuidanceProjection {
    /// Projection with only the state set.
    pub fn with_state(state: NavigationState) -> Self {
        Self {
            state,
            ..Self::default()
        }
    }
}

/// Notification emitted by the guidance engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GuidanceEvent {
    /// A session started and its first instruction was announced.
    Started {
        step_count: usize,
        instruction: String,
        source: RouteSource,
    },
    /// The user completed a step; `step_index` is the new current step.
    StepAdvanced {
        step_index: usize,
        instruction: String,
    },
    /// A position update moved the user without completing a step.
    ProgressUpdated(GuidanceProjection),
    /// The user reached the destination.
    Arrived,
    /// Guidance was stopped before arrival.
    Stopped,
}

impl GuidanceEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            GuidanceEvent::Started { .. } => "started",
            GuidanceEvent::StepAdvanced { .. } => "step_advanced",
            GuidanceEvent::ProgressUpdated(_) => "progress_updated",
            GuidanceEvent::Arrived => "arrived",
            GuidanceEvent::Stopped => "stopped",
        }
    }
}
