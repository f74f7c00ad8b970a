//! Turn-by-turn guidance
//!
//! The guidance engine tracks the user's position against an active route,
//! advances through its steps and asks the announcement scheduler to speak
//! instructions. The UI observes it through [`GuidanceEvent`]s and
//! [`GuidanceProjection`] snapshots; it never mutates session state.
//!
//! # Architecture
//!
//! ```text
//!  GeolocationProvider ──► position cycle (5 s) ──┐
//!                                                  ▼
//!  GuidanceEngine::start ──► NavigationSession ◄── on_position_update
//!                                 │
//!        reminder cycle (30 s) ───┤
//!                                 ▼
//!                   AnnouncementScheduler ──► SpeechSink
//!                                 │
//!                                 └──► broadcast<GuidanceEvent>
//! ```

mod engine;
mod events;
mod session;

use std::time::Duration;

pub use engine::{GuidanceEngine, ARRIVAL_ANNOUNCEMENT, STOP_ANNOUNCEMENT};
pub use events::{GuidanceEvent, GuidanceProjection, NavigationState};
pub use session::{NavigationSession, StepProgress};

use crate::route::AVERAGE_WALKING_SPEED_MPS;

// ─────────────────────────────────────────────────────────────────────────────
// Configuration defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Default interval between position polls.
pub const DEFAULT_POSITION_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default interval between instruction reminders.
pub const DEFAULT_REMINDER_INTERVAL: Duration = Duration::from_secs(30);

/// Distance to a step's end below which the step counts as complete.
pub const DEFAULT_STEP_ADVANCE_THRESHOLD_M: f64 = 20.0;

/// Distance to the destination below which the user has arrived.
pub const DEFAULT_ARRIVAL_THRESHOLD_M: f64 = 25.0;

/// Default capacity of the guidance event broadcast channel.
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 64;

/// Guidance engine configuration.
#[derive(Debug, Clone)]
pub struct GuidanceConfig {
    /// How often the position cycle polls the geolocation provider.
    pub position_poll_interval: Duration,
    /// How often the current instruction is repeated.
    pub reminder_interval: Duration,
    pub step_advance_threshold_m: f64,
    pub arrival_threshold_m: f64,
    /// Used for ETAs on steps without a duration.
    pub walking_speed_mps: f64,
    pub event_channel_capacity: usize,
}

impl Default for GuidanceConfig {
    fn default() -> Self {
        Self {
            position_poll_interval: DEFAULT_POSITION_POLL_INTERVAL,
            reminder_interval: DEFAULT_REMINDER_INTERVAL,
            step_advance_threshold_m: DEFAULT_STEP_ADVANCE_THRESHOLD_M,
            arrival_threshold_m: DEFAULT_ARRIVAL_THRESHOLD_M,
            walking_speed_mps: AVERAGE_WALKING_SPEED_MPS,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}

impl GuidanceConfig {
    pub fn with_position_poll_interval(mut self, interval: Duration) -> Self {
        self.position_poll_interval = interval;
        self
    }

    pub fn with_reminder_interval(mut self, interval: Duration) -> Self {
        self.reminder_interval = interval;
        self
    }

    pub fn with_step_advance_threshold(mut self, meters: f64) -> Self {
        self.step_advance_threshold_m = meters;
        self
    }

    pub fn with_arrival_threshold(mut self, meters: f64) -> Self {
        self.arrival_threshold_m = meters;
        self
    }
}
