//! Guidance engine: the navigation state machine and its timers.
//!
//! # State Machine
//!
//! ```text
//! Idle --[start]--> Active --[last step within arrival threshold]--> Arrived
//! Active --[stop]--> Stopped
//! Arrived | Stopped --[start]--> Active
//! Active --[start]--> Active (old timers cancelled, progress discarded)
//! ```
//!
//! # Concurrency
//!
//! All session state sits behind one mutex. Announcements are queued
//! synchronously while it is held, and `stop` flips the state under the same
//! lock, so once `stop` returns no timer callback can queue speech.
//!
//! Each `start` bumps a generation counter. Timer tasks carry the generation
//! they were spawned for and do nothing once it is stale, even if their
//! cancellation has not been observed yet.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::events::{GuidanceEvent, GuidanceProjection, NavigationState};
use super::session::{NavigationSession, StepProgress};
use super::GuidanceConfig;
use crate::error::Result;
use crate::geo::Coordinate;
use crate::provider::GeolocationProvider;
use crate::route::Route;
use crate::speech::{AnnouncementScheduler, Priority};

/// Spoken when the user reaches the destination.
pub const ARRIVAL_ANNOUNCEMENT: &str = "You have reached your destination";

/// Spoken when guidance is stopped by the user.
pub const STOP_ANNOUNCEMENT: &str = "Navigation stopped";

/// Lower bound for timer periods; `interval` rejects zero.
const MIN_CYCLE_PERIOD: Duration = Duration::from_millis(100);

struct EngineState {
    state: NavigationState,
    /// Present exactly while `Active`.
    session: Option<NavigationSession>,
    timers: Option<CancellationToken>,
    generation: u64,
    backgrounded: bool,
    projection: GuidanceProjection,
    last_applied_seq: u64,
}

impl EngineState {
    fn new() -> Self {
        Self {
            state: NavigationState::Idle,
            session: None,
            timers: None,
            generation: 0,
            backgrounded: false,
            projection: GuidanceProjection::default(),
            last_applied_seq: 0,
        }
    }

    fn cancel_timers(&mut self) {
        if let Some(timers) = self.timers.take() {
            timers.cancel();
        }
    }
}

struct EngineShared {
    config: GuidanceConfig,
    geolocation: Arc<dyn GeolocationProvider>,
    announcer: Arc<AnnouncementScheduler>,
    events: broadcast::Sender<GuidanceEvent>,
    state: Mutex<EngineState>,
    position_seq: AtomicU64,
}

/// Turn-by-turn guidance engine.
///
/// Cheap to clone; clones share the same session. Timer tasks hold only a
/// weak reference, so dropping every handle also ends them.
///
/// # Example
///
/// ```ignore
/// let engine = GuidanceEngine::new(GuidanceConfig::default(), geolocation, announcer);
/// let mut events = engine.subscribe();
///
/// engine.start(route)?;
/// while let Ok(event) = events.recv().await {
///     if matches!(event, GuidanceEvent::Arrived) {
///         break;
///     }
/// }
/// ```
#[derive(Clone)]
pub struct GuidanceEngine {
    shared: Arc<EngineShared>,
}

impl GuidanceEngine {
    pub fn new(
        config: GuidanceConfig,
        geolocation: Arc<dyn GeolocationProvider>,
        announcer: Arc<AnnouncementScheduler>,
    ) -> Self {
        let (events, _) = broadcast::channel(config.event_channel_capacity.max(1));
        Self {
            shared: Arc::new(EngineShared {
                config,
                geolocation,
                announcer,
                events,
                state: Mutex::new(EngineState::new()),
                position_seq: AtomicU64::new(0),
            }),
        }
    }

    /// Begin guidance along `route`.
    ///
    /// Announces the first instruction immediately and starts the position
    /// and reminder cycles. An already active session is replaced.
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// [`NavError::EmptyRoute`](crate::NavError::EmptyRoute) if the route has
    /// no steps. The engine state is left untouched.
    pub fn start(&self, route: Route) -> Result<()> {
        let shared = &self.shared;
        let now = Instant::now();
        let mut session = NavigationSession::new(route, now)?;

        let mut guard = shared.state.lock();
        let st = &mut *guard;

        st.cancel_timers();
        if st.state == NavigationState::Active {
            info!(
                generation = st.generation,
                "Replacing active route; progress discarded"
            );
        }

        st.generation += 1;
        // Anything requested before this point belongs to the old session
        st.last_applied_seq = shared.position_seq.load(Ordering::SeqCst);

        let instruction = session.current_step().instruction.clone();
        let step_count = session.route().step_count();
        let source = session.route().source;

        shared.announcer.announce(&instruction, Priority::Immediate);
        session.mark_announced(now);

        st.projection = session.projection(&shared.config);
        st.session = Some(session);
        st.state = NavigationState::Active;
        if !st.backgrounded {
            st.timers = Some(spawn_timers(shared, st.generation));
        }

        info!(
            steps = step_count,
            source = %source,
            generation = st.generation,
            "Guidance started"
        );
        shared.emit(GuidanceEvent::Started {
            step_count,
            instruction,
            source,
        });
        Ok(())
    }

    /// Feed a position fix obtained outside the position cycle.
    pub fn on_position_update(&self, position: Coordinate) {
        let seq = self.next_position_seq();
        self.shared.apply_position(seq, position, None);
    }

    /// Reserve a sequence number for a position request about to be made.
    ///
    /// Pair with [`on_position_result`](Self::on_position_result) when the
    /// fix arrives asynchronously; results older than the newest applied
    /// one are discarded.
    pub fn next_position_seq(&self) -> u64 {
        self.shared.next_position_seq()
    }

    /// Apply the result of the position request numbered `seq`.
    pub fn on_position_result(&self, seq: u64, position: Coordinate) {
        self.shared.apply_position(seq, position, None);
    }

    /// Stop guidance. No-op unless `Active`.
    pub fn stop(&self) {
        let mut guard = self.shared.state.lock();
        let st = &mut *guard;

        if st.state != NavigationState::Active {
            debug!(state = %st.state, "Stop ignored: guidance not active");
            return;
        }

        st.cancel_timers();
        st.state = NavigationState::Stopped;
        st.session = None;
        st.projection = GuidanceProjection::with_state(NavigationState::Stopped);

        self.shared
            .announcer
            .announce(STOP_ANNOUNCEMENT, Priority::Immediate);
        info!(generation = st.generation, "Guidance stopped");
        self.shared.emit(GuidanceEvent::Stopped);
    }

    /// Pause or resume the timers when the app leaves or enters the foreground.
    ///
    /// The session is kept either way.
    pub fn set_backgrounded(&self, backgrounded: bool) {
        let mut guard = self.shared.state.lock();
        let st = &mut *guard;

        if st.backgrounded == backgrounded {
            return;
        }
        st.backgrounded = backgrounded;

        if backgrounded {
            st.cancel_timers();
            info!("Guidance timers paused (backgrounded)");
        } else if st.state == NavigationState::Active && st.timers.is_none() {
            st.timers = Some(spawn_timers(&self.shared, st.generation));
            info!("Guidance timers resumed (foregrounded)");
        }
    }

    /// Receive guidance events from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<GuidanceEvent> {
        self.shared.events.subscribe()
    }

    /// Snapshot for display.
    pub fn projection(&self) -> GuidanceProjection {
        self.shared.state.lock().projection.clone()
    }

    pub fn state(&self) -> NavigationState {
        self.shared.state.lock().state
    }

    /// Index of the current step while `Active`.
    pub fn current_step_index(&self) -> Option<usize> {
        self.shared
            .state
            .lock()
            .session
            .as_ref()
            .map(NavigationSession::current_step_index)
    }

    /// The route being followed while `Active`.
    pub fn active_route(&self) -> Option<Route> {
        self.shared
            .state
            .lock()
            .session
            .as_ref()
            .map(|s| s.route().clone())
    }

    pub fn is_backgrounded(&self) -> bool {
        self.shared.state.lock().backgrounded
    }

    /// Whether the position and reminder cycles are running.
    pub fn timers_running(&self) -> bool {
        self.shared.state.lock().timers.is_some()
    }

    pub fn config(&self) -> &GuidanceConfig {
        &self.shared.config
    }
}

impl fmt::Debug for GuidanceEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.shared.state.lock();
        f.debug_struct("GuidanceEngine")
            .field("state", &st.state)
            .field(
                "step",
                &st.session.as_ref().map(NavigationSession::current_step_index),
            )
            .field("generation", &st.generation)
            .field("backgrounded", &st.backgrounded)
            .field("timers_running", &st.timers.is_some())
            .finish()
    }
}

impl EngineShared {
    fn next_position_seq(&self) -> u64 {
        self.position_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn emit(&self, event: GuidanceEvent) {
        let kind = event.kind();
        // No receivers is fine; the UI may not be listening
        if self.events.send(event).is_err() {
            trace!(event = kind, "No guidance event subscribers");
        }
    }

    /// Apply a position fix. `generation` is set for fixes from a timer task.
    fn apply_position(&self, seq: u64, position: Coordinate, generation: Option<u64>) {
        let now = Instant::now();
        let mut guard = self.state.lock();
        let st = &mut *guard;

        if st.state != NavigationState::Active {
            trace!(state = %st.state, "Ignoring position: guidance not active");
            return;
        }
        if generation.is_some_and(|g| g != st.generation) {
            trace!("Ignoring position from a previous session");
            return;
        }
        if seq <= st.last_applied_seq {
            debug!(
                seq,
                last_applied = st.last_applied_seq,
                "Discarding stale position"
            );
            return;
        }
        st.last_applied_seq = seq;

        if !position.is_valid() {
            warn!(%position, "Ignoring invalid position fix");
            return;
        }

        let Some(session) = st.session.as_mut() else {
            return;
        };

        match session.apply_position(position, &self.config, now) {
            StepProgress::Advanced { from, to } => {
                let instruction = session.current_step().instruction.clone();
                self.announcer.announce(&instruction, Priority::Immediate);
                session.mark_announced(now);
                st.projection = session.projection(&self.config);

                info!(from, to, instruction = %instruction, "Advanced to next step");
                self.emit(GuidanceEvent::StepAdvanced {
                    step_index: to,
                    instruction,
                });
            }
            StepProgress::Arrived => {
                st.cancel_timers();
                st.state = NavigationState::Arrived;
                st.session = None;
                st.projection = GuidanceProjection::with_state(NavigationState::Arrived);

                self.announcer
                    .announce(ARRIVAL_ANNOUNCEMENT, Priority::Immediate);
                info!(%position, "Arrived at destination");
                self.emit(GuidanceEvent::Arrived);
            }
            StepProgress::Progress(projection) => {
                trace!(
                    step = ?projection.step_index,
                    distance_m = ?projection.distance_to_step_end_m,
                    "Progress updated"
                );
                st.projection = projection.clone();
                self.emit(GuidanceEvent::ProgressUpdated(projection));
            }
            StepProgress::InvalidStepEnd { step } => {
                warn!(step, "Skipping position update: step has no valid end coordinate");
            }
        }
    }

    /// Repeat the current instruction.
    ///
    /// Queued as periodic speech, so the scheduler drops it while speaking or
    /// listening.
    fn remind(&self, generation: u64) {
        let now = Instant::now();
        let mut guard = self.state.lock();
        let st = &mut *guard;

        if st.state != NavigationState::Active || st.generation != generation {
            return;
        }
        let Some(session) = st.session.as_mut() else {
            return;
        };

        let instruction = session.current_step().instruction.clone();
        if self
            .announcer
            .announce(&instruction, Priority::Periodic)
            .is_queued()
        {
            session.mark_announced(now);
            debug!(step = session.current_step_index(), "Reminder queued");
        }
    }
}

impl Drop for EngineShared {
    fn drop(&mut self) {
        self.state.get_mut().cancel_timers();
    }
}

fn spawn_timers(shared: &Arc<EngineShared>, generation: u64) -> CancellationToken {
    let token = CancellationToken::new();
    let engine = Arc::downgrade(shared);

    tokio::spawn(run_position_cycle(
        engine.clone(),
        Arc::clone(&shared.geolocation),
        shared.config.position_poll_interval.max(MIN_CYCLE_PERIOD),
        generation,
        token.clone(),
    ));
    tokio::spawn(run_reminder_cycle(
        engine,
        shared.config.reminder_interval.max(MIN_CYCLE_PERIOD),
        generation,
        token.clone(),
    ));

    debug!(generation, "Guidance timers started");
    token
}

/// Feed positions to the engine, from the provider's stream when it has one
/// and by polling otherwise.
async fn run_position_cycle(
    engine: Weak<EngineShared>,
    geolocation: Arc<dyn GeolocationProvider>,
    period: Duration,
    generation: u64,
    token: CancellationToken,
) {
    match geolocation.subscribe(period) {
        Some(mut positions) => {
            debug!(generation, "Position cycle following provider stream");
            loop {
                let position = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    position = positions.recv() => position,
                };
                let Some(position) = position else {
                    debug!("Position stream closed");
                    break;
                };
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                let seq = engine.next_position_seq();
                engine.apply_position(seq, position, Some(generation));
            }
        }
        None => {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                // No strong handle is held while the fix is pending
                let Some(seq) = engine.upgrade().map(|e| e.next_position_seq()) else {
                    break;
                };
                let result = tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    result = geolocation.current_position() => result,
                };
                let Some(engine) = engine.upgrade() else {
                    break;
                };
                match result {
                    Ok(position) => engine.apply_position(seq, position, Some(generation)),
                    Err(e) => warn!(error = %e, "Position request failed"),
                }
            }
        }
    }
    trace!(generation, "Position cycle ended");
}

async fn run_reminder_cycle(
    engine: Weak<EngineShared>,
    period: Duration,
    generation: u64,
    token: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }
        let Some(engine) = engine.upgrade() else {
            break;
        };
        engine.remind(generation);
    }
    trace!(generation, "Reminder cycle ended");
}
