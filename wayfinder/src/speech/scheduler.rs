//! Announcement scheduler.
//!
//! Serializes utterances to a [`SpeechSink`] so that at most one is in
//! flight. Callers enqueue synchronously with [`AnnouncementScheduler::announce`];
//! a background worker drains the queue.
//!
//! # Priorities
//!
//! - `Immediate` utterances are never dropped for being busy. They interrupt
//!   an in-flight `Periodic` utterance and queue behind other `Immediate` ones.
//!   A failed utterance is retried once.
//! - `Periodic` utterances (reminders) are dropped whenever anything is
//!   speaking or queued, or while voice input holds the audio focus.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::focus::{AudioFocus, FocusGuard, FocusState};
use crate::provider::SpeechSink;

/// Attempts made for an `Immediate` utterance before it is dropped.
const IMMEDIATE_ATTEMPTS: usize = 2;

/// Announcement priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Priority {
    /// Maneuver instructions, arrival, stop notices.
    Immediate,
    /// Reminders that are only worth saying when nothing else is.
    Periodic,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Immediate => "immediate",
            Priority::Periodic => "periodic",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Why an announcement was not queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Something is already speaking or queued.
    Busy,
    /// Voice input holds the audio focus.
    Listening,
    /// Nothing to say.
    EmptyText,
    /// The scheduler has been shut down.
    ShutDown,
}

/// Result of [`AnnouncementScheduler::announce`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    Queued,
    Dropped(DropReason),
}

impl AnnounceOutcome {
    pub fn is_queued(&self) -> bool {
        matches!(self, AnnounceOutcome::Queued)
    }
}

#[derive(Debug)]
struct Utterance {
    text: String,
    priority: Priority,
}

#[derive(Debug)]
struct InFlight {
    priority: Priority,
    interrupt: CancellationToken,
}

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<Utterance>,
    in_flight: Option<InFlight>,
    closed: bool,
}

struct SchedulerShared {
    sink: Arc<dyn SpeechSink>,
    focus: AudioFocus,
    state: Mutex<QueueState>,
    wake: Notify,
    shutdown: CancellationToken,
}

/// Serializes announcements to a speech sink.
///
/// Must be created inside a tokio runtime; the worker task is spawned
/// immediately.
pub struct AnnouncementScheduler {
    shared: Arc<SchedulerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl AnnouncementScheduler {
    /// Create a scheduler and spawn its worker.
    pub fn spawn(sink: Arc<dyn SpeechSink>, focus: AudioFocus) -> Self {
        let shared = Arc::new(SchedulerShared {
            sink,
            focus,
            state: Mutex::new(QueueState::default()),
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
        });
        let worker = tokio::spawn(run_worker(Arc::clone(&shared)));
        Self {
            shared,
            worker: Mutex::new(Some(worker)),
        }
    }

    /// Queue `text` for speaking.
    ///
    /// Never blocks. Once this returns `Queued`, the utterance will be
    /// attempted unless the scheduler shuts down or a later `Immediate`
    /// interrupts it (`Periodic` only).
    pub fn announce(&self, text: &str, priority: Priority) -> AnnounceOutcome {
        let text = text.trim();
        if text.is_empty() {
            return AnnounceOutcome::Dropped(DropReason::EmptyText);
        }

        let mut state = self.shared.state.lock();
        if state.closed {
            return AnnounceOutcome::Dropped(DropReason::ShutDown);
        }

        match priority {
            Priority::Periodic => {
                if state.in_flight.is_some() || !state.queue.is_empty() {
                    debug!(text, "Dropping periodic announcement: speech busy");
                    return AnnounceOutcome::Dropped(DropReason::Busy);
                }
                if self.shared.focus.state() == FocusState::Listening {
                    debug!(text, "Dropping periodic announcement: listening");
                    return AnnounceOutcome::Dropped(DropReason::Listening);
                }
            }
            Priority::Immediate => {
                if let Some(in_flight) = &state.in_flight {
                    if in_flight.priority == Priority::Periodic {
                        debug!("Interrupting periodic announcement");
                        in_flight.interrupt.cancel();
                    }
                }
                state.queue.retain(|u| u.priority == Priority::Immediate);
            }
        }

        debug!(text, priority = %priority, queued = state.queue.len(), "Announcement queued");
        state.queue.push_back(Utterance {
            text: text.to_string(),
            priority,
        });
        drop(state);

        self.shared.wake.notify_one();
        AnnounceOutcome::Queued
    }

    /// Whether an utterance is in flight or queued.
    pub fn is_busy(&self) -> bool {
        let state = self.shared.state.lock();
        state.in_flight.is_some() || !state.queue.is_empty()
    }

    /// Number of queued (not yet started) utterances.
    pub fn queued(&self) -> usize {
        self.shared.state.lock().queue.len()
    }

    /// Shared audio focus arbiter.
    pub fn focus(&self) -> &AudioFocus {
        &self.shared.focus
    }

    /// Stop the worker and drop queued utterances.
    ///
    /// Subsequent announcements are dropped. Safe to call more than once.
    pub async fn shutdown(&self) {
        let dropped = {
            let mut state = self.shared.state.lock();
            state.closed = true;
            let dropped = state.queue.len();
            state.queue.clear();
            dropped
        };
        self.shared.shutdown.cancel();

        let worker = self.worker.lock().take();
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!(error = %e, "Announcement worker ended abnormally");
            }
            info!(dropped, "Announcement scheduler shut down");
        }
    }
}

impl Drop for AnnouncementScheduler {
    fn drop(&mut self) {
        self.shared.shutdown.cancel();
    }
}

impl fmt::Debug for AnnouncementScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.shared.state.lock();
        f.debug_struct("AnnouncementScheduler")
            .field("queued", &state.queue.len())
            .field("in_flight", &state.in_flight.as_ref().map(|f| f.priority))
            .field("closed", &state.closed)
            .finish()
    }
}

async fn run_worker(shared: Arc<SchedulerShared>) {
    loop {
        let next = {
            let mut state = shared.state.lock();
            let popped = state.queue.pop_front();
            match popped {
                Some(utterance) => {
                    let interrupt = CancellationToken::new();
                    state.in_flight = Some(InFlight {
                        priority: utterance.priority,
                        interrupt: interrupt.clone(),
                    });
                    Some((utterance, interrupt))
                }
                None => None,
            }
        };

        match next {
            Some((utterance, interrupt)) => {
                speak(&shared, &utterance, &interrupt).await;
                shared.state.lock().in_flight = None;
            }
            None => {
                tokio::select! {
                    biased;
                    _ = shared.shutdown.cancelled() => break,
                    _ = shared.wake.notified() => {}
                }
            }
        }

        if shared.shutdown.is_cancelled() {
            break;
        }
    }
    debug!("Announcement worker stopped");
}

/// Speak one utterance while holding the speaking focus.
async fn speak(shared: &SchedulerShared, utterance: &Utterance, interrupt: &CancellationToken) {
    let Some(_guard) = take_focus(shared, utterance).await else {
        return;
    };

    let attempts = match utterance.priority {
        Priority::Immediate => IMMEDIATE_ATTEMPTS,
        Priority::Periodic => 1,
    };

    for attempt in 1..=attempts {
        let result = tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => {
                shared.sink.stop().await;
                return;
            }
            _ = interrupt.cancelled() => {
                shared.sink.stop().await;
                debug!(text = %utterance.text, "Announcement interrupted");
                return;
            }
            result = shared.sink.speak(&utterance.text) => result,
        };

        match result {
            Ok(()) => return,
            Err(e) => warn!(
                error = %e,
                attempt,
                priority = %utterance.priority,
                text = %utterance.text,
                "Speech output failed"
            ),
        }
    }

    warn!(text = %utterance.text, "Dropping announcement after failed speech output");
}

async fn take_focus(shared: &SchedulerShared, utterance: &Utterance) -> Option<FocusGuard> {
    match utterance.priority {
        Priority::Periodic => {
            let guard = shared.focus.try_acquire(FocusState::Speaking);
            if guard.is_none() {
                debug!(text = %utterance.text, "Dropping periodic announcement: audio focus held");
            }
            guard
        }
        Priority::Immediate => tokio::select! {
            biased;
            _ = shared.shutdown.cancelled() => None,
            guard = shared.focus.acquire(FocusState::Speaking) => Some(guard),
        },
    }
}
