//! Audio focus arbiter.
//!
//! Speech output and voice input share one audio path. [`AudioFocus`] makes
//! the exclusion explicit: at most one holder at a time, released when the
//! [`FocusGuard`] is dropped.
//!
//! # State Machine
//!
//! ```text
//! Free --[acquire(Speaking)]--> Speaking --[guard dropped]--> Free
//! Free --[acquire(Listening)]--> Listening --[guard dropped]--> Free
//! ```

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::trace;

/// Who currently holds the audio path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusState {
    /// Nobody; either side may acquire.
    Free,
    /// Speech output is playing.
    Speaking,
    /// Voice input is recording.
    Listening,
}

impl FocusState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FocusState::Free => "free",
            FocusState::Speaking => "speaking",
            FocusState::Listening => "listening",
        }
    }
}

impl fmt::Display for FocusState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shared arbiter for the audio path. Cheap to clone.
#[derive(Clone)]
pub struct AudioFocus {
    state: Arc<watch::Sender<FocusState>>,
}

impl AudioFocus {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(FocusState::Free);
        Self {
            state: Arc::new(tx),
        }
    }

    /// Current holder.
    pub fn state(&self) -> FocusState {
        *self.state.borrow()
    }

    /// Take focus for `holder` if it is free.
    ///
    /// Returns `None` when someone else holds it. Asking for
    /// [`FocusState::Free`] is meaningless and also returns `None`.
    pub fn try_acquire(&self, holder: FocusState) -> Option<FocusGuard> {
        if holder == FocusState::Free {
            return None;
        }
        let acquired = self.state.send_if_modified(|current| {
            if *current == FocusState::Free {
                *current = holder;
                true
            } else {
                false
            }
        });
        if acquired {
            trace!(holder = %holder, "Audio focus acquired");
            Some(FocusGuard {
                focus: self.clone(),
                holder,
            })
        } else {
            None
        }
    }

    /// Wait until focus is free, then take it for `holder`.
    ///
    /// `holder` must not be [`FocusState::Free`]; such a request waits forever.
    pub async fn acquire(&self, holder: FocusState) -> FocusGuard {
        let mut rx = self.state.subscribe();
        loop {
            if let Some(guard) = self.try_acquire(holder) {
                return guard;
            }
            if holder == FocusState::Free {
                std::future::pending::<()>().await;
            }
            // The sender lives in `self`, so waiting cannot fail
            let _ = rx.wait_for(|state| *state == FocusState::Free).await;
        }
    }

    fn release(&self, holder: FocusState) {
        let released = self.state.send_if_modified(|current| {
            if *current == holder {
                *current = FocusState::Free;
                true
            } else {
                false
            }
        });
        if released {
            trace!(holder = %holder, "Audio focus released");
        }
    }
}

impl Default for AudioFocus {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for AudioFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioFocus")
            .field("state", &self.state())
            .finish()
    }
}

/// Held focus. Dropping it frees the audio path.
#[must_use = "focus is released as soon as the guard is dropped"]
pub struct FocusGuard {
    focus: AudioFocus,
    holder: FocusState,
}

impl FocusGuard {
    pub fn holder(&self) -> FocusState {
        self.holder
    }
}

impl Drop for FocusGuard {
    fn drop(&mut self) {
        self.focus.release(self.holder);
    }
}

impl fmt::Debug for FocusGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FocusGuard")
            .field("holder", &self.holder)
            .finish()
    }
}
