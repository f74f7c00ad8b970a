//! Spoken output
//!
//! [`AnnouncementScheduler`] owns the speech sink and decides what gets said
//! and when. [`AudioFocus`] arbitrates the shared audio path between speech
//! output and voice input.

mod focus;
mod scheduler;

pub use focus::{AudioFocus, FocusGuard, FocusState};
pub use scheduler::{AnnounceOutcome, AnnouncementScheduler, DropReason, Priority};

#[cfg(test)]
pub(crate) use scheduler::tests::RecordingSink;
