//! Crate-level error type.

use thiserror::Error;

use crate::geo::GeoError;
use crate::provider::ProviderError;

/// Result alias for navigation operations.
pub type Result<T> = std::result::Result<T, NavError>;

/// Errors surfaced to callers of the navigation core.
///
/// Provider failures during route acquisition are recovered internally
/// (straight-line fallback) and do not appear here.
#[derive(Debug, Error)]
pub enum NavError {
    /// Navigation was started with a route that has no steps.
    #[error("Cannot start navigation: route has no steps")]
    EmptyRoute,

    /// Origin or destination is missing or not a valid coordinate.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(#[from] GeoError),

    /// A collaborator failed in a way that cannot be recovered locally.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Audio focus is held by speech output; listening is not possible.
    #[error("Audio is busy speaking")]
    AudioBusy,

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}
