//! Collaborator interfaces consumed by the navigation core.
//!
//! Every external service the guidance engine touches sits behind one of
//! these traits and is handed in at construction time, so tests can swap in
//! scripted fakes.
//!
//! # Dyn Compatibility
//!
//! Async methods return [`BoxFuture`] rather than using `async fn` so the
//! traits can be held as `Arc<dyn Trait>`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio::sync::mpsc;

use super::types::{DirectionsRequest, DirectionsResponse, NearbyPlace, ProviderError};
use crate::geo::Coordinate;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Looks up routes between two points.
pub trait DirectionsProvider: Send + Sync {
    /// Fetch routes for the request.
    ///
    /// A response with a non-OK status is still returned as `Ok`; callers
    /// inspect [`DirectionsResponse::status`]. `Err` means the request never
    /// produced a usable response (transport failure, undecodable body).
    fn get_route<'a>(
        &'a self,
        request: &'a DirectionsRequest,
    ) -> BoxFuture<'a, Result<DirectionsResponse, ProviderError>>;

    /// Human-readable provider name for logging.
    fn name(&self) -> &str;
}

/// Reports where the user is.
pub trait GeolocationProvider: Send + Sync {
    /// One-shot position fix.
    fn current_position(&self) -> BoxFuture<'_, Result<Coordinate, ProviderError>>;

    /// Push stream of positions at roughly `interval_hint`.
    ///
    /// Providers without a native stream return `None` and are polled with
    /// [`current_position`](Self::current_position) instead.
    fn subscribe(&self, interval_hint: Duration) -> Option<mpsc::Receiver<Coordinate>> {
        let _ = interval_hint;
        None
    }
}

/// Speaks text aloud.
pub trait SpeechSink: Send + Sync {
    /// Speak `text`, resolving once the utterance finishes or fails.
    fn speak<'a>(&'a self, text: &'a str) -> BoxFuture<'a, Result<(), ProviderError>>;

    /// Cut off whatever is currently being spoken.
    fn stop(&self) -> BoxFuture<'_, ()>;
}

/// Finds points of interest around a location.
pub trait PlacesProvider: Send + Sync {
    /// Search for places of `category` within `radius_m` of `location`.
    fn search_nearby<'a>(
        &'a self,
        location: Coordinate,
        category: &'a str,
        radius_m: f64,
    ) -> BoxFuture<'a, Result<Vec<NearbyPlace>, ProviderError>>;
}

/// Turns speech into a destination query.
pub trait VoiceInputProvider: Send + Sync {
    /// Listen for one utterance and return its transcript.
    fn listen(&self) -> BoxFuture<'_, Result<String, ProviderError>>;
}
