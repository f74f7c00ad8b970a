//! External collaborator abstraction
//!
//! This module defines the interfaces the navigation core consumes
//! (directions, geolocation, speech output, places, voice input), the
//! shared request/response types, and HTTP-backed implementations for the
//! Google Maps Platform.
//!
//! ```ignore
//! use wayfinder::provider::{AsyncReqwestClient, GoogleDirectionsProvider};
//!
//! let http_client = AsyncReqwestClient::new()?;
//! let directions = Arc::new(GoogleDirectionsProvider::new(http_client, api_key));
//! let acquirer = RouteAcquirer::new(directions, RouteConfig::default());
//! ```

mod google;
mod http;
mod traits;
mod types;

pub use google::{GoogleDirectionsProvider, GooglePlacesProvider};
pub use http::{AsyncHttpClient, AsyncReqwestClient};
pub use traits::{
    BoxFuture, DirectionsProvider, GeolocationProvider, PlacesProvider, SpeechSink,
    VoiceInputProvider,
};
pub use types::{
    DirectionsLeg, DirectionsRequest, DirectionsResponse, DirectionsRoute, DirectionsStep,
    EncodedPolyline, LatLng, LatLngBounds, NearbyPlace, ProviderError, TextValue, TravelMode,
    STATUS_OK, STATUS_ZERO_RESULTS,
};

#[cfg(test)]
pub use http::tests::MockAsyncHttpClient;
