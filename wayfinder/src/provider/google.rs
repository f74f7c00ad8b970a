//! Google Maps Platform directions and places providers.
//!
//! Both providers require a Maps Platform API key with the relevant APIs
//! enabled (Directions API, Places API).
//!
//! # API Endpoints
//!
//! - Directions: `https://maps.googleapis.com/maps/api/directions/json`
//! - Nearby search: `https://maps.googleapis.com/maps/api/place/nearbysearch/json`
//!
//! The directions JSON deserializes directly into
//! [`DirectionsResponse`](super::DirectionsResponse).

use reqwest::Url;
use serde::Deserialize;

use super::http::AsyncHttpClient;
use super::traits::{BoxFuture, DirectionsProvider, PlacesProvider};
use super::types::{
    DirectionsRequest, DirectionsResponse, LatLng, NearbyPlace, ProviderError, STATUS_OK,
    STATUS_ZERO_RESULTS,
};
use crate::geo::Coordinate;

const DIRECTIONS_ENDPOINT: &str = "https://maps.googleapis.com/maps/api/directions/json";
const NEARBY_SEARCH_ENDPOINT: &str =
    "https://maps.googleapis.com/maps/api/place/nearbysearch/json";

/// Format a coordinate the way the API expects: `"lat,lng"`.
fn format_location(coordinate: Coordinate) -> String {
    format!("{:.6},{:.6}", coordinate.lat, coordinate.lon)
}

/// Google Directions API provider.
///
/// # Example
///
/// ```no_run
/// use wayfinder::provider::{AsyncReqwestClient, GoogleDirectionsProvider};
///
/// let client = AsyncReqwestClient::new().unwrap();
/// let provider = GoogleDirectionsProvider::new(client, "YOUR_API_KEY".to_string());
/// // Hand the provider to a RouteAcquirer...
/// ```
pub struct GoogleDirectionsProvider<C: AsyncHttpClient> {
    http_client: C,
    api_key: String,
}

impl<C: AsyncHttpClient> GoogleDirectionsProvider<C> {
    /// Creates a new directions provider with the given API key.
    pub fn new(http_client: C, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
        }
    }

    /// Builds the request URL. Parameters are percent-encoded by `Url`.
    fn build_url(&self, request: &DirectionsRequest) -> Result<Url, ProviderError> {
        Url::parse_with_params(
            DIRECTIONS_ENDPOINT,
            &[
                ("origin", format_location(request.origin)),
                ("destination", format_location(request.destination)),
                ("mode", request.mode.as_str().to_string()),
                ("alternatives", request.alternatives.to_string()),
                ("key", self.api_key.clone()),
            ],
        )
        .map_err(|e| ProviderError::Http(format!("Invalid directions URL: {}", e)))
    }
}

impl<C: AsyncHttpClient> DirectionsProvider for GoogleDirectionsProvider<C> {
    fn get_route<'a>(
        &'a self,
        request: &'a DirectionsRequest,
    ) -> BoxFuture<'a, Result<DirectionsResponse, ProviderError>> {
        Box::pin(async move {
            let url = self.build_url(request)?;
            let body = self.http_client.get(url.as_str()).await?;

            serde_json::from_slice::<DirectionsResponse>(&body)
                .map_err(|e| ProviderError::Parse(e.to_string()))
        })
    }

    fn name(&self) -> &str {
        "Google Directions"
    }
}

#[derive(Debug, Deserialize)]
struct NearbySearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<NearbySearchResult>,
    #[serde(default)]
    error_message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NearbySearchResult {
    name: String,
    geometry: NearbySearchGeometry,
    #[serde(default)]
    vicinity: Option<String>,
}

#[derive(Debug, Deserialize)]
struct NearbySearchGeometry {
    location: LatLng,
}

/// Google Places nearby search provider.
pub struct GooglePlacesProvider<C: AsyncHttpClient> {
    http_client: C,
    api_key: String,
}

impl<C: AsyncHttpClient> GooglePlacesProvider<C> {
    /// Creates a new places provider with the given API key.
    pub fn new(http_client: C, api_key: String) -> Self {
        Self {
            http_client,
            api_key,
        }
    }

    fn build_url(
        &self,
        location: Coordinate,
        category: &str,
        radius_m: f64,
    ) -> Result<Url, ProviderError> {
        Url::parse_with_params(
            NEARBY_SEARCH_ENDPOINT,
            &[
                ("location", format_location(location)),
                ("radius", format!("{:.0}", radius_m.max(1.0))),
                ("type", category.to_string()),
                ("key", self.api_key.clone()),
            ],
        )
        .map_err(|e| ProviderError::Http(format!("Invalid places URL: {}", e)))
    }
}

impl<C: AsyncHttpClient> PlacesProvider for GooglePlacesProvider<C> {
    fn search_nearby<'a>(
        &'a self,
        location: Coordinate,
        category: &'a str,
        radius_m: f64,
    ) -> BoxFuture<'a, Result<Vec<NearbyPlace>, ProviderError>> {
        Box::pin(async move {
            let url = self.build_url(location, category, radius_m)?;
            let body = self.http_client.get(url.as_str()).await?;

            let response: NearbySearchResponse =
                serde_json::from_slice(&body).map_err(|e| ProviderError::Parse(e.to_string()))?;

            match response.status.as_str() {
                STATUS_OK => Ok(response
                    .results
                    .into_iter()
                    .map(|r| NearbyPlace {
                        name: r.name,
                        location: r.geometry.location.into(),
                        vicinity: r.vicinity,
                    })
                    .collect()),
                STATUS_ZERO_RESULTS => Ok(Vec::new()),
                other => {
                    tracing::warn!(
                        status = other,
                        message = response.error_message.as_deref().unwrap_or(""),
                        "Nearby search failed"
                    );
                    Err(ProviderError::Status(other.to_string()))
                }
            }
        })
    }
}
