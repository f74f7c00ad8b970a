//! Request and response types shared by all collaborator providers.
//!
//! The directions DTOs mirror the widely used Directions JSON layout
//! (`routes[].legs[].steps[]`) so that a provider backed by that API can
//! deserialize straight into them. Other providers construct them by hand.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geo::{BoundingBox, Coordinate};

/// Status string of a successful directions response.
pub const STATUS_OK: &str = "OK";

/// Status string of a search that matched nothing.
pub const STATUS_ZERO_RESULTS: &str = "ZERO_RESULTS";

/// Errors reported by external collaborators.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    /// Transport-level failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The service answered with a non-OK status.
    #[error("Provider returned status {0}")]
    Status(String),

    /// Response body could not be decoded.
    #[error("Failed to parse provider response: {0}")]
    Parse(String),

    /// The collaborator is not available (offline, disabled, no fix).
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    /// The speech sink failed to speak an utterance.
    #[error("Speech error: {0}")]
    Speech(String),
}

/// How the user is travelling.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    #[default]
    Walking,
    Driving,
    Bicycling,
    Transit,
}

impl TravelMode {
    /// Lowercase wire name, e.g. `"walking"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TravelMode::Walking => "walking",
            TravelMode::Driving => "driving",
            TravelMode::Bicycling => "bicycling",
            TravelMode::Transit => "transit",
        }
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for TravelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "walking" | "walk" => Ok(TravelMode::Walking),
            "driving" | "drive" => Ok(TravelMode::Driving),
            "bicycling" | "bicycle" | "bike" => Ok(TravelMode::Bicycling),
            "transit" => Ok(TravelMode::Transit),
            other => Err(format!("unknown travel mode '{}'", other)),
        }
    }
}

/// Parameters of a directions lookup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DirectionsRequest {
    pub origin: Coordinate,
    pub destination: Coordinate,
    pub mode: TravelMode,
    /// Ask the provider for alternative routes as well as the primary one.
    pub alternatives: bool,
}

/// Latitude/longitude pair as serialized by directions services.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl From<LatLng> for Coordinate {
    fn from(value: LatLng) -> Self {
        Coordinate::new(value.lat, value.lng)
    }
}

impl From<Coordinate> for LatLng {
    fn from(value: Coordinate) -> Self {
        LatLng {
            lat: value.lat,
            lng: value.lon,
        }
    }
}

/// A formatted value with its raw number (meters or seconds).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextValue {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub value: f64,
}

/// Encoded route geometry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EncodedPolyline {
    #[serde(default)]
    pub points: String,
}

/// Route bounds as reported by the provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLngBounds {
    pub northeast: LatLng,
    pub southwest: LatLng,
}

impl From<LatLngBounds> for BoundingBox {
    fn from(value: LatLngBounds) -> Self {
        BoundingBox {
            southwest: value.southwest.into(),
            northeast: value.northeast.into(),
        }
    }
}

/// One maneuver in a provider leg.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionsStep {
    pub start_location: Option<LatLng>,
    pub end_location: Option<LatLng>,
    #[serde(default)]
    pub html_instructions: String,
    #[serde(default)]
    pub distance: TextValue,
    #[serde(default)]
    pub duration: TextValue,
    #[serde(default)]
    pub maneuver: Option<String>,
}

/// Origin-to-waypoint portion of a provider route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionsLeg {
    #[serde(default)]
    pub steps: Vec<DirectionsStep>,
    pub distance: Option<TextValue>,
    pub duration: Option<TextValue>,
    pub duration_in_traffic: Option<TextValue>,
}

/// One candidate route.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionsRoute {
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub legs: Vec<DirectionsLeg>,
    #[serde(default)]
    pub overview_polyline: EncodedPolyline,
    pub bounds: Option<LatLngBounds>,
}

impl DirectionsRoute {
    /// Total step count across all legs.
    pub fn step_count(&self) -> usize {
        self.legs.iter().map(|l| l.steps.len()).sum()
    }
}

/// Raw directions answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirectionsResponse {
    pub status: String,
    #[serde(default)]
    pub routes: Vec<DirectionsRoute>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl DirectionsResponse {
    /// Whether the provider reported success.
    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }
}

/// A point of interest near the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlace {
    pub name: String,
    pub location: Coordinate,
    /// Street-level description of where the place is.
    pub vicinity: Option<String>,
}
