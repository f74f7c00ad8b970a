//! Normalized route representation.
//!
//! A [`Route`] is what the guidance engine walks: an ordered list of
//! [`RouteStep`]s whose end points mark maneuver completion. It carries no
//! provider-specific types; acquisition converts provider responses into it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geo::{BoundingBox, Coordinate};

/// Where a route came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RouteSource {
    /// Route returned by the directions provider.
    ProviderRoute,
    /// Synthetic origin→destination segment built when the provider failed.
    FallbackStraightLine,
}

impl RouteSource {
    /// Short label for logging.
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteSource::ProviderRoute => "provider",
            RouteSource::FallbackStraightLine => "fallback",
        }
    }
}

impl fmt::Display for RouteSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse maneuver category attached to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ManeuverKind {
    Straight,
    TurnLeft,
    TurnRight,
    SlightLeft,
    SlightRight,
    SharpLeft,
    SharpRight,
    KeepLeft,
    KeepRight,
    UTurn,
    Roundabout,
    Merge,
    Ferry,
    Other,
}

impl ManeuverKind {
    /// Map a provider maneuver tag (e.g. `"turn-slight-left"`) to a kind.
    ///
    /// Returns `None` for an empty tag. Unknown non-empty tags map to
    /// [`ManeuverKind::Other`].
    pub fn from_provider_tag(tag: &str) -> Option<Self> {
        let kind = match tag.trim() {
            "" => return None,
            "straight" => ManeuverKind::Straight,
            "turn-left" => ManeuverKind::TurnLeft,
            "turn-right" => ManeuverKind::TurnRight,
            "turn-slight-left" => ManeuverKind::SlightLeft,
            "turn-slight-right" => ManeuverKind::SlightRight,
            "turn-sharp-left" => ManeuverKind::SharpLeft,
            "turn-sharp-right" => ManeuverKind::SharpRight,
            "keep-left" | "fork-left" | "ramp-left" => ManeuverKind::KeepLeft,
            "keep-right" | "fork-right" | "ramp-right" => ManeuverKind::KeepRight,
            "uturn-left" | "uturn-right" => ManeuverKind::UTurn,
            "roundabout-left" | "roundabout-right" => ManeuverKind::Roundabout,
            "merge" => ManeuverKind::Merge,
            "ferry" | "ferry-train" => ManeuverKind::Ferry,
            _ => ManeuverKind::Other,
        };
        Some(kind)
    }
}

/// One maneuver-to-maneuver segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouteStep {
    /// Where the step begins.
    pub start: Coordinate,
    /// Where the step is considered complete.
    pub end: Coordinate,
    /// Plain-text instruction (HTML stripped, whitespace collapsed).
    pub instruction: String,
    /// Step length in meters (never negative).
    pub distance_m: f64,
    /// Provider-formatted length, e.g. "0.3 km".
    pub distance_text: String,
    /// Expected travel time in seconds.
    pub duration_s: f64,
    /// Provider-formatted travel time, e.g. "4 mins".
    pub duration_text: String,
    /// Optional maneuver category.
    pub maneuver: Option<ManeuverKind>,
}

impl RouteStep {
    /// Whether the end point can be used for progress checks.
    pub fn has_valid_end(&self) -> bool {
        self.end.is_valid()
    }
}

/// A fetched or synthesized route.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    /// Steps in traversal order.
    pub steps: Vec<RouteStep>,
    /// Geometry for rendering.
    pub polyline: Vec<Coordinate>,
    /// Human-readable total distance.
    pub total_distance_text: String,
    /// Human-readable total duration.
    pub total_duration_text: String,
    /// Duration with current traffic, when the provider reports it.
    pub traffic_duration_text: Option<String>,
    /// Bounds of the route geometry.
    pub bounding_box: Option<BoundingBox>,
    /// Provider summary (usually the main road name).
    pub summary: Option<String>,
    /// Origin of the data.
    pub source: RouteSource,
}

impl Route {
    /// Number of steps.
    pub fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Whether there are no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at `index`, if any.
    pub fn step(&self, index: usize) -> Option<&RouteStep> {
        self.steps.get(index)
    }

    /// Final destination: the last step's end point.
    pub fn destination(&self) -> Option<Coordinate> {
        self.steps.last().map(|s| s.end)
    }

    /// Starting point: the first step's start point.
    pub fn origin(&self) -> Option<Coordinate> {
        self.steps.first().map(|s| s.start)
    }

    /// Whether this is the straight-line fallback.
    pub fn is_fallback(&self) -> bool {
        self.source == RouteSource::FallbackStraightLine
    }

    /// Sum of all step distances in meters.
    pub fn total_distance_m(&self) -> f64 {
        self.steps.iter().map(|s| s.distance_m).sum()
    }

    /// Sum of all step durations in seconds.
    pub fn total_duration_s(&self) -> f64 {
        self.steps.iter().map(|s| s.duration_s).sum()
    }

    /// Distance of all steps after `step_index`, in meters.
    pub fn distance_after_step(&self, step_index: usize) -> f64 {
        self.steps
            .iter()
            .skip(step_index + 1)
            .map(|s| s.distance_m)
            .sum()
    }

    /// Duration of all steps after `step_index`, in seconds.
    pub fn duration_after_step(&self, step_index: usize) -> f64 {
        self.steps
            .iter()
            .skip(step_index + 1)
            .map(|s| s.duration_s)
            .sum()
    }
}
