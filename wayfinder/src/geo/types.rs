//! Geographic value types.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Minimum valid latitude in degrees.
pub const MIN_LAT: f64 = -90.0;

/// Maximum valid latitude in degrees.
pub const MAX_LAT: f64 = 90.0;

/// Minimum valid longitude in degrees.
pub const MIN_LON: f64 = -180.0;

/// Maximum valid longitude in degrees.
pub const MAX_LON: f64 = 180.0;

/// Errors from geodesy operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeoError {
    /// Latitude or longitude is NaN, infinite, or out of range.
    #[error("Invalid coordinate: ({lat}, {lon})")]
    InvalidCoordinate { lat: f64, lon: f64 },

    /// An operation that needs at least one point received none.
    #[error("Empty input: at least one coordinate is required")]
    EmptyInput,

    /// Encoded polyline could not be decoded.
    #[error("Malformed polyline: {0}")]
    MalformedPolyline(String),
}

/// A WGS-84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    /// Latitude in degrees (-90 to 90)
    pub lat: f64,
    /// Longitude in degrees (-180 to 180)
    pub lon: f64,
}

impl Coordinate {
    /// Create a new coordinate. No validation is performed.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Whether both components are finite and within WGS-84 bounds.
    pub fn is_valid(&self) -> bool {
        self.lat.is_finite()
            && self.lon.is_finite()
            && (MIN_LAT..=MAX_LAT).contains(&self.lat)
            && (MIN_LON..=MAX_LON).contains(&self.lon)
    }

    /// Returns the coordinate unchanged if valid.
    pub fn validate(self) -> Result<Self, GeoError> {
        if self.is_valid() {
            Ok(self)
        } else {
            Err(GeoError::InvalidCoordinate {
                lat: self.lat,
                lon: self.lon,
            })
        }
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}, {:.6})", self.lat, self.lon)
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((lat, lon): (f64, f64)) -> Self {
        Self { lat, lon }
    }
}

/// Axis-aligned lat/lon bounds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Minimum latitude and longitude corner.
    pub southwest: Coordinate,
    /// Maximum latitude and longitude corner.
    pub northeast: Coordinate,
}

impl BoundingBox {
    /// Whether the coordinate lies inside or on the edge of the box.
    pub fn contains(&self, point: Coordinate) -> bool {
        (self.southwest.lat..=self.northeast.lat).contains(&point.lat)
            && (self.southwest.lon..=self.northeast.lon).contains(&point.lon)
    }

    /// Center point of the box.
    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.southwest.lat + self.northeast.lat) / 2.0,
            (self.southwest.lon + self.northeast.lon) / 2.0,
        )
    }
}

/// One of the eight 45° compass sectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardinalDirection {
    North,
    Northeast,
    East,
    Southeast,
    South,
    Southwest,
    West,
    Northwest,
}

impl CardinalDirection {
    /// Sectors in clockwise order starting at north.
    pub const ALL: [CardinalDirection; 8] = [
        CardinalDirection::North,
        CardinalDirection::Northeast,
        CardinalDirection::East,
        CardinalDirection::Southeast,
        CardinalDirection::South,
        CardinalDirection::Southwest,
        CardinalDirection::West,
        CardinalDirection::Northwest,
    ];

    /// Spoken form, e.g. "northeast".
    pub fn as_str(&self) -> &'static str {
        match self {
            CardinalDirection::North => "north",
            CardinalDirection::Northeast => "northeast",
            CardinalDirection::East => "east",
            CardinalDirection::Southeast => "southeast",
            CardinalDirection::South => "south",
            CardinalDirection::Southwest => "southwest",
            CardinalDirection::West => "west",
            CardinalDirection::Northwest => "northwest",
        }
    }
}

impl fmt::Display for CardinalDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
