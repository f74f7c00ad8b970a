//! Geodesy utilities
//!
//! Pure functions over WGS-84 coordinates: great-circle distance, initial
//! bearing, compass sector mapping and bounding boxes. Everything here is
//! deterministic and allocation-free except [`bounding_box`] input handling
//! and [`polyline::decode`].

pub mod polyline;
mod types;

pub use types::{
    BoundingBox, CardinalDirection, Coordinate, GeoError, MAX_LAT, MAX_LON, MIN_LAT, MIN_LON,
};

/// Mean Earth radius used by the haversine formula, in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Width of one compass sector in degrees.
const SECTOR_DEGREES: f64 = 45.0;

/// Great-circle distance between two coordinates in meters (haversine).
#[inline]
pub fn distance_meters(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    // Clamp guards against h drifting above 1.0 for near-antipodal points
    let c = 2.0 * h.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Initial bearing (forward azimuth) from `a` to `b` in degrees, `[0, 360)`.
///
/// 0 = north, 90 = east.
#[inline]
pub fn initial_bearing_degrees(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.lat.to_radians();
    let lat2 = b.lat.to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();

    let bearing = y.atan2(x).to_degrees();
    let normalized = if bearing < 0.0 {
        bearing + 360.0
    } else {
        bearing
    };

    // -0.0 + 360 can round to exactly 360
    if normalized >= 360.0 {
        normalized - 360.0
    } else {
        normalized
    }
}

/// Map a bearing to one of eight compass sectors.
///
/// Uses `round(bearing / 45) mod 8`, so sector 8 wraps back to north.
/// Negative bearings and bearings beyond 360 are accepted. The bearing is
/// normalised into [0, 360) first; `f64::round` rounds halves away from
/// zero, so -22.5 and 337.5 must round from the same value.
#[inline]
pub fn cardinal_direction(bearing_degrees: f64) -> CardinalDirection {
    let normalized = bearing_degrees.rem_euclid(360.0);
    let index = (normalized / SECTOR_DEGREES).round() as i64;
    CardinalDirection::ALL[index.rem_euclid(8) as usize]
}

/// Compute the lat/lon bounds enclosing all points.
pub fn bounding_box(points: &[Coordinate]) -> Result<BoundingBox, GeoError> {
    let first = points.first().ok_or(GeoError::EmptyInput)?;

    let mut southwest = *first;
    let mut northeast = *first;
    for point in &points[1..] {
        southwest.lat = southwest.lat.min(point.lat);
        southwest.lon = southwest.lon.min(point.lon);
        northeast.lat = northeast.lat.max(point.lat);
        northeast.lon = northeast.lon.max(point.lon);
    }

    Ok(BoundingBox {
        southwest,
        northeast,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: Coordinate = Coordinate::new(51.5074, -0.1278);
    const PARIS: Coordinate = Coordinate::new(48.8566, 2.3522);

    // ─────────────────────────────────────────────────────────────────────────
    // Distance
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_distance_london_paris() {
        let d = distance_meters(LONDON, PARIS);
        // Published great-circle distance is ~343.5 km
        assert!((d - 343_500.0).abs() < 2_000.0, "got {} m", d);
    }

    #[test]
    fn test_distance_equator_small_offset() {
        let d = distance_meters(Coordinate::new(0.0, 0.0), Coordinate::new(0.0, 0.009));
        assert!((d - 1000.8).abs() < 1.0, "got {} m", d);
    }

    #[test]
    fn test_distance_same_point_is_zero() {
        assert_eq!(distance_meters(LONDON, LONDON), 0.0);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bearing
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_bearing_cardinal_axes() {
        let origin = Coordinate::new(0.0, 0.0);
        let north = initial_bearing_degrees(origin, Coordinate::new(1.0, 0.0));
        let east = initial_bearing_degrees(origin, Coordinate::new(0.0, 1.0));
        let south = initial_bearing_degrees(origin, Coordinate::new(-1.0, 0.0));
        let west = initial_bearing_degrees(origin, Coordinate::new(0.0, -1.0));

        assert!(north.abs() < 1e-9, "north: {}", north);
        assert!((east - 90.0).abs() < 1e-9, "east: {}", east);
        assert!((south - 180.0).abs() < 1e-9, "south: {}", south);
        assert!((west - 270.0).abs() < 1e-9, "west: {}", west);
    }

    #[test]
    fn test_bearing_negative_is_normalized() {
        // Northwest from origin yields a negative atan2 result internally
        let b = initial_bearing_degrees(Coordinate::new(0.0, 0.0), Coordinate::new(1.0, -1.0));
        assert!((b - 315.0).abs() < 0.1, "got {}", b);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Cardinal direction
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_cardinal_sector_boundaries() {
        assert_eq!(cardinal_direction(0.0), CardinalDirection::North);
        assert_eq!(cardinal_direction(22.4), CardinalDirection::North);
        assert_eq!(cardinal_direction(22.6), CardinalDirection::Northeast);
        assert_eq!(cardinal_direction(90.0), CardinalDirection::East);
        assert_eq!(cardinal_direction(180.0), CardinalDirection::South);
        assert_eq!(cardinal_direction(225.0), CardinalDirection::Southwest);
        assert_eq!(cardinal_direction(315.0), CardinalDirection::Northwest);
    }

    #[test]
    fn test_cardinal_wraps_to_north() {
        assert_eq!(cardinal_direction(350.0), CardinalDirection::North);
        assert_eq!(cardinal_direction(359.9), CardinalDirection::North);
        assert_eq!(cardinal_direction(360.0), CardinalDirection::North);
    }

    #[test]
    fn test_cardinal_negative_bearing() {
        assert_eq!(cardinal_direction(-90.0), CardinalDirection::West);
        assert_eq!(cardinal_direction(-45.0), CardinalDirection::Northwest);
    }

    #[test]
    fn test_cardinal_negative_half_sector_boundaries() {
        for bearing in [-22.5, -67.5, -112.5, -157.5, -202.5, -337.5] {
            assert_eq!(
                cardinal_direction(bearing),
                cardinal_direction(bearing + 360.0),
                "bearing {}",
                bearing
            );
        }
        assert_eq!(cardinal_direction(-22.5), CardinalDirection::North);
        assert_eq!(cardinal_direction(-67.5), CardinalDirection::Northwest);
        assert_eq!(cardinal_direction(-112.5), CardinalDirection::West);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bounding box
    // ─────────────────────────────────────────────────────────────────────────

    #[test]
    fn test_bounding_box_of_points() {
        let bbox = bounding_box(&[LONDON, PARIS, Coordinate::new(50.0, -1.0)]).unwrap();
        assert_eq!(bbox.southwest, Coordinate::new(48.8566, -1.0));
        assert_eq!(bbox.northeast, Coordinate::new(51.5074, 2.3522));
    }

    #[test]
    fn test_bounding_box_single_point() {
        let bbox = bounding_box(&[PARIS]).unwrap();
        assert_eq!(bbox.southwest, PARIS);
        assert_eq!(bbox.northeast, PARIS);
    }

    #[test]
    fn test_bounding_box_empty_input() {
        assert_eq!(bounding_box(&[]), Err(GeoError::EmptyInput));
    }

    // Property-based tests using proptest
    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        fn coordinate() -> impl Strategy<Value = Coordinate> {
            (-89.0..89.0_f64, -179.0..179.0_f64).prop_map(|(lat, lon)| Coordinate::new(lat, lon))
        }

        proptest! {
            #[test]
            fn test_distance_is_symmetric(a in coordinate(), b in coordinate()) {
                let ab = distance_meters(a, b);
                let ba = distance_meters(b, a);
                prop_assert!(
                    (ab - ba).abs() < 1e-6,
                    "distance not symmetric: {} vs {}", ab, ba
                );
            }

            #[test]
            fn test_distance_to_self_is_zero(a in coordinate()) {
                prop_assert_eq!(distance_meters(a, a), 0.0);
            }

            #[test]
            fn test_bearing_in_range(a in coordinate(), b in coordinate()) {
                let bearing = initial_bearing_degrees(a, b);
                prop_assert!((0.0..360.0).contains(&bearing), "bearing {} out of range", bearing);
            }

            #[test]
            fn test_cardinal_is_periodic(bearing in -720.0..720.0_f64) {
                prop_assert_eq!(cardinal_direction(bearing), cardinal_direction(bearing + 360.0));
            }

            #[test]
            fn test_bounding_box_contains_all_points(
                points in proptest::collection::vec(coordinate(), 1..20)
            ) {
                let bbox = bounding_box(&points)?;
                for point in &points {
                    prop_assert!(bbox.contains(*point));
                }
            }
        }
    }
}
