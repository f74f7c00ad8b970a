//! Encoded polyline decoding.
//!
//! Directions providers return route geometry in the "encoded polyline"
//! format: each coordinate is stored as a delta from the previous one,
//! scaled by 1e5, zig-zag encoded, and split into 5-bit chunks offset by 63.

use super::{Coordinate, GeoError};

/// Scale factor for 5-decimal precision.
const PRECISION: f64 = 1e5;

/// ASCII offset applied to every encoded chunk.
const CHUNK_OFFSET: u8 = 63;

/// Continuation flag within a decoded chunk.
const CONTINUATION_BIT: u8 = 0x20;

/// Decode an encoded polyline into coordinates.
///
/// An empty string decodes to an empty list. Accumulated values that
/// overflow, or points outside the valid latitude/longitude range, are
/// reported as malformed.
pub fn decode(encoded: &str) -> Result<Vec<Coordinate>, GeoError> {
    let bytes = encoded.as_bytes();
    let mut points = Vec::new();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lon: i64 = 0;

    while index < bytes.len() {
        lat = accumulate(lat, next_delta(bytes, &mut index)?, index)?;
        if index >= bytes.len() {
            return Err(GeoError::MalformedPolyline(format!(
                "latitude without longitude at byte {}",
                index
            )));
        }
        lon = accumulate(lon, next_delta(bytes, &mut index)?, index)?;

        let point = Coordinate::new(lat as f64 / PRECISION, lon as f64 / PRECISION);
        if !point.is_valid() {
            return Err(GeoError::MalformedPolyline(format!(
                "point ({}, {}) out of range at byte {}",
                point.lat, point.lon, index
            )));
        }
        points.push(point);
    }

    Ok(points)
}

fn accumulate(total: i64, delta: i64, index: usize) -> Result<i64, GeoError> {
    total.checked_add(delta).ok_or_else(|| {
        GeoError::MalformedPolyline(format!("value overflow at byte {}", index))
    })
}

/// Read one zig-zag encoded value starting at `index`.
fn next_delta(bytes: &[u8], index: &mut usize) -> Result<i64, GeoError> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = *bytes.get(*index).ok_or_else(|| {
            GeoError::MalformedPolyline(format!("truncated value at byte {}", index))
        })?;
        if byte < CHUNK_OFFSET {
            return Err(GeoError::MalformedPolyline(format!(
                "invalid character {:?} at byte {}",
                byte as char, index
            )));
        }
        if shift > 60 {
            return Err(GeoError::MalformedPolyline(format!(
                "value too long at byte {}",
                index
            )));
        }

        let chunk = byte - CHUNK_OFFSET;
        *index += 1;
        result |= i64::from(chunk & 0x1f) << shift;
        shift += 5;

        if chunk & CONTINUATION_BIT == 0 {
            break;
        }
    }

    Ok(if result & 1 == 1 {
        !(result >> 1)
    } else {
        result >> 1
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_reference_polyline() {
        // Reference example from the format documentation
        let points = decode("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();

        assert_eq!(points.len(), 3);
        assert_eq!(points[0], Coordinate::new(38.5, -120.2));
        assert_eq!(points[1], Coordinate::new(40.7, -120.95));
        assert_eq!(points[2], Coordinate::new(43.252, -126.453));
    }

    #[test]
    fn test_decode_empty() {
        assert!(decode("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_truncated() {
        // Drop the final character so the last longitude never terminates
        let result = decode("_p~iF~ps|U_ulLnnqC_mqNvxq");
        assert!(matches!(result, Err(GeoError::MalformedPolyline(_))));
    }

    #[test]
    fn test_decode_missing_longitude() {
        let result = decode("_p~iF");
        assert!(matches!(result, Err(GeoError::MalformedPolyline(_))));
    }

    #[test]
    fn test_decode_invalid_character() {
        let result = decode("_p~iF ps|U");
        assert!(matches!(result, Err(GeoError::MalformedPolyline(_))));
    }

    #[test]
    fn test_decode_overflowing_values() {
        // Thirteen-chunk deltas push the running total past i64
        let encoded = "}~~~~~~~~~~~F".repeat(6);
        let result = decode(&encoded);
        assert!(matches!(result, Err(GeoError::MalformedPolyline(_))));
    }

    #[test]
    fn test_decode_out_of_range_point() {
        // Latitude 100.0 is encoded as "_gjaR" with zero longitude "?"
        let result = decode("_gjaR?");
        assert!(matches!(result, Err(GeoError::MalformedPolyline(_))));
    }
}
