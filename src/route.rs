//! # Route Decoder
//!
//! Turns a compact encoded-polyline string (the Google/Strava format,
//! precision 5) into an ordered longitude-first coordinate sequence.
//!
//! Decoding is the only fallible entry point of a claim: a malformed
//! encoding aborts the whole attempt, so callers must not proceed to
//! buffering on error.

use geo::LineString;
use log::debug;

use crate::geo_utils::{self, coord_is_valid};
use crate::EngineError;

/// Precision of the encoded polyline format (5 decimal places, ~1.1 m).
const POLYLINE_PRECISION: u32 = 5;

/// Decode an encoded polyline into a route.
///
/// The decoded coordinates are longitude-first (`x = lng`, `y = lat`). A
/// route must contain at least two points with valid WGS84 coordinates.
///
/// # Errors
///
/// Returns [`EngineError::Decode`] for malformed encodings, routes shorter
/// than two points, or out-of-range coordinates.
///
/// # Example
///
/// ```rust
/// use territory_engine::decode_route;
///
/// let route = decode_route("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
/// assert_eq!(route.0.len(), 3);
/// assert!((route.0[0].x - (-120.2)).abs() < 1e-6);
/// assert!((route.0[0].y - 38.5).abs() < 1e-6);
/// ```
pub fn decode_route(encoded: &str) -> Result<LineString<f64>, EngineError> {
    let line = polyline::decode_polyline(encoded, POLYLINE_PRECISION)
        .map_err(|e| EngineError::Decode(e.to_string()))?;

    if line.0.len() < 2 {
        return Err(EngineError::Decode(format!(
            "route has {} points, need at least 2",
            line.0.len()
        )));
    }

    if let Some(bad) = line.0.iter().find(|c| !coord_is_valid(**c)) {
        return Err(EngineError::Decode(format!(
            "route contains out-of-range coordinate ({}, {})",
            bad.x, bad.y
        )));
    }

    debug!("decoded route: {} points", line.0.len());
    Ok(line)
}

/// Total length of a route in meters (haversine sum over segments).
pub fn route_length_meters(route: &LineString<f64>) -> f64 {
    route
        .lines()
        .map(|seg| geo_utils::haversine_distance(seg.start, seg.end))
        .sum()
}
