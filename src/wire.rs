//! # Storage Boundary Serialization
//!
//! Well-Known-Text conversion for geometry crossing into the storage layer,
//! plus zoom-dependent simplification for map rendering payloads.
//!
//! Ring coordinate order is longitude, latitude; rings are closed (first
//! point repeated as last), which the `geo` polygon type maintains.

use geo::{LineString, Polygon, Simplify};
use wkt::{ToWkt, TryFromWkt};

use crate::EngineError;

/// Serialize a territory polygon to WKT (`POLYGON((lng lat, ...))`).
///
/// # Example
///
/// ```rust
/// use geo::{LineString, Polygon};
/// use territory_engine::wire::polygon_to_wkt;
///
/// let polygon = Polygon::new(
///     LineString::from(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 0.0)]),
///     vec![],
/// );
/// assert!(polygon_to_wkt(&polygon).starts_with("POLYGON("));
/// ```
pub fn polygon_to_wkt(polygon: &Polygon<f64>) -> String {
    polygon.wkt_string()
}

/// Serialize a route to WKT (`LINESTRING(lng lat, ...)`).
pub fn linestring_to_wkt(line: &LineString<f64>) -> String {
    line.wkt_string()
}

/// Parse a stored territory polygon from WKT.
pub fn polygon_from_wkt(text: &str) -> Result<Polygon<f64>, EngineError> {
    Polygon::try_from_wkt_str(text).map_err(|e| EngineError::InvalidTerritory(e.to_string()))
}

/// Simplify a territory polygon for rendering at a given zoom level.
///
/// More aggressive at lower zooms, where sub-pixel vertices only inflate the
/// payload. Tolerances are in degrees.
pub fn simplify_for_zoom(polygon: &Polygon<f64>, zoom: u8) -> Polygon<f64> {
    let tolerance = if zoom > 14 {
        0.00001
    } else if zoom > 12 {
        0.0001
    } else {
        0.0005
    };
    polygon.simplify(&tolerance)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algebra;

    fn square(min_x: f64, min_y: f64, size: f64) -> Polygon<f64> {
        Polygon::new(
            LineString::from(vec![
                (min_x, min_y),
                (min_x + size, min_y),
                (min_x + size, min_y + size),
                (min_x, min_y + size),
                (min_x, min_y),
            ]),
            vec![],
        )
    }

    #[test]
    fn test_polygon_wkt_round_trip() {
        let original = square(-0.13, 51.50, 0.01);
        let text = polygon_to_wkt(&original);
        assert!(text.starts_with("POLYGON("));

        let parsed = polygon_from_wkt(&text).unwrap();
        assert_eq!(parsed.exterior().0.len(), original.exterior().0.len());
        let area_delta = (algebra::area_sqm(&parsed) - algebra::area_sqm(&original)).abs();
        assert!(area_delta < 1.0);
    }

    #[test]
    fn test_ring_stays_closed_through_wkt() {
        let parsed = polygon_from_wkt(&polygon_to_wkt(&square(0.0, 0.0, 0.01))).unwrap();
        let ring = parsed.exterior();
        assert_eq!(ring.0.first(), ring.0.last());
        assert!(ring.0.len() >= 4);
    }

    #[test]
    fn test_linestring_wkt() {
        let line = LineString::from(vec![(-120.2, 38.5), (-120.95, 40.7)]);
        let text = linestring_to_wkt(&line);
        assert!(text.starts_with("LINESTRING("));
    }

    #[test]
    fn test_bad_wkt_is_error() {
        assert!(matches!(
            polygon_from_wkt("POLYGON((not numbers))"),
            Err(EngineError::InvalidTerritory(_))
        ));
        // Wrong geometry type
        assert!(polygon_from_wkt("POINT(1 2)").is_err());
    }

    #[test]
    fn test_zoom_simplification_reduces_vertices() {
        // A dense ring: a 64-gon approximating a circle of ~0.005 degrees
        let steps = 64;
        let ring: Vec<(f64, f64)> = (0..=steps)
            .map(|k| {
                let angle = std::f64::consts::TAU * k as f64 / steps as f64;
                (0.005 * angle.cos(), 0.005 * angle.sin())
            })
            .collect();
        let dense = Polygon::new(LineString::from(ring), vec![]);

        let coarse = simplify_for_zoom(&dense, 10);
        let fine = simplify_for_zoom(&dense, 16);

        assert!(coarse.exterior().0.len() < dense.exterior().0.len());
        assert!(coarse.exterior().0.len() <= fine.exterior().0.len());
    }
}
