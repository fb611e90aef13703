//! # Geographic Utilities
//!
//! Supporting geographic computation for the territory engine: great-circle
//! distance, meter/degree conversion, a local planar frame for buffering, and
//! the territory membership scan.
//!
//! All coordinates are WGS84 longitude/latitude in degrees, longitude first
//! (`Coord { x: lng, y: lat }`). Buffering and inward offsets happen in a
//! [`LocalFrame`]: an equirectangular projection around the geometry's
//! bounding-box center where distances are plain meters. At the scale of a
//! single activity the planar approximation is well within GPS noise.

use geo::{Contains, Coord, Distance, Haversine, LineString, Point, Polygon};

use crate::{Bounds, Territory};

/// Meters per degree of latitude (and of longitude at the equator).
const METERS_PER_DEGREE: f64 = 111_320.0;

// =============================================================================
// Distance Functions
// =============================================================================

/// Great-circle distance between two longitude-first coordinates, in meters.
///
/// # Example
///
/// ```rust
/// use geo::Coord;
/// use territory_engine::geo_utils::haversine_distance;
///
/// let london = Coord { x: -0.1278, y: 51.5074 };
/// let paris = Coord { x: 2.3522, y: 48.8566 };
///
/// let distance = haversine_distance(london, paris);
/// assert!((distance - 343_560.0).abs() < 1000.0); // ~344 km
/// ```
#[inline]
pub fn haversine_distance(a: Coord<f64>, b: Coord<f64>) -> f64 {
    Haversine::distance(Point::from(a), Point::from(b))
}

/// Check that a coordinate is finite and within WGS84 bounds.
#[inline]
pub fn coord_is_valid(c: Coord<f64>) -> bool {
    c.x.is_finite()
        && c.y.is_finite()
        && c.y >= -90.0
        && c.y <= 90.0
        && c.x >= -180.0
        && c.x <= 180.0
}

/// Convert meters to approximate degrees at a given latitude.
///
/// At the equator, 1 degree is roughly 111,320 meters; the longitude scale
/// shrinks with `cos(latitude)`. Suitable for bounding-box expansion where a
/// square tolerance is acceptable.
#[inline]
pub fn meters_to_degrees(meters: f64, latitude: f64) -> f64 {
    let lat_rad = latitude.to_radians();
    let meters_per_degree = METERS_PER_DEGREE * lat_rad.cos().max(0.1);
    meters / meters_per_degree
}

// =============================================================================
// Local Planar Frame
// =============================================================================

/// Equirectangular projection around a fixed origin, mapping degrees to local
/// meters.
///
/// Valid for geometry spanning a few kilometers around the origin, which
/// covers any single activity. X is east, Y is north, both in meters.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin: Coord<f64>,
    meters_per_deg_lng: f64,
}

impl LocalFrame {
    /// Frame centered on the given bounds.
    pub fn new(bounds: &Bounds) -> Self {
        let origin = bounds.center();
        let meters_per_deg_lng = METERS_PER_DEGREE * origin.y.to_radians().cos().max(0.01);
        Self { origin, meters_per_deg_lng }
    }

    /// Frame centered on a route's bounding box. `None` for an empty route.
    pub fn for_linestring(line: &LineString<f64>) -> Option<Self> {
        Bounds::from_linestring(line).map(|b| Self::new(&b))
    }

    /// Frame centered on a polygon's bounding box. `None` for an empty ring.
    pub fn for_polygon(polygon: &Polygon<f64>) -> Option<Self> {
        Bounds::from_polygon(polygon).map(|b| Self::new(&b))
    }

    /// Degrees to local meters.
    #[inline]
    pub fn project(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: (c.x - self.origin.x) * self.meters_per_deg_lng,
            y: (c.y - self.origin.y) * METERS_PER_DEGREE,
        }
    }

    /// Local meters back to degrees.
    #[inline]
    pub fn unproject(&self, c: Coord<f64>) -> Coord<f64> {
        Coord {
            x: self.origin.x + c.x / self.meters_per_deg_lng,
            y: self.origin.y + c.y / METERS_PER_DEGREE,
        }
    }

    /// Project a whole route into the frame.
    pub fn project_linestring(&self, line: &LineString<f64>) -> LineString<f64> {
        LineString::new(line.0.iter().map(|c| self.project(*c)).collect())
    }

    /// Project a polygon (all rings) into the frame.
    pub fn project_polygon(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        Polygon::new(
            self.project_linestring(polygon.exterior()),
            polygon.interiors().iter().map(|r| self.project_linestring(r)).collect(),
        )
    }

    /// Map a polygon in the frame back to degrees.
    pub fn unproject_polygon(&self, polygon: &Polygon<f64>) -> Polygon<f64> {
        let unproject_ring = |ring: &LineString<f64>| {
            LineString::new(ring.0.iter().map(|c| self.unproject(*c)).collect())
        };
        Polygon::new(
            unproject_ring(polygon.exterior()),
            polygon.interiors().iter().map(unproject_ring).collect(),
        )
    }
}

// =============================================================================
// Bounding Box Functions
// =============================================================================

/// Check if two bounding boxes overlap, expanded by a buffer in meters.
///
/// Quick spatial pre-filter before polygon-level intersection.
pub fn bounds_overlap(a: &Bounds, b: &Bounds, buffer_meters: f64) -> bool {
    let reference_lat = (a.center().y + b.center().y) / 2.0;
    let buffer_deg = meters_to_degrees(buffer_meters, reference_lat);

    !(a.max_lat + buffer_deg < b.min_lat
        || b.max_lat + buffer_deg < a.min_lat
        || a.max_lng + buffer_deg < b.min_lng
        || b.max_lng + buffer_deg < a.min_lng)
}

// =============================================================================
// Territory Membership
// =============================================================================

/// Find the territory containing a point, if any.
///
/// Linear first-match scan; ties go to the earlier territory in the slice,
/// which is acceptable because resolved territories of different owners do
/// not overlap.
pub fn point_in_territory(point: Coord<f64>, territories: &[Territory]) -> Option<&Territory> {
    let p = Point::from(point);
    territories.iter().find(|t| t.geometry.contains(&p))
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TerritoryKind;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

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

    fn territory(id: &str, owner: &str, geometry: Polygon<f64>) -> Territory {
        Territory {
            id: id.to_string(),
            owner_id: owner.to_string(),
            geometry,
            kind: TerritoryKind::Corridor,
            area_sqm: 0.0,
            captured_at: 0,
            last_defended_at: 0,
        }
    }

    #[test]
    fn test_haversine_distance_same_point() {
        let p = Coord { x: -0.1278, y: 51.5074 };
        assert_eq!(haversine_distance(p, p), 0.0);
    }

    #[test]
    fn test_coord_validity() {
        assert!(coord_is_valid(Coord { x: -0.1278, y: 51.5074 }));
        assert!(!coord_is_valid(Coord { x: 0.0, y: 91.0 }));
        assert!(!coord_is_valid(Coord { x: 181.0, y: 0.0 }));
        assert!(!coord_is_valid(Coord { x: f64::NAN, y: 0.0 }));
    }

    #[test]
    fn test_meters_to_degrees() {
        // At the equator, 111.32 km = 1 degree
        assert!(approx_eq(meters_to_degrees(111_320.0, 0.0), 1.0, 0.01));
        // At higher latitude, the same distance spans more degrees
        assert!(meters_to_degrees(111_320.0, 45.0) > 1.0);
    }

    #[test]
    fn test_local_frame_round_trip() {
        let route = LineString::from(vec![(-0.13, 51.50), (-0.12, 51.51)]);
        let frame = LocalFrame::for_linestring(&route).unwrap();

        let original = Coord { x: -0.125, y: 51.505 };
        let round_tripped = frame.unproject(frame.project(original));
        assert!(approx_eq(round_tripped.x, original.x, 1e-12));
        assert!(approx_eq(round_tripped.y, original.y, 1e-12));
    }

    #[test]
    fn test_local_frame_distances() {
        // 0.01 degrees of latitude is ~1113 meters in any frame
        let route = LineString::from(vec![(0.0, 0.0), (0.0, 0.01)]);
        let frame = LocalFrame::for_linestring(&route).unwrap();
        let projected = frame.project_linestring(&route);

        let dy = projected.0[1].y - projected.0[0].y;
        assert!(approx_eq(dy, 1113.2, 1.0));
    }

    #[test]
    fn test_bounds_overlap() {
        let a = Bounds { min_lng: -0.13, min_lat: 51.50, max_lng: -0.11, max_lat: 51.52 };
        let b = Bounds { min_lng: -0.12, min_lat: 51.51, max_lng: -0.10, max_lat: 51.53 };
        assert!(bounds_overlap(&a, &b, 0.0));

        let far = Bounds { min_lng: 2.30, min_lat: 48.80, max_lng: 2.40, max_lat: 48.90 };
        assert!(!bounds_overlap(&a, &far, 0.0));
        // A very large buffer can still bridge distinct boxes
        let near = Bounds { min_lng: -0.10, min_lat: 51.53, max_lng: -0.09, max_lat: 51.54 };
        assert!(bounds_overlap(&a, &near, 5000.0));
    }

    #[test]
    fn test_point_in_territory_first_match() {
        let territories = vec![
            territory("t1", "alice", square(0.0, 0.0, 0.01)),
            territory("t2", "bob", square(0.005, 0.0, 0.01)),
        ];

        // Inside both squares: the earlier territory wins
        let hit = point_in_territory(Coord { x: 0.007, y: 0.005 }, &territories).unwrap();
        assert_eq!(hit.id, "t1");

        // Inside only the second
        let hit = point_in_territory(Coord { x: 0.012, y: 0.005 }, &territories).unwrap();
        assert_eq!(hit.id, "t2");

        // Outside both
        assert!(point_in_territory(Coord { x: 0.5, y: 0.5 }, &territories).is_none());
    }
}
