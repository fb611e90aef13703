//! # Buffer Builder
//!
//! Expands a decoded route into a claimable polygon.
//!
//! Three outcomes, tried in order:
//!
//! 1. **Closed loop** — the route's endpoints sit within the closure
//!    tolerance and the closed ring is simple: the claim is the full
//!    enclosed area, kind [`TerritoryKind::Polygon`].
//! 2. **Interior loop** — the route crosses itself: the largest simple loop
//!    between two crossing segments is extracted, kind
//!    [`TerritoryKind::Loop`].
//! 3. **Corridor** — fallback: the route is offset by the activity's buffer
//!    half-width on both sides with rounded, arc-quantized joins, then
//!    simplified, kind [`TerritoryKind::Corridor`].
//!
//! Corridor construction happens in a local planar meter frame: one capsule
//! (stadium) polygon per segment, unioned, largest component kept. The
//! simplification tolerance is a fraction of the buffer half-width rather
//! than an absolute constant, so vertex reduction behaves the same for a
//! 500 m jog and a 100 km ride.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use geo::{Area, Coord, Line, LineString, MultiPolygon, Polygon, Simplify};
use geo::BooleanOps;
use log::debug;

use crate::geo_utils::{haversine_distance, LocalFrame};
use crate::{algebra, ActivityKind, EngineConfig, EngineError, TerritoryKind};

/// A buffered claim candidate, before conflict resolution.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CandidatePolygon {
    /// Claimed geometry in longitude/latitude degrees.
    pub polygon: Polygon<f64>,
    /// How the geometry was derived from the route.
    pub kind: TerritoryKind,
    /// Area in square meters.
    pub area_sqm: f64,
    /// Buffer half-width used, in meters. Zero for loop claims.
    pub buffer_meters: f64,
}

/// Build the claim candidate for a route.
///
/// # Errors
///
/// Returns [`EngineError::DegenerateGeometry`] when no policy yields a
/// polygon at or above the minimum survivable area.
pub fn build_candidate(
    route: &LineString<f64>,
    activity: &ActivityKind,
    config: &EngineConfig,
) -> Result<CandidatePolygon, EngineError> {
    if route.0.len() < 2 {
        return Err(EngineError::DegenerateGeometry(
            "route needs at least 2 points".to_string(),
        ));
    }

    let first = route.0[0];
    let last = route.0[route.0.len() - 1];
    let closure_gap = haversine_distance(first, last);

    if closure_gap <= config.loop_closure_tolerance_meters {
        if let Some(polygon) = closed_loop_polygon(route, config) {
            let area_sqm = algebra::area_sqm(&polygon);
            debug!("route closes a simple loop, claiming full area ({area_sqm:.0} m2)");
            return Ok(CandidatePolygon {
                polygon,
                kind: TerritoryKind::Polygon,
                area_sqm,
                buffer_meters: 0.0,
            });
        }
    }

    if let Some(polygon) = extract_largest_loop(route, config) {
        let area_sqm = algebra::area_sqm(&polygon);
        debug!("extracted interior loop from self-intersecting route ({area_sqm:.0} m2)");
        return Ok(CandidatePolygon {
            polygon,
            kind: TerritoryKind::Loop,
            area_sqm,
            buffer_meters: 0.0,
        });
    }

    let half_width = activity.buffer_meters(config);
    let polygon = corridor_polygon(route, half_width, config)?;
    let area_sqm = algebra::area_sqm(&polygon);
    if area_sqm < config.min_area_sqm {
        return Err(EngineError::DegenerateGeometry(format!(
            "buffered corridor area {area_sqm:.1} m2 is below the {:.0} m2 minimum",
            config.min_area_sqm
        )));
    }

    debug!("buffered corridor at {half_width:.0} m half-width ({area_sqm:.0} m2)");
    Ok(CandidatePolygon {
        polygon,
        kind: TerritoryKind::Corridor,
        area_sqm,
        buffer_meters: half_width,
    })
}

// =============================================================================
// Loop Policy
// =============================================================================

/// Close the route into a ring and accept it if simple and large enough.
fn closed_loop_polygon(route: &LineString<f64>, config: &EngineConfig) -> Option<Polygon<f64>> {
    let mut coords = route.0.clone();
    if coords.first() != coords.last() {
        coords.push(coords[0]);
    }
    if coords.len() < 4 {
        return None;
    }

    let ring = LineString::new(coords);
    if !algebra::ring_is_simple(&ring) {
        return None;
    }

    let polygon = Polygon::new(ring, vec![]);
    if algebra::area_sqm(&polygon) < config.min_area_sqm {
        return None;
    }
    Some(polygon)
}

/// Extract the largest simple loop of a self-intersecting route.
///
/// Every proper crossing between segments `i < j` bounds a candidate loop:
/// the sub-path strictly between the two segments, closed at the crossing
/// point. The largest candidate that is itself simple and above the minimum
/// area wins.
fn extract_largest_loop(route: &LineString<f64>, config: &EngineConfig) -> Option<Polygon<f64>> {
    let crossings = algebra::self_intersections(route);
    if crossings.is_empty() {
        return None;
    }

    let mut best: Option<(f64, Polygon<f64>)> = None;

    for (i, j, crossing) in crossings {
        // Loop = crossing point, the vertices after segment i up to and
        // including segment j's start, back to the crossing point.
        let mut coords = Vec::with_capacity(j - i + 2);
        coords.push(crossing);
        coords.extend(route.0[i + 1..=j].iter().copied());
        coords.push(crossing);
        if coords.len() < 4 {
            continue;
        }

        let ring = LineString::new(coords);
        if !algebra::ring_is_simple(&ring) {
            continue;
        }

        let polygon = Polygon::new(ring, vec![]);
        let area = algebra::area_sqm(&polygon);
        if area < config.min_area_sqm {
            continue;
        }

        if best.as_ref().map_or(true, |(best_area, _)| area > *best_area) {
            best = Some((area, polygon));
        }
    }

    best.map(|(_, polygon)| polygon)
}

// =============================================================================
// Corridor Buffering
// =============================================================================

/// Offset the route by `half_width` meters on both sides with rounded caps.
fn corridor_polygon(
    route: &LineString<f64>,
    half_width: f64,
    config: &EngineConfig,
) -> Result<Polygon<f64>, EngineError> {
    let frame = LocalFrame::for_linestring(route)
        .ok_or_else(|| EngineError::DegenerateGeometry("empty route".to_string()))?;
    let line_m = frame.project_linestring(route);

    let mut acc: Option<MultiPolygon<f64>> = None;
    for segment in line_m.lines() {
        let caps = MultiPolygon::new(vec![capsule(segment, half_width, config.arc_steps)]);
        acc = Some(match acc {
            None => caps,
            Some(mp) => mp.union(&caps),
        });
    }

    let buffered = acc.ok_or_else(|| {
        EngineError::DegenerateGeometry("route has no segments".to_string())
    })?;

    // Largest component; a GPS corridor only fragments on pathological input
    let polygon = buffered
        .0
        .into_iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))
        .ok_or_else(|| EngineError::DegenerateGeometry("empty buffer result".to_string()))?;

    let tolerance = half_width * config.simplify_tolerance_ratio;
    let simplified = polygon.simplify(&tolerance);

    Ok(frame.unproject_polygon(&simplified))
}

/// Stadium polygon around a segment: two offset sides joined by semicircle
/// caps sampled at `arc_steps` points each. Collapses to a circle for a
/// zero-length segment.
fn capsule(segment: Line<f64>, radius: f64, arc_steps: u32) -> Polygon<f64> {
    let dx = segment.end.x - segment.start.x;
    let dy = segment.end.y - segment.start.y;
    let length = (dx * dx + dy * dy).sqrt();

    if length < 1e-9 {
        return circle(segment.start, radius, arc_steps * 4);
    }

    let heading = dy.atan2(dx);
    let steps = arc_steps.max(1) as usize;
    let mut coords = Vec::with_capacity(2 * steps + 4);

    // End cap: sweep from the left offset around to the right offset
    for k in 0..=steps {
        let angle = heading + FRAC_PI_2 - PI * k as f64 / steps as f64;
        coords.push(Coord {
            x: segment.end.x + radius * angle.cos(),
            y: segment.end.y + radius * angle.sin(),
        });
    }
    // Start cap: continue the sweep back to the left offset
    for k in 0..=steps {
        let angle = heading - FRAC_PI_2 - PI * k as f64 / steps as f64;
        coords.push(Coord {
            x: segment.start.x + radius * angle.cos(),
            y: segment.start.y + radius * angle.sin(),
        });
    }
    coords.push(coords[0]);

    Polygon::new(LineString::new(coords), vec![])
}

/// Regular polygon approximating a circle.
fn circle(center: Coord<f64>, radius: f64, steps: u32) -> Polygon<f64> {
    let steps = steps.max(4) as usize;
    let coords = (0..=steps)
        .map(|k| {
            let angle = TAU * k as f64 / steps as f64;
            Coord {
                x: center.x + radius * angle.cos(),
                y: center.y + radius * angle.sin(),
            }
        })
        .collect();
    Polygon::new(LineString::new(coords), vec![])
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn relative_close(a: f64, b: f64, tolerance: f64) -> bool {
        (a - b).abs() <= b.abs() * tolerance
    }

    #[test]
    fn test_straight_corridor_area() {
        // ~1113 m of due-east travel at the equator
        let route = LineString::from(vec![(0.0, 0.0), (0.01, 0.0)]);
        let candidate =
            build_candidate(&route, &ActivityKind::Run, &EngineConfig::default()).unwrap();

        assert_eq!(candidate.kind, TerritoryKind::Corridor);
        assert_eq!(candidate.buffer_meters, 50.0);

        // Rectangle plus two rounded caps: 2 * 50 * length + pi * 50^2
        let length = 0.01 * 111_320.0;
        let expected = 2.0 * 50.0 * length + PI * 50.0 * 50.0;
        assert!(
            relative_close(candidate.area_sqm, expected, 0.10),
            "area {} vs expected {expected}",
            candidate.area_sqm
        );
    }

    #[test]
    fn test_ride_buffer_is_wider() {
        let route = LineString::from(vec![(0.0, 0.0), (0.01, 0.0)]);
        let config = EngineConfig::default();

        let run = build_candidate(&route, &ActivityKind::Run, &config).unwrap();
        let ride = build_candidate(&route, &ActivityKind::Ride, &config).unwrap();

        assert_eq!(ride.buffer_meters, 100.0);
        assert!(ride.area_sqm > run.area_sqm * 1.8);
    }

    #[test]
    fn test_corner_corridor_stays_single_polygon() {
        let route = LineString::from(vec![(0.0, 0.0), (0.01, 0.0), (0.01, 0.01)]);
        let candidate =
            build_candidate(&route, &ActivityKind::Run, &EngineConfig::default()).unwrap();

        assert_eq!(candidate.kind, TerritoryKind::Corridor);
        // Two legs of ~1113 m each
        let leg = 0.01 * 111_320.0;
        let expected = 2.0 * 50.0 * 2.0 * leg;
        assert!(relative_close(candidate.area_sqm, expected, 0.15));
    }

    #[test]
    fn test_closed_loop_claims_full_area() {
        // A square lap ending ~6 m from the start
        let route = LineString::from(vec![
            (0.0, 0.0),
            (0.01, 0.0),
            (0.01, 0.01),
            (0.0, 0.01),
            (0.00005, 0.00002),
        ]);
        let candidate =
            build_candidate(&route, &ActivityKind::Run, &EngineConfig::default()).unwrap();

        assert_eq!(candidate.kind, TerritoryKind::Polygon);
        assert_eq!(candidate.buffer_meters, 0.0);

        // Full enclosed ~1.24 km^2, far more than the ~225k m^2 corridor
        assert!(
            relative_close(candidate.area_sqm, 1.24e6, 0.05),
            "area was {}",
            candidate.area_sqm
        );
    }

    #[test]
    fn test_self_intersecting_route_extracts_loop() {
        // Endpoints far apart, path crosses itself once
        let route = LineString::from(vec![
            (0.0, 0.0),
            (0.01, 0.01),
            (0.01, 0.0),
            (0.0, 0.01),
        ]);
        let candidate =
            build_candidate(&route, &ActivityKind::Run, &EngineConfig::default()).unwrap();

        assert_eq!(candidate.kind, TerritoryKind::Loop);
        // Triangle between the crossing at (0.005, 0.005) and the two bends
        assert!(
            relative_close(candidate.area_sqm, 3.1e5, 0.10),
            "area was {}",
            candidate.area_sqm
        );
    }

    #[test]
    fn test_stationary_route_buffers_to_circle() {
        let route = LineString::from(vec![(0.001, 0.001), (0.001, 0.001)]);
        let candidate =
            build_candidate(&route, &ActivityKind::Run, &EngineConfig::default()).unwrap();

        assert_eq!(candidate.kind, TerritoryKind::Corridor);
        let expected = PI * 50.0 * 50.0;
        assert!(relative_close(candidate.area_sqm, expected, 0.10));
    }

    #[test]
    fn test_too_short_route_is_error() {
        let route = LineString::from(vec![(0.0, 0.0)]);
        assert!(matches!(
            build_candidate(&route, &ActivityKind::Run, &EngineConfig::default()),
            Err(EngineError::DegenerateGeometry(_))
        ));
    }
}
