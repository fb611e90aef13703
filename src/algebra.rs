//! # Polygon Algebra
//!
//! Boolean operations and area computation over planar polygons, with
//! degenerate-result handling.
//!
//! All operations accept simple single-exterior-ring polygons in
//! longitude/latitude degrees. Boolean results can be multi-part or empty for
//! tangent inputs and slivers; [`intersect`] and [`difference`] collapse a
//! multi-part result to its largest component and return `None` whenever the
//! outcome falls below the configured minimum area ([`EngineConfig::min_area_sqm`]),
//! never a polygon with near-zero area. [`intersect_all`] keeps every
//! component of a multi-part overlap for callers that must account for all
//! of it. Areas are square meters on the WGS84 sphere (Chamberlain-Duquette,
//! holes subtracted), matching what callers persist.

use geo::algorithm::line_intersection::{line_intersection, LineIntersection};
use geo::{BooleanOps, ChamberlainDuquetteArea, Coord, LineString, MultiPolygon, Polygon};

use crate::geo_utils::coord_is_valid;
use crate::{EngineConfig, EngineError};

// =============================================================================
// Area
// =============================================================================

/// Area of a polygon in square meters.
///
/// Uses the Chamberlain-Duquette spherical excess formula per ring, accurate
/// to well under 0.1% at activity scale. Hole areas are subtracted from the
/// exterior.
pub fn area_sqm(polygon: &Polygon<f64>) -> f64 {
    let exterior = ring_area_sqm(polygon.exterior());
    let holes: f64 = polygon.interiors().iter().map(ring_area_sqm).sum();
    (exterior - holes).max(0.0)
}

/// Total area of a multi-part geometry in square meters.
pub fn multi_area_sqm(mp: &MultiPolygon<f64>) -> f64 {
    mp.0.iter().map(area_sqm).sum()
}

fn ring_area_sqm(ring: &LineString<f64>) -> f64 {
    Polygon::new(ring.clone(), vec![]).chamberlain_duquette_unsigned_area()
}

// =============================================================================
// Boolean Operations
// =============================================================================

/// Intersection of two polygons.
///
/// Returns `None` when the polygons do not overlap or the overlap is below
/// the minimum survivable area.
pub fn intersect(
    a: &Polygon<f64>,
    b: &Polygon<f64>,
    config: &EngineConfig,
) -> Option<Polygon<f64>> {
    meaningful(a.intersection(b), config.min_area_sqm)
}

/// Full intersection of two polygons, keeping every component.
///
/// The resolver removes the complete overlap from both sides, so a claim
/// crossing a territory in several places can never leave the same ground to
/// both owners; collapsing to a single component happens only on persisted
/// geometry. Returns `None` when the total overlap is below the minimum
/// survivable area.
pub fn intersect_all(
    a: &Polygon<f64>,
    b: &Polygon<f64>,
    config: &EngineConfig,
) -> Option<MultiPolygon<f64>> {
    let mp = a.intersection(b);
    if multi_area_sqm(&mp) < config.min_area_sqm {
        None
    } else {
        Some(mp)
    }
}

/// Union of two polygons.
///
/// Assumed well-defined for inputs known to intersect; a multi-part result
/// collapses to its largest component. Returns `None` only for degenerate
/// inputs that produce an empty result.
pub fn union(a: &Polygon<f64>, b: &Polygon<f64>) -> Option<Polygon<f64>> {
    largest_component(a.union(b))
}

/// `a` minus `b`.
///
/// Returns `None` when nothing meaningful remains (fully covered, or only
/// slivers below the minimum area). A partial result keeps any interior
/// rings produced when `b` punches through the middle of `a`.
pub fn difference(
    a: &Polygon<f64>,
    b: &Polygon<f64>,
    config: &EngineConfig,
) -> Option<Polygon<f64>> {
    meaningful(a.difference(b), config.min_area_sqm)
}

/// `a` minus a multi-part geometry, collapsed to its largest component.
///
/// Same contract as [`difference`], with the subtrahend allowed to be the
/// full multi-part overlap from [`intersect_all`].
pub fn subtract_multi(
    a: &Polygon<f64>,
    b: &MultiPolygon<f64>,
    config: &EngineConfig,
) -> Option<Polygon<f64>> {
    let a_mp = MultiPolygon::new(vec![a.clone()]);
    meaningful(a_mp.difference(b), config.min_area_sqm)
}

/// Largest component of a multi-part result, dropping the rest.
///
/// Territories are single claimed regions; disjoint fragments left by a
/// boolean operation are not representable and the smaller ones are
/// discarded.
fn largest_component(mp: MultiPolygon<f64>) -> Option<Polygon<f64>> {
    mp.0.into_iter()
        .max_by(|a, b| area_sqm(a).total_cmp(&area_sqm(b)))
}

fn meaningful(mp: MultiPolygon<f64>, min_area_sqm: f64) -> Option<Polygon<f64>> {
    let best = largest_component(mp)?;
    if area_sqm(&best) < min_area_sqm {
        None
    } else {
        Some(best)
    }
}

// =============================================================================
// Ring Validation
// =============================================================================

/// Check the territory ring invariant: an exterior ring of at least four
/// coordinates (three distinct plus closure), all finite and in range, with
/// strictly positive area.
pub fn validate_ring(polygon: &Polygon<f64>) -> Result<(), EngineError> {
    let exterior = polygon.exterior();

    if exterior.0.len() < 4 {
        return Err(EngineError::InvalidTerritory(format!(
            "exterior ring has {} points, need at least 4",
            exterior.0.len()
        )));
    }

    if let Some(bad) = exterior.0.iter().find(|c| !coord_is_valid(**c)) {
        return Err(EngineError::InvalidTerritory(format!(
            "exterior ring contains invalid coordinate ({}, {})",
            bad.x, bad.y
        )));
    }

    if area_sqm(polygon) <= 0.0 {
        return Err(EngineError::InvalidTerritory(
            "polygon has zero area".to_string(),
        ));
    }

    Ok(())
}

// =============================================================================
// Self-Intersection Scanning
// =============================================================================

/// Proper self-crossings of an open route.
///
/// Returns `(i, j, point)` for every pair of segments `i < j` that cross at
/// a point interior to both. Adjacent segments share an endpoint and never
/// cross properly, so no adjacency bookkeeping is needed.
pub fn self_intersections(line: &LineString<f64>) -> Vec<(usize, usize, Coord<f64>)> {
    let segments: Vec<_> = line.lines().collect();
    let mut crossings = Vec::new();

    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            if let Some(LineIntersection::SinglePoint { intersection, is_proper: true }) =
                line_intersection(segments[i], segments[j])
            {
                crossings.push((i, j, intersection));
            }
        }
    }

    crossings
}

/// Whether a closed ring is simple (no proper crossings, no collinear
/// overlap between segments).
pub fn ring_is_simple(ring: &LineString<f64>) -> bool {
    let segments: Vec<_> = ring.lines().collect();

    for i in 0..segments.len() {
        for j in (i + 1)..segments.len() {
            match line_intersection(segments[i], segments[j]) {
                Some(LineIntersection::SinglePoint { is_proper: true, .. }) => return false,
                Some(LineIntersection::Collinear { .. }) => return false,
                _ => {}
            }
        }
    }

    true
}

// =============================================================================
// Unit Tests
// =============================================================================
