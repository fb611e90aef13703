//! # Decay Model
//!
//! Time-based shrinkage of an unattended territory. Independent of the
//! resolver: the external scheduler invokes it per territory, passing the
//! current time, and applies the outcome.
//!
//! A territory is safe for a grace period after its last defense. Past that,
//! it loses a configured fraction of area per day; once the decay factor
//! falls to the survival floor the territory expires outright. Shrinkage is
//! a uniform inward offset whose magnitude is derived from the square root
//! of the area to lose, computed in a local planar meter frame with a
//! straight-skeleton buffer.

use geo::algorithm::orient::{Direction, Orient};
use geo::{Area, Polygon};
use log::debug;

use crate::geo_utils::LocalFrame;
use crate::{algebra, EngineConfig, Territory};

/// Result of applying decay to one territory.
#[derive(Debug, Clone)]
pub enum DecayOutcome {
    /// Still inside the grace period.
    Unchanged,
    /// Territory shrank; persist the replacement geometry.
    Shrunk { geometry: Polygon<f64>, area_sqm: f64 },
    /// Decayed past the survival floor; delete the territory.
    Expired,
}

/// Apply time-based decay to a territory.
///
/// `now` is the evaluation time in unix seconds. The decay factor is
/// `1 - rate * (days_undefended - grace)`; at or below the configured floor
/// the territory expires. Otherwise the polygon is offset inward by
/// `sqrt(area_lost) / 2` meters. An offset that collapses the polygon below
/// the minimum survivable area also expires it.
///
/// # Example
///
/// ```rust
/// use geo::{LineString, Polygon};
/// use territory_engine::{apply_decay, DecayOutcome, EngineConfig, Territory, TerritoryKind};
///
/// let ring = LineString::from(vec![
///     (0.0, 0.0), (0.01, 0.0), (0.01, 0.01), (0.0, 0.01), (0.0, 0.0),
/// ]);
/// let territory = Territory {
///     id: "t1".to_string(),
///     owner_id: "alice".to_string(),
///     geometry: Polygon::new(ring, vec![]),
///     kind: TerritoryKind::Polygon,
///     area_sqm: 0.0,
///     captured_at: 0,
///     last_defended_at: 0,
/// };
///
/// // Three days undefended: still inside the 7-day grace period
/// let outcome = apply_decay(&territory, 3 * 86_400, &EngineConfig::default());
/// assert!(matches!(outcome, DecayOutcome::Unchanged));
/// ```
pub fn apply_decay(territory: &Territory, now: i64, config: &EngineConfig) -> DecayOutcome {
    let days_undefended = (now - territory.last_defended_at) as f64 / 86_400.0;

    if days_undefended < config.decay_grace_period_days {
        return DecayOutcome::Unchanged;
    }

    let decay_factor = 1.0
        - config.decay_rate_per_day * (days_undefended - config.decay_grace_period_days);

    if decay_factor <= config.decay_floor {
        debug!(
            "territory {} decayed past the floor ({decay_factor:.2}), expiring",
            territory.id
        );
        return DecayOutcome::Expired;
    }

    if algebra::validate_ring(&territory.geometry).is_err() {
        return DecayOutcome::Expired;
    }

    let area = algebra::area_sqm(&territory.geometry);
    let target_area = area * decay_factor;
    let shrink_meters = (area - target_area).sqrt() / 2.0;
    if shrink_meters <= 0.0 {
        return DecayOutcome::Unchanged;
    }

    match shrink_polygon(&territory.geometry, shrink_meters) {
        Some(geometry) => {
            let area_sqm = algebra::area_sqm(&geometry);
            if area_sqm < config.min_area_sqm {
                return DecayOutcome::Expired;
            }
            debug!(
                "territory {} decayed {days_undefended:.1} days: {area:.0} -> {area_sqm:.0} m2",
                territory.id
            );
            DecayOutcome::Shrunk { geometry, area_sqm }
        }
        None => DecayOutcome::Expired,
    }
}

/// Uniform inward offset in the territory's local meter frame.
fn shrink_polygon(polygon: &Polygon<f64>, distance_meters: f64) -> Option<Polygon<f64>> {
    let frame = LocalFrame::for_polygon(polygon)?;
    // The straight-skeleton offset expects conventional ring orientation
    let local = frame.project_polygon(polygon).orient(Direction::Default);

    let shrunk = geo_buffer::buffer_polygon(&local, -distance_meters);
    let largest = shrunk
        .0
        .into_iter()
        .max_by(|a, b| a.unsigned_area().total_cmp(&b.unsigned_area()))?;
    if largest.exterior().0.len() < 4 {
        return None;
    }

    Some(frame.unproject_polygon(&largest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TerritoryKind;
    use geo::LineString;

    const DAY: i64 = 86_400;

    fn square_territory(size_deg: f64, last_defended_at: i64) -> Territory {
        let geometry = Polygon::new(
            LineString::from(vec![
                (0.0, 0.0),
                (size_deg, 0.0),
                (size_deg, size_deg),
                (0.0, size_deg),
                (0.0, 0.0),
            ]),
            vec![],
        );
        Territory {
            id: "t1".to_string(),
            owner_id: "alice".to_string(),
            area_sqm: algebra::area_sqm(&geometry),
            geometry,
            kind: TerritoryKind::Polygon,
            captured_at: last_defended_at,
            last_defended_at,
        }
    }

    #[test]
    fn test_no_decay_inside_grace_period() {
        let territory = square_territory(0.01, 0);
        let outcome = apply_decay(&territory, 6 * DAY, &EngineConfig::default());
        assert!(matches!(outcome, DecayOutcome::Unchanged));
    }

    #[test]
    fn test_decay_shrinks_after_grace_period() {
        let territory = square_territory(0.01, 0);
        let original_area = territory.area_sqm;

        // 10 days undefended at 1%/day: factor 0.97, well above the floor
        let outcome = apply_decay(&territory, 10 * DAY, &EngineConfig::default());
        match outcome {
            DecayOutcome::Shrunk { area_sqm, geometry } => {
                assert!(area_sqm < original_area);
                assert!(area_sqm > original_area * 0.5);
                assert!(algebra::validate_ring(&geometry).is_ok());
            }
            other => panic!("expected Shrunk, got {other:?}"),
        }
    }

    #[test]
    fn test_decay_past_floor_expires() {
        let territory = square_territory(0.01, 0);
        // 60 days: factor 1 - 0.01 * 53 = 0.47, at or below the 0.5 floor
        let outcome = apply_decay(&territory, 60 * DAY, &EngineConfig::default());
        assert!(matches!(outcome, DecayOutcome::Expired));
    }

    #[test]
    fn test_tiny_territory_expires_when_offset_collapses_it() {
        // ~11 m square: any meaningful inward offset erases it
        let territory = square_territory(0.0001, 0);
        let outcome = apply_decay(&territory, 30 * DAY, &EngineConfig::default());
        assert!(matches!(outcome, DecayOutcome::Expired));
    }

    #[test]
    fn test_longer_neglect_shrinks_more() {
        let territory = square_territory(0.01, 0);
        let config = EngineConfig::default();

        let area_after = |days: i64| match apply_decay(&territory, days * DAY, &config) {
            DecayOutcome::Shrunk { area_sqm, .. } => area_sqm,
            other => panic!("expected Shrunk, got {other:?}"),
        };

        assert!(area_after(20) < area_after(8));
    }
}
