//! # Overlap Resolver
//!
//! The claim conflict-resolution algorithm. Given a buffered candidate and
//! the existing territories that spatially intersect its bounding box (in
//! caller-determined order), produce the [`ChangeSet`] of mutations to apply.
//!
//! The algorithm is a short-circuiting fold over the existing territories,
//! threading a shrinking "remaining claim":
//!
//! - **Same owner**: union the remainder into the owner's territory and stop;
//!   the whole claim has been absorbed. Territories later in the iteration
//!   order are not considered, even if they overlap. This first-match-wins
//!   behavior is order-sensitive and deliberate.
//! - **Different owner**: the overlap transfers to the claimer. The defender
//!   keeps the difference (or is deleted when less than the minimum area
//!   survives), an exact-area transfer is recorded, and the remainder
//!   shrinks. A fully consumed remainder stops the fold.
//! - **Bad element**: an invalid ring or a degenerate geometry result skips
//!   that territory and the fold continues; one bad row never blocks a claim.
//!
//! Every processed territory yields a [`StepOutcome`] so callers and tests
//! can observe skips instead of losing them to silent catches. The resolver
//! performs no I/O and never panics on input data.

use geo::Polygon;
use log::{debug, info, warn};

use crate::{algebra, CandidatePolygon, EngineConfig, Territory, TerritoryKind};

// ============================================================================
// Change-Set Types
// ============================================================================

/// A territory to create for the claim's surviving remainder.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NewClaim {
    pub geometry: Polygon<f64>,
    pub kind: TerritoryKind,
    pub area_sqm: f64,
    /// Capture timestamp of the claiming activity (unix seconds).
    pub captured_at: i64,
}

/// Replacement geometry for an existing territory.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TerritoryUpdate {
    pub territory_id: String,
    pub geometry: Polygon<f64>,
    pub area_sqm: f64,
}

/// Record of area changing hands.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Transfer {
    pub previous_owner_id: String,
    pub new_owner_id: String,
    pub territory_id: String,
    /// Exact geometric intersection area at the time it was computed.
    pub area_sqm: f64,
}

/// The resolver's pure output: the mutations the storage layer must apply
/// atomically. A territory id appears in at most one of `updates`/`deletes`.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChangeSet {
    pub new_claims: Vec<NewClaim>,
    pub updates: Vec<TerritoryUpdate>,
    pub deletes: Vec<String>,
    pub transfers: Vec<Transfer>,
}

// ============================================================================
// Per-Step Outcomes
// ============================================================================

/// Why an existing territory was skipped by the fold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkipReason {
    /// No meaningful overlap with what is left of the claim.
    NoOverlap,
    /// The stored ring violates the territory invariant.
    InvalidRing,
    /// A boolean operation produced no usable result.
    DegenerateGeometry,
}

/// What the fold did with an existing territory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepAction {
    /// Same owner: claim absorbed by union, fold terminated.
    Merged,
    /// Different owner lost the overlap but survives with the rest.
    Stolen,
    /// Different owner lost everything; territory deleted.
    Overtaken,
}

/// Per-territory result of one fold step.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StepOutcome {
    Applied { territory_id: String, action: StepAction },
    Skipped { territory_id: String, reason: SkipReason },
}

/// Full resolver output: the change-set plus the per-step audit trail.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Resolution {
    pub change_set: ChangeSet,
    pub steps: Vec<StepOutcome>,
}

/// One fold step's verdict, before it is folded into the accumulator.
enum StepResult {
    Skip(SkipReason),
    /// Same owner: merged geometry, fold stops.
    Merge(Polygon<f64>),
    /// Different owner: what survives for them, the stolen area, and what
    /// remains of the claim (`None` = claim fully consumed, fold stops).
    Steal {
        survivor: Option<Polygon<f64>>,
        stolen_area_sqm: f64,
        remainder: Option<Polygon<f64>>,
    },
}

// ============================================================================
// Resolution
// ============================================================================

/// Resolve a claim candidate against the overlapping existing territories.
///
/// `existing` is expected to be pre-filtered by a spatial query; its order
/// determines the fold order and therefore the result.
///
/// # Example
///
/// ```rust
/// use geo::{LineString, Polygon};
/// use territory_engine::{
///     resolve_claim, CandidatePolygon, EngineConfig, TerritoryKind,
/// };
///
/// let square = Polygon::new(
///     LineString::from(vec![
///         (0.0, 0.0), (0.01, 0.0), (0.01, 0.01), (0.0, 0.01), (0.0, 0.0),
///     ]),
///     vec![],
/// );
/// let candidate = CandidatePolygon {
///     area_sqm: territory_engine::algebra::area_sqm(&square),
///     polygon: square,
///     kind: TerritoryKind::Polygon,
///     buffer_meters: 0.0,
/// };
///
/// // No overlapping territories: the whole candidate becomes a new claim
/// let resolution = resolve_claim(&candidate, "alice", 1_700_000_000, &[], &EngineConfig::default());
/// assert_eq!(resolution.change_set.new_claims.len(), 1);
/// assert!(resolution.change_set.transfers.is_empty());
/// ```
pub fn resolve_claim(
    candidate: &CandidatePolygon,
    owner_id: &str,
    captured_at: i64,
    existing: &[Territory],
    config: &EngineConfig,
) -> Resolution {
    let mut changes = ChangeSet::default();
    let mut steps = Vec::with_capacity(existing.len());
    let mut remaining = candidate.polygon.clone();

    debug!(
        "resolving claim by {owner_id}: {:.0} m2 against {} territories",
        candidate.area_sqm,
        existing.len()
    );

    for territory in existing {
        match process_territory(&remaining, territory, owner_id, config) {
            StepResult::Skip(reason) => {
                if reason != SkipReason::NoOverlap {
                    warn!("skipping territory {}: {reason:?}", territory.id);
                }
                steps.push(StepOutcome::Skipped {
                    territory_id: territory.id.clone(),
                    reason,
                });
            }
            StepResult::Merge(merged) => {
                let area_sqm = algebra::area_sqm(&merged);
                debug!(
                    "merged claim into own territory {} ({area_sqm:.0} m2)",
                    territory.id
                );
                changes.updates.push(TerritoryUpdate {
                    territory_id: territory.id.clone(),
                    geometry: merged,
                    area_sqm,
                });
                steps.push(StepOutcome::Applied {
                    territory_id: territory.id.clone(),
                    action: StepAction::Merged,
                });
                // The whole claim is absorbed; nothing left to process
                return finish(changes, steps);
            }
            StepResult::Steal { survivor, stolen_area_sqm, remainder } => {
                let action = match survivor {
                    Some(geometry) => {
                        let area_sqm = algebra::area_sqm(&geometry);
                        changes.updates.push(TerritoryUpdate {
                            territory_id: territory.id.clone(),
                            geometry,
                            area_sqm,
                        });
                        StepAction::Stolen
                    }
                    None => {
                        changes.deletes.push(territory.id.clone());
                        StepAction::Overtaken
                    }
                };
                changes.transfers.push(Transfer {
                    previous_owner_id: territory.owner_id.clone(),
                    new_owner_id: owner_id.to_string(),
                    territory_id: territory.id.clone(),
                    area_sqm: stolen_area_sqm,
                });
                steps.push(StepOutcome::Applied {
                    territory_id: territory.id.clone(),
                    action,
                });
                debug!(
                    "stole {stolen_area_sqm:.0} m2 from {} (territory {}, {action:?})",
                    territory.owner_id, territory.id
                );

                match remainder {
                    Some(rest) => remaining = rest,
                    // Claim fully consumed by steals
                    None => return finish(changes, steps),
                }
            }
        }
    }

    // Fold exhausted: whatever remains becomes a new territory
    let remaining_area = algebra::area_sqm(&remaining);
    if remaining_area >= config.min_area_sqm {
        changes.new_claims.push(NewClaim {
            geometry: remaining,
            kind: candidate.kind,
            area_sqm: remaining_area,
            captured_at,
        });
    }

    finish(changes, steps)
}

fn finish(change_set: ChangeSet, steps: Vec<StepOutcome>) -> Resolution {
    info!(
        "claim resolved: {} new, {} updated, {} deleted, {} transfers",
        change_set.new_claims.len(),
        change_set.updates.len(),
        change_set.deletes.len(),
        change_set.transfers.len()
    );
    Resolution { change_set, steps }
}

/// Decide what one existing territory does to the remaining claim.
fn process_territory(
    remaining: &Polygon<f64>,
    territory: &Territory,
    owner_id: &str,
    config: &EngineConfig,
) -> StepResult {
    if algebra::validate_ring(&territory.geometry).is_err() {
        return StepResult::Skip(SkipReason::InvalidRing);
    }

    // The full multi-part overlap: every piece transfers and is removed from
    // both sides, so the new claim and a survivor can never keep the same
    // ground. Only the persisted geometries collapse to a single component.
    let overlap = match algebra::intersect_all(remaining, &territory.geometry, config) {
        Some(overlap) => overlap,
        None => return StepResult::Skip(SkipReason::NoOverlap),
    };

    if territory.owner_id == owner_id {
        return match algebra::union(remaining, &territory.geometry) {
            Some(merged) => StepResult::Merge(merged),
            None => StepResult::Skip(SkipReason::DegenerateGeometry),
        };
    }

    let stolen_area_sqm = algebra::multi_area_sqm(&overlap);
    let survivor = algebra::subtract_multi(&territory.geometry, &overlap, config);
    let remainder = algebra::subtract_multi(remaining, &overlap, config);

    StepResult::Steal { survivor, stolen_area_sqm, remainder }
}

// ============================================================================
// Tests
// ============================================================================
