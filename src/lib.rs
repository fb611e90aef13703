//! # Territory Engine
//!
//! GPS route buffering, territory claiming and overlap resolution.
//!
//! This library turns a recorded GPS track into a claimed geographic area
//! ("territory") and resolves ownership when a new claim overlaps existing
//! territories. It provides:
//!
//! - Encoded-polyline route decoding
//! - Route-to-polygon buffering with loop detection
//! - Polygon boolean algebra with degenerate-result handling
//! - The claim conflict-resolution algorithm (change-set output)
//! - Time-based territory decay
//!
//! The engine is synchronous and pure: every operation maps immutable inputs
//! to a value or an error. Persistence, spatial indexing and transactional
//! application of change-sets belong to the caller.
//!
//! ## Quick Start
//!
//! ```rust
//! use territory_engine::{
//!     build_candidate, decode_route, resolve_claim, ActivityKind, EngineConfig,
//! };
//!
//! let config = EngineConfig::default();
//!
//! // Decode a GPS track (Google encoded polyline, precision 5)
//! let route = decode_route("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
//!
//! // Buffer it into a claimable polygon
//! let candidate = build_candidate(&route, &ActivityKind::Run, &config).unwrap();
//! assert!(candidate.area_sqm > 0.0);
//!
//! // Resolve against the overlapping territories fetched by the caller
//! let resolution = resolve_claim(&candidate, "user-1", 1_700_000_000, &[], &config);
//! assert_eq!(resolution.change_set.new_claims.len(), 1);
//! ```

use geo::{Coord, LineString, Polygon};
use thiserror::Error;

pub mod algebra;
pub mod buffer;
pub mod decay;
pub mod geo_utils;
pub mod resolver;
pub mod route;
pub mod wire;

pub use buffer::{build_candidate, CandidatePolygon};
pub use decay::{apply_decay, DecayOutcome};
pub use resolver::{
    resolve_claim, ChangeSet, NewClaim, Resolution, SkipReason, StepAction, StepOutcome,
    TerritoryUpdate, Transfer,
};
pub use route::{decode_route, route_length_meters};

// ============================================================================
// Errors
// ============================================================================

/// Errors produced by the engine.
///
/// Decode errors abort the whole claim attempt. Geometry errors inside the
/// resolver's fold are absorbed per element as [`StepOutcome::Skipped`] and
/// never surface here.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed route encoding. Fatal to the claim attempt.
    #[error("failed to decode route: {0}")]
    Decode(String),

    /// A geometric operation produced no usable result.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),

    /// A supplied territory violates the ring invariant.
    #[error("invalid territory geometry: {0}")]
    InvalidTerritory(String),
}

// ============================================================================
// Core Types
// ============================================================================

/// Activity kind, controlling the buffer half-width of a corridor claim.
///
/// Unknown sport types fall back to the `Run` buffer policy.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActivityKind {
    Run,
    Ride,
    Other(String),
}

impl ActivityKind {
    /// Parse an activity sport-type string (case-insensitive).
    ///
    /// # Example
    /// ```
    /// use territory_engine::ActivityKind;
    /// assert_eq!(ActivityKind::from_sport_type("ride"), ActivityKind::Ride);
    /// assert_eq!(
    ///     ActivityKind::from_sport_type("Hike"),
    ///     ActivityKind::Other("Hike".to_string()),
    /// );
    /// ```
    pub fn from_sport_type(sport_type: &str) -> Self {
        match sport_type.to_ascii_lowercase().as_str() {
            "run" => ActivityKind::Run,
            "ride" => ActivityKind::Ride,
            _ => ActivityKind::Other(sport_type.to_string()),
        }
    }

    /// Buffer half-width in meters for this activity kind.
    pub fn buffer_meters(&self, config: &EngineConfig) -> f64 {
        match self {
            ActivityKind::Ride => config.ride_buffer_meters,
            _ => config.run_buffer_meters,
        }
    }
}

/// How a territory polygon was produced from its route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TerritoryKind {
    /// Closed-loop route claimed as its full enclosed area.
    Polygon,
    /// Largest simple interior loop of a self-intersecting route.
    Loop,
    /// Buffered linear route.
    Corridor,
}

impl TerritoryKind {
    /// Storage tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            TerritoryKind::Polygon => "polygon",
            TerritoryKind::Loop => "loop",
            TerritoryKind::Corridor => "corridor",
        }
    }
}

/// A persisted claimed area with a single owner.
///
/// The geometry is a closed exterior ring (longitude-first coordinates,
/// first point repeated as last, at least 4 points) whose area meets the
/// configured minimum. Interior rings may appear when a steal punches
/// through the middle of a territory.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Territory {
    pub id: String,
    pub owner_id: String,
    pub geometry: Polygon<f64>,
    pub kind: TerritoryKind,
    /// Derived area in square meters.
    pub area_sqm: f64,
    /// Unix timestamp (seconds) of the original claim.
    pub captured_at: i64,
    /// Unix timestamp (seconds) of the last defending activity.
    pub last_defended_at: i64,
}

/// Axis-aligned bounding box, longitude-first.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bounds {
    pub min_lng: f64,
    pub min_lat: f64,
    pub max_lng: f64,
    pub max_lat: f64,
}

impl Bounds {
    /// Compute bounds from raw coordinates. Returns `None` for empty input.
    pub fn from_coords<'a, I>(coords: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Coord<f64>>,
    {
        let mut min_lng = f64::MAX;
        let mut min_lat = f64::MAX;
        let mut max_lng = f64::MIN;
        let mut max_lat = f64::MIN;
        let mut any = false;

        for c in coords {
            any = true;
            min_lng = min_lng.min(c.x);
            min_lat = min_lat.min(c.y);
            max_lng = max_lng.max(c.x);
            max_lat = max_lat.max(c.y);
        }

        if !any {
            return None;
        }
        Some(Self { min_lng, min_lat, max_lng, max_lat })
    }

    /// Bounding box of a route.
    ///
    /// # Example
    /// ```
    /// use geo::LineString;
    /// use territory_engine::Bounds;
    ///
    /// let route = LineString::from(vec![(-0.13, 51.50), (-0.12, 51.51)]);
    /// let bounds = Bounds::from_linestring(&route).unwrap();
    /// assert_eq!(bounds.min_lng, -0.13);
    /// assert_eq!(bounds.max_lat, 51.51);
    /// ```
    pub fn from_linestring(line: &LineString<f64>) -> Option<Self> {
        Self::from_coords(line.0.iter())
    }

    /// Bounding box of a territory polygon's exterior ring.
    pub fn from_polygon(polygon: &Polygon<f64>) -> Option<Self> {
        Self::from_coords(polygon.exterior().0.iter())
    }

    /// Center of the bounds.
    pub fn center(&self) -> Coord<f64> {
        Coord {
            x: (self.min_lng + self.max_lng) / 2.0,
            y: (self.min_lat + self.max_lat) / 2.0,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Tunables for buffering, conflict resolution and decay.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EngineConfig {
    /// Corridor buffer half-width for runs (and unknown activity kinds).
    /// Default: 50.0 meters
    pub run_buffer_meters: f64,

    /// Corridor buffer half-width for rides.
    /// Default: 100.0 meters
    pub ride_buffer_meters: f64,

    /// Minimum survivable area. Geometric results below this are treated as
    /// empty and territories below it are never persisted.
    /// Default: 100.0 square meters
    pub min_area_sqm: f64,

    /// Maximum distance between route endpoints to treat the route as a
    /// closed loop. Default: 100.0 meters
    pub loop_closure_tolerance_meters: f64,

    /// Arc quantization for rounded buffer joins and caps.
    /// Default: 8 steps per half circle
    pub arc_steps: u32,

    /// Douglas-Peucker tolerance for the buffered polygon, as a fraction of
    /// the buffer half-width. Width-relative so results are stable across
    /// very small and very large routes. Default: 0.05
    pub simplify_tolerance_ratio: f64,

    /// Days since the last defense before decay starts.
    /// Default: 7.0 days
    pub decay_grace_period_days: f64,

    /// Fraction of area lost per day once decay starts.
    /// Default: 0.01 (1% per day)
    pub decay_rate_per_day: f64,

    /// Survival floor: when the decay factor drops to this fraction of the
    /// original area, the territory expires. Default: 0.5
    pub decay_floor: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            run_buffer_meters: 50.0,
            ride_buffer_meters: 100.0,
            min_area_sqm: 100.0,
            loop_closure_tolerance_meters: 100.0,
            arc_steps: 8,
            simplify_tolerance_ratio: 0.05,
            decay_grace_period_days: 7.0,
            decay_rate_per_day: 0.01,
            decay_floor: 0.5,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
