//! Core geographic types for the location engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Smallest accuracy radius accepted when deriving a confidence weight.
///
/// A reading claiming sub-millimetre accuracy is not credible for
/// network-signal positioning and would produce a near-infinite weight
/// that drowns out every other estimate.
pub const MIN_ACCURACY_M: f64 = 0.001;

/// Default per-merge tightening limit.
///
/// A single merge never shrinks the radius below
/// `min(old, new) * shrink_factor`. At 0.5 this bound coincides with the
/// harmonic radius of two equal inputs, which keeps the merge
/// order-independent (see [`crate::geo::fuse`]).
pub const DEFAULT_SHRINK_FACTOR: f64 = 0.5;

/// Default lower bound for a merged accuracy radius, in metres.
///
/// Network signals cannot realistically pin a device down tighter than
/// this, no matter how many consistent observations accumulate.
pub const DEFAULT_ACCURACY_FLOOR_M: f64 = 10.0;

/// Field of an externally supplied estimate that failed validation.
///
/// Estimates built through [`LocationEstimate::new`] always satisfy
/// these checks; deserialization (snapshot restore, lookup-table files)
/// is the only path that could otherwise smuggle in values the merge
/// cannot handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidEstimate {
    /// Latitude or longitude is NaN or infinite.
    #[error("coordinate is not finite")]
    NonFiniteCoordinate,
    /// Accuracy radius is negative, NaN or infinite.
    #[error("accuracy radius must be finite and non-negative")]
    InvalidAccuracy,
    /// Confidence weight is zero, negative, NaN or infinite.
    #[error("confidence weight must be finite and positive")]
    InvalidWeight,
}

/// A geographic position with an uncertainty radius.
///
/// `weight` is the accumulated confidence mass behind the estimate. A
/// fresh single reading carries `weight = 1 / accuracy_m`; merging two
/// estimates sums their weights, which is what makes repeated fusion
/// order-independent.
///
/// Deserialized estimates are validated field by field (see
/// [`InvalidEstimate`]), so persisted or user-supplied data cannot
/// carry a negative radius or a zero weight into the merge.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EstimateRecord")]
pub struct LocationEstimate {
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Accuracy radius in metres (always >= 0).
    pub accuracy_m: f64,
    /// When the underlying reading was taken.
    pub timestamp: DateTime<Utc>,
    /// Accumulated confidence mass.
    pub weight: f64,
}

impl LocationEstimate {
    /// Create an estimate from a single reading.
    ///
    /// Negative accuracy values are clamped to zero; the confidence
    /// weight is derived from the (clamped) radius.
    pub fn new(latitude: f64, longitude: f64, accuracy_m: f64, timestamp: DateTime<Utc>) -> Self {
        let accuracy_m = accuracy_m.max(0.0);
        Self {
            latitude,
            longitude,
            accuracy_m,
            timestamp,
            weight: 1.0 / accuracy_m.max(MIN_ACCURACY_M),
        }
    }

    /// Create an estimate taken right now (convenience for adapters).
    pub fn now(latitude: f64, longitude: f64, accuracy_m: f64) -> Self {
        Self::new(latitude, longitude, accuracy_m, Utc::now())
    }
}

/// Untrusted wire form of [`LocationEstimate`].
#[derive(Deserialize)]
struct EstimateRecord {
    latitude: f64,
    longitude: f64,
    accuracy_m: f64,
    timestamp: DateTime<Utc>,
    weight: f64,
}

impl TryFrom<EstimateRecord> for LocationEstimate {
    type Error = InvalidEstimate;

    fn try_from(record: EstimateRecord) -> Result<Self, Self::Error> {
        if !record.latitude.is_finite() || !record.longitude.is_finite() {
            return Err(InvalidEstimate::NonFiniteCoordinate);
        }
        if !record.accuracy_m.is_finite() || record.accuracy_m < 0.0 {
            return Err(InvalidEstimate::InvalidAccuracy);
        }
        if !record.weight.is_finite() || record.weight <= 0.0 {
            return Err(InvalidEstimate::InvalidWeight);
        }
        Ok(Self {
            latitude: record.latitude,
            longitude: record.longitude,
            accuracy_m: record.accuracy_m,
            timestamp: record.timestamp,
            weight: record.weight,
        })
    }
}

/// Tuning constants for the confidence-weighted merge.
///
/// The exact weighting constants are a tuning choice, not a discovered
/// fact, so they live in configuration rather than in the algorithm.
#[derive(Debug, Clone, Copy)]
pub struct FusionConfig {
    /// Per-merge tightening limit; a merge never shrinks the radius
    /// below `min(old, new) * shrink_factor`.
    pub shrink_factor: f64,
    /// Absolute lower bound for a merged accuracy radius, in metres.
    pub accuracy_floor_m: f64,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            shrink_factor: DEFAULT_SHRINK_FACTOR,
            accuracy_floor_m: DEFAULT_ACCURACY_FLOOR_M,
        }
    }
}

impl FusionConfig {
    /// Set the per-merge tightening limit.
    pub fn with_shrink_factor(mut self, shrink_factor: f64) -> Self {
        self.shrink_factor = shrink_factor;
        self
    }

    /// Set the accuracy floor in metres.
    pub fn with_accuracy_floor_m(mut self, accuracy_floor_m: f64) -> Self {
        self.accuracy_floor_m = accuracy_floor_m;
        self
    }
}
