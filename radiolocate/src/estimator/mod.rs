//! Per-signal-type location estimation.
//!
//! A [`LocationEstimator`] consumes batches of live radio observations
//! for one signal kind, resolves each identifier through its signal map
//! and folds the resolved estimates into a single fix for the batch.
//! Every successfully resolved observation also feeds a fresh
//! per-identifier reading back into the map, which is how the cache
//! self-improves from live radio data independently of the bulk source.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::aggregator::LocationAggregator;
use crate::geo::{fuse_all, FusionConfig, LocationEstimate};
use crate::map::SignalMap;
use crate::signal::{plausible_radius_m, Observation, SignalKind};

/// Turns observations of one signal kind into location estimates.
pub struct LocationEstimator {
    kind: SignalKind,
    map: Arc<SignalMap>,
    fusion: FusionConfig,
    aggregator: Arc<LocationAggregator>,
}

impl LocationEstimator {
    /// Create an estimator for one signal kind.
    ///
    /// The estimator holds only a submit capability on the aggregator;
    /// the aggregator keeps exclusive ownership of the authoritative
    /// location pair.
    pub fn new(
        kind: SignalKind,
        map: Arc<SignalMap>,
        fusion: FusionConfig,
        aggregator: Arc<LocationAggregator>,
    ) -> Self {
        Self {
            kind,
            map,
            fusion,
            aggregator,
        }
    }

    /// Which signal kind this estimator consumes.
    pub fn kind(&self) -> SignalKind {
        self.kind
    }

    /// The signal map backing this estimator.
    pub fn map(&self) -> &SignalMap {
        &self.map
    }

    /// Process a batch of observations into one fused estimate.
    ///
    /// Identifiers the map cannot resolve are skipped silently (no
    /// estimate this cycle is expected, not an error). The resolved
    /// estimates are folded with the confidence-weighted merge, which is
    /// order-independent, so the batch order does not matter. Returns
    /// `None` when nothing resolved; the aggregator is only touched when
    /// there is an estimate to submit.
    pub async fn observe(&self, batch: &[Observation]) -> Option<LocationEstimate> {
        let mut resolved = Vec::with_capacity(batch.len());

        for observation in batch {
            if observation.identifier.kind() != self.kind {
                debug!(identifier = %observation.identifier, expected = %self.kind,
                    "skipping observation of foreign signal kind");
                continue;
            }

            let estimate = match self.map.resolve(&observation.identifier).await {
                Ok(estimate) => estimate,
                Err(_) => continue,
            };

            // Feed the live reading back: same centre, radius derived
            // from the received signal strength.
            let radius_m = plausible_radius_m(self.kind, observation.signal_dbm);
            let reading = LocationEstimate::new(
                estimate.latitude,
                estimate.longitude,
                radius_m,
                observation.timestamp,
            );
            self.map.update(&observation.identifier, reading);

            resolved.push(estimate);
        }

        trace!(kind = %self.kind, observed = batch.len(), resolved = resolved.len(),
            "observation batch processed");

        let estimate = fuse_all(&resolved, &self.fusion)?;
        self.aggregator.submit(self.kind, estimate);
        Some(estimate)
    }
}
