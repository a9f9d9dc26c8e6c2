//! Merges per-estimator outputs into one authoritative location.
//!
//! The aggregator owns the authoritative current/real location pair
//! exclusively; estimators hold only a submit capability on it and never
//! construct the pair themselves. There is no numerical fusion here —
//! the job is making "best of the latest per source" consistent under
//! concurrent submissions.

use parking_lot::Mutex;
use tracing::trace;

use crate::geo::LocationEstimate;
use crate::signal::SignalKind;

/// The authoritative location pair plus the per-source latest estimates
/// it is derived from. Guarded as a single unit so readers never see
/// `current` and `real` from two different submission rounds.
#[derive(Debug, Default)]
struct AggregateState {
    /// Smoothed, authoritative location: best of the latest per source.
    current: Option<LocationEstimate>,
    /// Latest raw estimate from whichever source reported last.
    real: Option<LocationEstimate>,
    /// Most recent estimate per signal kind.
    latest: [Option<LocationEstimate>; SignalKind::COUNT],
}

impl AggregateState {
    /// Best of the latest per-source estimates: smallest accuracy
    /// radius, ties broken by the most recent timestamp.
    fn select_current(&self) -> Option<LocationEstimate> {
        let mut best: Option<LocationEstimate> = None;
        for candidate in self.latest.iter().flatten() {
            best = Some(match best {
                None => *candidate,
                Some(current) => {
                    let tighter = candidate.accuracy_m < current.accuracy_m;
                    let tie_fresher = candidate.accuracy_m == current.accuracy_m
                        && candidate.timestamp > current.timestamp;
                    if tighter || tie_fresher {
                        *candidate
                    } else {
                        current
                    }
                }
            });
        }
        best
    }
}

/// Tracks the most recent estimate from each estimator and exposes the
/// authoritative current location and the latest raw ("real") location.
#[derive(Debug, Default)]
pub struct LocationAggregator {
    state: Mutex<AggregateState>,
}

impl LocationAggregator {
    /// Create an aggregator with no location yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the most recent estimate from one estimator.
    ///
    /// `real` always takes the submitted estimate; `current` is
    /// recomputed from the latest per-source estimates. Both move in one
    /// critical section.
    pub fn submit(&self, kind: SignalKind, estimate: LocationEstimate) {
        let mut state = self.state.lock();
        state.real = Some(estimate);
        state.latest[kind.index()] = Some(estimate);
        state.current = state.select_current();
        trace!(source = %kind, accuracy_m = estimate.accuracy_m, "location submitted");
    }

    /// The authoritative (smoothed) location. `None` before any
    /// submission; never cleared afterwards.
    pub fn current_location(&self) -> Option<LocationEstimate> {
        self.state.lock().current
    }

    /// The latest raw location from whichever source reported last.
    pub fn real_location(&self) -> Option<LocationEstimate> {
        self.state.lock().real
    }

    /// Both locations from the same submission round.
    pub fn current_and_real(&self) -> (Option<LocationEstimate>, Option<LocationEstimate>) {
        let state = self.state.lock();
        (state.current, state.real)
    }
}
