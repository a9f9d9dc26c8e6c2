//! Engine wiring and the boundary query protocol.
//!
//! [`LocationEngine`] assembles the two signal maps, their estimators,
//! the aggregator and the provider state machine, and exposes the five
//! boundary operations the host service layer consumes:
//! `current_location`, `real_location`, `is_active`, `enable`,
//! `disable`. There is no ambient global instance — the host constructs
//! the engine explicitly and passes it to whatever boundary layer needs
//! it.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, trace};

use crate::aggregator::LocationAggregator;
use crate::estimator::LocationEstimator;
use crate::geo::{FusionConfig, LocationEstimate};
use crate::map::{SignalMap, DEFAULT_ENTRY_TTL};
use crate::provider::{ConnectivitySnapshot, ProtocolVariant, ProviderState, ProviderStateMachine};
use crate::signal::{Observation, SignalKind};
use crate::source::SignalSource;

/// Top-level engine configuration.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    /// Tuning constants for the confidence-weighted merge.
    pub fusion: FusionConfig,
    /// Lifetime of a cached map entry before a source refresh.
    pub entry_ttl: Duration,
    /// Boundary protocol variant negotiated by the host.
    pub protocol: ProtocolVariant,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fusion: FusionConfig::default(),
            entry_ttl: DEFAULT_ENTRY_TTL,
            protocol: ProtocolVariant::default(),
        }
    }
}

impl EngineConfig {
    /// Set the fusion tuning constants.
    pub fn with_fusion(mut self, fusion: FusionConfig) -> Self {
        self.fusion = fusion;
        self
    }

    /// Set the map entry lifetime.
    pub fn with_entry_ttl(mut self, entry_ttl: Duration) -> Self {
        self.entry_ttl = entry_ttl;
        self
    }

    /// Set the boundary protocol variant.
    pub fn with_protocol(mut self, protocol: ProtocolVariant) -> Self {
        self.protocol = protocol;
        self
    }
}

/// The network-signal location engine.
///
/// One logical instance per process, addressed by potentially many
/// concurrent callers; every method takes `&self`.
pub struct LocationEngine {
    cell: LocationEstimator,
    wifi: LocationEstimator,
    aggregator: Arc<LocationAggregator>,
    provider: ProviderStateMachine,
    protocol: ProtocolVariant,
}

impl LocationEngine {
    /// Build the engine from its two signal sources.
    ///
    /// The engine starts `Disabled`; the host enables it either
    /// explicitly or through the first connectivity notification.
    pub fn new(
        config: EngineConfig,
        cell_source: Arc<dyn SignalSource>,
        wifi_source: Arc<dyn SignalSource>,
    ) -> Self {
        let aggregator = Arc::new(LocationAggregator::new());

        let cell_map = Arc::new(SignalMap::new(cell_source, config.fusion, config.entry_ttl));
        let wifi_map = Arc::new(SignalMap::new(wifi_source, config.fusion, config.entry_ttl));

        let cell = LocationEstimator::new(
            SignalKind::Cell,
            cell_map,
            config.fusion,
            Arc::clone(&aggregator),
        );
        let wifi = LocationEstimator::new(
            SignalKind::Wifi,
            wifi_map,
            config.fusion,
            Arc::clone(&aggregator),
        );

        info!(protocol = ?config.protocol, "location engine constructed");
        Self {
            cell,
            wifi,
            aggregator,
            provider: ProviderStateMachine::new(),
            protocol: config.protocol,
        }
    }

    /// Feed a batch of observations of one signal kind.
    ///
    /// While the provider is `Disabled` the batch is dropped without
    /// touching the maps or the sources, and `None` is returned; the
    /// last known location stays answerable.
    pub async fn on_observations(
        &self,
        kind: SignalKind,
        batch: &[Observation],
    ) -> Option<LocationEstimate> {
        if batch.is_empty() {
            return None;
        }
        if !self.provider.is_active() {
            trace!(kind = %kind, dropped = batch.len(),
                "provider disabled, dropping observations");
            return None;
        }
        match kind {
            SignalKind::Cell => self.cell.observe(batch).await,
            SignalKind::Wifi => self.wifi.observe(batch).await,
        }
    }

    /// Re-evaluate the provider gate after a connectivity change.
    pub fn on_connectivity_changed(&self, snapshot: ConnectivitySnapshot) {
        self.provider.evaluate(snapshot);
    }

    // Boundary query protocol -------------------------------------------------

    /// The authoritative (smoothed) location, if any estimate has ever
    /// been produced. Never cleared by disabling.
    pub fn current_location(&self) -> Option<LocationEstimate> {
        self.aggregator.current_location()
    }

    /// The latest raw location, if the negotiated protocol exposes it.
    ///
    /// Legacy (`V1`) hosts never see the unsmoothed value.
    pub fn real_location(&self) -> Option<LocationEstimate> {
        if self.protocol.reports_real_location() {
            self.aggregator.real_location()
        } else {
            None
        }
    }

    /// True iff the provider is `Enabled`.
    pub fn is_active(&self) -> bool {
        self.provider.is_active()
    }

    /// Enable estimation.
    pub fn enable(&self) {
        self.provider.enable();
    }

    /// Disable estimation, keeping the last known location answerable.
    pub fn disable(&self) {
        self.provider.disable();
    }

    // Component access --------------------------------------------------------

    /// Current provider lifecycle state.
    pub fn provider_state(&self) -> ProviderState {
        self.provider.state()
    }

    /// The negotiated boundary protocol variant.
    pub fn protocol(&self) -> ProtocolVariant {
        self.protocol
    }

    /// The cell signal map (snapshot persistence, diagnostics).
    pub fn cell_map(&self) -> &SignalMap {
        self.cell.map()
    }

    /// The Wi-Fi signal map (snapshot persistence, diagnostics).
    pub fn wifi_map(&self) -> &SignalMap {
        self.wifi.map()
    }
}
