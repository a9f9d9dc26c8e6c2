//! Provider lifecycle state machine and boundary capabilities.
//!
//! The state machine gates whether estimation is active based on the
//! host's connectivity conditions. It starts `Disabled` and is flipped
//! by connectivity-change notifications (never polled) or by explicit
//! boundary `enable()`/`disable()` calls. Disabling stops the intake of
//! new observations but never clears the last known location.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::info;

/// Lifecycle state of the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderState {
    /// Not accepting observations; queries answer with stale data.
    Disabled,
    /// Estimation is running.
    Enabled,
}

/// Connectivity conditions delivered by the external observer.
///
/// The engine only needs pull-style reads of these two booleans whenever
/// the host notifies a change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectivitySnapshot {
    /// Whether airplane mode is switched on.
    pub airplane_mode_on: bool,
    /// Whether the Wi-Fi radio is enabled (it may be, even in airplane
    /// mode).
    pub wifi_enabled: bool,
}

/// Which boundary query protocol the host negotiated at construction.
///
/// A capability set, not an inheritance hierarchy: the variant is chosen
/// once when the engine is built and never changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolVariant {
    /// Legacy hosts: only the smoothed current location is served.
    V1,
    /// Newer hosts additionally read the raw (unsmoothed) location.
    #[default]
    V2,
}

impl ProtocolVariant {
    /// Whether the boundary may read the raw "real" location.
    pub const fn reports_real_location(self) -> bool {
        matches!(self, ProtocolVariant::V2)
    }

    /// Parse a variant name as found in configuration files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "v1" | "legacy" => Some(ProtocolVariant::V1),
            "v2" => Some(ProtocolVariant::V2),
            _ => None,
        }
    }
}

/// Gates estimation on external connectivity conditions.
///
/// Long-lived for the process lifetime; there is no terminal state.
/// Transitions are atomic with respect to [`ProviderStateMachine::is_active`]
/// reads.
#[derive(Debug, Default)]
pub struct ProviderStateMachine {
    enabled: AtomicBool,
}

impl ProviderStateMachine {
    /// Create the machine in its initial `Disabled` state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-evaluate the gate after a connectivity change.
    ///
    /// Conservative rule: only "airplane mode on and Wi-Fi off" leaves
    /// no usable radio path; any other combination keeps estimation
    /// enabled.
    pub fn evaluate(&self, snapshot: ConnectivitySnapshot) {
        if snapshot.airplane_mode_on && !snapshot.wifi_enabled {
            self.disable();
        } else {
            self.enable();
        }
    }

    /// Enable estimation.
    pub fn enable(&self) {
        if !self.enabled.swap(true, Ordering::SeqCst) {
            info!("location provider enabled");
        }
    }

    /// Disable estimation. Last known locations stay answerable.
    pub fn disable(&self) {
        if self.enabled.swap(false, Ordering::SeqCst) {
            info!("location provider disabled");
        }
    }

    /// True iff the state is `Enabled`.
    pub fn is_active(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ProviderState {
        if self.is_active() {
            ProviderState::Enabled
        } else {
            ProviderState::Disabled
        }
    }
}
