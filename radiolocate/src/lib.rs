//! Radiolocate - network-signal location estimation
//!
//! This library estimates a device's geographic position from locally
//! observable radio signals (Wi-Fi access points, cellular cells)
//! without satellite positioning, and serves the estimate through a
//! provider-style query interface.
//!
//! # Architecture
//!
//! Raw observations flow through a per-kind [`estimator::LocationEstimator`],
//! which resolves identifiers against a persistent [`map::SignalMap`]
//! (backed by an external [`source::SignalSource`]), fuses the resolved
//! estimates and submits the result to the
//! [`aggregator::LocationAggregator`]. The
//! [`provider::ProviderStateMachine`] gates intake on connectivity
//! conditions, and [`engine::LocationEngine`] wires it all together
//! behind the five boundary operations a host consumes.

pub mod aggregator;
pub mod engine;
pub mod estimator;
pub mod geo;
pub mod logging;
pub mod map;
pub mod provider;
pub mod signal;
pub mod source;

pub use aggregator::LocationAggregator;
pub use engine::{EngineConfig, LocationEngine};
pub use estimator::LocationEstimator;
pub use geo::{fuse, FusionConfig, InvalidEstimate, LocationEstimate};
pub use map::{MapEntry, MapStats, SignalMap, DEFAULT_ENTRY_TTL};
pub use provider::{ConnectivitySnapshot, ProtocolVariant, ProviderState, ProviderStateMachine};
pub use signal::{Bssid, Observation, SignalIdentifier, SignalKind};
pub use source::{SignalSource, SourceError, TableSource};
