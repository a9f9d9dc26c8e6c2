//! Per-identifier location cache (the signal map).
//!
//! A [`SignalMap`] maps signal identifiers to their current best
//! location estimate and refines those estimates over time with the
//! confidence-weighted merge from [`crate::geo`]. The engine runs two
//! instances, one for Wi-Fi access points and one for cells, each bound
//! to its own [`SignalSource`].
//!
//! # Concurrency
//!
//! Entries live in a `DashMap`; the read-modify-write of a merge runs
//! under the dashmap entry guard, so concurrent updates of the same
//! identifier cannot lose each other. Source lookups always run with no
//! map lock held — a slow backend can never stall unrelated identifiers.
//! Entries are never evicted: the identifier space seen over a cache's
//! lifetime bounds its size.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::geo::{fuse, FusionConfig, LocationEstimate};
use crate::signal::SignalIdentifier;
use crate::source::{SignalSource, SourceError};

/// Default lifetime of a cached entry before a source refresh is
/// attempted. Transmitters move rarely; a month keeps bulk sources cold.
pub const DEFAULT_ENTRY_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// A cached per-identifier estimate with its update history.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapEntry {
    /// Current best estimate for the identifier.
    pub estimate: LocationEstimate,
    /// How many observations have been merged into the estimate.
    /// Diagnostic history only; the confidence behind the estimate is
    /// carried by [`LocationEstimate::weight`].
    pub updates: u64,
    /// When the entry was last written (cache time, not reading time).
    pub stored_at: DateTime<Utc>,
}

/// Counters describing a signal map's traffic.
#[derive(Debug, Clone, Copy, Default)]
pub struct MapStats {
    /// Resolutions answered from a fresh cached entry.
    pub hits: u64,
    /// Resolutions that had to consult the signal source.
    pub misses: u64,
    /// Identifiers currently cached.
    pub entries: u64,
}

/// Persistent keyed cache from signal identifier to location estimate.
pub struct SignalMap {
    entries: DashMap<SignalIdentifier, MapEntry>,
    source: Arc<dyn SignalSource>,
    fusion: FusionConfig,
    entry_ttl: chrono::Duration,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl SignalMap {
    /// Create a map bound to the given source.
    pub fn new(source: Arc<dyn SignalSource>, fusion: FusionConfig, entry_ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            source,
            fusion,
            entry_ttl: chrono::Duration::from_std(entry_ttl).unwrap_or(chrono::Duration::MAX),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Resolve an identifier to its current best estimate.
    ///
    /// A fresh cached entry is returned as-is. On a miss the bound
    /// source is consulted and its answer stored. An expired entry
    /// triggers a refresh attempt, but the stale entry is still served
    /// if the refresh fails — `NotFound` strictly means "no entry at
    /// all", and callers treat it as "no estimate this cycle", never as
    /// fatal.
    ///
    /// # Errors
    ///
    /// Only [`SourceError::NotFound`]. Adapter failures (`Unavailable`,
    /// `Timeout`) are logged and downgraded to `NotFound` here; they
    /// never propagate past the map.
    pub async fn resolve(
        &self,
        identifier: &SignalIdentifier,
    ) -> Result<LocationEstimate, SourceError> {
        let now = Utc::now();
        // Copy the entry out so no map lock is held across the source call.
        let cached = self.entries.get(identifier).map(|entry| *entry.value());

        if let Some(entry) = cached {
            if now.signed_duration_since(entry.stored_at) < self.entry_ttl {
                self.hits.fetch_add(1, Ordering::Relaxed);
                trace!(identifier = %identifier, "signal map hit");
                return Ok(entry.estimate);
            }
            self.misses.fetch_add(1, Ordering::Relaxed);
            return match self.source.locate(identifier).await {
                Ok(estimate) => Ok(self.update(identifier, estimate)),
                Err(err) => {
                    debug!(identifier = %identifier, error = %err,
                        "refresh of expired entry failed, serving stale estimate");
                    Ok(entry.estimate)
                }
            };
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        match self.source.locate(identifier).await {
            Ok(estimate) => Ok(self.update(identifier, estimate)),
            Err(SourceError::NotFound) => {
                trace!(identifier = %identifier, "identifier unknown to source");
                Err(SourceError::NotFound)
            }
            Err(err) => {
                debug!(identifier = %identifier, error = %err,
                    "signal source failed, treating as not found");
                Err(SourceError::NotFound)
            }
        }
    }

    /// Merge an observed estimate into the cache.
    ///
    /// Inserts on first sight, otherwise fuses with the stored estimate
    /// under the entry guard. Two racing first resolutions of the same
    /// identifier fuse rather than clobber each other. Returns the
    /// estimate now stored.
    pub fn update(
        &self,
        identifier: &SignalIdentifier,
        observed: LocationEstimate,
    ) -> LocationEstimate {
        let now = Utc::now();
        match self.entries.entry(*identifier) {
            Entry::Occupied(mut occupied) => {
                let entry = occupied.get_mut();
                entry.estimate = fuse(&entry.estimate, &observed, &self.fusion);
                entry.updates += 1;
                entry.stored_at = now;
                entry.estimate
            }
            Entry::Vacant(vacant) => {
                vacant.insert(MapEntry {
                    estimate: observed,
                    updates: 1,
                    stored_at: now,
                });
                observed
            }
        }
    }

    /// Current best estimate for an identifier, if one is cached.
    ///
    /// Unlike [`SignalMap::resolve`] this never consults the source.
    pub fn peek(&self, identifier: &SignalIdentifier) -> Option<LocationEstimate> {
        self.entries.get(identifier).map(|entry| entry.estimate)
    }

    /// Number of merges applied to an identifier's entry so far.
    pub fn update_count(&self, identifier: &SignalIdentifier) -> u64 {
        self.entries
            .get(identifier)
            .map_or(0, |entry| entry.updates)
    }

    /// Number of cached identifiers.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Traffic counters.
    pub fn stats(&self) -> MapStats {
        MapStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.entries.len() as u64,
        }
    }

    /// Export all entries for persistence across restarts.
    pub fn snapshot(&self) -> Vec<(SignalIdentifier, MapEntry)> {
        self.entries
            .iter()
            .map(|entry| (*entry.key(), *entry.value()))
            .collect()
    }

    /// Export all entries as JSON.
    ///
    /// # Errors
    ///
    /// Returns the underlying serializer error, which for this data
    /// model only occurs on non-finite floats.
    pub fn snapshot_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(&self.snapshot())
    }

    /// Load previously exported entries.
    ///
    /// Existing entries for the same identifier are replaced; restoring
    /// into a fresh map is the intended use.
    pub fn restore<I>(&self, entries: I)
    where
        I: IntoIterator<Item = (SignalIdentifier, MapEntry)>,
    {
        for (identifier, entry) in entries {
            self.entries.insert(identifier, entry);
        }
    }

    /// Load previously exported entries from JSON.
    ///
    /// # Errors
    ///
    /// Returns the deserializer error if the JSON does not match the
    /// snapshot layout or carries an estimate that fails validation
    /// (see [`crate::geo::InvalidEstimate`]). Nothing is loaded in
    /// that case.
    pub fn restore_json(&self, json: &str) -> serde_json::Result<()> {
        let entries: Vec<(SignalIdentifier, MapEntry)> = serde_json::from_str(json)?;
        self.restore(entries);
        Ok(())
    }
}
