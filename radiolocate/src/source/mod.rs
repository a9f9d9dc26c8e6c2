//! Signal source collaborator interface.
//!
//! A [`SignalSource`] resolves a signal identifier to a candidate
//! location estimate. Implementations may be backed by a local database
//! file, a remote lookup service, or anything else; the engine does not
//! care which. Lookups may block or suspend on I/O, so the interface is
//! async, and the signal map always calls it outside its own locks.
//!
//! # Dyn Compatibility
//!
//! The trait uses `Pin<Box<dyn Future>>` for its async method so it can
//! be held as `Arc<dyn SignalSource>` behind the maps.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::geo::LocationEstimate;
use crate::signal::SignalIdentifier;

/// Boxed future type for dyn-compatible async methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Errors a signal source can report.
///
/// Only `NotFound` ever escapes the signal map; `Unavailable` and
/// `Timeout` are adapter-level failures that the map downgrades to
/// "no new information this cycle".
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source has no estimate for this identifier.
    #[error("no estimate for identifier")]
    NotFound,

    /// The source failed to answer (I/O failure, unreachable backend).
    #[error("signal source unavailable: {0}")]
    Unavailable(String),

    /// The adapter's own deadline elapsed before an answer arrived.
    #[error("signal source lookup timed out")]
    Timeout,
}

/// Supplies candidate location estimates for signal identifiers.
///
/// Called by a [`crate::map::SignalMap`] on a cache miss or when a
/// cached entry has expired. Retries, deadlines and backoff are the
/// adapter's business; the engine core never retries.
pub trait SignalSource: Send + Sync {
    /// Look up the location of a single signal identifier.
    ///
    /// # Errors
    ///
    /// - [`SourceError::NotFound`] when the source simply does not know
    ///   this identifier (expected, non-fatal)
    /// - [`SourceError::Unavailable`] / [`SourceError::Timeout`] when
    ///   the backend failed to answer
    fn locate(&self, identifier: &SignalIdentifier)
        -> BoxFuture<'_, Result<LocationEstimate, SourceError>>;
}

/// A signal source backed by an in-memory identifier table.
///
/// Stands in for a bulk database-file adapter: the table is loaded once
/// and answered from memory. Used by the CLI demo host and throughout
/// the test suite.
#[derive(Debug, Default)]
pub struct TableSource {
    table: HashMap<SignalIdentifier, LocationEstimate>,
}

impl TableSource {
    /// Create an empty table source (every lookup is `NotFound`).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an identifier to the table, replacing any previous entry.
    pub fn with_entry(mut self, identifier: SignalIdentifier, estimate: LocationEstimate) -> Self {
        self.table.insert(identifier, estimate);
        self
    }

    /// Bulk-load identifier/estimate pairs.
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (SignalIdentifier, LocationEstimate)>,
    {
        Self {
            table: entries.into_iter().collect(),
        }
    }

    /// Number of identifiers in the table.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl SignalSource for TableSource {
    fn locate(
        &self,
        identifier: &SignalIdentifier,
    ) -> BoxFuture<'_, Result<LocationEstimate, SourceError>> {
        let result = self.table.get(identifier).copied().ok_or(SourceError::NotFound);
        Box::pin(async move { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Bssid;

    fn wifi(last_octet: u8) -> SignalIdentifier {
        SignalIdentifier::Wifi(Bssid([0, 0, 0, 0, 0, last_octet]))
    }

    #[tokio::test]
    async fn test_table_source_hit() {
        let estimate = LocationEstimate::now(52.0, 13.0, 120.0);
        let source = TableSource::new().with_entry(wifi(1), estimate);

        let resolved = source.locate(&wifi(1)).await.unwrap();
        assert_eq!(resolved, estimate);
    }

    #[tokio::test]
    async fn test_table_source_miss_is_not_found() {
        let source = TableSource::new();
        assert!(matches!(
            source.locate(&wifi(1)).await,
            Err(SourceError::NotFound)
        ));
    }

    #[test]
    fn test_table_source_bulk_load() {
        let source = TableSource::from_entries([
            (wifi(1), LocationEstimate::now(52.0, 13.0, 100.0)),
            (wifi(2), LocationEstimate::now(52.1, 13.1, 100.0)),
        ]);
        assert_eq!(source.len(), 2);
        assert!(!source.is_empty());
    }

    #[test]
    fn test_source_error_display() {
        assert_eq!(
            SourceError::Unavailable("connection refused".to_string()).to_string(),
            "signal source unavailable: connection refused"
        );
        assert_eq!(
            SourceError::Timeout.to_string(),
            "signal source lookup timed out"
        );
    }
}
