//! Boundary to the surrounding application's property records.
//!
//! The lead-tracking application owns the property data; this engine
//! only ever sees it through [`CandidateFeed`]. Besides reading the
//! candidate pool, the feed exposes the application's batch geocoding
//! endpoint so the planning tools can fill in missing coordinates before
//! routing.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use thiserror::Error;

use crate::candidate::Candidate;

/// Errors surfaced by candidate feeds.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeedError {
    /// The application could not be reached.
    #[error("request to {url} failed: {message}")]
    Network {
        /// Endpoint the request targeted.
        url: String,
        /// Transport-level failure description.
        message: String,
    },
    /// The request exceeded the configured timeout.
    #[error("request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Endpoint the request targeted.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The application answered with a non-success HTTP status.
    #[error("feed at {url} returned status {status}: {message}")]
    Http {
        /// Endpoint the request targeted.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Response body or status text.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode feed response: {message}")]
    Parse {
        /// Decoding failure description.
        message: String,
    },
}

/// Outcome of one geocoding batch.
///
/// Counters cover the records the batch examined: `successful` gained
/// coordinates, `errors` failed at the geocoding provider, and `skipped`
/// already had coordinates. Per-record failures are counted rather than
/// raised so one bad address cannot sink a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GeocodeBatch {
    /// Records examined by this batch.
    pub processed: u32,
    /// Records that gained coordinates.
    pub successful: u32,
    /// Records whose address could not be geocoded.
    pub errors: u32,
    /// Records skipped because they already had coordinates.
    pub skipped: u32,
}

/// Snapshot of geocoding coverage across the candidate pool.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct GeocodeStatus {
    /// Total candidate records.
    pub total: u64,
    /// Records with coordinates.
    pub with_coordinates: u64,
    /// Records still missing coordinates.
    pub without_coordinates: u64,
    /// Coverage as a percentage between 0 and 100.
    pub percentage_complete: f64,
}

/// Cooperative cancellation signal for long-running feed work.
///
/// Clones share one flag. Workers check it between units of work, so a
/// unit already in flight when the flag is raised still completes and is
/// counted.
///
/// # Examples
/// ```
/// use fieldroute_core::CancelFlag;
///
/// let flag = CancelFlag::new();
/// let shared = flag.clone();
/// shared.cancel();
/// assert!(flag.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// Create an unraised flag.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raise the flag.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether the flag has been raised.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Read access to the application's property records.
///
/// Implementations talk to the application's HTTP API or serve fixtures
/// in tests. All calls are synchronous; transport adapters own whatever
/// async machinery they need.
pub trait CandidateFeed {
    /// Fetch the current candidate pool.
    ///
    /// # Errors
    /// Returns a [`FeedError`] when the application cannot be reached or
    /// answers with something undecodable.
    fn candidates(&self) -> Result<Vec<Candidate>, FeedError>;

    /// Geocode up to `limit` records starting at `offset`.
    ///
    /// Offsets page over the full record list in a stable order; records
    /// that already have coordinates come back counted as skipped.
    ///
    /// # Errors
    /// Returns a [`FeedError`] when the batch request itself fails.
    /// Per-record geocoding failures are reported in the batch counters
    /// instead.
    fn geocode_batch(&self, limit: u32, offset: u32) -> Result<GeocodeBatch, FeedError>;

    /// Fetch the current geocoding coverage.
    ///
    /// # Errors
    /// Returns a [`FeedError`] when the application cannot be reached or
    /// answers with something undecodable.
    fn geocode_status(&self) -> Result<GeocodeStatus, FeedError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "serde")]
    #[test]
    fn status_deserialises_from_contract_payload() {
        let payload = r#"{
            "total": 250,
            "withCoordinates": 100,
            "withoutCoordinates": 150,
            "percentageComplete": 40.0
        }"#;
        let status: GeocodeStatus = serde_json::from_str(payload).unwrap();
        assert_eq!(status.total, 250);
        assert_eq!(status.without_coordinates, 150);
        assert!((status.percentage_complete - 40.0).abs() < f64::EPSILON);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn batch_counters_deserialise() {
        let batch: GeocodeBatch =
            serde_json::from_str(r#"{"processed":25,"successful":20,"errors":2,"skipped":3}"#)
                .unwrap();
        assert_eq!(batch.processed, 25);
        assert_eq!(batch.errors, 2);
    }

    #[test]
    fn feed_errors_render_their_context() {
        let error = FeedError::Http {
            url: "http://app.invalid/geocode".into(),
            status: 503,
            message: "maintenance".into(),
        };
        assert_eq!(
            error.to_string(),
            "feed at http://app.invalid/geocode returned status 503: maintenance"
        );
    }
}
