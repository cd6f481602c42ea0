//! Cooperative batch-geocoding runner.
//!
//! The lead application geocodes property addresses lazily; this module
//! walks its batch endpoint over the whole record list so the pool is
//! routable before an operator starts planning. Runs can take minutes,
//! so the runner reports progress through `log` and honours a
//! [`CancelFlag`] between batches.

use fieldroute_core::{CancelFlag, CandidateFeed, FeedError, GeocodeBatch};
use log::info;

/// Default number of records per batch call.
const DEFAULT_BATCH_SIZE: u32 = 25;

/// Accumulated outcome of one geocoding run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GeocodeReport {
    /// Records examined across all batches.
    pub processed: u32,
    /// Records that gained coordinates.
    pub successful: u32,
    /// Records whose address could not be geocoded.
    pub errors: u32,
    /// Records skipped because they already had coordinates.
    pub skipped: u32,
    /// Number of batch calls made.
    pub batches: u32,
    /// Whether the run stopped on a raised cancel flag.
    pub cancelled: bool,
}

impl GeocodeReport {
    fn absorb(&mut self, batch: &GeocodeBatch) {
        self.processed += batch.processed;
        self.successful += batch.successful;
        self.errors += batch.errors;
        self.skipped += batch.skipped;
        self.batches += 1;
    }
}

/// Drives a feed's batch geocode endpoint over the full record list.
///
/// Cancellation is cooperative: the flag is checked between batches, so
/// a batch already in flight when the flag is raised completes and its
/// counts are included in the report. Per-address failures arrive as the
/// batches' `errors` counters and never stop the run.
///
/// # Example
///
/// ```no_run
/// use fieldroute_client::{GeocodeRunner, HttpCandidateFeed};
/// use fieldroute_core::CancelFlag;
///
/// let feed = HttpCandidateFeed::new("http://localhost:3000/api")?;
/// let report = GeocodeRunner::new().run(&feed, &CancelFlag::new())?;
/// println!("{} records geocoded", report.successful);
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone)]
pub struct GeocodeRunner {
    batch_size: u32,
}

impl Default for GeocodeRunner {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl GeocodeRunner {
    /// Create a runner with the default batch size.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of records requested per batch.
    ///
    /// Sizes are clamped to at least one record so the run always
    /// advances through the list.
    #[must_use]
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Run batches until the record list is exhausted or the flag rises.
    ///
    /// The record total is read once up front; offsets then stride
    /// through the list one batch at a time. A batch that examines zero
    /// records ends the run early rather than spinning on a feed whose
    /// status over-counted.
    ///
    /// # Errors
    ///
    /// Returns a [`FeedError`] when the status call or a batch call fails
    /// at the transport level. Counters accumulated before the failure
    /// are discarded; runs are cheap to repeat because geocoded records
    /// come back as `skipped`.
    pub fn run(
        &self,
        feed: &impl CandidateFeed,
        flag: &CancelFlag,
    ) -> Result<GeocodeReport, FeedError> {
        let status = feed.geocode_status()?;
        let mut report = GeocodeReport::default();
        let mut offset: u32 = 0;

        while u64::from(offset) < status.total {
            if flag.is_cancelled() {
                report.cancelled = true;
                break;
            }

            let batch = feed.geocode_batch(self.batch_size, offset)?;
            report.absorb(&batch);
            info!(
                "Geocoded batch {}: {} processed, {} successful, {} errors, {} skipped",
                report.batches, batch.processed, batch.successful, batch.errors, batch.skipped
            );

            if batch.processed == 0 {
                break;
            }
            let Some(next) = offset.checked_add(self.batch_size) else {
                break;
            };
            offset = next;
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use fieldroute_core::GeocodeStatus;
    use fieldroute_core::test_support::ScriptedFeed;
    use rstest::{fixture, rstest};

    fn ungeocoded_status(total: u64) -> GeocodeStatus {
        GeocodeStatus {
            total,
            with_coordinates: 0,
            without_coordinates: total,
            percentage_complete: 0.0,
        }
    }

    fn batch(processed: u32, successful: u32, errors: u32, skipped: u32) -> GeocodeBatch {
        GeocodeBatch {
            processed,
            successful,
            errors,
            skipped,
        }
    }

    /// 250 ungeocoded records served as ten full batches of 25.
    #[fixture]
    fn backlog_feed() -> ScriptedFeed {
        let mut feed = ScriptedFeed::new(vec![]).with_status(ungeocoded_status(250));
        for _ in 0..10 {
            feed = feed.push_batch(batch(25, 20, 2, 3));
        }
        feed
    }

    #[rstest]
    fn run_walks_the_whole_backlog(backlog_feed: ScriptedFeed) {
        let report = GeocodeRunner::new()
            .run(&backlog_feed, &CancelFlag::new())
            .expect("run should succeed");

        assert_eq!(report.batches, 10);
        assert_eq!(report.processed, 250);
        assert_eq!(report.successful, 200);
        assert_eq!(report.errors, 20);
        assert_eq!(report.skipped, 30);
        assert!(!report.cancelled);

        let offsets: Vec<u32> = backlog_feed
            .batch_calls()
            .into_iter()
            .map(|(_, offset)| offset)
            .collect();
        assert_eq!(offsets, vec![0, 25, 50, 75, 100, 125, 150, 175, 200, 225]);
    }

    #[rstest]
    fn cancel_mid_run_stops_before_the_next_batch(backlog_feed: ScriptedFeed) {
        let flag = CancelFlag::new();
        let feed = backlog_feed.cancel_after(5, &flag);

        let report = GeocodeRunner::new()
            .run(&feed, &flag)
            .expect("run should succeed");

        assert!(report.cancelled);
        assert_eq!(report.batches, 5);
        assert_eq!(report.processed, 125);
        assert_eq!(feed.batch_calls().len(), 5);
    }

    #[rstest]
    fn raised_flag_prevents_any_batch(backlog_feed: ScriptedFeed) {
        let flag = CancelFlag::new();
        flag.cancel();

        let report = GeocodeRunner::new()
            .run(&backlog_feed, &flag)
            .expect("run should succeed");

        assert!(report.cancelled);
        assert_eq!(report.batches, 0);
        assert!(backlog_feed.batch_calls().is_empty());
    }

    #[rstest]
    fn transport_failure_aborts_the_run() {
        let feed = ScriptedFeed::new(vec![])
            .with_status(ungeocoded_status(100))
            .push_batch(batch(25, 25, 0, 0))
            .push_error(FeedError::Network {
                url: "http://leads.example.com/api/geocode/batch".into(),
                message: "connection reset".into(),
            });

        let err = GeocodeRunner::new()
            .run(&feed, &CancelFlag::new())
            .expect_err("second batch should abort the run");

        assert!(matches!(err, FeedError::Network { .. }));
        assert_eq!(feed.batch_calls().len(), 2);
    }

    #[rstest]
    fn empty_batch_ends_an_overcounted_run() {
        let feed = ScriptedFeed::new(vec![])
            .with_status(ungeocoded_status(100))
            .push_batch(batch(40, 40, 0, 0));

        let report = GeocodeRunner::new()
            .with_batch_size(40)
            .run(&feed, &CancelFlag::new())
            .expect("run should succeed");

        // The second call drew nothing, so the run stops there instead of
        // striding on to the status total.
        assert_eq!(report.batches, 2);
        assert_eq!(report.processed, 40);
        assert!(!report.cancelled);
    }

    #[rstest]
    fn fully_geocoded_pool_needs_no_batches() {
        let feed = ScriptedFeed::new(vec![]);

        let report = GeocodeRunner::new()
            .run(&feed, &CancelFlag::new())
            .expect("run should succeed");

        assert_eq!(report, GeocodeReport::default());
    }

    #[rstest]
    fn batch_size_is_clamped_to_one() {
        let feed = ScriptedFeed::new(vec![])
            .with_status(ungeocoded_status(2))
            .push_batch(batch(1, 1, 0, 0))
            .push_batch(batch(1, 0, 1, 0));

        let report = GeocodeRunner::new()
            .with_batch_size(0)
            .run(&feed, &CancelFlag::new())
            .expect("run should succeed");

        assert_eq!(report.batches, 2);
        assert_eq!(feed.batch_calls(), vec![(1, 0), (1, 1)]);
    }
}
