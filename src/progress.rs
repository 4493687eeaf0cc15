//! Progress-callback trait for per-page translation events.
//!
//! Inject an [`Arc<dyn TranslationProgressCallback>`] via
//! [`crate::config::TranslationConfigBuilder::progress_callback`] to receive
//! events as the driver works through the book.
//!
//! # Example
//!
//! ```rust
//! use edgequake_book_translate::{PageRecord, TranslationConfig, TranslationProgressCallback};
//! use std::sync::{Arc, atomic::{AtomicUsize, Ordering}};
//!
//! struct CountingCallback {
//!     written: AtomicUsize,
//! }
//!
//! impl TranslationProgressCallback for CountingCallback {
//!     fn on_page_recorded(&self, record: &PageRecord) {
//!         self.written.fetch_add(1, Ordering::SeqCst);
//!         eprintln!("page {} → {}", record.page_number, record.status);
//!     }
//! }
//!
//! let cb = Arc::new(CountingCallback { written: AtomicUsize::new(0) });
//! let config = TranslationConfig::builder()
//!     .progress_callback(cb as Arc<dyn TranslationProgressCallback>)
//!     .build()
//!     .unwrap();
//! ```

use crate::output::{PageRecord, RunSummary};
use std::sync::Arc;

/// Called by the pipeline driver as it processes each page.
///
/// Pages are processed strictly in order, one at a time, so events for a run
/// never interleave. Implementations still must be `Send + Sync` because the
/// config that carries them is shared across tasks. All methods default to
/// no-ops.
pub trait TranslationProgressCallback: Send + Sync {
    /// Called once before the first page.
    ///
    /// # Arguments
    /// * `first_page`: 1-indexed page the run starts at (after any resume)
    /// * `total_pages`: page count when known (static documents), else `None`
    fn on_run_start(&self, first_page: usize, total_pages: Option<usize>) {
        let _ = (first_page, total_pages);
    }

    /// Called before a page is fetched.
    fn on_page_start(&self, page_number: usize) {
        let _ = page_number;
    }

    /// Called after the page's record has been appended to the result log.
    fn on_page_recorded(&self, record: &PageRecord) {
        let _ = record;
    }

    /// Called once after the loop ends, whatever the reason.
    fn on_run_complete(&self, summary: &RunSummary) {
        let _ = summary;
    }
}

/// A no-op implementation for callers that don't need progress events.
pub struct NoopProgressCallback;

impl TranslationProgressCallback for NoopProgressCallback {}

/// Convenience alias matching the type stored in [`crate::config::TranslationConfig`].
pub type ProgressCallback = Arc<dyn TranslationProgressCallback>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::PageStatus;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct TrackingCallback {
        starts: AtomicUsize,
        successes: AtomicUsize,
        failures: AtomicUsize,
        first_page: AtomicUsize,
    }

    impl TranslationProgressCallback for TrackingCallback {
        fn on_run_start(&self, first_page: usize, _total_pages: Option<usize>) {
            self.first_page.store(first_page, Ordering::SeqCst);
        }

        fn on_page_start(&self, _page_number: usize) {
            self.starts.fetch_add(1, Ordering::SeqCst);
        }

        fn on_page_recorded(&self, record: &PageRecord) {
            if record.status == PageStatus::Success {
                self.successes.fetch_add(1, Ordering::SeqCst);
            } else if record.status.is_failure() {
                self.failures.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    #[test]
    fn noop_callback_does_not_panic() {
        let cb = NoopProgressCallback;
        cb.on_run_start(1, Some(5));
        cb.on_page_start(1);
        cb.on_page_recorded(&PageRecord::skipped(1, String::new()));
        cb.on_run_complete(&RunSummary::new(0));
    }

    #[test]
    fn tracking_callback_receives_events() {
        let tracker = TrackingCallback::default();
        tracker.on_run_start(4, None);
        tracker.on_page_start(4);
        tracker.on_page_recorded(&PageRecord::success(4, "a".into(), "b".into()));
        tracker.on_page_start(5);
        tracker.on_page_recorded(&PageRecord::failed(
            5,
            PageStatus::FailedGenericError,
            None,
            "boom",
        ));

        assert_eq!(tracker.first_page.load(Ordering::SeqCst), 4);
        assert_eq!(tracker.starts.load(Ordering::SeqCst), 2);
        assert_eq!(tracker.successes.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.failures.load(Ordering::SeqCst), 1);
    }
}
