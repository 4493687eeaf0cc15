//! Output types: page records, translation history and run summaries.
//!
//! [`PageRecord`] is the unit of persistence: one JSON line per attempted
//! page in the result log. Every field is always serialised (`null` when
//! absent) so downstream tools never have to guess whether a key is missing
//! or merely empty.

use serde::{Deserialize, Serialize};

/// Final outcome of one page.
///
/// `Undefined` is the state a page is in before it resolves; the driver never
/// writes it, but it is accepted when reading logs produced by other tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    Success,
    SkippedEmptyPage,
    FailedAfterRetries,
    FailedInvalidArgument,
    FailedGenericError,
    #[default]
    Undefined,
}

impl PageStatus {
    /// The wire name used in the result log.
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Success => "success",
            PageStatus::SkippedEmptyPage => "skipped_empty_page",
            PageStatus::FailedAfterRetries => "failed_after_retries",
            PageStatus::FailedInvalidArgument => "failed_invalid_argument",
            PageStatus::FailedGenericError => "failed_generic_error",
            PageStatus::Undefined => "undefined",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            PageStatus::FailedAfterRetries
                | PageStatus::FailedInvalidArgument
                | PageStatus::FailedGenericError
        )
    }
}

impl std::fmt::Display for PageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One line of the result log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRecord {
    /// 1-indexed page number, strictly increasing within a run.
    pub page_number: usize,
    pub status: PageStatus,
    /// Extracted or OCR'd source text; `None` when extraction itself failed.
    pub original_text: Option<String>,
    /// Model output; only set when `status == Success`.
    pub translated_text: Option<String>,
    /// Human-readable failure detail; `None` on success and skipped pages.
    pub error_message: Option<String>,
}

impl PageRecord {
    pub fn success(page_number: usize, original: String, translated: String) -> Self {
        Self {
            page_number,
            status: PageStatus::Success,
            original_text: Some(original),
            translated_text: Some(translated),
            error_message: None,
        }
    }

    pub fn skipped(page_number: usize, original: String) -> Self {
        Self {
            page_number,
            status: PageStatus::SkippedEmptyPage,
            original_text: Some(original),
            translated_text: None,
            error_message: None,
        }
    }

    pub fn failed(
        page_number: usize,
        status: PageStatus,
        original: Option<String>,
        error_message: impl Into<String>,
    ) -> Self {
        Self {
            page_number,
            status,
            original_text: original,
            translated_text: None,
            error_message: Some(error_message.into()),
        }
    }
}

/// The most recent successful (source, translation) pair.
///
/// Used to condition the next prompt so terminology and tone carry over
/// from page to page. Only a successful page replaces it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryState {
    pub source: String,
    pub translation: String,
}

impl HistoryState {
    pub fn new(source: impl Into<String>, translation: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            translation: translation.into(),
        }
    }

    /// Seed history from a previously logged success.
    pub fn from_record(record: &PageRecord) -> Option<Self> {
        match (&record.status, &record.original_text, &record.translated_text) {
            (PageStatus::Success, Some(src), Some(tr)) => Some(Self::new(src.clone(), tr.clone())),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source.trim().is_empty() || self.translation.trim().is_empty()
    }
}

/// Why the page loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Every page of a static document was attempted.
    SourceExhausted,
    /// The configured `max_pages` limit was reached.
    PageLimit,
    /// The live reader reported it is on the last page.
    EndOfBook,
    /// The live reader could not turn the page.
    NavigationFailed,
    /// Too many blank pages in a row on a live reader.
    ConsecutiveEmptyPages,
    /// The caller asked the run to stop.
    Cancelled,
}

/// Counters for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Page number the run started after (0 for a fresh run).
    pub resumed_after: usize,
    /// Pages for which a record was written.
    pub attempted: usize,
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Last page number written during this run, if any.
    pub last_page: Option<usize>,
    pub stop_reason: StopReason,
    pub duration_ms: u64,
}

impl RunSummary {
    pub(crate) fn new(resumed_after: usize) -> Self {
        Self {
            resumed_after,
            attempted: 0,
            succeeded: 0,
            skipped: 0,
            failed: 0,
            last_page: None,
            stop_reason: StopReason::SourceExhausted,
            duration_ms: 0,
        }
    }

    pub(crate) fn record(&mut self, record: &PageRecord) {
        self.attempted += 1;
        self.last_page = Some(record.page_number);
        match record.status {
            PageStatus::Success => self.succeeded += 1,
            PageStatus::SkippedEmptyPage => self.skipped += 1,
            s if s.is_failure() => self.failed += 1,
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_serialises_all_fields() {
        let rec = PageRecord::skipped(2, "   ".into());
        let json = serde_json::to_string(&rec).unwrap();
        assert!(json.contains("\"status\":\"skipped_empty_page\""), "got: {json}");
        assert!(json.contains("\"translated_text\":null"));
        assert!(json.contains("\"error_message\":null"));
    }

    #[test]
    fn status_wire_names_match_serde() {
        for status in [
            PageStatus::Success,
            PageStatus::SkippedEmptyPage,
            PageStatus::FailedAfterRetries,
            PageStatus::FailedInvalidArgument,
            PageStatus::FailedGenericError,
            PageStatus::Undefined,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json, format!("\"{}\"", status.as_str()));
        }
    }

    #[test]
    fn history_from_failed_record_is_none() {
        let rec = PageRecord::failed(1, PageStatus::FailedGenericError, Some("a".into()), "x");
        assert!(HistoryState::from_record(&rec).is_none());

        let ok = PageRecord::success(1, "ciao".into(), "hello".into());
        assert_eq!(
            HistoryState::from_record(&ok),
            Some(HistoryState::new("ciao", "hello"))
        );
    }

    #[test]
    fn summary_counts_by_status() {
        let mut s = RunSummary::new(0);
        s.record(&PageRecord::success(1, "a".into(), "b".into()));
        s.record(&PageRecord::skipped(2, String::new()));
        s.record(&PageRecord::failed(3, PageStatus::FailedAfterRetries, None, "429"));
        assert_eq!((s.attempted, s.succeeded, s.skipped, s.failed), (3, 1, 1, 1));
        assert_eq!(s.last_page, Some(3));
    }
}
