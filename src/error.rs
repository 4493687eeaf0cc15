//! Error types for the edgequake-book-translate library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`TranslateError`]: **Fatal**: the run cannot start or cannot keep its
//!   records consistent (missing input file, empty document, provider not
//!   configured, result log not writable). Returned as `Err(TranslateError)`
//!   from the top-level `translate*` functions.
//!
//! * [`ModelError`]: **Non-fatal**: a single model call failed (quota,
//!   bad input, timeout). It is classified into a
//!   [`crate::output::PageStatus`] and written to the result log; the run
//!   moves on to the next page.

use crate::output::PageStatus;
use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the edgequake-book-translate library.
///
/// Page-level failures use [`ModelError`] and end up in
/// [`crate::output::PageRecord::error_message`] rather than here.
#[derive(Debug, Error)]
pub enum TranslateError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("The file '{path}' was not found.\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── PDF errors ────────────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The document opened fine but has no pages to translate.
    #[error("The PDF file '{path}' does not contain any pages.")]
    EmptyDocument { path: PathBuf },

    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Text extraction needs a pdfium shared library. You can:\n\
  • Place libpdfium next to the binary or in the working directory.\n\
  • Install it system-wide (e.g. from bblanchon/pdfium-binaries).\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium.\n"
    )]
    PdfiumBindingFailed(String),

    /// One page could not be produced by its source. Recorded per page by
    /// the driver rather than aborting the run.
    #[error("Page {page} could not be read: {detail}")]
    PageUnavailable { page: usize, detail: String },

    // ── Live reader errors ────────────────────────────────────────────────
    /// The browser session could not be launched or driven.
    #[error("Browser session error: {0}")]
    Browser(String),

    /// The user did not complete an interactive setup step in time.
    #[error("Timed out after {secs}s waiting for {step}")]
    SetupTimeout { step: String, secs: u64 },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    // ── Record-keeping errors ─────────────────────────────────────────────
    /// A page record could not be appended to the result log.
    #[error("Failed to append to result log '{path}': {source}")]
    LogWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The result log exists but could not be read.
    #[error("Failed to read result log '{path}': {source}")]
    LogReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The checkpoint could not be written or read from disk.
    #[error("Checkpoint I/O failed for '{path}': {source}")]
    CheckpointIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The checkpoint file exists but is not a valid checkpoint record.
    #[error("Checkpoint '{path}' is corrupt: {detail}\nDelete it to start over from page 1.")]
    CorruptCheckpoint { path: PathBuf, detail: String },

    /// Could not create or write an exported document.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure of a single model call (translation or OCR).
///
/// The variants form a closed taxonomy: the retry policy only retries
/// [`ModelError::TransientQuota`], and the driver maps every variant to
/// exactly one [`PageStatus`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// Rate or quota limit hit; expected to succeed after a delay.
    #[error("quota exhausted: {0}")]
    TransientQuota(String),

    /// Caller error: empty prompt, unreadable image, rejected argument.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The call did not complete within the configured deadline.
    #[error("deadline exceeded: {0}")]
    DeadlineExceeded(String),

    /// Anything else.
    #[error("{0}")]
    Generic(String),
}

impl ModelError {
    /// Whether the retry policy may try this call again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ModelError::TransientQuota(_))
    }

    /// The page status recorded when this is the final error for a page.
    pub fn page_status(&self) -> PageStatus {
        match self {
            ModelError::TransientQuota(_) | ModelError::DeadlineExceeded(_) => {
                PageStatus::FailedAfterRetries
            }
            ModelError::InvalidInput(_) => PageStatus::FailedInvalidArgument,
            ModelError::Generic(_) => PageStatus::FailedGenericError,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_quota_is_retryable() {
        assert!(ModelError::TransientQuota("429".into()).is_retryable());
        assert!(!ModelError::DeadlineExceeded("60s".into()).is_retryable());
        assert!(!ModelError::InvalidInput("empty".into()).is_retryable());
        assert!(!ModelError::Generic("boom".into()).is_retryable());
    }

    #[test]
    fn model_errors_map_to_statuses() {
        assert_eq!(
            ModelError::TransientQuota("x".into()).page_status(),
            PageStatus::FailedAfterRetries
        );
        assert_eq!(
            ModelError::DeadlineExceeded("x".into()).page_status(),
            PageStatus::FailedAfterRetries
        );
        assert_eq!(
            ModelError::InvalidInput("x".into()).page_status(),
            PageStatus::FailedInvalidArgument
        );
        assert_eq!(
            ModelError::Generic("x".into()).page_status(),
            PageStatus::FailedGenericError
        );
    }

    #[test]
    fn empty_document_display() {
        let e = TranslateError::EmptyDocument {
            path: PathBuf::from("book.pdf"),
        };
        assert!(e.to_string().contains("book.pdf"), "got: {e}");
        assert!(e.to_string().contains("does not contain any pages"));
    }

    #[test]
    fn setup_timeout_display() {
        let e = TranslateError::SetupTimeout {
            step: "login".into(),
            secs: 300,
        };
        assert!(e.to_string().contains("300s"));
        assert!(e.to_string().contains("login"));
    }
}
