//! # edgequake-book-translate
//!
//! Translate whole books page by page with a language model, keeping a
//! crash-safe record of every page.
//!
//! Each page's prompt carries the previous successful page (source and
//! translation) as a worked example, so names, terminology and tone stay
//! consistent across hundreds of pages. Results go to an append-only JSONL
//! log, one line per page, and a small checkpoint file lets an interrupted
//! run pick up where it stopped.
//!
//! ## Pipeline Overview
//!
//! ```text
//! page source ─▶ (OCR) ─▶ prompt ─▶ model ─▶ result log + checkpoint
//!  PDF text      image     + prior   retry    JSONL       {pages_completed,
//!  Kindle shot   → text      page    on 429               last_page, ts}
//! ```
//!
//! 1. **Source**: a PDF's text layer ([`PdfTextSource`]) or live screenshots
//!    of the Kindle web reader (`KindleSession`, feature `kindle`)
//! 2. **OCR**: captured images go through the model's vision input first
//! 3. **Prompt**: [`prompts::compose_prompt`] adds the previous page pair
//! 4. **Model**: any `edgequake_llm` provider, behind [`ModelClient`], with
//!    exponential backoff on quota errors only ([`RetryPolicy`])
//! 5. **Record**: one [`PageRecord`] per page; [`export`] renders the log
//!    as Markdown afterwards
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_book_translate::{translate_pdf, TranslationConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / GEMINI_API_KEY / ANTHROPIC_API_KEY
//!     let config = TranslationConfig::builder()
//!         .prompt_template("Translate this Italian novel page into English.")
//!         .checkpoint_path("novel_progress.json")
//!         .build()?;
//!     let summary = translate_pdf("novel.pdf", "novel.jsonl", &config, std::future::pending()).await?;
//!     eprintln!("{} translated, {} failed", summary.succeeded, summary.failed);
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | Enables the `booktrans` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `kindle` | on      | Live Kindle Cloud Reader source via chromiumoxide |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod checkpoint;
pub mod config;
pub mod error;
pub mod export;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod result_log;
pub mod translate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use config::{PageSeparator, TranslationConfig, TranslationConfigBuilder};
pub use error::{ModelError, TranslateError};
pub use export::{export_markdown, ExportOptions, ExportStats};
pub use output::{HistoryState, PageRecord, PageStatus, RunSummary, StopReason};
pub use pipeline::llm::{ModelClient, ProviderClient};
pub use pipeline::retry::RetryPolicy;
pub use pipeline::source::{PageContent, PageSource, PdfTextSource};
pub use progress::{NoopProgressCallback, ProgressCallback, TranslationProgressCallback};
pub use result_log::ResultLog;
pub use translate::{process_page, run_pipeline, translate_pdf, translate_source, PageOutcome};

#[cfg(feature = "kindle")]
pub use pipeline::kindle::{KindleOptions, KindleSession};
