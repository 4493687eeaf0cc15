//! The page loop: fetch, (OCR), translate, record, checkpoint.
//!
//! Pages are processed strictly one after another because each prompt
//! carries the previous successful page as a worked example. A page that
//! fails is recorded and the loop moves on; only failures to keep the
//! result log or checkpoint consistent abort the run.
//!
//! ## Resume
//!
//! With a checkpoint path configured, the checkpoint is read once at start.
//! Static sources begin at `pages_completed + 1`; navigable sources are
//! turned forward `pages_completed` times first, since they can only show
//! the current page.
//!
//! ## Cancellation
//!
//! The caller passes any future as the cancel signal. It is raced against
//! each page; when it wins, the page in flight is dropped with no record
//! and no checkpoint update, so the next run redoes exactly that page.

use crate::checkpoint::{Checkpoint, CheckpointStore};
use crate::config::TranslationConfig;
use crate::error::{ModelError, TranslateError};
use crate::output::{HistoryState, PageRecord, PageStatus, RunSummary, StopReason};
use crate::pipeline::llm::{ModelClient, ProviderClient};
use crate::pipeline::postprocess::clean_model_text;
use crate::pipeline::source::{PageContent, PageSource, PdfTextSource};
use crate::prompts::compose_prompt;
use crate::result_log::ResultLog;
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What happened to one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageOutcome {
    Translated {
        source: String,
        translation: String,
    },
    /// The page had no text; no model call was made.
    Skipped { content: String },
    Failed {
        status: PageStatus,
        /// Page text, when the failure came after extraction.
        original: Option<String>,
        error: String,
        /// The final error was a quota error.
        quota_exhausted: bool,
    },
}

impl PageOutcome {
    fn failed(error: &ModelError, original: Option<String>, context: &str) -> Self {
        PageOutcome::Failed {
            status: error.page_status(),
            original,
            error: format!("{context}{error}"),
            quota_exhausted: matches!(error, ModelError::TransientQuota(_)),
        }
    }

    /// `Some(true)` for a blank page, `Some(false)` when text was found,
    /// `None` when the page could not be read at all.
    pub fn content_blank(&self) -> Option<bool> {
        match self {
            PageOutcome::Skipped { .. } => Some(true),
            PageOutcome::Translated { .. } => Some(false),
            PageOutcome::Failed { original, .. } => original.as_ref().map(|_| false),
        }
    }

    pub fn into_record(self, page_number: usize) -> PageRecord {
        match self {
            PageOutcome::Translated {
                source,
                translation,
            } => PageRecord::success(page_number, source, translation),
            PageOutcome::Skipped { content } => PageRecord::skipped(page_number, content),
            PageOutcome::Failed {
                status,
                original,
                error,
                ..
            } => PageRecord::failed(page_number, status, original, error),
        }
    }
}

/// Process one page and return its outcome with the updated history.
///
/// History is replaced only on success; every other outcome hands back the
/// `history` it was given.
pub async fn process_page<S, C>(
    source: &mut S,
    client: &C,
    config: &TranslationConfig,
    page_number: usize,
    history: HistoryState,
) -> (PageOutcome, HistoryState)
where
    S: PageSource + ?Sized,
    C: ModelClient + ?Sized,
{
    let policy = config.retry_policy();

    let content = match source.fetch(page_number).await {
        Ok(content) => content,
        Err(e) => {
            let outcome = PageOutcome::Failed {
                status: PageStatus::FailedGenericError,
                original: None,
                error: e.to_string(),
                quota_exhausted: false,
            };
            return (outcome, history);
        }
    };

    let text = match content {
        PageContent::Text(text) => text,
        PageContent::Image(path) => {
            let instruction = config.ocr_instruction();
            let label = format!("Page {page_number} OCR");
            match policy
                .run(&label, instruction, || client.extract_text(&path, instruction))
                .await
            {
                Ok(raw) => clean_model_text(&raw),
                Err(e) => return (PageOutcome::failed(&e, None, "text extraction failed: "), history),
            }
        }
    };

    if text.trim().is_empty() {
        return (PageOutcome::Skipped { content: text }, history);
    }

    let prompt = compose_prompt(
        config.template(),
        &text,
        &history.source,
        &history.translation,
    );
    debug!("Page {}: prompt is {} chars", page_number, prompt.len());

    let label = format!("Page {page_number}");
    match policy.run(&label, &prompt, || client.generate(&prompt)).await {
        Ok(raw) => {
            let translation = clean_model_text(&raw);
            let next = HistoryState::new(text.clone(), translation.clone());
            let outcome = PageOutcome::Translated {
                source: text,
                translation,
            };
            (outcome, next)
        }
        Err(e) => (PageOutcome::failed(&e, Some(text), ""), history),
    }
}

/// Drive `source` page by page until it is exhausted, a limit is hit, or
/// `cancel` resolves.
///
/// Returns `Err` only when the result log or checkpoint cannot be read or
/// written; per-page failures are in the log.
pub async fn run_pipeline<S, C, F>(
    source: &mut S,
    client: &C,
    log: &ResultLog,
    config: &TranslationConfig,
    cancel: F,
) -> Result<RunSummary, TranslateError>
where
    S: PageSource + ?Sized,
    C: ModelClient + ?Sized,
    F: Future<Output = ()>,
{
    let started = Instant::now();
    let store = config.checkpoint_path.as_ref().map(CheckpointStore::new);
    let resume = match &store {
        Some(store) => store.load().await?,
        None => Checkpoint::default(),
    };
    let resumed_after = resume.pages_completed;
    let mut summary = RunSummary::new(resumed_after);

    let mut history = if config.resume_history && resumed_after > 0 {
        seed_history(log, resumed_after).await?
    } else {
        HistoryState::default()
    };

    tokio::pin!(cancel);
    let cb = config.progress_callback.as_ref();

    if resumed_after > 0 {
        info!("Resuming from page {}", resumed_after + 1);
        if source.is_navigable() {
            for _ in 0..resumed_after {
                if !source.advance().await {
                    warn!("Could not turn forward to the resume point");
                    summary.stop_reason = StopReason::NavigationFailed;
                    return Ok(finish(summary, started, cb));
                }
            }
        }
    }

    if let Some(cb) = cb {
        cb.on_run_start(resumed_after + 1, source.page_count());
    }

    let mut page_number = resumed_after + 1;
    let mut consecutive_empty = 0usize;

    summary.stop_reason = loop {
        if source.page_count().is_some_and(|total| page_number > total) {
            break StopReason::SourceExhausted;
        }
        if config.max_pages.is_some_and(|max| page_number > max) {
            info!("Reached maximum page limit: {}", page_number - 1);
            break StopReason::PageLimit;
        }

        if let Some(cb) = cb {
            cb.on_page_start(page_number);
        }
        debug!("Processing page {}", page_number);

        let step = process_page(
            &mut *source,
            client,
            config,
            page_number,
            std::mem::take(&mut history),
        );
        let (outcome, next_history) = tokio::select! {
            biased;
            _ = &mut cancel => {
                info!("Cancelled before page {} finished; it will be redone on resume", page_number);
                break StopReason::Cancelled;
            }
            result = step => result,
        };
        history = next_history;

        let blank = outcome.content_blank();
        let quota_exhausted = matches!(
            outcome,
            PageOutcome::Failed {
                quota_exhausted: true,
                ..
            }
        );

        let record = outcome.into_record(page_number);
        log_record(&record);
        log.append(&record).await?;
        summary.record(&record);
        if let Some(cb) = cb {
            cb.on_page_recorded(&record);
        }
        if let Some(store) = &store {
            store.save(page_number, page_number).await?;
        }

        let cooldown = config.quota_cooldown();
        if quota_exhausted && !cooldown.is_zero() {
            info!("Quota exhausted; waiting {}s before continuing", cooldown.as_secs());
            tokio::select! {
                biased;
                _ = &mut cancel => break StopReason::Cancelled,
                _ = tokio::time::sleep(cooldown) => {}
            }
        }

        if source.is_navigable() {
            match blank {
                Some(true) => consecutive_empty += 1,
                Some(false) => consecutive_empty = 0,
                None => {}
            }
            if consecutive_empty >= config.max_consecutive_empty {
                warn!(
                    "Reached {} consecutive empty pages. Stopping.",
                    consecutive_empty
                );
                break StopReason::ConsecutiveEmptyPages;
            }
            // The page is already recorded, so stopping here keeps the log
            // and checkpoint consistent.
            let advanced = tokio::select! {
                biased;
                _ = &mut cancel => break StopReason::Cancelled,
                advanced = source.advance() => advanced,
            };
            if !advanced {
                info!("Could not navigate to the next page");
                break StopReason::NavigationFailed;
            }
            let terminal = tokio::select! {
                biased;
                _ = &mut cancel => break StopReason::Cancelled,
                terminal = source.is_terminal() => terminal,
            };
            if terminal {
                info!("Reached the last page of the book");
                break StopReason::EndOfBook;
            }
        }

        page_number += 1;
    };

    Ok(finish(summary, started, cb))
}

fn finish(
    mut summary: RunSummary,
    started: Instant,
    cb: Option<&crate::progress::ProgressCallback>,
) -> RunSummary {
    summary.duration_ms = started.elapsed().as_millis() as u64;
    info!(
        "Run finished ({:?}): {} pages, {} translated, {} skipped, {} failed, {}ms",
        summary.stop_reason,
        summary.attempted,
        summary.succeeded,
        summary.skipped,
        summary.failed,
        summary.duration_ms
    );
    if let Some(cb) = cb {
        cb.on_run_complete(&summary);
    }
    summary
}

fn log_record(record: &PageRecord) {
    match (&record.status, &record.error_message) {
        (PageStatus::Success, _) => info!("Page {}: translated", record.page_number),
        (PageStatus::SkippedEmptyPage, _) => {
            warn!("Page {} has no extractable text, skipped", record.page_number)
        }
        (status, Some(err)) => warn!("Page {}: {}: {}", record.page_number, status, err),
        (status, None) => warn!("Page {}: {}", record.page_number, status),
    }
}

/// History from the last success at or before `resumed_after`.
async fn seed_history(log: &ResultLog, resumed_after: usize) -> Result<HistoryState, TranslateError> {
    let records = log.read_records().await?;
    let seeded = records
        .iter()
        .rev()
        .filter(|r| r.page_number <= resumed_after)
        .find_map(HistoryState::from_record)
        .unwrap_or_default();
    if !seeded.is_empty() {
        debug!("Seeded translation history from the result log");
    }
    Ok(seeded)
}

// ── Entry points ─────────────────────────────────────────────────────────

/// Translate a PDF (path or URL) into the JSONL result log at `log_path`.
///
/// # Errors
/// Setup failures (missing file, not a PDF, empty document, no provider)
/// and result-log or checkpoint I/O failures. Page failures are recorded
/// in the log instead.
pub async fn translate_pdf(
    input: impl AsRef<str>,
    log_path: impl AsRef<Path>,
    config: &TranslationConfig,
    cancel: impl Future<Output = ()>,
) -> Result<RunSummary, TranslateError> {
    let input = input.as_ref();
    info!("Starting translation: {}", input);
    let mut source = PdfTextSource::open(
        input,
        config.password.as_deref(),
        config.download_timeout_secs,
    )
    .await?;
    translate_source(&mut source, log_path, config, cancel).await
}

/// Translate any page source with the configured provider.
pub async fn translate_source<S: PageSource + ?Sized>(
    source: &mut S,
    log_path: impl AsRef<Path>,
    config: &TranslationConfig,
    cancel: impl Future<Output = ()>,
) -> Result<RunSummary, TranslateError> {
    let provider = resolve_provider(config).await?;
    let client = ProviderClient::new(provider, config);
    let log = ResultLog::new(log_path.as_ref());
    run_pipeline(source, &client, &log, config, cancel).await
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        TranslateError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

const DEFAULT_OPENAI_MODEL: &str = "gpt-4.1-nano";

/// Resolve the LLM provider, from most-specific to least-specific:
///
/// 1. a pre-built provider on the config
/// 2. `provider_name` (+ `model`) on the config
/// 3. `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`, when both are set
/// 4. OpenAI when `OPENAI_API_KEY` is set
/// 5. whatever [`ProviderFactory::from_env`] detects
pub async fn resolve_provider(
    config: &TranslationConfig,
) -> Result<Arc<dyn LLMProvider>, TranslateError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    if std::env::var("OPENAI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        let model = config.model.as_deref().unwrap_or(DEFAULT_OPENAI_MODEL);
        return create_provider("openai", model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| TranslateError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, GEMINI_API_KEY, ANTHROPIC_API_KEY, or pass --provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
