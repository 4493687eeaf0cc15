//! CLI binary for edgequake-book-translate.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `TranslationConfig`, wires Ctrl-C to cancellation and prints results.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use edgequake_book_translate::{
    export_markdown, translate_pdf, translate_source, ExportOptions, PageRecord, PageSeparator,
    PageStatus, ProgressCallback, RunSummary, StopReason, TranslationConfig,
    TranslationProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a bar when the page count is known, a
/// spinner with a page counter for live readers, and one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    page_started: Mutex<Option<Instant>>,
    failures: AtomicUsize,
}

impl CliProgressCallback {
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);
        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Opening source…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            failures: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, remaining: usize) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(remaining as u64);
        self.bar.set_style(style);
        self.bar.set_prefix("Translating");
        self.bar.reset_eta();
    }

    fn activate_counter(&self) {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  {pos} pages  ⏱ {elapsed_precise}  {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(TICKS);
        self.bar.set_style(style);
        self.bar.set_prefix("Translating");
    }

    fn elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut started| started.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl TranslationProgressCallback for CliProgressCallback {
    fn on_run_start(&self, first_page: usize, total_pages: Option<usize>) {
        match total_pages {
            Some(total) => {
                let remaining = total.saturating_sub(first_page - 1);
                self.activate_bar(remaining);
                self.bar.println(format!(
                    "{} {}",
                    cyan("◆"),
                    bold(&format!(
                        "Translating pages {first_page}–{total} ({remaining} pages)…"
                    ))
                ));
            }
            None => {
                self.activate_counter();
                self.bar.println(format!(
                    "{} {}",
                    cyan("◆"),
                    bold(&format!("Translating from page {first_page}…"))
                ));
            }
        }
    }

    fn on_page_start(&self, page_number: usize) {
        if let Ok(mut started) = self.page_started.lock() {
            *started = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_number}"));
    }

    fn on_page_recorded(&self, record: &PageRecord) {
        let secs = dim(&format!("{:.1}s", self.elapsed_secs()));
        let line = match record.status {
            PageStatus::Success => {
                let chars = record
                    .translated_text
                    .as_deref()
                    .map(|t| t.chars().count())
                    .unwrap_or(0);
                format!(
                    "  {} Page {:>4}  {:<8}  {}",
                    green("✓"),
                    record.page_number,
                    dim(&format!("{chars:>5} chars")),
                    secs
                )
            }
            PageStatus::SkippedEmptyPage => format!(
                "  {} Page {:>4}  {}  {}",
                yellow("∅"),
                record.page_number,
                dim("empty page, skipped"),
                secs
            ),
            status => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                let err = record.error_message.as_deref().unwrap_or("");
                let msg: String = if err.chars().count() > 80 {
                    format!("{}\u{2026}", err.chars().take(79).collect::<String>())
                } else {
                    err.to_string()
                };
                format!(
                    "  {} Page {:>4}  {}  {}  {}",
                    red("✗"),
                    record.page_number,
                    red(status.as_str()),
                    red(&msg),
                    secs
                )
            }
        };
        self.bar.println(line);
        self.bar.inc(1);
    }

    fn on_run_complete(&self, summary: &RunSummary) {
        self.bar.finish_and_clear();
        let failed = self.failures.load(Ordering::SeqCst);
        let icon = if failed == 0 { green("✔") } else { cyan("⚠") };
        eprintln!(
            "{} {} translated, {} skipped, {} failed  ({})",
            icon,
            bold(&summary.succeeded.to_string()),
            summary.skipped,
            if failed == 0 {
                failed.to_string()
            } else {
                red(&failed.to_string())
            },
            describe_stop(summary.stop_reason)
        );
    }
}

fn describe_stop(reason: StopReason) -> &'static str {
    match reason {
        StopReason::SourceExhausted => "all pages done",
        StopReason::PageLimit => "page limit reached",
        StopReason::EndOfBook => "end of book",
        StopReason::NavigationFailed => "could not turn the page",
        StopReason::ConsecutiveEmptyPages => "too many empty pages in a row",
        StopReason::Cancelled => "interrupted; progress saved",
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Translate a PDF; results go to novel.jsonl, progress to novel_progress.json
  booktrans pdf novel.pdf --prompt prompts/it_en.txt

  # Resume after an interruption: run the same command again
  booktrans pdf novel.pdf --prompt prompts/it_en.txt

  # Translate from a URL with a specific model
  booktrans pdf https://example.org/libro.pdf --provider gemini --model gemini-2.0-flash

  # Translate the book open in Kindle Cloud Reader, at most 50 pages
  booktrans kindle -o mybook.jsonl --max-pages 50

  # Turn a result log into Markdown, with the original text quoted
  booktrans export novel.jsonl -o novel.md --include-original

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to an existing libpdfium
  RUST_LOG                Override log filtering (e.g. edgequake_book_translate=debug)
"#;

/// Translate books page by page with LLMs, with resumable progress.
#[derive(Parser, Debug)]
#[command(
    name = "booktrans",
    version,
    about = "Translate books page by page with LLMs, with resumable progress",
    long_about = "Translate a PDF's text layer, or a book open in the Kindle web reader, one page \
at a time. Each prompt carries the previous page's translation for consistency. Every page is \
recorded in a JSONL log and a checkpoint lets interrupted runs resume.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "BOOKTRANS_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "BOOKTRANS_QUIET")]
    quiet: bool,

    /// Disable progress bar.
    #[arg(long, global = true, env = "BOOKTRANS_NO_PROGRESS")]
    no_progress: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Translate a PDF file or URL.
    Pdf(PdfArgs),
    /// Translate the book open in Kindle Cloud Reader.
    #[cfg(feature = "kindle")]
    Kindle(KindleArgs),
    /// Render a result log as Markdown.
    Export(ExportArgs),
}

#[derive(Args, Debug)]
struct PdfArgs {
    /// Local PDF file path or HTTP/HTTPS URL.
    input: String,

    /// Result log (JSONL). Default: <input stem>.jsonl
    #[arg(short, long, env = "BOOKTRANS_OUTPUT")]
    output: Option<PathBuf>,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "BOOKTRANS_PASSWORD")]
    password: Option<String>,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "BOOKTRANS_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Pause after a page that ran out of quota (seconds).
    #[arg(long, env = "BOOKTRANS_QUOTA_COOLDOWN", default_value_t = 0)]
    quota_cooldown: u64,

    #[command(flatten)]
    run: RunArgs,
}

#[cfg(feature = "kindle")]
#[derive(Args, Debug)]
struct KindleArgs {
    /// Result log (JSONL).
    #[arg(short, long, env = "BOOKTRANS_OUTPUT", default_value = "kindle_translation.jsonl")]
    output: PathBuf,

    /// Run the browser without a window (only useful with a saved session).
    #[arg(long)]
    headless: bool,

    /// Directory for page screenshots.
    #[arg(long, env = "BOOKTRANS_SCREENSHOT_DIR", default_value = "screenshots")]
    screenshot_dir: PathBuf,

    /// Seconds to wait for the manual Amazon login.
    #[arg(long, default_value_t = 300)]
    login_timeout: u64,

    /// Seconds to wait for a book to be opened.
    #[arg(long, default_value_t = 300)]
    book_timeout: u64,

    /// Stop after this many empty pages in a row.
    #[arg(long, env = "BOOKTRANS_MAX_EMPTY", default_value_t = 5)]
    max_consecutive_empty: usize,

    /// Pause after a page that ran out of quota (seconds).
    #[arg(long, env = "BOOKTRANS_QUOTA_COOLDOWN", default_value_t = 60)]
    quota_cooldown: u64,

    /// Start immediately instead of waiting for Enter once the book is open.
    #[arg(long)]
    no_confirm: bool,

    #[command(flatten)]
    run: RunArgs,
}

/// Options shared by every translating subcommand.
#[derive(Args, Debug)]
struct RunArgs {
    /// LLM model ID (e.g. gpt-4.1-nano, gemini-2.0-flash).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Text file with the translation instructions.
    #[arg(long, env = "BOOKTRANS_PROMPT")]
    prompt: Option<PathBuf>,

    /// Text file with the OCR instructions (live reader only).
    #[arg(long, env = "BOOKTRANS_OCR_PROMPT")]
    ocr_prompt: Option<PathBuf>,

    /// Stop after this absolute page number.
    #[arg(long, env = "BOOKTRANS_MAX_PAGES")]
    max_pages: Option<usize>,

    /// Checkpoint file. Default: <log stem>_progress.json beside the log.
    #[arg(long, env = "BOOKTRANS_CHECKPOINT")]
    checkpoint: Option<PathBuf>,

    /// Do not read or write a checkpoint; always start at page 1.
    #[arg(long, conflicts_with = "checkpoint")]
    no_checkpoint: bool,

    /// On resume, reuse the last translated page from the log as context.
    #[arg(long, env = "BOOKTRANS_RESUME_HISTORY")]
    resume_history: bool,

    /// Max LLM output tokens per page.
    #[arg(long, env = "BOOKTRANS_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "BOOKTRANS_TEMPERATURE", default_value_t = 0.3)]
    temperature: f32,

    /// Attempts per model call (retried only on quota errors).
    #[arg(long, env = "BOOKTRANS_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    /// Per-call LLM timeout in seconds.
    #[arg(long, env = "BOOKTRANS_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,
}

#[derive(Args, Debug)]
struct ExportArgs {
    /// Result log (JSONL) to read.
    input: PathBuf,

    /// Markdown file to write. Default: <input stem>.md
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Quote the original text above each translated page.
    #[arg(long)]
    include_original: bool,

    /// Page separator: none, hr, comment, or custom string.
    #[arg(long, default_value = "hr")]
    separator: String,

    /// Prepend YAML front-matter with page counts.
    #[arg(long)]
    metadata: bool,

    /// Document title for the front-matter.
    #[arg(long)]
    title: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // INFO logs are suppressed while the progress bar is active; the bar
    // prints one line per page instead.
    let translating = !matches!(cli.command, Command::Export(_));
    let show_progress = translating && !cli.quiet && !cli.no_progress;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new_dynamic() as Arc<dyn TranslationProgressCallback>)
    } else {
        None
    };

    match cli.command {
        Command::Pdf(args) => run_pdf(args, progress_cb, cli.quiet).await,
        #[cfg(feature = "kindle")]
        Command::Kindle(args) => run_kindle(args, progress_cb, cli.quiet).await,
        Command::Export(args) => run_export(args, cli.quiet).await,
    }
}

async fn run_pdf(args: PdfArgs, progress: Option<ProgressCallback>, quiet: bool) -> Result<()> {
    let log_path = args
        .output
        .clone()
        .unwrap_or_else(|| default_log_path(&args.input));

    let mut builder = base_builder(&args.run, &log_path, progress)
        .await?
        .download_timeout_secs(args.download_timeout)
        .quota_cooldown_secs(args.quota_cooldown);
    if let Some(ref pwd) = args.password {
        builder = builder.password(pwd.clone());
    }
    let config = builder.build().context("Invalid configuration")?;

    let summary = translate_pdf(&args.input, &log_path, &config, ctrl_c())
        .await
        .context("Translation failed")?;
    report(&summary, &log_path, config.progress_callback.is_some(), quiet);
    Ok(())
}

#[cfg(feature = "kindle")]
async fn run_kindle(args: KindleArgs, progress: Option<ProgressCallback>, quiet: bool) -> Result<()> {
    use edgequake_book_translate::{KindleOptions, KindleSession, TranslateError};

    let config = base_builder(&args.run, &args.output, progress)
        .await?
        .max_consecutive_empty(args.max_consecutive_empty)
        .quota_cooldown_secs(args.quota_cooldown)
        .build()
        .context("Invalid configuration")?;

    let options = KindleOptions {
        headless: args.headless,
        screenshot_dir: args.screenshot_dir.clone(),
        ..Default::default()
    };
    let mut session = KindleSession::launch(options)
        .await
        .context("Failed to start the browser")?;

    if !session
        .wait_for_login(Duration::from_secs(args.login_timeout))
        .await
    {
        session.close().await;
        return Err(TranslateError::SetupTimeout {
            step: "login".into(),
            secs: args.login_timeout,
        }
        .into());
    }
    if !session
        .wait_for_book_selection(Duration::from_secs(args.book_timeout))
        .await
    {
        session.close().await;
        return Err(TranslateError::SetupTimeout {
            step: "a book to be opened".into(),
            secs: args.book_timeout,
        }
        .into());
    }

    if !args.no_confirm {
        eprintln!(
            "{} Navigate to the page where translation should start, then press Enter…",
            cyan("◆")
        );
        tokio::task::spawn_blocking(|| {
            let mut line = String::new();
            io::stdin().read_line(&mut line).map(|_| ())
        })
        .await
        .context("stdin task failed")?
        .context("Failed to read from stdin")?;
    }

    let result = translate_source(&mut session, &args.output, &config, ctrl_c()).await;
    session.close().await;
    let summary = result.context("Translation failed")?;
    report(&summary, &args.output, config.progress_callback.is_some(), quiet);
    Ok(())
}

async fn run_export(args: ExportArgs, quiet: bool) -> Result<()> {
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| edgequake_book_translate::export::default_output_path(&args.input));
    let options = ExportOptions {
        include_original: args.include_original,
        separator: parse_separator(&args.separator),
        front_matter: args.metadata,
        title: args.title.clone(),
    };

    let stats = export_markdown(&args.input, &output, &options)
        .await
        .with_context(|| format!("Failed to export {}", args.input.display()))?;

    if !quiet {
        eprintln!(
            "{}  {} pages exported, {} skipped  →  {}",
            green("✔"),
            stats.exported,
            stats.skipped,
            bold(&output.display().to_string())
        );
    }
    Ok(())
}

/// Map shared CLI args onto a config builder.
async fn base_builder(
    run: &RunArgs,
    log_path: &Path,
    progress: Option<ProgressCallback>,
) -> Result<edgequake_book_translate::TranslationConfigBuilder> {
    let mut builder = TranslationConfig::builder()
        .max_tokens(run.max_tokens)
        .temperature(run.temperature)
        .max_attempts(run.max_attempts)
        .api_timeout_secs(run.api_timeout)
        .resume_history(run.resume_history);

    if let Some(ref model) = run.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref provider) = run.provider {
        builder = builder.provider_name(provider.clone());
    }
    if let Some(ref path) = run.prompt {
        builder = builder.prompt_template(read_prompt(path).await?);
    }
    if let Some(ref path) = run.ocr_prompt {
        builder = builder.ocr_prompt(read_prompt(path).await?);
    }
    if let Some(max) = run.max_pages {
        builder = builder.max_pages(max);
    }
    if !run.no_checkpoint {
        let checkpoint = run
            .checkpoint
            .clone()
            .unwrap_or_else(|| default_checkpoint_path(log_path));
        builder = builder.checkpoint_path(checkpoint);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }
    Ok(builder)
}

async fn read_prompt(path: &Path) -> Result<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read prompt from {:?}", path))
}

/// Resolves on the first Ctrl-C; never resolves if the handler can't be installed.
async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}

fn report(summary: &RunSummary, log_path: &Path, progress_shown: bool, quiet: bool) {
    if quiet {
        return;
    }
    if !progress_shown {
        eprintln!(
            "Translated {}/{} pages ({} skipped, {} failed) in {}ms: {}",
            summary.succeeded,
            summary.attempted,
            summary.skipped,
            summary.failed,
            summary.duration_ms,
            describe_stop(summary.stop_reason)
        );
    }
    eprintln!("   results  →  {}", bold(&log_path.display().to_string()));
    if summary.stop_reason == StopReason::Cancelled {
        eprintln!("   {}", dim("run the same command again to resume"));
    }
}

/// `<stem>.jsonl` in the working directory; `translation.jsonl` for URLs
/// without a usable file name.
fn default_log_path(input: &str) -> PathBuf {
    let name = input
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .map(|last| last.split(['?', '#']).next().unwrap_or(last))
        .and_then(|last| Path::new(last).file_stem().map(|s| s.to_os_string()))
        .filter(|s| !s.is_empty());
    match name {
        Some(stem) => PathBuf::from(stem).with_extension("jsonl"),
        None => PathBuf::from("translation.jsonl"),
    }
}

/// `<log stem>_progress.json` beside the log.
fn default_checkpoint_path(log_path: &Path) -> PathBuf {
    let stem = log_path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "translation".to_string());
    log_path.with_file_name(format!("{stem}_progress.json"))
}

/// Parse `--separator` string into `PageSeparator`.
fn parse_separator(s: &str) -> PageSeparator {
    match s.to_lowercase().as_str() {
        "none" => PageSeparator::None,
        "hr" | "---" => PageSeparator::HorizontalRule,
        "comment" => PageSeparator::Comment,
        _ => PageSeparator::Custom(s.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_path_from_input() {
        assert_eq!(default_log_path("books/novel.pdf"), PathBuf::from("novel.jsonl"));
        assert_eq!(
            default_log_path("https://host/files/libro.pdf?dl=1"),
            PathBuf::from("libro.jsonl")
        );
    }

    #[test]
    fn checkpoint_path_sits_beside_log() {
        assert_eq!(
            default_checkpoint_path(Path::new("out/novel.jsonl")),
            PathBuf::from("out/novel_progress.json")
        );
    }

    #[test]
    fn separator_parsing() {
        assert_eq!(parse_separator("HR"), PageSeparator::HorizontalRule);
        assert_eq!(parse_separator("none"), PageSeparator::None);
        assert_eq!(parse_separator("* * *"), PageSeparator::Custom("* * *".into()));
    }

    #[test]
    fn cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["booktrans", "pdf", "book.pdf", "--max-pages", "10"]).unwrap();
        match cli.command {
            Command::Pdf(args) => {
                assert_eq!(args.input, "book.pdf");
                assert_eq!(args.run.max_pages, Some(10));
                assert_eq!(args.run.max_attempts, 3);
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = Cli::try_parse_from(["booktrans", "export", "book.jsonl", "--include-original"])
            .unwrap();
        assert!(matches!(cli.command, Command::Export(ExportArgs { include_original: true, .. })));
    }
}
