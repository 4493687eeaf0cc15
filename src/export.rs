//! Render a result log as a single Markdown document.
//!
//! Only `success` records with a non-empty translation are exported; every
//! other line counts as skipped. Pages appear in log order, each under a
//! `## Page N` heading, joined by the configured [`PageSeparator`].
//!
//! The output is Markdown, not a Word document. Convert it with a tool such
//! as pandoc when a `.docx` file is needed.

use crate::config::PageSeparator;
use crate::error::TranslateError;
use crate::output::{PageRecord, PageStatus};
use crate::result_log::ResultLog;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    /// Quote the source text above each translation.
    pub include_original: bool,
    pub separator: PageSeparator,
    /// Emit a YAML front-matter block with the title and page counts.
    pub front_matter: bool,
    pub title: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportStats {
    pub exported: usize,
    pub skipped: usize,
}

/// Default output path: the log path with an `.md` extension.
pub fn default_output_path(log_path: &Path) -> PathBuf {
    log_path.with_extension("md")
}

/// Build the Markdown text from records.
pub fn render_markdown(records: &[PageRecord], options: &ExportOptions) -> (String, ExportStats) {
    let exported: Vec<(&PageRecord, &str)> = records
        .iter()
        .filter(|r| r.status == PageStatus::Success)
        .filter_map(|r| {
            r.translated_text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .map(|t| (r, t))
        })
        .collect();
    let stats = ExportStats {
        exported: exported.len(),
        skipped: records.len() - exported.len(),
    };

    let mut out = String::new();
    if options.front_matter {
        out.push_str(&front_matter(options.title.as_deref(), &stats));
    }

    for (i, (record, translation)) in exported.iter().enumerate() {
        if i > 0 {
            out.push_str(&options.separator.render(record.page_number));
        }
        out.push_str(&format!("## Page {}\n\n", record.page_number));

        if options.include_original {
            if let Some(original) = record.original_text.as_deref().filter(|o| !o.trim().is_empty()) {
                out.push_str("**Original:**\n\n");
                for line in original.trim_end().lines() {
                    out.push_str("> ");
                    out.push_str(line);
                    out.push('\n');
                }
                out.push('\n');
            }
        }

        out.push_str(translation.trim_end());
    }

    if !out.is_empty() {
        out.push('\n');
    }
    (out, stats)
}

fn front_matter(title: Option<&str>, stats: &ExportStats) -> String {
    let mut yaml = String::from("---\n");
    if let Some(t) = title {
        // A JSON string is a valid YAML double-quoted scalar.
        let quoted = serde_json::to_string(t).unwrap_or_else(|_| String::from("\"\""));
        yaml.push_str(&format!("title: {quoted}\n"));
    }
    yaml.push_str(&format!("pages_exported: {}\n", stats.exported));
    yaml.push_str(&format!("pages_skipped: {}\n", stats.skipped));
    yaml.push_str("---\n\n");
    yaml
}

/// Read `log_path` and write the Markdown document to `output_path`.
///
/// Uses atomic write (temp file + rename) so a partial document never
/// replaces an existing one.
pub async fn export_markdown(
    log_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
    options: &ExportOptions,
) -> Result<ExportStats, TranslateError> {
    let log_path = log_path.as_ref();
    let path = output_path.as_ref();

    if !log_path.exists() {
        return Err(TranslateError::FileNotFound {
            path: log_path.to_path_buf(),
        });
    }
    let records = ResultLog::new(log_path).read_records().await?;
    let (markdown, stats) = render_markdown(&records, options);

    let write_err = |source| TranslateError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, &markdown)
        .await
        .map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!(
        "Exported {} pages ({} skipped) to {}",
        stats.exported,
        stats.skipped,
        path.display()
    );
    Ok(stats)
}
