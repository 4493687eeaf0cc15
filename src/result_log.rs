//! Append-only JSONL result log.
//!
//! Each page record is serialised to one line and appended with a single
//! `write_all`. The file is opened and closed per record, so a crash loses
//! at most the page in flight and every line already on disk is complete.
//! Readers skip lines they cannot parse rather than failing the whole file.

use crate::error::TranslateError;
use crate::output::PageRecord;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct ResultLog {
    path: PathBuf,
}

impl ResultLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record as a single line, creating the file if needed.
    pub async fn append(&self, record: &PageRecord) -> Result<(), TranslateError> {
        let mut line = serde_json::to_string(record)
            .map_err(|e| TranslateError::Internal(format!("serialise page record: {e}")))?;
        line.push('\n');

        let write_err = |source| TranslateError::LogWriteFailed {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
        }

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(write_err)?;
        file.write_all(line.as_bytes()).await.map_err(write_err)?;
        file.flush().await.map_err(write_err)?;
        Ok(())
    }

    /// Read every parseable record in file order.
    ///
    /// A missing file reads as empty. Blank lines are ignored and malformed
    /// lines are logged and skipped.
    pub async fn read_records(&self) -> Result<Vec<PageRecord>, TranslateError> {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(TranslateError::LogReadFailed {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(parse_records(&content))
    }
}

fn parse_records(content: &str) -> Vec<PageRecord> {
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .filter_map(|(idx, line)| match serde_json::from_str::<PageRecord>(line) {
            Ok(rec) => Some(rec),
            Err(e) => {
                warn!("Skipping malformed log line {}: {}", idx + 1, e);
                None
            }
        })
        .collect()
}
