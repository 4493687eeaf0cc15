//! Resume marker: how far a previous run got.
//!
//! The checkpoint is a small JSON object overwritten after every page. It
//! is written to a sibling temp file and renamed into place so a crash
//! mid-write leaves the previous checkpoint intact.

use crate::error::TranslateError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Pages attempted so far, counting from the start of the book.
    pub pages_completed: usize,
    /// Number of the last page that got a record.
    #[serde(default)]
    pub last_page: usize,
    /// RFC 3339 when written by this crate; kept as text so checkpoints
    /// from other tools still load. `None` before the first save.
    #[serde(default)]
    pub timestamp: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the saved checkpoint, or the zero checkpoint if none exists.
    pub async fn load(&self) -> Result<Checkpoint, TranslateError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No checkpoint at {}", self.path.display());
                return Ok(Checkpoint::default());
            }
            Err(source) => {
                return Err(TranslateError::CheckpointIo {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        serde_json::from_str(&raw).map_err(|e| TranslateError::CorruptCheckpoint {
            path: self.path.clone(),
            detail: e.to_string(),
        })
    }

    /// Atomically replace the checkpoint with a new one stamped now.
    pub async fn save(
        &self,
        pages_completed: usize,
        last_page: usize,
    ) -> Result<Checkpoint, TranslateError> {
        let checkpoint = Checkpoint {
            pages_completed,
            last_page,
            timestamp: Some(Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)),
        };
        let json = serde_json::to_string_pretty(&checkpoint)
            .map_err(|e| TranslateError::Internal(format!("serialise checkpoint: {e}")))?;

        let io_err = |source| TranslateError::CheckpointIo {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(io_err)?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, json).await.map_err(io_err)?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(io_err)?;
        Ok(checkpoint)
    }
}
