//! Flat-file persistence for conversation transcripts.
//!
//! The whole transcript lives in one JSON document of the form
//! `{"chat_messages": {"<chat id>": [message, ...]}}`.

use crate::models::Transcript;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read transcript file: {0}")]
    Read(#[source] std::io::Error),

    #[error("Transcript file is not valid JSON: {0}")]
    Corrupt(#[source] serde_json::Error),

    #[error("Failed to serialize transcript: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Failed to write transcript file: {0}")]
    Write(#[source] std::io::Error),
}

#[derive(Serialize)]
struct StoredDocumentRef<'a> {
    chat_messages: &'a Transcript,
}

#[derive(Deserialize)]
struct StoredDocument {
    #[serde(default)]
    chat_messages: Transcript,
}

/// Handle on the transcript JSON file.
#[derive(Debug, Clone)]
pub struct TranscriptFile {
    path: PathBuf,
}

impl TranscriptFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where a corrupt transcript is moved to.
    pub fn backup_path(&self) -> PathBuf {
        let mut backup = self.path.clone().into_os_string();
        backup.push(".backup");
        PathBuf::from(backup)
    }

    /// Read the transcript. Never fails: a missing or empty file is an empty
    /// transcript, and a corrupt one is moved aside to `<path>.backup` first.
    pub async fn load(&self) -> Transcript {
        match self.try_load().await {
            Ok(transcript) => {
                tracing::info!(
                    path = %self.path.display(),
                    conversations = transcript.len(),
                    "Loaded chat transcript"
                );
                transcript
            }
            Err(StorageError::Corrupt(e)) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Error reading chat storage");
                self.quarantine().await;
                Transcript::new()
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Unexpected error loading chats");
                Transcript::new()
            }
        }
    }

    async fn try_load(&self) -> Result<Transcript, StorageError> {
        let raw = match fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Transcript::new()),
            Err(e) => return Err(StorageError::Read(e)),
        };

        if raw.is_empty() {
            return Ok(Transcript::new());
        }

        let document: StoredDocument =
            serde_json::from_slice(&raw).map_err(StorageError::Corrupt)?;
        Ok(document.chat_messages)
    }

    async fn quarantine(&self) {
        let backup = self.backup_path();
        match fs::rename(&self.path, &backup).await {
            Ok(()) => tracing::warn!(
                backup = %backup.display(),
                "Corrupted transcript backed up"
            ),
            Err(e) => tracing::error!(
                backup = %backup.display(),
                error = %e,
                "Failed to back up corrupted transcript"
            ),
        }
    }

    /// Overwrite the file with `transcript`.
    ///
    /// The document is written to a sibling temp file and renamed into place,
    /// so a crash mid-write leaves the previous snapshot intact.
    pub async fn save(&self, transcript: &Transcript) -> Result<(), StorageError> {
        let body = serde_json::to_vec_pretty(&StoredDocumentRef {
            chat_messages: transcript,
        })
        .map_err(StorageError::Serialize)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await.map_err(StorageError::Write)?;
            }
        }

        let mut tmp_path = self.path.clone().into_os_string();
        tmp_path.push(".tmp");
        let tmp_path = PathBuf::from(tmp_path);

        fs::write(&tmp_path, body).await.map_err(StorageError::Write)?;
        fs::rename(&tmp_path, &self.path)
            .await
            .map_err(StorageError::Write)?;

        tracing::debug!(
            path = %self.path.display(),
            conversations = transcript.len(),
            "Saved chat transcript"
        );

        Ok(())
    }
}
