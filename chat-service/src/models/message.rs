//! Transcript messages as they are stored on disk and served to the UI.

use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Every conversation id mapped to its messages in chronological order.
pub type Transcript = BTreeMap<String, Vec<Message>>;

/// One entry in a conversation. Never modified after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub text: String,

    /// `true` for the person chatting, `false` for provider replies.
    pub is_user: bool,

    /// Local wall-clock time, `HH:MM`.
    pub timestamp: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileAttachment>,
}

impl Message {
    pub fn from_user(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: true,
            timestamp: clock_time(),
            file: None,
        }
    }

    pub fn from_provider(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_user: false,
            timestamp: clock_time(),
            file: None,
        }
    }

    /// The message recorded for an upload: authored by the user, carrying the file.
    pub fn upload(file: FileAttachment) -> Self {
        Self {
            text: format!("Uploaded {}", file.name),
            is_user: true,
            timestamp: clock_time(),
            file: Some(file),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAttachment {
    #[serde(rename = "type")]
    pub kind: FileKind,

    /// Extracted text for PDFs, base64 of the raw bytes for images.
    pub content: String,

    pub name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Pdf,
    Image,
}

impl FileKind {
    /// Classify a filename by its extension. `None` for anything outside
    /// pdf/png/jpg/jpeg.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let (_, extension) = filename.rsplit_once('.')?;
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Some(FileKind::Pdf),
            "png" | "jpg" | "jpeg" => Some(FileKind::Image),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Pdf => "pdf",
            FileKind::Image => "image",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current local time at minute precision.
pub fn clock_time() -> String {
    Local::now().format("%H:%M").to_string()
}
