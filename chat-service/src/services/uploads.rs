//! Upload intake: validate, store on disk, and turn the file into message content.

use crate::models::{FileAttachment, FileKind};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use service_core::error::AppError;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file part")]
    MissingFile,

    #[error("No selected file")]
    EmptyFilename,

    #[error("File type not allowed")]
    UnsupportedType,

    #[error("Could not read PDF: {0}")]
    Unreadable(String),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

impl From<UploadError> for AppError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Io(e) => AppError::InternalError(anyhow::Error::new(e)),
            other => AppError::BadRequest(anyhow::anyhow!(other.to_string())),
        }
    }
}

/// Reduce a client-supplied filename to a safe single path component.
///
/// Path separators become spaces, whitespace runs collapse to `_`, anything
/// other than ASCII letters, digits, `.`, `_` and `-` is dropped, and leading
/// or trailing `.`/`_` are trimmed. The result may be empty.
pub fn sanitize_filename(name: &str) -> String {
    let spaced: String = name
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();

    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");

    let kept: String = joined
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect();

    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Check an upload's filename and return its sanitized form and kind.
pub fn validate_filename(original_name: &str) -> Result<(String, FileKind), UploadError> {
    if original_name.is_empty() {
        return Err(UploadError::EmptyFilename);
    }

    let kind = FileKind::from_filename(original_name).ok_or(UploadError::UnsupportedType)?;

    let filename = sanitize_filename(original_name);
    // Sanitizing can eat the extension ("中文.pdf" -> "pdf"); such names are refused.
    if FileKind::from_filename(&filename) != Some(kind) {
        return Err(UploadError::UnsupportedType);
    }

    Ok((filename, kind))
}

/// Concatenated text of every page, in page order.
pub fn extract_pdf_text(data: &[u8]) -> Result<String, UploadError> {
    let document =
        lopdf::Document::load_mem(data).map_err(|e| UploadError::Unreadable(e.to_string()))?;

    let mut text = String::new();
    for page_number in document.get_pages().keys() {
        let page_text = document
            .extract_text(&[*page_number])
            .map_err(|e| UploadError::Unreadable(format!("page {}: {}", page_number, e)))?;
        text.push_str(&page_text);
    }

    Ok(text)
}

/// Writes uploads into one directory and extracts their message content.
#[derive(Debug, Clone)]
pub struct UploadService {
    upload_dir: PathBuf,
}

impl UploadService {
    /// Create the service, creating `upload_dir` if it does not exist.
    pub async fn new(upload_dir: impl Into<PathBuf>) -> Result<Self, UploadError> {
        let upload_dir = upload_dir.into();
        fs::create_dir_all(&upload_dir).await?;
        Ok(Self { upload_dir })
    }

    pub fn upload_dir(&self) -> &Path {
        &self.upload_dir
    }

    /// Validate and store one uploaded file, returning the attachment to record.
    ///
    /// A file with the same sanitized name replaces the earlier one on disk.
    pub async fn receive(
        &self,
        original_name: &str,
        data: Vec<u8>,
    ) -> Result<FileAttachment, UploadError> {
        let (filename, kind) = validate_filename(original_name)?;

        let path = self.upload_dir.join(&filename);
        fs::write(&path, &data).await?;

        tracing::info!(
            filename = %filename,
            kind = %kind,
            size = data.len(),
            "Stored upload"
        );

        let content = match kind {
            FileKind::Pdf => tokio::task::spawn_blocking(move || extract_pdf_text(&data))
                .await
                .map_err(|e| UploadError::Unreadable(format!("extraction task failed: {}", e)))??,
            FileKind::Image => STANDARD.encode(&data),
        };

        Ok(FileAttachment {
            kind,
            content,
            name: filename,
        })
    }
}
