use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};

use crate::dtos::UploadResponse;
use crate::models::Message;
use crate::services::metrics::record_upload;
use crate::services::UploadError;
use crate::startup::AppState;
use service_core::error::AppError;

/// `POST /upload`: multipart form with a `file` part and a `chatId` field.
///
/// The file is stored, converted to message content, and appended to the
/// conversation as a user message.
#[tracing::instrument(skip(state, multipart))]
pub async fn upload_file(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, AppError> {
    let mut multipart = multipart.map_err(|_| UploadError::MissingFile)?;

    let mut file: Option<(String, Vec<u8>)> = None;
    let mut chat_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Failed to read multipart field: {}", e))
    })? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Failed to read file bytes: {}", e))
                })?;
                file = Some((file_name, data.to_vec()));
            }
            Some("chatId") => {
                let value = field.text().await.map_err(|e| {
                    AppError::BadRequest(anyhow::anyhow!("Failed to read chatId: {}", e))
                })?;
                chat_id = Some(value);
            }
            _ => {}
        }
    }

    let (file_name, data) = file.ok_or(UploadError::MissingFile)?;
    if file_name.is_empty() {
        return Err(UploadError::EmptyFilename.into());
    }
    let chat_id = chat_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Missing chatId")))?;

    let attachment = state.uploads.receive(&file_name, data).await.map_err(|e| {
        tracing::warn!(filename = %file_name, error = %e, "Upload rejected");
        e
    })?;

    let filename = attachment.name.clone();
    let kind = attachment.kind;
    state
        .store
        .append(&chat_id, vec![Message::upload(attachment)])
        .await;

    record_upload(kind.as_str());
    tracing::info!(chat_id = %chat_id, filename = %filename, kind = %kind, "File uploaded");

    Ok(Json(UploadResponse {
        message: "File uploaded successfully".to_string(),
        filename,
        kind: kind.to_string(),
    }))
}
