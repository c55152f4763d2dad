use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::dtos::{ChatRequest, ChatResponse, NewChatResponse};
use crate::models::Transcript;
use crate::services::ProviderKind;
use crate::startup::AppState;
use service_core::error::AppError;

/// `POST /chat`: relay one message and return the provider's reply.
///
/// Provider failures come back as 500 with the provider's own error text.
#[tracing::instrument(skip(state, payload))]
pub async fn send_message(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>, AppError> {
    let Json(request) =
        payload.map_err(|rejection| AppError::BadRequest(anyhow::anyhow!(rejection.body_text())))?;

    let kind = ProviderKind::from_model(request.model.as_deref());

    let exchange = state
        .relay
        .send(&request.chat_id, &request.message, kind)
        .await
        .map_err(|e| AppError::Upstream(e.to_string()))?;

    Ok(Json(ChatResponse {
        response: exchange.reply,
        timestamp: exchange.timestamp,
        chat_id: request.chat_id,
    }))
}

/// `POST /new_chat`
pub async fn new_chat(State(state): State<AppState>) -> Json<NewChatResponse> {
    let chat_id = state.store.create_conversation().await;
    Json(NewChatResponse { chat_id })
}

/// `GET /get_chat_history`: every conversation with all its messages.
pub async fn get_chat_history(State(state): State<AppState>) -> Json<Transcript> {
    Json(state.store.snapshot().await)
}
