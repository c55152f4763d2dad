//! Gemini provider implementation.
//!
//! Gemini chat is stateful from the caller's point of view: each chat id gets
//! a session whose history is replayed with every new message. Sessions live
//! only in memory and start empty again after a restart, even though the
//! transcript itself is reloaded from disk.

use super::{ChatProvider, ProviderError};
use crate::config::GeminiSettings;
use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Conversation state for one chat id.
#[derive(Debug, Default)]
pub struct ChatSession {
    history: Vec<Content>,
}

impl ChatSession {
    /// Number of turns (user and model) exchanged so far.
    pub fn turns(&self) -> usize {
        self.history.len()
    }
}

/// Gemini chat provider.
pub struct GeminiProvider {
    api_key: Option<Secret<String>>,
    model: String,
    api_base: String,
    client: Client,
    sessions: DashMap<String, Arc<Mutex<ChatSession>>>,
}

impl GeminiProvider {
    pub fn new(settings: GeminiSettings, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            api_key: settings.api_key,
            model: settings.model,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            client,
            sessions: DashMap::new(),
        })
    }

    /// Build the API URL for the given method.
    fn api_url(&self, method: &str, api_key: &str) -> String {
        format!(
            "{}/models/{}:{}?key={}",
            self.api_base, self.model, method, api_key
        )
    }

    /// Fetch the session for `chat_id`, creating it on first use.
    fn session(&self, chat_id: &str) -> Arc<Mutex<ChatSession>> {
        self.sessions
            .entry(chat_id.to_string())
            .or_insert_with(|| {
                tracing::debug!(chat_id = %chat_id, "Starting Gemini chat session");
                Arc::new(Mutex::new(ChatSession::default()))
            })
            .clone()
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

#[async_trait]
impl ChatProvider for GeminiProvider {
    async fn send(&self, chat_id: &str, text: &str) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProviderError::NotConfigured("GEMINI_API_KEY is not set".to_string()))?;

        let session = self.session(chat_id);
        // Held for the whole round trip so turns within one chat stay ordered.
        let mut session = session.lock().await;

        let user_turn = Content::text("user", text);
        let mut contents = session.history.clone();
        contents.push(user_turn.clone());

        let request = GenerateContentRequest { contents };

        tracing::debug!(
            model = %self.model,
            chat_id = %chat_id,
            history_len = session.history.len(),
            prompt_len = text.len(),
            "Sending request to Gemini API"
        );

        let response = self
            .client
            .post(self.api_url("generateContent", api_key.expose_secret()))
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.without_url().to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "Gemini API error {}: {}",
                status, error_text
            )));
        }

        let api_response: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e.without_url())))?;

        let reply = api_response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.joined_text())
            .filter(|text| !text.is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        session.history.push(user_turn);
        session.history.push(Content::text("model", &reply));

        Ok(reply)
    }
}

// ============================================================================
// Gemini API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

impl Content {
    fn text(role: &str, text: &str) -> Self {
        Self {
            role: Some(role.to_string()),
            parts: vec![Part {
                text: Some(text.to_string()),
            }],
        }
    }

    fn joined_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| part.text.as_deref())
            .collect()
    }
}

/// Only text parts are produced or read; other part kinds deserialize with
/// `text: None` and are skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}
