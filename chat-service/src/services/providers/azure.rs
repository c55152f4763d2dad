//! Stateless HTTP provider ("azure").
//!
//! Every message is a single POST of `{"chat_input": text}` with bearer auth.
//! Deployments behind this endpoint answer in different shapes, so the reply
//! text is located by probing a fixed list of fields in order and, failing
//! that, by stringifying the whole body.

use super::{ChatProvider, ProviderError};
use crate::config::AzureSettings;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, Secret};
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

/// Where a reply may live in the response body.
#[derive(Debug, Clone, Copy)]
enum ReplyField {
    Key(&'static str),
    /// `choices[0].message.content`, OpenAI style.
    FirstChoiceContent,
}

/// Probed in order; the first field present wins.
const REPLY_FIELDS: &[ReplyField] = &[
    ReplyField::Key("chat_output"),
    ReplyField::Key("response"),
    ReplyField::Key("result"),
    ReplyField::FirstChoiceContent,
];

impl ReplyField {
    fn extract(self, body: &Value) -> Option<String> {
        match self {
            ReplyField::Key(key) => body.get(key).filter(|v| !v.is_null()).map(value_text),
            ReplyField::FirstChoiceContent => {
                let first = body.get("choices")?.as_array()?.first()?;
                Some(
                    first
                        .get("message")
                        .and_then(|message| message.get("content"))
                        .filter(|v| !v.is_null())
                        .map(value_text)
                        .unwrap_or_default(),
                )
            }
        }
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Pull the reply text out of a response body. Falls back to the whole body
/// as JSON text when none of the known fields is present.
pub fn extract_reply(body: &Value) -> String {
    REPLY_FIELDS
        .iter()
        .find_map(|field| field.extract(body))
        .unwrap_or_else(|| {
            tracing::warn!(body = %body, "Unexpected response structure");
            body.to_string()
        })
}

#[derive(Debug, Serialize)]
struct ChatInput<'a> {
    chat_input: &'a str,
}

pub struct AzureProvider {
    endpoint: Option<String>,
    api_key: Option<Secret<String>>,
    client: Client,
}

impl AzureProvider {
    pub fn new(settings: AzureSettings, timeout: Duration) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NetworkError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: settings.endpoint,
            api_key: settings.api_key,
            client,
        })
    }
}

#[async_trait]
impl ChatProvider for AzureProvider {
    async fn send(&self, chat_id: &str, text: &str) -> Result<String, ProviderError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("AZURE_ENDPOINT is not set".to_string()))?;

        tracing::debug!(chat_id = %chat_id, prompt_len = text.len(), "Sending request to Azure endpoint");

        let mut request = self.client.post(endpoint).json(&ChatInput { chat_input: text });
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ProviderError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ProviderError::ApiError(format!(
                "Azure endpoint error {}: {}",
                status, error_text
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ProviderError::ApiError(format!("Failed to parse response: {}", e)))?;

        tracing::debug!(body = %body, "Azure response structure");

        Ok(extract_reply(&body))
    }
}
