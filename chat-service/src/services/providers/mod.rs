//! Text-generation provider abstractions and implementations.
//!
//! Two backends sit behind the [`ChatProvider`] trait: Gemini, which keeps a
//! conversational session per chat id, and a stateless HTTP endpoint
//! ("azure") that answers each message on its own.

pub mod azure;
pub mod gemini;

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

pub use azure::AzureProvider;
pub use gemini::GeminiProvider;

/// Error type for provider operations. The display text is what the caller
/// of `/chat` sees.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Provider returned no text")]
    EmptyResponse,
}

/// Which backend a chat message is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Gemini,
    Azure,
}

impl ProviderKind {
    /// Map the `model` field of a chat request. Only `"azure"` selects the
    /// stateless provider; anything else, including no value, is Gemini.
    pub fn from_model(model: Option<&str>) -> Self {
        match model {
            Some("azure") => ProviderKind::Azure,
            Some("gemini") | None => ProviderKind::Gemini,
            Some(other) => {
                tracing::debug!(model = %other, "Unknown model requested, using gemini");
                ProviderKind::Gemini
            }
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Azure => "azure",
        }
    }
}

/// A backend that turns one user message into one reply.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send `text` on behalf of conversation `chat_id` and return the reply text.
    async fn send(&self, chat_id: &str, text: &str) -> Result<String, ProviderError>;
}

/// The configured backends, selected per request.
#[derive(Clone)]
pub struct Providers {
    gemini: Arc<dyn ChatProvider>,
    azure: Arc<dyn ChatProvider>,
}

impl Providers {
    pub fn new(gemini: Arc<dyn ChatProvider>, azure: Arc<dyn ChatProvider>) -> Self {
        Self { gemini, azure }
    }

    pub fn get(&self, kind: ProviderKind) -> &Arc<dyn ChatProvider> {
        match kind {
            ProviderKind::Gemini => &self.gemini,
            ProviderKind::Azure => &self.azure,
        }
    }
}
