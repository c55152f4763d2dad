//! Relays a user message to a provider and records the exchange.

use crate::models::Message;
use crate::services::conversations::ConversationStore;
use crate::services::metrics::record_chat_message;
use crate::services::providers::{ProviderError, ProviderKind, Providers};
use std::sync::Arc;

/// A completed exchange: the reply and the time it was recorded.
#[derive(Debug, Clone)]
pub struct Exchange {
    pub reply: String,
    pub timestamp: String,
}

#[derive(Clone)]
pub struct ChatRelay {
    providers: Providers,
    store: Arc<ConversationStore>,
}

impl ChatRelay {
    pub fn new(providers: Providers, store: Arc<ConversationStore>) -> Self {
        Self { providers, store }
    }

    /// Send `text` to the provider selected by `kind`.
    ///
    /// On success the user message and the reply are appended to `chat_id`
    /// together and saved. On failure the transcript is left untouched.
    #[tracing::instrument(skip(self, text), fields(provider = kind.as_str()))]
    pub async fn send(
        &self,
        chat_id: &str,
        text: &str,
        kind: ProviderKind,
    ) -> Result<Exchange, ProviderError> {
        let user_message = Message::from_user(text);

        let reply = match self.providers.get(kind).send(chat_id, text).await {
            Ok(reply) => reply,
            Err(e) => {
                record_chat_message(kind.as_str(), "error");
                tracing::error!(chat_id = %chat_id, error = %e, "Error in chat");
                return Err(e);
            }
        };

        let reply_message = Message::from_provider(reply.clone());
        let timestamp = reply_message.timestamp.clone();
        self.store
            .append(chat_id, vec![user_message, reply_message])
            .await;

        record_chat_message(kind.as_str(), "ok");
        tracing::info!(chat_id = %chat_id, reply_len = reply.len(), "Chat exchange recorded");

        Ok(Exchange { reply, timestamp })
    }
}
