//! In-memory conversation map with write-through persistence.

use crate::models::{Message, Transcript};
use crate::services::transcript::TranscriptFile;
use chrono::Local;
use tokio::sync::Mutex;

/// Owns every transcript for the lifetime of the process.
///
/// All mutations go through one lock and are saved before the lock is
/// released, so concurrent requests cannot interleave partial updates and the
/// file always holds the latest state.
pub struct ConversationStore {
    transcript: Mutex<Transcript>,
    file: TranscriptFile,
}

impl ConversationStore {
    /// Load existing transcripts from `file`.
    pub async fn open(file: TranscriptFile) -> Self {
        let transcript = file.load().await;
        Self {
            transcript: Mutex::new(transcript),
            file,
        }
    }

    /// Start an empty conversation keyed by the current local time
    /// (`YYYYMMDDHHMMSS`). A second conversation created within the same
    /// second gets a `-2`, `-3`, ... suffix instead of replacing the first.
    pub async fn create_conversation(&self) -> String {
        let base = Local::now().format("%Y%m%d%H%M%S").to_string();

        let mut transcript = self.transcript.lock().await;
        let chat_id = unique_id(&transcript, base);
        transcript.insert(chat_id.clone(), Vec::new());
        self.persist(&transcript).await;

        tracing::info!(chat_id = %chat_id, "Created conversation");
        chat_id
    }

    /// Append `messages` to `chat_id` in order, creating the conversation if
    /// needed, then save.
    pub async fn append(&self, chat_id: &str, messages: Vec<Message>) {
        let mut transcript = self.transcript.lock().await;
        let count = messages.len();
        transcript
            .entry(chat_id.to_string())
            .or_default()
            .extend(messages);
        self.persist(&transcript).await;

        tracing::debug!(chat_id = %chat_id, appended = count, "Appended messages");
    }

    pub async fn snapshot(&self) -> Transcript {
        self.transcript.lock().await.clone()
    }

    pub async fn messages(&self, chat_id: &str) -> Option<Vec<Message>> {
        self.transcript.lock().await.get(chat_id).cloned()
    }

    /// Save failures are logged and swallowed; the in-memory state stays
    /// authoritative and the next successful save catches the file up.
    async fn persist(&self, transcript: &Transcript) {
        if let Err(e) = self.file.save(transcript).await {
            tracing::error!(
                path = %self.file.path().display(),
                error = %e,
                "Error saving chats"
            );
        }
    }
}

fn unique_id(transcript: &Transcript, base: String) -> String {
    if !transcript.contains_key(&base) {
        return base;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{}-{}", base, suffix);
        if !transcript.contains_key(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}
