pub mod chat;
pub mod conversations;
pub mod metrics;
pub mod providers;
pub mod transcript;
pub mod uploads;

pub use chat::{ChatRelay, Exchange};
pub use conversations::ConversationStore;
pub use metrics::{get_metrics, init_metrics};
pub use providers::{AzureProvider, ChatProvider, GeminiProvider, ProviderError, ProviderKind, Providers};
pub use transcript::{StorageError, TranscriptFile};
pub use uploads::{UploadError, UploadService};
