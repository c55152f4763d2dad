//! HTTP handlers for the chat service.

pub mod chat;
pub mod health;
pub mod upload;

pub use chat::{get_chat_history, new_chat, send_message};
pub use health::{health_check, metrics};
pub use upload::upload_file;
