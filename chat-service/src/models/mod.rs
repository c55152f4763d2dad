//! Domain models for the chat service.

pub mod message;

pub use message::{FileAttachment, FileKind, Message, Transcript};
