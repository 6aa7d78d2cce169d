pub mod chat_service;
pub mod config;
pub mod context_selector;
pub mod document_processor;
pub mod history;
pub mod keyword_scorer;
pub mod llm_service;
pub mod models;
pub mod session_store;

pub use chat_service::{ChatError, ChatService};
pub use config::{AppConfig, ChatSettings, LlmConfig, PartialReplyPolicy};
pub use document_processor::{DocumentProcessor, PdfTextExtractor, TextExtractor};
pub use llm_service::{LlmError, LlmService};
pub use models::*;
pub use session_store::{InMemorySessionStore, SessionError, SessionStore};
