use crate::handlers;
use askpdf_rag::{
    AppConfig, ChatService, DocumentProcessor, InMemorySessionStore, LlmService, PdfTextExtractor,
    SessionStore,
};
use axum::{
    extract::DefaultBodyLimit,
    http::HeaderValue,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;
const DEFAULT_ORIGINS: [&str; 2] = ["http://localhost:3000", "https://askaipdf.netlify.app"];

#[derive(Clone)]
pub struct AppState {
    pub chat: ChatService,
    pub processor: DocumentProcessor,
}

impl AppState {
    pub fn new(chat: ChatService, processor: DocumentProcessor) -> Self {
        Self { chat, processor }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        let store: Arc<dyn SessionStore> = Arc::new(InMemorySessionStore::new(config.max_sessions));
        let llm = LlmService::new(config.llm.clone());
        let chat = ChatService::new(store, llm, config.chat.clone());
        let processor = DocumentProcessor::new(Arc::new(PdfTextExtractor));
        Self::new(chat, processor)
    }
}

fn cors_layer(frontend_url: &str) -> CorsLayer {
    let origins: Vec<HeaderValue> = DEFAULT_ORIGINS
        .iter()
        .copied()
        .chain(std::iter::once(frontend_url))
        .filter(|origin| !origin.is_empty())
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                log::warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

pub fn create_app(state: AppState, frontend_url: &str) -> Router {
    Router::new()
        .route("/upload", post(handlers::upload))
        .route("/chat-with-pdf", post(handlers::chat_with_pdf))
        .route("/chat", post(handlers::chat_with_pdf))
        .route("/chat-with-pdf/stream", get(handlers::chat_with_pdf_stream))
        .route("/history/:session_id", get(handlers::history))
        .route("/sessions", get(handlers::sessions))
        .route("/health", get(handlers::health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(cors_layer(frontend_url))
        .with_state(state)
}
