use askpdf_rag::config::{DEFAULT_MODEL, DEFAULT_TEMPERATURE};
use askpdf_rag::CompletionOptions;
use serde::Deserialize;

/// Body of `POST /chat-with-pdf` and `POST /chat`, also used as the query
/// string of the streaming endpoint. `query` is accepted as an alias of
/// `question`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub session_id: String,
    pub question: Option<String>,
    pub query: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    pub fn question_text(&self) -> String {
        self.question
            .as_deref()
            .filter(|q| !q.is_empty())
            .or(self.query.as_deref())
            .unwrap_or_default()
            .to_string()
    }

    pub fn options(&self) -> CompletionOptions {
        CompletionOptions {
            model: self
                .model
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            temperature: self.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        }
    }
}
