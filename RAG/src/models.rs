use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Seconds since the Unix epoch, with sub-second precision.
pub fn now_epoch_seconds() -> f64 {
    Utc::now().timestamp_micros() as f64 / 1_000_000.0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: f64,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: now_epoch_seconds(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: now_epoch_seconds(),
        }
    }
}

/// Snapshot of one uploaded document and its conversation.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: String,
    pub filename: String,
    pub upload_time: f64,
    pub chunks: Arc<[String]>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub filename: String,
    pub upload_time: f64,
    pub message_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationHistory {
    pub messages: Vec<Message>,
    pub filename: String,
}

/// A chunk together with its keyword-overlap score.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredChunk {
    pub content: String,
    pub score: usize,
}

/// Frames pushed to a streaming client, serialized as `{"type": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamEvent {
    Start,
    Context { chunks: Vec<String> },
    Token { token: String },
    End,
    Error { message: String },
}

#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: f32,
}

// OpenAI-compatible chat completions wire types

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatStreamChunk {
    #[serde(default)]
    pub choices: Vec<ChatStreamChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatStreamChoice {
    #[serde(default)]
    pub delta: ChatDelta,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChatDelta {
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_events_use_type_tag() {
        let token = serde_json::to_value(StreamEvent::Token {
            token: "hi".to_string(),
        })
        .unwrap();
        assert_eq!(token, serde_json::json!({"type": "token", "token": "hi"}));

        let start = serde_json::to_value(StreamEvent::Start).unwrap();
        assert_eq!(start, serde_json::json!({"type": "start"}));

        let context = serde_json::to_value(StreamEvent::Context {
            chunks: vec!["abc...".to_string()],
        })
        .unwrap();
        assert_eq!(
            context,
            serde_json::json!({"type": "context", "chunks": ["abc..."]})
        );
    }

    #[test]
    fn roles_serialize_lowercase() {
        let message = Message::user("hello");
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["role"], "user");
        assert_eq!(value["content"], "hello");
        assert!(value["timestamp"].as_f64().unwrap() > 0.0);
    }

    #[test]
    fn stream_request_omits_stream_flag_when_unset() {
        let request = ChatCompletionRequest {
            model: "m".to_string(),
            temperature: 0.5,
            messages: vec![],
            stream: None,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert!(value.get("stream").is_none());
    }
}
