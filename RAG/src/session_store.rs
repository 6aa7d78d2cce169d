use crate::history::message_pair_count;
use crate::models::*;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("session {0} not found")]
    NotFound(String),
}

/// Storage for uploaded documents and their conversations.
///
/// `begin_turn` hands out the per-session lock that serializes
/// question/answer cycles; it must be held from the user message append
/// until the assistant message append.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, chunks: Vec<String>, filename: String) -> String;
    async fn get(&self, session_id: &str) -> Result<Session, SessionError>;
    async fn chunks(&self, session_id: &str) -> Result<Arc<[String]>, SessionError>;
    async fn append_message(&self, session_id: &str, message: Message) -> Result<(), SessionError>;
    async fn list(&self) -> Vec<SessionSummary>;
    async fn begin_turn(&self, session_id: &str) -> Result<OwnedMutexGuard<()>, SessionError>;
    async fn len(&self) -> usize;
}

struct SessionSlot {
    id: String,
    filename: String,
    upload_time: f64,
    chunks: Arc<[String]>,
    messages: Mutex<Vec<Message>>,
    turn: Arc<Mutex<()>>,
}

/// In-memory store. With a capacity set, creating a session past the limit
/// evicts the oldest upload.
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Arc<SessionSlot>>>,
    max_sessions: Option<usize>,
}

impl InMemorySessionStore {
    pub fn new(max_sessions: Option<usize>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    async fn slot(&self, session_id: &str) -> Result<Arc<SessionSlot>, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn create(&self, chunks: Vec<String>, filename: String) -> String {
        let id = Uuid::new_v4().to_string();
        let slot = Arc::new(SessionSlot {
            id: id.clone(),
            filename,
            upload_time: now_epoch_seconds(),
            chunks: chunks.into(),
            messages: Mutex::new(Vec::new()),
            turn: Arc::new(Mutex::new(())),
        });

        let mut sessions = self.sessions.write().await;
        if let Some(max) = self.max_sessions.filter(|max| *max > 0) {
            while sessions.len() >= max {
                let oldest = sessions
                    .values()
                    .min_by(|a, b| a.upload_time.total_cmp(&b.upload_time))
                    .map(|slot| slot.id.clone());
                match oldest {
                    Some(oldest) => {
                        sessions.remove(&oldest);
                        log::info!("Evicted session {} (capacity {})", oldest, max);
                    }
                    None => break,
                }
            }
        }
        sessions.insert(id.clone(), slot);

        log::info!("Session created: {}", id);
        id
    }

    async fn get(&self, session_id: &str) -> Result<Session, SessionError> {
        let slot = self.slot(session_id).await?;
        let messages = slot.messages.lock().await.clone();
        Ok(Session {
            id: slot.id.clone(),
            filename: slot.filename.clone(),
            upload_time: slot.upload_time,
            chunks: slot.chunks.clone(),
            messages,
        })
    }

    async fn chunks(&self, session_id: &str) -> Result<Arc<[String]>, SessionError> {
        Ok(self.slot(session_id).await?.chunks.clone())
    }

    async fn append_message(&self, session_id: &str, message: Message) -> Result<(), SessionError> {
        let slot = self.slot(session_id).await?;
        slot.messages.lock().await.push(message);
        Ok(())
    }

    async fn list(&self) -> Vec<SessionSummary> {
        let slots: Vec<Arc<SessionSlot>> = self.sessions.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(slots.len());
        for slot in slots {
            let message_count = message_pair_count(slot.messages.lock().await.len());
            summaries.push(SessionSummary {
                session_id: slot.id.clone(),
                filename: slot.filename.clone(),
                upload_time: slot.upload_time,
                message_count,
            });
        }
        summaries.sort_by(|a, b| b.upload_time.total_cmp(&a.upload_time));
        summaries
    }

    async fn begin_turn(&self, session_id: &str) -> Result<OwnedMutexGuard<()>, SessionError> {
        let slot = self.slot(session_id).await?;
        Ok(slot.turn.clone().lock_owned().await)
    }

    async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}
