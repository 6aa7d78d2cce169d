use crate::config::{ChatSettings, PartialReplyPolicy};
use crate::context_selector::{build_context, build_prompt, context_previews, select_top_chunks};
use crate::history::{record_answer, record_question};
use crate::llm_service::{LlmError, LlmService};
use crate::models::*;
use crate::session_store::{SessionError, SessionStore};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, OwnedMutexGuard};

#[derive(Debug, Error)]
pub enum ChatError {
    #[error("Session not found.")]
    SessionNotFound,
    #[error("a question (or query) is required")]
    MissingQuestion,
    #[error(transparent)]
    Llm(#[from] LlmError),
}

impl From<SessionError> for ChatError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(_) => ChatError::SessionNotFound,
        }
    }
}

/// Answers questions about uploaded documents, one-shot or streamed.
#[derive(Clone)]
pub struct ChatService {
    store: Arc<dyn SessionStore>,
    llm: LlmService,
    settings: ChatSettings,
}

/// Everything a question needs once the session turn has been claimed.
struct PreparedTurn {
    guard: OwnedMutexGuard<()>,
    selected: Vec<ScoredChunk>,
    prompt: String,
}

enum StreamOutcome {
    Completed,
    Failed(LlmError),
    Disconnected,
}

impl ChatService {
    pub fn new(store: Arc<dyn SessionStore>, llm: LlmService, settings: ChatSettings) -> Self {
        Self {
            store,
            llm,
            settings,
        }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    /// Claims the session turn, selects context and records the question.
    async fn prepare(&self, session_id: &str, question: &str) -> Result<PreparedTurn, ChatError> {
        let chunks = self.store.chunks(session_id).await?;
        if question.trim().is_empty() {
            return Err(ChatError::MissingQuestion);
        }

        let guard = self.store.begin_turn(session_id).await?;

        let selected = select_top_chunks(question, &chunks, self.settings.top_k);
        let prompt = build_prompt(&build_context(&selected), question);

        record_question(self.store.as_ref(), session_id, question).await?;

        Ok(PreparedTurn {
            guard,
            selected,
            prompt,
        })
    }

    pub async fn ask(
        &self,
        session_id: &str,
        question: &str,
        options: &CompletionOptions,
    ) -> Result<String, ChatError> {
        let turn = self.prepare(session_id, question).await?;

        let reply = match self.llm.complete(options, &turn.prompt).await {
            Ok(reply) => reply,
            Err(e) => {
                log::error!("Completion failed for session {}: {}", session_id, e);
                return Err(e.into());
            }
        };

        record_answer(self.store.as_ref(), session_id, &reply).await?;
        drop(turn.guard);
        Ok(reply)
    }

    /// Starts a streamed answer. Events are pushed to the returned receiver
    /// as they happen; dropping the receiver cancels the upstream request.
    pub async fn ask_stream(
        &self,
        session_id: &str,
        question: &str,
        options: &CompletionOptions,
    ) -> Result<mpsc::Receiver<StreamEvent>, ChatError> {
        let turn = self.prepare(session_id, question).await?;
        let previews = context_previews(&turn.selected, self.settings.preview_chars);

        let (tx, rx) = mpsc::channel(self.settings.stream_buffer.max(1));
        let service = self.clone();
        let session_id = session_id.to_string();
        let options = options.clone();

        tokio::spawn(async move {
            service
                .relay_stream(session_id, turn, previews, options, tx)
                .await;
        });

        Ok(rx)
    }

    async fn relay_stream(
        self,
        session_id: String,
        turn: PreparedTurn,
        previews: Vec<String>,
        options: CompletionOptions,
        tx: mpsc::Sender<StreamEvent>,
    ) {
        let mut relayed = String::new();
        let outcome = self
            .forward_tokens(&turn.prompt, previews, &options, &tx, &mut relayed)
            .await;

        match outcome {
            StreamOutcome::Completed => {
                self.commit_reply(&session_id, &relayed).await;
                log::info!("Stream completed for session {}", session_id);
                let _ = tx.send(StreamEvent::End).await;
            }
            StreamOutcome::Failed(err) => {
                log::error!("Stream failed for session {}: {}", session_id, err);
                if !relayed.is_empty() {
                    self.commit_reply(&session_id, &relayed).await;
                }
                let _ = tx
                    .send(StreamEvent::Error {
                        message: err.to_string(),
                    })
                    .await;
            }
            StreamOutcome::Disconnected => {
                log::warn!(
                    "Client disconnected from stream for session {} after {} characters",
                    session_id,
                    relayed.chars().count()
                );
                if self.settings.partial_policy == PartialReplyPolicy::Commit && !relayed.is_empty() {
                    self.commit_reply(&session_id, &relayed).await;
                }
            }
        }

        drop(turn.guard);
    }

    /// Relays upstream deltas to `tx`. A token counts as relayed once the
    /// channel accepts it, so up to `stream_buffer` frames may still be
    /// queued, unread, when the client disconnects.
    async fn forward_tokens(
        &self,
        prompt: &str,
        previews: Vec<String>,
        options: &CompletionOptions,
        tx: &mpsc::Sender<StreamEvent>,
        relayed: &mut String,
    ) -> StreamOutcome {
        if tx.send(StreamEvent::Start).await.is_err() {
            return StreamOutcome::Disconnected;
        }
        if tx.send(StreamEvent::Context { chunks: previews }).await.is_err() {
            return StreamOutcome::Disconnected;
        }

        let mut deltas = tokio::select! {
            _ = tx.closed() => return StreamOutcome::Disconnected,
            opened = self.llm.stream(options, prompt) => match opened {
                Ok(deltas) => deltas,
                Err(e) => return StreamOutcome::Failed(e),
            },
        };

        loop {
            let next = tokio::select! {
                _ = tx.closed() => return StreamOutcome::Disconnected,
                next = deltas.next_delta() => next,
            };

            match next {
                None => return StreamOutcome::Completed,
                Some(Err(e)) => return StreamOutcome::Failed(e),
                Some(Ok(token)) => {
                    if tx.send(StreamEvent::Token { token: token.clone() }).await.is_err() {
                        return StreamOutcome::Disconnected;
                    }
                    relayed.push_str(&token);
                }
            }
        }
    }

    async fn commit_reply(&self, session_id: &str, reply: &str) {
        if let Err(e) = record_answer(self.store.as_ref(), session_id, reply).await {
            log::warn!("Could not record reply for session {}: {}", session_id, e);
        }
    }
}
