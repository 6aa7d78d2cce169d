use crate::models::{ConversationHistory, Message};
use crate::session_store::{SessionError, SessionStore};

/// Number of question/answer pairs in a message list.
pub fn message_pair_count(message_len: usize) -> usize {
    message_len / 2
}

pub async fn get_history(
    store: &dyn SessionStore,
    session_id: &str,
) -> Result<ConversationHistory, SessionError> {
    let session = store.get(session_id).await?;
    Ok(ConversationHistory {
        messages: session.messages,
        filename: session.filename,
    })
}

pub async fn record_question(
    store: &dyn SessionStore,
    session_id: &str,
    question: &str,
) -> Result<(), SessionError> {
    store.append_message(session_id, Message::user(question)).await
}

pub async fn record_answer(
    store: &dyn SessionStore,
    session_id: &str,
    answer: &str,
) -> Result<(), SessionError> {
    store.append_message(session_id, Message::assistant(answer)).await
}
