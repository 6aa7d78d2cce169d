use crate::app::AppState;
use crate::chat_request::ChatRequest;
use crate::chat_response::*;
use askpdf_rag::history::get_history;
use askpdf_rag::{ChatError, ConversationHistory};
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{sse::Event, IntoResponse, Response, Sse},
    Json,
};
use futures_util::StreamExt;
use std::convert::Infallible;
use tokio_stream::wrappers::ReceiverStream;

pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(ApiError::upload_failed)? {
        if field.name() == Some("file") {
            let filename = field.file_name().unwrap_or("document.pdf").to_string();
            let bytes = field.bytes().await.map_err(ApiError::upload_failed)?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) = upload.ok_or_else(|| ApiError::bad_request("no 'file' field in form"))?;
    log::info!("Processing upload: {} ({} bytes)", filename, bytes.len());

    let chunks = state.processor.process_upload(bytes).await.map_err(|e| {
        log::error!("Upload error for {}: {:#}", filename, e);
        ApiError::upload_failed(format!("{:#}", e))
    })?;

    let session_id = state.chat.store().create(chunks, filename.clone()).await;
    Ok(Json(UploadResponse {
        session_id,
        filename,
    }))
}

pub async fn chat_with_pdf(
    State(state): State<AppState>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ReplyResponse>, ApiError> {
    let question = request.question_text();
    match state
        .chat
        .ask(&request.session_id, &question, &request.options())
        .await
    {
        Ok(reply) => Ok(Json(ReplyResponse { reply })),
        Err(ChatError::SessionNotFound) => Ok(Json(ReplyResponse::session_not_found())),
        Err(e) => Err(e.into()),
    }
}

pub async fn chat_with_pdf_stream(
    State(state): State<AppState>,
    Query(request): Query<ChatRequest>,
) -> Response {
    let question = request.question_text();
    match state
        .chat
        .ask_stream(&request.session_id, &question, &request.options())
        .await
    {
        Ok(receiver) => {
            let stream = ReceiverStream::new(receiver).map(|event| {
                Ok::<_, Infallible>(
                    Event::default().data(serde_json::to_string(&event).unwrap_or_default()),
                )
            });
            Sse::new(stream).into_response()
        }
        Err(ChatError::SessionNotFound) => Json(ReplyResponse::session_not_found()).into_response(),
        Err(e) => ApiError::from(e).into_response(),
    }
}

pub async fn history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<ConversationHistory>, ApiError> {
    get_history(state.chat.store().as_ref(), &session_id)
        .await
        .map(Json)
        .map_err(|_| ApiError::session_not_found())
}

pub async fn sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        sessions: state.chat.store().list().await,
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        sessions: state.chat.store().len().await,
    })
}
