//! POST /ask answers a question from the selected files.

use std::sync::Arc;

use axum::{Json, extract::State};
use tracing::info;

use crate::{
    core::{
        app_state::AppState, http::response_envelope::ApiResponse, session_registry::ChatKey,
        session_registry::FileStatus,
    },
    error_handler::{AppError, AppResult},
    routes::ask::ask_request::{AskRequest, AskResponse},
};

/// Handler: POST /ask
///
/// Every selected file must be registered and done ingesting. The question
/// and the final answer are appended to the chat of the selection.
///
/// # Example
/// ```bash
/// curl -X POST http://127.0.0.1:8080/ask \
///   -H 'content-type: application/json' \
///   -d '{"question":"What is the refund policy?","files":["policies.pdf"]}'
/// ```
pub async fn ask_question(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AskRequest>,
) -> AppResult<ApiResponse<AskResponse>> {
    for name in &body.files {
        match state.sessions.status(name).await {
            Some(FileStatus::Ready) => {}
            Some(FileStatus::Ingesting) => {
                return Err(AppError::Conflict(format!("{name} is still being ingested")));
            }
            None => return Err(AppError::NotFound(format!("file {name}"))),
        }
    }

    let report = state.rag.answer_question(&body.question, &body.files).await?;
    info!(
        outcome = ?report.outcome,
        retries = report.retries,
        score = report.relevance_score.value(),
        "question answered"
    );

    let key = ChatKey::new(&body.files);
    state
        .sessions
        .append_exchange(key.clone(), body.question.trim(), &report.answer)
        .await;

    Ok(ApiResponse::success(AskResponse {
        chat: key.file_names().to_vec(),
        report,
    }))
}
