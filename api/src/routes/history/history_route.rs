//! GET /history?files=a.pdf,b.pptx returns the chat history of a file selection.

use std::sync::Arc;

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use crate::{
    core::{
        app_state::AppState,
        http::response_envelope::ApiResponse,
        session_registry::{ChatKey, ChatMessage},
    },
    error_handler::{AppError, AppResult},
};

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Comma-separated file names.
    pub files: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub chat: Vec<String>,
    pub messages: Vec<ChatMessage>,
}

pub async fn chat_history(
    State(state): State<Arc<AppState>>,
    Query(q): Query<HistoryQuery>,
) -> AppResult<ApiResponse<HistoryResponse>> {
    let names: Vec<&str> = q
        .files
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    if names.is_empty() {
        return Err(AppError::BadRequest("`files` must name at least one file".into()));
    }

    let key = ChatKey::new(&names);
    let messages = state.sessions.history(&key).await;
    Ok(ApiResponse::success(HistoryResponse {
        chat: key.file_names().to_vec(),
        messages,
    }))
}
