//! GET /health probes model endpoints and document store reachability.

use std::sync::Arc;

use ai_llm_service::HealthStatus;
use axum::extract::State;
use serde::Serialize;

use crate::core::{app_state::AppState, http::response_envelope::ApiResponse};

#[derive(Debug, Serialize)]
pub struct StoreHealth {
    pub ok: bool,
    /// Distinct files currently stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// `ok` when every probe passed, `degraded` otherwise.
    pub status: &'static str,
    pub llm: Vec<HealthStatus>,
    pub store: StoreHealth,
}

pub async fn health(State(state): State<Arc<AppState>>) -> ApiResponse<HealthResponse> {
    let llm = match &state.llm {
        Some(profiles) => profiles.health_all().await,
        None => Vec::new(),
    };
    let store = match state.store.list_file_names().await {
        Ok(names) => StoreHealth {
            ok: true,
            files: Some(names.len()),
            message: None,
        },
        Err(e) => StoreHealth {
            ok: false,
            files: None,
            message: Some(e.to_string()),
        },
    };

    let healthy = store.ok && llm.iter().all(|s| s.ok);
    ApiResponse::success(HealthResponse {
        status: if healthy { "ok" } else { "degraded" },
        llm,
        store,
    })
}
