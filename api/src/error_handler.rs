use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use doc_ingest::IngestError;
use qa_flow::FlowError;
use rag_store::RagError;
use thiserror::Error;
use tracing::error;

use crate::core::http::response_envelope::ApiResponse;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error("invalid configuration: {0}")]
    Config(String),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    #[error("failed to stage upload: {0}")]
    Staging(#[source] std::io::Error),

    #[error("ingestion task failed: {0}")]
    Task(#[source] tokio::task::JoinError),

    // --- Request / routing ---
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    // --- Lower layers ---
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Store(#[from] RagError),

    #[error(transparent)]
    Flow(#[from] FlowError),
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            // 4xx
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Ingest(IngestError::UnsupportedExtension(_)) => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            AppError::Ingest(
                IngestError::Pdf(_) | IngestError::Pptx(_) | IngestError::NoExtractableText(_),
            ) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Flow(FlowError::NoFilesSelected | FlowError::EmptyQuery) => {
                StatusCode::BAD_REQUEST
            }

            // upstream
            AppError::Store(_) | AppError::Ingest(IngestError::Store(_)) => StatusCode::BAD_GATEWAY,

            // 5xx
            AppError::Config(_)
            | AppError::Bind(_)
            | AppError::Server(_)
            | AppError::Staging(_)
            | AppError::Task(_)
            | AppError::Ingest(_)
            | AppError::Flow(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::Staging(_) => "UPLOAD_STAGING_FAILED",
            AppError::Task(_) => "INGESTION_TASK_FAILED",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::Ingest(IngestError::UnsupportedExtension(_)) => "UNSUPPORTED_FILE_TYPE",
            AppError::Ingest(IngestError::NoExtractableText(_)) => "NO_EXTRACTABLE_TEXT",
            AppError::Ingest(IngestError::Pdf(_) | IngestError::Pptx(_)) => "UNREADABLE_DOCUMENT",
            AppError::Ingest(IngestError::Store(_)) | AppError::Store(_) => "DOCUMENT_STORE_ERROR",
            AppError::Ingest(_) => "INGESTION_FAILED",
            AppError::Flow(FlowError::NoFilesSelected) => "NO_FILES_SELECTED",
            AppError::Flow(FlowError::EmptyQuery) => "EMPTY_QUESTION",
            AppError::Flow(_) => "QA_FLOW_ERROR",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() || status == StatusCode::BAD_GATEWAY {
            error!(code = self.error_code(), error = %self, "request failed");
        }
        ApiResponse::<()>::error(self.error_code(), self.to_string(), Vec::new())
            .into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;

impl From<axum::extract::rejection::JsonRejection> for AppError {
    fn from(err: axum::extract::rejection::JsonRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<axum::extract::rejection::QueryRejection> for AppError {
    fn from(err: axum::extract::rejection::QueryRejection) -> Self {
        AppError::BadRequest(err.body_text())
    }
}

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        AppError::BadRequest(err.body_text())
    }
}
