//! File routes: list, upload (multipart) and delete.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use axum::{
    extract::{Multipart, Path as UrlPath, State},
    http::StatusCode,
    response::Response,
};
use doc_ingest::{DocumentFormat, IngestReport};
use tracing::{debug, info, warn};

use crate::{
    core::{
        app_state::AppState,
        http::response_envelope::ApiResponse,
        session_registry::FileStatus,
    },
    error_handler::{AppError, AppResult},
    routes::files::files_response::{DeleteResponse, FileListResponse, UploadResponse},
};

/// Handler: GET /files
pub async fn list_files(State(state): State<Arc<AppState>>) -> ApiResponse<FileListResponse> {
    ApiResponse::success(FileListResponse {
        files: state.sessions.files().await,
    })
}

/// Handler: POST /files
///
/// Expects a multipart form with one `file` field carrying a `.pdf` or
/// `.pptx` upload. The bytes are staged in a temp file owned by the session
/// registry until the file is deleted. Failed ingestion leaves no trace.
///
/// # Example
/// ```bash
/// curl -F 'file=@policies.pdf' http://127.0.0.1:8080/files
/// ```
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Response> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().map(sanitize_file_name).unwrap_or_default();
        let bytes = field.bytes().await?;
        upload = Some((file_name, bytes));
        break;
    }
    let Some((file_name, bytes)) = upload else {
        return Err(AppError::BadRequest("multipart field `file` is required".into()));
    };
    if file_name.is_empty() {
        return Err(AppError::BadRequest("uploaded file has no name".into()));
    }
    DocumentFormat::from_path(Path::new(&file_name))?;
    debug!(file_name = %file_name, bytes = bytes.len(), "upload received");

    let temp = tempfile::Builder::new()
        .prefix("docqa-")
        .tempfile()
        .map_err(AppError::Staging)?
        .into_temp_path();
    tokio::fs::write(&temp, &bytes)
        .await
        .map_err(AppError::Staging)?;
    let staged = temp.to_path_buf();

    if let Err((taken, _rejected)) = state.sessions.begin_ingest(&file_name, temp).await {
        return Err(AppError::Conflict(format!("{} is already uploaded", taken.0)));
    }

    // Ingestion and its bookkeeping run detached so a dropped request cannot
    // leave the entry stuck in `Ingesting` or skip the rollback.
    let task = tokio::spawn(ingest_staged(state.clone(), staged, file_name.clone()));
    let report = match task.await {
        Ok(outcome) => outcome?,
        Err(join) => {
            state.sessions.remove_file(&file_name).await;
            if let Err(e) = state.store.delete_file(&file_name).await {
                warn!(file_name = %file_name, error = %e, "cleanup after failed ingestion task");
            }
            return Err(AppError::Task(join));
        }
    };

    Ok(ApiResponse::success(UploadResponse {
        message: format!("{file_name} is ready for questions"),
        report,
    })
    .into_response_with_status(StatusCode::CREATED))
}

/// Ingests a registered upload and settles its registry entry either way.
async fn ingest_staged(
    state: Arc<AppState>,
    staged: PathBuf,
    file_name: String,
) -> AppResult<IngestReport> {
    match state.ingestor.ingest(&staged, &file_name).await {
        Ok(report) => {
            state.sessions.mark_ready(&file_name, report.chunks).await;
            info!(file_name = %file_name, chunks = report.chunks, "upload ingested");
            Ok(report)
        }
        Err(e) => {
            state.sessions.remove_file(&file_name).await;
            warn!(file_name = %file_name, error = %e, "upload rejected");
            Err(e.into())
        }
    }
}

/// Handler: DELETE /files/{name}
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    UrlPath(file_name): UrlPath<String>,
) -> AppResult<ApiResponse<DeleteResponse>> {
    match state.sessions.status(&file_name).await {
        Some(FileStatus::Ready) => {}
        Some(FileStatus::Ingesting) => {
            return Err(AppError::Conflict(format!("{file_name} is still being ingested")));
        }
        None => return Err(AppError::NotFound(format!("file {file_name}"))),
    }

    let deleted_chunks = state.store.delete_file(&file_name).await?;
    state.sessions.remove_file(&file_name).await;
    info!(file_name = %file_name, deleted_chunks, "file deleted");

    Ok(ApiResponse::success(DeleteResponse {
        file_name,
        deleted_chunks,
    }))
}

/// Keeps only the last path component of a client-supplied name.
fn sanitize_file_name(raw: &str) -> String {
    raw.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
