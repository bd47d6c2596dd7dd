use doc_ingest::IngestReport;
use serde::Serialize;

use crate::core::session_registry::FileSummary;

#[derive(Debug, Serialize)]
pub struct FileListResponse {
    pub files: Vec<FileSummary>,
}

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,
    #[serde(flatten)]
    pub report: IngestReport,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub file_name: String,
    pub deleted_chunks: u64,
}
