use std::path::PathBuf;

use rag_store::RagError;
use thiserror::Error;

/// Errors produced while turning an uploaded file into stored chunks.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("[Doc Ingest] unsupported file extension: {0:?} (expected .pdf or .pptx)")]
    UnsupportedExtension(Option<String>),

    #[error("[Doc Ingest] failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[Doc Ingest] failed to parse PDF: {0}")]
    Pdf(String),

    #[error("[Doc Ingest] failed to parse PPTX: {0}")]
    Pptx(String),

    #[error("[Doc Ingest] no extractable text in {0}")]
    NoExtractableText(String),

    #[error("[Doc Ingest] invalid splitter settings: {0}")]
    Config(String),

    #[error("[Doc Ingest] loader task failed: {0}")]
    Task(String),

    #[error(transparent)]
    Store(#[from] RagError),
}
