//! Upload → chunks in the store, with rollback on failure.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ai_llm_service::error_handler::{EnvLookup, opt_env};
use rag_store::{ChunkKind, ChunkStore};
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::errors::IngestError;
use crate::loader::{DocumentFormat, load_file};
use crate::splitter::{DEFAULT_CHUNK_OVERLAP, DEFAULT_CHUNK_SIZE, RecursiveSplitter};

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    pub file_name: String,
    /// Pages or slides with text.
    pub sections: usize,
    /// Table pseudo-sections detected in a PDF.
    pub tables: usize,
    /// Chunks written to the store.
    pub chunks: usize,
}

/// Loads, splits and stores one file under its user-visible name.
pub struct Ingestor {
    store: Arc<dyn ChunkStore>,
    splitter: RecursiveSplitter,
}

impl Ingestor {
    pub fn new(store: Arc<dyn ChunkStore>, splitter: RecursiveSplitter) -> Self {
        Self { store, splitter }
    }

    pub fn splitter(&self) -> &RecursiveSplitter {
        &self.splitter
    }

    /// Ingests `path`, tagging every chunk with `original_file_name`.
    ///
    /// The format comes from `original_file_name`, so `path` may be an
    /// extension-less temp file. On any failure every chunk already written
    /// for `original_file_name` is deleted before the error is returned; a
    /// failing rollback is logged and the original error still wins.
    #[instrument(skip_all, fields(file_name = %original_file_name))]
    pub async fn ingest(
        &self,
        path: &Path,
        original_file_name: &str,
    ) -> Result<IngestReport, IngestError> {
        match self.ingest_inner(path, original_file_name).await {
            Ok(report) => {
                info!(
                    sections = report.sections,
                    tables = report.tables,
                    chunks = report.chunks,
                    "file ingested"
                );
                Ok(report)
            }
            Err(e) => {
                warn!(error = %e, "ingestion failed; rolling back");
                if let Err(rollback) = self.store.delete_file(original_file_name).await {
                    error!(error = %rollback, "rollback failed; chunks may remain");
                }
                Err(e)
            }
        }
    }

    async fn ingest_inner(
        &self,
        path: &Path,
        original_file_name: &str,
    ) -> Result<IngestReport, IngestError> {
        let format = DocumentFormat::from_path(Path::new(original_file_name))?;
        let owned: PathBuf = path.to_path_buf();
        let sections = tokio::task::spawn_blocking(move || load_file(&owned, format))
            .await
            .map_err(|e| IngestError::Task(e.to_string()))??;

        let tables = sections
            .iter()
            .filter(|s| s.kind == ChunkKind::Table)
            .count();
        let chunks = self.splitter.split_sections(&sections, original_file_name);
        if chunks.is_empty() {
            return Err(IngestError::NoExtractableText(original_file_name.to_string()));
        }

        let written = self.store.store(chunks).await?;
        Ok(IngestReport {
            file_name: original_file_name.to_string(),
            sections: sections.len() - tables,
            tables,
            chunks: written,
        })
    }
}

/// Splitter settings from `CHUNK_SIZE` / `CHUNK_OVERLAP` (defaults 10000 / 2000).
pub fn splitter_from(env: EnvLookup<'_>) -> Result<RecursiveSplitter, IngestError> {
    let read = |name: &str, default: usize| -> Result<usize, IngestError> {
        match opt_env(env, name) {
            Some(v) => v
                .parse()
                .map_err(|_| IngestError::Config(format!("{name} must be a non-negative integer"))),
            None => Ok(default),
        }
    };
    RecursiveSplitter::new(
        read("CHUNK_SIZE", DEFAULT_CHUNK_SIZE)?,
        read("CHUNK_OVERLAP", DEFAULT_CHUNK_OVERLAP)?,
    )
}
