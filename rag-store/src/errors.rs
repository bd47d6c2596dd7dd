//! Unified error types for the crate.

use thiserror::Error;

/// Top-level error for rag-store operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// Invalid or missing configuration.
    #[error("[RAG Store] config error: {0}")]
    Config(String),

    /// Embedding backend failed or returned an unusable vector.
    #[error("[RAG Store] embedding error: {0}")]
    Embedding(String),

    /// Mismatch in vector dimensionality across chunks.
    #[error("[RAG Store] vector size mismatch: got {got}, want {want}")]
    VectorSizeMismatch { got: usize, want: usize },

    /// Qdrant client errors (wrapped).
    #[error("[RAG Store] qdrant error: {0}")]
    Qdrant(String),

    /// A stored point could not be turned back into a chunk.
    #[error("[RAG Store] malformed payload: {0}")]
    Payload(String),
}

impl From<qdrant_client::QdrantError> for RagError {
    fn from(e: qdrant_client::QdrantError) -> Self {
        RagError::Qdrant(e.to_string())
    }
}
