//! Runtime and collection configuration.

use ai_llm_service::error_handler::{EnvLookup, must_env, opt_env};

use crate::errors::RagError;

/// Distance function used for the vector space.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DistanceKind {
    /// Cosine distance (recommended for most embeddings).
    Cosine,
    /// Dot product (useful for normalized vectors).
    Dot,
    /// Euclidean distance (L2).
    Euclid,
}

/// Configuration for chunk storage and retrieval.
#[derive(Clone, Debug)]
pub struct RagConfig {
    /// Qdrant endpoint, e.g. `http://localhost:6334` (gRPC port).
    pub qdrant_url: String,
    /// Optional API key for Qdrant Cloud.
    pub qdrant_api_key: Option<String>,
    /// Collection holding every chunk of every uploaded file.
    pub collection: String,
    pub distance: DistanceKind,
    /// Upsert batch size (typical range: 128..512).
    pub upsert_batch: usize,
    /// Exact search flag (false = HNSW ANN).
    pub exact_search: bool,
    /// Concurrent embedding requests while storing.
    pub embed_concurrency: usize,
}

impl RagConfig {
    /// Creates a sane default config for a given collection name and Qdrant endpoint.
    pub fn new_default(url: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            qdrant_url: url.into(),
            qdrant_api_key: None,
            collection: collection.into(),
            distance: DistanceKind::Cosine,
            upsert_batch: 256,
            exact_search: false,
            embed_concurrency: 4,
        }
    }

    /// Reads `QDRANT_URL`, `QDRANT_COLLECTION` (required) and
    /// `QDRANT_API_KEY`, `QDRANT_BATCH_SIZE`, `QDRANT_EXACT_SEARCH` (optional).
    pub fn from_lookup(env: EnvLookup<'_>) -> Result<Self, RagError> {
        let url = must_env(env, "QDRANT_URL").map_err(|e| RagError::Config(e.to_string()))?;
        let collection =
            must_env(env, "QDRANT_COLLECTION").map_err(|e| RagError::Config(e.to_string()))?;

        let mut cfg = Self::new_default(url, collection);
        cfg.qdrant_api_key = opt_env(env, "QDRANT_API_KEY");
        if let Some(batch) = opt_env(env, "QDRANT_BATCH_SIZE") {
            cfg.upsert_batch = batch
                .parse()
                .map_err(|_| RagError::Config("QDRANT_BATCH_SIZE must be a positive integer".into()))?;
        }
        if let Some(exact) = opt_env(env, "QDRANT_EXACT_SEARCH") {
            cfg.exact_search = matches!(exact.to_ascii_lowercase().as_str(), "1" | "true" | "yes");
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Validates config values.
    pub fn validate(&self) -> Result<(), RagError> {
        if self.qdrant_url.trim().is_empty() {
            return Err(RagError::Config("qdrant_url is empty".into()));
        }
        if self.collection.trim().is_empty() {
            return Err(RagError::Config("collection is empty".into()));
        }
        if self.upsert_batch == 0 {
            return Err(RagError::Config("upsert_batch must be > 0".into()));
        }
        Ok(())
    }
}
