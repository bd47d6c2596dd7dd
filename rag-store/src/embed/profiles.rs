//! Embedding provider backed by the shared LLM service profiles.

use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;

use crate::embed::{EmbedFuture, EmbeddingsProvider};
use crate::errors::RagError;

/// Embeds through [`LlmServiceProfiles::embed`] (the embedding profile).
#[derive(Clone)]
pub struct ProfilesEmbedder {
    svc: Arc<LlmServiceProfiles>,
    /// Expected vector size; `None` accepts whatever the model returns.
    dim: Option<usize>,
}

impl ProfilesEmbedder {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc, dim: None }
    }

    pub fn with_dim(mut self, dim: usize) -> Self {
        self.dim = Some(dim);
        self
    }
}

impl EmbeddingsProvider for ProfilesEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a> {
        Box::pin(async move {
            let v = self
                .svc
                .embed(text)
                .await
                .map_err(|e| RagError::Embedding(e.to_string()))?;

            match self.dim {
                Some(want) if v.len() != want => {
                    Err(RagError::VectorSizeMismatch { got: v.len(), want })
                }
                _ => Ok(v),
            }
        })
    }
}
