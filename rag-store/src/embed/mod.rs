//! Embedding seam.

use crate::errors::RagError;
use std::{future::Future, pin::Pin};

pub mod profiles;

/// Boxed future returned by [`EmbeddingsProvider::embed`].
pub type EmbedFuture<'a> = Pin<Box<dyn Future<Output = Result<Vec<f32>, RagError>> + Send + 'a>>;

/// Provider interface for embedding generation.
///
/// Async is required because real providers (Ollama, OpenAI) perform HTTP
/// requests; boxing keeps the trait usable as `dyn EmbeddingsProvider`.
pub trait EmbeddingsProvider: Send + Sync {
    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a>;
}
