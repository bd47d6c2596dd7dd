//! Embedding executor with bounded concurrency and dimension checks.

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::debug;

use crate::{chunk::Chunk, embed::EmbeddingsProvider, errors::RagError};

/// Embeds every chunk text, preserving input order.
///
/// All vectors must share one dimensionality; the first vector sets it.
///
/// # Errors
/// The first provider failure, or [`RagError::VectorSizeMismatch`].
pub async fn embed_all(
    chunks: &[Chunk],
    provider: &dyn EmbeddingsProvider,
    concurrency: usize,
) -> Result<Vec<Vec<f32>>, RagError> {
    debug!(total = chunks.len(), concurrency, "embedding chunks");

    let pending: Vec<_> = chunks.iter().map(|c| provider.embed(&c.text)).collect();
    let vectors: Vec<Vec<f32>> = stream::iter(pending)
        .buffered(concurrency.max(1))
        .try_collect()
        .await?;

    if let Some(first) = vectors.first() {
        let want = first.len();
        if want == 0 {
            return Err(RagError::Embedding("provider returned an empty vector".into()));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != want) {
            return Err(RagError::VectorSizeMismatch {
                got: bad.len(),
                want,
            });
        }
    }
    Ok(vectors)
}
