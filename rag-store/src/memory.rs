//! In-process [`ChunkStore`] and a deterministic embedder.
//!
//! Brute-force cosine similarity over a `Vec`; same contract as the Qdrant
//! store, no network. Dependents enable it through the `memory` feature.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::chunk::{Chunk, ChunkHit};
use crate::embed::{EmbedFuture, EmbeddingsProvider};
use crate::embed_pool::embed_all;
use crate::store::{ChunkStore, StoreFuture};

/// Hashes lowercase alphanumeric tokens into a fixed number of buckets.
///
/// Texts sharing words get a positive cosine similarity, which is enough to
/// make retrieval ordering predictable in tests.
#[derive(Clone, Debug)]
pub struct KeywordEmbedder {
    dim: usize,
}

impl KeywordEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1) }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0.0f32; self.dim];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = fnv1a(&token.to_lowercase()) as usize % self.dim;
            v[bucket] += 1.0;
        }
        // Keeps empty text from producing a zero vector.
        if v.iter().all(|x| *x == 0.0) {
            v[0] = f32::EPSILON;
        }
        v
    }
}

impl Default for KeywordEmbedder {
    fn default() -> Self {
        Self::new(64)
    }
}

impl EmbeddingsProvider for KeywordEmbedder {
    fn embed<'a>(&'a self, text: &'a str) -> EmbedFuture<'a> {
        Box::pin(async move { Ok(self.vector(text)) })
    }
}

fn fnv1a(s: &str) -> u64 {
    s.bytes().fold(0xcbf2_9ce4_8422_2325, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0000_0100_0000_01b3)
    })
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let na = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let nb = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if na == 0.0 || nb == 0.0 {
        0.0
    } else {
        dot / (na * nb)
    }
}

/// Vector store kept in memory.
pub struct InMemoryStore {
    embedder: Arc<dyn EmbeddingsProvider>,
    points: RwLock<Vec<(Vec<f32>, Chunk)>>,
}

impl InMemoryStore {
    pub fn new(embedder: Arc<dyn EmbeddingsProvider>) -> Self {
        Self {
            embedder,
            points: RwLock::new(Vec::new()),
        }
    }

    /// Store backed by a default [`KeywordEmbedder`].
    pub fn with_keyword_embedder() -> Self {
        Self::new(Arc::new(KeywordEmbedder::default()))
    }

    /// Number of stored chunks.
    pub async fn len(&self) -> usize {
        self.points.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.points.read().await.is_empty()
    }

    /// Every chunk stored for `file_name`, in insertion order.
    pub async fn chunks_of(&self, file_name: &str) -> Vec<Chunk> {
        self.points
            .read()
            .await
            .iter()
            .filter(|(_, c)| c.file_name == file_name)
            .map(|(_, c)| c.clone())
            .collect()
    }
}

impl ChunkStore for InMemoryStore {
    fn store(&self, chunks: Vec<Chunk>) -> StoreFuture<'_, usize> {
        Box::pin(async move {
            let vectors = embed_all(&chunks, self.embedder.as_ref(), 4).await?;
            let n = chunks.len();
            self.points
                .write()
                .await
                .extend(vectors.into_iter().zip(chunks));
            Ok(n)
        })
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        k: usize,
        file_names: &'a [String],
    ) -> StoreFuture<'a, Vec<ChunkHit>> {
        Box::pin(async move {
            if file_names.is_empty() || k == 0 {
                return Ok(Vec::new());
            }
            let q = self.embedder.embed(query).await?;
            let points = self.points.read().await;
            let mut hits: Vec<ChunkHit> = points
                .iter()
                .filter(|(_, c)| file_names.contains(&c.file_name))
                .map(|(v, c)| ChunkHit {
                    score: cosine(&q, v),
                    chunk: c.clone(),
                })
                .collect();
            hits.sort_by(|a, b| b.score.total_cmp(&a.score));
            hits.truncate(k);
            Ok(hits)
        })
    }

    fn delete_file<'a>(&'a self, file_name: &'a str) -> StoreFuture<'a, u64> {
        Box::pin(async move {
            let mut points = self.points.write().await;
            let before = points.len();
            points.retain(|(_, c)| c.file_name != file_name);
            Ok((before - points.len()) as u64)
        })
    }

    fn list_file_names(&self) -> StoreFuture<'_, BTreeSet<String>> {
        Box::pin(async move {
            Ok(self
                .points
                .read()
                .await
                .iter()
                .map(|(_, c)| c.file_name.clone())
                .collect())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    async fn seeded() -> InMemoryStore {
        let store = InMemoryStore::with_keyword_embedder();
        store
            .store(vec![
                Chunk::text("a.pdf", Some(1), "Revenue grew in the third quarter"),
                Chunk::text("a.pdf", Some(2), "Office plants need water"),
                Chunk::text("b.pdf", Some(1), "Revenue fell in the third quarter"),
            ])
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn search_respects_file_filter_and_ranking() {
        let store = seeded().await;
        let hits = store
            .search("third quarter revenue", 5, &names(&["a.pdf"]))
            .await
            .unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.chunk.file_name == "a.pdf"));
        assert_eq!(hits[0].chunk.ordinal, Some(1));
        assert!(hits[0].score >= hits[1].score);
    }

    #[tokio::test]
    async fn search_with_no_files_is_empty() {
        let store = seeded().await;
        assert!(store.search("revenue", 5, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn delete_scopes_to_one_file() {
        let store = seeded().await;
        assert_eq!(store.delete_file("a.pdf").await.unwrap(), 2);
        assert_eq!(store.delete_file("a.pdf").await.unwrap(), 0);
        let listed = store.list_file_names().await.unwrap();
        assert_eq!(listed.into_iter().collect::<Vec<_>>(), names(&["b.pdf"]));
    }

    #[test]
    fn keyword_vectors_overlap_on_shared_words() {
        let e = KeywordEmbedder::default();
        let a = e.vector("Revenue Growth");
        let b = e.vector("revenue");
        let c = e.vector("");
        assert!(cosine(&a, &b) > 0.0);
        assert!(c.iter().any(|x| *x != 0.0));
    }
}
