//! The [`ChunkStore`] contract and its Qdrant-backed implementation.

use std::collections::BTreeSet;
use std::future::Future;
use std::io::{self, IsTerminal};
use std::pin::Pin;
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, instrument, warn};

use crate::chunk::{Chunk, ChunkHit};
use crate::config::RagConfig;
use crate::embed::EmbeddingsProvider;
use crate::embed_pool::embed_all;
use crate::errors::RagError;
use crate::filters::{file_name_filter, file_names_filter};
use crate::ids::chunk_point_id;
use crate::qdrant_facade::{QdrantFacade, chunk_point};

/// Boxed future returned by [`ChunkStore`] methods.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RagError>> + Send + 'a>>;

/// Persistence of document chunks, keyed by the original file name.
///
/// Object-safe so the server can hold an `Arc<dyn ChunkStore>`.
pub trait ChunkStore: Send + Sync {
    /// Embeds and persists `chunks`, returning how many were written.
    fn store(&self, chunks: Vec<Chunk>) -> StoreFuture<'_, usize>;

    /// Top-`k` chunks for `query` whose file name is in `file_names`, best first.
    ///
    /// An empty `file_names` yields no hits.
    fn search<'a>(
        &'a self,
        query: &'a str,
        k: usize,
        file_names: &'a [String],
    ) -> StoreFuture<'a, Vec<ChunkHit>>;

    /// Removes every chunk tagged with `file_name`, returning how many were removed.
    fn delete_file<'a>(&'a self, file_name: &'a str) -> StoreFuture<'a, u64>;

    /// Distinct file names currently present in the store.
    fn list_file_names(&self) -> StoreFuture<'_, BTreeSet<String>>;
}

/// Qdrant-backed chunk store.
///
/// The collection is created lazily on the first write, once the embedding
/// dimension is known.
pub struct RagStore {
    cfg: RagConfig,
    client: QdrantFacade,
    embedder: Arc<dyn EmbeddingsProvider>,
}

impl RagStore {
    /// Constructs a new store from the given configuration.
    ///
    /// # Errors
    /// Returns `RagError::Config`/`RagError::Qdrant` if the client cannot be built.
    pub fn new(cfg: RagConfig, embedder: Arc<dyn EmbeddingsProvider>) -> Result<Self, RagError> {
        let client = QdrantFacade::new(&cfg)?;
        Ok(Self {
            cfg,
            client,
            embedder,
        })
    }

    pub fn config(&self) -> &RagConfig {
        &self.cfg
    }

    #[instrument(skip_all, fields(collection = %self.cfg.collection, chunks = chunks.len()))]
    async fn store_impl(&self, chunks: Vec<Chunk>) -> Result<usize, RagError> {
        if chunks.is_empty() {
            return Ok(0);
        }

        let vectors = embed_all(&chunks, self.embedder.as_ref(), self.cfg.embed_concurrency).await?;
        let dim = vectors.first().map(Vec::len).unwrap_or_default();
        self.client.ensure_collection(dim).await?;

        let points: Vec<_> = chunks
            .iter()
            .zip(vectors)
            .enumerate()
            .map(|(i, (chunk, vector))| {
                chunk_point(chunk_point_id(&chunk.file_name, i, &chunk.text), vector, chunk)
            })
            .collect();

        let batch = self.cfg.upsert_batch.max(1);
        let pb = upload_bar(points.len().div_ceil(batch) as u64);
        let mut written = 0usize;
        let mut points = points.into_iter().peekable();
        while points.peek().is_some() {
            let slice: Vec<_> = points.by_ref().take(batch).collect();
            written += self.client.upsert_points(slice).await?;
            pb.inc(1);
        }
        pb.finish_and_clear();

        info!(written, "chunks stored");
        Ok(written)
    }

    async fn search_impl(
        &self,
        query: &str,
        k: usize,
        file_names: &[String],
    ) -> Result<Vec<ChunkHit>, RagError> {
        if file_names.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        let vector = self.embedder.embed(query).await?;
        let hits = self
            .client
            .search(
                vector,
                k as u64,
                file_names_filter(file_names),
                self.cfg.exact_search,
            )
            .await?;
        Ok(hits
            .into_iter()
            .map(|(score, chunk)| ChunkHit { score, chunk })
            .collect())
    }

    async fn delete_impl(&self, file_name: &str) -> Result<u64, RagError> {
        if !self.client.collection_exists().await? {
            debug!(file_name, "delete on missing collection");
            return Ok(0);
        }
        let removed = self.client.delete_matching(file_name_filter(file_name)).await?;
        info!(file_name, removed, "chunks deleted");
        Ok(removed)
    }

    async fn list_impl(&self) -> Result<BTreeSet<String>, RagError> {
        if !self.client.collection_exists().await? {
            return Ok(BTreeSet::new());
        }
        self.client.distinct_file_names().await
    }
}

impl ChunkStore for RagStore {
    fn store(&self, chunks: Vec<Chunk>) -> StoreFuture<'_, usize> {
        Box::pin(self.store_impl(chunks))
    }

    fn search<'a>(
        &'a self,
        query: &'a str,
        k: usize,
        file_names: &'a [String],
    ) -> StoreFuture<'a, Vec<ChunkHit>> {
        Box::pin(self.search_impl(query, k, file_names))
    }

    fn delete_file<'a>(&'a self, file_name: &'a str) -> StoreFuture<'a, u64> {
        Box::pin(self.delete_impl(file_name))
    }

    fn list_file_names(&self) -> StoreFuture<'_, BTreeSet<String>> {
        Box::pin(self.list_impl())
    }
}

/// Upload progress bar; hidden when stderr is not a terminal.
fn upload_bar(batches: u64) -> ProgressBar {
    if !io::stderr().is_terminal() {
        return ProgressBar::hidden();
    }
    let pb = ProgressBar::new(batches);
    match ProgressStyle::with_template(
        "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} batches ({eta})",
    ) {
        Ok(style) => pb.set_style(style.progress_chars("##-")),
        Err(e) => warn!(error = %e, "progress template rejected"),
    }
    pb
}
