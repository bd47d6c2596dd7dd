//! Collaborator seams of the flow and their production adapters.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use ai_llm_service::{LlmServiceProfiles, ModelTask};
use rag_store::{ChunkHit, ChunkStore};

use crate::error::FlowError;

/// Boxed future returned by the flow's collaborators.
pub type FlowFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, FlowError>> + Send + 'a>>;

/// Fetches the top-`k` chunks for a query within a set of files.
pub trait ChunkRetriever: Send + Sync {
    fn retrieve<'a>(
        &'a self,
        query: &'a str,
        k: usize,
        file_names: &'a [String],
    ) -> FlowFuture<'a, Vec<ChunkHit>>;
}

/// Runs a prompt against the model bound to a task.
pub trait TextGenerator: Send + Sync {
    fn generate<'a>(&'a self, task: ModelTask, prompt: &'a str) -> FlowFuture<'a, String>;
}

/// [`ChunkRetriever`] over any [`ChunkStore`].
#[derive(Clone)]
pub struct StoreRetriever {
    store: Arc<dyn ChunkStore>,
}

impl StoreRetriever {
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self { store }
    }
}

impl ChunkRetriever for StoreRetriever {
    fn retrieve<'a>(
        &'a self,
        query: &'a str,
        k: usize,
        file_names: &'a [String],
    ) -> FlowFuture<'a, Vec<ChunkHit>> {
        Box::pin(async move {
            self.store
                .search(query, k, file_names)
                .await
                .map_err(|e| FlowError::Retrieval(e.to_string()))
        })
    }
}

/// [`TextGenerator`] routing each task to its profile in [`LlmServiceProfiles`].
#[derive(Clone)]
pub struct ProfilesGenerator {
    svc: Arc<LlmServiceProfiles>,
}

impl ProfilesGenerator {
    pub fn new(svc: Arc<LlmServiceProfiles>) -> Self {
        Self { svc }
    }
}

impl TextGenerator for ProfilesGenerator {
    fn generate<'a>(&'a self, task: ModelTask, prompt: &'a str) -> FlowFuture<'a, String> {
        Box::pin(async move {
            self.svc
                .generate(task, prompt, None)
                .await
                .map_err(|e| FlowError::Generation(e.to_string()))
        })
    }
}
