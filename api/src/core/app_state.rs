use std::sync::Arc;

use ai_llm_service::LlmServiceProfiles;
use doc_ingest::Ingestor;
use qa_flow::{CorrectiveRag, ProfilesGenerator, StoreRetriever, TracingProgress};
use rag_store::{ChunkStore, ProfilesEmbedder, RagStore};

use crate::{
    core::{app_config::AppConfig, session_registry::SessionRegistry},
    error_handler::AppError,
};

/// Shared state for all HTTP handlers.
pub struct AppState {
    pub store: Arc<dyn ChunkStore>,
    pub ingestor: Ingestor,
    pub rag: CorrectiveRag,
    pub sessions: SessionRegistry,
    /// Probed by `/health`; absent when the flow runs on stand-in models.
    pub llm: Option<Arc<LlmServiceProfiles>>,
}

impl AppState {
    /// Wires the Qdrant store, the LLM profiles, the ingestor and the flow.
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        let llm = Arc::new(
            LlmServiceProfiles::new(cfg.profiles.clone(), cfg.health_timeout_secs)
                .map_err(|e| AppError::Config(e.to_string()))?,
        );
        let embedder = Arc::new(ProfilesEmbedder::new(llm.clone()));
        let store: Arc<dyn ChunkStore> = Arc::new(RagStore::new(cfg.rag.clone(), embedder)?);

        let rag = CorrectiveRag::new(
            Arc::new(StoreRetriever::new(store.clone())),
            Arc::new(ProfilesGenerator::new(llm.clone())),
            cfg.flow.clone(),
        )
        .with_progress(Arc::new(TracingProgress));

        Ok(Self {
            ingestor: Ingestor::new(store.clone(), cfg.splitter),
            store,
            rag,
            sessions: SessionRegistry::new(),
            llm: Some(llm),
        })
    }

    /// Assembles state from ready-made parts.
    pub fn new(store: Arc<dyn ChunkStore>, ingestor: Ingestor, rag: CorrectiveRag) -> Self {
        Self {
            store,
            ingestor,
            rag,
            sessions: SessionRegistry::new(),
            llm: None,
        }
    }
}
