//! Shared LLM service routing prompts by [`ModelTask`].
//!
//! - Lives in the same Tokio runtime as the application.
//! - Construct once, wrap in `Arc`, and pass clones to dependents.
//! - Caches one client per distinct config; answer and judge share a client
//!   when their profiles are identical.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use ai_llm_service::{LlmServiceProfiles, ModelTask, error_handler::process_env, profiles_from};
//!
//! # async fn run() -> Result<(), ai_llm_service::AiLlmError> {
//! let svc = Arc::new(LlmServiceProfiles::new(profiles_from(&process_env)?, Some(10))?);
//! let answer = svc.generate(ModelTask::Answer, "Hello", None).await?;
//! let vector = svc.embed("Ferris").await?;
//! # let _ = (answer, vector);
//! # Ok(()) }
//! ```

use std::{collections::HashMap, sync::Arc};

use tokio::sync::RwLock;
use tracing::debug;

use crate::{
    config::{
        default_config::ProfileSet, llm_model_config::LlmModelConfig, llm_provider::LlmProvider,
        model_task::ModelTask,
    },
    error_handler::AiLlmError,
    health_service::{HealthService, HealthStatus},
    services::{ollama_service::OllamaService, open_ai_service::OpenAiService},
};

/// Shared service holding the answer, judge, rewrite and embedding profiles.
pub struct LlmServiceProfiles {
    profiles: ProfileSet,

    ollama: RwLock<HashMap<ClientKey, Arc<OllamaService>>>,
    openai: RwLock<HashMap<ClientKey, Arc<OpenAiService>>>,

    health: HealthService,
}

impl LlmServiceProfiles {
    /// Creates the service. `health_timeout_secs` bounds each readiness probe.
    pub fn new(profiles: ProfileSet, health_timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        Ok(Self {
            profiles,
            ollama: RwLock::new(HashMap::new()),
            openai: RwLock::new(HashMap::new()),
            health: HealthService::new(health_timeout_secs)?,
        })
    }

    /// Generates text with the profile bound to `task`.
    ///
    /// `system` is sent as the system instruction for both providers.
    pub async fn generate(
        &self,
        task: ModelTask,
        prompt: &str,
        system: Option<&str>,
    ) -> Result<String, AiLlmError> {
        let cfg = self.profile(task);
        debug!(task = task.as_str(), model = %cfg.model, "generate");
        match cfg.provider {
            LlmProvider::Ollama => self.ollama_for(cfg).await?.generate(prompt, system).await,
            LlmProvider::OpenAI => self.openai_for(cfg).await?.generate(prompt, system).await,
        }
    }

    /// Computes embeddings using the embedding profile.
    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let cfg = &self.profiles.embedding;
        match cfg.provider {
            LlmProvider::Ollama => self.ollama_for(cfg).await?.embeddings(input).await,
            LlmProvider::OpenAI => self.openai_for(cfg).await?.embeddings(input).await,
        }
    }

    /// Health snapshot for every distinct (provider, endpoint, model) in use.
    pub async fn health_all(&self) -> Vec<HealthStatus> {
        let mut distinct: Vec<LlmModelConfig> = Vec::with_capacity(4);
        for cfg in self.all() {
            let seen = distinct.iter().any(|d| {
                d.provider == cfg.provider && d.endpoint == cfg.endpoint && d.model == cfg.model
            });
            if !seen {
                distinct.push(cfg.clone());
            }
        }
        self.health.check_many(&distinct).await
    }

    /// Config bound to a task.
    pub fn profile(&self, task: ModelTask) -> &LlmModelConfig {
        match task {
            ModelTask::Answer => &self.profiles.answer,
            ModelTask::Judge => &self.profiles.judge,
            ModelTask::Rewrite => &self.profiles.rewrite,
        }
    }

    pub fn embedding_profile(&self) -> &LlmModelConfig {
        &self.profiles.embedding
    }

    fn all(&self) -> [&LlmModelConfig; 4] {
        [
            &self.profiles.answer,
            &self.profiles.judge,
            &self.profiles.rewrite,
            &self.profiles.embedding,
        ]
    }

    /* --------------------- Internals --------------------- */

    async fn ollama_for(&self, cfg: &LlmModelConfig) -> Result<Arc<OllamaService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.ollama.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let fresh = Arc::new(OllamaService::new(cfg.clone())?);
        let mut w = self.ollama.write().await;
        Ok(w.entry(key).or_insert(fresh).clone())
    }

    async fn openai_for(&self, cfg: &LlmModelConfig) -> Result<Arc<OpenAiService>, AiLlmError> {
        let key = ClientKey::from(cfg);
        if let Some(cli) = self.openai.read().await.get(&key).cloned() {
            return Ok(cli);
        }
        let fresh = Arc::new(OpenAiService::new(cfg.clone())?);
        let mut w = self.openai.write().await;
        Ok(w.entry(key).or_insert(fresh).clone())
    }
}

/// Cache key for a client: everything that changes the request except the prompt.
#[derive(Clone, PartialEq, Eq, Hash)]
struct ClientKey {
    provider: LlmProvider,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    timeout: Option<u64>,
    temperature_bits: Option<u32>,
    top_p_bits: Option<u32>,
    max_tokens: Option<u32>,
}

impl From<&LlmModelConfig> for ClientKey {
    fn from(cfg: &LlmModelConfig) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
            timeout: cfg.timeout_secs,
            temperature_bits: cfg.temperature.map(f32::to_bits),
            top_p_bits: cfg.top_p.map(f32::to_bits),
            max_tokens: cfg.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(model: &str, temperature: f32) -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: model.into(),
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            max_tokens: None,
            temperature: Some(temperature),
            top_p: None,
            timeout_secs: Some(30),
        }
    }

    fn service() -> LlmServiceProfiles {
        let set = ProfileSet {
            answer: cfg("chat", 0.3),
            judge: cfg("chat", 0.3),
            rewrite: cfg("chat", 0.5),
            embedding: cfg("embed", 0.0),
        };
        LlmServiceProfiles::new(set, Some(1)).unwrap()
    }

    #[test]
    fn routes_tasks_to_profiles() {
        let svc = service();
        assert_eq!(svc.profile(ModelTask::Rewrite).temperature, Some(0.5));
        assert_eq!(svc.profile(ModelTask::Judge).temperature, Some(0.3));
        assert_eq!(svc.embedding_profile().model, "embed");
    }

    #[test]
    fn sampling_options_split_cache_keys() {
        let a = ClientKey::from(&cfg("chat", 0.3));
        let b = ClientKey::from(&cfg("chat", 0.3));
        let c = ClientKey::from(&cfg("chat", 0.5));
        assert!(a == b);
        assert!(a != c);
    }

    #[tokio::test]
    async fn clients_are_reused() {
        let svc = service();
        let first = svc.ollama_for(svc.profile(ModelTask::Answer)).await.unwrap();
        let second = svc.ollama_for(svc.profile(ModelTask::Judge)).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(svc.ollama.read().await.len(), 1);
    }
}
