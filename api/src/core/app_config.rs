//! Server configuration assembled from every crate's env reader.

use ai_llm_service::ProfileSet;
use ai_llm_service::config::default_config::profiles_from;
use ai_llm_service::error_handler::{EnvLookup, env_opt_u64, must_env, process_env};
use doc_ingest::{RecursiveSplitter, splitter_from};
use qa_flow::FlowConfig;
use rag_store::RagConfig;

use crate::error_handler::AppError;

const DEFAULT_MAX_UPLOAD_MB: u64 = 200;

#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Bind address, e.g. `0.0.0.0:8080`.
    pub api_address: String,
    pub rag: RagConfig,
    pub profiles: ProfileSet,
    pub health_timeout_secs: Option<u64>,
    pub flow: FlowConfig,
    pub splitter: RecursiveSplitter,
    /// Request body limit for uploads.
    pub max_upload_bytes: usize,
}

impl AppConfig {
    /// Loads everything from the process environment.
    ///
    /// # Errors
    /// [`AppError::Config`] naming the first missing or malformed variable.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(&process_env)
    }

    pub fn from_lookup(env: EnvLookup<'_>) -> Result<Self, AppError> {
        let api_address = must_env(env, "API_ADDRESS").map_err(cfg_err)?;
        let rag = RagConfig::from_lookup(env).map_err(cfg_err)?;
        let profiles = profiles_from(env).map_err(cfg_err)?;
        let health_timeout_secs =
            env_opt_u64(env, "LLM_HEALTH_TIMEOUT_SECS").map_err(cfg_err)?;
        let flow = FlowConfig::from_lookup(env).map_err(cfg_err)?;

        let splitter = splitter_from(env).map_err(cfg_err)?;
        let max_upload_bytes = env_opt_u64(env, "MAX_UPLOAD_MB")
            .map_err(cfg_err)?
            .unwrap_or(DEFAULT_MAX_UPLOAD_MB)
            .checked_mul(1024 * 1024)
            .and_then(|bytes| usize::try_from(bytes).ok())
            .ok_or_else(|| AppError::Config("MAX_UPLOAD_MB is too large".into()))?;

        Ok(Self {
            api_address,
            rag,
            profiles,
            health_timeout_secs,
            flow,
            splitter,
            max_upload_bytes,
        })
    }
}

fn cfg_err(e: impl std::fmt::Display) -> AppError {
    AppError::Config(e.to_string())
}
