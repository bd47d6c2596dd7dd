//! Default LLM profiles loaded strictly from environment variables.
//!
//! One chat model serves three tasks that differ only by sampling:
//!
//! - **Answer**  → grounded answer generation (`temperature = 0.3`)
//! - **Judge**   → relevance grading, 1..=10 (`temperature = 0.3`)
//! - **Rewrite** → query reformulation (`temperature = 0.5`)
//!
//! plus a dedicated **Embedding** model (`temperature = 0.0`).
//!
//! # Environment variables
//!
//! Common:
//! - `LLM_KIND` = provider kind (`ollama` by default, or `openai`)
//! - `LLM_MAX_TOKENS` = optional max tokens (u32)
//! - `EMBEDDING_MODEL` = embedding model (mandatory)
//!
//! Ollama-specific:
//! - `OLLAMA_URL` or `OLLAMA_PORT` = endpoint (mandatory)
//! - `OLLAMA_MODEL` = chat model (mandatory)
//!
//! OpenAI-specific:
//! - `OPENAI_API_KEY` = API key (mandatory)
//! - `OPENAI_MODEL` = chat model (mandatory)
//! - `OPENAI_URL` = base URL including the version segment (default `https://api.openai.com/v1`)

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, ConfigError, EnvLookup, Result, env_opt_u32, must_env, opt_env,
    },
};

const OPENAI_DEFAULT_URL: &str = "https://api.openai.com/v1";

/// Full set of model configs used by the question-answering flow.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileSet {
    pub answer: LlmModelConfig,
    pub judge: LlmModelConfig,
    pub rewrite: LlmModelConfig,
    pub embedding: LlmModelConfig,
}

/// Builds the [`ProfileSet`] from an arbitrary variable lookup.
///
/// # Errors
/// - [`ConfigError::MissingVar`] when a mandatory variable is absent
/// - [`ConfigError::UnsupportedProvider`] for an unknown `LLM_KIND`
/// - validation errors from [`LlmModelConfig::validate`]
pub fn profiles_from(env: EnvLookup<'_>) -> Result<ProfileSet> {
    let provider: LlmProvider = opt_env(env, "LLM_KIND")
        .unwrap_or_else(|| "ollama".to_string())
        .parse()?;

    let (endpoint, chat_model, api_key) = match provider {
        LlmProvider::Ollama => (ollama_endpoint(env)?, must_env(env, "OLLAMA_MODEL")?, None),
        LlmProvider::OpenAI => (
            opt_env(env, "OPENAI_URL").unwrap_or_else(|| OPENAI_DEFAULT_URL.to_string()),
            must_env(env, "OPENAI_MODEL")?,
            Some(must_env(env, "OPENAI_API_KEY")?),
        ),
    };
    let embedding_model = must_env(env, "EMBEDDING_MODEL")?;
    let max_tokens = env_opt_u32(env, "LLM_MAX_TOKENS")?;

    let chat = |temperature: f32| LlmModelConfig {
        provider,
        model: chat_model.clone(),
        endpoint: endpoint.clone(),
        api_key: api_key.clone(),
        max_tokens,
        temperature: Some(temperature),
        top_p: None,
        timeout_secs: Some(600),
    };

    let set = ProfileSet {
        answer: chat(0.3),
        judge: chat(0.3),
        rewrite: chat(0.5),
        embedding: LlmModelConfig {
            provider,
            model: embedding_model,
            endpoint: endpoint.clone(),
            api_key: api_key.clone(),
            max_tokens: None,
            temperature: Some(0.0),
            top_p: None,
            timeout_secs: Some(30),
        },
    };

    for cfg in [&set.answer, &set.judge, &set.rewrite, &set.embedding] {
        cfg.validate()?;
    }
    Ok(set)
}

/// Resolves the Ollama endpoint.
///
/// Precedence:
/// 1. `OLLAMA_URL` if present and non-empty
/// 2. `OLLAMA_PORT` → `http://localhost:{port}`
fn ollama_endpoint(env: EnvLookup<'_>) -> Result<String> {
    if let Some(url) = opt_env(env, "OLLAMA_URL") {
        return Ok(url);
    }
    if let Some(port) = opt_env(env, "OLLAMA_PORT") {
        port.parse::<u16>().map_err(|_| ConfigError::InvalidNumber {
            var: "OLLAMA_PORT",
            reason: "expected u16 (1..=65535)",
        })?;
        return Ok(format!("http://localhost:{port}"));
    }
    Err(AiLlmError::Config(ConfigError::MissingVar(
        "OLLAMA_URL or OLLAMA_PORT",
    )))
}
