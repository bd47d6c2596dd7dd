//! Shared LLM access for the document Q&A backend.
//!
//! One [`service_profiles::LlmServiceProfiles`] instance is built at startup
//! and shared behind an `Arc`. It routes each prompt to the profile of its
//! [`config::model_task::ModelTask`] and computes embeddings with the
//! embedding profile. Providers: Ollama and any OpenAI-compatible endpoint.

pub mod config;
pub mod error_handler;
pub mod health_service;
pub mod service_profiles;
pub mod services;
pub mod telemetry;

pub use config::default_config::{ProfileSet, profiles_from};
pub use config::llm_model_config::LlmModelConfig;
pub use config::llm_provider::LlmProvider;
pub use config::model_task::ModelTask;
pub use error_handler::AiLlmError;
pub use health_service::HealthStatus;
pub use service_profiles::LlmServiceProfiles;
