//! Readiness probes for the configured LLM backends.
//!
//! - Ollama: `GET {endpoint}/api/tags`, then look for the model name
//! - OpenAI-compatible: `GET {endpoint}/models` with Bearer auth, then look for the model id
//!
//! [`HealthService::check`] never fails: transport and status errors become
//! a [`HealthStatus`] with `ok = false`, which is what `/health` reports.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::llm_model_config::LlmModelConfig;
use crate::config::llm_provider::LlmProvider;
use crate::error_handler::{AiLlmError, HealthError, HttpError, make_snippet};

/// A serializable health snapshot for a single provider/config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub provider: String,
    pub endpoint: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

/// Outcome of a probe that reached the server.
struct Probe {
    model_listed: Option<bool>,
    latency_ms: u128,
}

/// Health checker reusing a single HTTP client.
pub struct HealthService {
    client: reqwest::Client,
    timeout: Duration,
}

impl HealthService {
    /// Creates a new health service with an optional probe timeout (seconds, default 10).
    pub fn new(timeout_secs: Option<u64>) -> Result<Self, AiLlmError> {
        let timeout = Duration::from_secs(timeout_secs.unwrap_or(10));
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        info!(timeout_secs = timeout.as_secs(), "HealthService initialized");
        Ok(Self { client, timeout })
    }

    /// Probes one config. Never returns an error.
    pub async fn check(&self, cfg: &LlmModelConfig) -> HealthStatus {
        let started = Instant::now();
        let result = match cfg.provider {
            LlmProvider::Ollama => self.probe_ollama(cfg).await,
            LlmProvider::OpenAI => self.probe_openai(cfg).await,
        };

        let status = match result {
            Ok(Probe {
                model_listed,
                latency_ms,
            }) => {
                let (ok, message) = match model_listed {
                    Some(true) => (true, "reachable; model is available".to_string()),
                    Some(false) => (false, "reachable, but model is not listed".to_string()),
                    None => (true, "reachable; model list not decodable".to_string()),
                };
                status(cfg, ok, latency_ms, message)
            }
            Err(e) => status(cfg, false, started.elapsed().as_millis(), e.to_string()),
        };

        if status.ok {
            debug!(
                provider = %status.provider,
                model = %status.model,
                latency_ms = status.latency_ms,
                "health probe passed"
            );
        } else {
            warn!(
                provider = %status.provider,
                endpoint = %status.endpoint,
                model = %status.model,
                message = %status.message,
                "health probe failed"
            );
        }
        status
    }

    /// Probes several configs sequentially.
    pub async fn check_many(&self, configs: &[LlmModelConfig]) -> Vec<HealthStatus> {
        let mut out = Vec::with_capacity(configs.len());
        for cfg in configs {
            out.push(self.check(cfg).await);
        }
        out
    }

    async fn probe_ollama(&self, cfg: &LlmModelConfig) -> Result<Probe, AiLlmError> {
        #[derive(Deserialize)]
        struct Tag {
            name: String,
        }
        #[derive(Deserialize)]
        struct Tags {
            models: Vec<Tag>,
        }

        let url = format!("{}/api/tags", base(cfg)?);
        let (resp, latency_ms) = self.get(&url, None).await?;
        let listed = resp.json::<Tags>().await.ok().map(|tags| {
            tags.models
                .iter()
                .any(|m| same_ollama_model(&m.name, &cfg.model))
        });
        Ok(Probe {
            model_listed: listed,
            latency_ms,
        })
    }

    async fn probe_openai(&self, cfg: &LlmModelConfig) -> Result<Probe, AiLlmError> {
        #[derive(Deserialize)]
        struct ModelItem {
            id: String,
        }
        #[derive(Deserialize)]
        struct Models {
            data: Vec<ModelItem>,
        }

        let api_key = cfg
            .api_key
            .as_deref()
            .ok_or_else(|| HealthError::Decode("missing OpenAI API key".into()))?;
        let auth = header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| HealthError::Decode(format!("invalid API key header: {e}")))?;

        let url = format!("{}/models", base(cfg)?);
        let (resp, latency_ms) = self.get(&url, Some(auth)).await?;
        let listed = resp
            .json::<Models>()
            .await
            .ok()
            .map(|m| m.data.iter().any(|item| item.id == cfg.model));
        Ok(Probe {
            model_listed: listed,
            latency_ms,
        })
    }

    async fn get(
        &self,
        url: &str,
        auth: Option<header::HeaderValue>,
    ) -> Result<(reqwest::Response, u128), AiLlmError> {
        let started = Instant::now();
        debug!("GET {url}");
        let mut req = self.client.get(url).timeout(self.timeout);
        if let Some(auth) = auth {
            req = req.header(header::AUTHORIZATION, auth);
        }
        let resp = req.send().await?;
        let latency_ms = started.elapsed().as_millis();

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(HealthError::HttpStatus(HttpError {
                status,
                url: url.to_string(),
                snippet: make_snippet(&text),
            })
            .into());
        }
        Ok((resp, latency_ms))
    }
}

fn base(cfg: &LlmModelConfig) -> Result<&str, AiLlmError> {
    let endpoint = cfg.endpoint.trim();
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/'))
    } else {
        Err(HealthError::InvalidEndpoint(cfg.endpoint.clone()).into())
    }
}

/// Ollama lists untagged models as `name:latest`.
fn same_ollama_model(listed: &str, wanted: &str) -> bool {
    listed == wanted || (!wanted.contains(':') && listed == format!("{wanted}:latest"))
}

fn status(cfg: &LlmModelConfig, ok: bool, latency_ms: u128, message: String) -> HealthStatus {
    HealthStatus {
        provider: format!("{:?}", cfg.provider),
        endpoint: cfg.endpoint.clone(),
        model: cfg.model.clone(),
        ok,
        latency_ms,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_tag_matches_bare_name() {
        assert!(same_ollama_model("llama3.1:latest", "llama3.1"));
        assert!(same_ollama_model("llama3.1:8b", "llama3.1:8b"));
        assert!(!same_ollama_model("llama3.1:8b", "llama3.1"));
    }

    #[tokio::test]
    async fn invalid_endpoint_reports_not_ok() {
        let svc = HealthService::new(Some(1)).unwrap();
        let cfg = LlmModelConfig {
            provider: LlmProvider::Ollama,
            model: "m".into(),
            endpoint: "localhost".into(),
            api_key: None,
            max_tokens: None,
            temperature: None,
            top_p: None,
            timeout_secs: None,
        };
        let s = svc.check(&cfg).await;
        assert!(!s.ok);
        assert!(s.message.contains("invalid endpoint"));
    }
}
