//! OpenAI-compatible client: `/chat/completions` and `/embeddings`.
//!
//! `LlmModelConfig::endpoint` already carries the version segment
//! (`https://api.openai.com/v1`), so paths are appended as-is.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::{debug, error, info};

use crate::{
    config::{llm_model_config::LlmModelConfig, llm_provider::LlmProvider},
    error_handler::{
        AiLlmError, HttpError, Provider, ProviderError, ProviderErrorKind, make_snippet,
    },
};

const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug)]
pub struct OpenAiService {
    client: reqwest::Client,
    cfg: LlmModelConfig,
    url_chat: String,
    url_embeddings: String,
}

impl OpenAiService {
    /// Builds a client with the bearer key as a default header.
    ///
    /// # Errors
    /// `InvalidProvider`, `MissingApiKey` or `InvalidEndpoint` provider errors,
    /// or [`AiLlmError::HttpTransport`] if the client cannot be built.
    pub fn new(cfg: LlmModelConfig) -> Result<Self, AiLlmError> {
        let fail = |kind| -> AiLlmError { ProviderError::new(Provider::OpenAI, kind).into() };

        if cfg.provider != LlmProvider::OpenAI {
            return Err(fail(ProviderErrorKind::InvalidProvider));
        }
        let Some(api_key) = cfg.api_key.as_deref() else {
            return Err(fail(ProviderErrorKind::MissingApiKey));
        };
        let base = cfg.endpoint.trim().trim_end_matches('/');
        if !(base.starts_with("http://") || base.starts_with("https://")) {
            return Err(fail(ProviderErrorKind::InvalidEndpoint(cfg.endpoint.clone())));
        }

        let auth = header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| fail(ProviderErrorKind::Decode(format!("invalid API key header: {e}"))))?;
        let headers = header::HeaderMap::from_iter([(header::AUTHORIZATION, auth)]);

        let timeout_secs = cfg.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .default_headers(headers)
            .build()?;

        info!(model = %cfg.model, endpoint = %base, timeout_secs, "OpenAiService initialized");

        Ok(Self {
            client,
            url_chat: format!("{base}/chat/completions"),
            url_embeddings: format!("{base}/embeddings"),
            cfg,
        })
    }

    /// Non-streaming chat completion; returns the first choice with content.
    pub async fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String, AiLlmError> {
        let body = ChatRequest::new(&self.cfg, prompt, system);
        let out: ChatResponse = self.post(&self.url_chat, &body).await?;
        out.choices
            .into_iter()
            .find_map(|c| c.message.content)
            .ok_or_else(|| ProviderError::new(Provider::OpenAI, ProviderErrorKind::EmptyChoices).into())
    }

    /// Embedding of `input` with the configured model.
    pub async fn embeddings(&self, input: &str) -> Result<Vec<f32>, AiLlmError> {
        let body = EmbeddingsRequest {
            model: &self.cfg.model,
            input,
        };
        let out: EmbeddingsResponse = self.post(&self.url_embeddings, &body).await?;
        out.data.into_iter().next().map(|d| d.embedding).ok_or_else(|| {
            ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::Decode("empty `data` in embeddings response".into()),
            )
            .into()
        })
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<R, AiLlmError> {
        let started = Instant::now();
        debug!(model = %self.cfg.model, "POST {url}");

        let resp = self.client.post(url).json(body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let snippet = make_snippet(&resp.text().await.unwrap_or_default());
            error!(%status, %url, %snippet, model = %self.cfg.model, "OpenAI request failed");
            return Err(ProviderError::new(
                Provider::OpenAI,
                ProviderErrorKind::HttpStatus(HttpError {
                    status,
                    url: url.to_string(),
                    snippet,
                }),
            )
            .into());
        }

        let out = resp.json::<R>().await.map_err(|e| {
            error!(error = %e, %url, "undecodable OpenAI response");
            ProviderError::new(Provider::OpenAI, ProviderErrorKind::Decode(e.to_string()))
        })?;
        debug!(%url, latency_ms = started.elapsed().as_millis(), "OpenAI call completed");
        Ok(out)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

impl<'a> ChatRequest<'a> {
    fn new(cfg: &'a LlmModelConfig, prompt: &'a str, system: Option<&'a str>) -> Self {
        let messages = system
            .map(|content| Message { role: "system", content })
            .into_iter()
            .chain([Message { role: "user", content: prompt }])
            .collect();
        Self {
            model: &cfg.model,
            messages,
            temperature: cfg.temperature,
            top_p: cfg.top_p,
            max_tokens: cfg.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<Embedding>,
}

#[derive(Debug, Deserialize)]
struct Embedding {
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg() -> LlmModelConfig {
        LlmModelConfig {
            provider: LlmProvider::OpenAI,
            model: "gpt-4o-mini".into(),
            endpoint: "https://api.openai.com/v1/".into(),
            api_key: Some("sk-test".into()),
            max_tokens: None,
            temperature: Some(0.5),
            top_p: None,
            timeout_secs: Some(5),
        }
    }

    #[test]
    fn endpoint_keeps_version_segment() {
        let svc = OpenAiService::new(cfg()).unwrap();
        assert_eq!(svc.url_chat, "https://api.openai.com/v1/chat/completions");
        assert_eq!(svc.url_embeddings, "https://api.openai.com/v1/embeddings");
    }

    #[test]
    fn missing_key_and_bad_endpoint_are_rejected() {
        let mut c = cfg();
        c.api_key = None;
        assert!(matches!(
            OpenAiService::new(c),
            Err(AiLlmError::Provider(ProviderError {
                kind: ProviderErrorKind::MissingApiKey,
                ..
            }))
        ));

        let mut c = cfg();
        c.endpoint = "api.openai.com".into();
        assert!(matches!(
            OpenAiService::new(c),
            Err(AiLlmError::Provider(ProviderError {
                kind: ProviderErrorKind::InvalidEndpoint(_),
                ..
            }))
        ));
    }

    #[test]
    fn chat_request_puts_system_first() {
        let c = cfg();
        let body = ChatRequest::new(&c, "question", Some("rules"));
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "question");
        assert_eq!(json["temperature"], 0.5);
        assert!(json.get("max_tokens").is_none());

        let json = serde_json::to_value(ChatRequest::new(&c, "only", None)).unwrap();
        assert_eq!(json["messages"].as_array().unwrap().len(), 1);
    }
}
