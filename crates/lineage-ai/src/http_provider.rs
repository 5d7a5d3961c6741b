//! Chat-completions HTTP backend for the reasoning collaborator.
//! Response statuses map onto the shared error taxonomy so the facade
//! can tell retryable conditions from terminal ones.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::provider::{ReasoningProvider, ReasoningRequest, ReasoningResponse};
use lineage_core::{LineageError, ReasoningConfig, Result};

pub struct HttpReasoningProvider {
    config: ReasoningConfig,
    api_key: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct WireRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct WireResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<WireChoice>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireResponseMessage,
}

#[derive(Deserialize)]
struct WireResponseMessage {
    content: String,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    total_tokens: Option<u64>,
}

impl HttpReasoningProvider {
    pub fn new(config: ReasoningConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).ok();
        // the per-attempt deadline is enforced by the facade; the client
        // timeout is a backstop slightly above it
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs + 5))
            .build()
            .map_err(|e| LineageError::Internal(format!("http client: {}", e)))?;
        Ok(Self {
            config,
            api_key,
            client,
        })
    }

    fn classify_status(status: StatusCode, body: String) -> LineageError {
        match status {
            StatusCode::TOO_MANY_REQUESTS => LineageError::LlmRateLimited,
            StatusCode::REQUEST_TIMEOUT | StatusCode::GATEWAY_TIMEOUT => {
                LineageError::LlmTimeout(0)
            }
            s if s.is_server_error() => {
                LineageError::LlmTransient(format!("upstream {}: {}", s, body))
            }
            s => LineageError::Internal(format!("reasoning endpoint {}: {}", s, body)),
        }
    }

    fn classify_transport(err: reqwest::Error, timeout_secs: u64) -> LineageError {
        if err.is_timeout() {
            LineageError::LlmTimeout(timeout_secs)
        } else if err.is_connect() || err.is_request() {
            LineageError::LlmTransient(err.to_string())
        } else {
            LineageError::Internal(err.to_string())
        }
    }
}

#[async_trait]
impl ReasoningProvider for HttpReasoningProvider {
    async fn generate(&self, request: &ReasoningRequest) -> Result<ReasoningResponse> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(WireMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(WireMessage {
            role: "user",
            content: &request.prompt,
        });

        let wire = WireRequest {
            model: &self.config.model,
            messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let mut builder = self.client.post(&self.config.endpoint).json(&wire);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| Self::classify_transport(e, self.config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, body));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LineageError::LlmMalformedOutput(e.to_string()))?;
        let content = wire
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LineageError::LlmMalformedOutput("response carried no choices".into()))?;

        Ok(ReasoningResponse {
            content,
            model: wire.model.unwrap_or_else(|| self.config.model.clone()),
            total_tokens: wire.usage.and_then(|u| u.total_tokens),
        })
    }

    fn name(&self) -> &str {
        "http"
    }
}
