//! OpenAI-compatible chat completions backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{DigestRequest, Digester, usable_digest};
use crate::errors::DigestError;
use crate::tutor_config::DigestSettings;

/// Digester backed by `POST {endpoint}/chat/completions`.
#[derive(Debug, Clone)]
pub struct HttpDigester {
    client: reqwest::Client,
    url: String,
    model: String,
    api_key: Option<String>,
    temperature: f32,
    timeout_secs: u64,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl HttpDigester {
    /// Build a digester from resolved settings.
    pub fn new(settings: &DigestSettings) -> Result<Self, DigestError> {
        if settings.endpoint.trim().is_empty() {
            return Err(DigestError::NotConfigured("digest.endpoint is empty".into()));
        }
        if settings.model.trim().is_empty() {
            return Err(DigestError::NotConfigured("digest.model is empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(DigestError::Request)?;

        Ok(Self {
            client,
            url: format!("{}/chat/completions", settings.endpoint.trim_end_matches('/')),
            model: settings.model.clone(),
            api_key: settings.api_key.clone(),
            temperature: settings.temperature,
            timeout_secs: settings.timeout_secs,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Digester for HttpDigester {
    async fn digest(&self, request: &DigestRequest) -> Result<String, DigestError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.instruction,
                },
                ChatMessage {
                    role: "user",
                    content: &request.text,
                },
            ],
            temperature: self.temperature,
        };

        debug!(url = %self.url, model = %self.model, chars = request.text.len(), "Sending digest request");

        let mut builder = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let resp = builder.send().await.map_err(|e| self.classify(e))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Digest endpoint returned error status");
            return Err(DigestError::Status {
                status: status.as_u16(),
                body: body.chars().take(500).collect(),
            });
        }

        let parsed: ChatResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                DigestError::Timeout {
                    secs: self.timeout_secs,
                }
            } else {
                DigestError::Malformed(e.to_string())
            }
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(DigestError::EmptyDigest)?;

        usable_digest(&content)
    }
}

impl HttpDigester {
    fn classify(&self, err: reqwest::Error) -> DigestError {
        if err.is_timeout() {
            DigestError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            DigestError::Request(err)
        }
    }
}
