//! Minimal chat-completion client shared by the AI-backed providers.

use super::{http_client, read_success_body};
use crate::errors::EnrichmentError;
use crate::retry::RetryPolicy;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Text of the first choice plus reported token usage.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatCompletion {
    pub content: String,
    pub total_tokens: Option<u64>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
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

#[derive(Deserialize)]
struct Usage {
    total_tokens: Option<u64>,
}

pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    settings: ChatSettings,
    retry: RetryPolicy,
    label: &'static str,
}

impl ChatClient {
    pub fn new(
        label: &'static str,
        api_key: &str,
        settings: ChatSettings,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Result<Self, EnrichmentError> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.to_string(),
            settings,
            retry,
            label,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    /// Sends one system + user exchange, retrying transport and status failures.
    ///
    /// A 2xx body that is not a chat-completion document is a `Parse` error and
    /// is not retried. A document without choices yields empty content.
    pub async fn complete(&self, system: &str, user: &str) -> Result<ChatCompletion, EnrichmentError> {
        let body = self
            .retry
            .run(self.label, move || self.send_once(system, user))
            .await?;

        let parsed: ChatResponse = serde_json::from_str(&body).map_err(|e| {
            EnrichmentError::Parse(format!("{} returned an invalid completion: {}", self.label, e))
        })?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        Ok(ChatCompletion {
            content,
            total_tokens: parsed.usage.and_then(|u| u.total_tokens),
        })
    }

    async fn send_once(&self, system: &str, user: &str) -> Result<String, EnrichmentError> {
        let body = json!({
            "model": self.settings.model,
            "messages": [
                {"role": "system", "content": system},
                {"role": "user", "content": user}
            ],
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
        });

        tracing::debug!(
            "{}: POST {} (model: {})",
            self.label,
            self.settings.endpoint,
            self.settings.model
        );

        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        read_success_body(response, self.label).await
    }
}
