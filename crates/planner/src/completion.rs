use reqwest::Client;
use serde_json::Value;
use tracing::{instrument, warn};
use wanderplan_core::PlanError;

use crate::config::{CompletionConfig, API_KEY_ENV};

pub const NO_PLAN_FALLBACK: &str = "No plan generated";

/// One-shot chat-completion call against the configured provider.
#[derive(Debug, Clone)]
pub struct CompletionClient {
    http: Client,
    config: CompletionConfig,
}

impl CompletionClient {
    pub fn new(http: Client, config: CompletionConfig) -> Self {
        Self { http, config }
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }

    #[instrument(skip(self, prompt), fields(model = %self.config.model, prompt_len = prompt.len()))]
    pub async fn complete(&self, prompt: &str) -> Result<String, PlanError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or_else(|| PlanError::configuration(format!("{} not configured", API_KEY_ENV)))?;

        let payload = serde_json::json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let response = self
            .http
            .post(self.config.endpoint.as_str())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| PlanError::upstream(format!("completion request failed: {}", error)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlanError::upstream(format!(
                "OpenRouter API error: {} - {}",
                status.as_u16(),
                body
            )));
        }

        let body: Value = response.json().await.map_err(|error| {
            PlanError::upstream(format!("completion response parse failed: {}", error))
        })?;

        Ok(extract_completion_text(&body).unwrap_or_else(|| {
            warn!("completion response carried no message content");
            NO_PLAN_FALLBACK.to_string()
        }))
    }
}

/// `choices[0].message.content`, when present and non-empty.
pub fn extract_completion_text(payload: &Value) -> Option<String> {
    payload
        .get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
        .filter(|text| !text.is_empty())
        .map(str::to_string)
}
