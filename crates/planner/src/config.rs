use std::env;
use std::fmt;

pub const COMPLETION_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_COMPLETION_MODEL: &str = "openai/gpt-4o-mini";

pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
pub const MODEL_ENV: &str = "OPENROUTER_MODEL";

/// Completion provider settings, read once at startup.
#[derive(Clone)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
}

impl CompletionConfig {
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|value| !value.trim().is_empty()),
            model: DEFAULT_COMPLETION_MODEL.to_string(),
            endpoint: COMPLETION_ENDPOINT.to_string(),
        }
    }

    pub fn from_env() -> Self {
        let model = env::var(MODEL_ENV)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_COMPLETION_MODEL.to_string());

        Self::new(env::var(API_KEY_ENV).ok()).with_model(model)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

impl fmt::Debug for CompletionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompletionConfig")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}
