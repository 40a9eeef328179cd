use std::env;

use wanderplan_planner::CompletionConfig;

const DEFAULT_BIND: &str = "0.0.0.0:8080";
const DEFAULT_SERVICE_KEY: &str = "dev-wanderplan-key";
const DEFAULT_ALLOWED_ORIGINS: [&str; 2] = ["http://localhost:5173", "http://127.0.0.1:5173"];

/// Server settings collected from the environment once at startup.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind: String,
    pub database_url: Option<String>,
    pub service_key: String,
    pub allowed_origins: Vec<String>,
    pub completion: CompletionConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            database_url: None,
            service_key: DEFAULT_SERVICE_KEY.to_string(),
            allowed_origins: default_allowed_origins(),
            completion: CompletionConfig::new(None),
        }
    }
}

impl ApiConfig {
    pub fn from_env() -> Self {
        Self {
            bind: non_empty_var("WANDERPLAN_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string()),
            database_url: non_empty_var("WANDERPLAN_DATABASE_URL"),
            service_key: non_empty_var("WANDERPLAN_SERVICE_KEY")
                .unwrap_or_else(|| DEFAULT_SERVICE_KEY.to_string()),
            allowed_origins: non_empty_var("WANDERPLAN_ALLOWED_ORIGINS")
                .map(|value| parse_allowed_origins(&value))
                .filter(|origins| !origins.is_empty())
                .unwrap_or_else(default_allowed_origins),
            completion: CompletionConfig::from_env(),
        }
    }

    pub fn with_completion(mut self, completion: CompletionConfig) -> Self {
        self.completion = completion;
        self
    }
}

pub fn parse_allowed_origins(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|origin| origin.trim().trim_end_matches('/').to_string())
        .filter(|origin| !origin.is_empty())
        .collect()
}

fn default_allowed_origins() -> Vec<String> {
    DEFAULT_ALLOWED_ORIGINS
        .iter()
        .map(|origin| origin.to_string())
        .collect()
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
