use serde::Serialize;
use thiserror::Error;

/// Discriminant used at the HTTP boundary to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidRequest,
    ConfigurationError,
    UpstreamError,
    /// Anything else, such as a body that is not JSON at all.
    Unclassified,
}

#[derive(Debug, Clone, Error)]
pub enum PlanError {
    #[error("{message}")]
    InvalidRequest { message: String },

    #[error("{message}")]
    Configuration { message: String },

    #[error("{message}")]
    Upstream { message: String },

    #[error("{message}")]
    Unclassified { message: String },
}

impl PlanError {
    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn upstream<S: Into<String>>(message: S) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }

    pub fn unclassified<S: Into<String>>(message: S) -> Self {
        Self::Unclassified {
            message: message.into(),
        }
    }

    pub fn required(field: &str) -> Self {
        Self::invalid(format!("{} is required", field))
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidRequest { .. } => ErrorKind::InvalidRequest,
            Self::Configuration { .. } => ErrorKind::ConfigurationError,
            Self::Upstream { .. } => ErrorKind::UpstreamError,
            Self::Unclassified { .. } => ErrorKind::Unclassified,
        }
    }

    pub fn is_client_error(&self) -> bool {
        self.kind() == ErrorKind::InvalidRequest
    }
}
