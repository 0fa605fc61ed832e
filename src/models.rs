use serde::{Deserialize, Serialize};
use std::fmt;

// Structured errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AppErrorType {
    /// Bad user input, rejected before any network call
    Validation,
    /// Missing credentials or unusable settings; fatal
    Configuration,
    Network,
    /// The model did not answer inside the allotted window
    Timeout,
    /// The model answered with a non-success status
    LLM,
    /// The answer could not be recovered as the expected JSON document
    MalformedResponse,
    Storage,
    NotFound,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppError {
    pub error_type: AppErrorType,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl AppError {
    pub fn new(error_type: AppErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_type: AppErrorType,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_type,
            message: message.into(),
            details: Some(details),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(AppErrorType::Validation, message)
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(AppErrorType::Configuration, message)
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(AppErrorType::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(AppErrorType::Timeout, message)
    }

    pub fn llm(message: impl Into<String>) -> Self {
        Self::new(AppErrorType::LLM, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(AppErrorType::MalformedResponse, message)
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(AppErrorType::Storage, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(AppErrorType::NotFound, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(AppErrorType::Unknown, message)
    }

    /// Prepend context to the message, keeping kind and details.
    pub fn prefixed(mut self, prefix: &str) -> Self {
        self.message = format!("{}{}", prefix, self.message);
        self
    }

    /// Failures worth another attempt, malformed answers included.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.error_type,
            AppErrorType::Network
                | AppErrorType::Timeout
                | AppErrorType::LLM
                | AppErrorType::MalformedResponse
        )
    }

    pub fn is_timeout(&self) -> bool {
        self.error_type == AppErrorType::Timeout
    }
}

impl From<String> for AppError {
    fn from(message: String) -> Self {
        AppError::validation(message)
    }
}

impl From<&str> for AppError {
    fn from(message: &str) -> Self {
        AppError::validation(message.to_string())
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::unknown(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::validation(format!("JSON serialization error: {}", err))
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::storage(format!("File system error: {}", err))
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(err: rusqlite::Error) -> Self {
        AppError::storage(format!("Database error: {}", err))
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            AppError::timeout(format!("Model request timed out: {}", err))
        } else {
            AppError::network(format!("Model request failed: {}", err))
        }
    }
}
