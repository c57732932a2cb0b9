//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("{}", upstream_message(.status, .code, .message))]
    Upstream {
        status: u16,
        code: Option<String>,
        message: Option<String>,
    },

    #[error("Unsupported model: {0}")]
    UnsupportedModel(String),

    #[error("Unknown task status: {0}")]
    UnknownStatus(String),

    #[error("Task status response has no output: {0}")]
    MissingOutput(String),

    #[error("Task did not finish after {attempts} attempts, please try again later")]
    Timeout { attempts: u32 },

    #[error("{0}")]
    TaskFailed(String),

    #[error("No task id in task creation response")]
    MissingTaskId,

    #[error("No artifacts in response: {0}")]
    NoArtifacts(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether a failed status lookup may succeed if repeated.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::Http(_)
                | Error::Upstream { .. }
                | Error::Serialization(_)
                | Error::MissingOutput(_)
        )
    }
}

fn upstream_message(status: &u16, code: &Option<String>, message: &Option<String>) -> String {
    match (code, message) {
        (Some(code), Some(message)) => {
            format!("Upstream API error (status {}): {}: {}", status, code, message)
        }
        (Some(code), None) => format!("Upstream API error (status {}): {}", status, code),
        (None, Some(message)) => format!("Upstream API error (status {}): {}", status, message),
        (None, None) => format!("Upstream API error (status {})", status),
    }
}

pub type Result<T> = std::result::Result<T, Error>;
