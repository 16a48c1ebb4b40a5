use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error (status {status}): {message}")]
    Api {
        status: u16,
        message: String,
        retry_after: Option<Duration>,
    },

    #[error("Parse error: {0}")]
    Parse(String),
}

impl AiError {
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        AiError::Api {
            status,
            message: message.into(),
            retry_after: None,
        }
    }

    /// HTTP status code, when the failure came from a non-success response.
    pub fn status(&self) -> Option<u16> {
        match self {
            AiError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Server-provided `Retry-After` delay, if one was sent.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            AiError::Api { retry_after, .. } => *retry_after,
            _ => None,
        }
    }

    /// Build an `Api` error from a non-success response, consuming the body.
    pub(crate) async fn from_response(response: reqwest::Response) -> Self {
        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<f64>().ok())
            .filter(|secs| secs.is_finite() && *secs >= 0.0)
            .map(Duration::from_secs_f64);
        let message = response.text().await.unwrap_or_default();
        AiError::Api {
            status,
            message,
            retry_after,
        }
    }
}

impl From<reqwest::Error> for AiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            AiError::Timeout(e.to_string())
        } else if e.is_decode() {
            AiError::Parse(e.to_string())
        } else {
            AiError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for AiError {
    fn from(e: serde_json::Error) -> Self {
        AiError::Parse(e.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for AiError {
    fn from(e: reqwest::header::InvalidHeaderValue) -> Self {
        AiError::Config(format!("invalid header value: {e}"))
    }
}
