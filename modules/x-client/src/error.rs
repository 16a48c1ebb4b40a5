use thiserror::Error;

pub type Result<T> = std::result::Result<T, XError>;

#[derive(Debug, Clone, Error)]
pub enum XError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid session credential: {0}")]
    InvalidSession(String),
}

impl XError {
    pub fn status(&self) -> Option<u16> {
        match self {
            XError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Expired or rejected session. Retrying cannot help.
    ///
    /// Only gateway responses are inspected. Transport and decode errors carry
    /// URLs and byte offsets whose digits mean nothing here.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            XError::InvalidSession(_) => true,
            XError::Api { status: 401, .. } => true,
            XError::Api { message, .. } => message.to_lowercase().contains("unauthorized"),
            _ => false,
        }
    }

    /// Account-wide quota exhausted.
    pub fn is_rate_limit(&self) -> bool {
        match self {
            XError::Api { status: 429, .. } => true,
            XError::Api { message, .. } => message.to_lowercase().contains("rate limit"),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for XError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            XError::Timeout(err.to_string())
        } else if err.is_decode() {
            XError::Parse(err.to_string())
        } else {
            XError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for XError {
    fn from(err: serde_json::Error) -> Self {
        XError::Parse(err.to_string())
    }
}
