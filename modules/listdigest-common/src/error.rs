use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigestError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Transient failure: {0}")]
    Transient(String),

    #[error("Context too large: {0}")]
    ContextTooLarge(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl DigestError {
    /// Errors that end the whole run rather than one collection.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            DigestError::Authentication(_) | DigestError::RateLimited(_) | DigestError::Config(_)
        )
    }
}
