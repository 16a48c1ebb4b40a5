use listdigest_common::DigestError;
use thiserror::Error;
use x_client::XError;

/// Pipeline stage a fatal error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Session,
    Fetch,
    Synthesis,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Session => write!(f, "session"),
            Stage::Fetch => write!(f, "fetch"),
            Stage::Synthesis => write!(f, "synthesis"),
        }
    }
}

#[derive(Debug, Error)]
#[error("{stage} stage failed: {source}")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: DigestError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: DigestError) -> Self {
        Self { stage, source }
    }
}

/// Map a gateway failure while working on `subject` into the shared taxonomy.
pub fn classify_x_error(err: &XError, subject: &str) -> DigestError {
    if err.is_rate_limit() {
        DigestError::RateLimited(format!(
            "X rate limit reached fetching {subject}. Please wait 15 minutes and try again."
        ))
    } else if err.is_auth_failure() {
        DigestError::Authentication(format!(
            "X session unauthorized (401) fetching {subject}. Please re-import your session cookies."
        ))
    } else {
        DigestError::Transient(format!("{subject}: {err}"))
    }
}
