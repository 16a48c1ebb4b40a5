use async_trait::async_trait;

use crate::error::Result;

/// One remote text-generation backend.
///
/// Implementations make exactly one HTTP round trip per call and never retry;
/// retry policy belongs to the caller, which sees the raw [`crate::AiError`].
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Model name sent with every request.
    fn model(&self) -> &str;

    /// Cheapest call that proves the endpoint is reachable and the
    /// credential is accepted.
    async fn health_check(&self) -> Result<()>;

    /// Generate a completion for a single user prompt.
    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String>;
}
