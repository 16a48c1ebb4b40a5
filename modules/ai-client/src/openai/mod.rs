mod client;
pub(crate) mod types;

use async_trait::async_trait;

use crate::error::{AiError, Result};
use crate::traits::TextGenerator;
use crate::{GENERATE_TIMEOUT, HEALTH_TIMEOUT};

use client::OpenAiClient;
use types::{ChatRequest, WireMessage};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";

// =============================================================================
// OpenAI-compatible Generator
// =============================================================================

/// Chat-completions backend. Covers OpenAI itself and every server that
/// mirrors its API (Groq, LM Studio, vLLM, generic gateways).
pub struct OpenAi {
    model: String,
    client: OpenAiClient,
}

impl OpenAi {
    /// `api_key` of `None` sends no `Authorization` header, which local
    /// servers accept.
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<&str>,
        model: impl Into<String>,
    ) -> Result<Self> {
        let base_url = base_url.into();
        if base_url.trim().is_empty() {
            return Err(AiError::Config("OpenAI-compatible base URL is empty".to_string()));
        }
        Ok(Self {
            model: model.into(),
            client: OpenAiClient::new(&base_url, api_key, GENERATE_TIMEOUT)?,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAi {
    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<()> {
        self.client.list_models(HEALTH_TIMEOUT).await
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::user(prompt))
            .token_limit(max_tokens);

        self.client
            .chat(&request)
            .await?
            .into_text()
            .ok_or_else(|| AiError::Parse("No content in chat completion".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openai_requires_base_url() {
        let err = OpenAi::new("", None, "gpt-4o-mini").err().unwrap();
        assert!(matches!(err, AiError::Config(_)));
    }

    #[test]
    fn test_openai_model() {
        let ai = OpenAi::new(OPENAI_API_URL, Some("sk-test"), "gpt-4o-mini").unwrap();
        assert_eq!(ai.model(), "gpt-4o-mini");
    }
}
