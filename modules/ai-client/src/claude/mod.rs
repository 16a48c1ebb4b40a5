mod client;
pub(crate) mod types;

use async_trait::async_trait;

use crate::error::{AiError, Result};
use crate::traits::TextGenerator;
use crate::{GENERATE_TIMEOUT, HEALTH_TIMEOUT};

use client::{ClaudeClient, ANTHROPIC_API_URL};
use types::*;

// =============================================================================
// Claude Generator
// =============================================================================

pub struct Claude {
    model: String,
    client: ClaudeClient,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(AiError::Config("Claude API key is empty".to_string()));
        }
        Ok(Self {
            model: model.into(),
            client: ClaudeClient::new(&api_key, GENERATE_TIMEOUT)?,
        })
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        let url = url.into();
        if !url.is_empty() && url != ANTHROPIC_API_URL {
            self.client = self.client.with_base_url(&url);
        }
        self
    }
}

#[async_trait]
impl TextGenerator for Claude {
    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<()> {
        self.client.list_models(HEALTH_TIMEOUT).await
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let request = ChatRequest::new(&self.model)
            .message(WireMessage::user(prompt))
            .max_tokens(max_tokens);

        let response = self.client.chat(&request).await?;

        response
            .text()
            .ok_or_else(|| AiError::Parse("No text in Claude response".to_string()))
    }
}
