use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::debug;

use super::types::*;
use crate::error::{AiError, Result};
use crate::util::join_url;

pub(crate) struct OpenAiClient {
    api_key: Option<String>,
    http: reqwest::Client,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(base_url: &str, api_key: Option<&str>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            api_key: api_key.map(str::to_string),
            http,
            base_url: base_url.to_string(),
        })
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(ref key) = self.api_key {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", key))?,
            );
        }
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }

    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = join_url(&self.base_url, "chat/completions");

        debug!(model = %request.model, base_url = %self.base_url, "OpenAI-compatible chat request");

        let response = self
            .http
            .post(&url)
            .headers(self.headers()?)
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::from_response(response).await);
        }

        Ok(response.json().await?)
    }

    pub async fn list_models(&self, timeout: Duration) -> Result<()> {
        let url = join_url(&self.base_url, "models");

        let response = self
            .http
            .get(&url)
            .headers(self.headers()?)
            .timeout(timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(AiError::from_response(response).await);
        }
        Ok(())
    }
}
