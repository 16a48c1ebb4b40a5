use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{AiError, Result};
use crate::http;
use crate::traits::TextGenerator;
use crate::util::join_url;
use crate::{GENERATE_TIMEOUT, HEALTH_TIMEOUT};

pub const OLLAMA_DEFAULT_URL: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<LocalModel>,
}

#[derive(Debug, Deserialize)]
struct LocalModel {
    name: String,
}

/// Ollama's native API (`/api/generate`, `/api/tags`).
pub struct Ollama {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl Ollama {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            http: http::client(GENERATE_TIMEOUT)?,
        })
    }
}

/// `llama3` matches a pulled `llama3:latest`; an explicit tag must match exactly.
fn model_is_pulled(pulled: &str, wanted: &str) -> bool {
    if pulled == wanted {
        return true;
    }
    !wanted.contains(':') && pulled.split(':').next() == Some(wanted)
}

#[async_trait]
impl TextGenerator for Ollama {
    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<()> {
        let url = join_url(&self.base_url, "api/tags");
        let tags: TagsResponse = http::get_json(&self.http, &url, HEALTH_TIMEOUT).await?;

        if tags.models.iter().any(|m| model_is_pulled(&m.name, &self.model)) {
            Ok(())
        } else {
            Err(AiError::api(
                404,
                format!("model '{}' not found, try pulling it first", self.model),
            ))
        }
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let url = join_url(&self.base_url, "api/generate");
        debug!(model = %self.model, "Ollama generate request");

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: GenerateOptions {
                num_predict: max_tokens,
            },
        };
        let response: GenerateResponse = http::post_json(&self.http, &url, &request).await?;

        if response.response.trim().is_empty() {
            return Err(AiError::Parse("Ollama returned an empty response".to_string()));
        }
        Ok(response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn untagged_model_matches_latest() {
        assert!(model_is_pulled("llama3:latest", "llama3"));
        assert!(model_is_pulled("llama3:8b", "llama3:8b"));
        assert!(!model_is_pulled("llama3:8b", "llama3:70b"));
        assert!(!model_is_pulled("mistral:latest", "llama3"));
    }
}
