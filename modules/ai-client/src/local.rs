// Self-hosted servers with their own (non-OpenAI) completion APIs:
// llama.cpp server, KoboldAI, and Text Generation WebUI's legacy API.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::error::{AiError, Result};
use crate::http;
use crate::traits::TextGenerator;
use crate::util::join_url;
use crate::{GENERATE_TIMEOUT, HEALTH_TIMEOUT};

const TEMPERATURE: f32 = 0.7;

fn non_empty(text: String, backend: &str) -> Result<String> {
    if text.trim().is_empty() {
        Err(AiError::Parse(format!("{backend} returned an empty completion")))
    } else {
        Ok(text)
    }
}

// =============================================================================
// llama.cpp
// =============================================================================

#[derive(Debug, Deserialize)]
struct LlamaCppCompletion {
    #[serde(default)]
    content: String,
}

pub struct LlamaCpp {
    base_url: String,
    model: String,
    http: reqwest::Client,
}

impl LlamaCpp {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            base_url: base_url.into(),
            model: model.into(),
            http: http::client(GENERATE_TIMEOUT)?,
        })
    }
}

#[async_trait]
impl TextGenerator for LlamaCpp {
    fn model(&self) -> &str {
        &self.model
    }

    async fn health_check(&self) -> Result<()> {
        http::get_ok(&self.http, &join_url(&self.base_url, "health"), HEALTH_TIMEOUT).await
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = json!({
            "prompt": prompt,
            "n_predict": max_tokens,
            "temperature": TEMPERATURE,
        });
        let completion: LlamaCppCompletion =
            http::post_json(&self.http, &join_url(&self.base_url, "completion"), &body).await?;
        non_empty(completion.content, "llama.cpp")
    }
}

// =============================================================================
// KoboldAI / Text Generation WebUI
// =============================================================================

#[derive(Debug, Deserialize)]
struct LegacyGenerateResponse {
    #[serde(default)]
    results: Vec<LegacyResult>,
}

#[derive(Debug, Deserialize)]
struct LegacyResult {
    #[serde(default)]
    text: String,
}

impl LegacyGenerateResponse {
    fn first_text(self) -> String {
        self.results.into_iter().next().map(|r| r.text).unwrap_or_default()
    }
}

/// Which flavor of the `/api/v1/generate` contract to speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LegacyDialect {
    Kobold,
    TextGen,
}

struct LegacyApi {
    base_url: String,
    model: String,
    dialect: LegacyDialect,
    http: reqwest::Client,
}

impl LegacyApi {
    fn new(base_url: String, model: String, dialect: LegacyDialect) -> Result<Self> {
        Ok(Self {
            base_url,
            model,
            dialect,
            http: http::client(GENERATE_TIMEOUT)?,
        })
    }

    fn label(&self) -> &'static str {
        match self.dialect {
            LegacyDialect::Kobold => "KoboldAI",
            LegacyDialect::TextGen => "Text Generation WebUI",
        }
    }

    async fn health_check(&self) -> Result<()> {
        http::get_ok(&self.http, &join_url(&self.base_url, "api/v1/model"), HEALTH_TIMEOUT).await
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        let body = match self.dialect {
            LegacyDialect::Kobold => json!({
                "prompt": prompt,
                "max_length": max_tokens,
                "temperature": TEMPERATURE,
            }),
            LegacyDialect::TextGen => json!({
                "prompt": prompt,
                "max_tokens": max_tokens,
            }),
        };
        let response: LegacyGenerateResponse =
            http::post_json(&self.http, &join_url(&self.base_url, "api/v1/generate"), &body)
                .await?;
        non_empty(response.first_text(), self.label())
    }
}

pub struct KoboldAi(LegacyApi);

impl KoboldAi {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        LegacyApi::new(base_url.into(), model.into(), LegacyDialect::Kobold).map(Self)
    }
}

pub struct TextGenWebUi(LegacyApi);

impl TextGenWebUi {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        LegacyApi::new(base_url.into(), model.into(), LegacyDialect::TextGen).map(Self)
    }
}

#[async_trait]
impl TextGenerator for KoboldAi {
    fn model(&self) -> &str {
        &self.0.model
    }

    async fn health_check(&self) -> Result<()> {
        self.0.health_check().await
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        self.0.generate(prompt, max_tokens).await
    }
}

#[async_trait]
impl TextGenerator for TextGenWebUi {
    fn model(&self) -> &str {
        &self.0.model
    }

    async fn health_check(&self) -> Result<()> {
        self.0.health_check().await
    }

    async fn generate(&self, prompt: &str, max_tokens: u32) -> Result<String> {
        self.0.generate(prompt, max_tokens).await
    }
}
