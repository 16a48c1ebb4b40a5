//! Summarization backends behind one contract.
//!
//! A [`Provider`] turns configuration into a [`Connection`] and a
//! [`TextGenerator`]. The [`ProviderRegistry`] maps identifiers to providers so
//! adding a backend is one registration. [`Summarizer`] is the caller-facing
//! surface: `verify` for a cheap status and `synthesize` for the narrative.

pub mod backends;
pub mod resilience;

use std::collections::HashMap;
use std::sync::Arc;

use ai_client::{truncate_chars, AiError, TextGenerator, HEALTH_TIMEOUT};
use listdigest_common::{AggregationResult, DigestError, ProviderOptions, SummarizationConfig};
use tracing::{info, warn};

use crate::health::{HealthCache, Status};
use crate::prompt::{build_prompt, PromptBudget};
use resilience::{classify, with_rate_limit_retry, FailureKind, RetrySchedule};

/// Token allowance for one synthesis call.
pub const MAX_TOKENS: u32 = 2000;

/// Every failure string returned by [`Summarizer::synthesize`] starts with this.
pub const FAILURE_MARKER: &str = "Error";

pub fn is_failure(summary: &str) -> bool {
    summary.starts_with(FAILURE_MARKER)
}

/// Effective connection parameters after defaults are applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connection {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
}

pub trait Provider: Send + Sync {
    fn id(&self) -> &str;

    /// Human-readable name used in messages.
    fn label(&self) -> &str;

    fn requires_credential(&self) -> bool;

    fn resolve(&self, options: &ProviderOptions) -> Connection;

    fn retry_schedule(&self) -> RetrySchedule {
        RetrySchedule::default()
    }

    fn prompt_budget(&self) -> PromptBudget {
        PromptBudget::default()
    }

    fn generator(&self, connection: &Connection) -> ai_client::Result<Arc<dyn TextGenerator>>;
}

#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        for backend in backends::defaults() {
            registry.register(backend);
        }
        registry
    }

    /// Register `provider`, replacing any provider with the same id.
    pub fn register(&mut self, provider: impl Provider + 'static) {
        self.providers
            .insert(provider.id().to_string(), Arc::new(provider));
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn Provider>> {
        self.providers.get(id).cloned()
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

pub struct Summarizer {
    provider: Arc<dyn Provider>,
    connection: Connection,
    /// Absent when a required credential is missing.
    generator: Option<Arc<dyn TextGenerator>>,
}

impl Summarizer {
    /// Unknown provider ids fail here, before any network call.
    pub fn from_config(
        registry: &ProviderRegistry,
        config: &SummarizationConfig,
    ) -> Result<Self, DigestError> {
        let provider = registry.get(&config.provider).ok_or_else(|| {
            DigestError::Config(format!(
                "Unknown summarization provider '{}'. Known providers: {}",
                config.provider,
                registry.ids().join(", ")
            ))
        })?;
        Self::new(provider, &config.active_options())
    }

    pub fn new(
        provider: Arc<dyn Provider>,
        options: &ProviderOptions,
    ) -> Result<Self, DigestError> {
        let connection = provider.resolve(options);
        let generator = if provider.requires_credential() && connection.api_key.is_none() {
            None
        } else {
            Some(provider.generator(&connection).map_err(|e| {
                DigestError::Config(format!("{}: {e}", provider.label()))
            })?)
        };
        Ok(Self {
            provider,
            connection,
            generator,
        })
    }

    /// Config error when a required credential is missing.
    pub fn ensure_configured(&self) -> Result<(), DigestError> {
        if self.generator.is_none() {
            return Err(DigestError::Config(format!(
                "{} API key not configured",
                self.provider.label()
            )));
        }
        Ok(())
    }

    pub fn provider_id(&self) -> &str {
        self.provider.id()
    }

    pub fn model(&self) -> &str {
        &self.connection.model
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    /// "Groq · llama-3.3-70b-versatile"
    pub fn display_name(&self) -> String {
        format!("{} \u{b7} {}", self.provider.label(), self.connection.model)
    }

    /// Cheapest call that proves connectivity and credential validity.
    pub async fn verify(&self) -> Status {
        let Some(ref generator) = self.generator else {
            return Status::inactive("Missing API Key");
        };
        let model = self.connection.model.as_str();
        match tokio::time::timeout(HEALTH_TIMEOUT, generator.health_check()).await {
            Ok(Ok(())) => Status::active(format!("Ready ({model})")),
            Ok(Err(e)) => {
                warn!(provider = self.provider.id(), error = %e, "Provider health check failed");
                Status::inactive(verify_message(&e, model))
            }
            Err(_) => Status::inactive(format!(
                "Connection failed: health check timed out after {}s...",
                HEALTH_TIMEOUT.as_secs()
            )),
        }
    }

    /// [`verify`](Self::verify) through a caller-owned cache keyed by provider,
    /// endpoint and model.
    pub async fn verify_cached(&self, cache: &HealthCache<Status>) -> Status {
        cache.get_or_check(&self.cache_key(), || self.verify()).await
    }

    pub fn cache_key(&self) -> String {
        format!(
            "provider:{}|{}|{}",
            self.provider.id(),
            self.connection.endpoint,
            self.connection.model
        )
    }

    /// Narrative for `aggregation`, or a failure string starting with
    /// [`FAILURE_MARKER`]. Never returns an empty success.
    pub async fn synthesize(&self, aggregation: &AggregationResult) -> String {
        let label = self.provider.label();
        let Some(ref generator) = self.generator else {
            return format!(
                "Error: {label} API key not configured. Please add your API key to the summarization settings."
            );
        };

        let prompt = build_prompt(aggregation, &self.provider.prompt_budget());
        let schedule = self.provider.retry_schedule();
        info!(
            provider = self.provider.id(),
            model = self.connection.model.as_str(),
            prompt_chars = prompt.chars().count(),
            "Requesting summary"
        );

        let result = with_rate_limit_retry(&schedule, self.provider.id(), || {
            generator.generate(&prompt, MAX_TOKENS)
        })
        .await;

        match result {
            Ok(text) if !text.trim().is_empty() => text,
            Ok(_) => format!(
                "Error with {label}: model {} returned an empty summary.",
                self.connection.model
            ),
            Err(e) => {
                warn!(provider = self.provider.id(), error = %e, "Summary generation failed");
                synthesis_failure(label, &e)
            }
        }
    }
}

fn verify_message(err: &AiError, model: &str) -> String {
    let text = err.to_string();
    let lowered = text.to_lowercase();
    match classify(err) {
        FailureKind::Auth => "Invalid API Key".to_string(),
        _ if err.status() == Some(404) || lowered.contains("model_not_found") => {
            format!("Model {model} not found")
        }
        FailureKind::RateLimited { .. } => "Rate limited (429)".to_string(),
        _ => format!("Connection failed: {}...", truncate_chars(&text, 50)),
    }
}

fn synthesis_failure(label: &str, err: &AiError) -> String {
    match classify(err) {
        FailureKind::Auth => format!(
            "Error with {label}: Invalid API key. Please check the key in your summarization settings."
        ),
        FailureKind::RateLimited { .. } => format!(
            "Error with {label}: Rate limited. Please wait a minute or use a smaller list."
        ),
        FailureKind::ContextTooLarge => format!(
            "Error with {label}: Prompt too large for this model's context window. Try fewer lists or a lower tweet count."
        ),
        FailureKind::Other => format!(
            "Error with {label}: {}\n\nPlease check your settings and connection.",
            truncate_chars(&err.to_string(), 300)
        ),
    }
}
