use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::DigestError;

/// Per-provider connection overrides. Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderOptions {
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: Option<String>,
}

impl ProviderOptions {
    pub fn endpoint(&self) -> Option<&str> {
        non_empty(self.endpoint.as_deref())
    }

    pub fn api_key(&self) -> Option<&str> {
        non_empty(self.api_key.as_deref())
    }

    pub fn model(&self) -> Option<&str> {
        non_empty(self.model.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Which summarization backend is active, plus the options for every backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummarizationConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default)]
    pub options: HashMap<String, ProviderOptions>,
}

fn default_provider() -> String {
    "groq".to_string()
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            options: HashMap::new(),
        }
    }
}

impl SummarizationConfig {
    pub fn active_options(&self) -> ProviderOptions {
        self.options_for(&self.provider)
    }

    pub fn options_for(&self, provider: &str) -> ProviderOptions {
        self.options.get(provider).cloned().unwrap_or_default()
    }
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Session
    pub x_auth_token: String,
    pub x_csrf_token: String,
    pub x_api_base_url: Option<String>,

    // Collections
    pub list_urls: Vec<String>,
    pub list_owner: Option<String>,
    pub max_tweets: usize,

    // Identifier cache
    pub cache_dir: PathBuf,

    pub summarization: SummarizationConfig,
}

impl Config {
    pub const DEFAULT_MAX_TWEETS: usize = 100;

    pub fn from_env() -> Result<Self, DigestError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup. `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, DigestError> {
        let optional = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            optional(key).ok_or_else(|| {
                DigestError::Config(format!("{key} environment variable is required"))
            })
        };

        let list_urls: Vec<String> = required("LIST_URLS")?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();
        if list_urls.is_empty() {
            return Err(DigestError::Config(
                "LIST_URLS must name at least one list".to_string(),
            ));
        }

        let max_tweets = match optional("MAX_TWEETS") {
            Some(raw) => raw.parse().map_err(|_| {
                DigestError::Config(format!("MAX_TWEETS must be a number, got {raw:?}"))
            })?,
            None => Self::DEFAULT_MAX_TWEETS,
        };

        let provider = optional("SUMMARY_PROVIDER").unwrap_or_else(default_provider);
        let mut options = HashMap::new();
        options.insert(
            provider.clone(),
            ProviderOptions {
                endpoint: optional("SUMMARY_ENDPOINT"),
                api_key: optional("SUMMARY_API_KEY"),
                model: optional("SUMMARY_MODEL"),
            },
        );

        Ok(Self {
            x_auth_token: required("X_AUTH_TOKEN")?,
            x_csrf_token: required("X_CSRF_TOKEN")?,
            x_api_base_url: optional("X_API_BASE_URL"),
            list_urls,
            list_owner: optional("LIST_OWNER"),
            max_tweets,
            cache_dir: optional("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("cache")),
            summarization: SummarizationConfig { provider, options },
        })
    }

    /// Log the loaded configuration with secrets masked.
    pub fn log_redacted(&self) {
        let active = self.summarization.active_options();
        info!(
            x_auth_token = %redact(&self.x_auth_token),
            x_csrf_token = %redact(&self.x_csrf_token),
            x_api_base_url = self.x_api_base_url.as_deref().unwrap_or("(default)"),
            lists = self.list_urls.len(),
            list_owner = self.list_owner.as_deref().unwrap_or("(none)"),
            max_tweets = self.max_tweets,
            cache_dir = %self.cache_dir.display(),
            provider = self.summarization.provider.as_str(),
            endpoint = active.endpoint().unwrap_or("(default)"),
            api_key = %active.api_key().map(redact).unwrap_or_else(|| "(unset)".to_string()),
            model = active.model().unwrap_or("(default)"),
            "Configuration loaded"
        );
    }
}

fn redact(secret: &str) -> String {
    let visible: String = secret.chars().take(4).collect();
    if secret.chars().count() <= 8 {
        "****".to_string()
    } else {
        format!("{visible}****")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup<'a>(pairs: &'a [(&'a str, &'a str)]) -> impl Fn(&str) -> Option<String> + 'a {
        move |key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        }
    }

    const BASE: &[(&str, &str)] = &[
        ("X_AUTH_TOKEN", "auth"),
        ("X_CSRF_TOKEN", "csrf"),
        ("LIST_URLS", "https://x.com/i/lists/1, 2 ,"),
    ];

    #[test]
    fn defaults_apply() {
        let config = Config::from_lookup(lookup(BASE)).unwrap();
        assert_eq!(config.list_urls, vec!["https://x.com/i/lists/1", "2"]);
        assert_eq!(config.max_tweets, 100);
        assert_eq!(config.cache_dir, PathBuf::from("cache"));
        assert_eq!(config.summarization.provider, "groq");
        assert_eq!(config.summarization.active_options(), ProviderOptions::default());
    }

    #[test]
    fn missing_session_is_a_config_error() {
        let err = Config::from_lookup(lookup(&[("LIST_URLS", "1")])).unwrap_err();
        assert!(matches!(err, DigestError::Config(ref m) if m.contains("X_AUTH_TOKEN")));
    }

    #[test]
    fn bad_max_tweets_is_rejected() {
        let mut pairs = BASE.to_vec();
        pairs.push(("MAX_TWEETS", "lots"));
        assert!(matches!(
            Config::from_lookup(lookup(&pairs)),
            Err(DigestError::Config(_))
        ));
    }

    #[test]
    fn summary_overrides_land_on_the_active_provider() {
        let mut pairs = BASE.to_vec();
        pairs.extend([
            ("SUMMARY_PROVIDER", "ollama"),
            ("SUMMARY_MODEL", "mistral"),
            ("SUMMARY_API_KEY", "  "),
        ]);
        let config = Config::from_lookup(lookup(&pairs)).unwrap();
        let opts = config.summarization.active_options();
        assert_eq!(opts.model(), Some("mistral"));
        assert_eq!(opts.api_key(), None);
    }

    #[test]
    fn empty_strings_count_as_unset() {
        let opts: SummarizationConfig = serde_json::from_str(
            r#"{"provider":"claude","options":{"claude":{"endpoint":"","api_key":"sk-ant"}}}"#,
        )
        .unwrap();
        let claude = opts.active_options();
        assert_eq!(claude.endpoint(), None);
        assert_eq!(claude.api_key(), Some("sk-ant"));
        assert_eq!(opts.options_for("groq"), ProviderOptions::default());
    }

    #[test]
    fn redact_masks_secrets() {
        assert_eq!(redact("short"), "****");
        assert_eq!(redact("gsk_abcdefghij"), "gsk_****");
    }
}
