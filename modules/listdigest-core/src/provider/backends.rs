use std::sync::Arc;
use std::time::Duration;

use ai_client::{Claude, KoboldAi, LlamaCpp, Ollama, OpenAi, TextGenWebUi, TextGenerator};
use listdigest_common::ProviderOptions;

use super::resilience::RetrySchedule;
use super::{Connection, Provider};
use crate::prompt::PromptBudget;

const LOCAL_MODEL: &str = "local-model";

/// Wire protocol a backend speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Api {
    Ollama,
    Claude,
    OpenAi,
    LlamaCpp,
    KoboldAi,
    TextGenWebUi,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndpointRule {
    /// User endpoint if set, else this default.
    Configurable(&'static str),
    /// Always this endpoint, whatever is configured.
    Fixed(&'static str),
    /// Like `Configurable`, but an endpoint containing `replaces` is also overridden.
    Redirect {
        default: &'static str,
        replaces: &'static str,
    },
}

/// A registered backend described by its defaults.
#[derive(Debug, Clone)]
pub struct Backend {
    id: &'static str,
    label: &'static str,
    api: Api,
    endpoint: EndpointRule,
    default_model: &'static str,
    requires_credential: bool,
    retry: RetrySchedule,
    budget: PromptBudget,
}

impl Backend {
    fn new(id: &'static str, label: &'static str, api: Api, endpoint: EndpointRule) -> Self {
        Self {
            id,
            label,
            api,
            endpoint,
            default_model: LOCAL_MODEL,
            requires_credential: false,
            retry: RetrySchedule::default(),
            budget: PromptBudget::default(),
        }
    }

    fn model(mut self, model: &'static str) -> Self {
        self.default_model = model;
        self
    }

    fn credential_required(mut self) -> Self {
        self.requires_credential = true;
        self
    }

    fn retry(mut self, retry: RetrySchedule) -> Self {
        self.retry = retry;
        self
    }

    fn budget(mut self, budget: PromptBudget) -> Self {
        self.budget = budget;
        self
    }
}

/// Every backend available without extra registration.
pub fn defaults() -> Vec<Backend> {
    use EndpointRule::*;

    let openai_compatible = |id: &'static str, label: &'static str, default: &'static str| {
        Backend::new(id, label, Api::OpenAi, Configurable(default))
    };

    vec![
        Backend::new(
            "ollama",
            "Ollama",
            Api::Ollama,
            Configurable(ai_client::ollama::OLLAMA_DEFAULT_URL),
        )
        .model("llama3"),
        Backend::new("claude", "Claude", Api::Claude, Configurable("https://api.anthropic.com/v1"))
            .model("claude-3-5-sonnet-20240620")
            .credential_required(),
        Backend::new("openai", "OpenAI", Api::OpenAi, Fixed(ai_client::openai::OPENAI_API_URL))
            .model("gpt-4o-mini")
            .credential_required(),
        Backend::new(
            "groq",
            "Groq",
            Api::OpenAi,
            Redirect {
                default: "https://api.groq.com/openai/v1",
                replaces: "api.openai.com",
            },
        )
        .model("llama-3.3-70b-versatile")
        .credential_required()
        .retry(RetrySchedule::new(vec![
            Duration::from_secs(10),
            Duration::from_secs(30),
        ]))
        .budget(PromptBudget::tight()),
        openai_compatible("lmstudio", "LM Studio", "http://localhost:1234/v1"),
        openai_compatible("vllm", "vLLM", "http://localhost:8000/v1"),
        openai_compatible("generic_openai", "OpenAI-compatible", "http://localhost:8000/v1"),
        Backend::new("llamacpp", "llama.cpp", Api::LlamaCpp, Configurable("http://localhost:8080")),
        Backend::new("koboldai", "KoboldAI", Api::KoboldAi, Configurable("http://localhost:5001")),
        Backend::new(
            "textgenwebui",
            "Text Generation WebUI",
            Api::TextGenWebUi,
            Configurable("http://localhost:5000"),
        ),
    ]
}

impl Provider for Backend {
    fn id(&self) -> &str {
        self.id
    }

    fn label(&self) -> &str {
        self.label
    }

    fn requires_credential(&self) -> bool {
        self.requires_credential
    }

    fn resolve(&self, options: &ProviderOptions) -> Connection {
        let endpoint = match self.endpoint {
            EndpointRule::Fixed(url) => url,
            EndpointRule::Configurable(default) => options.endpoint().unwrap_or(default),
            EndpointRule::Redirect { default, replaces } => match options.endpoint() {
                Some(url) if !url.contains(replaces) => url,
                _ => default,
            },
        };
        Connection {
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key: options.api_key().map(String::from),
            model: options.model().unwrap_or(self.default_model).to_string(),
        }
    }

    fn retry_schedule(&self) -> RetrySchedule {
        self.retry.clone()
    }

    fn prompt_budget(&self) -> PromptBudget {
        self.budget
    }

    fn generator(&self, conn: &Connection) -> ai_client::Result<Arc<dyn TextGenerator>> {
        let endpoint = conn.endpoint.as_str();
        let model = conn.model.as_str();
        let generator: Arc<dyn TextGenerator> = match self.api {
            Api::Ollama => Arc::new(Ollama::new(endpoint, model)?),
            Api::Claude => Arc::new(
                Claude::new(conn.api_key.as_deref().unwrap_or_default(), model)?
                    .with_base_url(endpoint),
            ),
            Api::OpenAi => Arc::new(OpenAi::new(endpoint, conn.api_key.as_deref(), model)?),
            Api::LlamaCpp => Arc::new(LlamaCpp::new(endpoint, model)?),
            Api::KoboldAi => Arc::new(KoboldAi::new(endpoint, model)?),
            Api::TextGenWebUi => Arc::new(TextGenWebUi::new(endpoint, model)?),
        };
        Ok(generator)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(id: &str) -> Backend {
        defaults().into_iter().find(|b| b.id == id).unwrap()
    }

    fn opts(endpoint: Option<&str>, model: Option<&str>) -> ProviderOptions {
        ProviderOptions {
            endpoint: endpoint.map(String::from),
            api_key: None,
            model: model.map(String::from),
        }
    }

    #[test]
    fn local_backends_fall_back_to_local_defaults() {
        let conn = backend("lmstudio").resolve(&ProviderOptions::default());
        assert_eq!(conn.endpoint, "http://localhost:1234/v1");
        assert_eq!(conn.model, "local-model");

        assert_eq!(backend("vllm").resolve(&opts(None, None)).endpoint, "http://localhost:8000/v1");
        assert_eq!(
            backend("llamacpp").resolve(&opts(None, None)).endpoint,
            "http://localhost:8080"
        );
        assert_eq!(backend("ollama").resolve(&opts(None, None)).model, "llama3");
    }

    #[test]
    fn openai_endpoint_is_fixed() {
        let conn = backend("openai").resolve(&opts(Some("http://proxy.local/v1"), None));
        assert_eq!(conn.endpoint, "https://api.openai.com/v1");
        assert_eq!(conn.model, "gpt-4o-mini");
    }

    #[test]
    fn groq_replaces_openai_endpoint() {
        let groq = backend("groq");
        assert_eq!(
            groq.resolve(&opts(Some("https://api.openai.com/v1"), None)).endpoint,
            "https://api.groq.com/openai/v1"
        );
        assert_eq!(
            groq.resolve(&opts(Some(""), None)).endpoint,
            "https://api.groq.com/openai/v1"
        );
        assert_eq!(
            groq.resolve(&opts(Some("https://gateway.example/groq/"), None)).endpoint,
            "https://gateway.example/groq"
        );
        assert_eq!(groq.retry_schedule().delay_after(0), Some(Duration::from_secs(10)));
        assert_eq!(groq.prompt_budget().max_chars, 12_000);
    }

    #[test]
    fn configured_model_wins() {
        let conn = backend("claude").resolve(&opts(None, Some("claude-3-haiku-20240307")));
        assert_eq!(conn.model, "claude-3-haiku-20240307");
        assert_eq!(conn.endpoint, "https://api.anthropic.com/v1");
    }

    #[test]
    fn hosted_backends_require_credentials() {
        for id in ["claude", "openai", "groq"] {
            assert!(backend(id).requires_credential(), "{id}");
        }
        for id in [
            "ollama",
            "lmstudio",
            "vllm",
            "generic_openai",
            "llamacpp",
            "koboldai",
            "textgenwebui",
        ] {
            assert!(!backend(id).requires_credential(), "{id}");
        }
    }
}
