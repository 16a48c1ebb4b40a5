pub mod claude;
pub mod error;
mod http;
pub mod local;
pub mod ollama;
pub mod openai;
pub mod traits;
pub mod util;

use std::time::Duration;

pub use claude::Claude;
pub use error::{AiError, Result};
pub use local::{KoboldAi, LlamaCpp, TextGenWebUi};
pub use ollama::Ollama;
pub use openai::OpenAi;
pub use traits::TextGenerator;
pub use util::{join_url, truncate_chars};

/// Ceiling for one generation call. Large summaries on hosted backends are slow.
pub const GENERATE_TIMEOUT: Duration = Duration::from_secs(180);

/// Ceiling for a health check.
pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);
