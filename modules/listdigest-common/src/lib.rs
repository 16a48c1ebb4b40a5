pub mod config;
pub mod error;
pub mod types;

pub use config::{Config, ProviderOptions, SummarizationConfig};
pub use error::DigestError;
pub use types::*;
