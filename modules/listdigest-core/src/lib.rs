pub mod aggregator;
pub mod error;
pub mod extractor;
pub mod fetcher;
pub mod health;
pub mod id_cache;
pub mod identifier;
pub mod insights;
pub mod memberships;
pub mod pipeline;
pub mod prompt;
pub mod provider;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;
