use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use listdigest_common::Config;
use listdigest_core::health::HealthCache;
use listdigest_core::id_cache::IdentifierCache;
use listdigest_core::memberships::memberships;
use listdigest_core::pipeline::Digest;
use listdigest_core::provider::{ProviderRegistry, Summarizer};
use listdigest_core::session::verify_session_cached;
use x_client::{XClient, XSession};

#[derive(Parser, Debug)]
#[command(name = "listdigest", about = "Summarize what your X lists are sharing")]
struct Args {
    /// Per-list post target. Overrides MAX_TWEETS.
    #[arg(long)]
    max_tweets: Option<usize>,

    /// Check the session and summarization backend, then exit.
    #[arg(long)]
    verify: bool,

    /// Print the lists this handle is a member of, then exit.
    #[arg(long, value_name = "HANDLE")]
    memberships: Option<String>,

    /// Print the full report as JSON instead of the summary text.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("listdigest=info".parse()?))
        .init();

    let args = Args::parse();

    let config = Config::from_env()?;
    config.log_redacted();

    let mut client = XClient::new(XSession {
        auth_token: config.x_auth_token.clone(),
        csrf_token: config.x_csrf_token.clone(),
        bearer_token: None,
    })?;
    if let Some(ref base) = config.x_api_base_url {
        client = client.with_base_url(base.as_str());
    }
    let source = Arc::new(client);
    let cache = Arc::new(IdentifierCache::load(&config.cache_dir));

    if let Some(handle) = args.memberships {
        for list in memberships(source.as_ref(), &cache, &handle).await? {
            println!("{}\t{}\t@{}", list.id, list.name, list.owner);
        }
        return Ok(());
    }

    let registry = ProviderRegistry::with_defaults();
    let summarizer = Summarizer::from_config(&registry, &config.summarization)?;

    if args.verify {
        let health = HealthCache::new();
        let session = verify_session_cached(source.as_ref(), &health, 2).await;
        let provider = summarizer.verify_cached(&health).await;
        println!("X session: {}", session.message);
        println!("{}: {}", summarizer.display_name(), provider.message);
        return Ok(());
    }

    info!(lists = config.list_urls.len(), provider = summarizer.provider_id(), "Starting digest");
    let digest = Digest::new(source, cache, summarizer).with_owner(config.list_owner.clone());
    let report = digest
        .run(&config.list_urls, args.max_tweets.unwrap_or(config.max_tweets))
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("# {}\n", report.metadata.display_name);
        println!("{}", report.summary);
    }
    Ok(())
}
