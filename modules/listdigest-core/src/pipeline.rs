//! One digest run: session check, staggered concurrent fetches, a barrier,
//! aggregation, then synthesis.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use listdigest_common::{AggregationResult, CollectionMetadata, DigestError, LinkGroup, Post};
use rand::Rng;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};
use x_client::ListInfo;

use crate::aggregator::aggregate;
use crate::error::{classify_x_error, PipelineError, Stage};
use crate::fetcher::PaginationFetcher;
use crate::id_cache::IdentifierCache;
use crate::identifier::ListIdentifier;
use crate::insights::{parse_insights, Insights};
use crate::provider::{is_failure, Summarizer};
use crate::session::login;
use crate::traits::ListSource;

const STAGGER_BASE_SECS: f64 = 0.3;
const STAGGER_JITTER_SECS: f64 = 0.5;

const NO_POSTS_MESSAGE: &str = "No tweets were fetched from any of your lists. \
    Your X session may have expired. Please re-import your session cookies.";

/// Everything a report renderer needs from one run.
#[derive(Debug, Clone, Serialize)]
pub struct DigestReport {
    pub metadata: CollectionMetadata,
    pub collection_urls: Vec<String>,
    pub post_count: usize,
    pub aggregation: AggregationResult,
    pub summary: String,
    pub insights: Insights,
    /// "Label · model" of the backend that wrote the summary.
    pub provider: String,
    pub session: String,
    pub generated_at: DateTime<Utc>,
}

impl DigestReport {
    pub fn insight_for(&self, group: &LinkGroup) -> Option<&str> {
        self.insights.for_link(&group.link)
    }
}

/// Posts and metadata for one collection, gathered before the barrier.
struct CollectionFetch {
    identifier: ListIdentifier,
    posts: Vec<Post>,
    info: Option<ListInfo>,
}

pub struct Digest {
    source: Arc<dyn ListSource>,
    fetcher: PaginationFetcher,
    cache: Arc<IdentifierCache>,
    summarizer: Summarizer,
    owner: Option<String>,
}

impl Digest {
    pub fn new(
        source: Arc<dyn ListSource>,
        cache: Arc<IdentifierCache>,
        summarizer: Summarizer,
    ) -> Self {
        Self {
            fetcher: PaginationFetcher::new(source.clone()),
            source,
            cache,
            summarizer,
            owner: None,
        }
    }

    /// Preferred owner handle shown on the report.
    pub fn with_owner(mut self, owner: Option<String>) -> Self {
        self.owner = owner.filter(|o| !o.trim().is_empty());
        self
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.fetcher = PaginationFetcher::new(self.source.clone()).with_page_timeout(timeout);
        self
    }

    pub fn summarizer(&self) -> &Summarizer {
        &self.summarizer
    }

    pub async fn run(
        &self,
        identifiers: &[String],
        max_posts: usize,
    ) -> Result<DigestReport, PipelineError> {
        let started = Instant::now();

        self.summarizer
            .ensure_configured()
            .map_err(|e| PipelineError::new(Stage::Synthesis, e))?;
        if identifiers.is_empty() {
            return Err(PipelineError::new(
                Stage::Fetch,
                DigestError::Config("no lists given".to_string()),
            ));
        }

        let session = login(self.source.as_ref())
            .await
            .map_err(|e| PipelineError::new(Stage::Session, e))?;
        info!(session = session.as_str(), "Session ready");

        // Fetch
        let fetch_started = Instant::now();
        let lists: Vec<ListIdentifier> = identifiers
            .iter()
            .map(|s| ListIdentifier::parse(s))
            .collect();
        let delays = stagger_delays(lists.len());
        let fetched = try_join_all(
            lists
                .into_iter()
                .zip(delays)
                .map(|(list, delay)| self.fetch_collection(list, max_posts, delay)),
        )
        .await
        .map_err(|e| PipelineError::new(Stage::Fetch, e))?;

        let metadata = self
            .assemble_metadata(&fetched)
            .await
            .map_err(|e| PipelineError::new(Stage::Fetch, e))?;
        let collection_urls: Vec<String> = fetched
            .iter()
            .map(|f| f.identifier.url.clone())
            .collect();
        let posts: Vec<Post> = fetched.into_iter().flat_map(|f| f.posts).collect();
        info!(
            stage = "fetch",
            lists = collection_urls.len(),
            posts = posts.len(),
            elapsed_ms = fetch_started.elapsed().as_millis() as u64,
            "Stage complete"
        );
        if posts.is_empty() {
            return Err(PipelineError::new(
                Stage::Fetch,
                DigestError::Transient(NO_POSTS_MESSAGE.to_string()),
            ));
        }

        // Aggregate
        let aggregate_started = Instant::now();
        let aggregation = aggregate(&posts);
        info!(
            stage = "aggregation",
            groups = aggregation.groups.len(),
            unlinked = aggregation.unlinked.len(),
            elapsed_ms = aggregate_started.elapsed().as_millis() as u64,
            "Stage complete"
        );

        // Synthesize
        let synthesis_started = Instant::now();
        let summary = self.summarizer.synthesize(&aggregation).await;
        info!(
            stage = "synthesis",
            provider = self.summarizer.provider_id(),
            chars = summary.chars().count(),
            elapsed_ms = synthesis_started.elapsed().as_millis() as u64,
            "Stage complete"
        );
        if is_failure(&summary) {
            return Err(PipelineError::new(Stage::Synthesis, synthesis_error(&summary)));
        }

        let insights = parse_insights(&summary);
        info!(
            posts = posts.len(),
            insights = insights.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Digest complete"
        );

        Ok(DigestReport {
            metadata,
            collection_urls,
            post_count: posts.len(),
            aggregation,
            summary,
            insights,
            provider: self.summarizer.display_name(),
            session,
            generated_at: Utc::now(),
        })
    }

    async fn fetch_collection(
        &self,
        identifier: ListIdentifier,
        max_posts: usize,
        delay: Duration,
    ) -> Result<CollectionFetch, DigestError> {
        let posts = self.fetcher.fetch(&identifier, max_posts, delay).await?;
        let info = match self.source.list_info(&identifier.id).await {
            Ok(info) => Some(info),
            Err(e) => {
                let err = classify_x_error(&e, &format!("list {} metadata", identifier.id));
                if err.is_fatal() {
                    return Err(err);
                }
                warn!(list_id = identifier.id.as_str(), error = %e, "List metadata unavailable");
                None
            }
        };
        Ok(CollectionFetch {
            identifier,
            posts,
            info,
        })
    }

    /// Fold per-collection metadata. The owner comes from the preferred
    /// handle, then a locator owner, then the first reported list owner.
    async fn assemble_metadata(
        &self,
        fetched: &[CollectionFetch],
    ) -> Result<CollectionMetadata, DigestError> {
        let mut metadata = CollectionMetadata::default();
        for info in fetched.iter().filter_map(|f| f.info.as_ref()) {
            metadata.absorb_list(info.name.as_deref(), info.member_count);
        }

        let preferred = self
            .owner
            .clone()
            .or_else(|| fetched.iter().find_map(|f| f.identifier.owner.clone()));

        if let Some(handle) = preferred {
            let handle = IdentifierCache::normalize(&handle);
            match self.source.user_by_handle(&handle).await {
                Ok(user) => {
                    if !user.id.is_empty() {
                        self.cache.insert(&handle, &user.id).await;
                    }
                    metadata.set_owner(&handle, user.name, user.profile_image_url);
                }
                Err(e) => {
                    let err = classify_x_error(&e, &format!("user @{handle}"));
                    if err.is_fatal() {
                        return Err(err);
                    }
                    warn!(handle = handle.as_str(), error = %e, "Owner profile unavailable");
                }
            }
        }

        if !metadata.has_owner() {
            if let Some(user) = fetched
                .iter()
                .filter_map(|f| f.info.as_ref()?.user.as_ref())
                .find(|u| !u.screen_name.is_empty())
            {
                metadata.set_owner(
                    &user.screen_name,
                    user.name.clone(),
                    user.profile_image_url.clone(),
                );
            }
        }
        Ok(metadata)
    }
}

/// Start offsets for `n` concurrent fetches: `i * (0.3 + U[0, 0.5))` seconds.
fn stagger_delays(n: usize) -> Vec<Duration> {
    let mut rng = rand::rng();
    (0..n)
        .map(|i| {
            let jitter: f64 = rng.random_range(0.0..STAGGER_JITTER_SECS);
            Duration::from_secs_f64(i as f64 * (STAGGER_BASE_SECS + jitter))
        })
        .collect()
}

fn synthesis_error(summary: &str) -> DigestError {
    let message = format!("AI synthesis failed: {summary}");
    let lowered = summary.to_lowercase();
    if lowered.contains("context window") {
        DigestError::ContextTooLarge(message)
    } else if lowered.contains("invalid api key") || lowered.contains("api key not configured") {
        DigestError::Authentication(message)
    } else if lowered.contains("rate limited") {
        DigestError::RateLimited(message)
    } else {
        DigestError::Transient(message)
    }
}
