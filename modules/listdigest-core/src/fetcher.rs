use std::sync::Arc;
use std::time::Duration;

use listdigest_common::{DigestError, Post};
use tracing::{debug, info, warn};
use x_client::RawTweet;

use crate::error::classify_x_error;
use crate::extractor;
use crate::identifier::ListIdentifier;
use crate::traits::ListSource;

/// Largest page the list timeline will return.
pub const PAGE_CAP: usize = 40;

/// Per-page ceiling. A slower page ends the fetch with what was collected.
pub const PAGE_TIMEOUT: Duration = Duration::from_secs(30);

/// Cursor-paged list timeline reader.
pub struct PaginationFetcher {
    source: Arc<dyn ListSource>,
    page_timeout: Duration,
}

impl PaginationFetcher {
    pub fn new(source: Arc<dyn ListSource>) -> Self {
        Self {
            source,
            page_timeout: PAGE_TIMEOUT,
        }
    }

    pub fn with_page_timeout(mut self, timeout: Duration) -> Self {
        self.page_timeout = timeout;
        self
    }

    /// Up to `max_count` raw payloads, newest first.
    ///
    /// Auth and rate-limit failures surface as errors. Anything else stops the
    /// loop and returns the pages collected so far.
    pub async fn fetch_raw(
        &self,
        identifier: &ListIdentifier,
        max_count: usize,
        start_delay: Duration,
    ) -> Result<Vec<RawTweet>, DigestError> {
        if !start_delay.is_zero() {
            debug!(
                list_id = identifier.id.as_str(),
                delay_ms = start_delay.as_millis() as u64,
                "Staggering list fetch"
            );
            tokio::time::sleep(start_delay).await;
        }

        let subject = format!("list {}", identifier.id);
        let mut collected: Vec<RawTweet> = Vec::new();
        let mut cursor: Option<String> = None;
        let mut pages = 0u32;

        while collected.len() < max_count {
            let count = PAGE_CAP.min(max_count - collected.len());
            let request = self
                .source
                .list_page(&identifier.id, count as u32, cursor.as_deref());

            let page = match tokio::time::timeout(self.page_timeout, request).await {
                Ok(Ok(page)) => page,
                Ok(Err(e)) => {
                    let err = classify_x_error(&e, &subject);
                    if err.is_fatal() {
                        warn!(list_id = identifier.id.as_str(), error = %e, "List fetch aborted");
                        return Err(err);
                    }
                    warn!(
                        list_id = identifier.id.as_str(),
                        collected = collected.len(),
                        error = %e,
                        "List fetch failed, keeping partial results"
                    );
                    break;
                }
                Err(_) => {
                    warn!(
                        list_id = identifier.id.as_str(),
                        collected = collected.len(),
                        timeout_secs = self.page_timeout.as_secs(),
                        "List page timed out, keeping partial results"
                    );
                    break;
                }
            };
            pages += 1;

            if page.tweets.is_empty() {
                break;
            }
            let remaining = max_count - collected.len();
            collected.extend(page.tweets.into_iter().take(remaining));

            match page.next_cursor.filter(|c| !c.is_empty()) {
                Some(next) => cursor = Some(next),
                None => break,
            }
        }

        info!(
            list_id = identifier.id.as_str(),
            pages,
            posts = collected.len(),
            "List fetch complete"
        );
        Ok(collected)
    }

    /// [`fetch_raw`](Self::fetch_raw) followed by extraction.
    pub async fn fetch(
        &self,
        identifier: &ListIdentifier,
        max_count: usize,
        start_delay: Duration,
    ) -> Result<Vec<Post>, DigestError> {
        let raw = self.fetch_raw(identifier, max_count, start_delay).await?;
        Ok(raw.iter().map(extractor::extract).collect())
    }
}
