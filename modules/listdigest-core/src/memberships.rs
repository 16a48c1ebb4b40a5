use listdigest_common::DigestError;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::classify_x_error;
use crate::id_cache::IdentifierCache;
use crate::traits::ListSource;

pub const MEMBERSHIP_PAGE_SIZE: u32 = 50;

/// Paging stops once more than this many memberships are collected.
pub const MAX_MEMBERSHIPS: usize = 500;

/// A list some user has been added to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Membership {
    pub id: String,
    pub name: String,
    pub owner: String,
}

/// Lists `handle` is a member of.
///
/// Auth and rate-limit failures surface. Other failures end paging and
/// return what was collected.
pub async fn memberships(
    source: &dyn ListSource,
    cache: &IdentifierCache,
    handle: &str,
) -> Result<Vec<Membership>, DigestError> {
    let user_id = match cache.resolve(source, handle).await {
        Ok(id) => id,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(handle, error = %e, "Could not resolve handle for memberships");
            return Ok(Vec::new());
        }
    };

    let subject = format!("memberships of @{}", IdentifierCache::normalize(handle));
    let mut collected = Vec::new();
    let mut cursor = "-1".to_string();

    loop {
        let page = match source
            .memberships(&user_id, MEMBERSHIP_PAGE_SIZE, Some(&cursor))
            .await
        {
            Ok(page) => page,
            Err(e) => {
                let err = classify_x_error(&e, &subject);
                if err.is_fatal() {
                    return Err(err);
                }
                warn!(handle, collected = collected.len(), error = %e, "Memberships page failed");
                break;
            }
        };
        if page.lists.is_empty() {
            break;
        }

        collected.extend(page.lists.into_iter().filter(|l| !l.name.is_empty()).map(|l| {
            Membership {
                owner: l
                    .user
                    .map(|u| u.screen_name)
                    .filter(|s| !s.is_empty())
                    .unwrap_or_else(|| "Unknown".to_string()),
                id: l.id_str,
                name: l.name,
            }
        }));

        match page.next_cursor_str {
            Some(next) if !next.is_empty() && next != "0" && collected.len() <= MAX_MEMBERSHIPS => {
                cursor = next;
            }
            _ => break,
        }
    }

    info!(handle, count = collected.len(), "Fetched memberships");
    Ok(collected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{membership_page, MockListSource};
    use x_client::XError;

    #[tokio::test]
    async fn pages_until_zero_cursor_and_caches_id() {
        let source = MockListSource::new()
            .on_user("ferris", "42")
            .on_memberships("42", "-1", membership_page(&["Rust", "", "Systems"], Some("7")))
            .on_memberships("42", "7", membership_page(&["Embedded"], Some("0")));
        let cache = IdentifierCache::in_memory();

        let lists = memberships(&source, &cache, "@Ferris").await.unwrap();
        let names: Vec<_> = lists.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Rust", "Systems", "Embedded"]);
        assert_eq!(lists[0].owner, "owner");
        assert_eq!(cache.get("ferris").as_deref(), Some("42"));

        memberships(&source, &cache, "ferris").await.unwrap();
        assert_eq!(source.user_lookups(), 1);
    }

    #[tokio::test]
    async fn stops_past_safety_cap() {
        let names: Vec<String> = (0..60).map(|i| format!("list {i}")).collect();
        let names: Vec<&str> = names.iter().map(String::as_str).collect();
        let mut source = MockListSource::new().on_user("big", "1");
        let mut cursor = "-1".to_string();
        for page in 0..20 {
            let next = format!("c{page}");
            source = source.on_memberships("1", &cursor, membership_page(&names, Some(&next)));
            cursor = next;
        }

        let lists = memberships(&source, &IdentifierCache::in_memory(), "big").await.unwrap();
        assert_eq!(lists.len(), 540);
    }

    #[tokio::test]
    async fn rate_limit_surfaces() {
        let source = MockListSource::new()
            .on_user("ferris", "42")
            .on_memberships_error("42", "-1", XError::Api { status: 429, message: String::new() });
        let err = memberships(&source, &IdentifierCache::in_memory(), "ferris")
            .await
            .unwrap_err();
        assert!(matches!(err, DigestError::RateLimited(_)));
    }

    #[tokio::test]
    async fn transient_failure_returns_partial() {
        let source = MockListSource::new()
            .on_user("ferris", "42")
            .on_memberships("42", "-1", membership_page(&["Rust"], Some("9")))
            .on_memberships_error("42", "9", XError::Timeout("slow".to_string()));
        let lists = memberships(&source, &IdentifierCache::in_memory(), "ferris")
            .await
            .unwrap();
        assert_eq!(lists.len(), 1);
    }
}
