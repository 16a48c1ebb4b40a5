use std::time::Duration;

use listdigest_common::DigestError;
use tracing::{info, warn};
use x_client::XError;

use crate::health::{HealthCache, Status};
use crate::traits::ListSource;

pub const SESSION_CACHE_KEY: &str = "x-session";

const VERIFY_RETRY_PAUSE: Duration = Duration::from_secs(1);

/// Confirm the session credential before a run.
///
/// The verify endpoint answers 404 intermittently while the session is fine,
/// so a 404 proceeds with a warning and lets the list fetch surface real auth
/// problems.
pub async fn login(source: &dyn ListSource) -> Result<String, DigestError> {
    match source.current_user().await {
        Ok(user) => {
            info!(handle = user.screen_name.as_str(), "Session verified");
            Ok(format!("Logged in as @{}", user.screen_name))
        }
        Err(e) if e.is_auth_failure() => Err(DigestError::Authentication(
            "X session expired or unauthorized (401). Please re-import your session cookies."
                .to_string(),
        )),
        Err(e) if e.is_rate_limit() => Err(DigestError::RateLimited(
            "X rate limit reached while verifying session. Please wait 15 minutes and try again."
                .to_string(),
        )),
        Err(e) if e.status() == Some(404) => {
            warn!("Session check returned 404, proceeding with loaded credential");
            Ok("Session loaded (X returned 404 verifying user, proceeding anyway)".to_string())
        }
        Err(e) => Err(DigestError::Authentication(format!(
            "X login failed: {e}. Please re-import your session cookies."
        ))),
    }
}

/// Dashboard status for the session. Non-401 failures are retried `retries`
/// times, one second apart.
pub async fn verify_session(source: &dyn ListSource, retries: u32) -> Status {
    let mut last_err: Option<XError> = None;
    for attempt in 0..=retries {
        match source.current_user().await {
            Ok(user) => return Status::active(format!("OK (@{})", user.screen_name)),
            Err(e) => {
                let definitive = e.is_auth_failure();
                last_err = Some(e);
                if definitive {
                    break;
                }
                if attempt < retries {
                    tokio::time::sleep(VERIFY_RETRY_PAUSE).await;
                }
            }
        }
    }

    let Some(err) = last_err else {
        return Status::inactive("Invalid: no response");
    };
    if err.is_auth_failure() {
        Status::inactive("Expired/Unauthorized (401)")
    } else if err.is_rate_limit() {
        Status::inactive("Rate Limited by X")
    } else if err.status() == Some(404) {
        Status::inactive("X Service Busy (404)")
    } else {
        let text = err.to_string();
        Status::inactive(format!("Invalid: {}", ai_client::truncate_chars(&text, 30)))
    }
}

pub async fn verify_session_cached(
    source: &dyn ListSource,
    cache: &HealthCache<Status>,
    retries: u32,
) -> Status {
    cache
        .get_or_check(SESSION_CACHE_KEY, || verify_session(source, retries))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockListSource;

    fn api(status: u16) -> XError {
        XError::Api {
            status,
            message: String::new(),
        }
    }

    #[tokio::test]
    async fn login_reports_handle() {
        let source = MockListSource::new().with_current_user(Ok("ferris"));
        assert_eq!(login(&source).await.unwrap(), "Logged in as @ferris");
    }

    #[tokio::test]
    async fn login_maps_failures() {
        let expired = MockListSource::new().with_current_user(Err(api(401)));
        assert!(matches!(
            login(&expired).await,
            Err(DigestError::Authentication(ref m)) if m.contains("re-import")
        ));

        let limited = MockListSource::new().with_current_user(Err(api(429)));
        assert!(matches!(login(&limited).await, Err(DigestError::RateLimited(_))));

        let busy = MockListSource::new().with_current_user(Err(api(404)));
        assert!(login(&busy).await.is_ok());

        let broken = MockListSource::new().with_current_user(Err(api(500)));
        assert!(matches!(login(&broken).await, Err(DigestError::Authentication(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn verify_does_not_retry_unauthorized() {
        let source = MockListSource::new().with_current_user(Err(api(401)));
        let status = verify_session(&source, 2).await;
        assert_eq!(status, Status::inactive("Expired/Unauthorized (401)"));
        assert_eq!(source.current_user_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn verify_retries_transient_failures() {
        let source = MockListSource::new().with_current_user(Err(api(404)));
        let status = verify_session(&source, 2).await;
        assert_eq!(status, Status::inactive("X Service Busy (404)"));
        assert_eq!(source.current_user_calls(), 3);

        let limited = MockListSource::new().with_current_user(Err(api(429)));
        assert_eq!(verify_session(&limited, 0).await.message, "Rate Limited by X");
    }

    #[tokio::test]
    async fn verify_reports_handle() {
        let source = MockListSource::new().with_current_user(Ok("ferris"));
        assert_eq!(verify_session(&source, 1).await, Status::active("OK (@ferris)"));
    }

    #[tokio::test]
    async fn cached_verify_skips_second_call() {
        let source = MockListSource::new().with_current_user(Ok("ferris"));
        let cache = HealthCache::new();
        verify_session_cached(&source, &cache, 1).await;
        verify_session_cached(&source, &cache, 1).await;
        assert_eq!(source.current_user_calls(), 1);
    }
}
