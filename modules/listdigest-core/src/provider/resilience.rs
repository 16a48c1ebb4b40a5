use std::future::Future;
use std::sync::LazyLock;
use std::time::Duration;

use ai_client::AiError;
use regex::Regex;
use tracing::warn;

/// Upper bound on any server-suggested retry delay.
pub const MAX_RETRY_AFTER: Duration = Duration::from_secs(60);

static RE_TRY_AGAIN_IN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)try again in\s+(?:(\d+)m)?(\d+(?:\.\d+)?)(ms|s)\b").expect("try-again pattern")
});
static RE_RETRY_AFTER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)retry after\s+(\d+(?:\.\d+)?)\s*(?:seconds?|secs?|s)\b")
        .expect("retry-after pattern")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Rejected credential. Never retried.
    Auth,
    /// Quota or burst limit, with the server's suggested delay when it gave one.
    RateLimited { retry_after: Option<Duration> },
    /// Prompt exceeds the model's context window. Never retried.
    ContextTooLarge,
    Other,
}

/// Classify by status code first, then by message content.
pub fn classify(err: &AiError) -> FailureKind {
    let message = err.to_string().to_lowercase();
    let rate_limited = || {
        let retry_after = err
            .retry_after()
            .or_else(|| parse_retry_hint(&message))
            .map(|d| d.min(MAX_RETRY_AFTER));
        FailureKind::RateLimited { retry_after }
    };

    match err.status() {
        Some(401 | 403) => return FailureKind::Auth,
        Some(413) => return FailureKind::ContextTooLarge,
        Some(429) => return rate_limited(),
        _ => {}
    }

    if message.contains("invalid api key")
        || message.contains("invalid x-api-key")
        || message.contains("unauthorized")
        || message.contains("authentication_error")
    {
        FailureKind::Auth
    } else if message.contains("rate limit")
        || message.contains("rate_limit")
        || message.contains("too many requests")
    {
        rate_limited()
    } else if message.contains("context_length")
        || message.contains("maximum context")
        || message.contains("context window")
        || message.contains("prompt is too long")
    {
        FailureKind::ContextTooLarge
    } else {
        FailureKind::Other
    }
}

/// "try again in 7.5s", "try again in 1m2s", "try again in 450ms",
/// "retry after 20 seconds".
pub fn parse_retry_hint(message: &str) -> Option<Duration> {
    if let Some(c) = RE_TRY_AGAIN_IN.captures(message) {
        let minutes: f64 = c.get(1).and_then(|m| m.as_str().parse().ok()).unwrap_or(0.0);
        let amount: f64 = c[2].parse().ok()?;
        let seconds = match &c[3] {
            "ms" => amount / 1000.0,
            _ => amount,
        };
        return Duration::try_from_secs_f64(minutes * 60.0 + seconds).ok();
    }
    RE_RETRY_AFTER
        .captures(message)
        .and_then(|c| c[1].parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Delays between attempts. Attempts are capped at `delays.len() + 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl Default for RetrySchedule {
    fn default() -> Self {
        Self::new(vec![Duration::from_secs(2), Duration::from_secs(5)])
    }
}

impl RetrySchedule {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// No retries at all.
    pub fn none() -> Self {
        Self::new(Vec::new())
    }

    pub fn max_attempts(&self) -> usize {
        self.delays.len() + 1
    }

    /// Delay after failed attempt `attempt` (zero-based), if another is allowed.
    pub fn delay_after(&self, attempt: usize) -> Option<Duration> {
        self.delays.get(attempt).copied()
    }
}

/// Run `op`, retrying only rate-limit failures along `schedule`.
///
/// A server hint replaces the scheduled delay, bounded by [`MAX_RETRY_AFTER`].
pub async fn with_rate_limit_retry<T, F, Fut>(
    schedule: &RetrySchedule,
    provider: &str,
    mut op: F,
) -> Result<T, AiError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, AiError>>,
{
    let mut attempt = 0;
    loop {
        let err = match op().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        let FailureKind::RateLimited { retry_after } = classify(&err) else {
            return Err(err);
        };
        let Some(scheduled) = schedule.delay_after(attempt) else {
            warn!(provider, attempts = attempt + 1, "Rate limited, retries exhausted");
            return Err(err);
        };

        let delay = retry_after.unwrap_or(scheduled);
        warn!(
            provider,
            attempt = attempt + 1,
            max_attempts = schedule.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            hinted = retry_after.is_some(),
            "Rate limited, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn classifies_by_status() {
        assert_eq!(classify(&AiError::api(401, "")), FailureKind::Auth);
        assert_eq!(classify(&AiError::api(413, "")), FailureKind::ContextTooLarge);
        assert_eq!(
            classify(&AiError::api(429, "")),
            FailureKind::RateLimited { retry_after: None }
        );
        assert_eq!(classify(&AiError::api(500, "boom")), FailureKind::Other);
    }

    #[test]
    fn classifies_by_message() {
        let err = AiError::api(400, "This model's maximum context length is 8192 tokens");
        assert_eq!(classify(&err), FailureKind::ContextTooLarge);

        let err = AiError::Network("Rate limit reached for model".to_string());
        assert!(matches!(classify(&err), FailureKind::RateLimited { .. }));

        let err = AiError::api(400, "Invalid API Key provided");
        assert_eq!(classify(&err), FailureKind::Auth);
    }

    #[test]
    fn status_outranks_message_text() {
        let err = AiError::api(413, "rate_limit_exceeded: tokens per minute");
        assert_eq!(classify(&err), FailureKind::ContextTooLarge);

        let err = AiError::api(429, "context_length budget exhausted, try again in 2s");
        assert_eq!(
            classify(&err),
            FailureKind::RateLimited { retry_after: Some(Duration::from_secs(2)) }
        );

        let err = AiError::api(401, "rate limit check failed");
        assert_eq!(classify(&err), FailureKind::Auth);
    }

    #[test]
    fn retry_after_header_wins_and_is_capped() {
        let err = AiError::Api {
            status: 429,
            message: "Please try again in 3s".to_string(),
            retry_after: Some(Duration::from_secs(600)),
        };
        assert_eq!(
            classify(&err),
            FailureKind::RateLimited { retry_after: Some(MAX_RETRY_AFTER) }
        );
    }

    #[test]
    fn parses_message_hints() {
        assert_eq!(
            parse_retry_hint("please try again in 7.5s."),
            Some(Duration::from_millis(7500))
        );
        assert_eq!(parse_retry_hint("try again in 1m2s"), Some(Duration::from_secs(62)));
        assert_eq!(parse_retry_hint("try again in 450ms"), Some(Duration::from_millis(450)));
        assert_eq!(parse_retry_hint("retry after 20 seconds"), Some(Duration::from_secs(20)));
        assert_eq!(parse_retry_hint("slow down"), None);
    }

    #[test]
    fn schedule_caps_attempts() {
        let schedule = RetrySchedule::default();
        assert_eq!(schedule.max_attempts(), 3);
        assert_eq!(schedule.delay_after(0), Some(Duration::from_secs(2)));
        assert_eq!(schedule.delay_after(1), Some(Duration::from_secs(5)));
        assert_eq!(schedule.delay_after(2), None);
    }

    #[tokio::test(start_paused = true)]
    async fn non_rate_limit_errors_are_not_retried() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_rate_limit_retry(&RetrySchedule::default(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AiError::api(401, "bad key")) }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_cap() {
        let calls = AtomicUsize::new(0);
        let result: Result<(), _> = with_rate_limit_retry(&RetrySchedule::default(), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(AiError::api(429, "slow down")) }
        })
        .await;
        assert_eq!(result.unwrap_err().status(), Some(429));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn hinted_delay_replaces_schedule() {
        let calls = AtomicUsize::new(0);
        let started = tokio::time::Instant::now();
        let result = with_rate_limit_retry(&RetrySchedule::default(), "groq", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(AiError::api(429, "Please try again in 0.5s"))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), "done");
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(500) && elapsed < Duration::from_secs(2));
    }
}
