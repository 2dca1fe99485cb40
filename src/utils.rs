use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;
use std::time::Duration;

static NON_KEY_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^a-z0-9_]").expect("static key pattern is valid")
});

/// Wait before retry attempt `attempt` (1-based): `base * 2^(attempt - 1)`
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(16);
    base.saturating_mul(1u32 << exponent)
}

/// Convert a human-readable section heading into a document key
pub fn sanitize_key(text: &str) -> String {
    let lowered = text.trim().to_lowercase().replace(' ', "_");
    NON_KEY_CHARS.replace_all(&lowered, "").into_owned()
}

/// Suspension hook for backoff and politeness delays.
///
/// Production code sleeps on the tokio timer; tests substitute a recorder.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Sleeper backed by `tokio::time::sleep`
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
