use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use crate::Result;

/// Fixed pause between attempts. Cold-starting hosted databases recover on
/// the order of seconds, so growing the delay buys nothing.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);
pub const QUERY_ATTEMPTS: u32 = 3;
pub const PROBE_ATTEMPTS: u32 = 5;

/// Configuration for database operation retries
#[derive(Debug, Clone)]
pub struct DatabaseRetryConfig {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl DatabaseRetryConfig {
    /// Budget for ordinary repository statements.
    pub fn query() -> Self {
        Self { max_attempts: QUERY_ATTEMPTS, delay: RETRY_DELAY }
    }

    /// Budget for the startup connectivity probe.
    pub fn probe() -> Self {
        Self { max_attempts: PROBE_ATTEMPTS, delay: RETRY_DELAY }
    }
}

impl Default for DatabaseRetryConfig {
    fn default() -> Self {
        Self::query()
    }
}

/// Retry a database operation on transient connectivity errors.
///
/// Non-transient errors are returned on the attempt that produced them.
/// `before_retry` runs after the pause and before the next attempt; the
/// connection manager uses it to rebuild its pool. When the budget is spent
/// the last error is returned unchanged.
pub async fn retry_database_operation<F, Fut, T, H>(
    mut operation: F,
    config: &DatabaseRetryConfig,
    mut before_retry: H,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
    H: FnMut(),
{
    let max_attempts = config.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        tracing::debug!("🔄 DATABASE_RETRY: Attempt {}/{}", attempt, max_attempts);

        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!("✅ DATABASE_RETRY: Operation succeeded on attempt {}", attempt);
                }
                return Ok(result);
            }
            Err(e) if e.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    "⚠️ DATABASE_RETRY: Attempt {} failed: {}, retrying in {}ms",
                    attempt,
                    e,
                    config.delay.as_millis()
                );
                sleep(config.delay).await;
                before_retry();
                attempt += 1;
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::error!(
                        "❌ DATABASE_RETRY: All {} attempts failed, last error: {}",
                        max_attempts,
                        e
                    );
                }
                return Err(e);
            }
        }
    }
}
