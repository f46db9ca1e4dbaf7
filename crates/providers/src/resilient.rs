//! Resilient embedder: per-attempt timeout with bounded retry and backoff.
//!
//! Provider calls are the only operation in the pipeline that can suspend on
//! external I/O. This wrapper guarantees none of them hangs: each attempt is
//! bounded by a timeout, retryable failures are retried up to `max_retries`
//! times with exponential backoff, and everything else fails immediately.
//!
//! No single wait between attempts exceeds the per-attempt timeout. A server
//! asking for a longer `retry-after` gets its rate-limit error surfaced
//! right away instead.

use async_trait::async_trait;
use autocontext_core::EmbeddingProvider;
use autocontext_core::error::ProviderError;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

pub struct ResilientEmbedder {
    inner: Arc<dyn EmbeddingProvider>,
    timeout: Duration,
    max_retries: u32,
    backoff: Duration,
}

impl ResilientEmbedder {
    /// Wrap `inner` with a 10s timeout, 2 retries and 200ms base backoff.
    pub fn new(inner: Arc<dyn EmbeddingProvider>) -> Self {
        Self {
            inner,
            timeout: Duration::from_secs(10),
            max_retries: 2,
            backoff: Duration::from_millis(200),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff: Duration) -> Self {
        self.backoff = backoff;
        self
    }

    /// Wait before the next attempt, or `None` when the provider asked for
    /// longer than the timeout allows.
    fn delay_for(&self, attempt: u32, error: &ProviderError) -> Option<Duration> {
        let exponential = self
            .backoff
            .saturating_mul(2u32.saturating_pow(attempt))
            .min(self.timeout);
        match error {
            ProviderError::RateLimited { retry_after_secs } => {
                let requested = Duration::from_secs(*retry_after_secs);
                (requested <= self.timeout).then(|| exponential.max(requested))
            }
            _ => Some(exponential),
        }
    }
}

#[async_trait]
impl EmbeddingProvider for ResilientEmbedder {
    fn name(&self) -> &str {
        self.inner.name()
    }

    fn dimension(&self) -> Option<usize> {
        self.inner.dimension()
    }

    async fn embed(&self, text: &str) -> std::result::Result<Vec<f32>, ProviderError> {
        let mut attempt = 0;
        loop {
            let error = match tokio::time::timeout(self.timeout, self.inner.embed(text)).await {
                Ok(Ok(vector)) => return Ok(vector),
                Ok(Err(e)) => e,
                Err(_) => ProviderError::Timeout(format!(
                    "Provider '{}' timed out after {}ms",
                    self.inner.name(),
                    self.timeout.as_millis()
                )),
            };

            if !error.is_retryable() || attempt >= self.max_retries {
                return Err(error);
            }

            let Some(delay) = self.delay_for(attempt, &error) else {
                warn!(
                    provider = %self.inner.name(),
                    timeout_ms = self.timeout.as_millis() as u64,
                    error = %error,
                    "Provider asked to wait past the timeout, giving up"
                );
                return Err(error);
            };
            warn!(
                provider = %self.inner.name(),
                attempt = attempt + 1,
                max_retries = self.max_retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Embedding attempt failed, retrying"
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Fails with `error` for the first `failures` calls, then succeeds.
    struct FlakyProvider {
        error: ProviderError,
        failures: usize,
        calls: AtomicUsize,
    }

    impl FlakyProvider {
        fn new(error: ProviderError, failures: usize) -> Self {
            Self {
                error,
                failures,
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EmbeddingProvider for FlakyProvider {
        fn name(&self) -> &str {
            "flaky"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                Err(self.error.clone())
            } else {
                Ok(vec![1.0, 0.0])
            }
        }
    }

    /// A provider that hangs forever (for timeout testing).
    struct HangingProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl EmbeddingProvider for HangingProvider {
        fn name(&self) -> &str {
            "hanging"
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(vec![])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures() {
        let inner = Arc::new(FlakyProvider::new(
            ProviderError::Network("conn reset".into()),
            2,
        ));
        let embedder = ResilientEmbedder::new(inner.clone()).with_max_retries(2);

        let vector = embedder.embed("hello").await.unwrap();
        assert_eq!(vector, vec![1.0, 0.0]);
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_retries() {
        let inner = Arc::new(FlakyProvider::new(
            ProviderError::ApiError {
                status_code: 503,
                message: "unavailable".into(),
            },
            10,
        ));
        let embedder = ResilientEmbedder::new(inner.clone()).with_max_retries(2);

        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 503, .. }));
        assert_eq!(inner.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_retry_permanent_failures() {
        let inner = Arc::new(FlakyProvider::new(
            ProviderError::AuthenticationFailed("bad key".into()),
            10,
        ));
        let embedder = ResilientEmbedder::new(inner.clone()).with_max_retries(5);

        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::AuthenticationFailed(_)));
        assert_eq!(inner.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn timeout_becomes_retryable_error() {
        let inner = Arc::new(HangingProvider {
            calls: AtomicUsize::new(0),
        });
        let embedder = ResilientEmbedder::new(inner.clone())
            .with_timeout(Duration::from_millis(50))
            .with_max_retries(1);

        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
        assert!(err.is_retryable());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn backoff_is_exponential_and_honors_retry_after() {
        let embedder = ResilientEmbedder::new(Arc::new(FlakyProvider::new(
            ProviderError::Network("x".into()),
            0,
        )))
        .with_backoff(Duration::from_millis(100));

        let net = ProviderError::Network("x".into());
        assert_eq!(embedder.delay_for(0, &net), Some(Duration::from_millis(100)));
        assert_eq!(embedder.delay_for(2, &net), Some(Duration::from_millis(400)));
        // capped at the 10s default timeout
        assert_eq!(embedder.delay_for(20, &net), Some(Duration::from_secs(10)));

        let limited = ProviderError::RateLimited { retry_after_secs: 3 };
        assert_eq!(embedder.delay_for(0, &limited), Some(Duration::from_secs(3)));
        let too_long = ProviderError::RateLimited { retry_after_secs: 60 };
        assert_eq!(embedder.delay_for(0, &too_long), None);
    }

    #[tokio::test(start_paused = true)]
    async fn long_retry_after_fails_fast() {
        let inner = Arc::new(FlakyProvider::new(
            ProviderError::RateLimited { retry_after_secs: 3600 },
            10,
        ));
        let embedder = ResilientEmbedder::new(inner.clone())
            .with_timeout(Duration::from_secs(1))
            .with_max_retries(2);

        let started = tokio::time::Instant::now();
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { retry_after_secs: 3600 }));
        assert!(err.is_retryable());
        assert_eq!(inner.calls(), 1);
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn total_wait_stays_within_timeout_bounds() {
        let inner = Arc::new(FlakyProvider::new(
            ProviderError::RateLimited { retry_after_secs: 1 },
            10,
        ));
        let embedder = ResilientEmbedder::new(inner.clone())
            .with_timeout(Duration::from_secs(2))
            .with_max_retries(2)
            .with_backoff(Duration::from_secs(5));

        let started = tokio::time::Instant::now();
        let err = embedder.embed("hello").await.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
        assert_eq!(inner.calls(), 3);
        // two waits, each clamped to the 2s timeout
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(4) && elapsed < Duration::from_secs(5));
    }
}
