//! Image provider trait and retry utilities.

use crate::error::{FailureKind, GenFrameError, Result};
use crate::generation::registry::ProviderFamily;
use crate::generation::types::{GenerationRequest, ImageHandle};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// A raster produced by one adapter, already at the requested size.
#[derive(Debug, Clone)]
pub struct ProviderOutput {
    /// Final raster.
    pub image: ImageHandle,
    /// Remote attempts it took.
    pub attempts: u32,
    /// Delays slept between those attempts.
    pub retry_delays: Vec<Duration>,
    /// Remote model or variant name.
    pub model: Option<String>,
    /// Seed sent with the request.
    pub seed: Option<u64>,
}

/// Trait for image generation providers.
#[async_trait]
pub trait ImageProvider: Send + Sync {
    /// Generates an image of exactly the requested size.
    async fn generate(&self, request: &GenerationRequest) -> Result<ProviderOutput>;

    /// Returns the family of this provider.
    fn family(&self) -> ProviderFamily;

    /// Returns the name of this provider for logs.
    fn name(&self) -> &str;

    /// Lightweight reachability check. No retries.
    async fn health_check(&self) -> Result<()>;
}

/// Retry schedule for authenticated inference calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts, first one included.
    pub max_attempts: u32,
    /// Base delay while the remote model is loading (HTTP 503).
    #[serde(with = "millis")]
    pub loading_backoff: Duration,
    /// Base delay after any other failure.
    #[serde(with = "millis")]
    pub transport_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            loading_backoff: Duration::from_millis(2000),
            transport_backoff: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delay to sleep after `attempt` (1-based) failed with `err`.
    pub fn delay_after(&self, attempt: u32, err: &GenFrameError) -> Duration {
        let base = if err.is_model_loading() {
            self.loading_backoff
        } else {
            self.transport_backoff
        };
        base * attempt
    }
}

/// Outcome of [`with_retries`] on success.
pub(crate) struct Retried<T> {
    pub value: T,
    pub attempts: u32,
    pub delays: Vec<Duration>,
}

/// Runs `op` until it succeeds or the policy is spent.
///
/// `op` receives the 1-based attempt number. Missing local credentials end
/// the loop at once; every remote failure is retried.
pub(crate) async fn with_retries<T, F, Fut>(
    provider: &str,
    policy: &RetryPolicy,
    mut op: F,
) -> Result<Retried<T>>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delays = Vec::new();

    for attempt in 1..=max_attempts {
        let err = match op(attempt).await {
            Ok(value) => {
                return Ok(Retried {
                    value,
                    attempts: attempt,
                    delays,
                })
            }
            Err(e) => e,
        };

        if let GenFrameError::Auth(message) = &err {
            return Err(GenFrameError::Provider {
                provider: provider.to_string(),
                kind: FailureKind::Unauthorized,
                message: message.clone(),
                status: None,
                attempts: attempt,
            });
        }

        if attempt == max_attempts {
            tracing::warn!(provider, attempt, "giving up: {err}");
            return Err(GenFrameError::Provider {
                provider: provider.to_string(),
                kind: FailureKind::Exhausted,
                message: err.to_string(),
                status: err.status(),
                attempts: attempt,
            });
        }

        let delay = policy.delay_after(attempt, &err);
        tracing::warn!(
            provider,
            attempt,
            max_attempts,
            status = err.status(),
            delay_ms = delay.as_millis() as u64,
            "retrying after error: {err}"
        );
        tokio::time::sleep(delay).await;
        delays.push(delay);
    }

    unreachable!("retry loop returns on the final attempt")
}

mod millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            loading_backoff: Duration::from_millis(2),
            transport_backoff: Duration::from_millis(1),
        }
    }

    fn loading() -> GenFrameError {
        GenFrameError::Api {
            status: 503,
            message: "loading".into(),
        }
    }

    #[test]
    fn test_default_delays() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_after(1, &loading()), Duration::from_millis(2000));
        assert_eq!(policy.delay_after(2, &loading()), Duration::from_millis(4000));

        let transport = GenFrameError::Decode("eof".into());
        assert_eq!(policy.delay_after(1, &transport), Duration::from_millis(1000));
        assert_eq!(policy.delay_after(2, &transport), Duration::from_millis(2000));
    }

    #[tokio::test]
    async fn test_succeeds_on_third_attempt_with_growing_delays() {
        let calls = AtomicU32::new(0);
        let out = with_retries("test", &fast_policy(), |attempt| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 3 {
                    Err(loading())
                } else {
                    Ok("done")
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(out.value, "done");
        assert_eq!(out.attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(
            out.delays,
            vec![Duration::from_millis(2), Duration::from_millis(4)]
        );
    }

    #[tokio::test]
    async fn test_exhaustion_reports_attempts_and_status() {
        let err = with_retries::<(), _, _>("test", &fast_policy(), |_| async {
            Err(GenFrameError::Api {
                status: 500,
                message: "boom".into(),
            })
        })
        .await
        .err()
        .unwrap();

        match err {
            GenFrameError::Provider {
                kind,
                status,
                attempts,
                ..
            } => {
                assert_eq!(kind, FailureKind::Exhausted);
                assert_eq!(status, Some(500));
                assert_eq!(attempts, 3);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_credentials_stop_immediately() {
        let calls = AtomicU32::new(0);
        let err = with_retries::<(), _, _>("test", &fast_policy(), |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(GenFrameError::Auth("no tokens".into())) }
        })
        .await
        .err()
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(
            err,
            GenFrameError::Provider {
                kind: FailureKind::Unauthorized,
                ..
            }
        ));
    }

    #[test]
    fn test_policy_serializes_millis() {
        let json = serde_json::to_value(RetryPolicy::default()).unwrap();
        assert_eq!(json["loading_backoff"], 2000);
        assert_eq!(json["transport_backoff"], 1000);
    }
}
