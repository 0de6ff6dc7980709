//! Retry wrapper with exponential backoff
//!
//! Optional layer around the request operation. Only transient failures
//! (transport errors and timeouts) are retried; offline, setup and
//! cancellation outcomes return on the first attempt.

use crate::error::RequestError;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::RandomState;
use std::future::Future;
use std::hash::{BuildHasher, Hasher};
use std::time::Duration;
use tracing::{debug, warn};

/// Backoff settings (`retry` section of `http.json`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfig {
    /// Attempts after the first one
    pub max_retries: u32,

    /// Delay before the first retry (milliseconds)
    pub initial_delay_ms: u64,

    pub backoff_multiplier: f64,

    /// Upper bound for any single delay (milliseconds)
    pub max_delay_ms: u64,

    /// Spread each delay over 80%..120% of its nominal value
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 500,
            backoff_multiplier: 2.0,
            max_delay_ms: 10_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Overlay the keys `layer` sets
    pub fn merge(&mut self, layer: RetryConfigLayer) {
        if let Some(max_retries) = layer.max_retries {
            self.max_retries = max_retries;
        }
        if let Some(initial_delay_ms) = layer.initial_delay_ms {
            self.initial_delay_ms = initial_delay_ms;
        }
        if let Some(multiplier) = layer.backoff_multiplier {
            self.backoff_multiplier = multiplier;
        }
        if let Some(max_delay_ms) = layer.max_delay_ms {
            self.max_delay_ms = max_delay_ms;
        }
        if let Some(jitter) = layer.jitter {
            self.jitter = jitter;
        }
    }

    /// Delays to wait before each retry, in order
    pub fn backoff(&self) -> Backoff<'_> {
        Backoff {
            config: self,
            retry: 0,
        }
    }

    /// Nominal delay before retry number `retry` (0-indexed), capped, before jitter
    fn nominal_delay(&self, retry: u32) -> f64 {
        let grown = self.initial_delay_ms as f64 * self.backoff_multiplier.powi(retry as i32);
        grown.min(self.max_delay_ms as f64)
    }
}

/// `retry` section as written in one config file; absent keys are `None`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryConfigLayer {
    pub max_retries: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub backoff_multiplier: Option<f64>,
    pub max_delay_ms: Option<u64>,
    pub jitter: Option<bool>,
}

/// Iterator over retry delays; yields `max_retries` items
#[derive(Debug, Clone)]
pub struct Backoff<'a> {
    config: &'a RetryConfig,
    retry: u32,
}

impl Iterator for Backoff<'_> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.retry >= self.config.max_retries {
            return None;
        }

        let mut millis = self.config.nominal_delay(self.retry);
        if self.config.jitter {
            millis *= 0.8 + unit_random() * 0.4;
        }
        self.retry += 1;

        Some(Duration::from_millis(millis as u64))
    }
}

/// Uniform-ish value in [0, 1) from a randomly keyed hasher
fn unit_random() -> f64 {
    let bits = RandomState::new().build_hasher().finish();
    (bits >> 11) as f64 / (1u64 << 53) as f64
}

/// Failures that can tell whether another attempt may succeed
pub trait RetryableError {
    fn is_transient(&self) -> bool;
}

impl RetryableError for RequestError {
    fn is_transient(&self) -> bool {
        matches!(self, RequestError::Transport { .. } | RequestError::Timeout { .. })
    }
}

/// Run `operation` until it succeeds, fails permanently, or the backoff runs out
pub async fn with_retry<T, E, F, Fut>(
    config: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: RetryableError + std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut delays = config.backoff();
    let mut attempt = 1u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_transient() {
            debug!(operation = operation_name, attempt, "Permanent failure: {}", err);
            return Err(err);
        }

        let Some(delay) = delays.next() else {
            if config.max_retries > 0 {
                warn!(
                    operation = operation_name,
                    retries = config.max_retries,
                    "Giving up: {}",
                    err
                );
            }
            return Err(err);
        };

        warn!(
            operation = operation_name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "Transient failure, retrying: {}",
            err
        );
        tokio::time::sleep(delay).await;
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn quick(max_retries: u32) -> RetryConfig {
        RetryConfig {
            max_retries,
            initial_delay_ms: 1,
            max_delay_ms: 1,
            jitter: false,
            ..Default::default()
        }
    }

    #[test]
    fn test_backoff_grows_and_caps() {
        let config = RetryConfig {
            max_retries: 6,
            initial_delay_ms: 1000,
            backoff_multiplier: 2.0,
            max_delay_ms: 30_000,
            jitter: false,
        };

        let delays: Vec<u64> = config.backoff().map(|d| d.as_millis() as u64).collect();
        assert_eq!(delays, vec![1000, 2000, 4000, 8000, 16000, 30000]);
        assert_eq!(RetryConfig::no_retry().backoff().count(), 0);
    }

    #[test]
    fn test_merge_only_touches_set_keys() {
        let mut config = RetryConfig::default();
        let layer: RetryConfigLayer =
            serde_json::from_str(r#"{ "maxRetries": 7, "jitter": false }"#).unwrap();

        config.merge(layer);

        assert_eq!(config.max_retries, 7);
        assert!(!config.jitter);
        assert_eq!(config.initial_delay_ms, 500);
        assert_eq!(config.max_delay_ms, 10_000);
    }

    #[test]
    fn test_jitter_stays_in_band() {
        let config = RetryConfig {
            max_retries: 50,
            initial_delay_ms: 1000,
            backoff_multiplier: 1.0,
            ..Default::default()
        };

        for delay in config.backoff() {
            let ms = delay.as_millis() as u64;
            assert!((800..=1200).contains(&ms), "delay {}ms out of band", ms);
        }
    }

    #[test]
    fn test_transient_classification() {
        assert!(RequestError::transport("reset").is_transient());
        assert!(RequestError::Timeout { timeout_ms: 1 }.is_transient());
        assert!(!RequestError::Cancelled.is_transient());
        assert!(!RequestError::Offline.is_transient());
        assert!(!RequestError::Setup("bad url".into()).is_transient());
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);

        let result = with_retry(&quick(3), "test", || {
            let n = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(RequestError::transport("reset"))
                } else {
                    Ok(n)
                }
            }
        })
        .await;

        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_budget() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&quick(2), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RequestError::Timeout { timeout_ms: 10 }) }
        })
        .await;

        assert_eq!(result, Err(RequestError::Timeout { timeout_ms: 10 }));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancellation_is_never_retried() {
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = with_retry(&quick(5), "test", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(RequestError::Cancelled) }
        })
        .await;

        assert_eq!(result, Err(RequestError::Cancelled));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
