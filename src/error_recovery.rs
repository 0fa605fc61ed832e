//! Timeout and bounded-retry wrapper around model calls
//!
//! Every attempt races the operation against `tokio::time::timeout`; a losing
//! future is simply dropped. The executor records the phases it walks through
//! so callers (and tests) can tell a first-try success from a recovered one.

use crate::models::AppError;
use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

/// Retry configuration
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Extra attempts after the first one
    pub max_retries: u32,
    /// Per-attempt deadline; `None` waits indefinitely
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 1,
            attempt_timeout: Some(Duration::from_secs(90)),
        }
    }
}

/// Delay between attempts
#[derive(Debug, Clone)]
pub enum RetryStrategy {
    /// Fixed delay
    Fixed(Duration),
    /// Exponential backoff
    ExponentialBackoff {
        base_delay: Duration,
        max_delay: Duration,
        multiplier: f64,
    },
}

impl Default for RetryStrategy {
    fn default() -> Self {
        Self::ExponentialBackoff {
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_millis(5000),
            multiplier: 2.0,
        }
    }
}

/// Phases of one generation request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationPhase {
    Idle,
    Requesting,
    TimedOut,
    Retrying,
    Succeeded,
    Failed,
}

/// Outcome of an executed operation plus the path it took
#[derive(Debug)]
pub struct Attempted<T> {
    pub result: Result<T, AppError>,
    pub attempts: u32,
    pub phases: Vec<GenerationPhase>,
}

impl<T> Attempted<T> {
    pub fn into_result(self) -> Result<T, AppError> {
        self.result
    }

    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    pub fn timed_out(&self) -> bool {
        self.phases.contains(&GenerationPhase::TimedOut)
    }
}

/// Retry executor
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    config: RetryConfig,
    strategy: RetryStrategy,
}

impl RetryExecutor {
    pub fn new(config: RetryConfig, strategy: RetryStrategy) -> Self {
        Self { config, strategy }
    }

    pub fn with_default_config() -> Self {
        Self {
            config: RetryConfig::default(),
            strategy: RetryStrategy::default(),
        }
    }

    /// Single attempt with a deadline
    pub fn single_attempt(attempt_timeout: Duration) -> Self {
        Self::new(
            RetryConfig {
                max_retries: 0,
                attempt_timeout: Some(attempt_timeout),
            },
            RetryStrategy::Fixed(Duration::ZERO),
        )
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error, or
    /// the attempts run out. The last error is returned unchanged.
    pub async fn execute_async<F, Fut, T>(&self, label: &str, mut operation: F) -> Attempted<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        let total = self.config.max_retries + 1;
        let mut phases = vec![GenerationPhase::Idle];
        let mut attempt = 0;

        loop {
            attempt += 1;
            phases.push(GenerationPhase::Requesting);

            let outcome = match self.config.attempt_timeout {
                Some(limit) => match timeout(limit, operation()).await {
                    Ok(result) => result,
                    Err(_) => Err(AppError::timeout(format!(
                        "{} excedió el tiempo límite de {}s",
                        label,
                        limit.as_secs()
                    ))),
                },
                None => operation().await,
            };

            let err = match outcome {
                Ok(value) => {
                    if attempt > 1 {
                        info!("[ErrorRecovery] {} succeeded on attempt {}", label, attempt);
                    }
                    phases.push(GenerationPhase::Succeeded);
                    return Attempted {
                        result: Ok(value),
                        attempts: attempt,
                        phases,
                    };
                }
                Err(err) => err,
            };

            phases.push(if err.is_timeout() {
                GenerationPhase::TimedOut
            } else {
                GenerationPhase::Failed
            });
            warn!(
                "[ErrorRecovery] {} failed (attempt {}/{}): {}",
                label, attempt, total, err
            );

            if attempt >= total || !err.is_retryable() {
                if phases.last() != Some(&GenerationPhase::Failed) {
                    phases.push(GenerationPhase::Failed);
                }
                return Attempted {
                    result: Err(err),
                    attempts: attempt,
                    phases,
                };
            }

            let delay = self.calculate_delay(attempt - 1);
            info!("[ErrorRecovery] retrying {} in {:?}", label, delay);
            phases.push(GenerationPhase::Retrying);
            sleep(delay).await;
        }
    }

    fn calculate_delay(&self, retry: u32) -> Duration {
        match &self.strategy {
            RetryStrategy::Fixed(delay) => *delay,
            RetryStrategy::ExponentialBackoff {
                base_delay,
                max_delay,
                multiplier,
            } => {
                let delay_ms = (base_delay.as_millis() as f64 * multiplier.powi(retry as i32)) as u64;
                Duration::from_millis(delay_ms.min(max_delay.as_millis() as u64))
            }
        }
    }
}
