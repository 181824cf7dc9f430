//! Execution policy for outbound calls.
//!
//! Composition, outermost first: retry ► circuit breaker ► timeout ► call.
//! Every attempt re-enters the breaker and is individually time-bounded.
//! Only breaker-eligible failures (see [`CallFailure::is_breaker_eligible`])
//! are retried or counted; everything else is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use super::circuit_breaker::{BreakerConfig, CircuitBreaker, CircuitState};
use crate::error::{CallFailure, PolicyError};

/// Execution policy configuration
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Per-attempt timeout (default: 5s)
    pub timeout: Duration,
    /// Retries after the first attempt (default: 2)
    pub max_retries: u32,
    /// First backoff delay (default: 500ms)
    pub initial_delay: Duration,
    /// Backoff ceiling (default: 3s)
    pub max_delay: Duration,
    /// Breaker settings
    pub breaker: BreakerConfig,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            max_retries: 2,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(3),
            breaker: BreakerConfig::default(),
        }
    }
}

/// Retry, breaker and timeout around a single outbound call.
#[derive(Debug)]
pub struct ExecutionPolicy {
    config: PolicyConfig,
    breaker: CircuitBreaker,
}

impl ExecutionPolicy {
    pub fn new(name: impl Into<String>, config: PolicyConfig) -> Self {
        let breaker = CircuitBreaker::new(name, config.breaker.clone());
        Self { config, breaker }
    }

    /// Current breaker state.
    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Backoff before retry number `attempt + 1`.
    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt);
        self.config
            .initial_delay
            .saturating_mul(factor)
            .min(self.config.max_delay)
    }

    /// Run `op` under the policy. `op` is invoked once per attempt.
    pub async fn execute<T, F, Fut>(&self, mut op: F) -> Result<T, PolicyError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CallFailure>>,
    {
        let timeout_ms = self.config.timeout.as_millis() as u64;
        let mut attempt = 0u32;

        loop {
            let permit = self.breaker.acquire()?;

            let outcome = match tokio::time::timeout(self.config.timeout, op()).await {
                Ok(result) => result,
                Err(_) => Err(CallFailure::Timeout(timeout_ms)),
            };

            match outcome {
                Ok(value) => {
                    permit.success();
                    return Ok(value);
                }
                Err(failure) if failure.is_breaker_eligible() => {
                    permit.failure();
                    if attempt >= self.config.max_retries {
                        warn!(attempts = attempt + 1, error = %failure, "Retries exhausted");
                        return Err(PolicyError::Failed(failure));
                    }

                    let delay = self.backoff(attempt);
                    attempt += 1;
                    debug!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %failure,
                        "Retrying after transient failure"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(failure) => {
                    // Upstream answered; it is healthy even if the answer is a refusal
                    permit.success();
                    return Err(PolicyError::Failed(failure));
                }
            }
        }
    }
}
