//! Consecutive-failure circuit breaker.
//!
//! ```text
//!            N consecutive failures
//!   Closed ─────────────────────────► Open
//!     ▲                               │  cooldown elapsed
//!     │ trial succeeds                ▼
//!     └──────────────────────────── HalfOpen ── trial fails ──► Open
//! ```
//!
//! Callers take a [`BreakerPermit`] before each attempt and resolve it with
//! the outcome. A permit dropped unresolved (cancelled call) releases the
//! half-open trial slot without changing state.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{error, info};

use crate::error::PolicyError;

/// Circuit breaker configuration
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Consecutive failures that open the breaker (default: 5)
    pub failure_threshold: u32,
    /// Time spent open before a trial call is allowed (default: 30s)
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
enum Phase {
    Closed,
    Open { until: Instant },
    HalfOpen { trial_in_flight: bool },
}

#[derive(Debug)]
struct Inner {
    phase: Phase,
    consecutive_failures: u32,
}

/// Shared breaker guarding one upstream.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: BreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(Inner {
                phase: Phase::Closed,
                consecutive_failures: 0,
            }),
        }
    }

    /// Current state. An open breaker whose cooldown has elapsed reports
    /// `HalfOpen` even before the next acquire moves it there.
    pub fn state(&self) -> CircuitState {
        let inner = self.lock();
        match inner.phase {
            Phase::Closed => CircuitState::Closed,
            Phase::Open { until } if Instant::now() >= until => CircuitState::HalfOpen,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Ask to make one attempt. Fails fast while open.
    pub fn acquire(&self) -> Result<BreakerPermit<'_>, PolicyError> {
        let mut inner = self.lock();
        match inner.phase {
            Phase::Closed => Ok(BreakerPermit::new(self, false)),
            Phase::Open { until } => {
                let now = Instant::now();
                if now < until {
                    return Err(PolicyError::CircuitOpen {
                        retry_in_ms: until.duration_since(now).as_millis() as u64,
                    });
                }
                inner.phase = Phase::HalfOpen {
                    trial_in_flight: true,
                };
                info!(breaker = %self.name, "[CIRCUIT] breaker HALF-OPEN");
                Ok(BreakerPermit::new(self, true))
            }
            Phase::HalfOpen {
                trial_in_flight: true,
            } => Err(PolicyError::CircuitOpen { retry_in_ms: 0 }),
            Phase::HalfOpen {
                trial_in_flight: false,
            } => {
                inner.phase = Phase::HalfOpen {
                    trial_in_flight: true,
                };
                Ok(BreakerPermit::new(self, true))
            }
        }
    }

    fn on_success(&self, trial: bool) {
        let mut inner = self.lock();
        match inner.phase {
            Phase::Closed => inner.consecutive_failures = 0,
            Phase::HalfOpen { .. } if trial => {
                inner.phase = Phase::Closed;
                inner.consecutive_failures = 0;
                info!(breaker = %self.name, "[CIRCUIT] breaker CLOSED");
            }
            // Stale permit from before the breaker opened
            _ => {}
        }
    }

    fn on_failure(&self, trial: bool) {
        let mut inner = self.lock();
        match inner.phase {
            Phase::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    self.open(&mut inner);
                }
            }
            Phase::HalfOpen { .. } if trial => self.open(&mut inner),
            _ => {}
        }
    }

    fn on_abandoned(&self, trial: bool) {
        if !trial {
            return;
        }
        let mut inner = self.lock();
        if let Phase::HalfOpen { .. } = inner.phase {
            inner.phase = Phase::HalfOpen {
                trial_in_flight: false,
            };
        }
    }

    fn open(&self, inner: &mut Inner) {
        inner.phase = Phase::Open {
            until: Instant::now() + self.config.cooldown,
        };
        error!(
            breaker = %self.name,
            failures = inner.consecutive_failures,
            cooldown_ms = self.config.cooldown.as_millis() as u64,
            "[CIRCUIT] breaker OPENED"
        );
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Permission for one attempt, resolved with its outcome.
#[must_use = "resolve the permit with success() or failure()"]
pub struct BreakerPermit<'a> {
    breaker: &'a CircuitBreaker,
    trial: bool,
    resolved: bool,
}

impl<'a> BreakerPermit<'a> {
    fn new(breaker: &'a CircuitBreaker, trial: bool) -> Self {
        Self {
            breaker,
            trial,
            resolved: false,
        }
    }

    /// Whether this is the single half-open trial call.
    pub fn is_trial(&self) -> bool {
        self.trial
    }

    /// The attempt completed without a breaker-eligible failure.
    pub fn success(mut self) {
        self.resolved = true;
        self.breaker.on_success(self.trial);
    }

    /// The attempt failed with a breaker-eligible failure.
    pub fn failure(mut self) {
        self.resolved = true;
        self.breaker.on_failure(self.trial);
    }
}

impl Drop for BreakerPermit<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.breaker.on_abandoned(self.trial);
        }
    }
}
