//! Outbound call discipline: rate limiting, retry, circuit breaking.
//!
//! The rate limiter is checked first and never consults the policy; the
//! policy wraps only the network call site.

pub mod circuit_breaker;
pub mod policy;
pub mod rate_limiter;

pub use circuit_breaker::{BreakerConfig, BreakerPermit, CircuitBreaker, CircuitState};
pub use policy::{ExecutionPolicy, PolicyConfig};
pub use rate_limiter::{RateLimiterConfig, TokenBucketRateLimiter};
