//! Configuration for LexCerta
//!
//! CLI arguments and environment variable handling using clap.

use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};

use crate::client::DEFAULT_BASE_URL;
use crate::error::ConfigError;
use crate::resilience::{BreakerConfig, PolicyConfig, RateLimiterConfig};

/// LexCerta - legal citation and quotation verification
#[derive(Parser, Debug, Clone)]
#[command(name = "lexcerta")]
#[command(about = "Verify legal citations and quotations against CourtListener")]
pub struct Args {
    /// CourtListener API token (required for verification commands)
    #[arg(long, env = "COURTLISTENER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// CourtListener REST API root
    #[arg(long, env = "COURTLISTENER_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Log output format
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    /// Per-attempt timeout for upstream calls
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "5000")]
    pub request_timeout_ms: u64,

    /// Retries after the first attempt on transient failures
    #[arg(long, env = "MAX_RETRIES", default_value = "2")]
    pub max_retries: u32,

    /// First retry backoff
    #[arg(long, env = "RETRY_INITIAL_DELAY_MS", default_value = "500")]
    pub retry_initial_delay_ms: u64,

    /// Retry backoff ceiling
    #[arg(long, env = "RETRY_MAX_DELAY_MS", default_value = "3000")]
    pub retry_max_delay_ms: u64,

    /// Consecutive failures that open the circuit breaker
    #[arg(long, env = "BREAKER_THRESHOLD", default_value = "5")]
    pub breaker_threshold: u32,

    /// Time the breaker stays open before a trial call
    #[arg(long, env = "BREAKER_COOLDOWN_MS", default_value = "30000")]
    pub breaker_cooldown_ms: u64,

    /// Request budget per refill interval (90% of the upstream 5,000/hour)
    #[arg(long, env = "RATE_LIMIT_TOKENS", default_value = "4500")]
    pub rate_limit_tokens: u32,

    /// Interval over which the full budget refills
    #[arg(long, env = "RATE_LIMIT_INTERVAL_MS", default_value = "3600000")]
    pub rate_limit_interval_ms: u64,

    /// Citation lookup cache capacity
    #[arg(long, env = "CITATION_CACHE_SIZE", default_value = "1000")]
    pub citation_cache_size: usize,

    /// Opinion text cache capacity
    #[arg(long, env = "OPINION_CACHE_SIZE", default_value = "200")]
    pub opinion_cache_size: usize,

    #[command(subcommand)]
    pub command: Command,
}

/// Tool to run.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Parse and normalize a citation (no network)
    Parse { citation: String },

    /// Check that a citation refers to a real case
    VerifyCitation { citation: String },

    /// Check that a quoted passage appears in the cited opinion
    VerifyQuote { citation: String, text: String },
}

impl Command {
    /// Whether the command talks to CourtListener.
    pub fn needs_network(&self) -> bool {
        !matches!(self, Command::Parse { .. })
    }
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl Args {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.command.needs_network() && self.api_key().is_none() {
            return Err(ConfigError::Missing("COURTLISTENER_API_KEY"));
        }

        let non_zero: [(&'static str, u64); 6] = [
            ("REQUEST_TIMEOUT_MS", self.request_timeout_ms),
            ("BREAKER_THRESHOLD", self.breaker_threshold as u64),
            ("RATE_LIMIT_TOKENS", self.rate_limit_tokens as u64),
            ("RATE_LIMIT_INTERVAL_MS", self.rate_limit_interval_ms),
            ("CITATION_CACHE_SIZE", self.citation_cache_size as u64),
            ("OPINION_CACHE_SIZE", self.opinion_cache_size as u64),
        ];
        if let Some(&(field, _)) = non_zero.iter().find(|(_, value)| *value == 0) {
            return Err(ConfigError::Zero { field });
        }

        if self.retry_max_delay_ms < self.retry_initial_delay_ms {
            return Err(ConfigError::Invalid(
                "RETRY_MAX_DELAY_MS must be greater than or equal to RETRY_INITIAL_DELAY_MS"
                    .to_string(),
            ));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::Invalid(format!(
                "COURTLISTENER_BASE_URL must be an http(s) URL, got {}",
                self.base_url
            )));
        }

        Ok(())
    }

    /// Non-blank API key.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }

    pub fn policy_config(&self) -> PolicyConfig {
        PolicyConfig {
            timeout: Duration::from_millis(self.request_timeout_ms),
            max_retries: self.max_retries,
            initial_delay: Duration::from_millis(self.retry_initial_delay_ms),
            max_delay: Duration::from_millis(self.retry_max_delay_ms),
            breaker: BreakerConfig {
                failure_threshold: self.breaker_threshold,
                cooldown: Duration::from_millis(self.breaker_cooldown_ms),
            },
        }
    }

    pub fn rate_limiter_config(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            max_tokens: self.rate_limit_tokens,
            refill_interval: Duration::from_millis(self.rate_limit_interval_ms),
        }
    }
}
