//! LexCerta - citation and quotation verification
//!
//! Guards against fabricated legal references by checking citations and
//! quoted passages against the CourtListener case-law database.
//!
//! ## Pipeline
//!
//! ```text
//!  citation ──► parser ──► CitationCache ──► CaseLawApi::lookup_citation
//!                              │                    │
//!                              │          RateLimiter ─► ExecutionPolicy
//!                              ▼                    │   (retry ► breaker ► timeout)
//!  quote ─────────────► OpinionCache ──► CaseLawApi::fetch_cluster_opinions
//!                              │
//!                              ▼
//!                          matching ──► ToolResponseEnvelope
//! ```
//!
//! - **Parser**: raw string to canonical `volume reporter page`
//! - **Resilience**: token bucket, circuit breaker, retry with backoff
//! - **Client**: CourtListener REST calls translated into typed outcomes
//! - **Cache**: bounded LRU caches for lookups and opinion text
//! - **Matching**: approximate quote alignment against opinion text
//! - **Verify**: the orchestrators producing tool response envelopes

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod matching;
pub mod parser;
pub mod resilience;
pub mod verify;

pub use cache::{CacheStats, CitationCache, OpinionCache};
pub use client::{CaseLawApi, CourtListenerClient, LookupResponse, OpinionTextResponse};
pub use config::Args;
pub use error::{CallFailure, CitationParseError, ConfigError, PolicyError};
pub use parser::{parse_citation, ParsedCitation};
pub use verify::{ToolResponse, ToolResponseEnvelope, Verifier};
