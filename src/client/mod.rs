//! Case-law database access.
//!
//! Provides a trait-based interface over the upstream database:
//! - CourtListener REST API
//! - Scripted mock for testing

pub mod courtlistener;
pub mod mock;
pub mod types;

use async_trait::async_trait;

pub use courtlistener::{CourtListenerClient, DEFAULT_BASE_URL};
pub use mock::MockCaseLawApi;
pub use types::{
    CitationMatch, CitationRef, ClusterData, DocketRef, LookupResponse, OpinionText,
    OpinionTextResponse,
};

/// Upstream operations the verifiers depend on.
///
/// Implementations never fail with an error: every outcome, including
/// transport problems, is expressed in the response enums.
#[async_trait]
pub trait CaseLawApi: Send + Sync {
    /// Look up one normalized citation.
    async fn lookup_citation(&self, normalized: &str) -> LookupResponse;

    /// Fetch the text of every sub-opinion in a cluster.
    async fn fetch_cluster_opinions(&self, cluster_id: u64) -> OpinionTextResponse;
}
