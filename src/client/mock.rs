//! Scripted case-law database for testing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;

use super::types::*;
use super::CaseLawApi;

/// Mock database.
///
/// Lookups answer from a per-citation script; unscripted citations come back
/// as status 404 matches. Unscripted clusters are `NotFound`.
#[derive(Default)]
pub struct MockCaseLawApi {
    lookups: Mutex<HashMap<String, LookupResponse>>,
    opinions: Mutex<HashMap<u64, OpinionTextResponse>>,
    lookup_calls: AtomicU32,
    opinion_calls: AtomicU32,
}

impl MockCaseLawApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the response for a normalized citation.
    pub fn with_lookup(self, normalized: impl Into<String>, response: LookupResponse) -> Self {
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(normalized.into(), response);
        self
    }

    /// Script the response for a cluster id.
    pub fn with_opinions(self, cluster_id: u64, response: OpinionTextResponse) -> Self {
        self.opinions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(cluster_id, response);
        self
    }

    /// Number of times lookup_citation was called.
    pub fn lookup_calls(&self) -> u32 {
        self.lookup_calls.load(Ordering::SeqCst)
    }

    /// Number of times fetch_cluster_opinions was called.
    pub fn opinion_calls(&self) -> u32 {
        self.opinion_calls.load(Ordering::SeqCst)
    }

    pub fn reset_call_counts(&self) {
        self.lookup_calls.store(0, Ordering::SeqCst);
        self.opinion_calls.store(0, Ordering::SeqCst);
    }

    /// A found citation with a single cluster.
    pub fn verified_match(
        normalized: &str,
        cluster_id: u64,
        case_name: &str,
        court: &str,
        date_filed: &str,
    ) -> CitationMatch {
        CitationMatch {
            citation: normalized.to_string(),
            normalized_citations: vec![normalized.to_string()],
            start_index: 0,
            end_index: normalized.len(),
            status: 200,
            error_message: String::new(),
            clusters: vec![Self::cluster(cluster_id, case_name, court, date_filed)],
        }
    }

    /// A citation upstream does not know.
    pub fn not_found_match(normalized: &str) -> CitationMatch {
        CitationMatch {
            citation: normalized.to_string(),
            normalized_citations: vec![],
            start_index: 0,
            end_index: normalized.len(),
            status: 404,
            error_message: "Citation not found".to_string(),
            clusters: vec![],
        }
    }

    /// A cluster record whose URL carries `cluster_id`.
    pub fn cluster(cluster_id: u64, case_name: &str, court: &str, date_filed: &str) -> ClusterData {
        let slug = case_name
            .to_lowercase()
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("-");
        ClusterData {
            absolute_url: format!("/opinion/{}/{}/", cluster_id, slug),
            case_name: case_name.to_string(),
            case_name_short: String::new(),
            date_filed: date_filed.to_string(),
            docket: DocketRef {
                court: court.to_string(),
                court_id: String::new(),
            },
            citations: vec![],
        }
    }

    /// One sub-opinion's text.
    pub fn opinion(cluster_id: u64, opinion_id: u64, opinion_type: &str, text: &str) -> OpinionText {
        OpinionText {
            opinion_id,
            opinion_type: opinion_type.to_string(),
            plain_text: text.to_string(),
            cluster_id,
        }
    }
}

#[async_trait]
impl CaseLawApi for MockCaseLawApi {
    async fn lookup_citation(&self, normalized: &str) -> LookupResponse {
        self.lookup_calls.fetch_add(1, Ordering::SeqCst);
        self.lookups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(normalized)
            .cloned()
            .unwrap_or_else(|| LookupResponse::Ok {
                matches: vec![Self::not_found_match(normalized)],
            })
    }

    async fn fetch_cluster_opinions(&self, cluster_id: u64) -> OpinionTextResponse {
        self.opinion_calls.fetch_add(1, Ordering::SeqCst);
        self.opinions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&cluster_id)
            .cloned()
            .unwrap_or(OpinionTextResponse::NotFound)
    }
}
