//! Citation verification.
//!
//! parse ─► citation cache ─► lookup ─► classify. Parse failures never
//! reach the network, and only successful lookups are cached.

use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::envelope::{ErrorCode, ToolResponseEnvelope};
use crate::cache::{CachedLookup, CitationCache};
use crate::client::{CaseLawApi, CitationMatch, ClusterData, LookupResponse};
use crate::parser::parse_citation;

/// Public site root that cluster `absolute_url`s are relative to.
pub const COURTLISTENER_SITE: &str = "https://www.courtlistener.com";

pub(crate) const API_UNAVAILABLE_MESSAGE: &str =
    "CourtListener API is currently unavailable. This is NOT a citation verification failure.";

/// Verify that `citation` refers to a real case.
pub async fn verify_citation(
    api: &dyn CaseLawApi,
    cache: &CitationCache,
    citation: &str,
) -> ToolResponseEnvelope {
    let parsed = match parse_citation(citation) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!(input = %citation, error = %e, "Citation failed to parse");
            return ToolResponseEnvelope::parse_error(e.message);
        }
    };

    match resolve_matches(api, cache, &parsed.normalized).await {
        Ok(matches) => classify_matches(&matches, citation, &parsed.normalized),
        Err(envelope) => envelope,
    }
}

/// Cache-first lookup. Rate-limit and upstream failures come back as the
/// finished envelope.
pub(crate) async fn resolve_matches(
    api: &dyn CaseLawApi,
    cache: &CitationCache,
    normalized: &str,
) -> Result<Vec<CitationMatch>, ToolResponseEnvelope> {
    if let Some(cached) = cache.get(normalized) {
        return Ok(cached.matches);
    }

    match api.lookup_citation(normalized).await {
        LookupResponse::Ok { matches } => {
            cache.set(
                normalized,
                CachedLookup {
                    matches: matches.clone(),
                },
            );
            Ok(matches)
        }
        LookupResponse::RateLimited { retry_after_ms } => {
            Err(ToolResponseEnvelope::rate_limited(retry_after_ms))
        }
        LookupResponse::Error { code, message } => {
            warn!(citation = %normalized, code = %code, error = %message, "Citation lookup unavailable");
            Err(ToolResponseEnvelope::api_error(
                API_UNAVAILABLE_MESSAGE,
                Some(message),
            ))
        }
    }
}

/// First match found upstream with at least one case.
pub(crate) fn verified_match(matches: &[CitationMatch]) -> Option<&CitationMatch> {
    matches.iter().find(|m| m.is_verified())
}

fn cluster_summary(cluster: &ClusterData) -> Value {
    json!({
        "caseName": cluster.case_name,
        "court": cluster.court(),
        "dateFiled": cluster.date_filed,
        "citations": cluster.citations,
        "courtListenerUrl": format!("{}{}", COURTLISTENER_SITE, cluster.absolute_url),
    })
}

/// Turn lookup matches into a verified or hallucination envelope.
fn classify_matches(matches: &[CitationMatch], citation: &str, normalized: &str) -> ToolResponseEnvelope {
    let Some(found) = verified_match(matches) else {
        info!(citation = %normalized, "Citation not found upstream");
        return ToolResponseEnvelope::invalid(
            Some(json!({ "status": "not_found" })),
            ErrorCode::HallucinationDetected,
            format!(
                "Citation \"{}\" not found in CourtListener database. This citation may be fabricated.",
                citation
            ),
            Some(json!({
                "queriedCitation": citation,
                "normalized": normalized,
            })),
        );
    };

    let clusters: Vec<Value> = found.clusters.iter().map(cluster_summary).collect();
    let mut metadata = clusters[0].clone();
    if let Value::Object(fields) = &mut metadata {
        fields.insert("status".to_string(), json!("verified"));
        if clusters.len() > 1 {
            fields.insert("allMatches".to_string(), Value::Array(clusters));
        }
    }

    info!(citation = %normalized, case = %found.clusters[0].case_name, "Citation verified");
    ToolResponseEnvelope::valid(metadata)
}
