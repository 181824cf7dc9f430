//! Quote integrity verification.
//!
//! parse ─► confirm citation (cache-first) ─► cluster id ─► opinion texts
//! (cache-first) ─► fuzzy match. A quote is accepted at a score of 70.

use std::sync::OnceLock;

use regex::Regex;
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use super::citation::{resolve_matches, verified_match};
use super::envelope::{ErrorCode, ToolResponseEnvelope};
use crate::cache::{CachedOpinions, CitationCache, OpinionCache};
use crate::client::{CaseLawApi, OpinionText, OpinionTextResponse};
use crate::matching::{match_quote_across_opinions, MEDIUM_THRESHOLD};
use crate::parser::parse_citation;

const SHORT_QUOTE_WARNING: &str = "Quote is very short (<20 chars). Match score may be unreliable.";

/// Extract the cluster id from a cluster's `absolute_url`,
/// e.g. `/opinion/105221/brown-v-board/` -> `105221`.
pub fn cluster_id_from_url(absolute_url: &str) -> Option<u64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"/opinion/(\d+)/").expect("valid cluster url pattern"));
    re.captures(absolute_url)?.get(1)?.as_str().parse().ok()
}

/// Verify that `text` appears in the opinion cited by `citation`.
pub async fn verify_quote(
    api: &dyn CaseLawApi,
    citation_cache: &CitationCache,
    opinion_cache: &OpinionCache,
    citation: &str,
    text: &str,
) -> ToolResponseEnvelope {
    let parsed = match parse_citation(citation) {
        Ok(parsed) => parsed,
        Err(e) => return ToolResponseEnvelope::parse_error(e.message),
    };

    if text.trim().is_empty() {
        return ToolResponseEnvelope::invalid_input("Quoted text must not be empty.");
    }

    let matches = match resolve_matches(api, citation_cache, &parsed.normalized).await {
        Ok(matches) => matches,
        Err(envelope) => return envelope,
    };

    let Some(cluster) = verified_match(&matches).map(|m| &m.clusters[0]) else {
        info!(citation = %parsed.normalized, "Quote check against unknown citation");
        return ToolResponseEnvelope::invalid(
            Some(json!({ "status": "citation_not_found" })),
            ErrorCode::CitationNotFound,
            "Cannot verify quote: citation not found in CourtListener database.",
            Some(json!({
                "queriedCitation": citation,
                "normalized": parsed.normalized,
            })),
        );
    };

    let Some(cluster_id) = cluster_id_from_url(&cluster.absolute_url) else {
        warn!(url = %cluster.absolute_url, "Cluster URL has no cluster id");
        return ToolResponseEnvelope::api_error(
            "Could not extract cluster ID from CourtListener URL.",
            None,
        );
    };

    let opinions = match load_opinions(api, opinion_cache, cluster_id).await {
        Ok(opinions) => opinions,
        Err(envelope) => return envelope,
    };

    let Some(best) = match_quote_across_opinions(text, &opinions) else {
        info!(citation = %parsed.normalized, cluster_id, "No opinion text for cluster");
        return ToolResponseEnvelope::text_unavailable(json!({
            "queriedCitation": citation,
            "normalized": parsed.normalized,
            "clusterId": cluster_id,
        }));
    };
    let score = best.result.score;
    debug!(
        cluster_id,
        score,
        opinion_id = best.matched_opinion_id,
        "Quote matched"
    );

    let mut metadata = json!({
        "status": "quote_verified",
        "matchScore": score,
        "classification": best.result.classification,
        "bestMatchExcerpt": best.result.best_match_excerpt,
        "matchedOpinionType": best.matched_opinion_type,
        "matchedOpinionId": best.matched_opinion_id,
        "caseName": cluster.case_name,
        "court": cluster.court(),
    });
    if best.result.short_quote_warning {
        if let Value::Object(fields) = &mut metadata {
            fields.insert("warning".to_string(), json!(SHORT_QUOTE_WARNING));
        }
    }

    if score >= MEDIUM_THRESHOLD {
        return ToolResponseEnvelope::valid(metadata);
    }

    info!(citation = %parsed.normalized, score, "Quote not found in opinion");
    ToolResponseEnvelope::invalid(
        Some(metadata),
        ErrorCode::QuoteNotFound,
        format!(
            "Quote does not appear to match the cited opinion (score: {}/100).",
            score
        ),
        Some(json!({
            "bestMatchExcerpt": best.result.best_match_excerpt,
            "matchScore": score,
        })),
    )
}

/// Cache-first opinion fetch. A missing cluster comes back as an empty list
/// and is not cached.
async fn load_opinions(
    api: &dyn CaseLawApi,
    cache: &OpinionCache,
    cluster_id: u64,
) -> Result<Vec<OpinionText>, ToolResponseEnvelope> {
    let opinions = match cache.get(cluster_id) {
        Some(cached) => cached.opinions,
        None => match api.fetch_cluster_opinions(cluster_id).await {
            OpinionTextResponse::Ok { opinions } => {
                cache.set(
                    cluster_id,
                    CachedOpinions {
                        opinions: opinions.clone(),
                    },
                );
                opinions
            }
            OpinionTextResponse::RateLimited { retry_after_ms } => {
                return Err(ToolResponseEnvelope::rate_limited(retry_after_ms));
            }
            OpinionTextResponse::Error { message, .. } => {
                warn!(cluster_id, error = %message, "Opinion fetch unavailable");
                return Err(ToolResponseEnvelope::api_error(
                    "CourtListener API is currently unavailable.",
                    Some(message),
                ));
            }
            OpinionTextResponse::NotFound => {
                debug!(cluster_id, "Cluster not found upstream");
                Vec::new()
            }
        },
    };

    Ok(opinions)
}
