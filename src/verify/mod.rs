//! Verification service.
//!
//! [`Verifier`] owns the shared collaborators (database client and both
//! caches) and exposes the three tools. Every call answers with a
//! [`ToolResponseEnvelope`]; nothing here returns `Err`.

pub mod citation;
pub mod envelope;
pub mod quote;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;
use uuid::Uuid;

use crate::cache::{CacheStats, CitationCache, OpinionCache};
use crate::client::CaseLawApi;
use crate::parser::parse_citation;

pub use envelope::{EnvelopeError, ErrorCode, ToolContent, ToolResponse, ToolResponseEnvelope};

/// Tool names as exposed to a protocol front-end.
pub const TOOL_PARSE_CITATION: &str = "parse_citation";
pub const TOOL_VERIFY_CITATION: &str = "verify_west_citation";
pub const TOOL_VERIFY_QUOTE: &str = "verify_quote_integrity";

/// Input of `parse_citation` and `verify_west_citation`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyCitationInput {
    pub citation: String,
}

impl VerifyCitationInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.citation.trim().is_empty() {
            return Err("citation must not be empty".to_string());
        }
        Ok(())
    }
}

/// Input of `verify_quote_integrity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyQuoteInput {
    pub citation: String,
    pub text: String,
}

impl VerifyQuoteInput {
    pub fn validate(&self) -> Result<(), String> {
        if self.citation.trim().is_empty() {
            return Err("citation must not be empty".to_string());
        }
        if self.text.trim().is_empty() {
            return Err("text must not be empty".to_string());
        }
        Ok(())
    }
}

/// Statistics of both caches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifierCacheStats {
    pub citation: CacheStats,
    pub opinion: CacheStats,
}

/// Citation and quote verification service.
#[derive(Clone)]
pub struct Verifier {
    api: Arc<dyn CaseLawApi>,
    citation_cache: Arc<CitationCache>,
    opinion_cache: Arc<OpinionCache>,
}

impl Verifier {
    /// Create a verifier with default-sized caches.
    pub fn new(api: Arc<dyn CaseLawApi>) -> Self {
        Self::with_caches(
            api,
            Arc::new(CitationCache::default()),
            Arc::new(OpinionCache::default()),
        )
    }

    /// Create a verifier sharing the given caches.
    pub fn with_caches(
        api: Arc<dyn CaseLawApi>,
        citation_cache: Arc<CitationCache>,
        opinion_cache: Arc<OpinionCache>,
    ) -> Self {
        Self {
            api,
            citation_cache,
            opinion_cache,
        }
    }

    /// Parse and normalize a citation. Never touches the network.
    pub fn parse_citation(&self, citation: &str) -> ToolResponseEnvelope {
        parse_citation_tool(citation)
    }

    /// Check that a citation refers to a real case.
    pub async fn verify_citation(&self, citation: &str) -> ToolResponseEnvelope {
        let request_id = Uuid::new_v4().to_string();
        info!(request_id = %request_id, citation = %citation, "Verifying citation");

        let envelope =
            citation::verify_citation(self.api.as_ref(), &self.citation_cache, citation).await;

        log_outcome(&request_id, &envelope);
        envelope
    }

    /// Check that a quoted passage appears in the cited opinion.
    pub async fn verify_quote(&self, citation: &str, text: &str) -> ToolResponseEnvelope {
        let request_id = Uuid::new_v4().to_string();
        info!(
            request_id = %request_id,
            citation = %citation,
            quote_chars = text.chars().count(),
            "Verifying quote"
        );

        let envelope = quote::verify_quote(
            self.api.as_ref(),
            &self.citation_cache,
            &self.opinion_cache,
            citation,
            text,
        )
        .await;

        log_outcome(&request_id, &envelope);
        envelope
    }

    /// Dispatch a tool call by name with JSON arguments.
    pub async fn call_tool(&self, name: &str, arguments: Value) -> ToolResponseEnvelope {
        match name {
            TOOL_PARSE_CITATION => match decode::<VerifyCitationInput>(arguments) {
                Ok(input) => self.parse_citation(&input.citation),
                Err(envelope) => envelope,
            },
            TOOL_VERIFY_CITATION => match decode::<VerifyCitationInput>(arguments) {
                Ok(input) => match input.validate() {
                    Ok(()) => self.verify_citation(&input.citation).await,
                    Err(message) => ToolResponseEnvelope::invalid_input(message),
                },
                Err(envelope) => envelope,
            },
            TOOL_VERIFY_QUOTE => match decode::<VerifyQuoteInput>(arguments) {
                Ok(input) => match input.validate() {
                    Ok(()) => self.verify_quote(&input.citation, &input.text).await,
                    Err(message) => ToolResponseEnvelope::invalid_input(message),
                },
                Err(envelope) => envelope,
            },
            other => ToolResponseEnvelope::invalid_input(format!("Unknown tool: {}", other)),
        }
    }

    /// Drop all cached entries and counters.
    pub fn reset(&self) {
        self.citation_cache.clear();
        self.opinion_cache.clear();
        info!("Verifier caches cleared");
    }

    pub fn cache_stats(&self) -> VerifierCacheStats {
        VerifierCacheStats {
            citation: self.citation_cache.stats(),
            opinion: self.opinion_cache.stats(),
        }
    }
}

/// The `parse_citation` tool.
pub fn parse_citation_tool(citation: &str) -> ToolResponseEnvelope {
    match parse_citation(citation) {
        Ok(parsed) => ToolResponseEnvelope::valid(json!({
            "volume": parsed.volume,
            "reporter": parsed.reporter,
            "page": parsed.page,
            "normalized": parsed.normalized,
        })),
        Err(e) => ToolResponseEnvelope::parse_error(e.message),
    }
}

fn decode<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, ToolResponseEnvelope> {
    serde_json::from_value(arguments)
        .map_err(|e| ToolResponseEnvelope::invalid_input(format!("Invalid arguments: {}", e)))
}

fn log_outcome(request_id: &str, envelope: &ToolResponseEnvelope) {
    match envelope.error_code() {
        None => info!(request_id = %request_id, valid = envelope.valid, "Verification complete"),
        Some(code) => info!(
            request_id = %request_id,
            valid = envelope.valid,
            code = code.as_str(),
            "Verification complete"
        ),
    }
}
