//! Tool response envelope.
//!
//! Every tool answers with exactly three top-level fields: `valid`,
//! `metadata` and `error`. Absent metadata or error serialize as `null`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Machine-readable failure codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Citation string could not be parsed
    ParseError,
    /// Blank tool input
    InvalidInput,
    /// Well-formed citation the database does not know
    HallucinationDetected,
    /// Local budget or upstream 429
    RateLimited,
    /// Upstream unavailable; not a verification outcome
    ApiError,
    /// Quote check could not confirm the citation
    CitationNotFound,
    /// Case exists but no opinion text was retrievable
    TextUnavailable,
    /// Quote scored below the acceptance threshold
    QuoteNotFound,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ParseError => "PARSE_ERROR",
            ErrorCode::InvalidInput => "INVALID_INPUT",
            ErrorCode::HallucinationDetected => "HALLUCINATION_DETECTED",
            ErrorCode::RateLimited => "RATE_LIMITED",
            ErrorCode::ApiError => "API_ERROR",
            ErrorCode::CitationNotFound => "CITATION_NOT_FOUND",
            ErrorCode::TextUnavailable => "TEXT_UNAVAILABLE",
            ErrorCode::QuoteNotFound => "QUOTE_NOT_FOUND",
        }
    }
}

/// The `error` member of an envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvelopeError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponseEnvelope {
    pub valid: bool,
    pub metadata: Option<Value>,
    pub error: Option<EnvelopeError>,
}

impl ToolResponseEnvelope {
    /// Successful outcome.
    pub fn valid(metadata: Value) -> Self {
        Self {
            valid: true,
            metadata: Some(metadata),
            error: None,
        }
    }

    /// Failed outcome.
    pub fn invalid(
        metadata: Option<Value>,
        code: ErrorCode,
        message: impl Into<String>,
        details: Option<Value>,
    ) -> Self {
        Self {
            valid: false,
            metadata,
            error: Some(EnvelopeError {
                code,
                message: message.into(),
                details,
            }),
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::invalid(None, ErrorCode::ParseError, message, None)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::invalid(None, ErrorCode::InvalidInput, message, None)
    }

    pub fn rate_limited(retry_after_ms: u64) -> Self {
        Self::invalid(
            Some(json!({ "status": "rate_limited" })),
            ErrorCode::RateLimited,
            "CourtListener API rate limit reached. Try again later.",
            Some(json!({ "retryAfterMs": retry_after_ms })),
        )
    }

    /// Upstream failure. `detail` is the underlying failure message.
    pub fn api_error(message: impl Into<String>, detail: Option<String>) -> Self {
        Self::invalid(
            Some(json!({ "status": "error" })),
            ErrorCode::ApiError,
            message,
            detail.map(|m| json!({ "message": m })),
        )
    }

    /// The case exists but has no retrievable text. `details` names the
    /// citation and cluster.
    pub fn text_unavailable(details: Value) -> Self {
        Self::invalid(
            Some(json!({ "status": "text_unavailable" })),
            ErrorCode::TextUnavailable,
            "Opinion text not available for this citation.",
            Some(details),
        )
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|e| e.code)
    }

    /// Compact JSON text of the envelope.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// One content item of a tool response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolContent {
    #[serde(rename = "type")]
    pub kind: String,
    pub text: String,
}

/// Tool response as handed to a protocol front-end: the envelope JSON
/// wrapped in a single text content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub content: Vec<ToolContent>,
}

impl ToolResponse {
    pub fn from_envelope(envelope: &ToolResponseEnvelope) -> serde_json::Result<Self> {
        Ok(Self {
            content: vec![ToolContent {
                kind: "text".to_string(),
                text: envelope.to_json()?,
            }],
        })
    }

    /// Decode the wrapped envelope back out.
    pub fn envelope(&self) -> Option<ToolResponseEnvelope> {
        let item = self.content.first()?;
        serde_json::from_str(&item.text).ok()
    }
}
