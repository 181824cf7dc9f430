//! Wire and result types for the case-law database.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Read an explicit `null` as the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept an expanded docket object; a docket URL, `null` or any other
/// shape leaves the court fields empty.
fn lenient_docket<'de, D>(deserializer: D) -> Result<DocketRef, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(|v| serde_json::from_value(v).ok())
        .unwrap_or_default())
}

/// One queried citation as answered by `/citation-lookup/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationMatch {
    #[serde(default, deserialize_with = "null_as_default")]
    pub citation: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub normalized_citations: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub start_index: usize,
    #[serde(default, deserialize_with = "null_as_default")]
    pub end_index: usize,
    /// 200 = found, 404 = not found
    pub status: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error_message: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub clusters: Vec<ClusterData>,
}

impl CitationMatch {
    /// Found upstream with at least one case attached.
    pub fn is_verified(&self) -> bool {
        self.status == 200 && !self.clusters.is_empty()
    }
}

/// One case record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusterData {
    #[serde(default, deserialize_with = "null_as_default")]
    pub absolute_url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub case_name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub case_name_short: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub date_filed: String,
    #[serde(default, deserialize_with = "lenient_docket")]
    pub docket: DocketRef,
    #[serde(default, deserialize_with = "null_as_default")]
    pub citations: Vec<CitationRef>,
}

impl ClusterData {
    pub fn court(&self) -> &str {
        &self.docket.court
    }

    pub fn court_id(&self) -> &str {
        &self.docket.court_id
    }
}

/// Court information attached to a cluster.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocketRef {
    #[serde(default, deserialize_with = "null_as_default")]
    pub court: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub court_id: String,
}

/// A parallel citation of a cluster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CitationRef {
    #[serde(default)]
    pub volume: Value,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reporter: String,
    #[serde(default)]
    pub page: Value,
}

/// Extracted text of one sub-opinion (lead, dissent, concurrence, combined).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpinionText {
    pub opinion_id: u64,
    /// e.g. "010combined", "020lead", "030concurrence", "040dissent"
    #[serde(rename = "type")]
    pub opinion_type: String,
    pub plain_text: String,
    pub cluster_id: u64,
}

/// Outcome of a citation lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupResponse {
    Ok { matches: Vec<CitationMatch> },
    RateLimited { retry_after_ms: u64 },
    Error { code: String, message: String },
}

/// Outcome of a cluster opinion fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum OpinionTextResponse {
    Ok { opinions: Vec<OpinionText> },
    RateLimited { retry_after_ms: u64 },
    Error { code: String, message: String },
    NotFound,
}
