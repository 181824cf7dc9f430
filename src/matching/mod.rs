//! Quote matching against opinion text.
//!
//! Both sides are normalized with [`normalize_text`] so typographic variance
//! (curly quotes, dashes, non-breaking spaces, line wrapping) never affects
//! the score. The score is the partial ratio of the quote against the whole
//! opinion; the excerpt is located separately with a sliding window.

pub mod similarity;

use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::Serialize;

use crate::client::OpinionText;
use similarity::{partial_ratio, ratio};

/// Scores at or above this are `high`.
pub const HIGH_THRESHOLD: u8 = 90;
/// Scores at or above this are `medium`; below is `low`.
pub const MEDIUM_THRESHOLD: u8 = 70;
/// Quotes shorter than this (normalized chars) carry a warning.
pub const SHORT_QUOTE_CHARS: usize = 20;

/// Opinions longer than this are searched paragraph by paragraph.
const LARGE_OPINION_CHARS: usize = 50_000;
const MIN_PARAGRAPH_CHARS: usize = 10;
const CONTEXT_CHARS: usize = 50;

/// Confidence band of a match score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    High,
    Medium,
    Low,
}

impl Classification {
    pub fn from_score(score: u8) -> Self {
        if score >= HIGH_THRESHOLD {
            Classification::High
        } else if score >= MEDIUM_THRESHOLD {
            Classification::Medium
        } else {
            Classification::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::High => "high",
            Classification::Medium => "medium",
            Classification::Low => "low",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Match of a quote against one opinion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    /// 0-100
    pub score: u8,
    pub classification: Classification,
    /// Best-matching passage with surrounding context
    pub best_match_excerpt: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub short_quote_warning: bool,
}

/// Best match across a cluster's opinions.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BestMatchResult {
    #[serde(flatten)]
    pub result: MatchResult,
    pub matched_opinion_id: u64,
    pub matched_opinion_type: String,
}

/// Straighten quotes and dashes, convert non-breaking spaces, collapse
/// whitespace runs and trim.
pub fn normalize_text(text: &str) -> String {
    let mapped: String = text
        .chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' => '\'',
            '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\u{00A0}' => ' ',
            other => other,
        })
        .collect();
    mapped.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn paragraph_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n[ \t\r\x{00A0}]*\n").expect("valid paragraph pattern"))
}

/// Score `quote` against one opinion's raw text.
pub fn match_quote_in_opinion(quote: &str, opinion_text: &str) -> MatchResult {
    let normalized_quote = normalize_text(quote);
    let normalized_opinion = normalize_text(opinion_text);
    let short_quote_warning = normalized_quote.chars().count() < SHORT_QUOTE_CHARS;

    let score = partial_ratio(&normalized_quote, &normalized_opinion);
    let best_match_excerpt = extract_excerpt(&normalized_quote, opinion_text, &normalized_opinion);

    MatchResult {
        score,
        classification: Classification::from_score(score),
        best_match_excerpt,
        short_quote_warning,
    }
}

/// Score `quote` against every opinion and keep the best.
///
/// Ties keep the earlier opinion. Returns `None` for an empty slice.
pub fn match_quote_across_opinions(quote: &str, opinions: &[OpinionText]) -> Option<BestMatchResult> {
    let mut best: Option<BestMatchResult> = None;

    for opinion in opinions {
        let result = match_quote_in_opinion(quote, &opinion.plain_text);
        let better = best.as_ref().map_or(true, |b| result.score > b.result.score);
        if better {
            best = Some(BestMatchResult {
                result,
                matched_opinion_id: opinion.opinion_id,
                matched_opinion_type: opinion.opinion_type.clone(),
            });
        }
    }

    best
}

/// Locate the best excerpt. Large opinions are narrowed to their best
/// paragraph first.
fn extract_excerpt(normalized_quote: &str, raw_opinion: &str, normalized_opinion: &str) -> String {
    if normalized_opinion.chars().count() <= LARGE_OPINION_CHARS {
        let chunk: Vec<char> = normalized_opinion.chars().collect();
        return excerpt_from_chunk(normalized_quote, &chunk);
    }

    let mut best_score = 0u8;
    let mut best_paragraph: Option<String> = None;
    for paragraph in paragraph_break().split(raw_opinion) {
        let paragraph = normalize_text(paragraph);
        if paragraph.chars().count() < MIN_PARAGRAPH_CHARS {
            continue;
        }
        let score = partial_ratio(normalized_quote, &paragraph);
        if best_paragraph.is_none() || score > best_score {
            best_score = score;
            best_paragraph = Some(paragraph);
        }
    }

    let chunk: Vec<char> = best_paragraph
        .as_deref()
        .unwrap_or(normalized_opinion)
        .chars()
        .collect();
    excerpt_from_chunk(normalized_quote, &chunk)
}

/// Sliding-window search: coarse pass at a quarter-window stride, then a
/// unit-stride refinement around the best coarse position.
fn excerpt_from_chunk(normalized_quote: &str, chunk: &[char]) -> String {
    if chunk.is_empty() {
        return String::new();
    }

    let window = normalized_quote.chars().count().min(chunk.len());
    let step = (window / 4).max(1);
    let last_start = chunk.len() - window;
    let score_at = |pos: usize| -> u8 {
        let candidate: String = chunk[pos..pos + window].iter().collect();
        ratio(normalized_quote, &candidate)
    };

    let mut best_score = 0u8;
    let mut best_pos = 0usize;

    for pos in (0..=last_start).step_by(step) {
        let score = score_at(pos);
        if score > best_score {
            best_score = score;
            best_pos = pos;
        }
    }

    let refine_start = best_pos.saturating_sub(step);
    let refine_end = (best_pos + step).min(last_start);
    for pos in refine_start..=refine_end {
        let score = score_at(pos);
        if score > best_score {
            best_score = score;
            best_pos = pos;
        }
    }

    let start = best_pos.saturating_sub(CONTEXT_CHARS);
    let end = (best_pos + window + CONTEXT_CHARS).min(chunk.len());
    chunk[start..end].iter().collect()
}
