//! Citation parser.
//!
//! Parses strings of the form `<volume> <reporter> <page> [trailing]` into a
//! canonical [`ParsedCitation`].
//!
//! Every standalone integer after the volume is a page candidate. Candidates
//! are tried left to right, treating the text between the volume and the
//! candidate as the reporter, and the first candidate whose reporter
//! normalizes wins. Series suffixes such as the `2d` in `F. Supp. 2d` are not
//! standalone integers, and pin cites (`483, 490`) or parentheticals
//! (`483 (1954)`) resolve to the first candidate.

pub mod reporters;

use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::CitationParseError;

pub use reporters::normalize_reporter;

/// A citation in canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedCitation {
    pub volume: u32,
    /// Canonical Bluebook abbreviation
    pub reporter: String,
    pub page: u32,
    /// Original input
    pub raw: String,
    /// Always `"{volume} {reporter} {page}"`
    pub normalized: String,
}

impl ParsedCitation {
    fn new(volume: u32, reporter: &str, page: u32, raw: &str) -> Self {
        Self {
            volume,
            reporter: reporter.to_string(),
            page,
            raw: raw.to_string(),
            normalized: format!("{} {} {}", volume, reporter, page),
        }
    }
}

fn volume_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\s+").expect("valid volume pattern"))
}

fn page_candidates() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\b(\d+)\b").expect("valid page pattern"))
}

fn loose_shape() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^(\d+)\s+(.+)\s+(\d+)").expect("valid citation pattern"))
}

fn out_of_range(what: &str, digits: &str, input: &str) -> CitationParseError {
    CitationParseError::new(format!("{} out of range: {}", what, digits), input)
}

/// Scan page candidates. A recognized reporter with an unrepresentable
/// volume or page is an error rather than a miss.
fn match_citation(input: &str) -> Result<Option<ParsedCitation>, CitationParseError> {
    let Some(prefix) = volume_prefix().captures(input) else {
        return Ok(None);
    };
    let rest = &input[prefix[0].len()..];
    let mut overflow: Option<CitationParseError> = None;

    for candidate in page_candidates().find_iter(rest) {
        let raw_reporter = rest[..candidate.start()].trim();
        if raw_reporter.is_empty() {
            continue;
        }

        let Some(reporter) = normalize_reporter(raw_reporter) else {
            continue;
        };
        let Ok(volume) = prefix[1].parse::<u32>() else {
            return Err(out_of_range("Volume", &prefix[1], input));
        };
        let Ok(page) = candidate.as_str().parse::<u32>() else {
            overflow.get_or_insert_with(|| out_of_range("Page", candidate.as_str(), input));
            continue;
        };

        return Ok(Some(ParsedCitation::new(volume, reporter, page, input)));
    }

    match overflow {
        Some(e) => Err(e),
        None => Ok(None),
    }
}

/// Parse a legal citation string, normalizing the reporter abbreviation.
pub fn parse_citation(input: &str) -> Result<ParsedCitation, CitationParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(CitationParseError::new("Empty input", input));
    }

    if let Some(citation) = match_citation(trimmed)? {
        return Ok(citation);
    }

    if let Some(shape) = loose_shape().captures(trimmed) {
        let raw_reporter = shape[2].trim();
        return Err(CitationParseError::new(
            format!("Unrecognized reporter: \"{}\"", raw_reporter),
            trimmed,
        ));
    }

    Err(CitationParseError::new(
        format!(
            "Could not parse \"{}\" as a legal citation. Expected format: <volume> <reporter> <page> (e.g., \"347 U.S. 483\")",
            trimmed
        ),
        trimmed,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(input: &str) -> ParsedCitation {
        parse_citation(input).unwrap_or_else(|e| panic!("{input:?} failed: {e}"))
    }

    #[test]
    fn test_supreme_court_citation() {
        let c = parse_ok("347 U.S. 483");
        assert_eq!(c.volume, 347);
        assert_eq!(c.reporter, "U.S.");
        assert_eq!(c.page, 483);
        assert_eq!(c.raw, "347 U.S. 483");
        assert_eq!(c.normalized, "347 U.S. 483");
    }

    #[test]
    fn test_reporter_form_is_spelling_invariant() {
        for input in ["123 S Ct 456", "123 s. ct. 456", "123 S. Ct. 456", "123   S.Ct.   456"] {
            let c = parse_ok(input);
            assert_eq!(c.reporter, "S. Ct.", "input {input:?}");
            assert_eq!(c.normalized, "123 S. Ct. 456");
        }
    }

    #[test]
    fn test_series_suffix_is_not_a_page() {
        let c = parse_ok("123 F. Supp. 2d 456");
        assert_eq!(c.reporter, "F. Supp. 2d");
        assert_eq!(c.page, 456);

        let c = parse_ok("999 F.4th 1");
        assert_eq!(c.reporter, "F.4th");
        assert_eq!(c.page, 1);

        let c = parse_ok("500 L. Ed. 2d 12");
        assert_eq!(c.reporter, "L. Ed. 2d");
    }

    #[test]
    fn test_pin_cites_and_parentheticals() {
        let pin = parse_ok("347 U.S. 483, 490");
        let paren = parse_ok("347 U.S. 483 (1954)");
        assert_eq!(pin.page, 483);
        assert_eq!(paren.page, 483);
        assert_eq!(pin.normalized, paren.normalized);
    }

    #[test]
    fn test_surrounding_whitespace_is_trimmed() {
        let c = parse_ok("   410 U.S. 113  ");
        assert_eq!(c.raw, "410 U.S. 113");
        assert_eq!(c.normalized, "410 U.S. 113");
    }

    #[test]
    fn test_empty_input() {
        for input in ["", "   ", "\t\n"] {
            let err = parse_citation(input).unwrap_err();
            assert_eq!(err.code, "PARSE_ERROR");
            assert!(err.message.to_lowercase().contains("empty"));
        }
    }

    #[test]
    fn test_unrecognized_reporter() {
        let err = parse_citation("123 Xyz. Rptr. 456").unwrap_err();
        assert_eq!(err.code, "PARSE_ERROR");
        assert!(err.message.contains("Unrecognized reporter"));
        assert!(err.message.contains("Xyz. Rptr."));
    }

    #[test]
    fn test_unparseable_shape() {
        let err = parse_citation("not a citation").unwrap_err();
        assert_eq!(err.code, "PARSE_ERROR");
        assert!(err.message.contains("Expected format"));

        let err = parse_citation("U.S. 483").unwrap_err();
        assert!(err.message.contains("Could not parse"));
    }

    #[test]
    fn test_normalized_is_reconstructible() {
        for input in ["5 A.3d 77", "12 n.e. 2d 300", "88 So. 3d 1001", "7 P. 9"] {
            let c = parse_ok(input);
            assert_eq!(c.normalized, format!("{} {} {}", c.volume, c.reporter, c.page));
        }
    }

    #[test]
    fn test_out_of_range_numbers_are_reported() {
        let err = parse_citation("347 U.S. 99999999999").unwrap_err();
        assert_eq!(err.code, "PARSE_ERROR");
        assert_eq!(err.message, "Page out of range: 99999999999");

        let err = parse_citation("99999999999 F.3d 12").unwrap_err();
        assert_eq!(err.message, "Volume out of range: 99999999999");

        // Unknown reporters still report the reporter
        let err = parse_citation("347 Xyz. 99999999999").unwrap_err();
        assert!(err.message.starts_with("Unrecognized reporter"));
    }
}
