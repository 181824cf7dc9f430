//! Reporter abbreviation table.
//!
//! Keys are lowercase with periods stripped and whitespace collapsed to
//! single spaces; values are canonical Bluebook abbreviations. Lookup is
//! exact on the key, never a fuzzy guess.

use std::collections::HashMap;
use std::sync::OnceLock;

const REPORTERS: &[(&str, &str)] = &[
    // U.S. Supreme Court
    ("us", "U.S."),
    ("u s", "U.S."),
    ("s ct", "S. Ct."),
    ("sct", "S. Ct."),
    ("l ed", "L. Ed."),
    ("led", "L. Ed."),
    ("l ed 2d", "L. Ed. 2d"),
    ("led 2d", "L. Ed. 2d"),
    ("led2d", "L. Ed. 2d"),
    ("l ed2d", "L. Ed. 2d"),
    // Federal courts of appeals
    ("f", "F."),
    ("f 2d", "F.2d"),
    ("f2d", "F.2d"),
    ("f 3d", "F.3d"),
    ("f3d", "F.3d"),
    ("f 4th", "F.4th"),
    ("f4th", "F.4th"),
    // Federal district courts
    ("f supp", "F. Supp."),
    ("fsupp", "F. Supp."),
    ("f supp 2d", "F. Supp. 2d"),
    ("fsupp 2d", "F. Supp. 2d"),
    ("fsupp2d", "F. Supp. 2d"),
    ("f supp 3d", "F. Supp. 3d"),
    ("fsupp 3d", "F. Supp. 3d"),
    ("fsupp3d", "F. Supp. 3d"),
    // Atlantic
    ("a", "A."),
    ("a 2d", "A.2d"),
    ("a2d", "A.2d"),
    ("a 3d", "A.3d"),
    ("a3d", "A.3d"),
    // North Eastern
    ("n e", "N.E."),
    ("ne", "N.E."),
    ("n e 2d", "N.E.2d"),
    ("ne 2d", "N.E.2d"),
    ("ne2d", "N.E.2d"),
    ("n e 3d", "N.E.3d"),
    ("ne 3d", "N.E.3d"),
    ("ne3d", "N.E.3d"),
    // North Western
    ("n w", "N.W."),
    ("nw", "N.W."),
    ("n w 2d", "N.W.2d"),
    ("nw 2d", "N.W.2d"),
    ("nw2d", "N.W.2d"),
    // Pacific
    ("p", "P."),
    ("p 2d", "P.2d"),
    ("p2d", "P.2d"),
    ("p 3d", "P.3d"),
    ("p3d", "P.3d"),
    // South Eastern
    ("s e", "S.E."),
    ("se", "S.E."),
    ("s e 2d", "S.E.2d"),
    ("se 2d", "S.E.2d"),
    ("se2d", "S.E.2d"),
    // South Western
    ("s w", "S.W."),
    ("sw", "S.W."),
    ("s w 2d", "S.W.2d"),
    ("sw 2d", "S.W.2d"),
    ("sw2d", "S.W.2d"),
    ("s w 3d", "S.W.3d"),
    ("sw 3d", "S.W.3d"),
    ("sw3d", "S.W.3d"),
    // Southern
    ("so", "So."),
    ("so 2d", "So. 2d"),
    ("so2d", "So. 2d"),
    ("so 3d", "So. 3d"),
    ("so3d", "So. 3d"),
];

fn table() -> &'static HashMap<&'static str, &'static str> {
    static TABLE: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    TABLE.get_or_init(|| REPORTERS.iter().copied().collect())
}

/// Build the lookup key for a raw reporter string.
pub fn reporter_key(raw: &str) -> String {
    raw.to_lowercase()
        .replace('.', "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Normalize a raw reporter string to its canonical Bluebook form.
pub fn normalize_reporter(raw: &str) -> Option<&'static str> {
    table().get(reporter_key(raw).as_str()).copied()
}
