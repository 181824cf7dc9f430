//! String similarity scores on a 0-100 scale.
//!
//! Both operands are pre-processed: lower-cased, every character that is not
//! a letter or digit replaced by a space, trimmed.
//!
//! - [`ratio`]: `2 * LCS / (|a| + |b|)`, the insertion/deletion edit ratio.
//! - [`partial_ratio`]: the best [`ratio`] of the shorter string against an
//!   equal-length window of the longer one, with windows anchored on the
//!   matching blocks of the two strings.

use std::collections::HashMap;

/// Lower-case, replace non-alphanumerics with spaces, trim.
pub fn process(s: &str) -> String {
    let mapped: String = s
        .chars()
        .flat_map(|c| {
            let c = if c.is_alphanumeric() { c } else { ' ' };
            c.to_lowercase()
        })
        .collect();
    mapped.trim().to_string()
}

/// Length of the longest common subsequence.
fn lcs_len(a: &[char], b: &[char]) -> usize {
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for &ca in a {
        for (j, &cb) in b.iter().enumerate() {
            curr[j + 1] = if ca == cb {
                prev[j] + 1
            } else {
                curr[j].max(prev[j + 1])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}

/// Unrounded ratio in `[0, 1]` of two processed char slices.
fn raw_ratio(a: &[char], b: &[char]) -> f64 {
    let total = a.len() + b.len();
    if total == 0 {
        return 0.0;
    }
    2.0 * lcs_len(a, b) as f64 / total as f64
}

fn to_score(r: f64) -> u8 {
    (r * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Whole-string similarity.
pub fn ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = process(a).chars().collect();
    let b: Vec<char> = process(b).chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    to_score(raw_ratio(&a, &b))
}

/// Best-window similarity of the shorter string inside the longer one.
pub fn partial_ratio(a: &str, b: &str) -> u8 {
    let a: Vec<char> = process(a).chars().collect();
    let b: Vec<char> = process(b).chars().collect();
    if a.is_empty() || b.is_empty() {
        return 0;
    }

    let (shorter, longer) = if a.len() <= b.len() { (a, b) } else { (b, a) };

    let mut best = 0.0f64;
    for (i, j, _) in matching_blocks(&shorter, &longer) {
        let start = j.saturating_sub(i);
        let end = (start + shorter.len()).min(longer.len());
        let r = raw_ratio(&shorter, &longer[start..end]);
        if r > 0.995 {
            return 100;
        }
        best = best.max(r);
    }
    to_score(best)
}

/// Maximal matching blocks `(i, j, len)` with `a[i..i+len] == b[j..j+len]`,
/// ordered, adjacent blocks merged, terminated by `(|a|, |b|, 0)`.
pub fn matching_blocks(a: &[char], b: &[char]) -> Vec<(usize, usize, usize)> {
    let mut b_index: HashMap<char, Vec<usize>> = HashMap::new();
    for (j, &c) in b.iter().enumerate() {
        b_index.entry(c).or_default().push(j);
    }

    let mut queue = vec![(0, a.len(), 0, b.len())];
    let mut blocks = Vec::new();
    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, k) = longest_match(a, &b_index, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        blocks.push((i, j, k));
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            queue.push((i + k, ahi, j + k, bhi));
        }
    }
    blocks.sort_unstable();

    let mut merged: Vec<(usize, usize, usize)> = Vec::with_capacity(blocks.len() + 1);
    for (i, j, k) in blocks {
        match merged.last_mut() {
            Some(last) if last.0 + last.2 == i && last.1 + last.2 == j => last.2 += k,
            _ => merged.push((i, j, k)),
        }
    }
    merged.push((a.len(), b.len(), 0));
    merged
}

/// Longest common substring of `a[alo..ahi]` and `b[blo..bhi]`; earliest in
/// `a`, then earliest in `b`, on ties.
fn longest_match(
    a: &[char],
    b_index: &HashMap<char, Vec<usize>>,
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_len) = (alo, blo, 0);
    let mut run: HashMap<usize, usize> = HashMap::new();

    for (i, c) in a.iter().enumerate().take(ahi).skip(alo) {
        let mut next_run = HashMap::new();
        if let Some(positions) = b_index.get(c) {
            for &j in positions {
                if j < blo {
                    continue;
                }
                if j >= bhi {
                    break;
                }
                let k = j.checked_sub(1).and_then(|p| run.get(&p)).copied().unwrap_or(0) + 1;
                next_run.insert(j, k);
                if k > best_len {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_len = k;
                }
            }
        }
        run = next_run;
    }

    (best_i, best_j, best_len)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> Vec<char> {
        s.chars().collect()
    }

    #[test]
    fn test_process() {
        assert_eq!(process("  Hello, World!  "), "hello  world");
        assert_eq!(process("--"), "");
        assert_eq!(process("F.2d"), "f 2d");
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio("this is a test", "this is a test!"), 100);
        assert_eq!(ratio("abcd", "abce"), 75);
        assert_eq!(ratio("", "abc"), 0);
        assert_eq!(ratio("!!!", "abc"), 0);
    }

    #[test]
    fn test_partial_ratio_substring_is_perfect() {
        assert_eq!(partial_ratio("this is a test", "this is a test!"), 100);
        assert_eq!(
            partial_ratio(
                "inherently unequal",
                "separate educational facilities are inherently unequal"
            ),
            100
        );
        // Symmetric in argument order
        assert_eq!(partial_ratio("the quick brown fox jumps", "brown fox"), 100);
    }

    #[test]
    fn test_partial_ratio_empty_is_zero() {
        assert_eq!(partial_ratio("", "anything"), 0);
        assert_eq!(partial_ratio("anything", "   "), 0);
    }

    #[test]
    fn test_matching_blocks() {
        let blocks = matching_blocks(&chars("abxcd"), &chars("abcd"));
        assert_eq!(blocks, vec![(0, 0, 2), (3, 2, 2), (5, 4, 0)]);

        let blocks = matching_blocks(&chars("xyz"), &chars("abc"));
        assert_eq!(blocks, vec![(3, 3, 0)]);
    }

    #[test]
    fn test_longest_match_prefers_earliest() {
        let a = chars("ab");
        let b = chars("abab");
        let mut index: HashMap<char, Vec<usize>> = HashMap::new();
        for (j, &c) in b.iter().enumerate() {
            index.entry(c).or_default().push(j);
        }
        assert_eq!(longest_match(&a, &index, 0, 2, 0, 4), (0, 0, 2));
    }
}
