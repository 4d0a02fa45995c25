//! Gestalt pattern matching similarity.
//!
//! `ratio(a, b) = 2·M / (|a| + |b|)` where `M` counts the characters of the
//! matching blocks found by taking the longest common substring and recursing
//! on both sides of it. Computed over `char`s so CJK text counts one per glyph.

/// Longest common block of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Returns `(i, j, size)`. Among equally long blocks the one that ends first
/// in `a` wins, then the one that starts first in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let mut best = (alo, blo, 0);
    // run[j - blo + 1] = length of the match ending at (i - 1, j)
    let mut prev = vec![0usize; bhi - blo + 1];
    let mut cur = vec![0usize; bhi - blo + 1];

    for i in alo..ahi {
        for j in blo..bhi {
            let k = if a[i] == b[j] { prev[j - blo] + 1 } else { 0 };
            cur[j - blo + 1] = k;
            if k > best.2 {
                best = (i + 1 - k, j + 1 - k, k);
            }
        }
        std::mem::swap(&mut prev, &mut cur);
    }

    best
}

/// Total size of all matching blocks between `a` and `b`.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut total = 0;
    let mut pending = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = pending.pop() {
        let (i, j, k) = longest_match(a, b, alo, ahi, blo, bhi);
        if k == 0 {
            continue;
        }
        total += k;
        if alo < i && blo < j {
            pending.push((alo, i, blo, j));
        }
        if i + k < ahi && j + k < bhi {
            pending.push((i + k, ahi, j + k, bhi));
        }
    }

    total
}

/// Similarity of two strings in `[0, 1]`. Two empty strings are identical.
pub fn ratio(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let length = a.len() + b.len();
    if length == 0 {
        return 1.0;
    }
    2.0 * matching_characters(&a, &b) as f64 / length as f64
}

/// Candidates scoring at least `cutoff` against `value`, best first.
///
/// At most `limit` are returned; equal scores keep vocabulary order.
pub fn close_matches<'a>(
    value: &str,
    candidates: &'a [String],
    limit: usize,
    cutoff: f64,
) -> Vec<(&'a str, f64)> {
    let mut scored: Vec<(&str, f64)> = candidates
        .iter()
        .map(|candidate| (candidate.as_str(), ratio(candidate, value)))
        .filter(|(_, score)| *score >= cutoff)
        .collect();
    scored.sort_by(|x, y| y.1.total_cmp(&x.1));
    scored.truncate(limit);
    scored
}
