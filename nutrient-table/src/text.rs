//! Name normalization and string/set similarity.
//!
//! Both recipe deduplication and ingredient matching compare names through
//! these functions, so the two stages always agree on what "the same name"
//! means.

use std::collections::HashSet;
use std::hash::Hash;

use unicode_normalization::UnicodeNormalization;

// =============================================================================
// Normalization
// =============================================================================

/// Canonicalize a name for comparison.
///
/// Applies NFKC, folds case, and keeps only alphanumeric characters
/// (Hangul, CJK and other scripts count as alphabetic). Whitespace and
/// punctuation are removed entirely, so `"김치 찌개"` and `"김치찌개"`
/// normalize to the same string.
///
/// The result is stable: `normalize_name(&normalize_name(x)) == normalize_name(x)`.
pub fn normalize_name(s: &str) -> String {
    let mut current = fold(s);
    // Dropping a separator can leave conjoining jamo side by side, which
    // NFKC then composes; repeat until nothing changes.
    loop {
        let next = fold(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn fold(s: &str) -> String {
    s.nfkc()
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_alphanumeric())
        .collect()
}

// =============================================================================
// String similarity
// =============================================================================

/// Ratcliff/Obershelp similarity between two strings, in `[0, 1]`.
///
/// Computed as `2 * M / T`, where `T` is the total number of characters in
/// both strings and `M` is the number of characters in the matching blocks
/// found by repeatedly taking the longest common contiguous run and recursing
/// on either side of it. Two empty strings are identical (1.0).
pub fn string_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    let total = a.len() + b.len();
    if total == 0 {
        return 1.0;
    }

    let matched = matching_characters(&a, &b);
    2.0 * matched as f64 / total as f64
}

/// Sum of the lengths of all matching blocks between `a` and `b`.
fn matching_characters(a: &[char], b: &[char]) -> usize {
    let mut matched = 0;
    let mut queue = vec![(0, a.len(), 0, b.len())];

    while let Some((alo, ahi, blo, bhi)) = queue.pop() {
        let (i, j, size) = longest_match(a, b, alo, ahi, blo, bhi);
        if size == 0 {
            continue;
        }
        matched += size;
        if alo < i && blo < j {
            queue.push((alo, i, blo, j));
        }
        if i + size < ahi && j + size < bhi {
            queue.push((i + size, ahi, j + size, bhi));
        }
    }

    matched
}

/// Longest common contiguous run of `a[alo..ahi]` and `b[blo..bhi]`.
///
/// Returns `(i, j, size)`. Among equally long runs the one starting earliest
/// in `a` wins, then the one starting earliest in `b`.
fn longest_match(
    a: &[char],
    b: &[char],
    alo: usize,
    ahi: usize,
    blo: usize,
    bhi: usize,
) -> (usize, usize, usize) {
    let (mut best_i, mut best_j, mut best_size) = (alo, blo, 0);

    // run_len[j + 1] = length of the run ending at a[i - 1], b[j]
    let width = bhi - blo + 1;
    let mut prev = vec![0usize; width];
    let mut curr = vec![0usize; width];

    for i in alo..ahi {
        for j in blo..bhi {
            let slot = j - blo + 1;
            if a[i] == b[j] {
                let k = prev[slot - 1] + 1;
                curr[slot] = k;
                if k > best_size {
                    best_i = i + 1 - k;
                    best_j = j + 1 - k;
                    best_size = k;
                }
            } else {
                curr[slot] = 0;
            }
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    (best_i, best_j, best_size)
}

// =============================================================================
// Set similarity
// =============================================================================

/// Jaccard similarity `|A ∩ B| / |A ∪ B|`.
///
/// Defined as 0.0 when either set is empty.
pub fn jaccard<T: Eq + Hash>(a: &HashSet<T>, b: &HashSet<T>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let intersection = a.intersection(b).count();
    let union = a.len() + b.len() - intersection;
    intersection as f64 / union as f64
}

// =============================================================================
// Tests
// =============================================================================
