//! Approximate substring similarity.

use strsim::normalized_levenshtein;

/// How well `query` matches somewhere inside `candidate`, in `[0, 1]`.
///
/// Both strings are expected to be normalized already. An exact substring
/// scores 1.0. Otherwise the best normalized Levenshtein similarity between
/// the query and any window of the candidate whose length is within one
/// character of the query's is returned.
pub fn similarity(query: &str, candidate: &str) -> f64 {
    if query.is_empty() || candidate.is_empty() {
        return 0.0;
    }
    if candidate.contains(query) {
        return 1.0;
    }

    let query_len = query.chars().count();
    let chars: Vec<char> = candidate.chars().collect();
    if chars.len() <= query_len + 1 {
        return normalized_levenshtein(query, candidate);
    }

    let mut best = 0.0f64;
    for width in query_len.saturating_sub(1).max(1)..=query_len + 1 {
        for window in chars.windows(width) {
            let window: String = window.iter().collect();
            best = best.max(normalized_levenshtein(query, &window));
            if best >= 1.0 {
                return best;
            }
        }
    }
    best
}
