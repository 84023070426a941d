//! Token-set similarity.
//!
//! Word-order-insensitive string similarity used for fuzzy catalog matching.
//! Both inputs are tokenized into sets; the score is the best normalized
//! Levenshtein ratio among the intersection string and the two
//! intersection-plus-difference strings. Subset relationships score 1.0
//! regardless of extra tokens on the other side.

use std::collections::BTreeSet;

use strsim::normalized_levenshtein;

/// Token-set ratio between two strings, in [0.0, 1.0].
///
/// Tokens are whitespace-separated and compared as sorted sets, so word
/// order and duplicates do not matter. Either input being empty (or
/// whitespace-only) yields 0.0.
pub fn token_set_ratio(a: &str, b: &str) -> f64 {
    let tokens_a: BTreeSet<&str> = a.split_whitespace().collect();
    let tokens_b: BTreeSet<&str> = b.split_whitespace().collect();

    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0.0;
    }

    let intersection: Vec<&str> = tokens_a.intersection(&tokens_b).copied().collect();
    let only_a: Vec<&str> = tokens_a.difference(&tokens_b).copied().collect();
    let only_b: Vec<&str> = tokens_b.difference(&tokens_a).copied().collect();

    let base = intersection.join(" ");
    let combined_a = join_parts(&base, &only_a);
    let combined_b = join_parts(&base, &only_b);

    let ratios = [
        normalized_levenshtein(&base, &combined_a),
        normalized_levenshtein(&base, &combined_b),
        normalized_levenshtein(&combined_a, &combined_b),
    ];

    ratios.into_iter().fold(0.0_f64, f64::max)
}

fn join_parts(base: &str, rest: &[&str]) -> String {
    if rest.is_empty() {
        return base.to_string();
    }
    if base.is_empty() {
        return rest.join(" ");
    }
    format!("{} {}", base, rest.join(" "))
}
