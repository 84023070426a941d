//! Product-name normalization.
//!
//! Canonicalizes raw line text into a comparable key: lower-case, rewrite
//! unit synonyms, strip non-meaningful words and punctuation, collapse
//! whitespace. Deterministic and pure; `normalize(normalize(x)) ==
//! normalize(x)` for all inputs.

use once_cell::sync::Lazy;
use regex::Regex;

/// Ordered unit-synonym rewrites. Unit rewriting must run before stop-word
/// and punctuation stripping, since replacements can introduce new word
/// boundaries.
static UNIT_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\b(kilograms?|kgs?|kg)\b", "kg"),
        (r"\b(grams?|grs?|g)\b", "g"),
        (r"\b(pieces?|pcs?|pc)\b", "pcs"),
        (r"\b(milliliters?|ml)\b", "ml"),
        (r"\b(liters?|l|litres?)\b", "l"),
        (r"\b(bottles?|btls?)\b", "bottle"),
        (r"\b(packs?|pkgs?|pk)\b", "pack"),
    ]
    .iter()
    .map(|(pattern, canonical)| {
        (
            Regex::new(pattern).expect("unit rule pattern is valid"),
            *canonical,
        )
    })
    .collect()
});

/// Promo/tax/size words that carry no matching signal.
static STOP_WORDS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"\bmodel\b",
        r"\bsize\b",
        r"\btype\b",
        r"\bpromo(tion)?\b",
        r"\bdiscount\b",
        r"\bfree\b",
        r"\bgift\b",
        r"\bvat\b",
        r"\btax\b",
        r"\bwith\b",
        r"\band\b",
        r"\bfor\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("stop-word pattern is valid"))
    .collect()
});

/// Punctuation and special characters replaced by spaces:
/// `- / _ , . * ( ) [ ] { } + | & ! # : ; @ ^`
static SPECIAL_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-/_,\.\*\(\)\[\]\{\}\+\|&!#:;@\^]").expect("pattern is valid"));

/// Canonicalize a raw product name. Empty input yields an empty string.
pub fn normalize(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut text = text.trim().to_lowercase();

    for (pattern, canonical) in UNIT_RULES.iter() {
        text = pattern.replace_all(&text, *canonical).into_owned();
    }

    for pattern in STOP_WORDS.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }

    let text = SPECIAL_CHARS.replace_all(&text, " ");

    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
