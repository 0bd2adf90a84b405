//! preprocess.rs — FIR text normalization.
//!
//! Canonicalizes raw complaint text into the exact token stream the
//! vectorizer/classifier were trained on: lowercasing, stripping everything
//! that is not a lowercase letter or whitespace, then colloquial-term
//! substitution. Numbers, punctuation, and non-Latin scripts are dropped
//! entirely; this matches the training-time cleaning.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;

static LEXICON: Lazy<HashMap<String, String>> = Lazy::new(|| {
    let raw = include_str!("../hinglish_lexicon.json");
    serde_json::from_str::<HashMap<String, String>>(raw).expect("valid hinglish lexicon")
});

static NON_ALPHA: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z\s]").expect("valid strip regex"));

/// Lowercase and strip every character outside `[a-z\s]`, then collapse
/// whitespace runs to single spaces.
fn clean_text(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = NON_ALPHA.replace_all(&lowered, "");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Token-level substitution of transliterated/colloquial terms with their
/// canonical English equivalents. Unmapped tokens pass through unchanged.
fn normalize_slang(text: &str) -> String {
    text.split_whitespace()
        .map(|w| match LEXICON.get(w) {
            Some(canon) => canon.as_str(),
            None => w,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Full normalization pipeline: cleaning, then slang substitution.
///
/// Cleaning runs first so cased or punctuated slang forms ("CHURA", "chor!")
/// still hit the lexicon; no mapping target is itself a lexicon key, which
/// keeps the whole pipeline idempotent:
/// `normalize(normalize(x)) == normalize(x)` for all inputs. Pure and
/// deterministic; empty input yields empty output.
pub fn normalize(raw: &str) -> String {
    normalize_slang(&clean_text(raw))
}
