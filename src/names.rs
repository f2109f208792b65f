//! Name handling shared by every lookup: slugs for exact roster lookups and a
//! forgiving comparison for matching bookmaker labels to fighter names.

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

static ABBREVIATED_FIRST_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z]\.?\s+\S").expect("static regex"));

const GENERATIONAL_SUFFIXES: &[&str] = &["jr", "sr", "ii", "iii", "iv"];

/// Fold to ASCII by decomposing and dropping combining marks
/// ("Miloš Cvjetićanin" -> "Milos Cvjeticanin"). Characters without an
/// ASCII decomposition are removed.
pub fn fold_diacritics(name: &str) -> String {
    name.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .filter(char::is_ascii)
        .collect()
}

/// URL slug used for exact roster lookups.
pub fn slugify(name: &str) -> String {
    let folded = fold_diacritics(name).to_ascii_lowercase();
    folded
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("-")
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

/// "A. Bouzid" and "A Bouzid" are abbreviated, "Ayoub Bouzid" is not.
pub fn has_abbreviated_first_name(name: &str) -> bool {
    ABBREVIATED_FIRST_NAME.is_match(name.trim())
}

pub fn normalize_for_matching(name: &str) -> String {
    let folded = fold_diacritics(name).to_ascii_lowercase();
    let mut words = Vec::new();
    // Tokens split on anything non-alphanumeric so "jr." and "verhoeven-jr"
    // both expose the suffix; the remaining pieces of a token are glued back
    // together so "o'neil" stays one word.
    for token in folded.split_whitespace() {
        let kept: String = token
            .split(|c: char| !c.is_ascii_alphanumeric())
            .filter(|piece| !GENERATIONAL_SUFFIXES.contains(piece))
            .collect::<Vec<_>>()
            .concat()
            .chars()
            .filter(char::is_ascii_alphabetic)
            .collect();
        if !kept.is_empty() {
            words.push(kept);
        }
    }
    words.join(" ")
}

/// Best-effort "same person" test. Accepts equal normalized forms, substring
/// containment either way, or equal surnames; tolerates false positives over
/// false negatives.
pub fn names_match(a: &str, b: &str) -> bool {
    let na = normalize_for_matching(a);
    let nb = normalize_for_matching(b);
    if na.is_empty() || nb.is_empty() {
        return false;
    }
    if na == nb || na.contains(&nb) || nb.contains(&na) {
        return true;
    }
    match (na.split_whitespace().last(), nb.split_whitespace().last()) {
        (Some(la), Some(lb)) => la == lb,
        _ => false,
    }
}

/// Last whitespace-delimited token and the lowercase initial of an
/// abbreviated name ("A. Bouzid" -> ("a", "Bouzid")).
pub fn split_initial(name: &str) -> Option<(String, &str)> {
    if !has_abbreviated_first_name(name) {
        return None;
    }
    let trimmed = name.trim();
    let mut parts = trimmed.split_whitespace();
    let first = parts.next()?;
    let last = parts.last()?;
    let initial = first.trim_end_matches('.').to_ascii_lowercase();
    Some((initial, last))
}
