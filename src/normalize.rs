//! Name normalization for fuzzy place and street matching.
//!
//! Provides a deterministic pipeline applied symmetrically at index time
//! and query time, so "Haupt-Straße" and "HAUPT-STRASSE" land on the same
//! normalized form. The replacement table is a fixed constant: an index
//! built with one table is only compatible with queries using the same
//! table.

use regex::{Regex, RegexBuilder};

/// Ordered substring replacements, applied after lowercasing and before
/// punctuation folding. Order matters: "straße" must fold to "str" before
/// the bare sharp-s rule rewrites it to "strasse".
const REPLACEMENTS: &[(&str, &str)] = &[
    ("straße", "str"),
    ("strasse", "str"),
    ("road", "rd"),
    ("avenue", "av"),
    (" von ", " v. "),
    (" der ", " d. "),
    ("ß", "ss"),
];

/// Characters folded to a single space. The dot is deliberately absent so
/// abbreviations like "v." survive.
const PUNCTUATION: &[char] = &[
    '-', '_', '/', '\\', ',', ';', ':', '\'', '"', '(', ')', '\t', '\n', '\r',
];

/// Accented letters accepted verbatim inside fuzzy patterns.
const ACCENTED: &str = "äöüàáâèéêìíîòóôùúûçñ";

/// Canonicalize a free-text place or street name.
///
/// Pipeline: lowercase, apply the replacement table, fold punctuation to
/// spaces, collapse whitespace. Pure and idempotent.
pub fn normalize(name: &str) -> String {
    let mut folded = name.to_lowercase();
    for (from, to) in REPLACEMENTS {
        if folded.contains(from) {
            folded = folded.replace(from, to);
        }
    }

    let spaced: String = folded
        .chars()
        .map(|c| if PUNCTUATION.contains(&c) { ' ' } else { c })
        .collect();

    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Build a `%`-wildcard pattern for the store's name matcher.
///
/// Normalizes the input, then replaces every run of characters outside the
/// accepted set (ascii alphanumerics plus a fixed accented-letter list)
/// with a single `%`, bracketed by leading and trailing wildcards. Spaces
/// become wildcards too, so "haupt str" matches "Hauptstraße".
pub fn fuzzy_pattern(input: &str) -> String {
    let normalized = normalize(input);

    let mut pattern = String::with_capacity(normalized.len() + 2);
    pattern.push('%');
    for c in normalized.chars() {
        if c.is_ascii_alphanumeric() || ACCENTED.contains(c) {
            pattern.push(c);
        } else if !pattern.ends_with('%') {
            pattern.push('%');
        }
    }
    if !pattern.ends_with('%') {
        pattern.push('%');
    }
    pattern
}

/// Compile a `%`-wildcard pattern into an anchored case-insensitive regex.
pub fn like_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::with_capacity(pattern.len() * 2 + 2);
    expr.push('^');
    for segment in pattern.split('%') {
        if segment.is_empty() {
            // a '%' boundary
        } else {
            expr.push_str(&regex::escape(segment));
        }
        expr.push_str(".*");
    }
    // split() emits a trailing empty segment for a trailing '%', leaving one
    // ".*" too many; harmless, but trim it for readability of the regex.
    if expr.ends_with(".*.*") {
        expr.truncate(expr.len() - 2);
    }
    expr.push('$');
    RegexBuilder::new(&expr).case_insensitive(true).build()
}
