//! URL normalization and shape validation.
//!
//! Runs before any network I/O: a request with an invalid URL is rejected
//! with a 400 instead of ever reaching the fetcher.

use regex::Regex;
use std::sync::OnceLock;

/// Grammar for acceptable URLs: `http`/`https`/`ftp`(+s) scheme, then a
/// dotted domain with a 2+ character TLD, `localhost`, or an IPv4 literal,
/// an optional port, and an optional path/query without whitespace.
fn url_shape() -> &'static Regex {
    static URL_SHAPE: OnceLock<Regex> = OnceLock::new();
    URL_SHAPE.get_or_init(|| {
        Regex::new(
            r"(?i)^(?:http|ftp)s?://(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+(?:[A-Z]{2,6}\.?|[A-Z0-9-]{2,}\.?)|localhost|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})(?::\d+)?(?:/?|[/?]\S+)$",
        )
        .expect("URL grammar compiles")
    })
}

/// Trim whitespace and prepend `https://` when no HTTP scheme is present.
///
/// Pure and idempotent: `normalize_url(normalize_url(u)) == normalize_url(u)`.
pub fn normalize_url(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

/// Whether the string matches the URL grammar. Empty input is invalid.
pub fn is_valid_url(url: &str) -> bool {
    if url.is_empty() {
        return false;
    }
    url_shape().is_match(url)
}
