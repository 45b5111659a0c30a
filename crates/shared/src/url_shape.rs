//! Lexical URL shape check.
//!
//! Decides whether a string *looks* like an `http`, `https`, `ftp` or `ftps`
//! URL. Nothing is resolved or fetched.
//!
//! Accepted hosts are dotted hostnames, `localhost`, and dotted quads. The
//! dotted-quad branch does not range-check its groups, so `999.1.1.1` passes.

use std::sync::LazyLock;

use regex::Regex;

static URL_SHAPE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(concat!(
        r"(?i)^(?:http|ftp)s?://",
        r"(?:(?:[A-Z0-9](?:[A-Z0-9-]{0,61}[A-Z0-9])?\.)+(?:[A-Z]{2,6}\.?|[A-Z0-9-]{2,}\.?)",
        r"|localhost",
        r"|\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})",
        r"(?::\d+)?",
        r"(?:/?|[/?]\S+)$",
    ))
    .ok()
});

/// Returns true when `candidate` has the shape of a URL.
///
/// The whole string must match; a trailing newline is not tolerated.
pub fn is_valid_url(candidate: &str) -> bool {
    URL_SHAPE
        .as_ref()
        .is_some_and(|regex| regex.is_match(candidate))
}

#[cfg(test)]
#[path = "tests/url_shape_tests.rs"]
mod tests;
