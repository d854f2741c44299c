//! URL handling for Kumo-Sift
//!
//! This module provides URL canonicalization and include/exclude glob
//! filtering for discovered links.

mod filter;
mod normalize;

pub use filter::{matches_glob, should_process};
pub use normalize::normalize;

/// Strips the scheme prefix (`http://`, `https://`, ...) from a URL string.
///
/// Patterns are matched against scheme-less URLs, so `a.com/x.pdf` and
/// `https://a.com/x.pdf` compare equal.
pub fn strip_scheme(url: &str) -> &str {
    match url.find("://") {
        Some(idx) => &url[idx + 3..],
        None => url,
    }
}
