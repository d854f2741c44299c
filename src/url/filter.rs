//! Include/exclude URL filtering with shell-glob patterns
//!
//! Patterns use shell-glob semantics: `*` matches within a path segment,
//! `**` spans segments, `?` matches a single character. Both patterns and
//! URLs are compared as plain strings after scheme stripping, with no
//! percent-decoding.

use crate::url::strip_scheme;
use regex::Regex;

/// Decides whether a URL passes the include/exclude pattern sets.
///
/// Rules:
/// - the scheme is stripped from the URL before matching
/// - an empty include set includes everything
/// - otherwise the URL must match at least one include pattern
/// - a match against any exclude pattern rejects the URL, regardless of
///   the include result; exclude always wins
///
/// # Examples
///
/// ```
/// use kumo_sift::url::should_process;
///
/// let exclude = vec!["**.pdf".to_string()];
/// assert!(!should_process("https://a.com/x.pdf", &[], &exclude));
/// assert!(should_process("https://a.com/x.html", &[], &exclude));
/// ```
pub fn should_process(url: &str, include: &[String], exclude: &[String]) -> bool {
    let target = strip_scheme(url);

    let included = include.is_empty() || include.iter().any(|p| matches_glob(p, target));

    if !included {
        return false;
    }

    !exclude.iter().any(|p| matches_glob(p, target))
}

/// Matches a candidate string against a shell-glob pattern.
///
/// The pattern is translated to an anchored regex: `**` becomes `.*`,
/// `*` becomes `[^/]*`, `?` becomes `.`; everything else is literal.
/// A pattern that fails to compile never matches.
pub fn matches_glob(pattern: &str, candidate: &str) -> bool {
    let regex = match glob_to_regex(pattern) {
        Ok(r) => r,
        Err(e) => {
            tracing::debug!("Unusable URL pattern {:?}: {}", pattern, e);
            return false;
        }
    };
    regex.is_match(candidate)
}

/// Translates a shell-glob pattern into an anchored [`Regex`].
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut out = String::with_capacity(pattern.len() + 8);
    out.push('^');

    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => {
                if chars.peek() == Some(&'*') {
                    chars.next();
                    out.push_str(".*");
                } else {
                    out.push_str("[^/]*");
                }
            }
            '?' => out.push('.'),
            c => out.push_str(&regex::escape(&c.to_string())),
        }
    }

    out.push('$');
    Regex::new(&out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_include_defaults_to_include() {
        assert!(should_process("https://a.com/page", &[], &[]));
    }

    #[test]
    fn test_exclude_wins() {
        let include = vec!["a.com/**".to_string()];
        let exclude = vec!["**.pdf".to_string()];
        assert!(!should_process("https://a.com/doc.pdf", &include, &exclude));
        assert!(should_process("https://a.com/doc.html", &include, &exclude));
    }

    #[test]
    fn test_pdf_exclusion_with_empty_include() {
        let exclude = vec!["**.pdf".to_string()];
        assert!(!should_process("https://a.com/x.pdf", &[], &exclude));
        assert!(should_process("https://a.com/x.html", &[], &exclude));
    }

    #[test]
    fn test_include_must_match_when_present() {
        let include = vec!["a.com/blog/**".to_string()];
        assert!(should_process("https://a.com/blog/post", &include, &[]));
        assert!(!should_process("https://a.com/shop/item", &include, &[]));
    }

    #[test]
    fn test_single_star_stays_in_segment() {
        assert!(matches_glob("a.com/*", "a.com/page"));
        assert!(!matches_glob("a.com/*", "a.com/dir/page"));
    }

    #[test]
    fn test_double_star_spans_segments() {
        assert!(matches_glob("a.com/**", "a.com/dir/page"));
        assert!(matches_glob("a.com/**/end", "a.com/x/y/end"));
    }

    #[test]
    fn test_question_mark() {
        assert!(matches_glob("a.com/p?ge", "a.com/page"));
        assert!(!matches_glob("a.com/p?ge", "a.com/pagge"));
    }

    #[test]
    fn test_match_is_anchored() {
        assert!(!matches_glob("blog/**", "a.com/blog/post"));
        assert!(!matches_glob("a.com", "a.com/page"));
    }

    #[test]
    fn test_literal_regex_chars_escaped() {
        assert!(matches_glob("a.com/page?x=1", "a.com/pageAx=1"));
        assert!(matches_glob("a.com/a+b", "a.com/a+b"));
        assert!(!matches_glob("a.com/a+b", "a.com/aab"));
    }

    #[test]
    fn test_no_percent_decoding() {
        // Patterns and URLs are matched as plain strings
        assert!(!matches_glob("a.com/a b", "a.com/a%20b"));
        assert!(matches_glob("a.com/a%20b", "a.com/a%20b"));
    }

    #[test]
    fn test_scheme_stripped_before_matching() {
        let include = vec!["a.com/**".to_string()];
        assert!(should_process("http://a.com/x", &include, &[]));
        assert!(should_process("https://a.com/x", &include, &[]));
    }
}
