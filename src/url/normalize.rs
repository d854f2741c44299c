use url::Url;

/// Canonicalizes a URL string.
///
/// # Normalization Steps
///
/// 1. Lowercase the host
/// 2. Strip the fragment (everything after `#`)
/// 3. Strip an explicit default port (80 for http, 443 for https)
/// 4. Strip a root-only trailing slash (`https://a.com/` -> `https://a.com`)
///
/// Malformed input is returned unchanged: normalization fails open and
/// never errors, so callers can feed it anything found in the wild.
/// The function is idempotent: `normalize(normalize(u)) == normalize(u)`.
///
/// # Examples
///
/// ```
/// use kumo_sift::url::normalize;
///
/// assert_eq!(normalize("https://EXAMPLE.com:443/#top"), "https://example.com");
/// assert_eq!(normalize("not a url"), "not a url");
/// ```
pub fn normalize(url_str: &str) -> String {
    let mut url = match Url::parse(url_str) {
        Ok(u) => u,
        Err(_) => return url_str.to_string(),
    };

    // The url crate already lowercases hosts of http(s) URLs on parse.
    url.set_fragment(None);

    let default_port = match url.scheme() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    if url.port().is_some() && url.port() == default_port {
        // set_port only fails for schemes without a host
        let _ = url.set_port(None);
    }

    let mut out = url.to_string();
    if url.path() == "/" && url.query().is_none() && out.ends_with('/') {
        out.pop();
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercase_host() {
        assert_eq!(
            normalize("https://EXAMPLE.COM/Page"),
            "https://example.com/Page"
        );
    }

    #[test]
    fn test_strip_fragment() {
        assert_eq!(
            normalize("https://example.com/page#section"),
            "https://example.com/page"
        );
    }

    #[test]
    fn test_strip_default_http_port() {
        assert_eq!(normalize("http://example.com:80/a"), "http://example.com/a");
    }

    #[test]
    fn test_strip_default_https_port() {
        assert_eq!(
            normalize("https://example.com:443/a"),
            "https://example.com/a"
        );
    }

    #[test]
    fn test_keep_nondefault_port() {
        assert_eq!(
            normalize("https://example.com:8443/a"),
            "https://example.com:8443/a"
        );
    }

    #[test]
    fn test_strip_root_trailing_slash() {
        assert_eq!(normalize("https://example.com/"), "https://example.com");
    }

    #[test]
    fn test_bare_host_gets_no_slash() {
        assert_eq!(normalize("https://example.com"), "https://example.com");
    }

    #[test]
    fn test_keep_non_root_trailing_slash() {
        // Only the root-only slash is stripped
        assert_eq!(
            normalize("https://example.com/dir/"),
            "https://example.com/dir/"
        );
    }

    #[test]
    fn test_keep_root_slash_with_query() {
        assert_eq!(
            normalize("https://example.com/?q=1"),
            "https://example.com/?q=1"
        );
    }

    #[test]
    fn test_malformed_passes_through() {
        assert_eq!(normalize("not a url"), "not a url");
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("::::"), "::::");
    }

    #[test]
    fn test_idempotent() {
        let inputs = [
            "https://EXAMPLE.com:443/#top",
            "https://example.com/",
            "http://example.com:80/a/b?x=1#f",
            "not a url",
            "https://example.com/dir/",
        ];
        for input in inputs {
            let once = normalize(input);
            let twice = normalize(&once);
            assert_eq!(once, twice, "normalize not idempotent for {}", input);
        }
    }
}
