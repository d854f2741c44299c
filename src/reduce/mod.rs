//! HTML reduction engine
//!
//! A stateless DOM-simplification pipeline: parse a document, strip the
//! noise (scripts, styles, handlers, presentational attributes), bound
//! everything long (text, attribute values, comments, URLs, SVG
//! payloads), and serialize the result. Alongside the reduced HTML the
//! engine emits a compact structural outline of the tree and
//! compression statistics.
//!
//! The engine holds no cross-call state and is safe to invoke
//! concurrently.

mod outline;
mod pipeline;
mod stats;

pub use outline::{outline, OutlineOptions};
pub use stats::ReductionStats;

use crate::ReduceError;
use kuchiki::traits::TendrilSink;
use kuchiki::NodeRef;

/// Depth of the body-scoped outline
const TOP_OUTLINE_DEPTH: u32 = 6;

/// Length bounds for the trimming stages
#[derive(Debug, Clone)]
pub struct TrimLimits {
    /// Text node content (characters); longer text gets an ellipsis
    /// plus a remaining-character count
    pub text: usize,

    /// Ordinary attribute values
    pub attr: usize,

    /// `class` and `id` attribute values
    pub important_attr: usize,

    /// `href` attribute values
    pub href: usize,

    /// HTML comment text
    pub comment: usize,

    /// Serialized inner content of an `<svg>` element
    pub svg: usize,
}

impl Default for TrimLimits {
    fn default() -> Self {
        Self {
            text: 100,
            attr: 30,
            important_attr: 70,
            href: 30,
            comment: 30,
            svg: 100,
        }
    }
}

/// Configuration for one reduction call
#[derive(Debug, Clone, Default)]
pub struct ReduceOptions {
    /// Reduce only the first element matching this CSS selector.
    /// A selector that matches nothing is a hard error.
    pub selector: Option<String>,

    /// Trim thresholds
    pub limits: TrimLimits,
}

/// Output of one reduction call
#[derive(Debug, Clone)]
pub struct Reduction {
    /// The reduced document
    pub html: String,

    /// Full-depth structural outline from the document root
    pub outline: String,

    /// Depth-bounded outline starting at `<body>`
    pub outline_top: String,

    /// Compression statistics over the reduced tree. Populated on
    /// every call, not just when a caller asked for cleanup output.
    pub stats: ReductionStats,
}

/// Reduces an HTML document.
///
/// Runs the trimming pipeline over the parsed DOM (scoped to
/// `options.selector` when given), then serializes the result and
/// builds the two outlines and the statistics.
///
/// # Examples
///
/// ```
/// use kumo_sift::reduce::{reduce, ReduceOptions};
///
/// let out = reduce("<p>Hello     world</p>", &ReduceOptions::default()).unwrap();
/// assert!(out.html.contains("<p>Hello world</p>"));
/// ```
pub fn reduce(html: &str, options: &ReduceOptions) -> Result<Reduction, ReduceError> {
    let document = kuchiki::parse_html().one(html);
    let root = scope_root(&document, options.selector.as_deref())?;

    pipeline::run(&root, &options.limits);

    let reduced = serialize(&root)?;

    let full_outline = outline(
        &root,
        &OutlineOptions {
            max_depth: 0,
            body_only: false,
        },
    );
    let top_outline = outline(
        &root,
        &OutlineOptions {
            max_depth: TOP_OUTLINE_DEPTH,
            body_only: true,
        },
    );

    let stats = stats::compute(&root, html.len(), reduced.len());

    Ok(Reduction {
        html: reduced,
        outline: full_outline,
        outline_top: top_outline,
        stats,
    })
}

/// Resolves the subtree the pipeline operates on.
fn scope_root(document: &NodeRef, selector: Option<&str>) -> Result<NodeRef, ReduceError> {
    let Some(selector) = selector else {
        return Ok(document.clone());
    };
    let mut matches = document
        .select(selector)
        .map_err(|()| ReduceError::InvalidSelector(selector.to_string()))?;
    match matches.next() {
        Some(element) => Ok(element.as_node().clone()),
        None => Err(ReduceError::SelectorNoMatch(selector.to_string())),
    }
}

fn serialize(root: &NodeRef) -> Result<String, ReduceError> {
    let mut out = Vec::new();
    root.serialize(&mut out)
        .map_err(|e| ReduceError::Serialize(e.to_string()))?;
    String::from_utf8(out).map_err(|e| ReduceError::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whitespace_collapse() {
        let out = reduce("<p>Hello     world</p>", &ReduceOptions::default()).unwrap();
        assert!(out.html.contains("<p>Hello world</p>"));
    }

    #[test]
    fn test_scripts_and_styles_removed() {
        let html = "<html><head><style>p{}</style></head>\
                    <body><script>alert(1)</script><p>keep</p></body></html>";
        let out = reduce(html, &ReduceOptions::default()).unwrap();
        assert!(!out.html.contains("script"));
        assert!(!out.html.contains("style"));
        assert!(out.html.contains("<p>keep</p>"));
    }

    #[test]
    fn test_long_text_gets_count_marker() {
        let text = "a".repeat(150);
        let out = reduce(&format!("<p>{}</p>", text), &ReduceOptions::default()).unwrap();
        let expected = format!("{}… [50 chars more]", "a".repeat(100));
        assert!(out.html.contains(&expected));
    }

    #[test]
    fn test_selector_scopes_reduction() {
        let html = "<html><body><div id=\"main\"><p>in</p></div><p>out</p></body></html>";
        let options = ReduceOptions {
            selector: Some("#main".to_string()),
            ..ReduceOptions::default()
        };
        let out = reduce(html, &options).unwrap();
        assert!(out.html.contains("in"));
        assert!(!out.html.contains("out"));
    }

    #[test]
    fn test_selector_without_match_is_an_error() {
        let err = reduce(
            "<p>hi</p>",
            &ReduceOptions {
                selector: Some("#missing".to_string()),
                ..ReduceOptions::default()
            },
        )
        .unwrap_err();
        assert!(matches!(err, ReduceError::SelectorNoMatch(_)));
    }

    #[test]
    fn test_reduction_is_idempotent() {
        let html = format!(
            "<html><body><p class=\"{}\">{}</p><!-- {} --></body></html>",
            "c".repeat(90),
            "a".repeat(150),
            "x".repeat(60),
        );
        let once = reduce(&html, &ReduceOptions::default()).unwrap();
        let twice = reduce(&once.html, &ReduceOptions::default()).unwrap();
        assert_eq!(once.html, twice.html);
    }

    #[test]
    fn test_outline_shapes() {
        let html = "<html><body><div class=\"wrap\"><p>Some text here</p></div></body></html>";
        let out = reduce(html, &ReduceOptions::default()).unwrap();
        assert!(out.outline.contains("html"));
        assert!(out.outline.contains("div[class=\"wrap\"]"));
        // the top outline starts at body, so html is not mentioned
        assert!(!out.outline_top.contains("html"));
        assert!(out.outline_top.contains("{Some text here}"));
    }

    #[test]
    fn test_stats_report_compression() {
        let html = format!("<html><body><p>{}</p></body></html>", "a".repeat(500));
        let out = reduce(&html, &ReduceOptions::default()).unwrap();
        assert!(out.stats.output_len < out.stats.input_len);
        assert!(out.stats.compression_ratio > 0.0);
        assert!(out.stats.element_count >= 3);
    }
}
