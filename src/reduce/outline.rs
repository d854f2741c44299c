//! Compact structural outline of a DOM tree
//!
//! Renders each element as its tag name plus up to four attributes,
//! with children indented below it. Text children appear inline on the
//! parent's line as `{first 30 chars…}`; text longer than 120 chars
//! gets a second trailing ellipsis (a two-tier quirk kept for output
//! compatibility).
//!
//! Attribute ties within a preference rank follow attribute-name order
//! rather than document order: the underlying attribute map is keyed by
//! name, so source order is not recoverable here. Deterministic, but a
//! known deviation from the original ordering.

use kuchiki::NodeRef;
use regex::Regex;
use std::sync::LazyLock;

/// Attributes shown per element
const MAX_ATTRS: usize = 4;

/// Characters of a text child shown inline; cut text gets an ellipsis
const TEXT_PREVIEW: usize = 30;

/// Text longer than this gets a further ellipsis after the preview
const TEXT_ELLIPSIS_THRESHOLD: usize = 120;

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("WHITESPACE_RUN: hardcoded regex is valid"));

/// Traversal configuration for one outline
#[derive(Debug, Clone, Default)]
pub struct OutlineOptions {
    /// Deepest element level rendered; 0 means unlimited
    pub max_depth: u32,

    /// Start at the first `<body>` element instead of the root
    pub body_only: bool,
}

/// Builds the outline of a (sub)tree.
///
/// With `body_only` set and no `<body>` present, the whole tree is
/// outlined from `root`.
pub fn outline(root: &NodeRef, options: &OutlineOptions) -> String {
    let start = if options.body_only {
        root.select_first("body")
            .map(|body| body.as_node().clone())
            .unwrap_or_else(|()| root.clone())
    } else {
        root.clone()
    };

    let mut out = String::new();
    if start.as_element().is_some() {
        render_element(&start, 0, options.max_depth, &mut out);
    } else {
        // document or fragment root: outline each element child
        for child in start.children() {
            if child.as_element().is_some() {
                render_element(&child, 0, options.max_depth, &mut out);
            }
        }
    }
    out
}

fn render_element(node: &NodeRef, depth: u32, max_depth: u32, out: &mut String) {
    if max_depth != 0 && depth >= max_depth {
        return;
    }
    let Some(element) = node.as_element() else {
        return;
    };

    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(&element.name.local);

    for (name, value) in selected_attributes(node) {
        out.push_str(&format!("[{}=\"{}\"]", name, value));
    }

    // text children ride on the parent's line
    for child in node.children() {
        if let Some(text) = child.as_text() {
            let text = text.borrow();
            let trimmed = text.trim();
            if trimmed.is_empty() {
                continue;
            }
            out.push_str(&format!("{{{}}}", text_preview(trimmed)));
        }
    }
    out.push('\n');

    for child in node.children() {
        if child.as_element().is_some() {
            render_element(&child, depth + 1, max_depth, out);
        }
    }
}

/// Picks up to four attributes, preferring `class`, then `src`, then
/// `data-*`, and collapses whitespace in their values.
fn selected_attributes(node: &NodeRef) -> Vec<(String, String)> {
    let Some(element) = node.as_element() else {
        return Vec::new();
    };
    let attrs = element.attributes.borrow();
    let mut pairs: Vec<(String, String)> = attrs
        .map
        .iter()
        .map(|(name, attr)| {
            let value = WHITESPACE_RUN.replace_all(&attr.value, " ").into_owned();
            (name.local.to_string(), value)
        })
        .collect();

    pairs.sort_by_key(|(name, _)| attribute_rank(name));
    pairs.truncate(MAX_ATTRS);
    pairs
}

fn attribute_rank(name: &str) -> u8 {
    match name {
        "class" => 0,
        "src" => 1,
        _ if name.starts_with("data-") => 2,
        _ => 3,
    }
}

fn text_preview(text: &str) -> String {
    let total = text.chars().count();
    let mut preview: String = text.chars().take(TEXT_PREVIEW).collect();
    if total > TEXT_PREVIEW {
        preview.push('…');
    }
    if total > TEXT_ELLIPSIS_THRESHOLD {
        preview.push('…');
    }
    preview
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::TendrilSink;

    fn outline_of(html: &str, options: &OutlineOptions) -> String {
        let document = kuchiki::parse_html().one(html);
        outline(&document, options)
    }

    #[test]
    fn test_nested_elements_indent() {
        let out = outline_of(
            "<html><body><div><p>Hi</p></div></body></html>",
            &OutlineOptions::default(),
        );
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "html");
        assert!(lines.contains(&"    div"));
        assert!(lines.contains(&"      p{Hi}"));
    }

    #[test]
    fn test_attribute_preference_order() {
        let html = r#"<div id="a" title="t" class="c" src="s" data-x="d" role="r">x</div>"#;
        let out = outline_of(html, &OutlineOptions::default());
        // class, src, data-x win the four slots ahead of id/role/title
        assert!(out.contains(r#"div[class="c"][src="s"][data-x="d"][id="a"]"#));
        assert!(!out.contains("title"));
    }

    #[test]
    fn test_attribute_values_whitespace_collapsed() {
        let out = outline_of(
            "<div class=\"one   two\nthree\">x</div>",
            &OutlineOptions::default(),
        );
        assert!(out.contains(r#"[class="one two three"]"#));
    }

    #[test]
    fn test_text_preview_two_tier_truncation() {
        // text that fits the preview is shown whole, no ellipsis
        let short = "short text";
        let out = outline_of(&format!("<p>{}</p>", short), &OutlineOptions::default());
        assert!(out.contains("{short text}"));
        assert!(!out.contains('…'));

        // between 30 and 120 chars: cut to 30 with one ellipsis
        let mid = "m".repeat(60);
        let out = outline_of(&format!("<p>{}</p>", mid), &OutlineOptions::default());
        assert!(out.contains(&format!("{{{}…}}", "m".repeat(30))));

        // beyond 120 chars the preview gets a further ellipsis
        let long = "l".repeat(130);
        let out = outline_of(&format!("<p>{}</p>", long), &OutlineOptions::default());
        assert!(out.contains(&format!("{{{}……}}", "l".repeat(30))));
    }

    #[test]
    fn test_depth_limit() {
        let html = "<html><body><div><section><p>deep</p></section></div></body></html>";
        let out = outline_of(
            html,
            &OutlineOptions {
                max_depth: 2,
                body_only: true,
            },
        );
        assert!(out.contains("body"));
        assert!(out.contains("div"));
        assert!(!out.contains("section"));
    }

    #[test]
    fn test_body_only_skips_head() {
        let html = "<html><head><title>T</title></head><body><p>x</p></body></html>";
        let out = outline_of(
            html,
            &OutlineOptions {
                max_depth: 0,
                body_only: true,
            },
        );
        assert!(out.starts_with("body"));
        assert!(!out.contains("title"));
    }
}
