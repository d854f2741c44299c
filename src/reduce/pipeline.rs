//! The trimming pipeline
//!
//! Stages run in a fixed order over the scoped subtree:
//! 1. drop `<style>` and `<script>` elements
//! 2. drop inline event-handler attributes
//! 3. bound embedded SVG inner content
//! 4. collapse whitespace runs in text nodes
//! 5. bound `href` attribute values
//! 6. strip presentational attributes
//! 7. bound comment text
//! 8. bound remaining attribute values (`class`/`id` get more room)
//! 9. bound text node content, with a remaining-character marker

use crate::reduce::TrimLimits;
use kuchiki::NodeRef;
use regex::Regex;
use std::sync::LazyLock;

/// Inline handler attributes removed in stage 2
const EVENT_HANDLER_ATTRS: [&str; 4] = ["onclick", "onmouseover", "onchange", "onload"];

/// Presentational attributes stripped in stage 6
const PRESENTATIONAL_ATTRS: [&str; 12] = [
    "height",
    "width",
    "colspan",
    "valign",
    "align",
    "style",
    "cellspacing",
    "color",
    "bgcolor",
    "border",
    "cellpadding",
    "bordercolor",
];

static WHITESPACE_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s{2,}").expect("WHITESPACE_RUN: hardcoded regex is valid"));

/// Text already carrying a remaining-count marker ends with this;
/// re-trimming it would grow a new marker on every pass
const COUNT_MARKER_SUFFIX: &str = "chars more]";

pub(crate) fn run(root: &NodeRef, limits: &TrimLimits) {
    remove_elements(root, "style, script");
    strip_attributes(root, &EVENT_HANDLER_ATTRS);
    trim_svg_content(root, limits.svg);
    collapse_text_whitespace(root);
    trim_attribute(root, "href", limits.href);
    strip_attributes(root, &PRESENTATIONAL_ATTRS);
    trim_comments(root, limits.comment);
    trim_remaining_attributes(root, limits);
    trim_text_nodes(root, limits.text);
}

fn remove_elements(root: &NodeRef, selector: &str) {
    // hardcoded selector, parse cannot fail
    let Ok(matches) = root.select(selector) else {
        return;
    };
    // collect before detaching: detach invalidates the live iterator
    let doomed: Vec<_> = matches.collect();
    for element in doomed {
        element.as_node().detach();
    }
}

fn strip_attributes(root: &NodeRef, names: &[&str]) {
    for node in root.inclusive_descendants() {
        if let Some(element) = node.as_element() {
            let mut attrs = element.attributes.borrow_mut();
            for name in names {
                attrs.remove(*name);
            }
        }
    }
}

fn trim_svg_content(root: &NodeRef, limit: usize) {
    let Ok(matches) = root.select("svg") else {
        return;
    };
    let svgs: Vec<_> = matches.collect();
    for svg in svgs {
        let node = svg.as_node();
        // an earlier pass left only the marker text; serializing it again
        // would escape entities and re-truncate with a fresh marker
        if svg_already_bounded(node) {
            continue;
        }
        let mut inner = Vec::new();
        for child in node.children() {
            if child.serialize(&mut inner).is_err() {
                return;
            }
        }
        let inner = String::from_utf8_lossy(&inner);
        if inner.chars().count() <= limit {
            continue;
        }
        let children: Vec<_> = node.children().collect();
        for child in children {
            child.detach();
        }
        node.append(NodeRef::new_text(truncate_with_count(&inner, limit)));
    }
}

/// An `<svg>` whose sole child is a marker-suffixed text node has
/// already been bounded
fn svg_already_bounded(node: &NodeRef) -> bool {
    let mut children = node.children();
    let Some(first) = children.next() else {
        return false;
    };
    if children.next().is_some() {
        return false;
    }
    match first.as_text() {
        Some(text) => text.borrow().ends_with(COUNT_MARKER_SUFFIX),
        None => false,
    }
}

fn collapse_text_whitespace(root: &NodeRef) {
    for node in root.inclusive_descendants() {
        if let Some(text) = node.as_text() {
            let mut text = text.borrow_mut();
            if WHITESPACE_RUN.is_match(&text) {
                let collapsed = WHITESPACE_RUN.replace_all(&text, " ").into_owned();
                *text = collapsed;
            }
        }
    }
}

fn trim_attribute(root: &NodeRef, name: &str, limit: usize) {
    for node in root.inclusive_descendants() {
        if let Some(element) = node.as_element() {
            let mut attrs = element.attributes.borrow_mut();
            if let Some(value) = attrs.get_mut(name) {
                if let Some(trimmed) = truncate_with_ellipsis(value, limit) {
                    *value = trimmed;
                }
            }
        }
    }
}

fn trim_comments(root: &NodeRef, limit: usize) {
    for node in root.inclusive_descendants() {
        if let Some(comment) = node.as_comment() {
            let mut comment = comment.borrow_mut();
            if let Some(trimmed) = truncate_with_ellipsis(&comment, limit) {
                *comment = trimmed;
            }
        }
    }
}

fn trim_remaining_attributes(root: &NodeRef, limits: &TrimLimits) {
    for node in root.inclusive_descendants() {
        let Some(element) = node.as_element() else {
            continue;
        };
        let mut attrs = element.attributes.borrow_mut();
        let names: Vec<String> = attrs
            .map
            .keys()
            .map(|name| name.local.to_string())
            .collect();
        for name in names {
            // href has its own stage and threshold
            if name == "href" {
                continue;
            }
            let limit = if name == "class" || name == "id" {
                limits.important_attr
            } else {
                limits.attr
            };
            if let Some(value) = attrs.get_mut(name.as_str()) {
                if let Some(trimmed) = truncate_with_ellipsis(value, limit) {
                    *value = trimmed;
                }
            }
        }
    }
}

fn trim_text_nodes(root: &NodeRef, limit: usize) {
    for node in root.inclusive_descendants() {
        if let Some(text) = node.as_text() {
            let mut text = text.borrow_mut();
            if text.ends_with(COUNT_MARKER_SUFFIX) {
                continue;
            }
            if text.chars().count() > limit {
                *text = truncate_with_count(&text, limit);
            }
        }
    }
}

/// Cuts to `limit` characters plus a bare ellipsis, or `None` if the
/// value already fits
fn truncate_with_ellipsis(value: &str, limit: usize) -> Option<String> {
    if value.chars().count() <= limit {
        return None;
    }
    let mut out: String = value.chars().take(limit).collect();
    out.push('…');
    Some(out)
}

/// Cuts to `limit` characters plus an ellipsis and the count of
/// characters dropped, e.g. `… [42 chars more]`
fn truncate_with_count(value: &str, limit: usize) -> String {
    let total = value.chars().count();
    let kept: String = value.chars().take(limit).collect();
    format!("{}… [{} chars more]", kept, total - limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::TendrilSink;

    fn reduced(html: &str) -> String {
        let document = kuchiki::parse_html().one(html);
        run(&document, &TrimLimits::default());
        let mut out = Vec::new();
        document.serialize(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_truncate_with_ellipsis() {
        assert_eq!(truncate_with_ellipsis("short", 30), None);
        assert_eq!(
            truncate_with_ellipsis(&"x".repeat(35), 30),
            Some(format!("{}…", "x".repeat(30)))
        );
    }

    #[test]
    fn test_truncate_with_ellipsis_is_stable() {
        let once = truncate_with_ellipsis(&"x".repeat(35), 30).unwrap();
        assert_eq!(truncate_with_ellipsis(&once, 30), Some(once.clone()));
    }

    #[test]
    fn test_truncate_with_count() {
        let out = truncate_with_count(&"a".repeat(150), 100);
        assert_eq!(out, format!("{}… [50 chars more]", "a".repeat(100)));
    }

    #[test]
    fn test_event_handlers_stripped() {
        let out = reduced(r#"<button onclick="evil()" onload="x()" type="button">go</button>"#);
        assert!(!out.contains("onclick"));
        assert!(!out.contains("onload"));
        assert!(out.contains(r#"type="button""#));
    }

    #[test]
    fn test_presentational_attrs_stripped() {
        let out = reduced(r#"<td colspan="2" align="left" data-row="1">x</td>"#);
        assert!(!out.contains("colspan"));
        assert!(!out.contains("align"));
        assert!(out.contains(r#"data-row="1""#));
    }

    #[test]
    fn test_class_gets_longer_allowance() {
        let class = "c".repeat(60);
        let title = "t".repeat(60);
        let out = reduced(&format!(r#"<div class="{}" title="{}">x</div>"#, class, title));
        // 60 chars fits the important allowance (70) but not the plain one (30)
        assert!(out.contains(&class));
        assert!(out.contains(&format!("{}…", "t".repeat(30))));
    }

    #[test]
    fn test_href_trimmed_at_own_threshold() {
        let href = format!("https://example.com/{}", "p".repeat(40));
        let out = reduced(&format!(r#"<a href="{}">x</a>"#, href));
        let expected: String = href.chars().take(30).collect();
        assert!(out.contains(&format!("{}…", expected)));
    }

    #[test]
    fn test_comments_trimmed_without_count() {
        let out = reduced(&format!("<div><!-- {} --></div>", "c".repeat(60)));
        assert!(out.contains('…'));
        assert!(!out.contains("chars more"));
    }

    #[test]
    fn test_svg_inner_content_bounded() {
        let circles = r#"<circle cx="1"/>"#.repeat(50);
        let out = reduced(&format!("<svg>{}</svg>", circles));
        assert!(out.contains("chars more]"));
        assert!(out.len() < circles.len());
    }

    #[test]
    fn test_svg_trim_is_stable() {
        let circles = r#"<circle cx="1"/>"#.repeat(50);
        let once = reduced(&format!("<svg>{}</svg>", circles));
        let twice = reduced(&once);
        assert_eq!(once, twice);
        // exactly one marker, never a marker inside a marker
        assert_eq!(twice.matches("chars more]").count(), 1);
    }

    #[test]
    fn test_marked_text_is_not_retrimmed() {
        let marked = format!("{}… [50 chars more]", "a".repeat(100));
        let out = reduced(&format!("<p>{}</p>", marked));
        assert!(out.contains(&marked));
        assert!(!out.contains("chars more]… ["));
    }
}
