//! Compression statistics over a reduced tree

use kuchiki::NodeRef;

/// Statistics for one reduction call
#[derive(Debug, Clone, PartialEq)]
pub struct ReductionStats {
    /// Input document length in bytes
    pub input_len: usize,

    /// Reduced document length in bytes
    pub output_len: usize,

    /// `1 - output/input`, rounded to 4 decimals
    pub compression_ratio: f64,

    /// Elements in the reduced tree
    pub element_count: usize,

    /// Deepest element nesting level (root element = 1)
    pub max_depth: usize,

    /// Elements sitting at exactly half the maximum depth
    pub elements_at_half_depth: usize,
}

pub(crate) fn compute(root: &NodeRef, input_len: usize, output_len: usize) -> ReductionStats {
    let mut element_count = 0;
    let mut max_depth = 0;
    walk(root, 0, &mut element_count, &mut max_depth, None, &mut 0);

    let half_depth = max_depth / 2;
    let mut elements_at_half_depth = 0;
    if half_depth > 0 {
        let mut ignored_count = 0;
        let mut ignored_depth = 0;
        walk(
            root,
            0,
            &mut ignored_count,
            &mut ignored_depth,
            Some(half_depth),
            &mut elements_at_half_depth,
        );
    }

    let compression_ratio = if input_len == 0 {
        0.0
    } else {
        let ratio = 1.0 - (output_len as f64 / input_len as f64);
        (ratio * 10_000.0).round() / 10_000.0
    };

    ReductionStats {
        input_len,
        output_len,
        compression_ratio,
        element_count,
        max_depth,
        elements_at_half_depth,
    }
}

fn walk(
    node: &NodeRef,
    depth: usize,
    element_count: &mut usize,
    max_depth: &mut usize,
    target_depth: Option<usize>,
    at_target: &mut usize,
) {
    let child_depth = if node.as_element().is_some() {
        let depth = depth + 1;
        *element_count += 1;
        *max_depth = (*max_depth).max(depth);
        if target_depth == Some(depth) {
            *at_target += 1;
        }
        depth
    } else {
        depth
    };

    for child in node.children() {
        walk(
            &child,
            child_depth,
            element_count,
            max_depth,
            target_depth,
            at_target,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kuchiki::traits::TendrilSink;

    #[test]
    fn test_counts_and_depth() {
        let html = "<html><head></head><body><div><p>a</p><p>b</p></div></body></html>";
        let document = kuchiki::parse_html().one(html);
        let stats = compute(&document, 100, 50);

        // html, head, body, div, p, p
        assert_eq!(stats.element_count, 6);
        // html(1) > body(2) > div(3) > p(4)
        assert_eq!(stats.max_depth, 4);
        // depth 2: head and body
        assert_eq!(stats.elements_at_half_depth, 2);
    }

    #[test]
    fn test_ratio_rounding() {
        let document = kuchiki::parse_html().one("<p>x</p>");
        let stats = compute(&document, 3, 1);
        assert!((stats.compression_ratio - 0.6667).abs() < f64::EPSILON);
    }

    #[test]
    fn test_zero_input_is_safe() {
        let document = kuchiki::parse_html().one("");
        let stats = compute(&document, 0, 0);
        assert_eq!(stats.compression_ratio, 0.0);
    }
}
