//! Integration tests for the HTML reduction pipeline

use kumo_sift::reduce::{reduce, ReduceOptions};
use kumo_sift::ReduceError;

fn default_reduce(html: &str) -> kumo_sift::reduce::Reduction {
    reduce(html, &ReduceOptions::default()).unwrap()
}

#[test]
fn test_whitespace_collapses_to_single_space() {
    let out = default_reduce("<p>Hello     world</p>");
    assert!(out.html.contains("<p>Hello world</p>"));
}

#[test]
fn test_long_text_truncated_with_count() {
    let out = default_reduce(&format!("<p>{}</p>", "a".repeat(150)));
    let expected = format!("{}… [50 chars more]", "a".repeat(100));
    assert!(out.html.contains(&expected));
}

#[test]
fn test_full_noise_strip() {
    let html = r#"<html><head>
        <style>body { color: red; }</style>
        <script src="app.js"></script>
    </head><body>
        <div onclick="track()" style="color:blue" width="100" class="content">
            <a href="/ok">fine</a>
        </div>
    </body></html>"#;
    let out = default_reduce(html);

    assert!(!out.html.contains("<style"));
    assert!(!out.html.contains("<script"));
    assert!(!out.html.contains("onclick"));
    assert!(!out.html.contains("style="));
    assert!(!out.html.contains("width="));
    assert!(out.html.contains(r#"class="content""#));
    assert!(out.html.contains(r#"href="/ok""#));
}

#[test]
fn test_reduction_idempotence() {
    let html = format!(
        r#"<html><body>
            <div class="{}" title="{}">
                <p>{}</p>
                <a href="https://example.com/{}">x</a>
                <!-- {} -->
            </div>
        </body></html>"#,
        "c".repeat(90),
        "t".repeat(50),
        "a".repeat(200),
        "p".repeat(60),
        "m".repeat(80),
    );

    let once = reduce(&html, &ReduceOptions::default()).unwrap();
    let twice = reduce(&once.html, &ReduceOptions::default()).unwrap();
    assert_eq!(once.html, twice.html, "re-reducing must not shrink further");
}

#[test]
fn test_svg_idempotence() {
    let circles = r#"<circle cx="1" cy="2" r="3"/>"#.repeat(50);
    let html = format!("<html><body><svg>{}</svg></body></html>", circles);

    let once = reduce(&html, &ReduceOptions::default()).unwrap();
    let twice = reduce(&once.html, &ReduceOptions::default()).unwrap();
    assert_eq!(once.html, twice.html, "bounded svg content must stay put");
    // the serialized marker entities must not be re-escaped on a second pass
    assert!(!twice.html.contains("&amp;lt;"));
}

#[test]
fn test_selector_errors() {
    let err = reduce(
        "<p>hi</p>",
        &ReduceOptions {
            selector: Some("article.missing".to_string()),
            ..ReduceOptions::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, ReduceError::SelectorNoMatch(_)));

    let err = reduce(
        "<p>hi</p>",
        &ReduceOptions {
            selector: Some(":::".to_string()),
            ..ReduceOptions::default()
        },
    )
    .unwrap_err();
    assert!(matches!(err, ReduceError::InvalidSelector(_)));
}

#[test]
fn test_selector_scope_limits_output() {
    let html = r#"<html><body>
        <nav><a href="/home">home</a></nav>
        <article id="post"><h1>Title</h1><p>Body text</p></article>
    </body></html>"#;
    let out = reduce(
        html,
        &ReduceOptions {
            selector: Some("article#post".to_string()),
            ..ReduceOptions::default()
        },
    )
    .unwrap();

    assert!(out.html.contains("Title"));
    assert!(!out.html.contains("nav"));
    assert!(out.outline.starts_with("article"));
}

#[test]
fn test_outlines_differ_in_scope() {
    let html = "<html><head><title>T</title></head>\
                <body><main><div><p>Deep text</p></div></main></body></html>";
    let out = default_reduce(html);

    assert!(out.outline.starts_with("html"));
    assert!(out.outline.contains("title"));
    assert!(out.outline_top.starts_with("body"));
    assert!(!out.outline_top.contains("title"));
    assert!(out.outline_top.contains("{Deep text}"));
}

#[test]
fn test_stats_on_real_document() {
    let html = format!(
        "<html><body><div><div><p>{}</p></div></div></body></html>",
        "word ".repeat(100)
    );
    let out = default_reduce(&html);

    assert_eq!(out.stats.input_len, html.len());
    assert_eq!(out.stats.output_len, out.html.len());
    assert!(out.stats.compression_ratio > 0.0);
    // html > body > div > div > p
    assert_eq!(out.stats.max_depth, 5);
    assert_eq!(out.stats.element_count, 6);
}
