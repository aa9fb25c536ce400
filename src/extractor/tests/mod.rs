use std::fs;
use url::Url;

use crate::extractor::cleaner::sanitize;
use crate::extractor::reader::parse_document;
use crate::markdown::MarkdownConverter;

fn fixture() -> String {
    fs::read_to_string("src/extractor/tests/fixtures/article.html")
        .expect("Failed to read test fixture")
}

#[test]
fn test_readability_finds_article() {
    let url = Url::parse("https://news.example.com/2024/sample").unwrap();
    let raw = parse_document(&fixture(), &url).unwrap();

    assert!(raw.title.unwrap().contains("Sample Article"));
    let content = raw.content.unwrap();
    assert!(content.contains("first paragraph"));
    assert!(content.contains("second paragraph"));
    assert_eq!(raw.author.as_deref(), Some("Jane Doe"));
    assert_eq!(
        raw.description.as_deref(),
        Some("A short article used to exercise the clipper.")
    );
    assert_eq!(
        raw.favicon.as_deref(),
        Some("https://news.example.com/favicon.ico")
    );
}

#[test]
fn test_sanitized_article_converts_to_markdown() {
    let url = Url::parse("https://news.example.com/2024/sample").unwrap();
    let raw = parse_document(&fixture(), &url).unwrap();

    let html = sanitize(&raw.content.unwrap());
    assert!(!html.contains("<script"));
    assert!(!html.contains("<style"));
    assert!(!html.contains("style="));

    let markdown = MarkdownConverter::default().convert(&html);
    assert!(markdown.contains("first paragraph"));
    assert!(!markdown.contains("document.write"));
    assert!(!markdown.contains("<p"));
}

#[test]
fn test_whole_page_sanitize_and_convert() {
    let html = sanitize(&fixture());
    let markdown = MarkdownConverter::default().convert(&html);

    assert!(markdown.contains("# Sample Article"));
    assert!(markdown.contains("## Details"));
    assert!(markdown.contains("First point\n"));
    assert!(markdown.contains("Second point"));
    assert!(markdown.contains("[a related story](/related)"));
    assert!(markdown.contains("_emphasis_") || markdown.contains("*emphasis*"));
    assert!(markdown.contains("**strong words**"));
    assert!(markdown.contains("![Sample image](/images/sample.jpg)"));
    assert!(!markdown.contains("analytics"));
    assert!(!markdown.contains("font-family"));
}

#[cfg(feature = "fuzz")]
mod fuzz {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_sanitize_never_panics(html in ".*") {
            let _ = sanitize(&html);
        }

        #[test]
        fn test_sanitize_removes_closed_scripts(
            before in "[a-z ]*",
            body in "[a-z ]*",
            after in "[a-z ]*",
        ) {
            let html = format!("{before}<script>{body}</script><p>{after}</p>");
            let cleaned = sanitize(&html);
            prop_assert!(!cleaned.contains("</script>"));
            prop_assert!(cleaned.contains(&format!("<p>{after}</p>")));
        }

        #[test]
        fn test_convert_never_panics(html in ".*") {
            let _ = MarkdownConverter::default().convert(&sanitize(&html));
        }
    }
}
