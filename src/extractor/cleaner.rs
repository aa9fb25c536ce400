use std::sync::LazyLock;

use regex::{Captures, Regex};

static SCRIPT_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b.*?</script\s*>").unwrap());
static STYLE_ELEMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b.*?</style\s*>").unwrap());
// An opening tag. Quoted values are skipped whole; a quote with no partner
// before the next '<' or '>' is an ordinary character.
static OPEN_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"<[a-zA-Z](?:[^<>"']|"[^"<>]*"|'[^'<>]*'|["'])*>"#).unwrap()
});
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\s+([^\s"'>/=]+)(?:\s*=\s*(?:"[^"]*"|'[^']*'|[^\s"'>]+))?"#).unwrap()
});

/// Strip `<script>` and `<style>` elements and inline `style` attributes.
///
/// Total over any input. Text outside tags is left alone, and an element
/// missing its closing tag stays in place.
pub fn sanitize(html: &str) -> String {
    let html = SCRIPT_ELEMENT.replace_all(html, "");
    let html = STYLE_ELEMENT.replace_all(&html, "");
    OPEN_TAG
        .replace_all(&html, |tag: &Captures| strip_style_attributes(&tag[0]))
        .into_owned()
}

fn strip_style_attributes(tag: &str) -> String {
    ATTRIBUTE
        .replace_all(tag, |attr: &Captures| {
            if attr[1].eq_ignore_ascii_case("style") {
                String::new()
            } else {
                attr[0].to_string()
            }
        })
        .into_owned()
}
