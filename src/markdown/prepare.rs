//! Scraper pass run before htmd.
//!
//! Elements htmd cannot render well are replaced by placeholder text and
//! rendered here instead; after conversion [`restore`] swaps the placeholders
//! for their Markdown. The pass also bounds nesting depth, since the htmd walk
//! recurses once per level.

use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use scraper::node::Text;
use scraper::{ElementRef, Html, Node};

use super::MarkdownConverter;
use super::gfm;

/// Elements nested deeper than this are reduced to their text.
pub(crate) const MAX_DEPTH: usize = 64;

/// `<ol start>` values wider than this many digits are dropped.
const MAX_START_DIGITS: usize = 9;

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "audio", "blockquote", "body", "canvas", "center", "dd", "dir",
    "div", "dl", "dt", "fieldset", "figcaption", "figure", "footer", "form", "frameset", "h1",
    "h2", "h3", "h4", "h5", "h6", "header", "hgroup", "hr", "html", "isindex", "li", "main",
    "menu", "nav", "noframes", "noscript", "ol", "output", "p", "pre", "section", "table",
    "tbody", "td", "tfoot", "th", "thead", "tr", "ul",
];

const OPEN: char = '\u{E000}';
const CLOSE: char = '\u{E001}';

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}[0-9]+\u{E001}").unwrap());

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum SetAside {
    Block(String),
    Inline(String),
}

#[derive(Debug)]
pub(crate) struct Prepared {
    pub html: String,
    pub set_aside: Vec<SetAside>,
}

pub(crate) fn prepare(html: &str, converter: &MarkdownConverter) -> Prepared {
    let mut doc = Html::parse_fragment(html);
    let flattened = flatten_deep(&mut doc);

    // Outermost elements that bypass htmd, in document order
    let mut chosen = HashSet::new();
    let mut rendered = Vec::new();
    for node in doc.root_element().descendants() {
        let Some(element) = ElementRef::wrap(node) else {
            continue;
        };
        if node.ancestors().any(|a| chosen.contains(&a.id())) {
            continue;
        }
        if let Some(replacement) = render(&element, converter) {
            chosen.insert(node.id());
            rendered.push((node.id(), replacement));
        }
    }
    if !flattened && rendered.is_empty() {
        return Prepared {
            html: html.to_string(),
            set_aside: Vec::new(),
        };
    }

    let mut set_aside = Vec::with_capacity(rendered.len());
    for (index, (id, replacement)) in rendered.into_iter().enumerate() {
        let Some(mut node) = doc.tree.get_mut(id) else {
            continue;
        };
        node.insert_before(Node::Text(Text {
            text: format!("{OPEN}{index}{CLOSE}").into(),
        }));
        node.detach();
        set_aside.push(replacement);
    }

    Prepared {
        html: doc.root_element().inner_html(),
        set_aside,
    }
}

/// Replace every placeholder in `markdown` with what it stands for. Block
/// replacements are separated from their neighbours by one blank line.
pub(crate) fn restore(markdown: &str, set_aside: &[SetAside]) -> String {
    if set_aside.is_empty() {
        return markdown.to_string();
    }

    let mut out = String::with_capacity(markdown.len());
    let mut last = 0;
    let mut after_block = false;

    for found in PLACEHOLDER.find_iter(markdown) {
        push_text(&mut out, &markdown[last..found.start()], after_block);
        last = found.end();
        after_block = false;

        let index = found
            .as_str()
            .trim_matches([OPEN, CLOSE])
            .parse::<usize>()
            .ok();
        match index.and_then(|i| set_aside.get(i)) {
            Some(SetAside::Block(block)) => {
                let kept = out.trim_end_matches([' ', '\n']).len();
                out.truncate(kept);
                if !out.is_empty() {
                    out.push_str("\n\n");
                }
                out.push_str(block);
                after_block = true;
            }
            Some(SetAside::Inline(inline)) => out.push_str(inline),
            None => out.push_str(found.as_str()),
        }
    }
    push_text(&mut out, &markdown[last..], after_block);
    out
}

fn push_text(out: &mut String, text: &str, after_block: bool) {
    if !after_block {
        out.push_str(text);
        return;
    }
    let text = text.trim_start_matches([' ', '\n']);
    if !text.is_empty() {
        out.push_str("\n\n");
        out.push_str(text);
    }
}

/// Cut every element at [`MAX_DEPTH`] that still has element children down
/// to a single text node. Returns whether anything changed.
fn flatten_deep(doc: &mut Html) -> bool {
    let mut depths = HashMap::new();
    let mut too_deep = Vec::new();

    for node in doc.tree.root().descendants() {
        let depth = node
            .parent()
            .and_then(|parent| depths.get(&parent.id()))
            .map_or(0, |d| d + 1);
        depths.insert(node.id(), depth);

        if depth == MAX_DEPTH
            && let Some(element) = ElementRef::wrap(node)
            && element.children().any(|c| c.value().is_element())
        {
            too_deep.push((node.id(), element.text().collect::<String>()));
        }
    }

    let flattened = !too_deep.is_empty();
    for (id, text) in too_deep {
        let Some(mut node) = doc.tree.get_mut(id) else {
            continue;
        };
        while let Some(mut child) = node.first_child() {
            child.detach();
        }
        node.append(Node::Text(Text { text: text.into() }));
    }
    flattened
}

fn render(element: &ElementRef<'_>, converter: &MarkdownConverter) -> Option<SetAside> {
    let name = element.value().name();

    if converter.keeps(name) {
        return Some(if BLOCK_ELEMENTS.contains(&name) {
            SetAside::Block(element.html())
        } else {
            SetAside::Inline(element.html())
        });
    }

    if name == "table" {
        if !converter.gfm_enabled() {
            return None;
        }
        return Some(if gfm::has_heading_row(element) {
            SetAside::Block(gfm::table(element, converter))
        } else {
            SetAside::Block(element.html())
        });
    }

    if name == "ol" && oversized_start(element) {
        let list = format!("<ol>{}</ol>", element.inner_html());
        return Some(SetAside::Block(converter.convert(&list)));
    }

    if converter.gfm_enabled()
        && let Some(language) = gfm::highlight_language(element)
    {
        return Some(SetAside::Block(gfm::highlighted_block(element, language)));
    }

    None
}

/// `start` values too wide to number from are treated as absent.
fn oversized_start(list: &ElementRef<'_>) -> bool {
    list.value().attr("start").is_some_and(|start| {
        let digits = start.trim().trim_start_matches(['-', '+']);
        digits.len() > MAX_START_DIGITS
    })
}
