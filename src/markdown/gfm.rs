//! GitHub Flavored Markdown extensions: tables, strikethrough, task list items
//! and highlighted code blocks.
//!
//! Strikethrough and checkboxes are htmd handlers. Tables and highlighted
//! blocks need to look at sibling rows and classes, so they are rendered from
//! the scraper tree before htmd sees the document.

use std::sync::LazyLock;

use htmd::Element;
use regex::Regex;
use scraper::ElementRef;

use super::MarkdownConverter;

static HIGHLIGHT_LANGUAGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"highlight-(?:text|source)-([a-z0-9]+)").unwrap());

pub(crate) const STRIKETHROUGH_TAGS: &[&str] = &["del", "s", "strike"];

pub(crate) fn strikethrough(element: Element) -> Option<String> {
    let content = element.content.trim();
    if content.is_empty() {
        return Some(String::new());
    }
    Some(format!("~{content}~"))
}

/// `[x] ` or `[ ] ` for checkboxes; other inputs have no Markdown form.
pub(crate) fn checkbox(element: Element) -> Option<String> {
    let attr = |name: &str| {
        element
            .attrs
            .iter()
            .find(|a| &*a.name.local == name)
            .map(|a| a.value.to_string())
    };
    if !attr("type").is_some_and(|t| t.eq_ignore_ascii_case("checkbox")) {
        return Some(String::new());
    }
    if attr("checked").is_some() {
        Some("[x] ".to_string())
    } else {
        Some("[ ] ".to_string())
    }
}

/// Language of a `div.highlight-source-*` wrapper around a `<pre>`.
pub(crate) fn highlight_language<'a>(element: &ElementRef<'a>) -> Option<&'a str> {
    if element.value().name() != "div" {
        return None;
    }
    let first_child = child_elements(element).next()?;
    if first_child.value().name() != "pre" {
        return None;
    }
    let class = element.value().attr("class")?;
    Some(HIGHLIGHT_LANGUAGE.captures(class)?.get(1)?.as_str())
}

pub(crate) fn highlighted_block(element: &ElementRef<'_>, language: &str) -> String {
    let code: String = element.text().collect();
    let fence = fence_for(&code, "```");
    let code = code.strip_suffix('\n').unwrap_or(&code);
    format!("{fence}{language}\n{code}\n{fence}")
}

/// A fence longer than any backtick run at the start of a line in `code`.
pub(crate) fn fence_for(code: &str, fence: &str) -> String {
    let fence_char = fence.chars().next().unwrap_or('`');
    let mut size = fence.chars().count().max(3);
    for line in code.lines() {
        let run = line.chars().take_while(|c| *c == fence_char).count();
        if run >= 3 && run >= size {
            size = run + 1;
        }
    }
    fence_char.to_string().repeat(size)
}

/// Tables open with a heading row become pipe tables; any other table has no
/// faithful Markdown form.
pub(crate) fn has_heading_row(table: &ElementRef<'_>) -> bool {
    rows(table).first().is_some_and(is_heading_row)
}

/// Pipe table with each cell's content converted by `converter`.
pub(crate) fn table(table: &ElementRef<'_>, converter: &MarkdownConverter) -> String {
    let mut lines = Vec::new();
    for row in rows(table) {
        let cells: Vec<_> = child_elements(&row)
            .filter(|c| matches!(c.value().name(), "th" | "td"))
            .collect();
        if cells.is_empty() {
            continue;
        }

        let contents: Vec<_> = cells
            .iter()
            .map(|cell| cell_content(&converter.convert(&cell.inner_html())))
            .collect();
        lines.push(format!("| {} |", contents.join(" | ")));

        if is_heading_row(&row) {
            let borders: Vec<_> = cells.iter().map(alignment).collect();
            lines.push(format!("| {} |", borders.join(" | ")));
        }
    }
    lines.join("\n")
}

fn cell_content(markdown: &str) -> String {
    markdown.trim().replace('\n', " ").replace('|', "\\|")
}

fn alignment(cell: &ElementRef<'_>) -> &'static str {
    let align = cell.value().attr("align").unwrap_or_default();
    match align.to_ascii_lowercase().as_str() {
        "left" => ":--",
        "right" => "--:",
        "center" => ":-:",
        _ => "---",
    }
}

/// Rows in document order, looking through `thead`, `tbody` and `tfoot`.
fn rows<'a>(table: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    let mut rows = Vec::new();
    for child in child_elements(table) {
        match child.value().name() {
            "tr" => rows.push(child),
            "thead" | "tbody" | "tfoot" => {
                rows.extend(child_elements(&child).filter(|r| r.value().name() == "tr"))
            }
            _ => {}
        }
    }
    rows
}

/// A row inside `<thead>`, or the first row of a table whose first section has
/// nothing but `<th>` cells.
fn is_heading_row(row: &ElementRef<'_>) -> bool {
    let Some(parent) = parent_element(row) else {
        return false;
    };
    if parent.value().name() == "thead" {
        return true;
    }

    let is_first_child = child_elements(&parent).next().map(|c| c.id()) == Some(row.id());
    let first_section = parent.value().name() == "table"
        || parent_element(&parent)
            .and_then(|table| child_elements(&table).next())
            .map(|c| c.id())
            == Some(parent.id());

    is_first_child
        && first_section
        && child_elements(row).all(|cell| cell.value().name() == "th")
}

fn parent_element<'a>(element: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.parent().and_then(ElementRef::wrap)
}

pub(crate) fn child_elements<'a>(element: &ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}
