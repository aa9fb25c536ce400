//! Markdown notes with YAML frontmatter.

use crate::bookmarks::BookmarkRecord;
use crate::extractor::ExtractedContent;

/// Render the note for `record`: frontmatter, a blank line, then the body.
///
/// Field order is fixed. `title` and `description` are double-quoted
/// scalars; `url`, `date_added` and `domain` are written as-is.
pub fn render(record: &BookmarkRecord, content: &ExtractedContent) -> String {
    format!(
        "---\n\
         title: \"{title}\"\n\
         url: {url}\n\
         date_added: {date_added}\n\
         status: {status}\n\
         domain: {domain}\n\
         description: \"{description}\"\n\
         ---\n\n\
         {body}",
        title = quote(&content.title),
        url = record.url,
        date_added = record.time_added,
        status = record.status,
        domain = content.domain,
        description = quote(&content.description),
        body = content.content,
    )
}

/// Escape for a double-quoted YAML scalar.
fn quote(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            _ => escaped.push(c),
        }
    }
    escaped
}
