//! HTML to Markdown conversion on top of htmd.
//!
//! htmd does the CommonMark work. A scraper pass in front of it renders the
//! GFM constructs that need the whole element (tables, highlighted blocks),
//! emits kept elements verbatim and bounds nesting depth.

mod gfm;
mod prepare;

use htmd::HtmlToMarkdown;
use scraper::Html;
use tracing::warn;

pub use htmd::Element;
pub use htmd::options::{CodeBlockStyle, HeadingStyle, Options};

/// Renders an element given the Markdown of its children. `None` drops it.
pub type Handler = Box<dyn Fn(Element) -> Option<String> + Send + Sync>;

pub struct MarkdownConverter {
    inner: HtmlToMarkdown,
    keep: Vec<String>,
    gfm: bool,
}

impl Default for MarkdownConverter {
    /// ATX headings, fenced code blocks and the GFM extensions.
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MarkdownConverter {
    pub fn builder() -> MarkdownConverterBuilder {
        MarkdownConverterBuilder::default()
    }

    /// Convert an HTML fragment. Never fails: if htmd rejects the input the
    /// text content is returned instead.
    pub fn convert(&self, html: &str) -> String {
        let prepared = prepare::prepare(html, self);
        let markdown = match self.inner.convert(&prepared.html) {
            Ok(markdown) => markdown,
            Err(err) => {
                warn!("markdown conversion failed, keeping text only: {}", err);
                Html::parse_fragment(&prepared.html)
                    .root_element()
                    .text()
                    .collect::<String>()
            }
        };
        post_process(&prepare::restore(&markdown, &prepared.set_aside))
    }

    pub(crate) fn keeps(&self, tag: &str) -> bool {
        self.keep.iter().any(|kept| kept.eq_ignore_ascii_case(tag))
    }

    pub(crate) fn gfm_enabled(&self) -> bool {
        self.gfm
    }
}

pub struct MarkdownConverterBuilder {
    options: Options,
    gfm: bool,
    keep: Vec<String>,
    remove: Vec<&'static str>,
    handlers: Vec<(Vec<&'static str>, Handler)>,
}

impl Default for MarkdownConverterBuilder {
    fn default() -> Self {
        Self {
            options: Options {
                heading_style: HeadingStyle::Atx,
                code_block_style: CodeBlockStyle::Fenced,
                ..Options::default()
            },
            gfm: true,
            keep: Vec::new(),
            remove: Vec::new(),
            handlers: Vec::new(),
        }
    }
}

impl MarkdownConverterBuilder {
    pub fn options(mut self, options: Options) -> Self {
        self.options = options;
        self
    }

    /// Tables, strikethrough, task list items and highlighted code blocks.
    pub fn gfm(mut self, enabled: bool) -> Self {
        self.gfm = enabled;
        self
    }

    /// Emit these elements as their original HTML.
    pub fn keep(mut self, tags: &[&str]) -> Self {
        self.keep.extend(tags.iter().map(|tag| tag.to_ascii_lowercase()));
        self
    }

    /// Drop these elements together with their content.
    pub fn remove(mut self, tags: &[&'static str]) -> Self {
        self.remove.extend_from_slice(tags);
        self
    }

    /// Render `tags` with `handler`. Takes precedence over the built-in
    /// handling of the same tags.
    pub fn add_handler<F>(mut self, tags: &[&'static str], handler: F) -> Self
    where
        F: Fn(Element) -> Option<String> + Send + Sync + 'static,
    {
        self.handlers.push((tags.to_vec(), Box::new(handler)));
        self
    }

    pub fn build(self) -> MarkdownConverter {
        let claimed: Vec<&'static str> = self
            .handlers
            .iter()
            .flat_map(|(tags, _)| tags.iter().copied())
            .chain(self.remove.iter().copied())
            .collect();
        let unclaimed = |tags: &[&'static str]| -> Vec<&'static str> {
            tags.iter()
                .copied()
                .filter(|tag| !claimed.contains(tag))
                .collect()
        };

        let mut inner = HtmlToMarkdown::builder().options(self.options);
        if !self.remove.is_empty() {
            inner = inner.skip_tags(self.remove);
        }
        if self.gfm {
            let strikethrough = unclaimed(gfm::STRIKETHROUGH_TAGS);
            if !strikethrough.is_empty() {
                inner = inner.add_handler(strikethrough, gfm::strikethrough);
            }
            if !claimed.contains(&"input") {
                inner = inner.add_handler(vec!["input"], gfm::checkbox);
            }
        }
        for (tags, handler) in self.handlers {
            inner = inner.add_handler(tags, handler);
        }

        MarkdownConverter {
            inner: inner.build(),
            keep: self.keep,
            gfm: self.gfm,
        }
    }
}

fn post_process(output: &str) -> String {
    output
        .trim_start_matches(['\t', '\r', '\n'])
        .trim_end()
        .to_string()
}
