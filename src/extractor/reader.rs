//! In-process readability over the rendered DOM.

use async_trait::async_trait;
use readability::extractor;
use scraper::{Html, Selector};
use tracing::instrument;
use url::Url;

use crate::extractor::analyzer::DocumentAnalyzer;
use crate::extractor::errors::ExtractError;
use crate::extractor::model::{MetaTag, RawArticle};
use crate::session::PageContext;

/// Serializes the live document after scripts have run and extracts the
/// article from that snapshot.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadabilityAnalyzer;

#[async_trait]
impl DocumentAnalyzer for ReadabilityAnalyzer {
    fn name(&self) -> &'static str {
        "readability"
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn analyze(&self, page: &dyn PageContext, url: &Url) -> Result<RawArticle, ExtractError> {
        let html = page
            .content()
            .await
            .map_err(|e| ExtractError::ExtractionUnavailable(e.to_string()))?;
        parse_document(&html, url)
    }
}

/// Extract the article and page metadata from a serialized document.
pub fn parse_document(html: &str, url: &Url) -> Result<RawArticle, ExtractError> {
    let article = extractor::extract(&mut html.as_bytes(), url)
        .map_err(|e| ExtractError::ExtractionUnavailable(format!("readability: {e}")))?;

    let document = Html::parse_document(html);
    let meta_tags = meta_tags(&document);

    let title = Some(article.title)
        .filter(|t| !t.trim().is_empty())
        .or_else(|| meta_content(&meta_tags, &["og:title"]))
        .unwrap_or_default();
    let word_count = article.text.split_whitespace().count();

    Ok(RawArticle {
        title: Some(title),
        content: Some(article.content),
        description: meta_content(&meta_tags, &["description", "og:description", "twitter:description"]),
        author: meta_content(&meta_tags, &["author", "article:author", "twitter:creator"]),
        published: meta_content(&meta_tags, &["article:published_time", "date", "pubdate"])
            .or_else(|| first_attr(&document, "time[datetime]", "datetime")),
        favicon: favicon(&document, url),
        image: meta_content(&meta_tags, &["og:image", "twitter:image"]),
        word_count: Some(word_count as f64),
        meta_tags: Some(meta_tags),
    })
}

fn meta_tags(document: &Html) -> Vec<MetaTag> {
    let Ok(selector) = Selector::parse("meta") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let attr = |name: &str| element.value().attr(name).map(str::to_string);
            let tag = MetaTag {
                name: attr("name"),
                property: attr("property"),
                content: attr("content"),
            };
            (tag.name.is_some() || tag.property.is_some()).then_some(tag)
        })
        .collect()
}

/// Content of the first non-empty tag whose name or property is listed,
/// trying the keys in order.
fn meta_content(tags: &[MetaTag], keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        tags.iter()
            .filter(|tag| {
                tag.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(key))
                    || tag.property.as_deref().is_some_and(|p| p.eq_ignore_ascii_case(key))
            })
            .find_map(|tag| tag.content.as_deref().map(str::trim).filter(|c| !c.is_empty()))
            .map(str::to_string)
    })
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .find_map(|element| element.value().attr(attr))
        .map(str::to_string)
}

fn favicon(document: &Html, url: &Url) -> Option<String> {
    let declared = first_attr(document, "link[rel~='icon']", "href")
        .or_else(|| first_attr(document, "link[rel='shortcut icon']", "href"));

    match declared {
        Some(href) => url.join(&href).ok().map(String::from),
        None if url.has_host() => url.join("/favicon.ico").ok().map(String::from),
        None => None,
    }
}
