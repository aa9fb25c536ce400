use serde::{Deserialize, Serialize};
use url::Url;

/// Clipped content of one page, ready for the note renderer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedContent {
    pub title: String,
    /// Markdown body.
    pub content: String,
    pub description: String,
    pub author: String,
    pub published: String,
    pub domain: String,
    pub favicon: String,
    pub image: String,
    pub word_count: u64,
    pub meta_tags: Vec<MetaTag>,
}

/// One `<meta>` element as the page reported it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTag {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub property: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

/// Analyzer output before sanitizing and conversion. Pages leave any of
/// these unset, so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawArticle {
    pub title: Option<String>,
    /// Primary content as HTML.
    pub content: Option<String>,
    pub description: Option<String>,
    pub author: Option<String>,
    pub published: Option<String>,
    pub favicon: Option<String>,
    pub image: Option<String>,
    pub word_count: Option<f64>,
    pub meta_tags: Option<Vec<MetaTag>>,
}

/// Hostname of the requested URL; empty for URLs without one.
pub fn domain_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_string()
}
