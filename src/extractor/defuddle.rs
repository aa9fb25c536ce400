//! Defuddle running inside the page against the live document.

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::OnceCell;
use tracing::{debug, instrument};
use url::Url;

use crate::extractor::analyzer::DocumentAnalyzer;
use crate::extractor::errors::ExtractError;
use crate::extractor::model::RawArticle;
use crate::fetcher;
use crate::session::PageContext;

/// Reads the global left behind by the bundle and parses `document`.
const PARSE_SCRIPT: &str = r#"(() => {
  const exported = window.Defuddle;
  const Defuddle = exported && (exported.default || exported);
  if (typeof Defuddle !== 'function') {
    throw new Error('Defuddle not available in browser context');
  }
  const parsed = new Defuddle(document).parse();
  return {
    title: parsed.title,
    content: parsed.content,
    description: parsed.description,
    author: parsed.author,
    published: parsed.published,
    favicon: parsed.favicon,
    image: parsed.image,
    wordCount: parsed.wordCount,
    metaTags: parsed.metaTags || []
  };
})()"#;

const BUNDLE_ATTEMPTS: u32 = 3;

enum Bundle {
    Remote { url: String, source: OnceCell<String> },
    Inline(String),
}

pub struct DefuddleAnalyzer {
    bundle: Bundle,
}

impl DefuddleAnalyzer {
    /// Bundle downloaded from `url` on first use and cached for the process.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            bundle: Bundle::Remote {
                url: url.into(),
                source: OnceCell::new(),
            },
        }
    }

    /// Bundle supplied directly, e.g. read from disk.
    pub fn with_bundle(source: impl Into<String>) -> Self {
        Self {
            bundle: Bundle::Inline(source.into()),
        }
    }

    async fn source(&self) -> Result<&str, ExtractError> {
        match &self.bundle {
            Bundle::Inline(source) => Ok(source.as_str()),
            Bundle::Remote { url, source } => source
                .get_or_try_init(|| async {
                    debug!(%url, "downloading defuddle bundle");
                    fetcher::fetch_text_retrying(url, BUNDLE_ATTEMPTS).await
                })
                .await
                .map(String::as_str)
                .map_err(|e| {
                    ExtractError::ExtractionUnavailable(format!("defuddle bundle: {e}"))
                }),
        }
    }
}

#[async_trait]
impl DocumentAnalyzer for DefuddleAnalyzer {
    fn name(&self) -> &'static str {
        "defuddle"
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn analyze(&self, page: &dyn PageContext, url: &Url) -> Result<RawArticle, ExtractError> {
        let source = self.source().await?;

        // The trailing statement keeps the bundle's completion value out of
        // the response.
        page.evaluate(&format!("{source}\n;void 0;"))
            .await
            .map_err(|e| ExtractError::ExtractionUnavailable(format!("inject: {e}")))?;

        let value = page
            .evaluate(PARSE_SCRIPT)
            .await
            .map_err(|e| ExtractError::ExtractionUnavailable(format!("parse: {e}")))?;

        parse_result(value)
    }
}

fn parse_result(value: Value) -> Result<RawArticle, ExtractError> {
    if !value.is_object() {
        return Err(ExtractError::ExtractionUnavailable(format!(
            "unexpected analyzer result: {value}"
        )));
    }
    serde_json::from_value(value)
        .map_err(|e| ExtractError::ExtractionUnavailable(format!("malformed analyzer result: {e}")))
}
