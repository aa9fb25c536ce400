pub mod analyzer;
pub mod cleaner;
pub mod defuddle;
pub mod errors;
pub mod model;
pub mod reader;

#[cfg(test)]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, instrument, warn};
use url::Url;

pub use analyzer::DocumentAnalyzer;
pub use defuddle::DefuddleAnalyzer;
pub use errors::{ErrorKind, ExtractError};
pub use model::{ExtractedContent, MetaTag, RawArticle, domain_of};
pub use reader::ReadabilityAnalyzer;

use crate::config::{AnalyzerKind, Config, DEFAULT_NAVIGATION_TIMEOUT_MS};
use crate::markdown::MarkdownConverter;
use crate::session::{BrowserSession, PageContext, SessionError, SessionOptions};

/// Renders pages in the session's browser and turns their readable content
/// into Markdown.
pub struct ContentExtractor {
    session: BrowserSession,
    analyzer: Arc<dyn DocumentAnalyzer>,
    converter: MarkdownConverter,
    navigation_timeout: Duration,
}

impl ContentExtractor {
    pub fn new(session: BrowserSession, analyzer: Arc<dyn DocumentAnalyzer>) -> Self {
        Self {
            session,
            analyzer,
            converter: MarkdownConverter::default(),
            navigation_timeout: Duration::from_millis(DEFAULT_NAVIGATION_TIMEOUT_MS),
        }
    }

    pub fn with_navigation_timeout(mut self, timeout: Duration) -> Self {
        self.navigation_timeout = timeout;
        self
    }

    pub fn with_converter(mut self, converter: MarkdownConverter) -> Self {
        self.converter = converter;
        self
    }

    /// Chromium-backed extractor using the configured analyzer.
    pub fn from_config(config: &Config) -> Self {
        let session = BrowserSession::chromium(SessionOptions {
            headless: config.headless,
            chrome_executable: config.chrome_executable.clone(),
            ..SessionOptions::default()
        });
        let analyzer: Arc<dyn DocumentAnalyzer> = match config.analyzer {
            AnalyzerKind::Defuddle => Arc::new(DefuddleAnalyzer::new(config.defuddle_url.clone())),
            AnalyzerKind::Readability => Arc::new(ReadabilityAnalyzer),
        };

        Self::new(session, analyzer).with_navigation_timeout(config.navigation_timeout)
    }

    pub fn session(&self) -> &BrowserSession {
        &self.session
    }

    /// Clip one URL. The page context opened for it is closed before this
    /// returns, whatever the outcome.
    #[instrument(skip(self), fields(analyzer = self.analyzer.name()))]
    pub async fn extract(&mut self, url: &str) -> Result<ExtractedContent, ExtractError> {
        let parsed = Url::parse(url)?;
        let domain = domain_of(&parsed);

        let page = self.session.new_page_context().await?;
        let result = self.extract_from(page.as_ref(), &parsed, domain).await;

        if let Err(err) = page.close().await {
            warn!("failed to close page context: {}", err);
        }

        match &result {
            Ok(content) => info!(words = content.word_count, "extracted"),
            Err(err) => debug!(kind = ?err.kind(), "extraction failed: {}", err),
        }
        result
    }

    async fn extract_from(
        &self,
        page: &dyn PageContext,
        url: &Url,
        domain: String,
    ) -> Result<ExtractedContent, ExtractError> {
        let timeout_ms = u64::try_from(self.navigation_timeout.as_millis()).unwrap_or(u64::MAX);
        tokio::time::timeout(self.navigation_timeout, page.navigate(url.as_str()))
            .await
            .map_err(|_| ExtractError::NavigationTimeout(timeout_ms))??;

        let raw = self.analyzer.analyze(page, url).await?;

        let html = cleaner::sanitize(raw.content.as_deref().unwrap_or_default());
        let content = self.converter.convert(&html);

        Ok(ExtractedContent {
            title: raw.title.unwrap_or_default(),
            content,
            description: raw.description.unwrap_or_default(),
            author: raw.author.unwrap_or_default(),
            published: raw.published.unwrap_or_default(),
            domain,
            favicon: raw.favicon.unwrap_or_default(),
            image: raw.image.unwrap_or_default(),
            word_count: word_count(raw.word_count),
            meta_tags: raw.meta_tags.unwrap_or_default(),
        })
    }

    /// Shut the browser down. Safe to call when nothing was launched.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        self.session.close().await
    }
}

fn word_count(reported: Option<f64>) -> u64 {
    match reported {
        Some(count) if count.is_finite() && count > 0.0 => count.round() as u64,
        _ => 0,
    }
}
