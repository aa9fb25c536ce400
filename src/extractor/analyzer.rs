use async_trait::async_trait;
use url::Url;

use crate::extractor::errors::ExtractError;
use crate::extractor::model::RawArticle;
use crate::session::PageContext;

/// Finds the primary readable content of a page that has already been
/// navigated and reached network quiescence.
#[async_trait]
pub trait DocumentAnalyzer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Failures to load or run the analyzer are reported as
    /// [`ExtractError::ExtractionUnavailable`].
    async fn analyze(&self, page: &dyn PageContext, url: &Url) -> Result<RawArticle, ExtractError>;
}
