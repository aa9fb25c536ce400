//! Browser session ownership.
//!
//! A [`BrowserSession`] owns at most one live browser. The browser is launched
//! lazily by [`BrowserSession::ensure`], reused for every page context opened
//! afterwards and shut down by [`BrowserSession::close`]. Every URL gets its own
//! [`PageContext`], which the caller must close once it is done with it.

pub mod chromium;
pub mod errors;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

pub use chromium::ChromiumLauncher;
pub use errors::{PageError, SessionError};

const DEFAULT_LAUNCH_TIMEOUT: Duration = Duration::from_secs(20);

/// Options applied when the browser process is spawned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionOptions {
    pub headless: bool,
    pub chrome_executable: Option<PathBuf>,
    pub launch_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_executable: None,
            launch_timeout: DEFAULT_LAUNCH_TIMEOUT,
        }
    }
}

/// Spawns browser processes.
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn BrowserHandle>, SessionError>;
}

/// A running browser.
#[async_trait]
pub trait BrowserHandle: Send + Sync {
    /// Open a page in a fresh, isolated browsing context.
    async fn new_page_context(&self) -> Result<Box<dyn PageContext>, SessionError>;

    /// Number of isolated contexts still open, if the browser can tell.
    async fn context_count(&self) -> Result<Option<usize>, SessionError> {
        Ok(None)
    }

    /// Terminate the browser process.
    async fn close(self: Box<Self>) -> Result<(), SessionError>;
}

/// One isolated page. Owned by exactly one in-flight extraction.
#[async_trait]
pub trait PageContext: Send + Sync {
    /// Navigate and return once the page has reached network quiescence.
    async fn navigate(&self, url: &str) -> Result<(), PageError>;

    /// Evaluate a script in the page and return its JSON value. Promises are
    /// awaited; `undefined` comes back as `Value::Null`.
    async fn evaluate(&self, script: &str) -> Result<Value, PageError>;

    /// Serialized HTML of the live, rendered document.
    async fn content(&self) -> Result<String, PageError>;

    /// Tear the context down, discarding its cookies, storage and DOM.
    async fn close(self: Box<Self>) -> Result<(), PageError>;
}

/// Owned browser session with an explicit `ensure -> use -> close` lifecycle.
pub struct BrowserSession {
    launcher: Arc<dyn BrowserLauncher>,
    options: SessionOptions,
    browser: Option<Box<dyn BrowserHandle>>,
}

impl BrowserSession {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, options: SessionOptions) -> Self {
        Self {
            launcher,
            options,
            browser: None,
        }
    }

    /// Session backed by a local Chromium.
    pub fn chromium(options: SessionOptions) -> Self {
        Self::new(Arc::new(ChromiumLauncher), options)
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn is_active(&self) -> bool {
        self.browser.is_some()
    }

    /// Return the live browser, launching one if none is running.
    #[instrument(skip_all)]
    pub async fn ensure(&mut self) -> Result<&dyn BrowserHandle, SessionError> {
        if self.browser.is_none() {
            info!(headless = self.options.headless, "launching browser");
            let browser = self.launcher.launch(&self.options).await?;
            self.browser = Some(browser);
        }

        self.browser
            .as_deref()
            .ok_or_else(|| SessionError::Launch("browser missing after launch".to_string()))
    }

    /// Open an isolated page context on the (possibly freshly launched) browser.
    pub async fn new_page_context(&mut self) -> Result<Box<dyn PageContext>, SessionError> {
        let browser = self.ensure().await?;
        browser.new_page_context().await
    }

    /// Isolated contexts open in the live browser. `None` when no browser is
    /// running or it cannot report them.
    pub async fn open_contexts(&self) -> Result<Option<usize>, SessionError> {
        match &self.browser {
            Some(browser) => browser.context_count().await,
            None => Ok(None),
        }
    }

    /// Shut the browser down. A later [`ensure`](Self::ensure) launches a new
    /// one; closing an idle session does nothing.
    pub async fn close(&mut self) -> Result<(), SessionError> {
        match self.browser.take() {
            Some(browser) => {
                if let Ok(Some(open)) = browser.context_count().await
                    && open > 0
                {
                    warn!(contexts = open, "closing browser with contexts still open");
                }
                debug!("closing browser");
                browser.close().await
            }
            None => Ok(()),
        }
    }
}
