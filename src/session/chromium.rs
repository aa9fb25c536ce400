//! Chromium implementation of the session traits, driven over CDP.

use std::sync::Arc;

use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::browser::{BrowserContextId, CloseParams};
use chromiumoxide::cdp::browser_protocol::page::{
    EventLifecycleEvent, FrameId, NavigateParams, SetLifecycleEventsEnabledParams,
};
use chromiumoxide::cdp::browser_protocol::network::LoaderId;
use chromiumoxide::cdp::browser_protocol::target::{
    CreateBrowserContextParams, CreateTargetParams, DisposeBrowserContextParams,
    GetBrowserContextsParams,
};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use futures::StreamExt;
use serde_json::Value;
use tokio::task::JoinHandle;
use tracing::{debug, instrument, trace, warn};

use crate::session::{
    BrowserHandle, BrowserLauncher, PageContext, PageError, SessionError, SessionOptions,
};

/// Lifecycle event Chrome emits once no more than two connections are open
/// for 500ms.
const NETWORK_ALMOST_IDLE: &str = "networkAlmostIdle";

/// Launches a local Chromium through `chromiumoxide`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChromiumLauncher;

#[async_trait]
impl BrowserLauncher for ChromiumLauncher {
    #[instrument(skip_all, fields(headless = options.headless))]
    async fn launch(&self, options: &SessionOptions) -> Result<Box<dyn BrowserHandle>, SessionError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-setuid-sandbox");
        if !options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &options.chrome_executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) =
            tokio::time::timeout(options.launch_timeout, Browser::launch(config))
                .await
                .map_err(|_| {
                    SessionError::Launch(format!(
                        "browser did not start within {:?}",
                        options.launch_timeout
                    ))
                })?
                .map_err(|e| SessionError::Launch(e.to_string()))?;

        // The handler drives the CDP websocket; the session is dead once it ends.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    trace!("cdp handler error: {}", err);
                }
            }
            debug!("cdp handler finished");
        });

        Ok(Box::new(ChromiumBrowser {
            browser: Arc::new(browser),
            handler_task,
        }))
    }
}

struct ChromiumBrowser {
    browser: Arc<Browser>,
    handler_task: JoinHandle<()>,
}

impl ChromiumBrowser {
    fn context_error(&self, err: impl ToString) -> SessionError {
        if self.handler_task.is_finished() {
            SessionError::Disconnected(err.to_string())
        } else {
            SessionError::PageContext(err.to_string())
        }
    }
}

#[async_trait]
impl BrowserHandle for ChromiumBrowser {
    async fn new_page_context(&self) -> Result<Box<dyn PageContext>, SessionError> {
        let context_id = self
            .browser
            .execute(CreateBrowserContextParams::default())
            .await
            .map_err(|e| self.context_error(e))?
            .result
            .browser_context_id
            .clone();

        let mut target = CreateTargetParams::new("about:blank");
        target.browser_context_id = Some(context_id.clone());

        match self.browser.new_page(target).await {
            Ok(page) => Ok(Box::new(ChromiumPage::new(
                page,
                context_id,
                self.browser.clone(),
            ))),
            Err(err) => {
                dispose_context(&self.browser, context_id).await;
                Err(self.context_error(err))
            }
        }
    }

    async fn context_count(&self) -> Result<Option<usize>, SessionError> {
        let contexts = self
            .browser
            .execute(GetBrowserContextsParams::default())
            .await
            .map_err(|e| self.context_error(e))?;
        Ok(Some(contexts.result.browser_context_ids.len()))
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        let ChromiumBrowser {
            mut browser,
            handler_task,
        } = *self;

        let result = match Arc::get_mut(&mut browser) {
            Some(browser) => {
                let closed = browser.close().await.map(|_| ());
                if let Err(err) = browser.wait().await {
                    warn!("waiting for browser exit failed: {}", err);
                }
                closed
            }
            // A page context outlived its extraction; ask the browser to exit anyway.
            None => browser.execute(CloseParams::default()).await.map(|_| ()),
        };

        handler_task.abort();
        result.map_err(|e| SessionError::Close(e.to_string()))
    }
}

async fn dispose_context(browser: &Browser, context_id: BrowserContextId) {
    if let Err(err) = browser
        .execute(DisposeBrowserContextParams::new(context_id))
        .await
    {
        warn!("failed to dispose browser context: {}", err);
    }
}

/// A page inside its own browser context.
///
/// `close` is the normal release path. If the value is dropped without it the
/// page and its context are released on a background task instead.
struct ChromiumPage {
    page: Option<Page>,
    context_id: Option<BrowserContextId>,
    browser: Arc<Browser>,
    runtime_handle: tokio::runtime::Handle,
}

impl ChromiumPage {
    fn new(page: Page, context_id: BrowserContextId, browser: Arc<Browser>) -> Self {
        Self {
            page: Some(page),
            context_id: Some(context_id),
            browser,
            runtime_handle: tokio::runtime::Handle::current(),
        }
    }

    fn page(&self) -> Result<&Page, PageError> {
        self.page.as_ref().ok_or(PageError::Closed)
    }
}

#[async_trait]
impl PageContext for ChromiumPage {
    #[instrument(skip(self))]
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        let page = self.page()?;

        page.execute(SetLifecycleEventsEnabledParams::new(true))
            .await
            .map_err(|e| PageError::Navigation(e.to_string()))?;
        // Subscribe before navigating so no lifecycle event is missed
        let mut lifecycle = page
            .event_listener::<EventLifecycleEvent>()
            .await
            .map_err(|e| PageError::Navigation(e.to_string()))?;

        let navigation = page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| PageError::Navigation(e.to_string()))?
            .result;
        if let Some(error) = navigation.error_text {
            return Err(PageError::Navigation(error));
        }
        let navigation = Navigation {
            frame_id: navigation.frame_id,
            loader_id: navigation.loader_id,
        };

        while let Some(event) = lifecycle.next().await {
            if navigation.settled_by(&event.frame_id, &event.loader_id, &event.name) {
                debug!("network quiescent");
                return Ok(());
            }
        }

        Err(PageError::Navigation(
            "lifecycle events stopped before network quiescence".to_string(),
        ))
    }

    async fn evaluate(&self, script: &str) -> Result<Value, PageError> {
        let page = self.page()?;

        let params = EvaluateParams::builder()
            .expression(script)
            .await_promise(true)
            .return_by_value(true)
            .build()
            .map_err(PageError::Evaluation)?;

        let result = page
            .evaluate_expression(params)
            .await
            .map_err(|e| PageError::Evaluation(e.to_string()))?;

        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn content(&self) -> Result<String, PageError> {
        self.page()?
            .content()
            .await
            .map_err(|e| PageError::Content(e.to_string()))
    }

    async fn close(mut self: Box<Self>) -> Result<(), PageError> {
        let page = self.page.take().ok_or(PageError::Closed)?;
        let closed = page.close().await;

        if let Some(context_id) = self.context_id.take() {
            dispose_context(&self.browser, context_id).await;
        }

        closed.map_err(|e| PageError::Close(e.to_string()))
    }
}

/// The document load a `Page.navigate` call started.
struct Navigation {
    frame_id: FrameId,
    /// Absent for same-document navigations.
    loader_id: Option<LoaderId>,
}

impl Navigation {
    /// Whether a lifecycle event reports quiescence for this load. Events of
    /// the blank document the context opened with carry another loader.
    fn settled_by(&self, frame_id: &FrameId, loader_id: &LoaderId, name: &str) -> bool {
        name == NETWORK_ALMOST_IDLE
            && *frame_id == self.frame_id
            && self.loader_id.as_ref().is_none_or(|id| id == loader_id)
    }
}

impl Drop for ChromiumPage {
    fn drop(&mut self) {
        let page = self.page.take();
        let context_id = self.context_id.take();
        if page.is_none() && context_id.is_none() {
            return;
        }

        let browser = self.browser.clone();
        self.runtime_handle.spawn(async move {
            if let Some(page) = page
                && let Err(err) = page.close().await
            {
                warn!("page drop cleanup failed: {}", err);
            }
            if let Some(context_id) = context_id {
                dispose_context(&browser, context_id).await;
            }
        });
    }
}
