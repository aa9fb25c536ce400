#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use clipvault::session::{
    BrowserHandle, BrowserLauncher, BrowserSession, PageContext, PageError, SessionError,
    SessionOptions,
};

/// How the fake browser answers for one URL.
#[derive(Clone, Debug)]
pub enum PageScript {
    /// Navigation succeeds; `content()` returns this HTML and the parse
    /// script evaluates to `article`.
    Loads { html: String, article: Value },
    /// Navigation never reaches network quiescence.
    Hangs,
    /// Navigation fails outright.
    Unreachable(String),
    /// Navigation succeeds but every script evaluation throws.
    ScriptsBlocked,
}

#[derive(Default)]
pub struct FakeState {
    pub launches: AtomicUsize,
    pub browser_closes: AtomicUsize,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub evaluated: Mutex<Vec<String>>,
}

impl FakeState {
    pub fn open_pages(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }
}

/// In-memory browser keyed by URL.
pub struct FakeLauncher {
    pub state: Arc<FakeState>,
    pages: Arc<HashMap<String, PageScript>>,
    fail_launch: bool,
}

impl FakeLauncher {
    pub fn new(pages: impl IntoIterator<Item = (&'static str, PageScript)>) -> Self {
        Self {
            state: Arc::new(FakeState::default()),
            pages: Arc::new(
                pages
                    .into_iter()
                    .map(|(url, script)| (url.to_string(), script))
                    .collect(),
            ),
            fail_launch: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_launch: true,
            ..Self::new([])
        }
    }

    /// A session driving this launcher, plus its counters.
    pub fn into_session(self) -> (BrowserSession, Arc<FakeState>) {
        let state = self.state.clone();
        (
            BrowserSession::new(Arc::new(self), SessionOptions::default()),
            state,
        )
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self, _options: &SessionOptions) -> Result<Box<dyn BrowserHandle>, SessionError> {
        if self.fail_launch {
            return Err(SessionError::Launch("chromium executable not found".to_string()));
        }
        self.state.launches.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeBrowser {
            state: self.state.clone(),
            pages: self.pages.clone(),
        }))
    }
}

struct FakeBrowser {
    state: Arc<FakeState>,
    pages: Arc<HashMap<String, PageScript>>,
}

#[async_trait]
impl BrowserHandle for FakeBrowser {
    async fn new_page_context(&self) -> Result<Box<dyn PageContext>, SessionError> {
        self.state.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            state: self.state.clone(),
            pages: self.pages.clone(),
            current: Mutex::new(None),
        }))
    }

    async fn context_count(&self) -> Result<Option<usize>, SessionError> {
        Ok(Some(self.state.open_pages()))
    }

    async fn close(self: Box<Self>) -> Result<(), SessionError> {
        self.state.browser_closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct FakePage {
    state: Arc<FakeState>,
    pages: Arc<HashMap<String, PageScript>>,
    current: Mutex<Option<PageScript>>,
}

impl FakePage {
    fn current(&self) -> Option<PageScript> {
        self.current.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageContext for FakePage {
    async fn navigate(&self, url: &str) -> Result<(), PageError> {
        let script = self
            .pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| PageScript::Unreachable(format!("net::ERR_NAME_NOT_RESOLVED at {url}")));

        match &script {
            PageScript::Hangs => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
            PageScript::Unreachable(reason) => Err(PageError::Navigation(reason.clone())),
            _ => {
                *self.current.lock().unwrap() = Some(script);
                Ok(())
            }
        }
    }

    async fn evaluate(&self, script: &str) -> Result<Value, PageError> {
        self.state.evaluated.lock().unwrap().push(script.to_string());
        match self.current() {
            Some(PageScript::Loads { article, .. }) => {
                if script.contains("new Defuddle(document)") {
                    Ok(article)
                } else {
                    Ok(Value::Null)
                }
            }
            Some(PageScript::ScriptsBlocked) => Err(PageError::Evaluation(
                "EvalError: refused to evaluate script".to_string(),
            )),
            _ => Err(PageError::Evaluation("no document".to_string())),
        }
    }

    async fn content(&self) -> Result<String, PageError> {
        match self.current() {
            Some(PageScript::Loads { html, .. }) => Ok(html),
            _ => Ok("<html><head></head><body></body></html>".to_string()),
        }
    }

    async fn close(self: Box<Self>) -> Result<(), PageError> {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A page whose Defuddle result has the given title and content.
pub fn article_page(title: &str, content_html: &str) -> PageScript {
    PageScript::Loads {
        html: format!("<html><head><title>{title}</title></head><body>{content_html}</body></html>"),
        article: serde_json::json!({
            "title": title,
            "content": content_html,
            "description": format!("About {title}"),
            "author": "A. Writer",
            "published": "2024-05-01",
            "favicon": "https://example.com/favicon.ico",
            "image": "https://example.com/hero.png",
            "wordCount": 42,
            "metaTags": [{"name": "description", "property": null, "content": format!("About {title}")}]
        }),
    }
}
