use crate::fetcher::errors::FetchError;
use once_cell::sync::OnceCell;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024; // 5MB
const USER_AGENT: &str = concat!("clipvault/", env!("CARGO_PKG_VERSION"));
const RETRY_BASE_DELAY: Duration = Duration::from_millis(250);

static HTTP_CLIENT: OnceCell<Client> = OnceCell::new();

pub fn get_client() -> Result<&'static Client, FetchError> {
    HTTP_CLIENT.get_or_try_init(|| {
        ClientBuilder::new()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()
            .map_err(|e| FetchError::Client(e.to_string()))
    })
}

/// Download a UTF-8 text resource, such as the analyzer bundle injected into
/// pages.
#[instrument(skip_all, fields(url = %url))]
pub async fn fetch_text(url: &str) -> Result<String, FetchError> {
    let parsed = url::Url::parse(url)?;
    let response = get_client()?.get(parsed).send().await?;

    if let Some(length) = response.content_length()
        && length > MAX_BODY_SIZE
    {
        return Err(FetchError::BodyTooLarge(length));
    }

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::http(status));
    }

    let body = response.bytes().await?;

    // Content-Length may be missing on chunked responses
    if body.len() as u64 > MAX_BODY_SIZE {
        return Err(FetchError::BodyTooLarge(body.len() as u64));
    }

    debug!(bytes = body.len(), "fetched text resource");
    String::from_utf8(body.to_vec()).map_err(|_| FetchError::InvalidUtf8)
}

/// [`fetch_text`], tried up to `attempts` times. Only retriable failures are
/// repeated, with the delay doubling each time.
pub async fn fetch_text_retrying(url: &str, attempts: u32) -> Result<String, FetchError> {
    let mut attempt = 1;
    loop {
        match fetch_text(url).await {
            Err(err) if err.should_retry() && attempt < attempts => {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt - 1);
                warn!(url, attempt, ?delay, "fetch failed, retrying: {}", err);
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            result => return result,
        }
    }
}
