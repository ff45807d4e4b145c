use crate::config::RetryPolicy;
use crate::error::{Result, ScrapeError};
use reqwest::{Client, StatusCode};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Anything that can hand back the HTML behind a URL
pub trait PageSource {
    async fn fetch_html(&self, url: &Url) -> Result<String>;
}

/// HTTP fetcher with a per-request timeout and bounded retries
pub struct Fetcher {
    client: Client,
    retry: RetryPolicy,
}

impl Fetcher {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::Config(format!("could not build HTTP client: {}", e)))?;

        Ok(Fetcher { client, retry })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    async fn fetch_once(&self, url: &Url) -> Result<String> {
        let http_err = |source: reqwest::Error| ScrapeError::Http {
            url: url.to_string(),
            source,
        };

        let response = self.client.get(url.as_str()).send().await.map_err(http_err)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Status {
                url: url.to_string(),
                status,
            });
        }

        response.text().await.map_err(http_err)
    }
}

impl PageSource for Fetcher {
    async fn fetch_html(&self, url: &Url) -> Result<String> {
        debug!("GET {}", url);
        with_retries(&self.retry, url.as_str(), || self.fetch_once(url)).await
    }
}

/// Whether a failed request is worth repeating.
pub fn is_transient(error: &ScrapeError) -> bool {
    match error {
        ScrapeError::Http { source, .. } => {
            source.is_timeout() || source.is_connect() || source.is_request() || source.is_body()
        }
        ScrapeError::Status { status, .. } => {
            status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
        }
        _ => false,
    }
}

/// Run `op` until it succeeds, fails permanently, or runs out of attempts.
pub async fn with_retries<T, F, Fut>(policy: &RetryPolicy, target: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 1;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_attempts && is_transient(&e) => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "Attempt {}/{} for {} failed ({}), retrying in {:?}",
                    attempt, policy.max_attempts, target, e, delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
