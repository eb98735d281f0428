use crate::fetcher::{
    errors::FetchError,
    types::{HeadResponse, PageResponse},
};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, header::CONTENT_TYPE};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const DEFAULT_MAX_BODY_SIZE: u64 = 5 * 1024 * 1024; // 5MB
const USER_AGENT: &str = "LinkSummaryBot/0.1";

/// Network seam used by the probe, the type handlers and the asset importer.
///
/// `head` only reports transport failures as errors; any status code is
/// returned to the caller for classification. `get` additionally rejects
/// non-success statuses and oversized bodies.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpClient: Send + Sync {
    async fn head(&self, url: &Url) -> Result<HeadResponse, FetchError>;

    async fn get(&self, url: &Url) -> Result<PageResponse, FetchError>;
}

#[derive(Debug, Clone)]
pub struct HttpSettings {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub max_body_size: u64,
    pub max_redirects: usize,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            connect_timeout: Duration::from_secs(5),
            max_body_size: DEFAULT_MAX_BODY_SIZE,
            max_redirects: 10,
        }
    }
}

impl HttpSettings {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout,
            connect_timeout: timeout.min(Duration::from_secs(5)),
            ..Self::default()
        }
    }
}

/// [`HttpClient`] backed by a shared `reqwest` connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestClient {
    client: Client,
    max_body_size: u64,
}

impl ReqwestClient {
    pub fn new(settings: &HttpSettings) -> Result<Self, FetchError> {
        let client = ClientBuilder::new()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.timeout)
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(settings.max_redirects))
            .build()
            .map_err(|e| FetchError::Unknown(e.to_string()))?;

        Ok(Self {
            client,
            max_body_size: settings.max_body_size,
        })
    }
}

fn content_type_of(headers: &reqwest::header::HeaderMap) -> Option<String> {
    headers
        .get(CONTENT_TYPE)
        .and_then(|ct| ct.to_str().ok())
        .map(str::to_string)
}

#[async_trait]
impl HttpClient for ReqwestClient {
    #[instrument(skip_all, fields(url = %url))]
    async fn head(&self, url: &Url) -> Result<HeadResponse, FetchError> {
        let response = self
            .client
            .head(url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        debug!(status = %response.status(), "probe response");

        Ok(HeadResponse {
            url_final: response.url().clone(),
            status: response.status(),
            content_type: content_type_of(response.headers()),
        })
    }

    #[instrument(skip_all, fields(url = %url))]
    async fn get(&self, url: &Url) -> Result<PageResponse, FetchError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        // Check content length before downloading
        if let Some(content_length) = response.content_length()
            && content_length > self.max_body_size
        {
            return Err(FetchError::BodyTooLarge(content_length));
        }

        let final_url = response.url().clone();
        let status = response.status();
        let content_type = content_type_of(response.headers());

        if !status.is_success() {
            return Err(FetchError::Http { status });
        }

        let body_bytes = response
            .bytes()
            .await
            .map_err(|e| FetchError::Io(e.to_string()))?;

        // Check body size after download (in case Content-Length was missing)
        if body_bytes.len() as u64 > self.max_body_size {
            return Err(FetchError::BodyTooLarge(body_bytes.len() as u64));
        }

        Ok(PageResponse {
            url_final: final_url,
            status,
            content_type,
            body_raw: body_bytes,
        })
    }
}
