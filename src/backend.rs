//! HTTP backend abstraction so the pipeline can run against any transport

use std::time::Duration;

use reqwest::{
    Client, Method,
    header::{HeaderMap, HeaderValue, RANGE, USER_AGENT},
};

use crate::HarvestError;

/// A fetched response, reduced to what the pipeline inspects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    /// HTTP status code of the final response
    pub status: u16,
    /// URL of the final response after redirects
    pub final_url: String,
    /// Body decoded as UTF-8 (lossy); empty for HEAD probes
    pub body: String,
}

impl Page {
    pub fn new(status: u16, final_url: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            status,
            final_url: final_url.into(),
            body: body.into(),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }
}

/// HTTP method used for an existence probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeMethod {
    Head,
    Get,
}

/// Trait representing the network operations the pipeline needs
///
/// Every call carries its own timeout. Implementations return
/// [`HarvestError::Transport`] when no response was received at all; any response,
/// whatever its status, is returned as a [`Page`].
#[async_trait::async_trait]
pub trait HttpBackend: Send + Sync {
    /// Fetch a whole page
    async fn get(&self, url: &str, timeout: Duration) -> Result<Page, HarvestError>;

    /// Fetch at most `max_bytes` of a page, asking the server for a byte range
    async fn get_prefix(
        &self,
        url: &str,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<Page, HarvestError>;

    /// Follow redirects and report where the URL ends up
    ///
    /// The body is not read.
    async fn probe(
        &self,
        url: &str,
        method: ProbeMethod,
        timeout: Duration,
    ) -> Result<Page, HarvestError>;
}

const DEFAULT_USER_AGENT: &str = concat!("iotlt_harvest/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;

/// [`HttpBackend`] implementation backed by `reqwest`
pub struct ReqwestBackend {
    client: Client,
}

impl ReqwestBackend {
    /// Create a backend with the default user agent
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::with_user_agent(DEFAULT_USER_AGENT)
    }

    /// Create a backend that identifies itself with `user_agent`
    pub fn with_user_agent(user_agent: &str) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        if let Ok(value) = HeaderValue::from_str(user_agent) {
            headers.insert(USER_AGENT, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;

        Ok(Self { client })
    }

    fn transport(url: &str, error: reqwest::Error) -> HarvestError {
        HarvestError::Transport {
            url: url.to_string(),
            message: error.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl HttpBackend for ReqwestBackend {
    async fn get(&self, url: &str, timeout: Duration) -> Result<Page, HarvestError> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::transport(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| Self::transport(url, e))?;

        Ok(Page::new(status, final_url, body))
    }

    async fn get_prefix(
        &self,
        url: &str,
        max_bytes: usize,
        timeout: Duration,
    ) -> Result<Page, HarvestError> {
        tracing::debug!("GET {} (first {} bytes)", url, max_bytes);

        let range = format!("bytes=0-{}", max_bytes.saturating_sub(1));
        let mut response = self
            .client
            .get(url)
            .header(RANGE, range)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::transport(url, e))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();

        // Servers that ignore Range would otherwise stream the whole deck
        let mut buf = Vec::with_capacity(max_bytes.min(64 * 1024));
        while buf.len() < max_bytes {
            match response.chunk().await.map_err(|e| Self::transport(url, e))? {
                Some(chunk) => buf.extend_from_slice(&chunk),
                None => break,
            }
        }
        buf.truncate(max_bytes);

        Ok(Page::new(
            status,
            final_url,
            String::from_utf8_lossy(&buf).into_owned(),
        ))
    }

    async fn probe(
        &self,
        url: &str,
        method: ProbeMethod,
        timeout: Duration,
    ) -> Result<Page, HarvestError> {
        let method = match method {
            ProbeMethod::Head => Method::HEAD,
            ProbeMethod::Get => Method::GET,
        };
        tracing::debug!("{} {}", method, url);

        let response = self
            .client
            .request(method, url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::transport(url, e))?;

        Ok(Page::new(
            response.status().as_u16(),
            response.url().to_string(),
            String::new(),
        ))
    }
}
