//! Link shortener resolution

use std::{sync::Arc, time::Duration};

use crate::{HttpBackend, backend::ProbeMethod};

/// Outcome of resolving a shortened link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    /// Final URL, or the original one when no probe answered
    pub url: String,
    /// Status of the answering probe; `None` when both probes failed
    pub status: Option<u16>,
}

impl Resolution {
    pub fn is_resolved(&self) -> bool {
        self.status.is_some()
    }
}

/// Follows shortener redirects to their destination
pub struct ShortenerResolver {
    backend: Arc<dyn HttpBackend>,
    timeout: Duration,
}

impl ShortenerResolver {
    pub fn new(backend: Arc<dyn HttpBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Resolve `url` with a HEAD probe, falling back to GET
    ///
    /// Never fails: when neither probe gets an answer the original URL comes back
    /// with an empty status.
    pub async fn resolve(&self, url: &str) -> Resolution {
        match self.backend.probe(url, ProbeMethod::Head, self.timeout).await {
            Ok(page) if (200..400).contains(&page.status) => {
                return Resolution {
                    url: page.final_url,
                    status: Some(page.status),
                };
            }
            Ok(page) => {
                tracing::debug!("HEAD {} answered {}, retrying with GET", url, page.status)
            }
            Err(e) => tracing::debug!("HEAD {} failed: {}, retrying with GET", url, e),
        }

        match self.backend.probe(url, ProbeMethod::Get, self.timeout).await {
            Ok(page) => Resolution {
                url: page.final_url,
                status: Some(page.status),
            },
            Err(e) => {
                tracing::warn!("Could not resolve {}: {}", url, e);
                Resolution {
                    url: url.to_string(),
                    status: None,
                }
            }
        }
    }
}
