//! Slide link liveness validation
//!
//! A slide candidate is kept only when a partial fetch of it looks like a real
//! deck. Verdicts, positive or negative, are memoized in a [`SlideCache`] that the
//! caller owns and passes in, so the crawler decides when they hit the disk.

use std::{sync::Arc, sync::LazyLock, time::Duration};

use regex::Regex;

use crate::{HttpBackend, SlideCache, backend::Page};

/// Bytes read from a slide page before judging it
pub const PREFIX_BYTES: usize = 50 * 1024;

/// Characters of the body inspected for an inline "404 not found"
const SNIPPET_CHARS: usize = 2000;

static TITLE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<title\b[^>]*>(.*?)</title>").expect("static pattern must compile")
});

// A bare "404" is not enough: decks are titled "IoTLT vol.404" too
const NOT_FOUND_TITLE_MARKERS: &[&str] = &["not found", "見つかりません"];

/// Judge a partial slide page
///
/// 200 and 206 are both accepted since the request asks for a byte range.
pub fn judge(page: &Page) -> bool {
    if page.status != 200 && page.status != 206 {
        return false;
    }

    if let Some(title) = TITLE.captures(&page.body) {
        let title = title[1].to_lowercase();
        if NOT_FOUND_TITLE_MARKERS.iter().any(|m| title.contains(m)) {
            return false;
        }
    }

    let snippet: String = page
        .body
        .chars()
        .take(SNIPPET_CHARS)
        .collect::<String>()
        .to_lowercase();
    !(snippet.contains("404") && snippet.contains("not found"))
}

/// Validates slide candidates against the network, memoized by URL
pub struct SlideValidator {
    backend: Arc<dyn HttpBackend>,
    timeout: Duration,
}

impl SlideValidator {
    pub fn new(backend: Arc<dyn HttpBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Whether `url` points at a live slide deck
    ///
    /// Cache hits do no I/O. Transport failures count as dead and are cached like
    /// any other verdict; they are not retried within or across runs.
    pub async fn validate(&self, cache: &mut SlideCache, url: &str) -> bool {
        if let Some(verdict) = cache.get(url) {
            tracing::debug!("Slide verdict for {} cached: {}", url, verdict);
            return verdict;
        }

        let verdict = match self
            .backend
            .get_prefix(url, PREFIX_BYTES, self.timeout)
            .await
        {
            Ok(page) => judge(&page),
            Err(e) => {
                tracing::warn!("Slide validation failed for {}: {}", url, e);
                false
            }
        };

        tracing::info!("Validated slide {}: {}", url, if verdict { "ok" } else { "dead" });
        cache.insert(url, verdict)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_judge_accepts_partial_content() {
        let page = Page::new(206, "https://speakerdeck.com/a/b", "<title>Deck</title>");
        assert!(judge(&page));
    }

    #[test]
    fn test_judge_rejects_not_found_title() {
        let page = Page::new(200, "https://speakerdeck.com/a/b", "<title>Page Not Found</title>");
        assert!(!judge(&page));
    }

    #[test]
    fn test_judge_accepts_number_404_in_title() {
        let page = Page::new(200, "u", "<title>IoTLT vol.404 LT資料</title><p>deck</p>");
        assert!(judge(&page));
    }

    #[test]
    fn test_judge_rejects_japanese_not_found_title() {
        let page = Page::new(200, "u", "<title>ページが見つかりません</title>");
        assert!(!judge(&page));
    }

    #[test]
    fn test_judge_rejects_inline_404() {
        let page = Page::new(200, "u", "<h1>404</h1><p>Not Found</p>");
        assert!(!judge(&page));
    }

    #[test]
    fn test_judge_rejects_error_status() {
        let page = Page::new(500, "u", "<title>Deck</title>");
        assert!(!judge(&page));
    }
}
