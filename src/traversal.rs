//! Listing page traversal and oldest-page detection

use std::{
    collections::HashSet,
    sync::{Arc, LazyLock},
    time::Duration,
};

use regex::Regex;
use url::Url;

use crate::{HarvestError, HttpBackend, extract::normalize_digits, links::canonical_event_url};

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static pattern must compile")
}

static ANCHOR: LazyLock<Regex> = LazyLock::new(|| regex(r"(?is)<a\b([^>]*)>"));
static CLASS_ATTR: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"(?is)\bclass\s*=\s*["']([^"']*)["']"#));
static HREF_ATTR: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"(?is)\bhref\s*=\s*["']([^"']*)["']"#));

static TOTAL_AMOUNT: LazyLock<Regex> = LazyLock::new(|| {
    regex(r#"(?is)class\s*=\s*["'][^"']*\bamount\b[^"']*["'][^>]*>\s*(?:<[^>]+>\s*)*(\d+)"#)
});
static TOTAL_TEXT: LazyLock<Regex> = LazyLock::new(|| regex(r"全\s*(\d+)\s*件"));
static EVENT_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| regex(r#"(?is)class\s*=\s*["'][^"']*\bevent_list\b[^"']*["']"#));

const LINK_CLASS_TOKENS: [&str; 2] = ["url", "summary"];

/// Detail-page URLs linked from a listing page, in first-seen order
///
/// Only anchors carrying both the `url` and `summary` class tokens count. Relative
/// hrefs are resolved against `base_url`.
pub fn parse_event_urls(html: &str, base_url: &str) -> Vec<String> {
    let base = Url::parse(base_url).ok();
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    for anchor in ANCHOR.captures_iter(html) {
        let attrs = &anchor[1];

        let Some(class) = CLASS_ATTR.captures(attrs) else {
            continue;
        };
        let tokens: HashSet<&str> = class[1].split_whitespace().collect();
        if !LINK_CLASS_TOKENS.iter().all(|t| tokens.contains(t)) {
            continue;
        }

        let Some(href) = HREF_ATTR.captures(attrs) else {
            continue;
        };
        let href = href[1].trim();
        let absolute = match &base {
            Some(base) => base.join(href).map(|u| u.to_string()).ok(),
            None => Some(href.to_string()),
        };
        let Some(url) = absolute.and_then(|u| canonical_event_url(&u)) else {
            continue;
        };

        if seen.insert(url.clone()) {
            urls.push(url);
        }
    }

    urls
}

/// Total number of events announced on a listing page
pub fn parse_total_count(html: &str) -> Option<u32> {
    let html = normalize_digits(html);
    TOTAL_AMOUNT
        .captures(&html)
        .or_else(|| TOTAL_TEXT.captures(&html))
        .and_then(|c| c[1].parse().ok())
}

/// Number of event blocks rendered on a listing page
pub fn count_event_blocks(html: &str, base_url: &str) -> usize {
    match EVENT_BLOCK.find_iter(html).count() {
        0 => parse_event_urls(html, base_url).len(),
        n => n,
    }
}

/// Highest page index given a total count and the page size
pub fn oldest_page_index(total: u32, per_page: usize) -> u32 {
    if per_page == 0 {
        return 1;
    }
    let per_page = per_page as u32;
    total.div_ceil(per_page).max(1)
}

/// Walks the listing pages of one connpass group
pub struct ListTraversal {
    backend: Arc<dyn HttpBackend>,
    base_url: String,
    timeout: Duration,
}

impl ListTraversal {
    pub fn new(
        backend: Arc<dyn HttpBackend>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            backend,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    /// URL of listing page `page`
    pub fn page_url(&self, page: u32) -> String {
        format!("{}/event/?page={}", self.base_url, page)
    }

    async fn fetch_page(&self, page: u32) -> Result<(String, String), HarvestError> {
        let url = self.page_url(page);
        let response = self.backend.get(&url, self.timeout).await?;
        if !response.is_ok() {
            return Err(HarvestError::Status {
                url,
                status: response.status,
            });
        }
        Ok((url, response.body))
    }

    /// Detail-page URLs listed on page `page`
    pub async fn list_event_urls(&self, page: u32) -> Result<Vec<String>, HarvestError> {
        let (url, body) = self.fetch_page(page).await?;
        let urls = parse_event_urls(&body, &url);
        tracing::info!("Page {}: {} events", page, urls.len());
        Ok(urls)
    }

    /// Index of the last listing page, which holds the earliest events
    ///
    /// Fails rather than guessing when page 1 lacks the total count or renders no
    /// event blocks.
    pub async fn detect_oldest_page(&self) -> Result<u32, HarvestError> {
        let (url, body) = self.fetch_page(1).await?;

        let total = parse_total_count(&body).ok_or_else(|| HarvestError::Format {
            url: url.clone(),
            marker: "total event count",
        })?;
        let per_page = count_event_blocks(&body, &url);
        if per_page == 0 {
            return Err(HarvestError::Format {
                url,
                marker: "event list block",
            });
        }

        let oldest = oldest_page_index(total, per_page);
        tracing::info!(
            "{} events, {} per page: oldest page is {}",
            total,
            per_page,
            oldest
        );
        Ok(oldest)
    }
}
