//! Harvest orchestration
//!
//! This module drives the whole pipeline:
//! - **Traversal**: listing pages are walked from the oldest to page `end_page`
//! - **Assembly**: every event is fetched and assembled strictly one at a time
//! - **Checkpoints**: the slide cache is saved after every listing page
//! - **Isolation**: a broken event is logged and skipped unless fail-fast is on
//! - **Observability**: progress is reported through observers and a stats channel
//!
//! # Examples
//!
//! ## Basic Usage
//!
//! ```ignore
//! use iotlt_harvest::Crawler;
//!
//! let crawler = Crawler::builder()
//!     .end_page(1)
//!     .cache_path("slide_cache.json")
//!     .output_path("README.md")
//!     .build()?;
//!
//! let stats = crawler.run().await?;
//! println!("Harvested {} events", stats.events_extracted);
//! ```
//!
//! ## With Observer
//!
//! ```ignore
//! use iotlt_harvest::{CrawlObserver, Crawler, EventRecord};
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! #[async_trait::async_trait]
//! impl CrawlObserver for Printer {
//!     async fn on_event_assembled(&self, record: &EventRecord) {
//!         println!("{} {}", record.date, record.title);
//!     }
//! }
//!
//! let crawler = Crawler::builder()
//!     .observe_with(Arc::new(Printer))
//!     .build()?;
//! ```
//!
//! ## With Cancellation
//!
//! ```ignore
//! use tokio_util::sync::CancellationToken;
//!
//! let cancel_token = CancellationToken::new();
//! let token_clone = cancel_token.clone();
//!
//! tokio::spawn(async move {
//!     tokio::signal::ctrl_c().await.ok();
//!     token_clone.cancel();
//! });
//!
//! // Verdicts validated so far are saved; the table is left untouched
//! let result = crawler.run_with_cancellation(cancel_token).await;
//! ```

use std::{
    path::PathBuf,
    sync::{
        Arc, Mutex,
        atomic::{AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};

use tokio::{sync::watch, time::sleep};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{
    EventRecord, HarvestError, HttpBackend, ReqwestBackend, SlideCache,
    assembler::EventAssembler,
    table::{WriteMode, dedup_and_sort, write_table},
    traversal::ListTraversal,
};

/// Errors that can occur during crawler configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Listing pages are walked downwards, so the end page cannot exceed the start
    #[error("End page {end} is greater than start page {start}")]
    InvalidPageRange { start: u32, end: u32 },

    /// Listing pages are numbered from 1
    #[error("End page must be greater than 0, got {0}")]
    InvalidEndPage(u32),

    #[error("Invalid base URL '{0}'")]
    InvalidBaseUrl(String),

    /// Every network call needs a bound
    #[error("Timeout for {0} must be greater than 0")]
    InvalidTimeout(&'static str),

    /// Only full rebuilds of the document are supported
    #[error("Incremental append mode is not supported; rebuild the table instead")]
    IncrementalModeUnsupported,

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),
}

/// Per-call timeouts for each kind of request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub list: Duration,
    pub detail: Duration,
    pub slide: Duration,
    pub shortener: Duration,
    pub participation: Duration,
}

impl Timeouts {
    /// Use the same timeout for every call
    pub fn uniform(timeout: Duration) -> Self {
        Self {
            list: timeout,
            detail: timeout,
            slide: timeout,
            shortener: timeout,
            participation: timeout,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let named = [
            ("list pages", self.list),
            ("detail pages", self.detail),
            ("slide validation", self.slide),
            ("shortener resolution", self.shortener),
            ("participation pages", self.participation),
        ];
        match named.iter().find(|(_, t)| t.is_zero()) {
            Some((name, _)) => Err(ConfigError::InvalidTimeout(*name)),
            None => Ok(()),
        }
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            list: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
            detail: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
            slide: Duration::from_secs(DEFAULT_SLIDE_TIMEOUT_SECS),
            shortener: Duration::from_secs(DEFAULT_SHORTENER_TIMEOUT_SECS),
            participation: Duration::from_secs(DEFAULT_PAGE_TIMEOUT_SECS),
        }
    }
}

/// Validated configuration for the crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    pub(crate) base_url: String,
    /// `None` detects the oldest listing page from page 1
    pub(crate) start_page: Option<u32>,
    pub(crate) end_page: u32,
    pub(crate) timeouts: Timeouts,
    pub(crate) request_delay: Duration,
    /// `None` keeps verdicts in memory only
    pub(crate) cache_path: Option<PathBuf>,
    pub(crate) output_path: PathBuf,
    pub(crate) write_mode: WriteMode,
    pub(crate) fail_fast: bool,
}

impl CrawlerConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Url::parse(&self.base_url).is_err() {
            return Err(ConfigError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.end_page == 0 {
            return Err(ConfigError::InvalidEndPage(0));
        }
        if let Some(start) = self.start_page
            && self.end_page > start
        {
            return Err(ConfigError::InvalidPageRange {
                start,
                end: self.end_page,
            });
        }
        if self.write_mode == WriteMode::Append {
            return Err(ConfigError::IncrementalModeUnsupported);
        }
        self.timeouts.validate()
    }
}

// Configuration constants
const DEFAULT_BASE_URL: &str = "https://iotlt.connpass.com";
const DEFAULT_END_PAGE: u32 = 1;
const DEFAULT_DELAY_MS: u64 = 1000;
const DEFAULT_CACHE_PATH: &str = "slide_cache.json";
const DEFAULT_OUTPUT_PATH: &str = "README.md";
const DEFAULT_PAGE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_SLIDE_TIMEOUT_SECS: u64 = 15;
const DEFAULT_SHORTENER_TIMEOUT_SECS: u64 = 10;

/// Observer trait for receiving crawl events
///
/// Implement this trait to monitor harvest progress, collect custom metrics,
/// or implement custom reporting.
///
/// # Example
///
/// ```ignore
/// use iotlt_harvest::CrawlObserver;
///
/// struct FailureLog;
///
/// #[async_trait::async_trait]
/// impl CrawlObserver for FailureLog {
///     async fn on_event_error(&self, url: &str, error: &str) {
///         eprintln!("skipped {url}: {error}");
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait CrawlObserver: Send + Sync {
    /// Called when a listing page has been read
    async fn on_page_visited(&self, _page: u32, _event_urls: &[String]) {}

    /// Called when an event has been assembled into a record
    async fn on_event_assembled(&self, _record: &EventRecord) {}

    /// Called when assembling an event failed
    async fn on_event_error(&self, _url: &str, _error: &str) {}

    /// Called after the slide cache has been saved
    async fn on_checkpoint(&self, _verdicts: usize) {}

    /// Called when the table has been written
    async fn on_crawl_complete(&self, _stats: &CrawlStats) {}
}

/// Registry for managing multiple crawl observers
pub struct ObserverRegistry {
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl ObserverRegistry {
    /// Create a new empty ObserverRegistry
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Register an observer to receive crawl events
    pub fn register(&mut self, observer: Arc<dyn CrawlObserver>) {
        self.observers.push(observer);
    }

    pub async fn notify_page_visited(&self, page: u32, event_urls: &[String]) {
        for observer in &self.observers {
            observer.on_page_visited(page, event_urls).await;
        }
    }

    pub async fn notify_event_assembled(&self, record: &EventRecord) {
        for observer in &self.observers {
            observer.on_event_assembled(record).await;
        }
    }

    pub async fn notify_event_error(&self, url: &str, error: &str) {
        for observer in &self.observers {
            observer.on_event_error(url, error).await;
        }
    }

    pub async fn notify_checkpoint(&self, verdicts: usize) {
        for observer in &self.observers {
            observer.on_checkpoint(verdicts).await;
        }
    }

    pub async fn notify_crawl_complete(&self, stats: &CrawlStats) {
        for observer in &self.observers {
            observer.on_crawl_complete(stats).await;
        }
    }
}

impl Default for ObserverRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics collected during a harvest with timestamps
#[derive(Debug, Clone)]
pub struct CrawlStats {
    /// Number of listing pages read
    pub pages_visited: usize,
    /// Number of events assembled into records
    pub events_extracted: usize,
    /// Number of events that failed to assemble
    pub errors_encountered: usize,
    /// When the harvest started
    pub start_time: Instant,
    /// When these stats were last updated
    pub last_update: Instant,
}

impl CrawlStats {
    /// Create new CrawlStats with current timestamp
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            pages_visited: 0,
            events_extracted: 0,
            errors_encountered: 0,
            start_time: now,
            last_update: now,
        }
    }

    /// Get elapsed time since the harvest started
    pub fn elapsed(&self) -> Duration {
        self.last_update.duration_since(self.start_time)
    }
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Statistics tracker with real-time broadcasting
pub struct StatsTracker {
    pages_visited: AtomicUsize,
    events_extracted: AtomicUsize,
    errors_encountered: AtomicUsize,
    start_time: Instant,
    tx: Mutex<Option<watch::Sender<CrawlStats>>>,
    rx: watch::Receiver<CrawlStats>,
}

impl StatsTracker {
    /// Create a new StatsTracker
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(CrawlStats::new());
        Self {
            pages_visited: AtomicUsize::new(0),
            events_extracted: AtomicUsize::new(0),
            errors_encountered: AtomicUsize::new(0),
            start_time: Instant::now(),
            tx: Mutex::new(Some(tx)),
            rx,
        }
    }

    /// Subscribe to statistics updates
    pub fn subscribe(&self) -> watch::Receiver<CrawlStats> {
        self.rx.clone()
    }

    pub fn page_visited(&self) {
        self.pages_visited.fetch_add(1, Ordering::Relaxed);
        self.broadcast();
    }

    pub fn event_extracted(&self) {
        self.events_extracted.fetch_add(1, Ordering::Relaxed);
        self.broadcast();
    }

    pub fn error_encountered(&self) {
        self.errors_encountered.fetch_add(1, Ordering::Relaxed);
        self.broadcast();
    }

    fn broadcast(&self) {
        let stats = self.snapshot();
        // Nobody listening is fine
        if let Ok(tx_guard) = self.tx.lock()
            && let Some(tx) = tx_guard.as_ref()
        {
            let _ = tx.send(stats);
        }
    }

    /// Get a snapshot of current statistics
    pub fn snapshot(&self) -> CrawlStats {
        CrawlStats {
            pages_visited: self.pages_visited.load(Ordering::Relaxed),
            events_extracted: self.events_extracted.load(Ordering::Relaxed),
            errors_encountered: self.errors_encountered.load(Ordering::Relaxed),
            start_time: self.start_time,
            last_update: Instant::now(),
        }
    }

    /// Close the statistics sender to signal completion to subscribers
    pub fn close(&self) {
        if let Ok(mut tx_guard) = self.tx.lock() {
            *tx_guard = None;
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolves when `token` is cancelled, never when there is no token
async fn cancelled(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending::<()>().await,
    }
}

fn is_cancelled(token: Option<&CancellationToken>) -> bool {
    token.is_some_and(CancellationToken::is_cancelled)
}

/// Harvester that walks listing pages and writes the event table
///
/// Work is strictly sequential: pages from the oldest to `end_page`, events in the
/// order a page lists them. The slide cache is saved after every page and once more
/// at the end, even when the run fails.
pub struct Crawler {
    config: CrawlerConfig,
    backend: Arc<dyn HttpBackend>,
    observers: Arc<ObserverRegistry>,
    stats: Arc<StatsTracker>,
}

impl Crawler {
    /// Create a crawler builder for custom configuration
    pub fn builder() -> CrawlerBuilder {
        CrawlerBuilder::default()
    }

    /// Get a snapshot of current crawl statistics
    pub fn stats(&self) -> CrawlStats {
        self.stats.snapshot()
    }

    /// Subscribe to real-time statistics updates
    pub fn subscribe_stats(&self) -> watch::Receiver<CrawlStats> {
        self.stats.subscribe()
    }

    /// Harvest every configured page and rewrite the table
    pub async fn run(&self) -> Result<CrawlStats, HarvestError> {
        self.run_internal(None).await
    }

    /// Harvest with cancellation support
    ///
    /// Cancellation is terminal: the in-flight event is dropped, the slide cache is
    /// saved and [`HarvestError::Cancelled`] is returned without touching the table.
    pub async fn run_with_cancellation(
        &self,
        cancel_token: CancellationToken,
    ) -> Result<CrawlStats, HarvestError> {
        self.run_internal(Some(cancel_token)).await
    }

    async fn run_internal(
        &self,
        cancel_token: Option<CancellationToken>,
    ) -> Result<CrawlStats, HarvestError> {
        let mut cache = match &self.config.cache_path {
            Some(path) => SlideCache::load(path)?,
            None => SlideCache::in_memory(),
        };
        tracing::info!("Starting harvest with {} cached slide verdicts", cache.len());

        let outcome = self.harvest(&mut cache, cancel_token.as_ref()).await;

        // Saved even when the harvest failed so finished validation work survives
        let saved = self.checkpoint(&mut cache).await;
        let records = outcome?;
        saved?;

        let records = dedup_and_sort(records);
        write_table(&self.config.output_path, &records)?;

        self.stats.close();
        let final_stats = self.stats.snapshot();
        self.observers.notify_crawl_complete(&final_stats).await;

        tracing::info!(
            "Harvest complete: {} pages, {} events, {} failed in {:.1?}",
            final_stats.pages_visited,
            final_stats.events_extracted,
            final_stats.errors_encountered,
            final_stats.elapsed()
        );
        Ok(final_stats)
    }

    async fn harvest(
        &self,
        cache: &mut SlideCache,
        cancel_token: Option<&CancellationToken>,
    ) -> Result<Vec<EventRecord>, HarvestError> {
        let traversal = ListTraversal::new(
            self.backend.clone(),
            &self.config.base_url,
            self.config.timeouts.list,
        );
        let assembler = EventAssembler::new(self.backend.clone(), self.config.timeouts);

        let start = match self.config.start_page {
            Some(page) => page,
            None => traversal.detect_oldest_page().await?,
        };
        let end = self.config.end_page;
        if end > start {
            return Err(ConfigError::InvalidPageRange { start, end }.into());
        }

        let mut records = Vec::new();
        let mut first_event = true;

        for page in (end..=start).rev() {
            if is_cancelled(cancel_token) {
                return Err(HarvestError::Cancelled);
            }

            let event_urls = traversal.list_event_urls(page).await?;
            self.stats.page_visited();
            self.observers.notify_page_visited(page, &event_urls).await;

            for url in &event_urls {
                if is_cancelled(cancel_token) {
                    return Err(HarvestError::Cancelled);
                }
                if !first_event {
                    self.pause().await;
                }
                first_event = false;

                let assembled = tokio::select! {
                    result = assembler.assemble(cache, url) => result,
                    _ = cancelled(cancel_token) => return Err(HarvestError::Cancelled),
                };

                match assembled {
                    Ok(record) => {
                        tracing::info!("{} {} {}", record.date, record.volume_label, record.title);
                        self.stats.event_extracted();
                        self.observers.notify_event_assembled(&record).await;
                        records.push(record);
                    }
                    Err(err) => {
                        let error_msg = err.to_string();
                        self.stats.error_encountered();
                        self.observers.notify_event_error(url, &error_msg).await;
                        if self.config.fail_fast {
                            tracing::error!("Error assembling {}: {}", url, error_msg);
                            return Err(err);
                        }
                        tracing::warn!("Skipping {}: {}", url, error_msg);
                    }
                }
            }

            self.checkpoint(cache).await?;
        }

        Ok(records)
    }

    async fn checkpoint(&self, cache: &mut SlideCache) -> Result<(), HarvestError> {
        cache.save()?;
        self.observers.notify_checkpoint(cache.len()).await;
        Ok(())
    }

    async fn pause(&self) {
        if !self.config.request_delay.is_zero() {
            sleep(self.config.request_delay).await;
        }
    }
}

/// Builder for configuring a Crawler
pub struct CrawlerBuilder {
    config: CrawlerConfig,
    backend: Option<Arc<dyn HttpBackend>>,
    observers: Vec<Arc<dyn CrawlObserver>>,
}

impl Default for CrawlerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CrawlerBuilder {
    /// Create a new CrawlerBuilder with default settings
    pub fn new() -> Self {
        Self {
            config: CrawlerConfig {
                base_url: DEFAULT_BASE_URL.to_string(),
                start_page: None,
                end_page: DEFAULT_END_PAGE,
                timeouts: Timeouts::default(),
                request_delay: Duration::from_millis(DEFAULT_DELAY_MS),
                cache_path: Some(PathBuf::from(DEFAULT_CACHE_PATH)),
                output_path: PathBuf::from(DEFAULT_OUTPUT_PATH),
                write_mode: WriteMode::Rebuild,
                fail_fast: false,
            },
            backend: None,
            observers: Vec::new(),
        }
    }

    /// Set the connpass group URL (default: `https://iotlt.connpass.com`)
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Start from a fixed listing page instead of detecting the oldest one
    pub fn start_page(mut self, page: u32) -> Self {
        self.config.start_page = Some(page);
        self
    }

    /// Detect the oldest listing page from page 1 (default)
    pub fn detect_oldest_page(mut self) -> Self {
        self.config.start_page = None;
        self
    }

    /// Set the last (newest) listing page to visit (default: 1)
    pub fn end_page(mut self, page: u32) -> Self {
        self.config.end_page = page;
        self
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.config.timeouts = timeouts;
        self
    }

    /// Set the pause between event fetches (default: 1s)
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.config.request_delay = delay;
        self
    }

    /// Set the slide cache file (default: `slide_cache.json`)
    pub fn cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cache_path = Some(path.into());
        self
    }

    /// Keep slide verdicts in memory only
    pub fn in_memory_cache(mut self) -> Self {
        self.config.cache_path = None;
        self
    }

    /// Set the markdown document to rewrite (default: `README.md`)
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_path = path.into();
        self
    }

    pub fn write_mode(mut self, mode: WriteMode) -> Self {
        self.config.write_mode = mode;
        self
    }

    /// Abort the whole run on the first event that fails to assemble
    pub fn fail_fast(mut self, fail_fast: bool) -> Self {
        self.config.fail_fast = fail_fast;
        self
    }

    /// Use a custom HTTP backend instead of `reqwest`
    pub fn backend(mut self, backend: Arc<dyn HttpBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Register an observer to receive crawl events
    pub fn observe_with(mut self, observer: Arc<dyn CrawlObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Build the Crawler with the configured settings
    pub fn build(self) -> Result<Crawler, ConfigError> {
        self.config.validate()?;

        let backend = match self.backend {
            Some(backend) => backend,
            None => Arc::new(
                ReqwestBackend::new().map_err(|e| ConfigError::HttpClient(e.to_string()))?,
            ),
        };

        let mut registry = ObserverRegistry::new();
        for observer in self.observers {
            registry.register(observer);
        }

        Ok(Crawler {
            config: self.config,
            backend,
            observers: Arc::new(registry),
            stats: Arc::new(StatsTracker::new()),
        })
    }
}
