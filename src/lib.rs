// Core modules
mod backend;
mod cache;
pub mod crawler;
mod error;
pub mod extract;
mod item;
pub mod links;
pub mod logging;
pub mod table;
pub mod traversal;

// Pipeline stages
pub mod assembler;
pub mod resolver;
pub mod validator;

// Public exports
pub use assembler::EventAssembler;
pub use backend::{HttpBackend, Page, ProbeMethod, ReqwestBackend};
pub use cache::SlideCache;
pub use crawler::{
    ConfigError, CrawlObserver, CrawlStats, Crawler, CrawlerBuilder, CrawlerConfig,
    ObserverRegistry, StatsTracker, Timeouts,
};
pub use error::{CacheError, ExtractionError, HarvestError};
pub use item::{EventRecord, MAIN_LINE_TYPE, Mode, OTHER_TYPE};
pub use links::{LinkKind, UrlNormalizer};
pub use resolver::{Resolution, ShortenerResolver};
pub use table::WriteMode;
pub use traversal::ListTraversal;
pub use validator::SlideValidator;
