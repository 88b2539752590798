//! Error types for harvesting, extraction and cache persistence
//!
//! Errors are split by how far they propagate:
//! - [`ExtractionError`] aborts a single event.
//! - [`HarvestError`] is what the pipeline returns; the crawler decides whether a
//!   per-event variant stops the run or is only logged.
//! - [`CacheError`] covers the slide verdict file.

use std::path::PathBuf;

/// Errors that can occur while extracting fields from an event page
///
/// Only the fields the table cannot do without are represented here. Missing venue,
/// address or title degrade to empty cells instead.
///
/// # Examples
///
/// ```ignore
/// use iotlt_harvest::{ExtractionError, HarvestError};
///
/// match assembler.assemble(&mut cache, url).await {
///     Ok(record) => println!("{}", record.title),
///     Err(HarvestError::Extraction(ExtractionError::MissingDate { url })) => {
///         eprintln!("no date on {url}");
///     }
///     Err(e) => eprintln!("other error: {e}"),
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// No `YYYY/MM/DD` shape anywhere on the page
    #[error("No event date found on '{url}'")]
    MissingDate { url: String },

    /// Neither the detail page nor the participation page declared a count
    #[error("No participant count found on '{url}' or its participation page")]
    MissingParticipants { url: String },
}

/// Errors that can occur while loading or saving the slide verdict cache
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Reading, writing or renaming the cache file failed
    #[error("Cache I/O failed for '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The cache file exists but is not a flat JSON object of booleans
    ///
    /// The file is left untouched so the verdicts in it are not lost.
    #[error("Cache file '{path}' is malformed: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors returned by the harvesting pipeline
#[derive(Debug, thiserror::Error)]
pub enum HarvestError {
    /// A page that must be readable answered with something other than 200
    #[error("Unexpected HTTP status {status} for '{url}'")]
    Status { url: String, status: u16 },

    /// The request never produced a response
    #[error("Request to '{url}' failed: {message}")]
    Transport { url: String, message: String },

    /// A marker the pipeline relies on is missing from a listing page
    #[error("Marker '{marker}' not found on '{url}'")]
    Format { url: String, marker: &'static str },

    #[error(transparent)]
    Config(#[from] crate::ConfigError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    /// Writing the markdown document failed
    #[error("Failed to write output '{path}': {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The run was cancelled before the table could be written
    #[error("Harvest cancelled")]
    Cancelled,
}
