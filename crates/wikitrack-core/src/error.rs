//! Error types for wikitrack
//!
//! Configuration problems are fatal for the whole run. Everything that can
//! go wrong while fetching or extracting a single series is contained at the
//! per-series boundary by the tracker.

use thiserror::Error;

/// Error type for wikitrack operations
#[derive(Error, Debug)]
pub enum TrackerError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Reading or writing the page cache failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file is not valid JSON or has the wrong shape
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failed to parse page content
    #[error("Failed to parse HTML: {0}")]
    ParseError(String),

    /// Required HTML element was not found
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// No season could be extracted from the page
    #[error("No seasons found for [{title}] at [{url}]")]
    NoSeasons { title: String, url: String },

    /// Rate limited by the server (HTTP 429)
    #[error("Rate limited - too many requests")]
    RateLimited,

    /// Requested page does not exist (HTTP 404)
    #[error("Page not found: {0}")]
    NotFound(String),
}

impl TrackerError {
    /// Whether this error must abort the whole run instead of a single series.
    pub fn is_fatal(&self) -> bool {
        matches!(self, TrackerError::Config(_) | TrackerError::Json(_))
    }
}

/// Result type alias for wikitrack operations
pub type Result<T> = std::result::Result<T, TrackerError>;
