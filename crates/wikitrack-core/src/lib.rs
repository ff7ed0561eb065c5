//! Wikitrack Core Library
//!
//! Reads episode tables from wiki pages and reports, for every tracked TV
//! series, the next episode that has not been watched yet.
//!
//! # Features
//! - Layout-driven episode extraction with format inheritance
//! - Air dates at day, month or year precision
//! - Watched ranges over a unified season/episode index
//! - Rate-limited HTTP client with a conditional-GET page cache
//! - Text and JSON lines reports ranked by air date

pub mod client;
pub mod config;
pub mod date;
pub mod error;
pub mod filter;
pub mod format;
pub mod output;
pub mod parser;
pub mod ranking;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use client::{purge_cache, ClientConfig, DocumentSource, RateLimiter, WikiClient};
pub use config::{SeriesList, TrackerConfig, WatchedList};
pub use date::{AirDate, DateParser};
pub use error::{Result, TrackerError};
pub use filter::{FilterMap, IndexScheme, SeriesFilter, WatchedRange};
pub use format::{FormatDefinition, FormatRegistry};
pub use output::{Formatter, JsonLinesFormatter, TextFormatter};
pub use ranking::{rank_all, select_next};
pub use tracker::SeriesTracker;
pub use types::{Episode, Season, Series, TrackedSeries};
