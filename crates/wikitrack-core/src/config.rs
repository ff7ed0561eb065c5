//! Configuration files and run settings
//!
//! Two JSON documents drive a run: the series list (format definitions, column
//! hints and the series to track) and the watched list (per-series ranges).

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{Result, TrackerError};
use crate::filter::DEFAULT_SEASON_MULTIPLIER;

/// Format used when a series names none.
pub const DEFAULT_FORMAT_ID: &str = "wiki:toc-episodes-vevent";

/// Hint set used when a series names none.
pub const DEFAULT_HINTS_ID: &str = "wiki:auto";

/// Prefix for english wikipedia pages
pub const DEFAULT_BASE_URL: &str = "https://en.wikipedia.org/wiki/";

/// Column keywords per category, e.g. `"table.col.title" -> ["title"]`.
pub type HintSet = BTreeMap<String, Vec<String>>;

/// Reference to a format definition: a registered id or an inline mapping.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FormatRef {
    Named(String),
    Inline(Map<String, Value>),
}

/// Reference to a hint set: a registered id or an inline set.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum HintRef {
    Named(String),
    Inline(HintSet),
}

/// One series to track.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeriesEntry {
    pub title: String,
    /// Page name appended to the base URL
    #[serde(default)]
    pub page: Option<String>,
    /// Absolute URL, wins over `page`
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub format: Option<FormatRef>,
    #[serde(default)]
    pub hints: Option<HintRef>,
    /// 1-based TOC positions that are not seasons (specials, webisodes)
    #[serde(default, rename = "season.skip")]
    pub season_skip: Vec<u32>,
}

impl SeriesEntry {
    /// Page URL for this series.
    ///
    /// # Errors
    /// Returns `TrackerError::Config` when neither `url` nor `page` is set.
    pub fn resolve_url(&self, base_url: &str) -> Result<String> {
        if let Some(url) = &self.url {
            return Ok(url.clone());
        }
        match &self.page {
            Some(page) => Ok(format!("{}{}", base_url, page)),
            None => Err(TrackerError::Config(format!(
                "Series [{}] defines neither 'page' nor 'url'",
                self.title
            ))),
        }
    }
}

/// Contents of the series list file.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SeriesList {
    #[serde(default)]
    pub formats: HashMap<String, Map<String, Value>>,
    #[serde(default)]
    pub hints: HashMap<String, HintSet>,
    #[serde(default)]
    pub series: Vec<SeriesEntry>,
}

impl SeriesList {
    /// Parse a series list from JSON text, lower-casing every hint keyword.
    pub fn from_json(json: &str) -> Result<Self> {
        let mut list: SeriesList = serde_json::from_str(json)?;
        for set in list.hints.values_mut() {
            lowercase_hints(set);
        }
        for entry in &mut list.series {
            if let Some(HintRef::Inline(set)) = &mut entry.hints {
                lowercase_hints(set);
            }
        }
        Ok(list)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&read_config(path)?)
    }
}

fn lowercase_hints(set: &mut HintSet) {
    for keywords in set.values_mut() {
        for keyword in keywords.iter_mut() {
            *keyword = keyword.to_lowercase();
        }
    }
}

/// Watched ranges of one series.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WatchedEntry {
    pub title: String,
    /// Comma separated range tokens, e.g. `S01E01-S01E05, S02E01`
    #[serde(default)]
    pub watched: String,
}

/// Contents of the watched list file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct WatchedList {
    #[serde(default)]
    pub watched: Vec<WatchedEntry>,
}

impl WatchedList {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_json(&read_config(path)?)
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|err| {
        TrackerError::Config(format!("Failed to read [{}]: {}", path.display(), err))
    })
}

/// Settings for a single run.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Prefix for `page` entries
    pub base_url: String,
    /// Multiplier of the unified episode index (default: 10000)
    pub season_multiplier: u32,
    /// Root of the page cache
    pub cache_dir: PathBuf,
    /// Serve cached pages without asking the server
    pub offline: bool,
    /// Maximum requests per second (default: 2.0)
    pub requests_per_second: f64,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            season_multiplier: DEFAULT_SEASON_MULTIPLIER,
            cache_dir: PathBuf::from("cache"),
            offline: false,
            requests_per_second: 2.0,
            timeout_secs: 30,
        }
    }
}
