//! Unified episode index and watched-range filtering
//!
//! Every (season, episode) pair maps to a single integer
//! `season * multiplier + episode`. Season and episode numbers must stay below
//! the multiplier or two different pairs would share an index.
//!
//! A watched range is written `[S{s}E{e}]-S{s2}E{e2}`. Both bounds are
//! inclusive: the end episode is the last one watched, so it is never
//! reported as "next".

use std::collections::HashMap;
use std::sync::OnceLock;

use regex_lite::Regex;
use tracing::info;

use crate::config::WatchedList;
use crate::error::{Result, TrackerError};
use crate::types::Episode;

/// Default season multiplier for the unified index.
pub const DEFAULT_SEASON_MULTIPLIER: u32 = 10_000;

/// Encodes (season, episode) pairs as comparable integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexScheme {
    multiplier: u32,
}

impl Default for IndexScheme {
    fn default() -> Self {
        Self {
            multiplier: DEFAULT_SEASON_MULTIPLIER,
        }
    }
}

impl IndexScheme {
    /// Create a scheme with a custom multiplier.
    ///
    /// # Errors
    /// Returns `TrackerError::Config` for a zero multiplier.
    pub fn new(multiplier: u32) -> Result<Self> {
        if multiplier == 0 {
            return Err(TrackerError::Config(
                "Season multiplier must be greater than zero".to_string(),
            ));
        }
        Ok(Self { multiplier })
    }

    pub fn multiplier(&self) -> u32 {
        self.multiplier
    }

    /// Unified index of an episode.
    ///
    /// # Examples
    /// ```
    /// use wikitrack_core::filter::IndexScheme;
    ///
    /// assert_eq!(IndexScheme::default().to_index(1, 5), 10_005);
    /// ```
    pub fn to_index(&self, season: u32, episode: u32) -> u64 {
        u64::from(season) * u64::from(self.multiplier) + u64::from(episode)
    }

    /// Parse an `S{season}E{episode}` token into its unified index.
    pub fn parse_code(&self, code: &str) -> Result<u64> {
        static CODE: OnceLock<Regex> = OnceLock::new();
        let re = CODE.get_or_init(|| Regex::new(r"(?i)^S(\d+)E(\d+)$").expect("valid regex"));

        let invalid = || {
            TrackerError::Config(format!(
                "Provided input indicating 'watched' [{}] does not match valid format",
                code
            ))
        };
        let caps = re.captures(code.trim()).ok_or_else(invalid)?;
        let season: u32 = caps[1].parse().map_err(|_| invalid())?;
        let episode: u32 = caps[2].parse().map_err(|_| invalid())?;
        Ok(self.to_index(season, episode))
    }
}

/// Inclusive interval of watched unified indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchedRange {
    pub start: u64,
    pub end: u64,
}

impl WatchedRange {
    /// Parse a single range token.
    ///
    /// `S01E03` covers exactly that episode, `-S01E03` and `S01E01-S01E03`
    /// cover everything from the left bound (index 0 when omitted) up to and
    /// including `S01E03`.
    ///
    /// # Errors
    /// Returns `TrackerError::Config` for malformed tokens and for ranges
    /// whose start lies after their end.
    pub fn parse(token: &str, scheme: IndexScheme) -> Result<Self> {
        let parts: Vec<&str> = token.split('-').map(str::trim).collect();
        match parts.as_slice() {
            [single] => {
                let index = scheme.parse_code(single)?;
                Ok(Self {
                    start: index,
                    end: index,
                })
            }
            [left, right] => {
                let start = if left.is_empty() {
                    0
                } else {
                    scheme.parse_code(left)?
                };
                let end = scheme.parse_code(right)?;
                if start > end {
                    return Err(TrackerError::Config(format!(
                        "Reversed range in filter [{}]",
                        token
                    )));
                }
                Ok(Self { start, end })
            }
            _ => Err(TrackerError::Config(format!(
                "Illegal value for filter [{}]",
                token
            ))),
        }
    }

    /// `false` exactly when `start <= index <= end`.
    pub fn allow(&self, index: u64) -> bool {
        if index > self.end {
            true
        } else if index == self.end {
            false
        } else {
            index < self.start
        }
    }
}

/// Watched state of one series: the episodes outside every range are allowed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeriesFilter {
    ranges: Vec<WatchedRange>,
}

/// Filter used for series the user has not watched at all.
pub static ALLOW_ALL: SeriesFilter = SeriesFilter { ranges: Vec::new() };

impl SeriesFilter {
    pub fn new(ranges: Vec<WatchedRange>) -> Self {
        Self { ranges }
    }

    /// Filter that reports every episode.
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Parse a comma separated list of range tokens; blank parts are ignored.
    pub fn parse(raw: &str, scheme: IndexScheme) -> Result<Self> {
        let ranges = raw
            .split(',')
            .map(str::trim)
            .filter(|part| !part.is_empty())
            .map(|part| WatchedRange::parse(part, scheme))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { ranges })
    }

    pub fn ranges(&self) -> &[WatchedRange] {
        &self.ranges
    }

    pub fn allow_index(&self, index: u64) -> bool {
        self.ranges.iter().all(|range| range.allow(index))
    }

    /// Whether `episode` is still to be watched.
    pub fn allow(&self, episode: &Episode) -> bool {
        self.allow_index(episode.index)
    }
}

/// Filters keyed by series title.
#[derive(Debug, Clone, Default)]
pub struct FilterMap {
    filters: HashMap<String, SeriesFilter>,
}

impl FilterMap {
    /// Parse every entry of the watched list.
    ///
    /// # Arguments
    /// * `watched` - Watched list as loaded from disk
    /// * `scheme` - Index scheme the range codes are converted with
    ///
    /// # Errors
    /// Returns `TrackerError::Config` if any token is malformed.
    pub fn from_watched(watched: &WatchedList, scheme: IndexScheme) -> Result<Self> {
        let mut filters = HashMap::with_capacity(watched.watched.len());
        for entry in &watched.watched {
            let filter = SeriesFilter::parse(&entry.watched, scheme).map_err(|err| match err {
                TrackerError::Config(msg) => {
                    TrackerError::Config(format!("{} for series [{}]", msg, entry.title))
                }
                other => other,
            })?;
            filters.insert(entry.title.clone(), filter);
        }
        Ok(Self { filters })
    }

    /// Insert an allow-all filter for every title without one.
    pub fn fill_defaults<'a>(&mut self, titles: impl IntoIterator<Item = &'a str>) {
        for title in titles {
            if !self.filters.contains_key(title) {
                info!(series = title, "no watched entry, reporting every episode");
                self.filters.insert(title.to_string(), SeriesFilter::allow_all());
            }
        }
    }

    /// Filter for `title`, allow-all when the title is unknown.
    pub fn get(&self, title: &str) -> &SeriesFilter {
        self.filters.get(title).unwrap_or(&ALLOW_ALL)
    }

    pub fn contains(&self, title: &str) -> bool {
        self.filters.contains_key(title)
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}
