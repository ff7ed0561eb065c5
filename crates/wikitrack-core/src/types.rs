//! Data types for wikitrack
//!
//! Series and episodes are built once per run from page content and never
//! mutated afterwards. All types implement Serialize for the JSON lines report.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::date::AirDate;
use crate::filter::IndexScheme;

/// Episode information
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Episode {
    /// Season number (1-based)
    pub season: u32,
    /// Episode number within the season (1-based)
    pub episode: u32,
    /// Title as printed in the episode table, may be empty
    pub title: String,
    /// Original air date
    pub air_date: AirDate,
    /// Unified index, see [`IndexScheme`]
    pub index: u64,
}

impl Episode {
    pub fn new(
        season: u32,
        episode: u32,
        title: impl Into<String>,
        air_date: AirDate,
        scheme: IndexScheme,
    ) -> Self {
        Self {
            season,
            episode,
            title: title.into(),
            air_date,
            index: scheme.to_index(season, episode),
        }
    }

    /// Episode code in format SxxExx (e.g., S01E01)
    pub fn code(&self) -> String {
        format!("S{:02}E{:02}", self.season, self.episode)
    }

    /// Order by air date, unknown dates last.
    pub fn cmp_by_air_date(&self, other: &Episode) -> Ordering {
        self.air_date.cmp_chronological(&other.air_date)
    }
}

/// One season: its episodes in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Season {
    /// Season number (1-based, gap free after skipped seasons)
    pub number: u32,
    pub episodes: Vec<Episode>,
}

/// Everything extracted for one series during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    /// Page the episodes were read from
    pub url: String,
    /// Display title, also the key into the watched list
    pub title: String,
    pub seasons: Vec<Season>,
}

impl Series {
    /// All episodes in season order.
    pub fn episodes(&self) -> impl Iterator<Item = &Episode> {
        self.seasons.iter().flat_map(|season| season.episodes.iter())
    }

    pub fn episode_count(&self) -> usize {
        self.seasons.iter().map(|season| season.episodes.len()).sum()
    }
}

/// A series together with its next unwatched episode, if any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrackedSeries {
    pub series: Series,
    pub next: Option<Episode>,
}
