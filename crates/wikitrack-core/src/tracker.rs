//! Run orchestration
//!
//! [`SeriesTracker::new`] resolves the whole configuration up front, so every
//! configuration error surfaces before the first page is fetched. Tracking
//! then walks the series one by one; a page that cannot be fetched or parsed
//! only drops that series from the report.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::client::DocumentSource;
use crate::config::{
    FormatRef, HintRef, HintSet, SeriesEntry, SeriesList, TrackerConfig, WatchedList,
    DEFAULT_FORMAT_ID, DEFAULT_HINTS_ID,
};
use crate::error::{Result, TrackerError};
use crate::filter::{FilterMap, IndexScheme};
use crate::format::{FormatDefinition, FormatRegistry};
use crate::output::Formatter;
use crate::parser::{parse_series, ExtractionPlan, WikiLayout};
use crate::ranking::{rank_all, track};
use crate::types::TrackedSeries;

/// Tracks the next unwatched episode of every configured series.
///
/// # Example
/// ```no_run
/// use wikitrack_core::{SeriesList, SeriesTracker, TrackerConfig, WatchedList, WikiClient};
///
/// # async fn example() -> wikitrack_core::Result<()> {
/// let config = TrackerConfig::default();
/// let client = WikiClient::with_config((&config).into())?;
/// let series = SeriesList::load("series.json".as_ref())?;
/// let watched = WatchedList::load("watched.json".as_ref())?;
///
/// let tracker = SeriesTracker::new(client, &series, &watched, &config)?;
/// for entry in tracker.track().await? {
///     println!("{}: {:?}", entry.series.title, entry.next.map(|e| e.code()));
/// }
/// # Ok(())
/// # }
/// ```
pub struct SeriesTracker<S> {
    source: S,
    plans: Vec<ExtractionPlan>,
    filters: FilterMap,
}

impl<S: DocumentSource> SeriesTracker<S> {
    /// Resolve formats, hints, URLs and watched ranges for every series.
    ///
    /// # Arguments
    /// * `source` - Where page documents come from
    /// * `series_list` - Formats, hints and series to track
    /// * `watched_list` - Watched ranges per series title
    /// * `config` - Base URL and season multiplier of this run
    ///
    /// # Errors
    /// Returns `TrackerError::Config` (or `Json`) for any invalid setting.
    pub fn new(
        source: S,
        series_list: &SeriesList,
        watched_list: &WatchedList,
        config: &TrackerConfig,
    ) -> Result<Self> {
        let scheme = IndexScheme::new(config.season_multiplier)?;
        let registry = FormatRegistry::build(&series_list.formats)?;
        debug!(formats = registry.len(), "Format registry built");

        let plans = series_list
            .series
            .iter()
            .enumerate()
            .map(|(slot, entry)| build_plan(slot, entry, series_list, &registry, config, scheme))
            .collect::<Result<Vec<_>>>()?;

        let mut filters = FilterMap::from_watched(watched_list, scheme)?;
        filters.fill_defaults(plans.iter().map(|plan| plan.title.as_str()));

        Ok(Self {
            source,
            plans,
            filters,
        })
    }

    /// Resolved extraction plans in configuration order.
    pub fn plans(&self) -> &[ExtractionPlan] {
        &self.plans
    }

    pub fn filters(&self) -> &FilterMap {
        &self.filters
    }

    /// Fetch and extract every series, then rank them.
    ///
    /// Series whose page cannot be fetched or parsed are logged and left out.
    ///
    /// # Errors
    /// Only errors for which [`TrackerError::is_fatal`] holds are returned.
    pub async fn track(&self) -> Result<Vec<TrackedSeries>> {
        let mut tracked = Vec::with_capacity(self.plans.len());

        for plan in &self.plans {
            match self.track_one(plan).await {
                Ok(entry) => tracked.push(entry),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    error!(title = %plan.title, url = %plan.url, error = %err, "Skipping series");
                }
            }
        }

        info!(
            tracked = tracked.len(),
            configured = self.plans.len(),
            "Tracking finished"
        );
        Ok(rank_all(tracked))
    }

    async fn track_one(&self, plan: &ExtractionPlan) -> Result<TrackedSeries> {
        let html = self.source.fetch_document(&plan.title, &plan.url).await?;
        let series = parse_series(&html, plan)?;
        debug!(
            title = %series.title,
            seasons = series.seasons.len(),
            episodes = series.episode_count(),
            "Extracted series"
        );
        Ok(track(series, self.filters.get(&plan.title)))
    }

    /// Hand each ranked entry to `formatter` in order.
    pub fn write_report<F: Formatter + ?Sized>(
        &self,
        ranked: &[TrackedSeries],
        formatter: &mut F,
    ) -> Result<()> {
        for entry in ranked {
            formatter.write(&entry.series, self.filters.get(&entry.series.title))?;
        }
        formatter.finish()
    }
}

fn build_plan(
    slot: usize,
    entry: &SeriesEntry,
    series_list: &SeriesList,
    registry: &FormatRegistry,
    config: &TrackerConfig,
    scheme: IndexScheme,
) -> Result<ExtractionPlan> {
    let definition = resolve_format(slot, entry, registry)?;
    let layout = WikiLayout::from_definition(&definition).map_err(|err| in_series(err, entry))?;

    Ok(ExtractionPlan {
        title: entry.title.clone(),
        url: entry.resolve_url(&config.base_url)?,
        layout,
        hints: resolve_hints(entry, series_list)?,
        season_skip: entry.season_skip.iter().copied().collect::<BTreeSet<_>>(),
        scheme,
    })
}

fn resolve_format(
    slot: usize,
    entry: &SeriesEntry,
    registry: &FormatRegistry,
) -> Result<Arc<FormatDefinition>> {
    let resolved = match &entry.format {
        None => registry.resolve(DEFAULT_FORMAT_ID),
        Some(FormatRef::Named(id)) => registry.resolve(id),
        Some(FormatRef::Inline(entries)) => registry.resolve_inline(slot, entries),
    };
    resolved.map_err(|err| in_series(err, entry))
}

fn resolve_hints(entry: &SeriesEntry, series_list: &SeriesList) -> Result<HintSet> {
    let id = match &entry.hints {
        Some(HintRef::Inline(set)) => return Ok(set.clone()),
        Some(HintRef::Named(id)) => id.as_str(),
        None => DEFAULT_HINTS_ID,
    };
    series_list.hints.get(id).cloned().ok_or_else(|| {
        TrackerError::Config(format!(
            "No hints defined with id [{}], for series [{}]",
            id, entry.title
        ))
    })
}

fn in_series(err: TrackerError, entry: &SeriesEntry) -> TrackerError {
    match err {
        TrackerError::Config(message) => {
            TrackerError::Config(format!("{}, for series [{}]", message, entry.title))
        }
        other => other,
    }
}
