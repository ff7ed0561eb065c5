//! Next-episode selection and cross-series ranking

use std::cmp::Ordering;

use crate::date::AirDate;
use crate::filter::SeriesFilter;
use crate::types::{Episode, Series, TrackedSeries};

/// First episode of `series`, in season order, that `filter` allows.
///
/// Returns `None` when every episode has been watched or the series has none.
pub fn select_next<'a>(series: &'a Series, filter: &SeriesFilter) -> Option<&'a Episode> {
    series.episodes().find(|episode| filter.allow(episode))
}

/// Pair a series with its next unwatched episode.
pub fn track(series: Series, filter: &SeriesFilter) -> TrackedSeries {
    let next = select_next(&series, filter).cloned();
    TrackedSeries { series, next }
}

/// Air date used for ranking. A fully watched series ranks like an unknown date.
fn ranking_date(tracked: &TrackedSeries) -> AirDate {
    tracked
        .next
        .as_ref()
        .map_or(AirDate::Unknown, |episode| episode.air_date)
}

/// Order two tracked series: earliest next episode first, series without a
/// next episode or with an unknown air date last, ties by case-insensitive
/// title.
pub fn compare_tracked(a: &TrackedSeries, b: &TrackedSeries) -> Ordering {
    let by_date = ranking_date(a).cmp_chronological(&ranking_date(b));
    by_date.then_with(|| {
        a.series
            .title
            .to_lowercase()
            .cmp(&b.series.title.to_lowercase())
    })
}

/// Sort all tracked series for the report.
pub fn rank_all(mut tracked: Vec<TrackedSeries>) -> Vec<TrackedSeries> {
    tracked.sort_by(compare_tracked);
    tracked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::IndexScheme;
    use crate::types::Season;
    use chrono::NaiveDate;

    fn day(s: &str) -> AirDate {
        AirDate::Day(NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap())
    }

    fn series(title: &str, dates: &[AirDate]) -> Series {
        let scheme = IndexScheme::default();
        let episodes = dates
            .iter()
            .enumerate()
            .map(|(i, date)| Episode::new(1, i as u32 + 1, format!("Ep {}", i + 1), *date, scheme))
            .collect();
        Series {
            url: format!("https://en.wikipedia.org/wiki/{}", title),
            title: title.to_string(),
            seasons: vec![Season {
                number: 1,
                episodes,
            }],
        }
    }

    fn filter(raw: &str) -> SeriesFilter {
        SeriesFilter::parse(raw, IndexScheme::default()).unwrap()
    }

    #[test]
    fn test_select_next_after_watched_range() {
        let show = series(
            "Show",
            &[day("2015-01-01"), day("2015-01-08"), day("2015-01-15")],
        );
        let next = select_next(&show, &filter("S01E01-S01E01")).unwrap();
        assert_eq!(next.episode, 2);
        assert_eq!(next.air_date, day("2015-01-08"));
    }

    #[test]
    fn test_select_next_crosses_seasons() {
        let scheme = IndexScheme::default();
        let show = Series {
            url: String::new(),
            title: "Two Seasons".to_string(),
            seasons: vec![
                Season {
                    number: 1,
                    episodes: vec![Episode::new(1, 1, "a", AirDate::Unknown, scheme)],
                },
                Season {
                    number: 2,
                    episodes: vec![Episode::new(2, 1, "b", AirDate::Unknown, scheme)],
                },
            ],
        };
        let next = select_next(&show, &filter("-S01E01")).unwrap();
        assert_eq!((next.season, next.episode), (2, 1));
    }

    #[test]
    fn test_select_next_fully_watched() {
        let show = series("Show", &[day("2015-01-01"), day("2015-01-08")]);
        assert!(select_next(&show, &filter("S01E01-S01E02")).is_none());
    }

    #[test]
    fn test_select_next_empty_series() {
        let show = Series {
            url: String::new(),
            title: "Empty".to_string(),
            seasons: Vec::new(),
        };
        assert!(select_next(&show, &SeriesFilter::allow_all()).is_none());
    }

    #[test]
    fn test_allow_all_selects_first() {
        let show = series("Show", &[day("2015-01-01"), day("2015-01-08")]);
        assert_eq!(select_next(&show, &SeriesFilter::allow_all()).unwrap().episode, 1);
    }

    #[test]
    fn test_rank_known_date_before_unknown() {
        let a = track(series("A", &[AirDate::Unknown]), &SeriesFilter::allow_all());
        let b = track(series("B", &[day("2015-05-01")]), &SeriesFilter::allow_all());
        let ranked = rank_all(vec![a, b]);
        let titles: Vec<&str> = ranked.iter().map(|t| t.series.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[test]
    fn test_rank_by_date_then_title() {
        let same_day = day("2016-02-01");
        let entries = vec![
            track(series("zeta", &[same_day]), &SeriesFilter::allow_all()),
            track(series("Alpha", &[same_day]), &SeriesFilter::allow_all()),
            track(series("Early", &[day("2015-01-01")]), &SeriesFilter::allow_all()),
            track(series("Year", &[AirDate::Year(2016)]), &SeriesFilter::allow_all()),
            track(series("Done", &[day("2014-01-01")]), &filter("S01E01")),
            track(series("beta", &[AirDate::Unknown]), &SeriesFilter::allow_all()),
        ];
        let ranked = rank_all(entries);
        let titles: Vec<&str> = ranked.iter().map(|t| t.series.title.as_str()).collect();
        assert_eq!(titles, vec!["Early", "Alpha", "zeta", "Year", "beta", "Done"]);
    }

    #[test]
    fn test_rank_watched_and_unknown_tie_by_title() {
        let entries = vec![
            track(series("unknown", &[AirDate::Unknown]), &SeriesFilter::allow_all()),
            track(series("Finished", &[day("2014-01-01")]), &filter("S01E01")),
        ];
        let ranked = rank_all(entries);
        assert_eq!(ranked[0].series.title, "Finished");
        assert!(ranked[0].next.is_none());
    }

    #[test]
    fn test_rank_unknowns_tie_break_by_title() {
        let entries = vec![
            track(series("Mango", &[AirDate::Unknown]), &SeriesFilter::allow_all()),
            track(series("apple", &[AirDate::Unknown]), &SeriesFilter::allow_all()),
        ];
        let ranked = rank_all(entries);
        assert_eq!(ranked[0].series.title, "apple");
        assert_eq!(ranked[1].series.title, "Mango");
    }
}
