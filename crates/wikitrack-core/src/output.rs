//! Report writers
//!
//! The tracker hands each ranked series to a [`Formatter`] together with its
//! watched filter, so a formatter can render the whole remaining list and not
//! only the next episode.

use std::io::Write;

use chrono::NaiveDate;
use serde::Serialize;

use crate::date::AirDate;
use crate::error::Result;
use crate::filter::SeriesFilter;
use crate::ranking::select_next;
use crate::types::{Episode, Series};

/// Rendering of a date the page does not give.
pub const UNKNOWN_DATE: &str = "?? ??? ????";

/// Width of the title column in the text report.
const TITLE_WIDTH: usize = 30;

/// Indentation of continuation lines: ". " plus the title column.
const CONTINUATION_INDENT: usize = TITLE_WIDTH + 2;

/// Space between episode code and date.
const CODE_GAP: usize = 8;

/// Writes one ranked series at a time.
pub trait Formatter {
    /// Render `series`; called once per ranked entry in rank order.
    fn write(&mut self, series: &Series, filter: &SeriesFilter) -> Result<()>;

    /// Flush buffered output after the last entry.
    fn finish(&mut self) -> Result<()>;
}

/// Render an air date for the text report, e.g. `03 Feb 2015` or `?? Feb 2015`.
pub fn display_date(date: &AirDate) -> String {
    match *date {
        AirDate::Day(day) => day.format("%d %b %Y").to_string(),
        AirDate::Month { year, month } => match NaiveDate::from_ymd_opt(year, month, 1) {
            Some(first) => first.format("?? %b %Y").to_string(),
            None => UNKNOWN_DATE.to_string(),
        },
        AirDate::Year(year) => format!("?? ??? {:04}", year),
        AirDate::Unknown => UNKNOWN_DATE.to_string(),
    }
}

fn episode_code(season: u32, episode: u32) -> String {
    format!("S{:02}E{:02}", season, episode)
}

/// Plain text report, one block per series:
///
/// ```text
/// . https://en.wikipedia.org/wiki/List_of_Show_episodes
/// . Show                          S01E02        08 Jan 2015
///                                 S01E03        15 Jan 2015
/// ```
pub struct TextFormatter<W: Write> {
    writer: W,
}

impl<W: Write> TextFormatter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_episode_line(&mut self, code: &str, date: &str) -> Result<()> {
        writeln!(self.writer, "{}{:gap$}{}", code, "", date, gap = CODE_GAP)?;
        Ok(())
    }
}

impl<W: Write> Formatter for TextFormatter<W> {
    fn write(&mut self, series: &Series, filter: &SeriesFilter) -> Result<()> {
        writeln!(self.writer, ". {}", series.url)?;
        write!(self.writer, ". {:<width$}", series.title, width = TITLE_WIDTH)?;

        let mut written = false;
        for episode in series.episodes().filter(|episode| filter.allow(episode)) {
            if written {
                write!(self.writer, "{:indent$}", "", indent = CONTINUATION_INDENT)?;
            }
            written = true;
            self.write_episode_line(&episode.code(), &display_date(&episode.air_date))?;
        }

        if !written {
            // Fully watched: point at the first episode of the season to come.
            let upcoming = series.seasons.len() as u32 + 1;
            self.write_episode_line(&episode_code(upcoming, 1), UNKNOWN_DATE)?;
        }

        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    title: &'a str,
    url: &'a str,
    next: Option<&'a Episode>,
    remaining: usize,
}

/// One JSON object per line: title, url, next episode and number of
/// episodes left to watch.
pub struct JsonLinesFormatter<W: Write> {
    writer: W,
}

impl<W: Write> JsonLinesFormatter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> Formatter for JsonLinesFormatter<W> {
    fn write(&mut self, series: &Series, filter: &SeriesFilter) -> Result<()> {
        let line = JsonLine {
            title: &series.title,
            url: &series.url,
            next: select_next(series, filter),
            remaining: series
                .episodes()
                .filter(|episode| filter.allow(episode))
                .count(),
        };
        serde_json::to_writer(&mut self.writer, &line)?;
        writeln!(self.writer)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
}
