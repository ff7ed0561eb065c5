//! Air date normalization
//!
//! Wiki episode tables write air dates in many shapes: ISO fragments hidden in
//! parentheses, prose dates, bare years. This module turns those strings into an
//! [`AirDate`] of day, month or year precision and defines a total order over
//! them where unknown dates sort last.
//!
//! Coarse dates compare at the END of their period: a month is its last day and
//! a year is December 31st.

use std::cmp::Ordering;
use std::sync::OnceLock;

use chrono::{Datelike, NaiveDate};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Day precision patterns tried in order when the format gives none.
pub const DEFAULT_DAY_FORMATS: &[&str] = &["%Y-%m-%d", "%B %d, %Y", "%d %B %Y"];

/// Month precision patterns, tried after every day pattern failed.
const MONTH_FORMATS: &[&str] = &["%Y-%m", "%B %Y"];

/// Anything shorter than this is a fragment like "TBA" or "—".
const MIN_DATE_LEN: usize = 4;

/// Air date of an episode at whatever precision the page provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "precision", content = "value", rename_all = "lowercase")]
pub enum AirDate {
    /// Exact day
    Day(NaiveDate),
    /// Year and month (1-12)
    Month { year: i32, month: u32 },
    /// Year only
    Year(i32),
    /// Not aired yet or not parseable
    Unknown,
}

impl AirDate {
    /// Calendar day used for comparisons; `None` for unknown dates.
    pub fn calendar_point(&self) -> Option<NaiveDate> {
        match *self {
            AirDate::Day(date) => Some(date),
            AirDate::Month { year, month } => last_day_of_month(year, month),
            AirDate::Year(year) => NaiveDate::from_ymd_opt(year, 12, 31),
            AirDate::Unknown => None,
        }
    }

    /// Chronological order; unknown dates sort after every known date and
    /// equal to each other.
    pub fn cmp_chronological(&self, other: &AirDate) -> Ordering {
        match (self.calendar_point(), other.calendar_point()) {
            (Some(a), Some(b)) => a.cmp(&b),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }
    }

    pub fn is_known(&self) -> bool {
        self.calendar_point().is_some()
    }
}

fn last_day_of_month(year: i32, month: u32) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    first_of_next.pred_opt()
}

/// Raised when no configured pattern accepts an input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unable to parse date [{input}]: {reason}")]
pub struct DateParseError {
    pub input: String,
    pub reason: String,
}

/// Parses raw air date strings with a list of `chrono` strftime patterns.
#[derive(Debug, Clone)]
pub struct DateParser {
    day_formats: Vec<String>,
}

impl Default for DateParser {
    fn default() -> Self {
        Self {
            day_formats: DEFAULT_DAY_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

impl DateParser {
    /// Create a parser that tries `formats` in order.
    ///
    /// An empty list falls back to [`DEFAULT_DAY_FORMATS`].
    pub fn new(formats: &[String]) -> Self {
        if formats.is_empty() {
            return Self::default();
        }
        Self {
            day_formats: formats.to_vec(),
        }
    }

    /// Parse `raw`, logging and returning [`AirDate::Unknown`] on failure.
    pub fn parse(&self, raw: &str) -> AirDate {
        match self.try_parse(raw) {
            Ok(date) => date,
            Err(err) => {
                warn!(input = %err.input, reason = %err.reason, "unparsable air date");
                AirDate::Unknown
            }
        }
    }

    /// Parse `raw`, returning the last pattern error if nothing matched.
    ///
    /// Inputs shorter than four characters are `Ok(AirDate::Unknown)`.
    ///
    /// # Examples
    /// ```
    /// use chrono::NaiveDate;
    /// use wikitrack_core::date::{AirDate, DateParser};
    ///
    /// let parser = DateParser::default();
    /// assert_eq!(
    ///     parser.try_parse("2015-03-02"),
    ///     Ok(AirDate::Day(NaiveDate::from_ymd_opt(2015, 3, 2).unwrap()))
    /// );
    /// assert_eq!(parser.try_parse("2016"), Ok(AirDate::Year(2016)));
    /// assert_eq!(parser.try_parse("TBA"), Ok(AirDate::Unknown));
    /// ```
    pub fn try_parse(&self, raw: &str) -> std::result::Result<AirDate, DateParseError> {
        let raw = raw.trim();
        if raw.chars().count() < MIN_DATE_LEN {
            return Ok(AirDate::Unknown);
        }

        let mut last_error = None;
        for format in &self.day_formats {
            match NaiveDate::parse_from_str(raw, format) {
                Ok(date) => return Ok(AirDate::Day(date)),
                Err(err) => last_error = Some(format!("{} (pattern [{}])", err, format)),
            }
        }

        for format in MONTH_FORMATS {
            let padded = format!("{} 1", raw);
            let pattern = format!("{} %d", format);
            if let Ok(date) = NaiveDate::parse_from_str(&padded, &pattern) {
                return Ok(AirDate::Month {
                    year: date.year(),
                    month: date.month(),
                });
            }
        }

        if raw.len() == 4 && raw.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(year) = raw.parse::<i32>() {
                return Ok(AirDate::Year(year));
            }
        }

        Err(DateParseError {
            input: raw.to_string(),
            reason: last_error.unwrap_or_else(|| "no date pattern configured".to_string()),
        })
    }
}

/// Return the text inside the first pair of parentheses, or `raw` itself.
///
/// Wiki tables write the machine readable date in a hidden parenthetical after
/// the prose date, e.g. `January 5, 2015 (2015-01-05)`.
///
/// # Examples
/// ```
/// use wikitrack_core::date::extract_date_fragment;
///
/// assert_eq!(extract_date_fragment("January 5, 2015 (2015-01-05)"), "2015-01-05");
/// assert_eq!(extract_date_fragment("2015"), "2015");
/// ```
pub fn extract_date_fragment(raw: &str) -> &str {
    static IN_PARENS: OnceLock<Regex> = OnceLock::new();
    let re = IN_PARENS.get_or_init(|| Regex::new(r"\((.+?)\)").expect("valid regex"));

    re.captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> AirDate {
        AirDate::Day(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_parse_iso_day() {
        let parser = DateParser::default();
        assert_eq!(parser.parse("2015-03-02"), day(2015, 3, 2));
        assert_eq!(parser.parse("2015-3-02"), day(2015, 3, 2));
    }

    #[test]
    fn test_parse_prose_day() {
        let parser = DateParser::default();
        assert_eq!(parser.parse("January 5, 2015"), day(2015, 1, 5));
        assert_eq!(parser.parse("5 January 2015"), day(2015, 1, 5));
    }

    #[test]
    fn test_parse_month() {
        let parser = DateParser::default();
        assert_eq!(
            parser.parse("2015-07"),
            AirDate::Month {
                year: 2015,
                month: 7
            }
        );
        assert_eq!(
            parser.parse("March 2016"),
            AirDate::Month {
                year: 2016,
                month: 3
            }
        );
    }

    #[test]
    fn test_parse_year_only() {
        let parser = DateParser::default();
        assert_eq!(parser.parse("2016"), AirDate::Year(2016));
    }

    #[test]
    fn test_short_input_is_unknown_without_error() {
        let parser = DateParser::default();
        assert_eq!(parser.try_parse("TBA"), Ok(AirDate::Unknown));
        assert_eq!(parser.try_parse(""), Ok(AirDate::Unknown));
        assert_eq!(parser.try_parse(" 20 "), Ok(AirDate::Unknown));
    }

    #[test]
    fn test_unparsable_surfaces_last_error() {
        let parser = DateParser::default();
        let err = parser.try_parse("Unaired").unwrap_err();
        assert_eq!(err.input, "Unaired");
        assert!(err.reason.contains("%d %B %Y"));
        assert_eq!(parser.parse("Unaired"), AirDate::Unknown);
    }

    #[test]
    fn test_custom_formats_replace_defaults() {
        let parser = DateParser::new(&["%d.%m.%Y".to_string()]);
        assert_eq!(parser.parse("02.03.2015"), day(2015, 3, 2));
        assert_eq!(parser.parse("2015-03-02"), AirDate::Unknown);
        // year fallback still applies
        assert_eq!(parser.parse("2015"), AirDate::Year(2015));
    }

    #[test]
    fn test_empty_custom_formats_use_defaults() {
        let parser = DateParser::new(&[]);
        assert_eq!(parser.parse("2015-03-02"), day(2015, 3, 2));
    }

    #[test]
    fn test_day_sorts_before_later_year() {
        let a = day(2015, 3, 2);
        let b = AirDate::Year(2016);
        assert_eq!(a.cmp_chronological(&b), Ordering::Less);
        assert_eq!(b.cmp_chronological(&a), Ordering::Greater);
    }

    #[test]
    fn test_unknown_sorts_last() {
        let unknown = AirDate::Unknown;
        assert_eq!(unknown.cmp_chronological(&day(2015, 3, 2)), Ordering::Greater);
        assert_eq!(unknown.cmp_chronological(&AirDate::Year(2016)), Ordering::Greater);
        assert_eq!(AirDate::Year(2016).cmp_chronological(&unknown), Ordering::Less);
        assert_eq!(unknown.cmp_chronological(&AirDate::Unknown), Ordering::Equal);
    }

    #[test]
    fn test_coarse_dates_use_end_of_period() {
        assert_eq!(
            AirDate::Month {
                year: 2016,
                month: 2
            }
            .calendar_point(),
            NaiveDate::from_ymd_opt(2016, 2, 29)
        );
        assert_eq!(
            AirDate::Month {
                year: 2015,
                month: 12
            }
            .calendar_point(),
            NaiveDate::from_ymd_opt(2015, 12, 31)
        );
        assert_eq!(
            AirDate::Year(2015).calendar_point(),
            NaiveDate::from_ymd_opt(2015, 12, 31)
        );
        // a year equals its own last day
        assert_eq!(
            AirDate::Year(2015).cmp_chronological(&day(2015, 12, 31)),
            Ordering::Equal
        );
        assert_eq!(
            day(2015, 6, 1).cmp_chronological(&AirDate::Year(2015)),
            Ordering::Less
        );
    }

    #[test]
    fn test_extract_date_fragment() {
        assert_eq!(
            extract_date_fragment("January 5, 2015 (2015-01-05)"),
            "2015-01-05"
        );
        assert_eq!(extract_date_fragment("(2015-01-05) (2016-01-01)"), "2015-01-05");
        assert_eq!(extract_date_fragment("January 5, 2015"), "January 5, 2015");
        assert_eq!(extract_date_fragment("()"), "()");
    }

    #[test]
    fn test_air_date_serialization() {
        let json = serde_json::to_string(&day(2015, 1, 8)).unwrap();
        assert_eq!(json, r#"{"precision":"day","value":"2015-01-08"}"#);
        let json = serde_json::to_string(&AirDate::Year(2016)).unwrap();
        assert_eq!(json, r#"{"precision":"year","value":2016}"#);
        let json = serde_json::to_string(&AirDate::Unknown).unwrap();
        assert_eq!(json, r#"{"precision":"unknown"}"#);
    }
}
