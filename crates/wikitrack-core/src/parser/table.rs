//! Episode table heuristics
//!
//! Small pure functions over the DOM: locate the table that belongs to a
//! section heading, pick its data rows and work out which columns hold the
//! title and the air date.

use std::collections::BTreeMap;

use scraper::{ElementRef, Selector};

use crate::config::HintSet;
use crate::error::{Result, TrackerError};
use crate::format::{KEY_COL_AIR_DATE, KEY_COL_TITLE};

use super::layout::WikiLayout;

/// 1-based column positions of the fields we read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    pub title: usize,
    pub air_date: usize,
}

/// Collapse every Unicode space (including `&nbsp;`) to one ASCII space and trim.
///
/// # Examples
/// ```
/// use wikitrack_core::parser::table::normalize_text;
///
/// assert_eq!(normalize_text("\u{a0} The\u{2009}Pilot \n"), "The Pilot");
/// ```
pub fn normalize_text(raw: &str) -> String {
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Normalized text content of an element.
pub fn element_text(element: &ElementRef) -> String {
    normalize_text(&element.text().collect::<String>())
}

/// Quote a value for use inside a CSS attribute selector.
pub(crate) fn css_string(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{}\"", escaped)
}

pub(crate) fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|err| TrackerError::ParseError(format!("Invalid selector [{}]: {:?}", css, err)))
}

fn is_tag(element: &ElementRef, name: &str) -> bool {
    element.value().name().eq_ignore_ascii_case(name)
}

fn is_heading(element: &ElementRef) -> bool {
    matches!(
        element.value().name().to_ascii_lowercase().as_str(),
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6"
    )
}

fn child_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.children().filter_map(ElementRef::wrap)
}

fn next_elements<'a>(element: ElementRef<'a>) -> impl Iterator<Item = ElementRef<'a>> {
    element.next_siblings().filter_map(ElementRef::wrap)
}

fn parent_element<'a>(element: ElementRef<'a>) -> Option<ElementRef<'a>> {
    element.parent().and_then(ElementRef::wrap)
}

/// The block whose following siblings hold a section's content.
///
/// Legacy pages put the anchor on a `span` inside the heading, current pages
/// put it on the heading itself and wrap that in `div.mw-heading`. Either
/// way the anchor's parent owns the section, unless the anchor is a bare
/// heading with no wrapper.
pub fn heading_for_anchor<'a>(anchor: ElementRef<'a>) -> Option<ElementRef<'a>> {
    let parent = parent_element(anchor)?;
    if is_heading(&anchor) && !parent.value().classes().any(|c| c == "mw-heading") {
        return Some(anchor);
    }
    Some(parent)
}

fn starts_section(element: &ElementRef) -> bool {
    is_heading(element) || element.value().classes().any(|c| c == "mw-heading")
}

/// First non-presentational `table` among the next `lookahead` siblings.
///
/// The scan stops early at the next section heading so a season without a
/// table never borrows the table of the following season.
pub fn find_next_table<'a>(heading: ElementRef<'a>, lookahead: usize) -> Option<ElementRef<'a>> {
    next_elements(heading)
        .take(lookahead)
        .take_while(|element| !starts_section(element))
        .find(|element| {
            is_tag(element, "table") && element.value().attr("role") != Some("presentation")
        })
}

/// Episode rows of a table.
///
/// With a row class only rows carrying it are returned, which drops the
/// synopsis rows interleaved with the data. Without one every row that has at
/// least one `td` cell is returned, so pure header rows are left out.
pub fn select_rows<'a>(
    table: ElementRef<'a>,
    row_class: Option<&str>,
) -> Result<Vec<ElementRef<'a>>> {
    match row_class {
        Some(class) => {
            let sel = selector(&format!("tr[class~={}]", css_string(class)))?;
            Ok(table.select(&sel).collect())
        }
        None => {
            let sel = selector("tr")?;
            Ok(table
                .select(&sel)
                .filter(|row| child_elements(*row).any(|cell| is_tag(&cell, "td")))
                .collect())
        }
    }
}

/// Header row for a set of data rows: the row right before the first one,
/// or else the first all-`th` row of the table.
pub fn header_row<'a>(table: ElementRef<'a>, first_row: ElementRef<'a>) -> Option<ElementRef<'a>> {
    if let Some(previous) = first_row.prev_siblings().find_map(ElementRef::wrap) {
        if is_tag(&previous, "tr") {
            return Some(previous);
        }
    }

    let sel = selector("tr").ok()?;
    table.select(&sel).find(|row| {
        let mut cells = child_elements(*row).peekable();
        cells.peek().is_some() && cells.all(|cell| is_tag(&cell, "th"))
    })
}

/// Match header cells against hint keywords.
///
/// Each category maps to the 1-based position of the last header cell whose
/// lower-cased text contains one of its keywords.
pub fn match_hints(header: ElementRef, hints: &HintSet) -> BTreeMap<String, usize> {
    let labels: Vec<String> = child_elements(header)
        .map(|cell| element_text(&cell).to_lowercase())
        .collect();

    let mut columns = BTreeMap::new();
    for (category, keywords) in hints {
        let position = labels.iter().rposition(|label| {
            keywords
                .iter()
                .any(|keyword| !keyword.is_empty() && label.contains(keyword.as_str()))
        });
        if let Some(position) = position {
            columns.insert(category.clone(), position + 1);
        }
    }
    columns
}

/// Title and air date columns, fixed by the layout or found via hints.
///
/// # Errors
/// Returns the name of the first category that could not be resolved.
pub fn resolve_columns(
    layout: &WikiLayout,
    hints: &HintSet,
    header: Option<ElementRef>,
) -> std::result::Result<Columns, &'static str> {
    let matched = match (layout.title_column, layout.air_date_column, header) {
        (Some(_), Some(_), _) | (_, _, None) => BTreeMap::new(),
        (_, _, Some(header)) => match_hints(header, hints),
    };

    let title = layout
        .title_column
        .or_else(|| matched.get(KEY_COL_TITLE).copied())
        .ok_or(KEY_COL_TITLE)?;
    let air_date = layout
        .air_date_column
        .or_else(|| matched.get(KEY_COL_AIR_DATE).copied())
        .ok_or(KEY_COL_AIR_DATE)?;

    Ok(Columns { title, air_date })
}

/// Normalized text of the 1-based `column` of `row`; empty if out of range.
pub fn cell_text(row: ElementRef, column: usize) -> String {
    column
        .checked_sub(1)
        .and_then(|index| child_elements(row).nth(index))
        .map(|cell| element_text(&cell))
        .unwrap_or_default()
}
