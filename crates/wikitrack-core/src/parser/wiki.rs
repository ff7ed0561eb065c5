//! Season discovery for wiki episode-list pages
//!
//! The table of contents tells us where the seasons are: the entry linking to
//! the episode section owns a sub-list with one link per season. Each season
//! link points at a heading, and the episode table follows that heading.

use scraper::{ElementRef, Html};
use tracing::{debug, warn};

use crate::date::extract_date_fragment;
use crate::error::{Result, TrackerError};
use crate::types::{Episode, Season, Series};

use super::layout::ExtractionPlan;
use super::table::{
    cell_text, css_string, find_next_table, header_row, heading_for_anchor, resolve_columns,
    select_rows, selector,
};

/// Parse a page into a [`Series`].
///
/// # Errors
/// Returns `TrackerError::NoSeasons` if no season yields any data.
pub fn parse_series(html: &str, plan: &ExtractionPlan) -> Result<Series> {
    let document = Html::parse_document(html);
    let seasons = extract_seasons(&document, plan)?;
    Ok(Series {
        url: plan.url.clone(),
        title: plan.title.clone(),
        seasons,
    })
}

/// Discover and extract every season of a parsed page.
///
/// # Errors
/// Returns `TrackerError::NoSeasons` if no season yields any data.
pub fn extract_seasons(document: &Html, plan: &ExtractionPlan) -> Result<Vec<Season>> {
    let layout = &plan.layout;
    let mut seasons = Vec::new();

    match find_toc_entry(document, &layout.toc_id, &layout.episodes_link)? {
        None => {
            debug!(series = %plan.title, "no TOC entry, trying the episodes anchor directly");
            seasons.extend(extract_season(document, &layout.episodes_link, 1, plan)?);
        }
        Some(entry) => {
            let links = season_links(entry);
            let mut skipped = 0;
            for (i, link) in links.iter().enumerate() {
                let position = i as u32 + 1;
                if plan.season_skip.contains(&position) {
                    skipped += 1;
                    continue;
                }
                seasons.extend(extract_season(document, link, position - skipped, plan)?);
            }

            if seasons.is_empty() {
                // single season pages link the TOC entry straight to the table
                let link = entry.value().attr("href").unwrap_or(layout.episodes_link.as_str());
                seasons.extend(extract_season(document, link, 1, plan)?);
            }
        }
    }

    if seasons.is_empty() {
        return Err(TrackerError::NoSeasons {
            title: plan.title.clone(),
            url: plan.url.clone(),
        });
    }
    Ok(seasons)
}

/// The `a[href=episodes_link]` inside the element with id `toc_id`.
fn find_toc_entry<'a>(
    document: &'a Html,
    toc_id: &str,
    episodes_link: &str,
) -> Result<Option<ElementRef<'a>>> {
    let query = format!(
        "[id={}] a[href={}]",
        css_string(toc_id),
        css_string(episodes_link)
    );
    let sel = selector(&query)?;
    Ok(document.select(&sel).next())
}

/// Hrefs of the sub-list items under a TOC entry, in document order.
fn season_links(entry: ElementRef) -> Vec<String> {
    let Some(item) = entry.parent().and_then(ElementRef::wrap) else {
        return Vec::new();
    };

    item.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| el.value().name() == "ul" || el.value().name() == "ol")
        .flat_map(|list| list.children().filter_map(ElementRef::wrap))
        .filter(|el| el.value().name() == "li")
        .filter_map(|li| {
            li.children()
                .filter_map(ElementRef::wrap)
                .find(|el| el.value().name() == "a")
                .and_then(|a| a.value().attr("href"))
                .map(str::to_string)
        })
        .collect()
}

/// Element that a fragment link (`#Season_1`) points to.
fn find_anchor<'a>(document: &'a Html, link: &str) -> Result<Option<ElementRef<'a>>> {
    let fragment = link.strip_prefix('#').unwrap_or(link);
    if fragment.is_empty() {
        return Ok(None);
    }
    let id = urlencoding::decode(fragment)
        .map(|id| id.into_owned())
        .unwrap_or_else(|_| fragment.to_string());

    let sel = selector(&format!("[id={}]", css_string(&id)))?;
    Ok(document.select(&sel).next())
}

/// Extract one season; `None` (logged) when its table cannot be read.
fn extract_season(
    document: &Html,
    link: &str,
    number: u32,
    plan: &ExtractionPlan,
) -> Result<Option<Season>> {
    let layout = &plan.layout;
    let title = plan.title.as_str();

    let Some(anchor) = find_anchor(document, link)? else {
        warn!(series = title, season = number, link, "no anchor found for season");
        return Ok(None);
    };

    let Some(table) = heading_for_anchor(anchor).and_then(|h| find_next_table(h, layout.lookahead))
    else {
        warn!(series = title, season = number, link, "no episode table found for season");
        return Ok(None);
    };

    let rows = select_rows(table, layout.row_class.as_deref())?;
    let Some(first) = rows.first().copied() else {
        warn!(series = title, season = number, link, "episode table has no data rows");
        return Ok(None);
    };

    let columns = match resolve_columns(layout, &plan.hints, header_row(table, first)) {
        Ok(columns) => columns,
        Err(category) => {
            warn!(series = title, season = number, category, "no column matches hints");
            return Ok(None);
        }
    };

    let episodes = rows
        .iter()
        .zip(1u32..)
        .map(|(row, episode)| {
            let name = cell_text(*row, columns.title);
            let raw_date = cell_text(*row, columns.air_date);
            let air_date = layout.date_parser.parse(extract_date_fragment(&raw_date));
            Episode::new(number, episode, name, air_date, plan.scheme)
        })
        .collect::<Vec<_>>();

    debug!(series = title, season = number, episodes = episodes.len(), "season extracted");
    Ok(Some(Season { number, episodes }))
}
