//! Extraction parameters resolved from a format definition

use std::collections::BTreeSet;

use crate::config::HintSet;
use crate::date::DateParser;
use crate::error::{Result, TrackerError};
use crate::filter::IndexScheme;
use crate::format::{
    FormatDefinition, KEY_COL_AIR_DATE, KEY_COL_TITLE, KEY_DATE_FORMAT, KEY_EPISODES_LINK,
    KEY_LOOKAHEAD, KEY_ROW_CLASS, KEY_TOC_ID, KEY_TYPE, TYPE_WIKI,
};

/// Sibling elements scanned after a heading when the format sets no lookahead.
pub const DEFAULT_TABLE_LOOKAHEAD: usize = 3;

/// Where episode tables live on a page and how to read them.
#[derive(Debug, Clone)]
pub struct WikiLayout {
    /// Id of the table-of-contents container
    pub toc_id: String,
    /// Href of the TOC entry for the episode list (e.g. `#Episodes`)
    pub episodes_link: String,
    /// Only rows with this class hold episode data
    pub row_class: Option<String>,
    /// Fixed 1-based title column, otherwise found via hints
    pub title_column: Option<usize>,
    /// Fixed 1-based air date column, otherwise found via hints
    pub air_date_column: Option<usize>,
    pub date_parser: DateParser,
    pub lookahead: usize,
}

impl WikiLayout {
    /// Read the layout keys from a resolved definition.
    ///
    /// # Errors
    /// Returns `TrackerError::Config` for a non-wiki type, missing required
    /// keys or values of the wrong type.
    pub fn from_definition(def: &FormatDefinition) -> Result<Self> {
        let kind = def.get_str(KEY_TYPE)?;
        if kind != TYPE_WIKI {
            return Err(TrackerError::Config(format!(
                "Unknown type [{}] in definition [{}]",
                kind,
                def.id()
            )));
        }

        Ok(Self {
            toc_id: def.get_str(KEY_TOC_ID)?.to_string(),
            episodes_link: def.get_str(KEY_EPISODES_LINK)?.to_string(),
            row_class: def.get_optional_str(KEY_ROW_CLASS)?.map(str::to_string),
            title_column: def.get_optional_usize(KEY_COL_TITLE)?,
            air_date_column: def.get_optional_usize(KEY_COL_AIR_DATE)?,
            date_parser: DateParser::new(&def.get_optional_strings(KEY_DATE_FORMAT)?),
            lookahead: def
                .get_optional_usize(KEY_LOOKAHEAD)?
                .unwrap_or(DEFAULT_TABLE_LOOKAHEAD),
        })
    }
}

/// Everything the extractor needs for one series.
#[derive(Debug, Clone)]
pub struct ExtractionPlan {
    pub title: String,
    pub url: String,
    pub layout: WikiLayout,
    /// Header keywords per column category
    pub hints: HintSet,
    /// 1-based TOC positions to ignore
    pub season_skip: BTreeSet<u32>,
    pub scheme: IndexScheme,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn definition(value: Value) -> FormatDefinition {
        let entries: Map<String, Value> = value.as_object().cloned().unwrap();
        FormatDefinition::builder("test", entries).build()
    }

    #[test]
    fn test_layout_from_definition() {
        let def = definition(json!({
            "type": "wiki",
            "toc.id": "toc",
            "episodes.link": "#Episodes",
            "table.row.class": "vevent",
            "table.col.title": 3,
            "air.date.format": "%d.%m.%Y"
        }));
        let layout = WikiLayout::from_definition(&def).unwrap();
        assert_eq!(layout.toc_id, "toc");
        assert_eq!(layout.episodes_link, "#Episodes");
        assert_eq!(layout.row_class.as_deref(), Some("vevent"));
        assert_eq!(layout.title_column, Some(3));
        assert_eq!(layout.air_date_column, None);
        assert_eq!(layout.lookahead, DEFAULT_TABLE_LOOKAHEAD);
    }

    #[test]
    fn test_layout_rejects_unknown_type() {
        let def = definition(json!({
            "type": "imdb",
            "toc.id": "toc",
            "episodes.link": "#Episodes"
        }));
        let err = WikiLayout::from_definition(&def).unwrap_err();
        assert!(err.to_string().contains("Unknown type [imdb]"));
    }

    #[test]
    fn test_layout_requires_toc_id() {
        let def = definition(json!({ "type": "wiki", "episodes.link": "#Episodes" }));
        let err = WikiLayout::from_definition(&def).unwrap_err();
        assert!(err.to_string().contains("[toc.id]"));
    }

    #[test]
    fn test_layout_custom_lookahead() {
        let def = definition(json!({
            "type": "wiki",
            "toc.id": "toc",
            "episodes.link": "#Episodes",
            "table.lookahead": 5
        }));
        assert_eq!(WikiLayout::from_definition(&def).unwrap().lookahead, 5);
    }
}
