//! Episode extraction for wiki pages
//!
//! This module turns an episode-list page into seasons of episodes:
//! - `layout`: extraction parameters read from a format definition
//! - `table`: heuristics for finding and reading an episode table
//! - `wiki`: season discovery through the table of contents

pub mod layout;
pub mod table;
pub mod wiki;

pub use layout::{ExtractionPlan, WikiLayout, DEFAULT_TABLE_LOOKAHEAD};
pub use table::{normalize_text, Columns};
pub use wiki::{extract_seasons, parse_series};
