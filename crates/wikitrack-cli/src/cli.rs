use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use wikitrack_core::config::DEFAULT_BASE_URL;
use wikitrack_core::filter::DEFAULT_SEASON_MULTIPLIER;

#[derive(Parser)]
#[command(name = "wikitrack")]
#[command(
    author,
    version,
    about = "Track the next unwatched episode of TV series from wiki episode lists"
)]
pub struct Cli {
    /// Series list (formats, hints and series to track)
    #[arg(long, value_name = "FILE")]
    pub series_list: PathBuf,

    /// Watched episode ranges per series
    #[arg(long, value_name = "FILE")]
    pub watched_list: PathBuf,

    /// Write the report here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Page cache directory (defaults to the user cache directory)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output_format: OutputFormat,

    /// Use cached pages without asking the server
    #[arg(long)]
    pub offline: bool,

    /// Delete the page cache before the run
    #[arg(long)]
    pub purge_cache: bool,

    /// Multiplier of the unified episode index
    #[arg(long, default_value_t = DEFAULT_SEASON_MULTIPLIER)]
    pub season_multiplier: u32,

    /// Prefix for `page` entries of the series list
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned plain text
    Text,
    /// One JSON object per series
    Jsonl,
}
