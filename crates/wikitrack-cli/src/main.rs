mod cli;

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, OutputFormat};
use wikitrack_core::{
    purge_cache, Formatter, JsonLinesFormatter, SeriesList, SeriesTracker, TextFormatter,
    TrackerConfig, WatchedList, WikiClient,
};

/// Cache directory used when none is given on the command line.
fn default_cache_dir() -> PathBuf {
    directories::ProjectDirs::from("org", "wikitrack", "wikitrack")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("cache"))
}

fn report_sink(output: Option<&PathBuf>) -> Result<Box<dyn Write>> {
    match output {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("Cannot create output file {}", path.display()))?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(BufWriter::new(io::stdout().lock()))),
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = TrackerConfig {
        base_url: cli.base_url.clone(),
        season_multiplier: cli.season_multiplier,
        cache_dir: cli.cache_dir.clone().unwrap_or_else(default_cache_dir),
        offline: cli.offline,
        ..TrackerConfig::default()
    };

    if cli.purge_cache {
        purge_cache(&config.cache_dir)
            .await
            .with_context(|| format!("Cannot purge cache {}", config.cache_dir.display()))?;
    }

    let series = SeriesList::load(&cli.series_list)?;
    let watched = WatchedList::load(&cli.watched_list)?;
    tracing::info!(
        series = series.series.len(),
        watched = watched.watched.len(),
        cache = %config.cache_dir.display(),
        "Configuration loaded"
    );

    let client = WikiClient::with_config((&config).into())?;
    let tracker = SeriesTracker::new(client, &series, &watched, &config)?;
    let ranked = tracker.track().await?;

    let sink = report_sink(cli.output.as_ref())?;
    let mut formatter: Box<dyn Formatter> = match cli.output_format {
        OutputFormat::Text => Box::new(TextFormatter::new(sink)),
        OutputFormat::Jsonl => Box::new(JsonLinesFormatter::new(sink)),
    };
    tracker.write_report(&ranked, formatter.as_mut())?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "wikitrack=debug,wikitrack_core=debug".to_string()
        } else {
            "wikitrack=info,wikitrack_core=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        tracing::error!("{:#}", err);
        std::process::exit(1);
    }
}
