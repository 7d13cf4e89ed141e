//! OSM place-index build pipeline.
//!
//! Loads an OSM PBF extract into memory, indexes every named
//! administrative place into the persistent place store, and flushes.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::ProgressBar;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use alder::config::Config;
use alder::dataset::load_pbf;
use alder::index::{PlaceCategory, PlaceIndexer, PlaceSizeEstimator, PlaceStore, StoreOptions};

#[derive(Parser, Debug)]
#[command(name = "ingest")]
#[command(about = "Build the place index from an OSM PBF file")]
struct Args {
    /// OSM PBF file to import
    #[arg(short, long)]
    file: PathBuf,

    /// Place store directory
    #[arg(short, long)]
    store: PathBuf,

    /// Optional TOML config (place sizes, store tuning)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

    info!("Alder Ingest Pipeline");
    info!("File: {}", args.file.display());

    let config = match &args.config {
        Some(path) => Config::load_from_file(path).context("Failed to load config")?,
        None => Config::default(),
    };

    let dataset = load_pbf(&args.file).context("Failed to load PBF file")?;

    let store = PlaceStore::open(
        &args.store,
        StoreOptions {
            flush_delay: config.store.flush_delay(),
        },
    )
    .context("Failed to open place store")?;

    let estimator = PlaceSizeEstimator::new(config.place_sizes.clone());
    let indexer = PlaceIndexer::new(&dataset, &store, estimator);

    let pb = ProgressBar::new_spinner();
    pb.set_message("indexing places");
    pb.enable_steady_tick(Duration::from_millis(100));
    let stats = indexer.index_dataset()?;
    pb.finish_and_clear();

    info!(
        indexed = stats.indexed,
        unnamed = stats.skipped_unnamed,
        excluded = stats.skipped_excluded,
        no_geometry = stats.skipped_geometry,
        "place indexing complete"
    );
    info!(
        cities = store.count(PlaceCategory::City),
        suburbs = store.count(PlaceCategory::Suburb),
        "index contents"
    );

    store.checkpoint()?;
    store.shutdown()?;

    info!("Done");
    Ok(())
}
