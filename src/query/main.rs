//! Structured address query CLI.
//!
//! Loads the live dataset and the place index built by `ingest`, runs a
//! single address (or free-text) query, and prints the results.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use alder::config::Config;
use alder::dataset::load_pbf;
use alder::index::{PlaceStore, StoreOptions};
use alder::models::Place;
use alder::search::{AddressQuery, AddressResolver};

#[derive(Parser, Debug)]
#[command(name = "query")]
#[command(about = "Search addresses and places in an indexed OSM extract")]
struct Args {
    /// OSM PBF file backing the live dataset
    #[arg(short, long)]
    file: PathBuf,

    /// Place store directory (built by `ingest`)
    #[arg(short, long)]
    store: PathBuf,

    /// City name
    #[arg(long)]
    city: Option<String>,

    /// Street name
    #[arg(long)]
    street: Option<String>,

    /// House number
    #[arg(long)]
    house_number: Option<String>,

    /// Zip code
    #[arg(long)]
    zip: Option<String>,

    /// Country (accepted, currently not used for narrowing)
    #[arg(long)]
    country: Option<String>,

    /// Free-text name search instead of a structured address query
    #[arg(long, conflicts_with_all = ["city", "street", "house_number", "zip"])]
    name: Option<String>,

    /// Maximum number of results
    #[arg(long)]
    limit: Option<usize>,

    /// Optional TOML config
    #[arg(long)]
    config: Option<PathBuf>,

    /// Print results as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let args = Args::parse();

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

    let resolver = AddressResolver::new(&dataset, &store)
        .with_max_results(args.limit.unwrap_or(config.search.max_results));

    let results = match &args.name {
        Some(name) => resolver.find_named(name)?,
        None => resolver.find_address(&AddressQuery {
            house_number: args.house_number.clone(),
            street: args.street.clone(),
            city: args.city.clone(),
            zip: args.zip.clone(),
            country: args.country.clone(),
        })?,
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        if results.is_empty() {
            println!("no results");
        }
        for place in &results {
            println!("{}", format_place(place));
        }
    }

    store.shutdown()?;
    Ok(())
}

fn format_place(place: &Place) -> String {
    let pos = place.position();
    match place {
        Place::City(city) => match &city.parent_city {
            Some(parent) => format!("{} ({})  [{:.5}, {:.5}]", city.name, parent, pos.lat, pos.lon),
            None => format!("{}  [{:.5}, {:.5}]", city.name, pos.lat, pos.lon),
        },
        Place::Address(addr) => {
            let mut line = String::new();
            if let Some(number) = &addr.house_number {
                line.push_str(number);
                line.push(' ');
            }
            line.push_str(&addr.street);
            for part in [&addr.suburb, &addr.city, &addr.zip].into_iter().flatten() {
                line.push_str(", ");
                line.push_str(part);
            }
            format!("{line}  [{:.5}, {:.5}]", pos.lat, pos.lon)
        }
        Place::Way(way) => format!("{} (way {})  [{:.5}, {:.5}]", way.name, way.way_id, pos.lat, pos.lon),
        Place::Node(node) => {
            format!("{} (node {})  [{:.5}, {:.5}]", node.name, node.node_id, pos.lat, pos.lon)
        }
        Place::WayReference(r) => format!(
            "{} (way {}, node {})  [{:.5}, {:.5}]",
            r.name, r.way_id, r.node_id, pos.lat, pos.lon
        ),
    }
}
