use anyhow::Result;
use boligfinder::{merge, storage};
use clap::Parser;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[clap(author, version, about = "Join the listing and detail datasets by id")]
struct Args {
    /// Path to the intermediate CSV produced by the listing collector
    #[clap(long, default_value = "data/listings.csv")]
    listings: String,

    /// Path to the final CSV produced by the detail enricher
    #[clap(long, default_value = "data/property_details.csv")]
    details: String,

    /// Path to the merged output CSV
    #[clap(short, long, default_value = "data/property_details_per_sale.csv")]
    output: String,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    boligfinder::init_tracing(args.debug);

    let listings = storage::load_listings(&args.listings)?;
    let details = storage::load_details(&args.details)?;

    let (merged, stats) = merge::merge_records(&listings, &details);
    merge::save_merged(&merged, &args.output)?;

    info!(
        listings = stats.listings,
        details = stats.details,
        merged = stats.merged,
        missing_details = stats.missing_details,
        "merge complete"
    );
    if stats.orphan_details > 0 {
        warn!(
            orphans = stats.orphan_details,
            "detail rows without a matching listing were ignored"
        );
    }

    Ok(())
}
