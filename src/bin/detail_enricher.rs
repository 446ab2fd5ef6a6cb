use anyhow::Result;
use boligfinder::enricher::{self, EnricherOptions};
use boligfinder::storage;
use clap::Parser;
use tracing::info;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Enrich collected listings with detail-page data")]
struct Args {
    /// Path to the intermediate CSV produced by the listing collector
    #[clap(long, default_value = "data/listings.csv")]
    input: String,

    /// Path to the final CSV
    #[clap(short, long, default_value = "data/property_details.csv")]
    output: String,

    /// Lower bound of the randomized inter-request delay, in milliseconds
    #[clap(long, default_value = "1000")]
    min_delay_ms: u64,

    /// Upper bound of the randomized inter-request delay, in milliseconds
    #[clap(long, default_value = "3000")]
    max_delay_ms: u64,

    /// Maximum number of rows to process (if not set, process all rows)
    #[clap(short = 'i', long)]
    max_items: Option<usize>,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    boligfinder::init_tracing(args.debug);

    let listings = storage::load_listings(&args.input)?;
    if listings.is_empty() {
        info!("no listings to enrich");
        return Ok(());
    }

    let client = enricher::build_client()?;
    let options = EnricherOptions {
        min_delay_ms: args.min_delay_ms,
        max_delay_ms: args.max_delay_ms,
        max_items: args.max_items,
    };

    let records = enricher::enrich_all(&client, &listings, &options);
    storage::save_details(&records, &args.output)?;

    info!(count = records.len(), output = %args.output, "enrichment run complete");
    Ok(())
}
