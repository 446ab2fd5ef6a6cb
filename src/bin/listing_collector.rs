use anyhow::Result;
use boligfinder::browser::BrowserSession;
use boligfinder::collector::{self, CollectorOptions};
use boligfinder::storage;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Collect sold-property listings from boligsiden.dk")]
struct Args {
    /// Search-results URL to page through
    #[clap(short, long, default_value = collector::DEFAULT_SEARCH_URL)]
    url: String,

    /// Path to the intermediate CSV
    #[clap(short, long, default_value = "data/listings.csv")]
    output: String,

    /// Maximum number of result pages to visit
    #[clap(short, long, default_value = "5")]
    max_pages: usize,

    /// Directory for failure screenshots and HTML snapshots
    #[clap(long, default_value = "debug_artifacts")]
    artifacts_dir: PathBuf,

    /// Seconds to wait for listing cards to render on each page
    #[clap(long, default_value = "10")]
    page_timeout: u64,

    /// Enable debug output
    #[clap(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();
    boligfinder::init_tracing(args.debug);

    let session = BrowserSession::launch()?;
    let options = CollectorOptions {
        search_url: args.url,
        max_pages: args.max_pages,
        artifacts_dir: args.artifacts_dir,
        page_timeout: Duration::from_secs(args.page_timeout),
    };

    let records = collector::collect_listings(&session, &options)?;
    storage::save_listings(&records, &args.output)?;

    info!(count = records.len(), output = %args.output, "collection run complete");
    Ok(())
}
