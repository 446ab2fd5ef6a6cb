use crate::extract::{self, FieldRule};
use crate::models::{DetailRecord, ListingRecord};
use anyhow::{Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use reqwest::blocking::Client;
use scraper::{Html, Selector};
use std::time::Duration;
use tracing::{info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/96.0.4664.110 Safari/537.36";

const SITE_ROOT: &str = "https://www.boligsiden.dk";

#[derive(Debug, Clone)]
pub struct EnricherOptions {
    pub min_delay_ms: u64,
    pub max_delay_ms: u64,
    pub max_items: Option<usize>,
}

impl Default for EnricherOptions {
    fn default() -> Self {
        Self {
            min_delay_ms: 1000,
            max_delay_ms: 3000,
            max_items: None,
        }
    }
}

/// HTTP client for the whole run: fixed desktop UA, bounded timeout. Owned by
/// the caller so connections are released when the run ends.
pub fn build_client() -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(Duration::from_secs(30))
        .build()
        .context("Failed to build HTTP client")
}

/// Fetch and extract a detail record for every input row.
///
/// A failed request is logged and emitted with all detail fields defaulted,
/// keeping one output row per input row. Rows with an empty url are the one
/// exception; they cannot be fetched and are skipped outright.
pub fn enrich_all(
    client: &Client,
    listings: &[ListingRecord],
    options: &EnricherOptions,
) -> Vec<DetailRecord> {
    let rules = extract::detail_rules();
    let limit = options.max_items.unwrap_or(listings.len()).min(listings.len());

    let bar = ProgressBar::new(limit as u64);
    bar.set_style(
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} eta {eta}")
            .expect("progress template is valid"),
    );

    let mut records = Vec::new();
    for listing in listings {
        if records.len() >= limit {
            info!(limit, "reached item limit, stopping");
            break;
        }

        if listing.url.trim().is_empty() {
            warn!(id = %listing.id, "row has no url, skipping");
            continue;
        }

        sleep_between_requests(options);

        let url = absolute_url(&listing.url);
        let scrape_date = chrono::Local::now().format("%Y-%m-%d").to_string();
        let record = match fetch_page(client, &url) {
            Ok(body) => extract_detail(&listing.id, &url, &scrape_date, &body, &rules),
            Err(e) => {
                warn!(id = %listing.id, url = %url, error = %e, "fetch failed, emitting defaults");
                DetailRecord::empty(&listing.id, &url, &scrape_date)
            }
        };
        records.push(record);
        bar.inc(1);
    }
    bar.finish_and_clear();

    records
}

fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let response = client
        .get(url)
        .send()
        .with_context(|| format!("Failed to fetch {}", url))?
        .error_for_status()
        .context("Server returned an error status")?;
    response.text().context("Failed to read response body")
}

/// Pure extraction over a fetched page body. Re-running this on the same
/// body yields the same record, only `scrape_date` varies between runs.
pub fn extract_detail(
    id: &str,
    url: &str,
    scrape_date: &str,
    body: &str,
    rules: &[FieldRule],
) -> DetailRecord {
    let document = Html::parse_document(body);
    let mut record = DetailRecord::empty(id, url, scrape_date);

    if let Some(address_text) = heading_address(&document) {
        let parts = extract::parse_address(&address_text);
        record.street = parts.street;
        record.postal_code = parts.postal_code;
        record.city = parts.city;
    }

    extract::apply_rules(&document, rules, &mut record);
    record
}

/// The page heading carries the address split over spans; joined they read
/// "Hovedgaden 12 2800 Kongens Lyngby".
fn heading_address(document: &Html) -> Option<String> {
    for selector_str in ["h1.text-blue-900", "h1"] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if let Some(element) = document.select(&selector).next() {
                let text = element
                    .text()
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                if !text.is_empty() {
                    return Some(text);
                }
            }
        }
    }
    None
}

fn sleep_between_requests(options: &EnricherOptions) {
    let (min, max) = (
        options.min_delay_ms.min(options.max_delay_ms),
        options.min_delay_ms.max(options.max_delay_ms),
    );
    let delay = if min == max {
        min
    } else {
        rand::thread_rng().gen_range(min..=max)
    };
    std::thread::sleep(Duration::from_millis(delay));
}

fn absolute_url(url: &str) -> String {
    if url.starts_with("http") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{}{}", SITE_ROOT, url)
    } else {
        format!("{}/{}", SITE_ROOT, url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MISSING;

    const DETAIL_PAGE: &str = r#"
        <html><body>
        <h1 class="text-blue-900"><span class="text-lg">Hovedgaden 12</span><span class="block">2800 Kongens Lyngby</span></h1>
        <h2 class="text-blue-900">2.450.000 kr.</h2>
        <span class="text-gray-700">Villa</span>
        <span class="living-area">95 m²</span>
        <div id="oversigt">
            Opførelsesår: 1962 Energimærke: C Antal værelser: 4
        </div>
        </body></html>
    "#;

    #[test]
    fn detail_record_carries_input_id_and_extracted_fields() {
        let rules = extract::detail_rules();
        let record = extract_detail("p1", "https://site/listing/1", "2025-01-01", DETAIL_PAGE, &rules);
        assert_eq!(record.id, "p1");
        assert_eq!(record.url, "https://site/listing/1");
        assert_eq!(record.street, "Hovedgaden 12");
        assert_eq!(record.postal_code, "2800");
        assert_eq!(record.city, "Kongens Lyngby");
        assert_eq!(record.price, "2450000");
        assert_eq!(record.property_type, "Villa");
        assert_eq!(record.living_area, "95");
        assert_eq!(record.built_year, "1962");
        assert_eq!(record.energy_label, "C");
        assert_eq!(record.rooms, "4");
    }

    #[test]
    fn page_without_targets_yields_defaults_not_errors() {
        let rules = extract::detail_rules();
        let record = extract_detail("p2", "u", "d", "<html><body></body></html>", &rules);
        assert_eq!(record.id, "p2");
        assert_eq!(record.street, MISSING);
        assert_eq!(record.price, MISSING);
        assert_eq!(record.living_area, MISSING);
    }

    #[test]
    fn extraction_is_idempotent_over_the_same_body() {
        let rules = extract::detail_rules();
        let first = extract_detail("p1", "u", "2025-01-01", DETAIL_PAGE, &rules);
        let second = extract_detail("p1", "u", "2025-01-01", DETAIL_PAGE, &rules);
        assert_eq!(first, second);
    }

    #[test]
    fn relative_urls_are_anchored_to_the_site() {
        assert_eq!(
            absolute_url("/adresse/x-12"),
            "https://www.boligsiden.dk/adresse/x-12"
        );
        assert_eq!(absolute_url("adresse/x-12"), "https://www.boligsiden.dk/adresse/x-12");
        assert_eq!(absolute_url("https://a.dk/b"), "https://a.dk/b");
    }
}
