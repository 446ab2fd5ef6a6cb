use crate::browser::BrowserSession;
use crate::models::ListingRecord;
use anyhow::Result;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const DEFAULT_SEARCH_URL: &str = "https://www.boligsiden.dk/landsdel/koebenhavns-omegn/solgte/alle?sortAscending=false&registrationTypes=auction&latestRegistrationType=auction";

const SITE_ROOT: &str = "https://www.boligsiden.dk";

/// Selector matching one listing card on a rendered results page.
const CARD_SELECTOR: &str = "div.shadow.overflow-hidden.mx-4";
const ADDRESS_SELECTOR: &str = "div.font-black.text-sm";

#[derive(Debug, Clone)]
pub struct CollectorOptions {
    pub search_url: String,
    pub max_pages: usize,
    pub artifacts_dir: PathBuf,
    pub page_timeout: Duration,
}

/// One listing card as parsed from the results page, before an id has been
/// assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct ListingCard {
    pub url: String,
    pub address: String,
    pub sale_type: String,
    pub sale_date: String,
    pub price: String,
}

/// Page through the search results and return one record per listing.
///
/// Pagination stops at the page limit, when a page renders zero cards, or
/// when no next-page control is present. A page that fails to load gets its
/// debug artifacts written and is skipped.
pub fn collect_listings(
    session: &BrowserSession,
    options: &CollectorOptions,
) -> Result<Vec<ListingRecord>> {
    let mut records = Vec::new();
    let mut seen_urls = HashSet::new();

    for page in 1..=options.max_pages {
        let url = page_url(&options.search_url, page);
        info!(page, url = %url, "loading results page");

        let html = match session.rendered_html(&url, CARD_SELECTOR, options.page_timeout) {
            Ok(html) => html,
            Err(e) => {
                warn!(page, error = %e, "page load failed, skipping");
                if let Err(e) =
                    session.save_failure_artifacts(&options.artifacts_dir, &format!("page_{}", page))
                {
                    warn!(error = %e, "could not save debug artifacts");
                }
                continue;
            }
        };

        let cards = parse_results_page(&html);
        if cards.is_empty() {
            info!(page, "no listings on page, stopping pagination");
            break;
        }

        let added = append_unique(cards, &mut seen_urls, &mut records);
        info!(page, added, total = records.len(), "extracted listings");

        if !has_next_page(&html) {
            info!(page, "no next-page control found, stopping pagination");
            break;
        }
    }

    Ok(records)
}

/// Extract every listing card from a rendered results page. Cards without a
/// link anchor are dropped; everything else degrades to empty strings.
pub fn parse_results_page(html: &str) -> Vec<ListingCard> {
    let document = Html::parse_document(html);
    let card_selector = Selector::parse(CARD_SELECTOR).unwrap();
    let link_selector = Selector::parse("a[href]").unwrap();
    let address_selector = Selector::parse(ADDRESS_SELECTOR).unwrap();
    let row_selector = Selector::parse("tr").unwrap();
    let cell_selector = Selector::parse("td").unwrap();

    let mut cards = Vec::new();
    for container in document.select(&card_selector) {
        let href = match container
            .select(&link_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        {
            Some(href) if !href.trim().is_empty() => href.trim().to_string(),
            _ => {
                debug!("skipping card without link anchor");
                continue;
            }
        };

        let address = container
            .select(&address_selector)
            .next()
            .map(|el| el.text().collect::<Vec<_>>().join(" ").trim().to_string())
            .unwrap_or_default();

        // The sale table lists registrations newest first; the first row
        // with cells carries the headline sale.
        let mut sale_type = String::new();
        let mut sale_date = String::new();
        let mut price = String::new();
        for row in container.select(&row_selector) {
            let cells: Vec<String> = row
                .select(&cell_selector)
                .map(|td| td.text().collect::<Vec<_>>().join(" ").trim().to_string())
                .collect();
            if cells.len() >= 4 {
                sale_type = cells[1].clone();
                sale_date = cells[2].clone();
                price = cells[3].clone();
                break;
            }
        }

        cards.push(ListingCard {
            url: absolute_url(&href),
            address,
            sale_type,
            sale_date,
            price,
        });
    }

    cards
}

/// Append cards to the collection, assigning ids as they are admitted.
/// Listings already seen on an earlier page are logged and skipped, first
/// occurrence wins. Returns how many records were added.
pub fn append_unique(
    cards: Vec<ListingCard>,
    seen_urls: &mut HashSet<String>,
    records: &mut Vec<ListingRecord>,
) -> usize {
    let mut added = 0;
    for card in cards {
        if !seen_urls.insert(card.url.clone()) {
            debug!(url = %card.url, "duplicate listing across pages, skipping");
            continue;
        }
        let id = listing_id(&card.url, records.len() + 1);
        records.push(ListingRecord {
            id,
            url: card.url,
            address: card.address,
            sale_type: card.sale_type,
            sale_date: card.sale_date,
            price: card.price,
        });
        added += 1;
    }
    added
}

/// Stable identifier for a listing: the last URL path segment when it is
/// usable as a token, otherwise a positional `p{n}`.
pub fn listing_id(url: &str, position: usize) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let segment = path.rsplit('/').find(|s| !s.is_empty()).unwrap_or("");
    if segment.len() >= 4
        && segment.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        segment.to_string()
    } else {
        format!("p{}", position)
    }
}

/// Whether the rendered page offers a way to the next results page.
pub fn has_next_page(html: &str) -> bool {
    let document = Html::parse_document(html);
    for selector_str in [
        "a[rel='next']",
        "a[aria-label*='næste']",
        "a[aria-label*='Next']",
        "button[aria-label*='næste']",
    ] {
        if let Ok(selector) = Selector::parse(selector_str) {
            if document.select(&selector).next().is_some() {
                return true;
            }
        }
    }
    false
}

/// Results page URL for a given page number; page 1 is the bare search URL.
pub fn page_url(search_url: &str, page: usize) -> String {
    if page == 1 {
        search_url.to_string()
    } else if search_url.contains('?') {
        format!("{}&page={}", search_url, page)
    } else {
        format!("{}?page={}", search_url, page)
    }
}

fn absolute_url(href: &str) -> String {
    if href.starts_with("http") {
        href.to_string()
    } else if href.starts_with('/') {
        format!("{}{}", SITE_ROOT, href)
    } else {
        format!("{}/{}", SITE_ROOT, href)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_PAGE: &str = r#"
        <html><body>
        <div class="shadow overflow-hidden mx-4">
            <a href="/adresse/hovedgaden-12-2800-kongens-lyngby-01234567">card</a>
            <div class="font-black text-sm">Hovedgaden 12, 2800 Kongens Lyngby</div>
            <table><tbody>
                <tr><td>1</td><td>Auktion</td><td>12-03-2024</td><td>2.450.000 kr.</td></tr>
                <tr><td>2</td><td>Alm. frit salg</td><td>04-06-2019</td><td>1.900.000 kr.</td></tr>
            </tbody></table>
        </div>
        <div class="shadow overflow-hidden mx-4">
            <a href="https://www.boligsiden.dk/adresse/strandvejen-4-2900-hellerup-89">card</a>
            <div class="font-black text-sm">Strandvejen 4, 2900 Hellerup</div>
            <table><tbody>
                <tr><td>1</td><td>Auktion</td><td>01-02-2024</td><td>5.100.000 kr.</td></tr>
            </tbody></table>
        </div>
        <a rel="next" href="?page=2">Næste</a>
        </body></html>
    "#;

    #[test]
    fn one_card_per_listing_with_absolute_urls() {
        let cards = parse_results_page(RESULTS_PAGE);
        assert_eq!(cards.len(), 2);
        for card in &cards {
            assert!(!card.url.is_empty());
            assert!(card.url.starts_with("https://www.boligsiden.dk/"));
        }
        assert_eq!(cards[0].address, "Hovedgaden 12, 2800 Kongens Lyngby");
        assert_eq!(cards[0].sale_type, "Auktion");
        assert_eq!(cards[0].sale_date, "12-03-2024");
        assert_eq!(cards[0].price, "2.450.000 kr.");
    }

    #[test]
    fn zero_listings_parse_to_empty_collection() {
        let cards = parse_results_page("<html><body><p>Ingen resultater</p></body></html>");
        assert!(cards.is_empty());
    }

    #[test]
    fn card_without_link_is_dropped() {
        let html = r#"<html><body>
            <div class="shadow overflow-hidden mx-4">
                <div class="font-black text-sm">Uden link 1</div>
            </div>
        </body></html>"#;
        assert!(parse_results_page(html).is_empty());
    }

    #[test]
    fn duplicates_across_pages_keep_first_occurrence() {
        let cards = parse_results_page(RESULTS_PAGE);
        let mut seen = HashSet::new();
        let mut records = Vec::new();

        let added = append_unique(cards.clone(), &mut seen, &mut records);
        assert_eq!(added, 2);

        // Same cards arriving from a later page are all skipped.
        let added = append_unique(cards, &mut seen, &mut records);
        assert_eq!(added, 0);
        assert_eq!(records.len(), 2);
    }

    #[test]
    fn ids_come_from_url_slug_with_positional_fallback() {
        assert_eq!(
            listing_id("https://www.boligsiden.dk/adresse/hovedgaden-12-01234567", 1),
            "hovedgaden-12-01234567"
        );
        assert_eq!(listing_id("https://www.boligsiden.dk/a?x=1", 3), "p3");
        assert_eq!(listing_id("https://www.boligsiden.dk/", 7), "p7");
    }

    #[test]
    fn next_page_control_detection() {
        assert!(has_next_page(RESULTS_PAGE));
        assert!(!has_next_page("<html><body><p>slut</p></body></html>"));
    }

    #[test]
    fn page_url_appends_page_parameter_after_first() {
        assert_eq!(page_url("https://x.dk/solgte", 1), "https://x.dk/solgte");
        assert_eq!(page_url("https://x.dk/solgte", 2), "https://x.dk/solgte?page=2");
        assert_eq!(page_url("https://x.dk/solgte?a=b", 3), "https://x.dk/solgte?a=b&page=3");
    }
}
