// End-to-end run over canned HTML: results page -> intermediate CSV ->
// extraction -> final CSV -> merged dataset, checking the id join holds.

use boligfinder::{collector, enricher, extract, merge, storage};
use std::collections::HashSet;

const RESULTS_PAGE: &str = r#"
    <html><body>
    <div class="shadow overflow-hidden mx-4">
        <a href="/adresse/hovedgaden-12-2800-kongens-lyngby-01234567">card</a>
        <div class="font-black text-sm">Hovedgaden 12, 2800 Kongens Lyngby</div>
        <table><tbody>
            <tr><td>1</td><td>Auktion</td><td>12-03-2024</td><td>2.450.000 kr.</td></tr>
        </tbody></table>
    </div>
    <div class="shadow overflow-hidden mx-4">
        <a href="/adresse/strandvejen-4-2900-hellerup-89001122">card</a>
        <div class="font-black text-sm">Strandvejen 4, 2900 Hellerup</div>
        <table><tbody>
            <tr><td>1</td><td>Alm. frit salg</td><td>04-06-2019</td><td>5.100.000 kr.</td></tr>
        </tbody></table>
    </div>
    </body></html>
"#;

const DETAIL_PAGE: &str = r#"
    <html><body>
    <h1><span>Hovedgaden 12</span><span>2800 Kongens Lyngby</span></h1>
    <span class="living-area">95 m²</span>
    <div id="oversigt">Opførelsesår: 1962 Energimærke: C</div>
    </body></html>
"#;

fn temp_path(name: &str) -> String {
    std::env::temp_dir()
        .join(format!("boligfinder_pipeline_{}_{}", std::process::id(), name))
        .to_string_lossy()
        .into_owned()
}

#[test]
fn collected_ids_flow_through_enrichment_and_merge() {
    let listings_path = temp_path("listings.csv");
    let details_path = temp_path("details.csv");
    let merged_path = temp_path("merged.csv");

    // Collect stage, against the canned results page.
    let cards = collector::parse_results_page(RESULTS_PAGE);
    assert_eq!(cards.len(), 2);
    let mut seen = HashSet::new();
    let mut listings = Vec::new();
    collector::append_unique(cards, &mut seen, &mut listings);
    storage::save_listings(&listings, &listings_path).unwrap();

    // Enrich stage, extraction only; both rows get the same canned body.
    let loaded = storage::load_listings(&listings_path).unwrap();
    assert_eq!(loaded, listings);
    let rules = extract::detail_rules();
    let details: Vec<_> = loaded
        .iter()
        .map(|l| enricher::extract_detail(&l.id, &l.url, "2025-01-01", DETAIL_PAGE, &rules))
        .collect();
    storage::save_details(&details, &details_path).unwrap();

    // Referential integrity: every id in the final file appears in the
    // intermediate file.
    let final_rows = storage::load_details(&details_path).unwrap();
    let listing_ids: HashSet<_> = loaded.iter().map(|l| l.id.clone()).collect();
    for row in &final_rows {
        assert!(listing_ids.contains(&row.id));
    }
    assert_eq!(final_rows.len(), loaded.len());
    assert_eq!(final_rows[0].living_area, "95");
    assert_eq!(final_rows[0].built_year, "1962");

    // Merge stage keeps every listing row.
    let (merged, stats) = merge::merge_records(&loaded, &final_rows);
    merge::save_merged(&merged, &merged_path).unwrap();
    assert_eq!(stats.merged, loaded.len());
    assert_eq!(stats.missing_details, 0);
    assert_eq!(stats.orphan_details, 0);

    for path in [&listings_path, &details_path, &merged_path] {
        std::fs::remove_file(path).ok();
    }
}
