use crate::models::{DetailRecord, ListingRecord, MISSING};
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

/// One row of the combined dataset: the listing columns followed by the
/// detail columns. The detail price keeps its own column since the listing
/// already carries the registered sale price.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MergedRecord {
    pub id: String,
    pub url: String,
    pub address: String,
    pub sale_type: String,
    pub sale_date: String,
    pub price: String,
    pub scrape_date: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub detail_price: String,
    pub property_type: String,
    pub living_area: String,
    pub lot_size: String,
    pub rooms: String,
    pub built_year: String,
    pub energy_label: String,
    pub heating_type: String,
    pub roof_type: String,
    pub wall_material: String,
    pub basement_size: String,
    pub toilets: String,
}

#[derive(Debug, Default, PartialEq)]
pub struct MergeStats {
    pub listings: usize,
    pub details: usize,
    pub merged: usize,
    pub missing_details: usize,
    pub orphan_details: usize,
}

/// Left-join the detail records onto the listings by id. Every listing row
/// survives; listings without a matching detail row get [`MISSING`] in every
/// detail column. Detail ids absent from the listings are an input error
/// (the enricher never fabricates ids) and are counted and reported.
pub fn merge_records(
    listings: &[ListingRecord],
    details: &[DetailRecord],
) -> (Vec<MergedRecord>, MergeStats) {
    let mut stats = MergeStats {
        listings: listings.len(),
        details: details.len(),
        ..Default::default()
    };

    let by_id: HashMap<&str, &DetailRecord> =
        details.iter().map(|d| (d.id.as_str(), d)).collect();

    let mut merged = Vec::with_capacity(listings.len());
    for listing in listings {
        let detail = by_id.get(listing.id.as_str()).copied();
        if detail.is_none() {
            stats.missing_details += 1;
        }
        merged.push(combine(listing, detail));
    }
    stats.merged = merged.len();

    for detail in details {
        if !listings.iter().any(|l| l.id == detail.id) {
            warn!(id = %detail.id, "detail row has no matching listing");
            stats.orphan_details += 1;
        }
    }

    (merged, stats)
}

fn combine(listing: &ListingRecord, detail: Option<&DetailRecord>) -> MergedRecord {
    let na = || MISSING.to_string();
    match detail {
        Some(d) => MergedRecord {
            id: listing.id.clone(),
            url: listing.url.clone(),
            address: listing.address.clone(),
            sale_type: listing.sale_type.clone(),
            sale_date: listing.sale_date.clone(),
            price: listing.price.clone(),
            scrape_date: d.scrape_date.clone(),
            street: d.street.clone(),
            postal_code: d.postal_code.clone(),
            city: d.city.clone(),
            detail_price: d.price.clone(),
            property_type: d.property_type.clone(),
            living_area: d.living_area.clone(),
            lot_size: d.lot_size.clone(),
            rooms: d.rooms.clone(),
            built_year: d.built_year.clone(),
            energy_label: d.energy_label.clone(),
            heating_type: d.heating_type.clone(),
            roof_type: d.roof_type.clone(),
            wall_material: d.wall_material.clone(),
            basement_size: d.basement_size.clone(),
            toilets: d.toilets.clone(),
        },
        None => MergedRecord {
            id: listing.id.clone(),
            url: listing.url.clone(),
            address: listing.address.clone(),
            sale_type: listing.sale_type.clone(),
            sale_date: listing.sale_date.clone(),
            price: listing.price.clone(),
            scrape_date: na(),
            street: na(),
            postal_code: na(),
            city: na(),
            detail_price: na(),
            property_type: na(),
            living_area: na(),
            lot_size: na(),
            rooms: na(),
            built_year: na(),
            energy_label: na(),
            heating_type: na(),
            roof_type: na(),
            wall_material: na(),
            basement_size: na(),
            toilets: na(),
        },
    }
}

pub fn save_merged(records: &[MergedRecord], output_path: &str) -> Result<()> {
    let path = Path::new(output_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create output file: {}", output_path))?;
    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!(count = records.len(), path = output_path, "saved merged dataset");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(id: &str) -> ListingRecord {
        ListingRecord {
            id: id.into(),
            url: format!("https://x.dk/{}", id),
            address: "Hovedgaden 12".into(),
            sale_type: "Auktion".into(),
            sale_date: "12-03-2024".into(),
            price: "2.450.000 kr.".into(),
        }
    }

    fn detail(id: &str) -> DetailRecord {
        let mut d = DetailRecord::empty(id, &format!("https://x.dk/{}", id), "2025-01-01");
        d.living_area = "95".into();
        d.price = "2450000".into();
        d
    }

    #[test]
    fn every_listing_row_survives_the_join() {
        let listings = vec![listing("p1"), listing("p2"), listing("p3")];
        let details = vec![detail("p1"), detail("p3")];

        let (merged, stats) = merge_records(&listings, &details);

        assert_eq!(merged.len(), 3);
        assert_eq!(stats.merged, 3);
        assert_eq!(stats.missing_details, 1);
        assert_eq!(stats.orphan_details, 0);
        assert_eq!(merged[0].living_area, "95");
        assert_eq!(merged[0].detail_price, "2450000");
        assert_eq!(merged[0].price, "2.450.000 kr.");
        // p2 had no detail row; its detail columns are defaulted.
        assert_eq!(merged[1].living_area, MISSING);
        assert_eq!(merged[1].scrape_date, MISSING);
    }

    #[test]
    fn orphan_detail_ids_are_counted() {
        let listings = vec![listing("p1")];
        let details = vec![detail("p1"), detail("ghost")];

        let (merged, stats) = merge_records(&listings, &details);

        assert_eq!(merged.len(), 1);
        assert_eq!(stats.orphan_details, 1);
    }
}
