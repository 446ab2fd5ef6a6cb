use crate::models::{DetailRecord, ListingRecord};
use anyhow::{Context, Result};
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Write the intermediate file: one row per collected listing, header first,
/// rows in scrape order.
pub fn save_listings(records: &[ListingRecord], output_path: &str) -> Result<()> {
    let file = create_output_file(output_path)?;
    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!(count = records.len(), path = output_path, "saved listings");
    Ok(())
}

pub fn load_listings(input_path: &str) -> Result<Vec<ListingRecord>> {
    let file = File::open(input_path)
        .with_context(|| format!("Failed to open input file: {}", input_path))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: ListingRecord = result.context("Malformed listing row")?;
        records.push(record);
    }
    info!(count = records.len(), path = input_path, "loaded listings");
    Ok(records)
}

/// Write the final file: one row per processed input row, id column first.
pub fn save_details(records: &[DetailRecord], output_path: &str) -> Result<()> {
    let file = create_output_file(output_path)?;
    let mut writer = csv::Writer::from_writer(file);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!(count = records.len(), path = output_path, "saved details");
    Ok(())
}

pub fn load_details(input_path: &str) -> Result<Vec<DetailRecord>> {
    let file = File::open(input_path)
        .with_context(|| format!("Failed to open input file: {}", input_path))?;
    let mut reader = csv::Reader::from_reader(file);
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let record: DetailRecord = result.context("Malformed detail row")?;
        records.push(record);
    }
    info!(count = records.len(), path = input_path, "loaded details");
    Ok(records)
}

fn create_output_file(output_path: &str) -> Result<File> {
    let path = Path::new(output_path);
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }
    }
    File::create(path).with_context(|| format!("Failed to create output file: {}", output_path))
}
