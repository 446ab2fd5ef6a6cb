use serde::{Deserialize, Serialize};

/// Default value written for any detail field the extractor could not find.
pub const MISSING: &str = "N/A";

/// One row of the intermediate file, as collected from a search-results page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListingRecord {
    pub id: String,
    pub url: String,
    pub address: String,
    pub sale_type: String,
    pub sale_date: String,
    pub price: String,
}

/// One row of the final file, produced by fetching a listing's detail page.
///
/// `id` and `url` are copied from the matching [`ListingRecord`]; every other
/// field defaults to [`MISSING`] when the page does not yield it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetailRecord {
    pub id: String,
    pub url: String,
    pub scrape_date: String,
    pub street: String,
    pub postal_code: String,
    pub city: String,
    pub price: String,
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

impl DetailRecord {
    /// Record with every detail field set to [`MISSING`], keeping the join
    /// key intact. Used both as the extraction starting point and as the
    /// emitted row when a fetch fails outright.
    pub fn empty(id: &str, url: &str, scrape_date: &str) -> Self {
        let na = || MISSING.to_string();
        Self {
            id: id.to_string(),
            url: url.to_string(),
            scrape_date: scrape_date.to_string(),
            street: na(),
            postal_code: na(),
            city: na(),
            price: na(),
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
        }
    }

    /// Assign an extracted value to the field named by a rule.
    pub fn set_field(&mut self, name: &str, value: String) {
        match name {
            "price" => self.price = value,
            "property_type" => self.property_type = value,
            "living_area" => self.living_area = value,
            "lot_size" => self.lot_size = value,
            "rooms" => self.rooms = value,
            "built_year" => self.built_year = value,
            "energy_label" => self.energy_label = value,
            "heating_type" => self.heating_type = value,
            "roof_type" => self.roof_type = value,
            "wall_material" => self.wall_material = value,
            "basement_size" => self.basement_size = value,
            "toilets" => self.toilets = value,
            _ => {}
        }
    }
}
