use crate::models::{DetailRecord, MISSING};
use regex::Regex;
use scraper::{Html, Selector};
use tracing::debug;

/// How a raw extracted string is normalized before it lands in the CSV.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Clean {
    /// Digits only, separators stripped ("2.450.000 kr" -> "2450000").
    Price,
    /// Digits with decimal separator, comma normalized to dot.
    Area,
    /// First four-digit year.
    Year,
    /// First integer.
    Count,
    /// Trimmed text with collapsed whitespace.
    Raw,
}

/// One declarative extraction rule: output field name, CSS selectors tried in
/// order, a pattern whose first participating capture group is the value, and
/// the cleanup applied to it.
///
/// When `scan_page` is set and no selector produced a match, the pattern is
/// run once more over the full document text. Site markup drifts; keeping the
/// selectors and patterns in one table keeps the churn in one place.
pub struct FieldRule {
    pub field: &'static str,
    pub selectors: &'static [&'static str],
    pub pattern: Regex,
    pub clean: Clean,
    pub scan_page: bool,
}

impl FieldRule {
    fn new(
        field: &'static str,
        selectors: &'static [&'static str],
        pattern: &str,
        clean: Clean,
        scan_page: bool,
    ) -> Self {
        Self {
            field,
            selectors,
            pattern: Regex::new(pattern).unwrap(),
            clean,
            scan_page,
        }
    }
}

/// The full rule table for a boligsiden detail page. Field vocabulary follows
/// the Danish building registry (BBR) labels the site renders.
pub fn detail_rules() -> Vec<FieldRule> {
    vec![
        FieldRule::new(
            "price",
            &["h2.text-blue-900", ".text-blue-900.font-semibold", "[class*='price']"],
            r"(?i)(?:kontantpris|pris|price)\s*:?\s*(?:kr\.?|dkk)?\s*([\d.,]+)|(?:kr\.?|dkk)\s*([\d.,]+)|([\d.,]+)\s*(?:kr\.?|dkk)",
            Clean::Price,
            true,
        ),
        FieldRule::new(
            "property_type",
            &["span.text-gray-700", "p.text-xs span"],
            r"(?i)\b(villa|rækkehus|ejerlejlighed|lejlighed|fritidshus|andelsbolig|landejendom|grund)\b",
            Clean::Raw,
            true,
        ),
        FieldRule::new(
            "living_area",
            &["span.living-area", "div#oversigt", ".property-details", "div.inline-flex span"],
            r"(?i)(?:boligareal|etageareal|living\s*area)\s*:?\s*(\d+(?:[.,]\d+)?)\s*(?:m²|m2|kvm)|(\d+(?:[.,]\d+)?)\s*(?:m²|m2|kvm)",
            Clean::Area,
            true,
        ),
        FieldRule::new(
            "lot_size",
            &["div#oversigt", ".property-details"],
            r"(?i)(?:grundareal|grund)\s*:?\s*(\d+(?:[.,]\d+)?)\s*(?:m²|m2|kvm)",
            Clean::Area,
            true,
        ),
        FieldRule::new(
            "rooms",
            &["div.inline-flex span", "div#oversigt"],
            r"(?i)(?:antal\s+)?\b(?:værelser|rum|rooms)\b\s*:?\s*(\d+)|(\d+)\s*(?:værelser|vær\.?)",
            Clean::Count,
            true,
        ),
        FieldRule::new(
            "built_year",
            &["div#oversigt", ".property-details"],
            r"(?i)(?:opførelsesår|byggeår|opført|bygget|built)\s*(?:i\s*)?(?:år\s*)?:?\s*(\d{4})",
            Clean::Year,
            true,
        ),
        FieldRule::new(
            "energy_label",
            &["div#oversigt", "[class*='energy']", ".property-details"],
            r"(?i)(?:energimærke|energy\s*(?:label|class|rating))\s*:?\s*([A-G]\d?\+?)\b",
            Clean::Raw,
            true,
        ),
        FieldRule::new(
            "heating_type",
            &["div#oversigt", ".property-details"],
            r"(?i)varme(?:installation)?\s*:?\s*([A-Za-zÆØÅæøå/\-]{3,40})",
            Clean::Raw,
            true,
        ),
        FieldRule::new(
            "roof_type",
            &["div#oversigt", ".property-details"],
            r"(?i)tag(?:type|dækning)\s*:?\s*([A-Za-zÆØÅæøå/\-]{3,40})",
            Clean::Raw,
            true,
        ),
        FieldRule::new(
            "wall_material",
            &["div#oversigt", ".property-details"],
            r"(?i)yder(?:vægge?|mur)\s*:?\s*([A-Za-zÆØÅæøå/\-]{3,40})",
            Clean::Raw,
            true,
        ),
        FieldRule::new(
            "basement_size",
            &["div#oversigt", ".property-details"],
            r"(?i)kælder(?:areal)?\s*:?\s*(\d+(?:[.,]\d+)?)",
            Clean::Area,
            true,
        ),
        FieldRule::new(
            "toilets",
            &["div#oversigt", ".property-details"],
            r"(?i)(?:antal\s+)?toilet(?:ter)?\s*:?\s*(\d+)|(\d+)\s*toilet",
            Clean::Count,
            true,
        ),
    ]
}

/// Evaluate every rule against the document, filling fields into `record`.
/// A rule that matches nothing leaves its field at the [`MISSING`] default.
pub fn apply_rules(document: &Html, rules: &[FieldRule], record: &mut DetailRecord) {
    for rule in rules {
        if let Some(value) = evaluate_rule(document, rule) {
            debug!(field = rule.field, value = %value, "extracted detail field");
            record.set_field(rule.field, value);
        } else {
            debug!(field = rule.field, "no match, keeping default");
        }
    }
}

fn evaluate_rule(document: &Html, rule: &FieldRule) -> Option<String> {
    for selector_str in rule.selectors {
        if let Ok(selector) = Selector::parse(selector_str) {
            for element in document.select(&selector) {
                let text = element.text().collect::<Vec<_>>().join(" ");
                if let Some(raw) = first_group(&rule.pattern, &text) {
                    let value = clean_value(&raw, rule.clean);
                    if !value.is_empty() {
                        return Some(value);
                    }
                }
            }
        }
    }

    if rule.scan_page {
        let full_text = document.root_element().text().collect::<Vec<_>>().join(" ");
        if let Some(raw) = first_group(&rule.pattern, &full_text) {
            let value = clean_value(&raw, rule.clean);
            if !value.is_empty() {
                return Some(value);
            }
        }
    }

    None
}

/// First participating capture group of the first match.
fn first_group(pattern: &Regex, text: &str) -> Option<String> {
    let caps = pattern.captures(text)?;
    (1..caps.len())
        .find_map(|i| caps.get(i))
        .map(|m| m.as_str().trim().to_string())
}

pub fn clean_value(raw: &str, kind: Clean) -> String {
    let raw = raw.replace('\u{a0}', " ");
    match kind {
        Clean::Price => raw.chars().filter(|c| c.is_ascii_digit()).collect(),
        Clean::Area => raw
            .chars()
            .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
            .collect::<String>()
            .replace(',', "."),
        Clean::Year => {
            let year = Regex::new(r"\d{4}").unwrap();
            match year.find(&raw) {
                Some(m) => m.as_str().to_string(),
                None => raw.chars().filter(|c| c.is_ascii_digit()).collect(),
            }
        }
        Clean::Count => {
            let count = Regex::new(r"\d+").unwrap();
            count.find(&raw).map(|m| m.as_str().to_string()).unwrap_or_default()
        }
        Clean::Raw => raw.split_whitespace().collect::<Vec<_>>().join(" "),
    }
}

/// Street / postal code / city split out of a one-line Danish address.
#[derive(Debug, Clone, PartialEq)]
pub struct AddressParts {
    pub street: String,
    pub postal_code: String,
    pub city: String,
}

/// Parse "Hovedgaden 12, 2800 Kongens Lyngby" style addresses. Danish postal
/// codes are four digits; without one the whole text is kept as the street.
pub fn parse_address(text: &str) -> AddressParts {
    let mut parts = AddressParts {
        street: MISSING.to_string(),
        postal_code: MISSING.to_string(),
        city: MISSING.to_string(),
    };

    let text = text.trim();
    if text.is_empty() {
        return parts;
    }

    let standard = Regex::new(r"^(.*?),?\s+(\d{4})\s+([^,]+)(?:,\s*(.+))?$").unwrap();
    if let Some(caps) = standard.captures(text) {
        parts.street = caps[1].trim().to_string();
        parts.postal_code = caps[2].to_string();
        parts.city = match caps.get(4) {
            Some(extra) => format!("{}, {}", caps[3].trim(), extra.as_str().trim()),
            None => caps[3].trim().to_string(),
        };
        return parts;
    }

    // Fallback: locate a postal code anywhere and split around it.
    let postal = Regex::new(r"\d{4}").unwrap();
    if let Some(m) = postal.find(text) {
        let street = text[..m.start()].trim().trim_end_matches(',').trim();
        let city = text[m.end()..].trim().trim_start_matches(',').trim();
        if !street.is_empty() {
            parts.street = street.to_string();
        }
        parts.postal_code = m.as_str().to_string();
        if !city.is_empty() {
            parts.city = city.to_string();
        }
        return parts;
    }

    if text.len() > 5 {
        parts.street = text.to_string();
    }
    parts
}
