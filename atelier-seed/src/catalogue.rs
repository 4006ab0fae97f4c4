//! Raw catalogue CSV to clean PRODUCTS rows.
//!
//! The raw export has one row per listing with an HTML description and a
//! `p_attributes` column holding a Python-style dict literal such as
//! `{'Top Type': 'Kurta', 'Occasion': 'Daily'}`.

use std::collections::{BTreeMap, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use atelier_core::AtelierError;
use regex::Regex;
use serde::Deserialize;

/// One row of the raw catalogue export.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawProduct {
    #[serde(default)]
    pub p_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub price: Option<f64>,
    #[serde(default)]
    pub colour: Option<String>,
    #[serde(default)]
    pub brand: Option<String>,
    #[serde(default)]
    pub img: Option<String>,
    #[serde(default, rename = "ratingCount", deserialize_with = "csv::invalid_option")]
    pub rating_count: Option<f64>,
    #[serde(default, deserialize_with = "csv::invalid_option")]
    pub avg_rating: Option<f64>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub p_attributes: Option<String>,
}

/// A PRODUCTS row ready for insertion.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanProduct {
    pub p_id: String,
    pub name: String,
    pub price: f64,
    pub colour: String,
    pub brand: String,
    pub img: String,
    pub rating_count: i64,
    pub avg_rating: f64,
    pub description: String,
    /// Parsed attributes re-encoded as a JSON object.
    pub p_attributes: String,
    pub top_type: String,
    pub sleeve_length: String,
    pub occasion: String,
    pub print_pattern: String,
    pub fabric: String,
    pub has_dupatta: bool,
    pub is_sustainable: bool,
    pub search_text: String,
}

pub fn read_raw_csv<R: Read>(reader: R) -> Result<Vec<RawProduct>, AtelierError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let mut rows = Vec::new();
    for (i, record) in rdr.deserialize::<RawProduct>().enumerate() {
        match record {
            Ok(row) => rows.push(row),
            Err(e) if e.is_io_error() => return Err(AtelierError::Other(format!("CSV read failed: {}", e))),
            Err(e) => tracing::warn!(row = i + 1, error = %e, "Skipping unreadable catalogue row"),
        }
    }
    Ok(rows)
}

/// Read and clean a catalogue file in one go.
pub fn load_catalogue(path: &Path) -> Result<Vec<CleanProduct>, AtelierError> {
    let raw = read_raw_csv(File::open(path)?)?;
    let raw_count = raw.len();
    let products = preprocess(raw);
    tracing::info!(raw = raw_count, clean = products.len(), path = %path.display(), "Catalogue preprocessed");
    Ok(products)
}

/// Clean raw rows. Rows without an id or a name are dropped and the first row
/// wins for a repeated id.
pub fn preprocess(rows: Vec<RawProduct>) -> Vec<CleanProduct> {
    let mut seen = HashSet::new();
    let mut cleaned = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(p_id) = non_blank(row.p_id.as_deref()) else {
            continue;
        };
        let Some(name) = non_blank(row.name.as_deref()) else {
            continue;
        };
        if !seen.insert(p_id.clone()) {
            continue;
        }

        let attributes = row
            .p_attributes
            .as_deref()
            .map(parse_attributes)
            .unwrap_or_default();
        let attr = |key: &str| attributes.get(key).map(String::as_str);

        let colour = text_or_unknown(row.colour.as_deref());
        let brand = text_or_unknown(row.brand.as_deref());
        let top_type = attribute_value(attr("Top Type").or_else(|| attr("Top")), "unknown");
        let sleeve_length = attribute_value(attr("Sleeve Length"), "unknown");
        let occasion = attribute_value(attr("Occasion"), "casual");
        let print_pattern = attribute_value(attr("Print or Pattern Type"), "unknown");
        let fabric = attribute_value(attr("Top Fabric"), "unknown");
        let has_dupatta = attr("Dupatta").is_some_and(|v| v.trim().eq_ignore_ascii_case("with dupatta"));
        let is_sustainable = attr("Sustainable").is_some_and(|v| v.to_lowercase().contains("sustainable"));

        let search_text = [
            name.to_lowercase(),
            brand.to_lowercase(),
            colour.to_lowercase(),
            print_pattern.clone(),
            occasion.clone(),
            fabric.clone(),
        ]
        .join(" ");

        cleaned.push(CleanProduct {
            p_id,
            name,
            price: row.price.unwrap_or(0.0),
            colour,
            brand,
            img: text_or_unknown(row.img.as_deref()),
            rating_count: row.rating_count.unwrap_or(0.0) as i64,
            avg_rating: row.avg_rating.unwrap_or(0.0),
            description: strip_html(&text_or_unknown(row.description.as_deref())),
            p_attributes: serde_json::to_string(&attributes).unwrap_or_else(|_| "{}".to_string()),
            top_type,
            sleeve_length,
            occasion,
            print_pattern,
            fabric,
            has_dupatta,
            is_sustainable,
            search_text,
        });
    }

    cleaned
}

/// Text content of an HTML fragment with whitespace collapsed.
pub fn strip_html(raw: &str) -> String {
    let without_tags = match Regex::new(r"<[^>]*>") {
        Ok(re) => re.replace_all(raw, " ").into_owned(),
        Err(_) => raw.to_string(),
    };
    let decoded = without_tags
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    decoded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Key/value pairs of a Python dict literal with string keys and values.
/// Anything unparseable yields an empty map.
pub fn parse_attributes(raw: &str) -> BTreeMap<String, String> {
    let mut attributes = BTreeMap::new();
    let pattern = r#"(?:'([^']*)'|"([^"]*)")\s*:\s*(?:'([^']*)'|"([^"]*)")"#;
    if let Ok(re) = Regex::new(pattern) {
        for caps in re.captures_iter(raw) {
            let key = caps.get(1).or_else(|| caps.get(2)).map(|m| m.as_str().trim());
            let value = caps.get(3).or_else(|| caps.get(4)).map(|m| m.as_str().trim());
            if let (Some(key), Some(value)) = (key, value) {
                attributes.insert(key.to_string(), value.to_string());
            }
        }
    }
    attributes
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty() && !v.eq_ignore_ascii_case("nan"))
        .map(str::to_string)
}

fn text_or_unknown(value: Option<&str>) -> String {
    non_blank(value).unwrap_or_else(|| "Unknown".to_string())
}

fn attribute_value(value: Option<&str>, default: &str) -> String {
    match non_blank(value) {
        Some(v) => v.to_lowercase(),
        None => default.to_string(),
    }
}
