use std::collections::{BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

/// One statistical observation for a region in a given year.
///
/// The serialized field names are part of the dataset contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "GeoCode")]
    pub geocode: String,
    #[serde(rename = "Year")]
    pub year: i32,
    #[serde(rename = "Value")]
    pub value: f64,
}

impl Record {
    pub fn new(geocode: impl Into<String>, year: i32, value: f64) -> Self {
        Self {
            geocode: geocode.into(),
            year,
            value,
        }
    }
}

/// Distinct years present in the dataset, ascending.
pub fn years(records: &[Record]) -> Vec<i32> {
    records
        .iter()
        .map(|record| record.year)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Records grouped by region code. Dataset order is kept inside each group.
pub fn index_by_geocode(records: &[Record]) -> HashMap<&str, Vec<&Record>> {
    let mut index: HashMap<&str, Vec<&Record>> = HashMap::new();
    for record in records {
        index
            .entry(record.geocode.as_str())
            .or_default()
            .push(record);
    }
    index
}
