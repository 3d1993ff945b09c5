use std::collections::BTreeMap;

use serde_json::{Map, Number, Value};

use crate::geo::{Bounds, GeoDocument, Geometry};
use crate::record::{Record, index_by_geocode};

/// A mapped region with its per-year values merged in.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    pub geocode: String,
    pub name: String,
    pub values: BTreeMap<i32, f64>,
    pub geometry: Option<Geometry>,
    /// Source properties other than the id and name.
    pub extra: Map<String, Value>,
}

impl Feature {
    /// Value for `year`, if one was recorded and it is finite.
    pub fn value_for(&self, year: i32) -> Option<f64> {
        self.values
            .get(&year)
            .copied()
            .filter(|value| value.is_finite())
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.geometry.as_ref().and_then(Geometry::bounds)
    }

    /// Flattened property bag: source extras, one `"<year>"` entry per value,
    /// then the canonical `name` and `geocode`.
    pub fn properties(&self) -> Map<String, Value> {
        let mut props = self.extra.clone();
        for (year, value) in &self.values {
            let value = Number::from_f64(*value).map_or(Value::Null, Value::Number);
            props.insert(year.to_string(), value);
        }
        props.insert("name".to_string(), Value::String(self.name.clone()));
        props.insert("geocode".to_string(), Value::String(self.geocode.clone()));
        props
    }
}

/// Merge dataset records onto the features of a geo document.
///
/// The feature's `id_property` is its region code and `name_property` its
/// display name; both are moved to the canonical fields and removed from the
/// remaining properties. Features without a usable id are skipped. When the
/// dataset holds several values for the same region and year, the last wins.
pub fn prepare_features(
    doc: GeoDocument,
    records: &[Record],
    id_property: &str,
    name_property: &str,
) -> Vec<Feature> {
    let index = index_by_geocode(records);

    doc.features
        .into_iter()
        .filter_map(|raw| {
            let mut extra = raw.properties;
            let geocode = extra.remove(id_property).as_ref().and_then(property_text)?;
            let name = extra
                .remove(name_property)
                .as_ref()
                .and_then(property_text)
                .unwrap_or_else(|| geocode.clone());

            let values = index
                .get(geocode.as_str())
                .map(|matches| {
                    matches
                        .iter()
                        .map(|record| (record.year, record.value))
                        .collect()
                })
                .unwrap_or_default();

            Some(Feature {
                geocode,
                name,
                values,
                geometry: raw.geometry,
                extra,
            })
        })
        .collect()
}

/// Region codes are sometimes numeric in boundary files.
fn property_text(value: &Value) -> Option<String> {
    match value {
        Value::String(text) if !text.is_empty() => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}
