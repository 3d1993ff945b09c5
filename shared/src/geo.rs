use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// GeoJSON position. Only longitude and latitude are read; altitude is carried through.
pub type Position = Vec<f64>;

/// A GeoJSON `FeatureCollection` as served by a geo layer source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoDocument {
    #[serde(rename = "type", default = "feature_collection_kind")]
    pub kind: String,
    #[serde(default)]
    pub features: Vec<RawFeature>,
}

/// A boundary feature before records are merged into it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFeature {
    #[serde(rename = "type", default = "feature_kind")]
    pub kind: String,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

fn feature_collection_kind() -> String {
    "FeatureCollection".to_string()
}

fn feature_kind() -> String {
    "Feature".to_string()
}

/// Area geometries. Anything else is kept as `Unsupported` and not drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Polygon {
        coordinates: Vec<Vec<Position>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Position>>>,
    },
    #[serde(other)]
    Unsupported,
}

impl Geometry {
    /// Linear rings of every polygon, outer ring first within each polygon.
    pub fn rings(&self) -> Vec<&[Position]> {
        match self {
            Self::Polygon { coordinates } => coordinates.iter().map(Vec::as_slice).collect(),
            Self::MultiPolygon { coordinates } => coordinates
                .iter()
                .flat_map(|polygon| polygon.iter().map(Vec::as_slice))
                .collect(),
            Self::Unsupported => Vec::new(),
        }
    }

    pub fn bounds(&self) -> Option<Bounds> {
        let mut bounds = Bounds::EMPTY;
        for ring in self.rings() {
            for position in ring {
                if let Some((lon, lat)) = lon_lat(position) {
                    bounds.extend(lon, lat);
                }
            }
        }
        (!bounds.is_empty()).then_some(bounds)
    }
}

/// Longitude/latitude of a position, if it has both and both are finite.
pub fn lon_lat(position: &[f64]) -> Option<(f64, f64)> {
    match position {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Some((*lon, *lat)),
        _ => None,
    }
}

/// Longitude/latitude bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_lon: f64,
    pub min_lat: f64,
    pub max_lon: f64,
    pub max_lat: f64,
}

impl Bounds {
    pub const EMPTY: Self = Self {
        min_lon: f64::INFINITY,
        min_lat: f64::INFINITY,
        max_lon: f64::NEG_INFINITY,
        max_lat: f64::NEG_INFINITY,
    };

    pub fn is_empty(&self) -> bool {
        self.min_lon > self.max_lon || self.min_lat > self.max_lat
    }

    pub fn extend(&mut self, lon: f64, lat: f64) {
        self.min_lon = self.min_lon.min(lon);
        self.min_lat = self.min_lat.min(lat);
        self.max_lon = self.max_lon.max(lon);
        self.max_lat = self.max_lat.max(lat);
    }

    pub fn union(self, other: Self) -> Self {
        Self {
            min_lon: self.min_lon.min(other.min_lon),
            min_lat: self.min_lat.min(other.min_lat),
            max_lon: self.max_lon.max(other.max_lon),
            max_lat: self.max_lat.max(other.max_lat),
        }
    }

    /// Center of the box as `(lon, lat)`.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lon + self.max_lon) / 2.0,
            (self.min_lat + self.max_lat) / 2.0,
        )
    }
}
