use serde::{Deserialize, Serialize};

use crate::color::{
    Color, ColorMode, DEFAULT_COLOR_CLASSES, DEFAULT_HIGH_COLOR, DEFAULT_LOW_COLOR,
    DEFAULT_NO_VALUE_COLOR,
};
use crate::error::ConfigurationError;
use crate::record::Record;
use crate::timeline::PlayerOptions;

/// Widget options. Every field has a default so partial documents are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MapConfig {
    #[serde(rename = "tileURL")]
    pub tile_url: String,
    pub tile_options: TileOptions,
    pub min_zoom: f64,
    pub max_zoom: f64,
    pub color_range: [Color; 2],
    pub no_value_color: Color,
    pub show_selection_labels: bool,
    pub color_classes: usize,
    pub color_mode: ColorMode,
    pub year_slider: PlayerOptions,
    pub geo_layers: Vec<GeoLayerConfig>,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            tile_url: "https://api.tiles.mapbox.com/v4/{id}/{z}/{x}/{y}.png?access_token={accessToken}"
                .to_string(),
            tile_options: TileOptions::default(),
            min_zoom: 5.0,
            max_zoom: 10.0,
            color_range: [DEFAULT_LOW_COLOR, DEFAULT_HIGH_COLOR],
            no_value_color: DEFAULT_NO_VALUE_COLOR,
            show_selection_labels: true,
            color_classes: DEFAULT_COLOR_CLASSES,
            color_mode: ColorMode::default(),
            year_slider: PlayerOptions::default(),
            geo_layers: Vec::new(),
        }
    }
}

impl MapConfig {
    /// Reject options the widget cannot run with.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.geo_layers.is_empty() {
            return Err(ConfigurationError::NoGeoLayers);
        }
        if self.color_classes == 0 {
            return Err(ConfigurationError::ZeroColorClasses);
        }
        if self.min_zoom > self.max_zoom {
            return Err(ConfigurationError::InvalidZoomRange {
                min: self.min_zoom,
                max: self.max_zoom,
            });
        }
        for (index, layer) in self.geo_layers.iter().enumerate() {
            if layer.id_property.trim().is_empty() {
                return Err(ConfigurationError::MissingIdProperty { index });
            }
            if layer.min_zoom > layer.max_zoom {
                return Err(ConfigurationError::InvalidLayerZoomRange {
                    index,
                    min: layer.min_zoom,
                    max: layer.max_zoom,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TileOptions {
    pub id: String,
    pub access_token: String,
    pub attribution: String,
}

impl Default for TileOptions {
    fn default() -> Self {
        Self {
            id: "mapbox.light".to_string(),
            access_token: String::new(),
            attribution: String::new(),
        }
    }
}

impl TileOptions {
    /// Credit line for the map corner, if one is configured.
    pub fn attribution_text(&self) -> Option<&str> {
        Some(self.attribution.trim()).filter(|text| !text.is_empty())
    }
}

/// One boundary layer and the zoom range it is shown in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeoLayerConfig {
    pub service_url: String,
    pub id_property: String,
    pub name_property: String,
    #[serde(rename = "min_zoom", default = "default_layer_min_zoom")]
    pub min_zoom: f64,
    #[serde(rename = "max_zoom", default = "default_layer_max_zoom")]
    pub max_zoom: f64,
    #[serde(default)]
    pub style_options: StyleOptions,
    #[serde(default)]
    pub style_options_selected: SelectedStyleOptions,
}

fn default_layer_min_zoom() -> f64 {
    0.0
}

fn default_layer_max_zoom() -> f64 {
    20.0
}

impl GeoLayerConfig {
    pub fn new(
        service_url: impl Into<String>,
        id_property: impl Into<String>,
        name_property: impl Into<String>,
    ) -> Self {
        Self {
            service_url: service_url.into(),
            id_property: id_property.into(),
            name_property: name_property.into(),
            min_zoom: default_layer_min_zoom(),
            max_zoom: default_layer_max_zoom(),
            style_options: StyleOptions::default(),
            style_options_selected: SelectedStyleOptions::default(),
        }
    }

    /// Base style with the selected overrides applied.
    pub fn selected_style(&self) -> StyleOptions {
        self.style_options_selected.apply_to(&self.style_options)
    }
}

/// Outline and fill settings for a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StyleOptions {
    pub weight: f64,
    pub opacity: f64,
    pub color: Color,
    pub fill_opacity: f64,
}

impl Default for StyleOptions {
    fn default() -> Self {
        Self {
            weight: 1.0,
            opacity: 1.0,
            color: Color::new(0x88, 0x88, 0x88),
            fill_opacity: 0.7,
        }
    }
}

/// Overrides applied on top of [`StyleOptions`] for selected features.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectedStyleOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fill_opacity: Option<f64>,
}

impl Default for SelectedStyleOptions {
    fn default() -> Self {
        Self {
            weight: None,
            opacity: None,
            color: Some(Color::new(0x11, 0x11, 0x11)),
            fill_opacity: None,
        }
    }
}

impl SelectedStyleOptions {
    pub fn apply_to(&self, base: &StyleOptions) -> StyleOptions {
        StyleOptions {
            weight: self.weight.unwrap_or(base.weight),
            opacity: self.opacity.unwrap_or(base.opacity),
            color: self.color.unwrap_or(base.color),
            fill_opacity: self.fill_opacity.unwrap_or(base.fill_opacity),
        }
    }
}

/// Everything the widget needs to start: options plus the dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapBootstrap {
    pub config: MapConfig,
    pub records: Vec<Record>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let config: MapConfig = serde_json::from_str("{}").expect("parse");
        assert_eq!(config, MapConfig::default());
        assert_eq!(config.min_zoom, 5.0);
        assert_eq!(config.max_zoom, 10.0);
        assert_eq!(config.color_classes, 5);
        assert_eq!(config.no_value_color.to_hex(), "#f0f0f0");
        assert_eq!(config.color_range[0].to_hex(), "#e5f5f9");
        assert_eq!(config.color_range[1].to_hex(), "#2ca25f");
        assert!(config.show_selection_labels);
    }

    #[test]
    fn blank_attribution_is_not_shown() {
        let mut tiles = TileOptions::default();
        assert_eq!(tiles.attribution_text(), None);
        tiles.attribution = "   ".to_string();
        assert_eq!(tiles.attribution_text(), None);
        tiles.attribution = " Sample boundaries ".to_string();
        assert_eq!(tiles.attribution_text(), Some("Sample boundaries"));
    }

    #[test]
    fn layer_defaults_fill_missing_fields() {
        let raw = r#"{
            "tileURL": "https://tiles/{id}/{z}/{x}/{y}?t={accessToken}",
            "tileOptions": {"id": "light", "accessToken": "abc"},
            "geoLayers": [{
                "serviceUrl": "/geo/regions.geojson",
                "idProperty": "geocode",
                "nameProperty": "name",
                "styleOptions": {"weight": 2}
            }]
        }"#;
        let config: MapConfig = serde_json::from_str(raw).expect("parse");
        assert_eq!(config.tile_url, "https://tiles/{id}/{z}/{x}/{y}?t={accessToken}");
        assert_eq!(config.tile_options.access_token, "abc");

        let layer = &config.geo_layers[0];
        assert_eq!(layer.min_zoom, 0.0);
        assert_eq!(layer.max_zoom, 20.0);
        assert_eq!(layer.style_options.weight, 2.0);
        assert_eq!(layer.style_options.fill_opacity, 0.7);
        assert_eq!(layer.style_options.color.to_hex(), "#888888");

        let selected = layer.selected_style();
        assert_eq!(selected.color.to_hex(), "#111111");
        assert_eq!(selected.weight, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn layer_zoom_keys_are_snake_case() {
        let raw = r#"{"serviceUrl": "a", "idProperty": "id", "nameProperty": "n",
                      "min_zoom": 3, "max_zoom": 7}"#;
        let layer: GeoLayerConfig = serde_json::from_str(raw).expect("parse");
        assert_eq!((layer.min_zoom, layer.max_zoom), (3.0, 7.0));
    }

    #[test]
    fn validate_requires_a_geo_layer() {
        assert_eq!(
            MapConfig::default().validate(),
            Err(ConfigurationError::NoGeoLayers)
        );
    }

    #[test]
    fn validate_rejects_bad_classes_and_zoom_ranges() {
        let base = MapConfig {
            geo_layers: vec![GeoLayerConfig::new("a", "id", "name")],
            ..MapConfig::default()
        };

        let zero_classes = MapConfig {
            color_classes: 0,
            ..base.clone()
        };
        assert_eq!(
            zero_classes.validate(),
            Err(ConfigurationError::ZeroColorClasses)
        );

        let inverted = MapConfig {
            min_zoom: 9.0,
            max_zoom: 4.0,
            ..base.clone()
        };
        assert!(matches!(
            inverted.validate(),
            Err(ConfigurationError::InvalidZoomRange { .. })
        ));

        let mut bad_layer = base.clone();
        bad_layer.geo_layers[0].min_zoom = 12.0;
        bad_layer.geo_layers[0].max_zoom = 2.0;
        assert!(matches!(
            bad_layer.validate(),
            Err(ConfigurationError::InvalidLayerZoomRange { index: 0, .. })
        ));

        let mut no_id = base;
        no_id.geo_layers[0].id_property = " ".to_string();
        assert_eq!(
            no_id.validate(),
            Err(ConfigurationError::MissingIdProperty { index: 0 })
        );
    }

    #[test]
    fn invalid_color_fails_to_parse() {
        let err = serde_json::from_str::<MapConfig>(r##"{"noValueColor": "#12"}"##)
            .expect_err("bad color should be rejected");
        assert!(err.to_string().contains("invalid color"));
    }

    #[test]
    fn bootstrap_roundtrips_through_json() {
        let bootstrap = MapBootstrap {
            config: MapConfig::default(),
            records: vec![Record::new("KE", 2016, 3.5)],
        };
        let json = serde_json::to_string(&bootstrap).expect("serialize");
        assert!(json.contains("\"GeoCode\":\"KE\""));
        let back: MapBootstrap = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, bootstrap);
    }
}
