use std::collections::HashMap;

use crate::color::{Color, ColorScale, classify};
use crate::config::{MapConfig, StyleOptions};
use crate::error::{LayerFailure, LoadError, WidgetError};
use crate::feature::{Feature, prepare_features};
use crate::geo::{Bounds, GeoDocument};
use crate::info_panel::{InfoRow, Legend, build_rows, legend, selection_label};
use crate::record::{self, Record};
use crate::selection::{Selection, SelectionChange};
use crate::timeline::{YearRange, year_from_timestamp_ms};
use crate::zoom;

/// Input the widget reacts to.
#[derive(Debug, Clone, PartialEq)]
pub enum WidgetEvent {
    FeatureClicked(String),
    /// Slider moved; the timestamp is epoch milliseconds.
    TimeChanged { timestamp_ms: i64 },
    YearChanged(i32),
    /// Close button of an info panel row.
    PanelItemClosed(String),
}

/// Ask the host to center the map on a newly selected feature.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusRequest {
    pub geocode: String,
    /// `(lon, lat)` of the feature's bounding box center, if it has geometry.
    pub center: Option<(f64, f64)>,
    pub bring_to_front: bool,
}

/// What has to be redrawn after an event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WidgetUpdate {
    pub fills_changed: bool,
    pub selection_changed: bool,
    pub panel_changed: bool,
    pub focus: Option<FocusRequest>,
}

impl WidgetUpdate {
    pub fn is_empty(&self) -> bool {
        !self.fills_changed && !self.selection_changed && !self.panel_changed && self.focus.is_none()
    }
}

/// Outcome of [`MapWidget::load_layers`] when at least one layer loaded.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub loaded: Vec<usize>,
    pub failures: Vec<LayerFailure>,
}

impl LoadReport {
    /// Human readable warning naming the layers that failed.
    pub fn warning(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        let names: Vec<String> = self
            .failures
            .iter()
            .map(|f| format!("{} ({})", f.service_url, f.error))
            .collect();
        Some(format!(
            "{} of {} geo layers failed to load: {}",
            self.failures.len(),
            self.failures.len() + self.loaded.len(),
            names.join(", ")
        ))
    }
}

#[derive(Debug, Clone, PartialEq)]
enum LayerState {
    Pending,
    Loaded(Vec<Feature>),
    Failed(LoadError),
}

/// Choropleth state: features, color scale, selection and current year.
///
/// Hosts feed [`WidgetEvent`]s through [`MapWidget::handle`] and redraw
/// according to the returned [`WidgetUpdate`].
#[derive(Debug, Clone)]
pub struct MapWidget {
    config: MapConfig,
    records: Vec<Record>,
    scale: ColorScale,
    years: Vec<i32>,
    current_year: i32,
    selection: Selection,
    layers: Vec<LayerState>,
    /// geocode -> (layer, feature) of the first layer that has it.
    lookup: HashMap<String, (usize, usize)>,
    /// Fill per geocode for `current_year`.
    fills: HashMap<String, Color>,
    supports_reordering: bool,
}

impl MapWidget {
    /// Validate the options and classify the dataset. Layers load separately.
    pub fn new(config: MapConfig, records: Vec<Record>) -> Result<Self, WidgetError> {
        config.validate()?;
        let scale = classify(
            records.iter().map(|r| r.value),
            config.color_classes,
            config.color_range,
        )?
        .with_mode(config.color_mode)
        .with_no_value_color(config.no_value_color);

        let years = record::years(&records);
        let current_year = years.first().copied().unwrap_or_default();
        let layers = vec![LayerState::Pending; config.geo_layers.len()];

        Ok(Self {
            config,
            records,
            scale,
            years,
            current_year,
            selection: Selection::new(),
            layers,
            lookup: HashMap::new(),
            fills: HashMap::new(),
            supports_reordering: true,
        })
    }

    /// Hosts that cannot change draw order skip "bring to front".
    pub fn with_reordering(mut self, supported: bool) -> Self {
        self.supports_reordering = supported;
        self
    }

    /// Merge fetched layer documents, one result per configured layer in order.
    ///
    /// Fails only when no layer loaded; otherwise the report lists failures.
    pub fn load_layers(
        &mut self,
        results: Vec<Result<GeoDocument, LoadError>>,
    ) -> Result<LoadReport, WidgetError> {
        let mut report = LoadReport::default();
        let mut results = results.into_iter();

        for (index, layer) in self.config.geo_layers.iter().enumerate() {
            let result = results
                .next()
                .unwrap_or_else(|| Err(LoadError::Network("no response".to_string())));
            self.layers[index] = match result {
                Ok(doc) => {
                    let features = prepare_features(
                        doc,
                        &self.records,
                        &layer.id_property,
                        &layer.name_property,
                    );
                    report.loaded.push(index);
                    LayerState::Loaded(features)
                }
                Err(error) => {
                    report.failures.push(LayerFailure {
                        index,
                        service_url: layer.service_url.clone(),
                        error: error.clone(),
                    });
                    LayerState::Failed(error)
                }
            };
        }

        if report.loaded.is_empty() {
            return Err(WidgetError::AllLayersFailed(report.failures));
        }

        self.rebuild_lookup();
        self.refresh_fills();
        Ok(report)
    }

    pub fn handle(&mut self, event: WidgetEvent) -> WidgetUpdate {
        match event {
            WidgetEvent::FeatureClicked(code) => self.on_feature_click(&code),
            WidgetEvent::TimeChanged { timestamp_ms } => match year_from_timestamp_ms(timestamp_ms) {
                Some(year) => self.on_year_change(year),
                None => WidgetUpdate::default(),
            },
            WidgetEvent::YearChanged(year) => self.on_year_change(year),
            WidgetEvent::PanelItemClosed(code) => self.on_panel_item_closed(&code),
        }
    }

    /// Toggle the clicked feature. Selecting it also asks the host to focus it.
    pub fn on_feature_click(&mut self, code: &str) -> WidgetUpdate {
        let Some(feature) = self.feature(code) else {
            return WidgetUpdate::default();
        };
        let focus_center = feature.bounds().map(|b| b.center());

        let focus = match self.selection.toggle(code) {
            SelectionChange::Selected => Some(FocusRequest {
                geocode: code.to_string(),
                center: focus_center,
                bring_to_front: self.supports_reordering,
            }),
            SelectionChange::Unselected => None,
        };

        WidgetUpdate {
            fills_changed: false,
            selection_changed: true,
            panel_changed: true,
            focus,
        }
    }

    /// Switch the displayed year. Selection is kept.
    pub fn on_year_change(&mut self, year: i32) -> WidgetUpdate {
        self.current_year = year;
        self.refresh_fills();
        WidgetUpdate {
            fills_changed: true,
            selection_changed: false,
            panel_changed: true,
            focus: None,
        }
    }

    fn on_panel_item_closed(&mut self, code: &str) -> WidgetUpdate {
        let removed = self.selection.unselect(code);
        WidgetUpdate {
            fills_changed: false,
            selection_changed: removed,
            panel_changed: removed,
            focus: None,
        }
    }

    fn rebuild_lookup(&mut self) {
        self.lookup.clear();
        for (layer_index, layer) in self.layers.iter().enumerate() {
            if let LayerState::Loaded(features) = layer {
                for (feature_index, feature) in features.iter().enumerate() {
                    self.lookup
                        .entry(feature.geocode.clone())
                        .or_insert((layer_index, feature_index));
                }
            }
        }
    }

    fn refresh_fills(&mut self) {
        let year = self.current_year;
        let scale = &self.scale;
        self.fills = self
            .layers
            .iter()
            .filter_map(|layer| match layer {
                LayerState::Loaded(features) => Some(features),
                _ => None,
            })
            .flatten()
            .map(|f| (f.geocode.clone(), scale.color_for(f.value_for(year))))
            .collect();
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn scale(&self) -> &ColorScale {
        &self.scale
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn current_year(&self) -> i32 {
        self.current_year
    }

    /// Distinct years in the dataset, ascending.
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    pub fn year_range(&self) -> Option<YearRange> {
        YearRange::from_years(&self.years)
    }

    pub fn feature(&self, code: &str) -> Option<&Feature> {
        let (layer, index) = *self.lookup.get(code)?;
        match &self.layers[layer] {
            LayerState::Loaded(features) => features.get(index),
            _ => None,
        }
    }

    /// Features of a loaded layer; empty while pending or after a failure.
    pub fn layer_features(&self, layer: usize) -> &[Feature] {
        match self.layers.get(layer) {
            Some(LayerState::Loaded(features)) => features,
            _ => &[],
        }
    }

    pub fn layer_error(&self, layer: usize) -> Option<&LoadError> {
        match self.layers.get(layer) {
            Some(LayerState::Failed(error)) => Some(error),
            _ => None,
        }
    }

    pub fn failures(&self) -> Vec<LayerFailure> {
        self.config
            .geo_layers
            .iter()
            .enumerate()
            .filter_map(|(index, layer)| {
                self.layer_error(index).map(|error| LayerFailure {
                    index,
                    service_url: layer.service_url.clone(),
                    error: error.clone(),
                })
            })
            .collect()
    }

    /// Fill for `code` in the current year.
    pub fn fill_for(&self, code: &str) -> Color {
        self.fills
            .get(code)
            .copied()
            .unwrap_or_else(|| self.scale.no_value_color())
    }

    pub fn style_for(&self, layer: usize, code: &str) -> Option<StyleOptions> {
        let config = self.config.geo_layers.get(layer)?;
        Some(if self.selection.is_selected(code) {
            config.selected_style()
        } else {
            config.style_options.clone()
        })
    }

    pub fn info_rows(&self) -> Vec<InfoRow> {
        build_rows(
            self.selection.all_selected(),
            |code| self.feature(code),
            self.current_year,
            self.scale.domain(),
        )
    }

    pub fn legend(&self) -> Legend {
        legend(&self.scale)
    }

    /// Permanent label for a selected feature, when labels are enabled.
    pub fn selection_label(&self, code: &str) -> Option<String> {
        if !self.config.show_selection_labels || !self.selection.is_selected(code) {
            return None;
        }
        let feature = self.feature(code)?;
        Some(selection_label(&feature.name, feature.value_for(self.current_year)))
    }

    /// Loaded layers drawn at `zoom`.
    pub fn visible_layers(&self, zoom: f64) -> Vec<usize> {
        zoom::visible_layers(&self.config.geo_layers, zoom)
            .into_iter()
            .filter(|index| matches!(self.layers.get(*index), Some(LayerState::Loaded(_))))
            .collect()
    }

    /// Bounding box of every feature in the layers visible at `zoom`.
    pub fn visible_bounds(&self, zoom: f64) -> Option<Bounds> {
        self.visible_layers(zoom)
            .into_iter()
            .flat_map(|layer| self.layer_features(layer))
            .filter_map(Feature::bounds)
            .reduce(Bounds::union)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::color::{DEFAULT_HIGH_COLOR, DEFAULT_LOW_COLOR, DEFAULT_NO_VALUE_COLOR};
    use crate::config::GeoLayerConfig;
    use crate::timeline::timestamp_ms_for_year;

    fn square(code: &str, name: &str, lon: f64, lat: f64) -> serde_json::Value {
        json!({
            "type": "Feature",
            "properties": {"code": code, "label": name},
            "geometry": {
                "type": "Polygon",
                "coordinates": [[[lon, lat], [lon + 1.0, lat], [lon + 1.0, lat + 1.0], [lon, lat + 1.0], [lon, lat]]]
            }
        })
    }

    fn document(features: Vec<serde_json::Value>) -> GeoDocument {
        serde_json::from_value(json!({"type": "FeatureCollection", "features": features}))
            .expect("geo document")
    }

    fn config(layers: usize) -> MapConfig {
        let mut geo_layers: Vec<GeoLayerConfig> = (0..layers)
            .map(|i| GeoLayerConfig::new(format!("layer{i}.geojson"), "code", "label"))
            .collect();
        if layers > 1 {
            geo_layers[0].max_zoom = 6.0;
            geo_layers[1].min_zoom = 7.0;
        }
        MapConfig {
            geo_layers,
            ..MapConfig::default()
        }
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new("A", 2015, 0.0),
            Record::new("A", 2016, 100.0),
            Record::new("B", 2016, 50.0),
        ]
    }

    fn loaded_widget() -> MapWidget {
        let mut widget = MapWidget::new(config(1), records()).expect("widget");
        widget
            .load_layers(vec![Ok(document(vec![
                square("A", "Alpha", 0.0, 0.0),
                square("B", "Beta", 2.0, 0.0),
            ]))])
            .expect("load");
        widget
    }

    #[test]
    fn construction_requires_geo_layers() {
        let err = MapWidget::new(MapConfig::default(), records()).expect_err("no layers");
        assert_eq!(
            err,
            WidgetError::Configuration(crate::error::ConfigurationError::NoGeoLayers)
        );
        assert_eq!(err.to_string(), "map disabled, no geoLayers in options");
    }

    #[test]
    fn construction_requires_data() {
        let err = MapWidget::new(config(1), Vec::new()).expect_err("no data");
        assert_eq!(err, WidgetError::NoData(crate::error::NoDataError));
    }

    #[test]
    fn starts_at_earliest_year_with_scale_over_all_years() {
        let widget = loaded_widget();
        assert_eq!(widget.current_year(), 2015);
        assert_eq!(widget.years(), &[2015, 2016]);
        assert_eq!(widget.scale().domain(), (0.0, 100.0));
        assert_eq!(widget.year_range(), Some(YearRange::new(2015, 2016)));
    }

    #[test]
    fn fills_follow_the_current_year() {
        let mut widget = loaded_widget();
        assert_eq!(widget.fill_for("A"), DEFAULT_LOW_COLOR);
        assert_eq!(widget.fill_for("B"), DEFAULT_NO_VALUE_COLOR);

        let update = widget.handle(WidgetEvent::YearChanged(2016));
        assert!(update.fills_changed);
        assert_eq!(widget.fill_for("A"), DEFAULT_HIGH_COLOR);
        assert_ne!(widget.fill_for("B"), DEFAULT_NO_VALUE_COLOR);
        assert_eq!(widget.fill_for("unknown"), DEFAULT_NO_VALUE_COLOR);
    }

    #[test]
    fn click_toggles_and_requests_focus_on_select() {
        let mut widget = loaded_widget();

        let update = widget.handle(WidgetEvent::FeatureClicked("B".to_string()));
        assert!(update.panel_changed);
        let focus = update.focus.expect("focus request");
        assert_eq!(focus.geocode, "B");
        assert_eq!(focus.center, Some((2.5, 0.5)));
        assert!(focus.bring_to_front);
        assert!(widget.selection().is_selected("B"));

        let update = widget.handle(WidgetEvent::FeatureClicked("B".to_string()));
        assert!(update.panel_changed);
        assert_eq!(update.focus, None);
        assert!(widget.selection().is_empty());
    }

    #[test]
    fn hosts_without_reordering_skip_bring_to_front() {
        let mut widget = loaded_widget().with_reordering(false);
        let update = widget.on_feature_click("A");
        assert!(!update.focus.expect("focus").bring_to_front);
    }

    #[test]
    fn clicks_on_unknown_codes_are_ignored() {
        let mut widget = loaded_widget();
        assert!(widget.on_feature_click("nope").is_empty());
        assert!(widget.selection().is_empty());
    }

    #[test]
    fn info_panel_lists_selection_in_order_with_missing_values() {
        let mut widget = loaded_widget();
        widget.on_feature_click("A");
        widget.on_feature_click("B");

        let rows = widget.info_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].name.as_str(), rows[0].value), ("Alpha", Some(0.0)));
        assert_eq!(rows[0].percentage, Some(0));
        assert_eq!((rows[1].name.as_str(), rows[1].value), ("Beta", None));
        assert!(!rows[1].has_bar());
    }

    #[test]
    fn year_change_keeps_selection() {
        let mut widget = loaded_widget();
        widget.on_feature_click("B");
        widget.on_feature_click("A");
        let before = widget.selection().clone();

        let update = widget.handle(WidgetEvent::TimeChanged {
            timestamp_ms: timestamp_ms_for_year(2016).expect("timestamp"),
        });

        assert_eq!(widget.current_year(), 2016);
        assert!(!update.selection_changed);
        assert_eq!(widget.selection(), &before);
        let rows = widget.info_rows();
        assert_eq!(rows[0].percentage, Some(50));
        assert_eq!(rows[1].percentage, Some(100));
    }

    #[test]
    fn closing_a_panel_row_unselects() {
        let mut widget = loaded_widget();
        widget.on_feature_click("A");
        let update = widget.handle(WidgetEvent::PanelItemClosed("A".to_string()));
        assert!(update.selection_changed);
        assert!(widget.info_rows().is_empty());

        let update = widget.handle(WidgetEvent::PanelItemClosed("A".to_string()));
        assert!(update.is_empty());
    }

    #[test]
    fn selected_features_use_selected_style_and_labels() {
        let mut widget = loaded_widget();
        widget.on_feature_click("A");
        let selected = widget.style_for(0, "A").expect("style");
        let plain = widget.style_for(0, "B").expect("style");
        assert_eq!(selected.color.to_hex(), "#111111");
        assert_eq!(plain.color.to_hex(), "#888888");

        assert_eq!(widget.selection_label("A").as_deref(), Some("Alpha: 0"));
        assert_eq!(widget.selection_label("B"), None);
    }

    #[test]
    fn partial_load_renders_loaded_layers_and_reports_failures() {
        let mut widget = MapWidget::new(config(2), records()).expect("widget");
        let report = widget
            .load_layers(vec![
                Ok(document(vec![square("A", "Alpha", 0.0, 0.0)])),
                Err(LoadError::Http { status: 502 }),
            ])
            .expect("partial load");

        assert_eq!(report.loaded, vec![0]);
        assert_eq!(report.failures[0].service_url, "layer1.geojson");
        let warning = report.warning().expect("warning");
        assert!(warning.contains("layer1.geojson"));
        assert!(warning.contains("HTTP 502"));

        assert_eq!(widget.layer_error(1), Some(&LoadError::Http { status: 502 }));
        assert_eq!(widget.failures().len(), 1);
        assert_eq!(widget.visible_layers(5.0), vec![0]);
        assert!(widget.visible_layers(9.0).is_empty());
    }

    #[test]
    fn all_layers_failing_is_an_error() {
        let mut widget = MapWidget::new(config(2), records()).expect("widget");
        let err = widget
            .load_layers(vec![
                Err(LoadError::Network("offline".to_string())),
                Err(LoadError::Parse("bad json".to_string())),
            ])
            .expect_err("nothing loaded");
        match err {
            WidgetError::AllLayersFailed(failures) => assert_eq!(failures.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn missing_results_count_as_failures() {
        let mut widget = MapWidget::new(config(2), records()).expect("widget");
        let report = widget
            .load_layers(vec![Ok(document(vec![square("A", "Alpha", 0.0, 0.0)]))])
            .expect("partial load");
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
    }

    #[test]
    fn visible_bounds_cover_visible_layers() {
        let widget = loaded_widget();
        let bounds = widget.visible_bounds(5.0).expect("bounds");
        assert_eq!(
            (bounds.min_lon, bounds.min_lat, bounds.max_lon, bounds.max_lat),
            (0.0, 0.0, 3.0, 1.0)
        );
        assert_eq!(widget.visible_bounds(25.0), None);
    }
}
