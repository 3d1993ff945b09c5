use crate::color::{Color, ColorScale};
use crate::feature::Feature;

/// Extra room between a name label and a value label pushed past it.
pub const VALUE_LABEL_PADDING: f64 = 25.0;
/// Horizontal room kept between the panel and the map edge.
pub const PANEL_WIDTH_PADDING: f64 = 20.0;
/// Vertical room kept between the map and the window edge.
pub const MAP_HEIGHT_PADDING: f64 = 50.0;

/// One line of the info panel.
#[derive(Debug, Clone, PartialEq)]
pub struct InfoRow {
    pub geocode: String,
    pub name: String,
    pub value: Option<f64>,
    /// Bar length in percent of the value range. Only set when `value` is.
    pub percentage: Option<i64>,
}

impl InfoRow {
    pub fn has_bar(&self) -> bool {
        self.percentage.is_some()
    }

    pub fn value_label(&self) -> Option<String> {
        self.value.map(format_value)
    }
}

/// Rows for the selected features, in selection order.
///
/// Codes that do not resolve to a feature are skipped.
pub fn build_rows<'a, F>(selected: &[String], lookup: F, year: i32, domain: (f64, f64)) -> Vec<InfoRow>
where
    F: Fn(&str) -> Option<&'a Feature>,
{
    selected
        .iter()
        .filter_map(|code| lookup(code.as_str()))
        .map(|feature| {
            let value = feature.value_for(year);
            InfoRow {
                geocode: feature.geocode.clone(),
                name: feature.name.clone(),
                value,
                percentage: value.map(|v| percentage(v, domain)),
            }
        })
        .collect()
}

/// Position of `value` inside `(min, max)` in whole percent.
///
/// Not clamped: values outside the range give percentages outside 0..=100.
pub fn percentage(value: f64, (min, max): (f64, f64)) -> i64 {
    let span = max - min;
    if span == 0.0 || !span.is_finite() {
        return 0;
    }
    (100.0 * (value - min) / span).round() as i64
}

/// How far to push the value label so it clears the name label.
///
/// `None` when the bar is at least as wide as the name.
pub fn value_label_offset(name_width: f64, bar_width: f64) -> Option<f64> {
    (bar_width < name_width).then(|| name_width - bar_width + VALUE_LABEL_PADDING)
}

pub fn format_value(value: f64) -> String {
    format!("{value}")
}

/// Permanent label shown next to a selected feature.
pub fn selection_label(name: &str, value: Option<f64>) -> String {
    match value {
        Some(value) => format!("{name}: {}", format_value(value)),
        None => name.to_string(),
    }
}

/// Legend strip: one swatch per class, highest first, with the range ends.
#[derive(Debug, Clone, PartialEq)]
pub struct Legend {
    pub swatches: Vec<Color>,
    pub swatch_width_percent: f64,
    /// Label at the high (left) end.
    pub max_label: String,
    /// Label at the low (right) end.
    pub min_label: String,
}

pub fn legend(scale: &ColorScale) -> Legend {
    let mut swatches = scale.class_colors();
    swatches.reverse();
    let (min, max) = scale.domain();
    Legend {
        swatch_width_percent: 100.0 / swatches.len() as f64,
        swatches,
        max_label: format_value(max),
        min_label: format_value(min),
    }
}

/// Width the panel must shrink to so it fits inside the map, if it is too wide.
pub fn clamp_panel_width(panel_width: f64, map_width: f64) -> Option<f64> {
    let max_width = map_width - PANEL_WIDTH_PADDING;
    (panel_width > max_width).then_some(max_width.max(0.0))
}

/// Height the map must shrink to so it fits inside the window, if it is too tall.
pub fn clamp_map_height(map_height: f64, window_height: f64) -> Option<f64> {
    let max_height = window_height - MAP_HEIGHT_PADDING;
    (map_height > max_height).then_some(max_height.max(0.0))
}
