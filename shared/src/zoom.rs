use crate::config::GeoLayerConfig;

/// A layer is drawn when the zoom level lies inside its inclusive range.
pub fn is_visible(min_zoom: f64, max_zoom: f64, zoom: f64) -> bool {
    min_zoom <= zoom && zoom <= max_zoom
}

/// Indices of `layers` drawn at `zoom`, in configuration order.
pub fn visible_layers(layers: &[GeoLayerConfig], zoom: f64) -> Vec<usize> {
    layers
        .iter()
        .enumerate()
        .filter(|(_, layer)| is_visible(layer.min_zoom, layer.max_zoom, zoom))
        .map(|(index, _)| index)
        .collect()
}
