use thiserror::Error;

/// Returned when a color scale is requested for a dataset without any finite value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot build a color scale from an empty dataset")]
pub struct NoDataError;

/// Widget options that make the map unusable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("map disabled, no geoLayers in options")]
    NoGeoLayers,
    #[error("colorClasses must be at least 1")]
    ZeroColorClasses,
    #[error("minZoom {min} is greater than maxZoom {max}")]
    InvalidZoomRange { min: f64, max: f64 },
    #[error("geo layer {index} has min_zoom {min} greater than max_zoom {max}")]
    InvalidLayerZoomRange { index: usize, min: f64, max: f64 },
    #[error("geo layer {index} has an empty idProperty")]
    MissingIdProperty { index: usize },
}

/// Failure to obtain a geo layer document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    #[error("HTTP {status}")]
    Http { status: u16 },
    #[error("fetch error: {0}")]
    Network(String),
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid color '{input}', expected #rgb or #rrggbb")]
pub struct ColorParseError {
    pub input: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum WidgetError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    NoData(#[from] NoDataError),
    #[error("none of the {} configured geo layers could be loaded", .0.len())]
    AllLayersFailed(Vec<LayerFailure>),
}

/// A configured layer whose document could not be loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerFailure {
    pub index: usize,
    pub service_url: String,
    pub error: LoadError,
}
