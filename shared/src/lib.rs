pub mod color;
pub mod config;
pub mod error;
pub mod feature;
pub mod geo;
pub mod info_panel;
pub mod record;
pub mod selection;
pub mod timeline;
pub mod widget;
pub mod zoom;

pub use color::{Color, ColorMode, ColorScale, classify};
pub use config::{GeoLayerConfig, MapBootstrap, MapConfig, StyleOptions};
pub use error::*;
pub use feature::{Feature, prepare_features};
pub use geo::{Bounds, GeoDocument, Geometry};
pub use info_panel::{InfoRow, Legend};
pub use record::Record;
pub use selection::{Selection, SelectionChange};
pub use widget::{FocusRequest, LoadReport, MapWidget, WidgetEvent, WidgetUpdate};
