use std::path::Path;

use choropleth_shared::{MapBootstrap, MapConfig, Record};
use tracing::{info, warn};

use crate::config::{MAP_CONFIG_FILE, RECORDS_FILE};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Read widget options and the dataset from `data_dir`.
///
/// Options failing validation are still served so the client can report the
/// diagnostic itself.
pub async fn load(data_dir: &Path) -> Result<MapBootstrap, BoxError> {
    let config_path = data_dir.join(MAP_CONFIG_FILE);
    let raw = tokio::fs::read(&config_path)
        .await
        .map_err(|e| format!("read {}: {e}", config_path.display()))?;
    let config: MapConfig = serde_json::from_slice(&raw)
        .map_err(|e| format!("parse {}: {e}", config_path.display()))?;

    let records_path = data_dir.join(RECORDS_FILE);
    let raw = tokio::fs::read(&records_path)
        .await
        .map_err(|e| format!("read {}: {e}", records_path.display()))?;
    let records: Vec<Record> = serde_json::from_slice(&raw)
        .map_err(|e| format!("parse {}: {e}", records_path.display()))?;

    if let Err(e) = config.validate() {
        warn!(error = %e, path = %config_path.display(), "map options are not usable");
    }
    info!(
        geo_layers = config.geo_layers.len(),
        records = records.len(),
        "loaded map bootstrap from {}",
        data_dir.display()
    );

    Ok(MapBootstrap { config, records })
}
