use std::path::{Component, Path, PathBuf};

use bytes::Bytes;
use choropleth_shared::error::LoadError;
use choropleth_shared::{GeoDocument, GeoLayerConfig};
use futures::future::join_all;
use tracing::{info, warn};

use crate::state::LayerPayload;

/// Load every configured layer concurrently. The result has one entry per layer.
pub async fn load_all(
    client: &reqwest::Client,
    data_dir: &Path,
    layers: &[GeoLayerConfig],
) -> Vec<LayerPayload> {
    let fetches = layers
        .iter()
        .map(|layer| load_layer(client, data_dir, &layer.service_url));
    let results = join_all(fetches).await;

    results
        .into_iter()
        .enumerate()
        .map(|(index, result)| match result {
            Ok(json) => {
                info!(layer = index, bytes = json.len(), "geo layer loaded");
                LayerPayload::ready(index, json)
            }
            Err(e) => {
                warn!(
                    layer = index,
                    service_url = %layers[index].service_url,
                    error = %e,
                    "geo layer failed to load"
                );
                LayerPayload::Failed(e)
            }
        })
        .collect()
}

/// Fetch `source` over HTTP when it is a URL, otherwise read it below `data_dir`.
///
/// The payload must parse as a geo document.
pub async fn load_layer(
    client: &reqwest::Client,
    data_dir: &Path,
    source: &str,
) -> Result<Bytes, LoadError> {
    let json = if is_remote(source) {
        fetch_remote(client, source).await?
    } else {
        let path = local_path(data_dir, source)
            .ok_or_else(|| LoadError::Network(format!("refusing path outside data dir: {source}")))?;
        tokio::fs::read(&path)
            .await
            .map(Bytes::from)
            .map_err(|e| LoadError::Network(format!("read {}: {e}", path.display())))?
    };

    serde_json::from_slice::<GeoDocument>(&json).map_err(|e| LoadError::Parse(e.to_string()))?;
    Ok(json)
}

async fn fetch_remote(client: &reqwest::Client, url: &str) -> Result<Bytes, LoadError> {
    let resp = client
        .get(url)
        .send()
        .await
        .map_err(|e| LoadError::Network(e.to_string()))?;
    if !resp.status().is_success() {
        return Err(LoadError::Http {
            status: resp.status().as_u16(),
        });
    }
    resp.bytes()
        .await
        .map_err(|e| LoadError::Network(e.to_string()))
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Resolve a relative source below `data_dir`; parent components are rejected.
fn local_path(data_dir: &Path, source: &str) -> Option<PathBuf> {
    let relative = Path::new(source.trim_start_matches('/'));
    let safe = relative
        .components()
        .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    safe.then(|| data_dir.join(relative))
}
