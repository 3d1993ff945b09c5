use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use choropleth_shared::MapBootstrap;
use choropleth_shared::error::LoadError;
use tracing::warn;

use crate::config::{client_dist_dir, upstream_connect_timeout, upstream_http_timeout};

/// A configured geo layer as loaded at startup.
#[derive(Debug, Clone)]
pub enum LayerPayload {
    Ready { json: Bytes, etag: String },
    Failed(LoadError),
}

impl LayerPayload {
    pub fn ready(index: usize, json: Bytes) -> Self {
        let etag = format!("\"geo-{index}-{:08x}\"", crc32fast::hash(&json));
        Self::Ready { json, etag }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Widget bootstrap serialized once at startup.
#[derive(Debug, Clone)]
pub struct BootstrapPayload {
    pub json: Bytes,
    pub etag: String,
    pub record_count: usize,
}

impl BootstrapPayload {
    pub fn new(bootstrap: &MapBootstrap) -> Result<Self, serde_json::Error> {
        let json = Bytes::from(serde_json::to_vec(bootstrap)?);
        let etag = format!("\"map-{:08x}\"", crc32fast::hash(&json));
        Ok(Self {
            json,
            etag,
            record_count: bootstrap.records.len(),
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub bootstrap: Arc<BootstrapPayload>,
    /// One entry per configured geo layer, in configuration order.
    pub layers: Arc<Vec<LayerPayload>>,
    pub static_dir: PathBuf,
    pub started_at: chrono::DateTime<chrono::Utc>,
}

impl AppState {
    pub fn new(bootstrap: BootstrapPayload, layers: Vec<LayerPayload>) -> Self {
        Self {
            bootstrap: Arc::new(bootstrap),
            layers: Arc::new(layers),
            static_dir: client_dist_dir(),
            started_at: chrono::Utc::now(),
        }
    }

    pub fn layers_loaded(&self) -> usize {
        self.layers.iter().filter(|layer| layer.is_ready()).count()
    }

    pub fn layers_failed(&self) -> usize {
        self.layers.len() - self.layers_loaded()
    }
}

/// Client used to fetch remote geo layers.
pub fn build_http_client() -> Result<reqwest::Client, reqwest::Error> {
    let request_timeout = upstream_http_timeout();
    let connect_timeout = upstream_connect_timeout();
    reqwest::Client::builder()
        .user_agent("choropleth-map/0.1")
        .timeout(request_timeout)
        .connect_timeout(connect_timeout)
        .build()
        .or_else(|e| {
            warn!(
                error = %e,
                "failed to build configured HTTP client, retrying without custom user-agent"
            );
            reqwest::Client::builder()
                .timeout(request_timeout)
                .connect_timeout(connect_timeout)
                .build()
        })
}
