use choropleth_shared::error::LoadError;
use choropleth_shared::{GeoDocument, MapBootstrap};
use futures::future::join_all;

/// Fetch widget options and the dataset.
pub async fn fetch_bootstrap() -> Result<MapBootstrap, LoadError> {
    let resp = gloo_net::http::Request::get("/api/map")
        .send()
        .await
        .map_err(|e| LoadError::Network(e.to_string()))?;

    if !resp.ok() {
        return Err(LoadError::Http {
            status: resp.status(),
        });
    }

    resp.json::<MapBootstrap>()
        .await
        .map_err(|e| LoadError::Parse(e.to_string()))
}

/// Fetch one geo layer document as served by the host.
pub async fn fetch_layer(index: usize) -> Result<GeoDocument, LoadError> {
    let url = format!("/api/geo/{index}");
    let resp = gloo_net::http::Request::get(&url)
        .send()
        .await
        .map_err(|e| LoadError::Network(e.to_string()))?;

    if !resp.ok() {
        if let Ok(body) = resp.json::<serde_json::Value>().await
            && let Some(message) = body.get("error").and_then(|v| v.as_str())
        {
            web_sys::console::warn_1(&format!("geo layer {index}: {message}").into());
        }
        return Err(LoadError::Http {
            status: resp.status(),
        });
    }

    resp.json::<GeoDocument>()
        .await
        .map_err(|e| LoadError::Parse(e.to_string()))
}

/// Fetch every layer concurrently. Resolves once all requests settle, in layer order.
pub async fn fetch_layers(count: usize) -> Vec<Result<GeoDocument, LoadError>> {
    join_all((0..count).map(fetch_layer)).await
}
