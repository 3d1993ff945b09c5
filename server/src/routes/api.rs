use axum::Json;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::config::{BOOTSTRAP_CACHE_CONTROL, GEO_LAYER_CACHE_CONTROL};
use crate::state::{AppState, LayerPayload};

pub async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "layers_loaded": state.layers_loaded(),
        "layers_failed": state.layers_failed(),
        "records": state.bootstrap.record_count,
        "started_at": state.started_at.to_rfc3339(),
    }))
}

/// Widget options plus dataset, serialized once at startup.
pub async fn get_map(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let bootstrap = &state.bootstrap;
    cached_json(
        &headers,
        &bootstrap.json,
        &bootstrap.etag,
        BOOTSTRAP_CACHE_CONTROL,
    )
}

pub async fn get_geo_layer(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    headers: HeaderMap,
) -> Response {
    match state.layers.get(index) {
        Some(LayerPayload::Ready { json, etag }) => {
            cached_json(&headers, json, etag, GEO_LAYER_CACHE_CONTROL)
        }
        Some(LayerPayload::Failed(error)) => error_response(
            StatusCode::BAD_GATEWAY,
            &format!("geo layer {index} unavailable: {error}"),
        ),
        None => error_response(
            StatusCode::NOT_FOUND,
            &format!("no geo layer configured at index {index}"),
        ),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response {
    let mut response = Json(serde_json::json!({ "error": message })).into_response();
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}

/// Serve a prebuilt JSON payload, or `304` when the client already holds this version.
fn cached_json(
    request: &HeaderMap,
    body: &Bytes,
    etag: &str,
    cache_control: &'static str,
) -> Response {
    let mut response = if etag_matches(request, etag) {
        StatusCode::NOT_MODIFIED.into_response()
    } else {
        let mut response = Response::new(Body::from(body.clone()));
        response.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        response
    };

    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(cache_control));
    if let Ok(value) = HeaderValue::from_str(etag) {
        headers.insert(header::ETAG, value);
    }
    response
}

/// Weak comparison against every tag listed in `If-None-Match`.
fn etag_matches(request: &HeaderMap, etag: &str) -> bool {
    let strip = |tag: &str| tag.trim().trim_start_matches("W/").to_owned();
    let current = strip(etag);

    request
        .get_all(header::IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|raw| raw.split(','))
        .any(|candidate| candidate.trim() == "*" || strip(candidate) == current)
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use bytes::Bytes;
    use choropleth_shared::error::LoadError;
    use choropleth_shared::{GeoLayerConfig, MapBootstrap, MapConfig, Record};

    use super::etag_matches;
    use crate::state::{AppState, BootstrapPayload, LayerPayload};

    const REGIONS: &[u8] = br#"{"type":"FeatureCollection","features":[]}"#;

    fn test_state() -> AppState {
        let bootstrap = MapBootstrap {
            config: MapConfig {
                geo_layers: vec![
                    GeoLayerConfig::new("geo/regions.geojson", "id", "name"),
                    GeoLayerConfig::new("https://example.invalid/districts.geojson", "id", "name"),
                ],
                ..MapConfig::default()
            },
            records: vec![Record::new("A", 2015, 1.0), Record::new("B", 2015, 2.0)],
        };
        AppState::new(
            BootstrapPayload::new(&bootstrap).expect("serialize bootstrap"),
            vec![
                LayerPayload::ready(0, Bytes::from_static(REGIONS)),
                LayerPayload::Failed(LoadError::Http { status: 503 }),
            ],
        )
    }

    async fn spawn_test_server(state: AppState) -> (SocketAddr, tokio::task::JoinHandle<()>) {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let app = crate::app::build_app(state);
        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.expect("serve test app");
        });
        (addr, handle)
    }

    #[test]
    fn etag_match_accepts_weak_tags_and_lists() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            axum::http::header::IF_NONE_MATCH,
            axum::http::HeaderValue::from_static("\"geo-1-00000000\", W/\"map-0000002a\""),
        );
        assert!(etag_matches(&headers, "\"map-0000002a\""));
        assert!(!etag_matches(&headers, "\"map-00000000\""));
        assert!(!etag_matches(&axum::http::HeaderMap::new(), "\"map-0000002a\""));
    }

    #[tokio::test]
    async fn health_reports_layer_and_record_counts() {
        let (addr, server_handle) = spawn_test_server(test_state()).await;

        let health = reqwest::Client::new()
            .get(format!("http://{addr}/api/health"))
            .send()
            .await
            .expect("health request")
            .error_for_status()
            .expect("health status")
            .json::<serde_json::Value>()
            .await
            .expect("parse health");

        assert_eq!(health.get("status").and_then(|v| v.as_str()), Some("ok"));
        assert_eq!(health.get("layers_loaded").and_then(|v| v.as_u64()), Some(1));
        assert_eq!(health.get("layers_failed").and_then(|v| v.as_u64()), Some(1));
        assert_eq!(health.get("records").and_then(|v| v.as_u64()), Some(2));

        server_handle.abort();
        let _ = server_handle.await;
    }

    #[tokio::test]
    async fn map_endpoint_serves_bootstrap_and_honours_etag() {
        let (addr, server_handle) = spawn_test_server(test_state()).await;
        let base_url = format!("http://{addr}");
        let client = reqwest::Client::new();

        let first = client
            .get(format!("{base_url}/api/map"))
            .send()
            .await
            .expect("map request should succeed");
        assert_eq!(first.status(), reqwest::StatusCode::OK);
        let etag = first
            .headers()
            .get(reqwest::header::ETAG)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
            .expect("etag header should be present");
        let bootstrap: MapBootstrap = first.json().await.expect("bootstrap JSON");
        assert_eq!(bootstrap.config.geo_layers.len(), 2);
        assert_eq!(bootstrap.records.len(), 2);
        assert_eq!(bootstrap.config.color_classes, 5);

        let second = client
            .get(format!("{base_url}/api/map"))
            .header(reqwest::header::IF_NONE_MATCH, etag)
            .send()
            .await
            .expect("conditional map request should succeed");
        assert_eq!(second.status(), reqwest::StatusCode::NOT_MODIFIED);
        assert_eq!(
            second
                .headers()
                .get(reqwest::header::CACHE_CONTROL)
                .and_then(|value| value.to_str().ok()),
            Some("public, max-age=60")
        );

        server_handle.abort();
        let _ = server_handle.await;
    }

    #[tokio::test]
    async fn geo_endpoint_serves_loaded_layers_and_reports_failures() {
        let (addr, server_handle) = spawn_test_server(test_state()).await;
        let base_url = format!("http://{addr}");
        let client = reqwest::Client::new();

        let loaded = client
            .get(format!("{base_url}/api/geo/0"))
            .send()
            .await
            .expect("geo request should succeed");
        assert_eq!(loaded.status(), reqwest::StatusCode::OK);
        assert!(loaded.headers().get(reqwest::header::ETAG).is_some());
        assert_eq!(
            loaded.bytes().await.expect("geo body"),
            Bytes::from_static(REGIONS)
        );

        let failed = client
            .get(format!("{base_url}/api/geo/1"))
            .send()
            .await
            .expect("geo request should succeed");
        assert_eq!(failed.status(), reqwest::StatusCode::BAD_GATEWAY);
        let body: serde_json::Value = failed.json().await.expect("error JSON");
        let message = body["error"].as_str().expect("error message");
        assert!(message.contains("HTTP 503"));

        let missing = client
            .get(format!("{base_url}/api/geo/7"))
            .send()
            .await
            .expect("geo request should succeed");
        assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

        server_handle.abort();
        let _ = server_handle.await;
    }
}
