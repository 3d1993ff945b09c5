use std::path::Path;

use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
};
use tower_http::compression::CompressionLayer;
use tower_http::services::ServeDir;

use crate::config::{BUNDLE_CACHE_CONTROL, ENTRY_CACHE_CONTROL, MEDIA_CACHE_CONTROL};
use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let static_assets = Router::new()
        .fallback_service(
            ServeDir::new(&state.static_dir)
                .precompressed_br()
                .precompressed_gzip(),
        )
        .layer(middleware::from_fn(set_static_cache_control));

    let app = Router::new()
        .route("/api/map", axum::routing::get(routes::api::get_map))
        .route(
            "/api/geo/{index}",
            axum::routing::get(routes::api::get_geo_layer),
        )
        .route("/api/health", axum::routing::get(routes::api::health));

    app.layer(CompressionLayer::new())
        .fallback_service(static_assets)
        .with_state(state)
}

async fn set_static_cache_control(request: Request, next: Next) -> Response {
    let asset = StaticAsset::classify(request.uri().path());
    let mut response = next.run(request).await;

    if response.status().is_success()
        && let Some(cache_control) = asset.cache_control()
    {
        response.headers_mut().insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(cache_control),
        );
    }

    response
}

/// Kinds of files the client bundle directory holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StaticAsset {
    /// Trunk output with a content hash in its name.
    HashedBundle,
    /// Fonts and images referenced by the page.
    Media,
    /// `index.html`, which names the current bundle.
    Entry,
    Other,
}

impl StaticAsset {
    fn classify(path: &str) -> Self {
        let path = Path::new(path);
        let file_name = path.file_name().and_then(|name| name.to_str());
        let ext = path.extension().and_then(|ext| ext.to_str());

        match (file_name, ext) {
            (None, _) | (Some("index.html"), _) => Self::Entry,
            (Some(name), Some("wasm" | "js" | "css")) if has_content_hash(name) => {
                Self::HashedBundle
            }
            (_, Some("woff" | "woff2" | "ttf" | "png" | "svg" | "jpg" | "webp" | "ico")) => {
                Self::Media
            }
            _ => Self::Other,
        }
    }

    fn cache_control(self) -> Option<&'static str> {
        match self {
            Self::HashedBundle => Some(BUNDLE_CACHE_CONTROL),
            Self::Media => Some(MEDIA_CACHE_CONTROL),
            Self::Entry => Some(ENTRY_CACHE_CONTROL),
            Self::Other => None,
        }
    }
}

fn has_content_hash(file_name: &str) -> bool {
    file_name
        .split(['-', '_', '.'])
        .any(|segment| segment.len() >= 8 && segment.chars().all(|c| c.is_ascii_hexdigit()))
}
