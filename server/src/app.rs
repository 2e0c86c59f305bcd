use axum::{
    Router,
    extract::Request,
    http::{HeaderValue, header},
    middleware::{self, Next},
    response::Response,
    routing::{MethodRouter, get},
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;

use crate::routes;
use crate::state::AppState;

pub(crate) fn build_app(state: AppState) -> Router {
    let static_assets = Router::new()
        .fallback_service(
            ServeDir::new(&state.static_dir)
                .precompressed_br()
                .precompressed_gzip(),
        )
        .layer(middleware::from_fn(set_dist_cache_control));

    let app = Router::new()
        .route(
            "/data/opportunity.geojson",
            get(routes::data::get_opportunity_geojson),
        )
        .route("/api/health", get(routes::api::health))
        .route("/healthz", get(routes::api::healthz));

    // Listing and kernel config answer at the top level as well as under
    // `/api`, with or without the trailing slash.
    let app = ["", "/api"].into_iter().fold(app, |app, prefix| {
        let subzones = format!("{prefix}/subzones");
        let config = format!("{prefix}/config");
        app.route(&subzones, get(routes::api::get_subzones))
            .route(&format!("{subzones}/"), get(routes::api::get_subzones))
            .route(&config, config_routes())
            .route(&format!("{config}/"), config_routes())
    });

    app.layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .fallback_service(static_assets)
        .with_state(state)
}

fn config_routes() -> MethodRouter<AppState> {
    get(routes::api::get_config).put(routes::api::put_config)
}

/// Cache class of a file served from the client dist dir.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DistAsset {
    /// Trunk output carrying a content fingerprint in its name.
    Fingerprinted,
    /// The page shell; must be revalidated so new deploys are picked up.
    Page,
    Other,
}

impl DistAsset {
    fn classify(path: &str) -> Self {
        if path.ends_with('/') || path.ends_with(".html") {
            return Self::Page;
        }
        let file = path.rsplit('/').next().unwrap_or(path);
        match file.rsplit_once('.') {
            Some((stem, "wasm" | "js" | "css")) if fingerprint(stem).is_some() => {
                Self::Fingerprinted
            }
            _ => Self::Other,
        }
    }

    fn cache_control(self) -> Option<&'static str> {
        match self {
            Self::Fingerprinted => Some("public, max-age=31536000, immutable"),
            Self::Page => Some("no-cache"),
            Self::Other => None,
        }
    }
}

/// Hex fingerprint Trunk appends to a bundle stem: `name-<hash>` or
/// `name-<hash>_bg` for the wasm module.
fn fingerprint(stem: &str) -> Option<&str> {
    let stem = stem.strip_suffix("_bg").unwrap_or(stem);
    let (_, hash) = stem.rsplit_once('-')?;
    (hash.len() >= 8 && hash.chars().all(|c| c.is_ascii_hexdigit())).then_some(hash)
}

async fn set_dist_cache_control(request: Request, next: Next) -> Response {
    let asset = DistAsset::classify(request.uri().path());
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

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use super::*;

    #[test]
    fn trunk_bundles_are_immutable() {
        assert_eq!(
            DistAsset::classify("/opportunity-client-71578f6b278221f3_bg.wasm"),
            DistAsset::Fingerprinted
        );
        assert_eq!(
            DistAsset::classify("/opportunity-client-71578f6b278221f3.js"),
            DistAsset::Fingerprinted
        );
        assert_eq!(
            DistAsset::Fingerprinted.cache_control(),
            Some("public, max-age=31536000, immutable")
        );
    }

    #[test]
    fn unfingerprinted_files_keep_server_defaults() {
        assert_eq!(DistAsset::classify("/opportunity-client.js"), DistAsset::Other);
        assert_eq!(DistAsset::classify("/styles-main.css"), DistAsset::Other);
        assert_eq!(DistAsset::classify("/favicon.ico"), DistAsset::Other);
        assert_eq!(DistAsset::Other.cache_control(), None);
    }

    #[test]
    fn page_shell_is_always_revalidated() {
        assert_eq!(DistAsset::classify("/"), DistAsset::Page);
        assert_eq!(DistAsset::classify("/index.html"), DistAsset::Page);
        assert_eq!(DistAsset::Page.cache_control(), Some("no-cache"));
    }

    #[tokio::test]
    async fn static_fallback_serves_files_from_configured_dir() {
        let dir = std::env::temp_dir().join(format!("opportunity-static-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.expect("create static dir");
        tokio::fs::write(dir.join("index.html"), "<!doctype html><div id=\"app\"></div>")
            .await
            .expect("write index");

        let state = AppState::new(dir.join("missing.geojson"), dir.clone());
        let app = build_app(state);

        let response = app
            .clone()
            .oneshot(Request::get("/index.html").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(Request::get("/nope.txt").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
