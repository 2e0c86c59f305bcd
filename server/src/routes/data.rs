use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;

use crate::config::DATASET_CACHE_CONTROL;
use crate::state::AppState;

const GEOJSON_CONTENT_TYPE: &str = "application/geo+json";

/// Serve the pre-loaded dataset bytes. 404 until a file has been read.
pub async fn get_opportunity_geojson(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Response {
    let Some(snapshot) = state.dataset().await else {
        return (StatusCode::NOT_FOUND, "GeoJSON dataset not found").into_response();
    };

    let etag = snapshot.etag.as_str();
    if if_none_match_matches(&headers, etag) {
        return not_modified_response(DATASET_CACHE_CONTROL, Some(etag));
    }

    bytes_response(
        (*snapshot.geojson).clone(),
        GEOJSON_CONTENT_TYPE,
        DATASET_CACHE_CONTROL,
        Some(etag),
    )
}

pub(crate) fn bytes_response(
    body: Bytes,
    content_type: &'static str,
    cache_control: &'static str,
    etag: Option<&str>,
) -> Response {
    let mut response = Response::new(Body::from(body));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn not_modified_response(cache_control: &'static str, etag: Option<&str>) -> Response {
    let mut response = StatusCode::NOT_MODIFIED.into_response();
    let headers = response.headers_mut();
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(cache_control),
    );
    if let Some(etag) = etag
        && let Ok(etag_header) = HeaderValue::from_str(etag)
    {
        headers.insert(header::ETAG, etag_header);
    }
    response
}

fn normalize_etag(candidate: &str) -> &str {
    candidate.strip_prefix("W/").unwrap_or(candidate).trim()
}

fn if_none_match_matches(headers: &HeaderMap, etag: &str) -> bool {
    let Some(value) = headers.get(header::IF_NONE_MATCH) else {
        return false;
    };
    let Ok(raw) = value.to_str() else {
        return false;
    };

    raw.split(',').any(|candidate| {
        let candidate = candidate.trim();
        candidate == "*" || normalize_etag(candidate) == normalize_etag(etag)
    })
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{HeaderMap, HeaderValue, Request, StatusCode, header};
    use tower::ServiceExt;

    use super::if_none_match_matches;
    use crate::services::dataset_loader::{self, test_support};
    use crate::state::AppState;

    #[test]
    fn if_none_match_supports_weak_and_multiple_etags() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::IF_NONE_MATCH,
            HeaderValue::from_static("W/\"other\", \"dataset-42\""),
        );
        assert!(if_none_match_matches(&headers, "\"dataset-42\""));
        assert!(!if_none_match_matches(&headers, "\"dataset-43\""));
    }

    #[tokio::test]
    async fn missing_dataset_returns_not_found() {
        let state = AppState::new(
            test_support::temp_dataset_path("data-route-missing"),
            std::env::temp_dir(),
        );
        let response = crate::app::build_app(state)
            .oneshot(
                Request::get("/data/opportunity.geojson")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dataset_is_served_as_geojson_and_revalidates_by_etag() {
        let path = test_support::temp_dataset_path("data-route-etag");
        tokio::fs::write(&path, test_support::SAMPLE_GEOJSON)
            .await
            .expect("write dataset");
        let state = AppState::new(path.clone(), std::env::temp_dir());
        dataset_loader::refresh(&state).await.expect("load dataset");
        let app = crate::app::build_app(state);

        let first = app
            .clone()
            .oneshot(
                Request::get("/data/opportunity.geojson")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(first.status(), StatusCode::OK);
        assert_eq!(
            first
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("application/geo+json")
        );
        let etag = first
            .headers()
            .get(header::ETAG)
            .cloned()
            .expect("etag header should be present");
        let body = axum::body::to_bytes(first.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert_eq!(&body[..], test_support::SAMPLE_GEOJSON.as_bytes());

        let second = app
            .oneshot(
                Request::get("/data/opportunity.geojson")
                    .header(header::IF_NONE_MATCH, etag)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);

        let _ = tokio::fs::remove_file(&path).await;
    }

    #[tokio::test]
    async fn replaced_dataset_never_revalidates_with_a_stale_etag() {
        let path = test_support::temp_dataset_path("data-route-replaced");
        tokio::fs::write(&path, test_support::SAMPLE_GEOJSON)
            .await
            .expect("write dataset");
        let state = AppState::new(path.clone(), std::env::temp_dir());
        dataset_loader::refresh(&state).await.expect("load dataset");
        let app = crate::app::build_app(state.clone());

        let first = app
            .clone()
            .oneshot(
                Request::get("/data/opportunity.geojson")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        let old_etag = first
            .headers()
            .get(header::ETAG)
            .cloned()
            .expect("etag header should be present");

        tokio::fs::remove_file(&path).await.expect("remove dataset");
        dataset_loader::refresh(&state).await.expect("refresh after removal");
        tokio::fs::write(&path, test_support::EMPTY_COLLECTION)
            .await
            .expect("rewrite dataset");
        dataset_loader::refresh(&state).await.expect("refresh after rewrite");

        let second = app
            .oneshot(
                Request::get("/data/opportunity.geojson")
                    .header(header::IF_NONE_MATCH, old_etag.clone())
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(second.status(), StatusCode::OK);
        assert_ne!(second.headers().get(header::ETAG), Some(&old_etag));
        let body = axum::body::to_bytes(second.into_body(), usize::MAX)
            .await
            .expect("read body");
        assert_eq!(&body[..], test_support::EMPTY_COLLECTION.as_bytes());

        let _ = tokio::fs::remove_file(&path).await;
    }
}
