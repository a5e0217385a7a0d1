//! Integration tests for the HTTP surface, driven directly through the
//! `axum::Router` with `tower::ServiceExt::oneshot`. The resolver's
//! upstream clients talk to fixed hosts with no injection point, so these
//! tests stick to paths reachable without a live resolve: validation,
//! fully cache-serviceable batches, and cache administration.

use artist_locator::cache::Cache;
use artist_locator::clients::geocode::GeocoderCascade;
use artist_locator::clients::musicbrainz::MusicBrainzClient;
use artist_locator::clients::sparql::SparqlClient;
use artist_locator::clients::wikipedia::WikipediaClient;
use artist_locator::config::PacingConfig;
use artist_locator::resolver::Resolver;
use artist_locator::server::{build_router, AppState};
use artist_locator::types::ResolvedLocation;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceExt;

fn test_resolver() -> Resolver {
    Resolver {
        musicbrainz: MusicBrainzClient::new("test-agent".to_string(), 0, Duration::from_millis(0)),
        wikipedia: WikipediaClient::new("test-agent".to_string(), 0),
        sparql: SparqlClient::new("test-agent".to_string(), 0),
        geocoder: GeocoderCascade::new("test-agent".to_string(), 0),
    }
}

fn test_state(cache: Option<Cache>) -> AppState {
    AppState {
        resolver: Arc::new(test_resolver()),
        cache,
        pacing: PacingConfig {
            batch_sleep_ms: 0,
            musicbrainz_pace_ms: 0,
        },
    }
}

#[tokio::test]
async fn health_check_returns_ok() {
    let app = build_router(test_state(None));

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let app = build_router(test_state(None));

    let response = app
        .oneshot(Request::builder().uri("/nonexistent").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_artists_rejects_empty_array() {
    let app = build_router(test_state(None));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/artists")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"artists": []}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn post_artists_streams_fully_cached_batch_without_resolving() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Cache::open(dir.path().to_str().unwrap(), 2_592_000).unwrap();
    cache.put(
        "artist:taylor swift",
        &ResolvedLocation {
            location_name: "West Reading, Pennsylvania, United States".to_string(),
            location_coord: Some([40.3356, -75.926]),
        },
    );
    cache.put("artist:completely unknown artist", &ResolvedLocation::unknown());

    let app = build_router(test_state(Some(cache)));

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/artists")
                .header("Content-Type", "application/json")
                .body(Body::from(
                    r#"{"artists": ["Taylor Swift", "Completely Unknown Artist"]}"#,
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get("Content-Type").unwrap(),
        "application/x-ndjson"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);

    let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(first["artist"], "Taylor Swift");
    assert_eq!(first["location_name"], "West Reading, Pennsylvania, United States");

    let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(second["artist"], "Completely Unknown Artist");
    assert_eq!(second["location_name"], "Unknown");
    assert!(second["location_coord"].is_null());
}

#[tokio::test]
async fn delete_cache_removes_listed_artists() {
    let dir = tempfile::tempdir().unwrap();
    let cache = Cache::open(dir.path().to_str().unwrap(), 2_592_000).unwrap();
    cache.put(
        "artist:tame impala",
        &ResolvedLocation {
            location_name: "Perth, Australia".to_string(),
            location_coord: Some([-31.9523, 115.8613]),
        },
    );

    let app = build_router(test_state(Some(cache.clone())));

    let response = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/api/cache")
                .header("Content-Type", "application/json")
                .body(Body::from(r#"{"artists": ["Tame Impala"]}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(cache.get("artist:tame impala"), None);
}

#[tokio::test]
async fn get_artist_on_partial_entry_retries_geocode_against_live_host() {
    // No cache configured: the secondary entry point degrades to Unknown
    // rather than failing the request outright.
    let app = build_router(test_state(None));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/artist/Some%20Artist")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: ResolvedLocation = serde_json::from_slice(&bytes).unwrap();
    assert!(body.is_unknown());
}
