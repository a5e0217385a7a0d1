//! Cache-aware NDJSON request handler and the CORS/routing shell that
//! frames it.

use crate::cache::Cache;
use crate::config::PacingConfig;
use crate::resolver::Resolver;
use crate::types::{ArtistLocationLine, ArtistQuery, ResolvedLocation};
use async_stream::stream;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use bytes::Bytes;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info, instrument};

const MAX_ARTISTS_PER_REQUEST: usize = 50;

#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<Resolver>,
    pub cache: Option<Cache>,
    pub pacing: PacingConfig,
}

pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/api/artists", post(post_artists))
        .route("/api/cache", delete(delete_cache))
        .route("/api/artist/:name", get(get_artist))
        .fallback(not_found)
        .layer(cors)
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not Found")
}

#[derive(Debug, Deserialize)]
struct ArtistsRequest {
    #[serde(default)]
    artists: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// Streams one NDJSON line per artist: every serviceable cached result
/// first, then the uncached names resolved sequentially with pacing
/// between them, each written back to the cache as it resolves.
#[instrument(skip(state, body))]
async fn post_artists(State(state): State<AppState>, Json(body): Json<ArtistsRequest>) -> Response {
    if body.artists.is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: "Invalid artists array".to_string(),
            }),
        )
            .into_response();
    }

    let names: Vec<String> = body.artists.into_iter().take(MAX_ARTISTS_PER_REQUEST).collect();

    let body_stream = stream! {
        let mut uncached: Vec<ArtistQuery> = Vec::new();

        for raw_name in &names {
            let query = ArtistQuery::new(raw_name);
            let cached = state.cache.as_ref().and_then(|c| c.get(&query.cache_key()));
            match cached {
                Some(loc) if loc.is_serviceable() => {
                    yield encode_line(&ArtistLocationLine::new(query.as_str(), loc));
                }
                _ => uncached.push(query),
            }
        }

        let mut first = true;
        for query in uncached {
            if !first {
                tokio::time::sleep(Duration::from_millis(state.pacing.batch_sleep_ms)).await;
            }
            first = false;

            match state.resolver.resolve(query.as_str()).await {
                Ok(resolved) => {
                    if let Some(cache) = &state.cache {
                        cache.put(&query.cache_key(), &resolved);
                    }
                    yield encode_line(&ArtistLocationLine::new(query.as_str(), resolved));
                }
                Err(e) => {
                    error!(artist = query.as_str(), error = %e, "resolve failed, closing stream");
                    break;
                }
            }
        }
    };

    let body = Body::from_stream(body_stream.map(Ok::<_, std::io::Error>));

    Response::builder()
        .status(StatusCode::OK)
        .header("Content-Type", "application/x-ndjson")
        .body(body)
        .unwrap()
}

fn encode_line(line: &ArtistLocationLine) -> Bytes {
    let mut json = serde_json::to_vec(line).expect("ArtistLocationLine always serializes");
    json.push(b'\n');
    Bytes::from(json)
}

#[derive(Debug, Deserialize)]
struct CacheDeleteRequest {
    #[serde(default)]
    artists: Vec<String>,
}

#[derive(Debug, Serialize)]
struct CacheDeleteResponse {
    deleted: Vec<String>,
}

#[instrument(skip(state, body))]
async fn delete_cache(State(state): State<AppState>, Json(body): Json<CacheDeleteRequest>) -> Response {
    if let Some(cache) = &state.cache {
        for name in &body.artists {
            let query = ArtistQuery::new(name);
            cache.delete(&query.cache_key());
        }
    }
    Json(CacheDeleteResponse { deleted: body.artists }).into_response()
}

/// Secondary single-artist entry point used for background re-resolution.
/// On a partial cache hit (a name without coordinates), re-runs geocoding
/// on the stored location name and updates the cache if it now succeeds.
#[instrument(skip(state))]
async fn get_artist(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let query = ArtistQuery::new(&name);
    let Some(cache) = &state.cache else {
        return Json(ResolvedLocation::unknown()).into_response();
    };

    let Some(cached) = cache.get(&query.cache_key()) else {
        return Json(ResolvedLocation::unknown()).into_response();
    };

    if !cached.is_partial() {
        return Json(cached).into_response();
    }

    match state.resolver.geocoder.geocode_location(&cached.location_name).await {
        Ok(Some(geo)) => {
            let updated = ResolvedLocation {
                location_name: geo.display_name,
                location_coord: Some(geo.coords()),
            };
            cache.put(&query.cache_key(), &updated);
            Json(updated).into_response()
        }
        Ok(None) => Json(cached).into_response(),
        Err(e) => {
            error!(artist = name.as_str(), error = %e, "partial-entry geocode retry failed");
            Json(cached).into_response()
        }
    }
}

pub async fn serve(router: Router, port: u16) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    info!(port, "artist-locator listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("received ctrl-c, shutting down");
}
