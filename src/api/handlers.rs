//! API Handlers
//!
//! HTTP request handlers for each proxy endpoint.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header::HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;

use crate::config::Config;
use crate::directory::{ShopDirectory, StaticDirectory};
use crate::error::Result;
use crate::models::{
    CacheStatsResponse, ClearResponse, HealthResponse, RoadsInfoResponse, RoadsRequest,
    WarmupRequest, WarmupResponse,
};
use crate::roads::{targets_from_directory, RoadQueryCache, WarmupSettings, WarmupTarget};
use crate::upstream::UpstreamClient;

/// Response header telling whether the body came from the cache.
pub static X_CACHE: HeaderName = HeaderName::from_static("x-cache");

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The road query cache, shared with the scheduled warm-up task
    pub roads: Arc<RoadQueryCache>,
    /// Source of warm-up regions when a request names none
    pub directory: Arc<dyn ShopDirectory>,
    pub warmup: WarmupSettings,
}

impl AppState {
    /// Creates a new AppState around an existing cache with an empty directory.
    pub fn new(roads: RoadQueryCache) -> Self {
        Self {
            roads: Arc::new(roads),
            directory: Arc::new(StaticDirectory::default()),
            warmup: WarmupSettings::default(),
        }
    }

    pub fn with_directory(mut self, directory: Arc<dyn ShopDirectory>) -> Self {
        self.directory = directory;
        self
    }

    pub fn with_warmup_settings(mut self, settings: WarmupSettings) -> Self {
        self.warmup = settings;
        self
    }

    /// Creates a new AppState from configuration.
    ///
    /// Loads `CITY_BOUNDS_FILE` when set; otherwise warm-up without explicit
    /// targets has nothing to do.
    pub fn from_config(config: &Config, upstream: Arc<dyn UpstreamClient>) -> Result<Self> {
        let roads = RoadQueryCache::from_config(config, upstream)?;
        let directory = match &config.city_bounds_file {
            Some(path) => StaticDirectory::from_json_file(path)?,
            None => StaticDirectory::default(),
        };

        Ok(Self::new(roads)
            .with_directory(Arc::new(directory))
            .with_warmup_settings(WarmupSettings {
                city_limit: config.warmup_city_limit,
                buffer_deg: config.warmup_buffer_deg,
            }))
    }
}

/// Handler for GET /api/roads
///
/// Describes the endpoint.
pub async fn roads_info_handler(State(state): State<AppState>) -> Json<RoadsInfoResponse> {
    let stats = state.roads.stats().await;
    Json(RoadsInfoResponse::new(stats.size, stats.ttl))
}

/// Handler for POST /api/roads
///
/// Returns the upstream document verbatim, tagged with `X-Cache`.
pub async fn roads_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RoadsRequest>, JsonRejection>,
) -> Result<Response> {
    let Json(req) = payload?;
    let (bbox, query) = req.parse()?;
    let data = state.roads.fetch(&bbox, query).await?;

    let mut response = Json(data.payload.as_ref()).into_response();
    response.headers_mut().insert(
        X_CACHE.clone(),
        HeaderValue::from_static(data.source.as_header()),
    );
    Ok(response)
}

/// Handler for GET /api/roads/cache/stats
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    Json(state.roads.stats().await.into())
}

/// Handler for POST /api/roads/cache/clear
pub async fn cache_clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    state.roads.clear().await;
    Json(ClearResponse::cleared())
}

/// Handler for POST /api/roads/warmup
///
/// Warms the targets named in the body, or the directory's largest cities
/// when the request has no JSON body or names no targets.
pub async fn warmup_handler(
    State(state): State<AppState>,
    payload: std::result::Result<Json<WarmupRequest>, JsonRejection>,
) -> Result<Json<WarmupResponse>> {
    let request = match payload {
        Ok(Json(req)) => Some(req),
        Err(JsonRejection::MissingJsonContentType(_)) => None,
        Err(rejection) => return Err(rejection.into()),
    };
    run_warmup(&state, request).await.map(Json)
}

async fn run_warmup(state: &AppState, request: Option<WarmupRequest>) -> Result<WarmupResponse> {
    let requested = request.and_then(|req| req.targets).unwrap_or_default();

    let targets: Vec<WarmupTarget> = if requested.is_empty() {
        targets_from_directory(state.directory.as_ref(), &state.warmup).await?
    } else {
        requested
            .into_iter()
            .map(|t| t.into_target())
            .collect::<Result<_>>()?
    };

    info!("Warm-up requested for {} targets", targets.len());
    let report = state.roads.warmup(&targets).await;
    Ok(WarmupResponse::from(&report))
}

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}
