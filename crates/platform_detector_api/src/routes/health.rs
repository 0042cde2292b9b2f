//! Health check and monitoring routes
//!
//! This module contains endpoints for service health checks, monitoring
//! metrics, and cache administration.

use crate::AppState;
use axum::{extract::State, http::StatusCode, response::Json};
use platform_core::EngineStats;
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: std::time::SystemTime,
}

/// Health check endpoint - GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: std::time::SystemTime::now(),
    })
}

/// Metrics endpoint - GET /metrics
///
/// Returns Prometheus-compatible metrics for monitoring.
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> (StatusCode, String) {
    let stats = state.detection_engine.get_stats();
    let namespace = &state.config.observability.metrics_namespace;

    (StatusCode::OK, render_metrics(namespace, &stats))
}

fn render_metrics(ns: &str, stats: &EngineStats) -> String {
    format!(
        "# HELP {ns}_detections_total Detection requests served\n\
         # TYPE {ns}_detections_total counter\n\
         {ns}_detections_total {}\n\
         \n\
         # HELP {ns}_cache_hits_total Detection requests answered from cache\n\
         # TYPE {ns}_cache_hits_total counter\n\
         {ns}_cache_hits_total {}\n\
         \n\
         # HELP {ns}_dns_failures_total Detections aborted by DNS resolution failure\n\
         # TYPE {ns}_dns_failures_total counter\n\
         {ns}_dns_failures_total {}\n\
         \n\
         # HELP {ns}_cached_domains Domains currently held in the result cache\n\
         # TYPE {ns}_cached_domains gauge\n\
         {ns}_cached_domains {}\n\
         \n\
         # HELP {ns}_known_platforms Platforms in the fingerprint table\n\
         # TYPE {ns}_known_platforms gauge\n\
         {ns}_known_platforms {}\n\
         \n\
         # HELP {ns}_build_info Build information\n\
         # TYPE {ns}_build_info gauge\n\
         {ns}_build_info{{version=\"{}\"}} 1\n",
        stats.detections_total,
        stats.cache_hits_total,
        stats.dns_failures_total,
        stats.cached_domains,
        stats.known_platforms,
        env!("CARGO_PKG_VERSION"),
        ns = ns,
    )
}

/// Statistics response
#[derive(Serialize)]
pub struct StatsResponse {
    pub version: String,
    pub engine_stats: EngineStats,
    pub timestamp: std::time::SystemTime,
}

/// Statistics endpoint - GET /admin/stats
pub async fn stats_handler(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        engine_stats: state.detection_engine.get_stats(),
        timestamp: std::time::SystemTime::now(),
    })
}

/// Cache response
#[derive(Serialize)]
pub struct CacheResponse {
    pub message: String,
    pub timestamp: std::time::SystemTime,
}

/// Cache clearing endpoint - POST /admin/cache/clear
pub async fn clear_cache_handler(State(state): State<Arc<AppState>>) -> Json<CacheResponse> {
    state.detection_engine.clear_cache();

    info!("Detection cache cleared by admin request");

    Json(CacheResponse {
        message: "Detection cache cleared successfully".to_string(),
        timestamp: std::time::SystemTime::now(),
    })
}
