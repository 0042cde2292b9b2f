//! API Routes Module
//!
//! - `detect`: platform detection endpoint
//! - `health`: health checks, metrics and cache administration

pub mod detect;
pub mod health;

use crate::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Build all API routes and return a configured Router
pub fn build_routes(state: Arc<AppState>) -> Router {
    Router::new()
        // Detection endpoint
        .route("/api/platform-detect", get(detect::detect_platform_handler))
        
        // Health and monitoring endpoints
        .route("/health", get(health::health_handler))
        .route("/metrics", get(health::metrics_handler))
        
        // Administrative endpoints
        .route("/admin/stats", get(health::stats_handler))
        .route("/admin/cache/clear", post(health::clear_cache_handler))
        
        .with_state(state)
}
