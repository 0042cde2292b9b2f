//! Shared API types and utilities
//!
//! This module contains common types, error handling, and conversion utilities
//! used across all API endpoints.

use axum::{http::StatusCode, response::Json};
use platform_core::{knowledge_base::FALLBACK_PAGE_KEY, DetectionResult, PlatformScores};
use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

/// Longest domain name accepted
pub const MAX_DOMAIN_LENGTH: usize = 253;

/// Query parameters for platform detection
#[derive(Debug, Deserialize)]
pub struct DetectQuery {
    /// Domain to inspect (e.g., "example.com")
    pub domain: Option<String>,
}

/// API response for platform detection
#[derive(Debug, Serialize)]
pub struct DetectResponse {
    /// Request ID for tracking
    pub request_id: String,
    /// The domain that was inspected
    pub domain: String,
    /// Page key the front-end routes on
    pub platform: String,
    /// Platform id chosen by tiered resolution
    pub detected_platform: String,
    /// Best platforms by weighted score, ties included
    pub top_platforms: Vec<String>,
    /// Failure tag when detection aborted early
    pub error: Option<String>,
    /// Timestamp when detection was performed (ISO 8601)
    pub checked_at: String,
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub error_code: String,
    /// Always the fallback page key so callers can route without parsing errors
    pub platform: String,
    pub request_id: String,
    pub timestamp: String,
}

/// Result type for API handlers
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    InvalidDomain(String),
}

impl axum::response::IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_code, message) = match self {
            ApiError::InvalidDomain(msg) => (StatusCode::BAD_REQUEST, "INVALID_DOMAIN", msg),
        };

        let error_response = ErrorResponse {
            error: message,
            error_code: error_code.to_string(),
            platform: FALLBACK_PAGE_KEY.to_string(),
            request_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        };

        (status, Json(error_response)).into_response()
    }
}

/// Check and normalize the `domain` query parameter
///
/// Returns the trimmed, lowercased domain.
pub fn validate_domain_input(domain: Option<&str>) -> Result<String, ApiError> {
    let domain = domain.map(str::trim).unwrap_or_default();

    if domain.is_empty() {
        return Err(ApiError::InvalidDomain("No domain provided".to_string()));
    }

    if domain.len() > MAX_DOMAIN_LENGTH {
        return Err(ApiError::InvalidDomain(format!(
            "Domain name too long (max {} characters)",
            MAX_DOMAIN_LENGTH
        )));
    }

    Ok(domain.to_lowercase())
}

/// Convert a core detection result and its score ranking to the API response
pub fn convert_detection_result(
    result: DetectionResult,
    ranking: PlatformScores,
    request_id: String,
) -> DetectResponse {
    DetectResponse {
        request_id,
        domain: result.domain,
        platform: result.page_key,
        detected_platform: result.platform,
        top_platforms: ranking.top_platforms,
        error: result.error,
        checked_at: format_timestamp(result.detected_at),
    }
}

/// Format a timestamp as ISO 8601
fn format_timestamp(at: SystemTime) -> String {
    match at.duration_since(std::time::UNIX_EPOCH) {
        Ok(duration) => chrono::DateTime::from_timestamp(duration.as_secs() as i64, 0)
            .unwrap_or_else(chrono::Utc::now)
            .to_rfc3339(),
        Err(_) => chrono::Utc::now().to_rfc3339(),
    }
}
