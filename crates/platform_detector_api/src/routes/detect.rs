//! Platform detection route handler

use crate::{api_handler::*, AppState};
use axum::{
    extract::{Query, State},
    response::Json,
};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// GET /api/platform-detect?domain=example.com
///
/// Runs the detection engine for the domain and returns the page key in
/// `platform`. The weighted score ranking is reported next to it in
/// `top_platforms` and does not influence `platform`.
///
/// Detection itself never fails: when DNS resolution aborts the pipeline the
/// response still carries the fallback page key plus an `error` tag.
#[instrument(skip(state, query), fields(request_id))]
pub async fn detect_platform_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DetectQuery>,
) -> ApiResult<DetectResponse> {
    let request_id = Uuid::new_v4().to_string();
    tracing::Span::current().record("request_id", &request_id);

    let domain = validate_domain_input(query.domain.as_deref())?;

    info!("Detecting platform for domain: {}", domain);

    let start_time = std::time::Instant::now();

    let result = state.detection_engine.detect(&domain).await;
    let ranking = state.detection_engine.score(&result);

    let processing_time = start_time.elapsed();
    debug!("Detection completed in {:?}", processing_time);

    let response = convert_detection_result(result, ranking, request_id);

    info!(
        "Platform detection completed: {} -> platform={}, detected={} ({}ms)",
        domain,
        response.platform,
        response.detected_platform,
        processing_time.as_millis()
    );

    Ok(Json(response))
}
