use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Path, Query, State},
    http::{header::LOCATION, HeaderMap, HeaderValue},
    routing::{get, post},
    Json, Router,
};
use tracing::{instrument, warn};

use super::dto::{AnalyzeImageRequest, StatusQuery, StatusResponse};
use super::repo_types::AnalysisResult;
use super::services::{analyze_image, find_analysis, latest_analysis_id};
use crate::{error::ApiError, report::handlers::report_link_by_id, state::AppState};

const PROCESS_FAILED: &str = "Failed to process image";
const FETCH_FAILED: &str = "Failed to fetch analysis results";
const NOT_FOUND: &str = "Analysis not found";

pub fn read_routes() -> Router<AppState> {
    Router::new()
        .route("/analysis/:id", get(get_analysis))
        .route("/analysis-status", get(get_analysis_status))
}

pub fn write_routes(max_body_bytes: usize) -> Router<AppState> {
    Router::new()
        .route("/analyze-image", post(post_analyze_image))
        .layer(DefaultBodyLimit::max(max_body_bytes))
}

/// POST /api/analyze-image { image: "data:image/jpeg;base64,..." }
/// Location points at the report page for the new result.
#[instrument(skip(state, body))]
pub async fn post_analyze_image(
    State(state): State<AppState>,
    body: Result<Json<AnalyzeImageRequest>, JsonRejection>,
) -> Result<(HeaderMap, Json<AnalysisResult>), ApiError> {
    let Json(req) = body
        .map_err(|e| ApiError::internal(PROCESS_FAILED, anyhow::anyhow!(e.body_text())))?;
    let result = analyze_image(&state, req.image.as_deref())
        .await
        .map_err(|e| ApiError::internal(PROCESS_FAILED, e))?;

    let mut headers = HeaderMap::new();
    if let Ok(link) = HeaderValue::from_str(&report_link_by_id(&result.id)) {
        headers.insert(LOCATION, link);
    }
    Ok((headers, Json(result)))
}

#[instrument(skip(state))]
pub async fn get_analysis(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<AnalysisResult>, ApiError> {
    match find_analysis(&state, &id).await {
        Ok(Some(result)) => Ok(Json(result)),
        Ok(None) => {
            warn!(%id, "analysis not found");
            Err(ApiError::NotFound(NOT_FOUND))
        }
        Err(e) => Err(ApiError::internal(FETCH_FAILED, e)),
    }
}

/// GET /api/analysis-status?after=<id>&wait_ms=<n>
#[instrument(skip(state))]
pub async fn get_analysis_status(
    State(state): State<AppState>,
    Query(q): Query<StatusQuery>,
) -> Json<StatusResponse> {
    let wait = q.wait_ms.map(Duration::from_millis);
    let latest = latest_analysis_id(&state, q.after.as_deref(), wait).await;
    Json(StatusResponse {
        latest_analysis_id: latest,
    })
}
