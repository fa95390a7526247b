//! Conversion HTTP routes.
//!
//! Provides endpoints for:
//! - Submitting a convert request
//! - Polling a job's status
//! - Listing recent jobs and per-status counts

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::conversion::{ConversionError, ConversionRequest};
use crate::server::state::{GuardedConversionManager, ServerState};

// =============================================================================
// Request/Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct ConvertBody {
    pub song_name: String,
    /// Direct link or extra search terms.
    #[serde(default)]
    pub source_hint: Option<String>,
    pub requester: String,
}

#[derive(Debug, Deserialize)]
pub struct JobsQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, message: &str) -> axum::response::Response {
    (
        status,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

impl ConvertBody {
    /// Rejects what the pipeline assumes never reaches it.
    fn into_request(self) -> Result<ConversionRequest, &'static str> {
        if self.song_name.trim().is_empty() {
            return Err("song_name must not be empty");
        }
        if self.requester.trim().is_empty() {
            return Err("requester must not be empty");
        }
        let mut request = ConversionRequest::new(self.song_name.trim(), self.requester.trim());
        if let Some(hint) = self.source_hint.filter(|h| !h.trim().is_empty()) {
            request = request.with_source_hint(hint.trim());
        }
        Ok(request)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// POST /convert - Queue a conversion job
async fn post_convert(
    State(manager): State<GuardedConversionManager>,
    Json(body): Json<ConvertBody>,
) -> impl IntoResponse {
    let request = match body.into_request() {
        Ok(request) => request,
        Err(reason) => return error_response(StatusCode::BAD_REQUEST, reason),
    };

    match manager.submit(request) {
        Ok(submitted) => (StatusCode::ACCEPTED, Json(submitted)).into_response(),
        Err(e) => {
            error!("Failed to queue conversion job: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "failed to queue job")
        }
    }
}

/// GET /status/{job_id} - Current job record
async fn get_status(
    State(manager): State<GuardedConversionManager>,
    Path(job_id): Path<String>,
) -> impl IntoResponse {
    match manager.status(&job_id) {
        Ok(job) => Json(job).into_response(),
        Err(ConversionError::UnknownJob(_)) => {
            debug!("Status poll for unknown job {}", job_id);
            error_response(StatusCode::NOT_FOUND, "unknown job")
        }
        Err(e) => {
            error!("Status lookup for {} failed: {}", job_id, e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "status unavailable")
        }
    }
}

/// GET /jobs - Most recent jobs first
async fn get_jobs(
    State(manager): State<GuardedConversionManager>,
    Query(query): Query<JobsQuery>,
) -> impl IntoResponse {
    Json(manager.recent_jobs(query.limit))
}

/// GET /stats - Job counts per status
async fn get_stats(State(manager): State<GuardedConversionManager>) -> impl IntoResponse {
    Json(manager.stats())
}

pub fn conversion_routes() -> Router<ServerState> {
    Router::new()
        .route("/convert", post(post_convert))
        .route("/status/{job_id}", get(get_status))
        .route("/jobs", get(get_jobs))
        .route("/stats", get(get_stats))
}
