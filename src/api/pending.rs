//! Pending change API endpoints.

use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;

use super::{success, ApiResult};
use crate::models::{Actor, PendingChange, ReviewOutcome, ReviewRequest, StatusFilter};
use crate::AppState;

/// Query parameters for the review listing.
#[derive(Debug, Deserialize)]
pub struct PendingQuery {
    #[serde(default)]
    pub status: Option<String>,
}

/// GET /api/pending - List changes by status (privileged).
pub async fn list_pending(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<PendingQuery>,
) -> ApiResult<Vec<PendingChange>> {
    let filter = match query.status.as_deref() {
        Some(status) => StatusFilter::parse(status)?,
        None => StatusFilter::default(),
    };
    success(state.workflow.list_pending(&actor, filter).await?)
}

/// GET /api/pending/mine - List the caller's own requests.
pub async fn list_own_pending(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
) -> ApiResult<Vec<PendingChange>> {
    success(state.workflow.list_own(&actor).await?)
}

/// GET /api/pending/:id - Get a single change (privileged).
pub async fn get_pending(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<PendingChange> {
    success(state.workflow.get_pending(&actor, &id).await?)
}

/// POST /api/pending/:id/review - Approve or reject a change (privileged).
pub async fn review_pending(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(request): Json<ReviewRequest>,
) -> ApiResult<ReviewOutcome> {
    success(state.workflow.review(&id, &actor, request).await?)
}
