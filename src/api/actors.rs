//! Actor API endpoints.

use axum::{extract::State, Extension, Json};

use super::{success, ApiResult};
use crate::errors::AppError;
use crate::models::{Actor, CreateActorRequest, IssuedActor};
use crate::AppState;

/// POST /api/actors - Register an actor and issue its key (privileged).
pub async fn create_actor(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(request): Json<CreateActorRequest>,
) -> ApiResult<IssuedActor> {
    actor.require_privileged()?;

    let label = request.label.trim();
    if label.is_empty() {
        return Err(AppError::InvalidInput("Label is required".to_string()));
    }

    let issued = state.store.create_actor(label, request.privileged).await?;
    tracing::info!(
        "{} registered actor {} (privileged: {})",
        actor.label,
        issued.actor.label,
        issued.actor.privileged
    );
    success(issued)
}

/// GET /api/actors/me - The authenticated caller.
pub async fn current_actor(Extension(actor): Extension<Actor>) -> ApiResult<Actor> {
    success(actor)
}
