//! Catalog API endpoints.

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde_json::{Map, Value};

use super::{success, ApiResult};
use crate::db::{Filter, TANKS};
use crate::errors::AppError;
use crate::models::{
    strip_identifiers, Actor, CatalogRecord, MutationOutcome, MutationRequest, NATION_FIELD,
};
use crate::AppState;

/// GET /api/tanks - List all tanks.
pub async fn list_tanks(State(state): State<AppState>) -> ApiResult<Vec<CatalogRecord>> {
    let docs = state.store.scan(TANKS, &Filter::All).await?;
    success(
        docs.into_iter()
            .map(|doc| CatalogRecord::from_stored(doc.id, doc.body))
            .collect(),
    )
}

/// GET /api/tanks/:id - Get a single tank.
pub async fn get_tank(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<CatalogRecord> {
    match state.store.get(TANKS, &id).await? {
        Some(doc) => success(CatalogRecord::from_stored(doc.id, doc.body)),
        None => Err(AppError::NotFound(format!("Tank {} not found", id))),
    }
}

/// GET /api/tanks/nation/:nation - List the tanks of one nation.
pub async fn list_tanks_by_nation(
    State(state): State<AppState>,
    Path(nation): Path<String>,
) -> ApiResult<Vec<CatalogRecord>> {
    let docs = state
        .store
        .scan(TANKS, &Filter::field_eq(NATION_FIELD, &nation))
        .await?;

    if docs.is_empty() {
        return Err(AppError::NotFound(format!(
            "No tanks found for nation {}",
            nation
        )));
    }

    success(
        docs.into_iter()
            .map(|doc| CatalogRecord::from_stored(doc.id, doc.body))
            .collect(),
    )
}

/// POST /api/tanks - Create a tank, or request its creation.
pub async fn create_tank(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<MutationOutcome> {
    let request = MutationRequest::create(strip_identifiers(body));
    success(state.workflow.submit_mutation(&actor, request).await?)
}

/// PUT /api/tanks/:id - Replace a tank, or request the replacement.
pub async fn update_tank(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
    Json(body): Json<Map<String, Value>>,
) -> ApiResult<MutationOutcome> {
    let before = current_state(&state, &id).await?;
    let request = MutationRequest::update(id, before, strip_identifiers(body));
    success(state.workflow.submit_mutation(&actor, request).await?)
}

/// DELETE /api/tanks/:id - Delete a tank, or request its deletion.
pub async fn delete_tank(
    State(state): State<AppState>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<String>,
) -> ApiResult<MutationOutcome> {
    let before = current_state(&state, &id).await?;
    let request = MutationRequest::delete(id, before);
    success(state.workflow.submit_mutation(&actor, request).await?)
}

async fn current_state(state: &AppState, id: &str) -> Result<Map<String, Value>, AppError> {
    state
        .store
        .get(TANKS, id)
        .await?
        .map(|doc| doc.body)
        .ok_or_else(|| AppError::NotFound(format!("Tank {} not found", id)))
}
