//! API-key authentication module.
//!
//! Resolves the caller's key to an [`Actor`] and hands it to handlers as a
//! request extension. Keys are compared in constant time to mitigate timing attacks.

use std::sync::Arc;

use axum::{
    extract::Request,
    http::{header, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Response},
};
use subtle::ConstantTimeEq;

use crate::db::DocumentStore;
use crate::errors::AppError;
use crate::models::Actor;

/// Header name for the API key.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication layer: rejects the request unless its key belongs to a known actor.
pub async fn actor_auth_layer(
    store: Arc<DocumentStore>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(credential) = extract_credential(request.headers()) else {
        return AppError::Unauthorized("Missing API key".to_string()).into_response();
    };

    match resolve_actor(&store, &credential).await {
        Ok(Some(actor)) => {
            tracing::debug!("Authenticated {} ({})", actor.label, actor.id);
            request.extensions_mut().insert(actor);
            next.run(request).await
        }
        Ok(None) => AppError::Unauthorized("Invalid API key".to_string()).into_response(),
        Err(e) => e.into_response(),
    }
}

/// Key from `x-api-key`, falling back to `Authorization: Bearer`.
fn extract_credential(headers: &HeaderMap) -> Option<String> {
    let api_key = headers
        .get(API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string());

    api_key.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix("Bearer "))
            .map(|s| s.to_string())
    })
}

/// Identity oracle: the actor owning `credential`, if any.
pub async fn resolve_actor(
    store: &DocumentStore,
    credential: &str,
) -> Result<Option<Actor>, AppError> {
    let credentials = store.actor_credentials().await?;

    // Compare against every key so the timing does not reveal the match position
    let mut found = None;
    for (actor, key) in credentials {
        if constant_time_compare(credential, &key) && found.is_none() {
            found = Some(actor);
        }
    }
    Ok(found)
}

/// Perform constant-time string comparison.
fn constant_time_compare(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}
