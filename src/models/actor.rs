//! Actor model as seen by the catalog: who is asking, and may they skip review.

use serde::{Deserialize, Serialize};

use crate::errors::AppError;

/// An authenticated caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    /// Email or username shown in review listings
    pub label: String,
    pub privileged: bool,
}

impl Actor {
    /// Fail with `Forbidden` unless the actor is privileged.
    pub fn require_privileged(&self) -> Result<(), AppError> {
        if self.privileged {
            Ok(())
        } else {
            Err(AppError::Forbidden(
                "Only privileged actors can perform this action".to_string(),
            ))
        }
    }
}

/// Request body for registering a new actor.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateActorRequest {
    pub label: String,
    #[serde(default)]
    pub privileged: bool,
}

/// A freshly registered actor together with its credential.
///
/// The key is only ever returned here; it is not retrievable afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedActor {
    #[serde(flatten)]
    pub actor: Actor,
    pub api_key: String,
}
