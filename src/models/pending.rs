//! Pending change model: a deferred catalog mutation awaiting review.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Actor, CatalogRecord};
use crate::errors::AppError;

/// Kind of catalog mutation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Create,
    Update,
    Delete,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Create => "create",
            OperationKind::Update => "update",
            OperationKind::Delete => "delete",
        }
    }
}

/// Review status. `Approved` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChangeStatus {
    Pending,
    Approved,
    Rejected,
}

impl ChangeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeStatus::Pending => "pending",
            ChangeStatus::Approved => "approved",
            ChangeStatus::Rejected => "rejected",
        }
    }
}

/// Status selector for review listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusFilter {
    #[default]
    Pending,
    Approved,
    Rejected,
    All,
}

impl StatusFilter {
    pub fn parse(s: &str) -> Result<Self, AppError> {
        match s {
            "pending" => Ok(StatusFilter::Pending),
            "approved" => Ok(StatusFilter::Approved),
            "rejected" => Ok(StatusFilter::Rejected),
            "all" => Ok(StatusFilter::All),
            other => Err(AppError::InvalidInput(format!(
                "Unknown status filter '{}'; expected pending, approved, rejected or all",
                other
            ))),
        }
    }

    /// The single status this filter selects, or `None` for all of them.
    pub fn status(&self) -> Option<ChangeStatus> {
        match self {
            StatusFilter::Pending => Some(ChangeStatus::Pending),
            StatusFilter::Approved => Some(ChangeStatus::Approved),
            StatusFilter::Rejected => Some(ChangeStatus::Rejected),
            StatusFilter::All => None,
        }
    }
}

/// A mutation as submitted by the catalog service.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    pub operation: OperationKind,
    pub target_id: Option<String>,
    pub before_state: Option<Map<String, Value>>,
    pub proposed_state: Option<Map<String, Value>>,
}

impl MutationRequest {
    pub fn create(proposed: Map<String, Value>) -> Self {
        Self {
            operation: OperationKind::Create,
            target_id: None,
            before_state: None,
            proposed_state: Some(proposed),
        }
    }

    pub fn update(id: String, before: Map<String, Value>, proposed: Map<String, Value>) -> Self {
        Self {
            operation: OperationKind::Update,
            target_id: Some(id),
            before_state: Some(before),
            proposed_state: Some(proposed),
        }
    }

    pub fn delete(id: String, before: Map<String, Value>) -> Self {
        Self {
            operation: OperationKind::Delete,
            target_id: Some(id),
            before_state: Some(before),
            proposed_state: None,
        }
    }

    /// Check that the optional parts match the operation kind.
    ///
    /// `target_id` and `before_state` are required iff the operation is not a create,
    /// `proposed_state` iff it is not a delete.
    pub fn validate(&self) -> Result<(), AppError> {
        let op = self.operation.as_str();
        let targets_existing = self.operation != OperationKind::Create;
        let carries_proposal = self.operation != OperationKind::Delete;

        if self.target_id.is_some() != targets_existing {
            return Err(AppError::InvalidInput(if targets_existing {
                format!("Operation '{}' requires a target record id", op)
            } else {
                format!("Operation '{}' must not name a target record", op)
            }));
        }
        if self.before_state.is_some() != targets_existing {
            return Err(AppError::InvalidInput(if targets_existing {
                format!("Operation '{}' requires the record state before the change", op)
            } else {
                format!("Operation '{}' must not carry a prior record state", op)
            }));
        }
        match (&self.proposed_state, carries_proposal) {
            (Some(proposed), true) => CatalogRecord::validate_document(proposed),
            (None, false) => Ok(()),
            (None, true) => Err(AppError::InvalidInput(format!(
                "Operation '{}' requires the proposed record state",
                op
            ))),
            (Some(_), false) => Err(AppError::InvalidInput(format!(
                "Operation '{}' must not carry a proposed record state",
                op
            ))),
        }
    }
}

/// A deferred mutation and its review trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PendingChange {
    #[serde(default, skip_deserializing)]
    pub id: String,
    pub operation: OperationKind,
    pub collection: String,
    pub requested_by: String,
    pub requested_by_label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_state: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_state: Option<Map<String, Value>>,
    pub status: ChangeStatus,
    pub requested_at: DateTime<Utc>,
    #[serde(default)]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviewed_by: Option<String>,
    #[serde(default)]
    pub reviewed_by_label: Option<String>,
    #[serde(default)]
    pub review_comment: Option<String>,
}

impl PendingChange {
    /// A fresh pending change; states are captured verbatim.
    pub fn new(collection: &str, actor: &Actor, request: MutationRequest) -> Self {
        Self {
            id: String::new(),
            operation: request.operation,
            collection: collection.to_string(),
            requested_by: actor.id.clone(),
            requested_by_label: actor.label.clone(),
            target_id: request.target_id,
            before_state: request.before_state,
            proposed_state: request.proposed_state,
            status: ChangeStatus::Pending,
            requested_at: Utc::now(),
            reviewed_at: None,
            reviewed_by: None,
            reviewed_by_label: None,
            review_comment: None,
        }
    }

    /// Rebuild from a stored document.
    pub fn from_document(id: String, body: Map<String, Value>) -> Result<Self, AppError> {
        let mut change: PendingChange = serde_json::from_value(Value::Object(body))
            .map_err(|e| AppError::Internal(format!("Corrupt pending change {}: {}", id, e)))?;
        change.id = id;
        Ok(change)
    }

    /// Stored form; the id lives beside the document, not inside it.
    pub fn to_document(&self) -> Result<Map<String, Value>, AppError> {
        match serde_json::to_value(self)? {
            Value::Object(mut body) => {
                body.remove("id");
                Ok(body)
            }
            _ => Err(AppError::Internal(
                "Pending change did not serialize to an object".to_string(),
            )),
        }
    }

    /// Move out of `pending`, stamping the review metadata in the same step.
    pub fn resolve(
        &mut self,
        reviewer: &Actor,
        approve: bool,
        comment: Option<String>,
    ) -> Result<(), AppError> {
        if self.status != ChangeStatus::Pending {
            return Err(AppError::InvalidState {
                message: format!("Change {} was already {}", self.id, self.status.as_str()),
                current_status: self.status.as_str().to_string(),
            });
        }
        self.status = if approve {
            ChangeStatus::Approved
        } else {
            ChangeStatus::Rejected
        };
        self.reviewed_at = Some(Utc::now());
        self.reviewed_by = Some(reviewer.id.clone());
        self.reviewed_by_label = Some(reviewer.label.clone());
        self.review_comment = comment;
        Ok(())
    }
}

/// Result of submitting a mutation.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MutationOutcome {
    pub applied: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pending_change_id: Option<String>,
}

impl MutationOutcome {
    pub fn applied(record_id: String) -> Self {
        Self {
            applied: true,
            record_id: Some(record_id),
            pending_change_id: None,
        }
    }

    pub fn deferred(pending_change_id: String) -> Self {
        Self {
            applied: false,
            record_id: None,
            pending_change_id: Some(pending_change_id),
        }
    }
}

/// Request body for reviewing a pending change.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub approve: bool,
    #[serde(default)]
    pub comment: Option<String>,
}

/// Result of a review.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ReviewOutcome {
    pub status: ChangeStatus,
    pub message: String,
    /// Catalog record written by an approval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record_id: Option<String>,
    pub comment: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn armed() -> Map<String, Value> {
        json!({ "nombre": "M4A1", "armamento": { "75 mm M3": { "municiones": [] } } })
            .as_object()
            .cloned()
            .unwrap()
    }

    fn actor() -> Actor {
        Actor {
            id: "u1".into(),
            label: "tanker@example.com".into(),
            privileged: false,
        }
    }

    #[test]
    fn test_update_without_target_is_invalid_input() {
        let request = MutationRequest {
            operation: OperationKind::Update,
            target_id: None,
            before_state: Some(armed()),
            proposed_state: Some(armed()),
        };
        assert!(matches!(request.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_shape_rules_per_operation() {
        assert!(MutationRequest::create(armed()).validate().is_ok());
        assert!(MutationRequest::update("t".into(), armed(), armed())
            .validate()
            .is_ok());
        assert!(MutationRequest::delete("t".into(), armed()).validate().is_ok());

        let mut create_with_target = MutationRequest::create(armed());
        create_with_target.target_id = Some("t".into());
        assert!(create_with_target.validate().is_err());

        let mut delete_with_proposal = MutationRequest::delete("t".into(), armed());
        delete_with_proposal.proposed_state = Some(armed());
        assert!(delete_with_proposal.validate().is_err());

        let mut delete_without_before = MutationRequest::delete("t".into(), armed());
        delete_without_before.before_state = None;
        assert!(delete_without_before.validate().is_err());
    }

    #[test]
    fn test_proposed_state_must_hold_armament_invariant() {
        let unarmed = json!({ "nombre": "Nothing" }).as_object().cloned().unwrap();
        assert!(matches!(
            MutationRequest::create(unarmed).validate(),
            Err(AppError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_document_round_trip_keeps_id_outside_body() {
        let mut change = PendingChange::new("tanks", &actor(), MutationRequest::create(armed()));
        change.id = "p1".into();
        let body = change.to_document().unwrap();
        assert!(!body.contains_key("id"));
        assert_eq!(body["status"], "pending");
        assert_eq!(body["requestedBy"], "u1");
        assert!(!body.contains_key("targetId"));

        let restored = PendingChange::from_document("p1".into(), body).unwrap();
        assert_eq!(restored, change);
    }

    #[test]
    fn test_resolve_stamps_metadata_once() {
        let reviewer = Actor {
            id: "admin".into(),
            label: "admin".into(),
            privileged: true,
        };
        let mut change = PendingChange::new("tanks", &actor(), MutationRequest::create(armed()));
        change
            .resolve(&reviewer, false, Some("duplicate".into()))
            .unwrap();
        assert_eq!(change.status, ChangeStatus::Rejected);
        assert_eq!(change.reviewed_by.as_deref(), Some("admin"));
        assert_eq!(change.review_comment.as_deref(), Some("duplicate"));
        assert!(change.reviewed_at.is_some());

        let err = change.resolve(&reviewer, true, None).unwrap_err();
        assert!(matches!(err, AppError::InvalidState { .. }));
        assert_eq!(change.status, ChangeStatus::Rejected);
    }

    #[test]
    fn test_status_filter_parse() {
        assert_eq!(StatusFilter::parse("all").unwrap().status(), None);
        assert_eq!(
            StatusFilter::parse("approved").unwrap().status(),
            Some(ChangeStatus::Approved)
        );
        assert!(StatusFilter::parse("done").is_err());
    }
}
