//! Moderation workflow.
//!
//! Every catalog mutation passes through here. Privileged actors write straight
//! to the store; everyone else produces a pending change that a privileged
//! reviewer later approves (and applies) or rejects.
//!
//! `review` runs the catalog write and the status stamp in one store
//! transaction, and the stamp is a compare-and-swap on `status == "pending"`,
//! so at most one review of a change ever succeeds and a failed apply leaves
//! the change pending.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::db::{DocumentStore, Filter, StoreTransaction, PENDING_CHANGES, TANKS};
use crate::errors::AppError;
use crate::models::{
    Actor, ChangeStatus, MutationOutcome, MutationRequest, OperationKind, PendingChange,
    ReviewOutcome, ReviewRequest, StatusFilter,
};

const STATUS_FIELD: &str = "status";
const REQUESTED_BY_FIELD: &str = "requestedBy";

pub struct ModerationWorkflow {
    store: Arc<DocumentStore>,
}

impl ModerationWorkflow {
    pub fn new(store: Arc<DocumentStore>) -> Self {
        Self { store }
    }

    /// Apply a mutation now (privileged) or record it for review.
    pub async fn submit_mutation(
        &self,
        actor: &Actor,
        request: MutationRequest,
    ) -> Result<MutationOutcome, AppError> {
        request.validate()?;

        if let Some(target) = request.target_id.as_deref() {
            if self.store.get(TANKS, target).await?.is_none() {
                return Err(AppError::NotFound(format!("Tank {} not found", target)));
            }
        }

        if actor.privileged {
            let mut tx = self.store.begin().await?;
            let record_id = apply_operation(
                &mut tx,
                request.operation,
                request.target_id.as_deref(),
                request.proposed_state.as_ref(),
            )
            .await?;
            tx.commit().await?;

            tracing::info!(
                "{} applied {} on tank {}",
                actor.label,
                request.operation.as_str(),
                record_id
            );
            return Ok(MutationOutcome::applied(record_id));
        }

        let change = PendingChange::new(TANKS, actor, request);
        let change_id = self
            .store
            .insert(PENDING_CHANGES, &change.to_document()?)
            .await?;

        tracing::info!(
            "{} requested {} (pending change {})",
            actor.label,
            change.operation.as_str(),
            change_id
        );
        Ok(MutationOutcome::deferred(change_id))
    }

    /// Changes with the given status, most recent first. Privileged only.
    pub async fn list_pending(
        &self,
        actor: &Actor,
        filter: StatusFilter,
    ) -> Result<Vec<PendingChange>, AppError> {
        actor.require_privileged()?;

        let filter = match filter.status() {
            Some(status) => Filter::field_eq(STATUS_FIELD, status.as_str()),
            None => Filter::All,
        };
        self.load_changes(&filter).await
    }

    /// A single change by id. Privileged only.
    pub async fn get_pending(&self, actor: &Actor, id: &str) -> Result<PendingChange, AppError> {
        actor.require_privileged()?;

        let doc = self
            .store
            .get(PENDING_CHANGES, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pending change {} not found", id)))?;
        PendingChange::from_document(doc.id, doc.body)
    }

    /// The caller's own requests in any status, most recent first.
    pub async fn list_own(&self, actor: &Actor) -> Result<Vec<PendingChange>, AppError> {
        self.load_changes(&Filter::field_eq(REQUESTED_BY_FIELD, &actor.id))
            .await
    }

    /// Approve (and apply) or reject a pending change.
    pub async fn review(
        &self,
        id: &str,
        actor: &Actor,
        decision: ReviewRequest,
    ) -> Result<ReviewOutcome, AppError> {
        actor.require_privileged()?;

        // Serialize reviewers: the status read below sees any committed review
        let mut tx = self.store.begin_immediate().await?;
        let doc = tx
            .get(PENDING_CHANGES, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pending change {} not found", id)))?;
        let mut change = PendingChange::from_document(doc.id, doc.body)?;
        let previous = change.status;

        change.resolve(actor, decision.approve, decision.comment)?;

        let record_id = if decision.approve {
            Some(
                apply_operation(
                    &mut tx,
                    change.operation,
                    change.target_id.as_deref(),
                    change.proposed_state.as_ref(),
                )
                .await?,
            )
        } else {
            None
        };

        let swapped = tx
            .replace_if(
                PENDING_CHANGES,
                id,
                STATUS_FIELD,
                previous.as_str(),
                &change.to_document()?,
            )
            .await?;
        if swapped == 0 {
            // Another reviewer got there first; dropping `tx` undoes our apply.
            return Err(AppError::InvalidState {
                message: format!("Change {} was reviewed concurrently", id),
                current_status: self.current_status(id).await?,
            });
        }
        tx.commit().await?;

        let message = match change.status {
            ChangeStatus::Approved => "Change approved and applied",
            _ => "Change rejected",
        };
        tracing::info!(
            "{} {} change {} ({} by {})",
            actor.label,
            change.status.as_str(),
            id,
            change.operation.as_str(),
            change.requested_by_label
        );

        Ok(ReviewOutcome {
            status: change.status,
            message: message.to_string(),
            record_id,
            comment: change.review_comment,
        })
    }

    async fn load_changes(&self, filter: &Filter) -> Result<Vec<PendingChange>, AppError> {
        let mut changes = self
            .store
            .scan(PENDING_CHANGES, filter)
            .await?
            .into_iter()
            .map(|doc| PendingChange::from_document(doc.id, doc.body))
            .collect::<Result<Vec<_>, _>>()?;

        changes.sort_by(|a, b| b.requested_at.cmp(&a.requested_at));
        Ok(changes)
    }

    async fn current_status(&self, id: &str) -> Result<String, AppError> {
        let doc = self.store.get(PENDING_CHANGES, id).await?;
        Ok(doc
            .and_then(|d| d.body.get(STATUS_FIELD).and_then(Value::as_str).map(str::to_string))
            .unwrap_or_default())
    }
}

/// Write one operation to the catalog. Returns the affected record id.
async fn apply_operation(
    tx: &mut StoreTransaction,
    operation: OperationKind,
    target_id: Option<&str>,
    proposed: Option<&Map<String, Value>>,
) -> Result<String, AppError> {
    let missing = |what: &str| {
        AppError::InvalidInput(format!(
            "Operation '{}' is missing its {}",
            operation.as_str(),
            what
        ))
    };

    match operation {
        OperationKind::Create => {
            let body = proposed.ok_or_else(|| missing("proposed state"))?;
            tx.insert(TANKS, body).await
        }
        OperationKind::Update => {
            let id = target_id.ok_or_else(|| missing("target id"))?;
            let body = proposed.ok_or_else(|| missing("proposed state"))?;
            if tx.replace(TANKS, id, body).await? == 0 {
                return Err(AppError::NotFound(format!("Tank {} not found", id)));
            }
            Ok(id.to_string())
        }
        OperationKind::Delete => {
            let id = target_id.ok_or_else(|| missing("target id"))?;
            if tx.delete(TANKS, id).await? == 0 {
                return Err(AppError::NotFound(format!("Tank {} not found", id)));
            }
            Ok(id.to_string())
        }
    }
}
