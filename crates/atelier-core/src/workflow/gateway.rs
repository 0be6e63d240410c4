//! The decision point between direct execution and the review queue.
//!
//! [`ApprovalGateway::evaluate`] routes a create/update/delete either to the
//! caller (`Direct`) or into the [`SubmissionStore`] (`Queued`).
//! [`ApprovalGateway::decide`] is the only writer of terminal submission
//! statuses.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AtelierError;
use crate::workflow::content::{ContentItem, ContentType};
use crate::workflow::permissions::names::*;
use crate::workflow::permissions::Actor;
use crate::workflow::policy::Policy;
use crate::workflow::state_machine::normalize_reason;
use crate::workflow::store::SubmissionStore;
use crate::workflow::submission::{
    Action, NewSubmission, SubmissionFilter, SubmissionPatch, SubmissionRequest, SubmissionStatus,
    Submitter,
};

/// Content type × action → permissions that allow direct execution.
///
/// `manage_all_content` is always a direct grant and is not listed here.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovalRules {
    rules: HashMap<(ContentType, Action), BTreeSet<String>>,
}

/// Per-type management permission, if the type has one.
fn type_grant(content_type: ContentType) -> Option<&'static str> {
    match content_type {
        ContentType::Article => None,
        ContentType::Service => Some(MANAGE_SERVICES),
        ContentType::Portfolio => Some(MANAGE_PORTFOLIO),
        ContentType::Testimonial => Some(MANAGE_TESTIMONIALS),
        ContentType::Product => Some(MANAGE_PRODUCTS),
        ContentType::Team => Some(MANAGE_TEAM),
    }
}

impl Default for ApprovalRules {
    fn default() -> Self {
        let mut rules = HashMap::new();
        for content_type in ContentType::ALL {
            for action in Action::ALL {
                let base = match action {
                    Action::Create | Action::Update => PUBLISH_CONTENT,
                    Action::Delete => DELETE_CONTENT,
                };
                let grants: BTreeSet<String> = std::iter::once(base)
                    .chain(type_grant(content_type))
                    .map(str::to_string)
                    .collect();
                rules.insert((content_type, action), grants);
            }
        }
        ApprovalRules { rules }
    }
}

impl ApprovalRules {
    /// Replace the direct grants for one content type and action.
    pub fn set<I, S>(&mut self, content_type: ContentType, action: Action, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.rules.insert(
            (content_type, action),
            permissions.into_iter().map(Into::into).collect(),
        );
    }

    /// Permissions that execute `action` on `content_type` directly.
    pub fn direct_grants(&self, content_type: ContentType, action: Action) -> BTreeSet<String> {
        self.rules
            .get(&(content_type, action))
            .cloned()
            .unwrap_or_default()
    }
}

/// What [`ApprovalGateway::evaluate`] decided.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Direct,
    Queued { submission_id: String },
}

/// A mutation an actor wants to perform.
#[derive(Debug, Clone)]
pub struct ActionRequest {
    pub content_type: ContentType,
    pub action: Action,
    /// Current state of the item an update or delete applies to.
    pub target: Option<ContentItem>,
    pub payload: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    Approve,
    Reject,
}

/// The queued mutation released by an approval, for the resource controller
/// to apply.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct PendingMutation {
    pub content_type: ContentType,
    pub action: Action,
    pub target_id: Option<String>,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub submitter: Submitter,
}

impl From<&SubmissionRequest> for PendingMutation {
    fn from(request: &SubmissionRequest) -> Self {
        PendingMutation {
            content_type: request.content_type,
            action: request.action,
            target_id: request.target_id.clone(),
            payload: request.payload.clone(),
            submitter: request.submitter.clone(),
        }
    }
}

/// Outcome of [`ApprovalGateway::decide`].
#[derive(Debug, Clone)]
pub struct Decided {
    pub request: SubmissionRequest,
    /// Present only when the request was approved.
    pub pending_mutation: Option<PendingMutation>,
}

#[derive(Clone)]
pub struct ApprovalGateway {
    policy: Arc<Policy>,
    store: Arc<dyn SubmissionStore>,
}

impl ApprovalGateway {
    pub fn new(policy: Arc<Policy>, store: Arc<dyn SubmissionStore>) -> Self {
        Self { policy, store }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// True if `actor` may perform the action without review.
    pub fn is_direct(&self, actor: &Actor, request: &ActionRequest) -> bool {
        let permissions = &self.policy.permissions;
        if permissions.has_permission(&actor.roles, MANAGE_ALL_CONTENT) {
            return true;
        }
        let grants = self
            .policy
            .approvals
            .direct_grants(request.content_type, request.action);
        match &request.target {
            Some(target) => grants
                .iter()
                .any(|p| permissions.can_act_on_own_content(actor, target, p)),
            None => grants
                .iter()
                .any(|p| permissions.has_permission(&actor.roles, p)),
        }
    }

    /// Decide whether `request` runs now or waits for a reviewer. A queued
    /// request is stored as `pending` before this returns.
    ///
    /// Actors who can neither act directly nor submit for approval get
    /// `Unauthorized`; the request is never queued on their behalf.
    pub async fn evaluate(
        &self,
        actor: &Actor,
        request: ActionRequest,
    ) -> Result<Decision, AtelierError> {
        if request.action != Action::Create && request.target.is_none() {
            return Err(AtelierError::BadRequest(format!(
                "{} requires an existing item",
                request.action
            )));
        }

        if self.is_direct(actor, &request) {
            tracing::info!(
                actor_id = %actor.id,
                content_type = %request.content_type,
                action = %request.action,
                "direct execution"
            );
            return Ok(Decision::Direct);
        }

        let permissions = &self.policy.permissions;
        permissions.require(actor, SUBMIT_FOR_APPROVAL)?;
        if let Some(target) = &request.target {
            let reachable = [SUBMIT_FOR_APPROVAL, EDIT_OTHERS_CONTENT];
            if !permissions.can_act_with_any(actor, target, &reachable) {
                return Err(AtelierError::Unauthorized(format!(
                    "Cannot submit changes to {} '{}' owned by another user",
                    target.content_type, target.id
                )));
            }
        }

        let submission_id = self
            .store
            .create(NewSubmission {
                content_type: request.content_type,
                action: request.action,
                target_id: request.target.map(|t| t.id),
                payload: request.payload,
                submitter: Submitter::from(actor),
            })
            .await?;

        tracing::info!(
            submission_id = %submission_id,
            actor_id = %actor.id,
            content_type = %request.content_type,
            action = %request.action,
            "queued for approval"
        );
        Ok(Decision::Queued { submission_id })
    }

    /// Approve or reject an open request.
    ///
    /// The status change is one compare-and-set in the store, so of two racing
    /// calls exactly one succeeds and the other gets `AlreadyDecided`.
    pub async fn decide(
        &self,
        id: &str,
        decision: ReviewDecision,
        reviewer: &Actor,
        note: Option<&str>,
    ) -> Result<Decided, AtelierError> {
        self.policy.permissions.require(reviewer, APPROVE_CONTENT)?;

        let note = normalize_reason(note);
        let status = match decision {
            ReviewDecision::Approve => SubmissionStatus::Approved,
            ReviewDecision::Reject if note.is_none() => return Err(AtelierError::MissingReason),
            ReviewDecision::Reject => SubmissionStatus::Rejected,
        };

        let result = self
            .store
            .update(
                id,
                SubmissionPatch {
                    expected: SubmissionStatus::OPEN.to_vec(),
                    status,
                    reviewer_id: Some(reviewer.id.clone()),
                    reviewer_note: note,
                    decided_at: Some(Utc::now()),
                },
            )
            .await;

        let request = match result {
            Ok(request) => request,
            Err(err) => {
                if matches!(err, AtelierError::AlreadyDecided(_)) {
                    tracing::warn!(submission_id = %id, reviewer_id = %reviewer.id, "decision lost: {}", err);
                }
                return Err(err);
            }
        };

        tracing::info!(
            submission_id = %request.id,
            reviewer_id = %reviewer.id,
            content_type = %request.content_type,
            action = %request.action,
            status = %request.status,
            "submission decided"
        );

        let pending_mutation =
            (decision == ReviewDecision::Approve).then(|| PendingMutation::from(&request));
        Ok(Decided {
            request,
            pending_mutation,
        })
    }

    /// Mark a pending request as being reviewed by `reviewer`.
    pub async fn claim(&self, id: &str, reviewer: &Actor) -> Result<SubmissionRequest, AtelierError> {
        self.policy.permissions.require(reviewer, APPROVE_CONTENT)?;
        let request = self
            .store
            .update(
                id,
                SubmissionPatch {
                    expected: vec![SubmissionStatus::Pending],
                    status: SubmissionStatus::InReview,
                    reviewer_id: Some(reviewer.id.clone()),
                    reviewer_note: None,
                    decided_at: None,
                },
            )
            .await?;
        tracing::info!(submission_id = %id, reviewer_id = %reviewer.id, "submission claimed");
        Ok(request)
    }

    /// Reviewer queue listing. Requires `approve_content`.
    pub async fn list(
        &self,
        reviewer: &Actor,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRequest>, AtelierError> {
        self.policy.permissions.require(reviewer, APPROVE_CONTENT)?;
        self.store.list(filter).await
    }

    /// Pending requests, oldest first.
    pub async fn list_pending(
        &self,
        reviewer: &Actor,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRequest>, AtelierError> {
        self.policy.permissions.require(reviewer, APPROVE_CONTENT)?;
        self.store.list_pending(filter).await
    }

    /// Requests submitted by `actor`, in any status.
    pub async fn mine(
        &self,
        actor: &Actor,
        mut filter: SubmissionFilter,
    ) -> Result<Vec<SubmissionRequest>, AtelierError> {
        filter.submitter_id = Some(actor.id.clone());
        self.store.list(&filter).await
    }

    /// Store why an approved request's mutation failed.
    pub async fn record_apply_error(
        &self,
        id: &str,
        error: &str,
    ) -> Result<SubmissionRequest, AtelierError> {
        self.store.record_apply_error(id, error).await
    }

    /// Read the store once without returning anything; used by health checks.
    pub async fn probe(&self, filter: &SubmissionFilter) -> Result<(), AtelierError> {
        self.store.list(filter).await.map(|_| ())
    }

    /// One request, visible to reviewers and to its submitter. Anyone else
    /// gets `NotFound` so ids do not leak.
    pub async fn get_for(&self, actor: &Actor, id: &str) -> Result<SubmissionRequest, AtelierError> {
        let request = self.store.get(id).await?;
        let is_reviewer = self
            .policy
            .permissions
            .has_permission(&actor.roles, APPROVE_CONTENT);
        if is_reviewer || request.submitter.id == actor.id {
            Ok(request)
        } else {
            Err(AtelierError::NotFound(format!("Submission '{}' not found", id)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules_are_total() {
        let rules = ApprovalRules::default();
        for content_type in ContentType::ALL {
            for action in Action::ALL {
                assert!(!rules.direct_grants(content_type, action).is_empty());
            }
        }
    }

    #[test]
    fn test_type_specific_grants() {
        let rules = ApprovalRules::default();
        let service = rules.direct_grants(ContentType::Service, Action::Create);
        assert!(service.contains(MANAGE_SERVICES));
        assert!(service.contains(PUBLISH_CONTENT));

        let article_delete = rules.direct_grants(ContentType::Article, Action::Delete);
        assert_eq!(
            article_delete.into_iter().collect::<Vec<_>>(),
            vec![DELETE_CONTENT.to_string()]
        );
    }

    #[test]
    fn test_set_replaces_grants() {
        let mut rules = ApprovalRules::default();
        rules.set(ContentType::Article, Action::Create, ["approve_content"]);
        let grants = rules.direct_grants(ContentType::Article, Action::Create);
        assert_eq!(grants.len(), 1);
        assert!(grants.contains(APPROVE_CONTENT));
    }
}
