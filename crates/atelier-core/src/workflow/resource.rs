use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AtelierError;
use crate::workflow::content::{
    ContentDraft, ContentItem, ContentPatch, ContentStatus, ContentType, InitialStatus,
};
use crate::workflow::gateway::{ApprovalGateway, PendingMutation};
use crate::workflow::permissions::{Actor, PermissionModel};
use crate::workflow::state_machine;
use crate::workflow::store::{ContentFilter, ContentStore};
use crate::workflow::submission::Action;

/// What an applied mutation did.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Applied {
    Created { item: ContentItem },
    Updated { item: ContentItem },
    Deleted { content_type: ContentType, id: String },
}

/// CRUD over content items. Authorization happens before these calls, in the
/// gateway or the state machine.
#[derive(Clone)]
pub struct ResourceController {
    content: Arc<dyn ContentStore>,
}

fn decode<T: DeserializeOwned>(payload: serde_json::Value, what: &str) -> Result<T, AtelierError> {
    serde_json::from_value(payload)
        .map_err(|e| AtelierError::Validation(format!("Queued payload is not a valid {}: {}", what, e)))
}

impl ResourceController {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self { content }
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.content
    }

    pub async fn get(&self, content_type: ContentType, id: &str) -> Result<ContentItem, AtelierError> {
        self.content.get(content_type, id).await
    }

    pub async fn list(&self, filter: &ContentFilter) -> Result<Vec<ContentItem>, AtelierError> {
        self.content.list(filter).await
    }

    pub async fn create(
        &self,
        content_type: ContentType,
        draft: ContentDraft,
        author_id: &str,
        status: InitialStatus,
    ) -> Result<ContentItem, AtelierError> {
        let item = self
            .content
            .insert(ContentItem::new(content_type, draft, author_id, status))
            .await?;
        tracing::info!(content_id = %item.id, content_type = %content_type, status = %item.status, "content created");
        Ok(item)
    }

    /// Patch fields of an item. Fails with `Conflict` if another write landed
    /// between the read and the write.
    pub async fn update(
        &self,
        content_type: ContentType,
        id: &str,
        patch: ContentPatch,
    ) -> Result<ContentItem, AtelierError> {
        let mut item = self.content.get(content_type, id).await?;
        let expected = item.status;
        item.apply_patch(patch);
        self.content.replace(item, expected).await
    }

    pub async fn delete(&self, content_type: ContentType, id: &str) -> Result<(), AtelierError> {
        self.content.delete(content_type, id).await?;
        tracing::info!(content_id = %id, content_type = %content_type, "content deleted");
        Ok(())
    }

    /// Run the state machine on a stored item and persist the result with a
    /// compare-and-set on the previous status.
    pub async fn transition(
        &self,
        permissions: &PermissionModel,
        actor: &Actor,
        content_type: ContentType,
        id: &str,
        target: ContentStatus,
        reason: Option<&str>,
    ) -> Result<ContentItem, AtelierError> {
        let current = self.content.get(content_type, id).await?;
        let expected = current.status;
        let next = state_machine::transition(permissions, current, target, actor, reason)?;
        self.content.replace(next, expected).await.inspect_err(|e| {
            if matches!(e, AtelierError::Conflict(_)) {
                tracing::warn!(content_id = %id, actor_id = %actor.id, to = %target, "transition lost a race");
            }
        })
    }

    /// [`apply`](Self::apply) for a freshly approved submission. A failure is
    /// recorded on the submission as `apply_error`; its decision stands.
    pub async fn apply_approved(
        &self,
        gateway: &ApprovalGateway,
        submission_id: &str,
        mutation: PendingMutation,
    ) -> Result<Applied, AtelierError> {
        let payload = mutation.payload.clone();
        let err = match self.apply(mutation).await {
            Ok(applied) => return Ok(applied),
            Err(err) => err,
        };

        if err.status_code().is_server_error() {
            tracing::error!(
                submission_id,
                payload = %payload,
                error = %err,
                "approved mutation failed and must be re-applied by hand"
            );
        } else {
            tracing::warn!(submission_id, error = %err, "approved mutation not applied");
        }
        if let Err(record_err) = gateway
            .record_apply_error(submission_id, &err.public_message())
            .await
        {
            tracing::error!(submission_id, error = %record_err, "failed to record apply error");
        }
        Err(err)
    }

    /// Apply the mutation released by an approval. Approved creates are
    /// published and authored by the submitter.
    pub async fn apply(&self, mutation: PendingMutation) -> Result<Applied, AtelierError> {
        let content_type = mutation.content_type;
        let target_id = || {
            mutation.target_id.clone().ok_or_else(|| {
                AtelierError::BadRequest(format!("Queued {} has no target item", mutation.action))
            })
        };

        match mutation.action {
            Action::Create => {
                let draft: ContentDraft = decode(mutation.payload.clone(), "content draft")?;
                let item = self
                    .create(content_type, draft, &mutation.submitter.id, InitialStatus::Published)
                    .await?;
                Ok(Applied::Created { item })
            }
            Action::Update => {
                let id = target_id()?;
                let patch: ContentPatch = decode(mutation.payload.clone(), "content patch")?;
                let item = self.update(content_type, &id, patch).await?;
                Ok(Applied::Updated { item })
            }
            Action::Delete => {
                let id = target_id()?;
                self.delete(content_type, &id).await?;
                Ok(Applied::Deleted { content_type, id })
            }
        }
    }
}
