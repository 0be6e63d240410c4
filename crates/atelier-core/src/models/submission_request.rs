use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::AtelierError;
use crate::workflow::submission::{SubmissionRequest, Submitter};

/// Queued approval request stored in the `submission_requests` table.
///
/// `seq` is an insertion counter used to break ties between requests
/// submitted at the same instant; `id` is the public identifier.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "submission_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub seq: i32,

    #[sea_orm(unique)]
    pub id: String,

    pub content_type: String,

    pub action: String,

    pub target_id: Option<String>,

    pub payload: Json,

    pub submitter_id: String,
    pub submitter_name: String,
    pub submitter_email: String,

    pub reviewer_id: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub reviewer_note: Option<String>,

    pub status: String,

    pub submitted_at: DateTimeUtc,
    pub decided_at: Option<DateTimeUtc>,

    #[sea_orm(column_type = "Text", nullable)]
    pub apply_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl TryFrom<Model> for SubmissionRequest {
    type Error = AtelierError;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let unreadable = |what: &str, e: AtelierError| {
            AtelierError::Storage(format!("submission '{}' has an unreadable {what}: {e}", m.id))
        };
        let content_type = m
            .content_type
            .parse()
            .map_err(|e| unreadable("content type", e))?;
        let action = m.action.parse().map_err(|e| unreadable("action", e))?;
        let status = m.status.parse().map_err(|e| unreadable("status", e))?;
        Ok(SubmissionRequest {
            id: m.id,
            content_type,
            action,
            target_id: m.target_id,
            payload: m.payload,
            submitter: Submitter {
                id: m.submitter_id,
                name: m.submitter_name,
                email: m.submitter_email,
            },
            reviewer_id: m.reviewer_id,
            reviewer_note: m.reviewer_note,
            status,
            submitted_at: m.submitted_at,
            decided_at: m.decided_at,
            apply_error: m.apply_error,
        })
    }
}
