use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AtelierError;
use crate::workflow::content::ContentType;
use crate::workflow::permissions::Actor;

/// Mutation a submitter asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 3] = [Action::Create, Action::Update, Action::Delete];

    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = AtelierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| AtelierError::BadRequest(format!("unknown action '{s}'")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    InReview,
    Approved,
    Rejected,
    Completed,
}

impl SubmissionStatus {
    pub const ALL: [SubmissionStatus; 5] = [
        SubmissionStatus::Pending,
        SubmissionStatus::InReview,
        SubmissionStatus::Approved,
        SubmissionStatus::Rejected,
        SubmissionStatus::Completed,
    ];

    /// Statuses a decision may still be taken from.
    pub const OPEN: [SubmissionStatus; 2] = [SubmissionStatus::Pending, SubmissionStatus::InReview];

    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::InReview => "in_review",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Rejected => "rejected",
            SubmissionStatus::Completed => "completed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !Self::OPEN.contains(self)
    }
}

impl fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SubmissionStatus {
    type Err = AtelierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SubmissionStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| AtelierError::BadRequest(format!("unknown submission status '{s}'")))
    }
}

/// Who queued a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Submitter {
    pub id: String,
    pub name: String,
    pub email: String,
}

impl From<&Actor> for Submitter {
    fn from(actor: &Actor) -> Self {
        Submitter {
            id: actor.id.clone(),
            name: actor.name.clone(),
            email: actor.email.clone(),
        }
    }
}

/// An action waiting for a privileged reviewer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SubmissionRequest {
    pub id: String,
    pub content_type: ContentType,
    pub action: Action,
    /// Item the update/delete applies to.
    pub target_id: Option<String>,
    #[schema(value_type = Object)]
    pub payload: serde_json::Value,
    pub submitter: Submitter,
    pub reviewer_id: Option<String>,
    pub reviewer_note: Option<String>,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    /// Set when an approved mutation could not be applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apply_error: Option<String>,
}

/// Input to [`SubmissionStore::create`](crate::workflow::store::SubmissionStore::create).
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubmission {
    pub content_type: ContentType,
    pub action: Action,
    pub target_id: Option<String>,
    pub payload: serde_json::Value,
    pub submitter: Submitter,
}

impl NewSubmission {
    /// Materialize the stored record: `pending`, stamped now.
    pub fn into_request(self, id: String) -> SubmissionRequest {
        self.into_request_at(id, Utc::now())
    }

    pub fn into_request_at(self, id: String, submitted_at: DateTime<Utc>) -> SubmissionRequest {
        SubmissionRequest {
            id,
            content_type: self.content_type,
            action: self.action,
            target_id: self.target_id,
            payload: self.payload,
            submitter: self.submitter,
            reviewer_id: None,
            reviewer_note: None,
            status: SubmissionStatus::Pending,
            submitted_at,
            decided_at: None,
            apply_error: None,
        }
    }
}

/// Conditional update of a submission.
///
/// Stores apply the patch only while the current status is one of `expected`,
/// as a single atomic step. `None` fields are left unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmissionPatch {
    pub expected: Vec<SubmissionStatus>,
    pub status: SubmissionStatus,
    pub reviewer_id: Option<String>,
    pub reviewer_note: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl SubmissionPatch {
    pub fn apply_to(&self, request: &mut SubmissionRequest) {
        request.status = self.status;
        if let Some(reviewer_id) = &self.reviewer_id {
            request.reviewer_id = Some(reviewer_id.clone());
        }
        if let Some(note) = &self.reviewer_note {
            request.reviewer_note = Some(note.clone());
        }
        if let Some(decided_at) = self.decided_at {
            request.decided_at = Some(decided_at);
        }
    }
}

/// Query over stored submissions.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SubmissionFilter {
    pub status: Option<SubmissionStatus>,
    pub content_type: Option<ContentType>,
    pub submitter_id: Option<String>,
    pub limit: Option<u64>,
    #[serde(default)]
    pub offset: u64,
}

impl SubmissionFilter {
    pub fn pending() -> Self {
        SubmissionFilter {
            status: Some(SubmissionStatus::Pending),
            ..Default::default()
        }
    }

    pub fn matches(&self, request: &SubmissionRequest) -> bool {
        self.status.is_none_or(|s| s == request.status)
            && self.content_type.is_none_or(|t| t == request.content_type)
            && self
                .submitter_id
                .as_deref()
                .is_none_or(|id| id == request.submitter.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_and_terminal_statuses() {
        assert!(!SubmissionStatus::Pending.is_terminal());
        assert!(!SubmissionStatus::InReview.is_terminal());
        assert!(SubmissionStatus::Approved.is_terminal());
        assert!(SubmissionStatus::Rejected.is_terminal());
        assert!(SubmissionStatus::Completed.is_terminal());
    }

    #[test]
    fn test_patch_keeps_unset_fields() {
        let mut request = NewSubmission {
            content_type: ContentType::Article,
            action: Action::Create,
            target_id: None,
            payload: serde_json::json!({"title": "x"}),
            submitter: Submitter {
                id: "u1".into(),
                name: "Uma".into(),
                email: "uma@example.com".into(),
            },
        }
        .into_request("s1".into());
        request.reviewer_note = Some("looked at it".into());

        SubmissionPatch {
            expected: SubmissionStatus::OPEN.to_vec(),
            status: SubmissionStatus::InReview,
            reviewer_id: Some("r1".into()),
            reviewer_note: None,
            decided_at: None,
        }
        .apply_to(&mut request);

        assert_eq!(request.status, SubmissionStatus::InReview);
        assert_eq!(request.reviewer_id.as_deref(), Some("r1"));
        assert_eq!(request.reviewer_note.as_deref(), Some("looked at it"));
        assert!(request.decided_at.is_none());
    }
}
