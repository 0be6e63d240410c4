//! Persistence seams for submissions and content items.
//!
//! Both stores are traits with an in-memory backend (tests, single-process
//! demos) and a sea-orm backend. Writes that depend on the current status are
//! compare-and-set operations inside the backend, never a read followed by a
//! separate write.

mod database;
mod memory;

pub use database::{DbContentStore, DbSubmissionStore};
pub use memory::{InMemoryContentStore, InMemorySubmissionStore};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::AtelierError;
use crate::workflow::content::{ContentItem, ContentStatus, ContentType};
use crate::workflow::submission::{
    NewSubmission, SubmissionFilter, SubmissionPatch, SubmissionRequest, SubmissionStatus,
};

/// Storage for queued approval requests.
#[async_trait]
pub trait SubmissionStore: Send + Sync {
    /// Insert a new `pending` request and return its generated id.
    async fn create(&self, request: NewSubmission) -> Result<String, AtelierError> {
        self.create_at(request, Utc::now()).await
    }

    /// [`create`](Self::create) with an explicit submission time. Imports
    /// and replays keep their original timestamps.
    async fn create_at(
        &self,
        request: NewSubmission,
        submitted_at: DateTime<Utc>,
    ) -> Result<String, AtelierError>;

    /// Fetch one request, or `NotFound`.
    async fn get(&self, id: &str) -> Result<SubmissionRequest, AtelierError>;

    /// Requests matching `filter`, oldest submission first. Equal timestamps
    /// keep insertion order.
    async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<SubmissionRequest>, AtelierError>;

    /// [`list`](Self::list) restricted to `pending` requests.
    async fn list_pending(
        &self,
        filter: &SubmissionFilter,
    ) -> Result<Vec<SubmissionRequest>, AtelierError> {
        let filter = SubmissionFilter {
            status: Some(SubmissionStatus::Pending),
            ..filter.clone()
        };
        self.list(&filter).await
    }

    /// Atomically apply `patch` if the request's status is still one of
    /// `patch.expected`. Fails with `NotFound` for unknown ids and
    /// `AlreadyDecided` when the status no longer matches.
    async fn update(
        &self,
        id: &str,
        patch: SubmissionPatch,
    ) -> Result<SubmissionRequest, AtelierError>;

    /// Note why an approved mutation was not applied. The status is left
    /// alone.
    async fn record_apply_error(
        &self,
        id: &str,
        error: &str,
    ) -> Result<SubmissionRequest, AtelierError>;
}

/// Filter for content listings.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContentFilter {
    pub content_type: Option<ContentType>,
    pub status: Option<ContentStatus>,
    pub author_id: Option<String>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl ContentFilter {
    pub fn matches(&self, item: &ContentItem) -> bool {
        self.content_type.is_none_or(|t| t == item.content_type)
            && self.status.is_none_or(|s| s == item.status)
            && self
                .author_id
                .as_deref()
                .is_none_or(|id| id == item.author_id)
    }
}

/// Storage for content items.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn insert(&self, item: ContentItem) -> Result<ContentItem, AtelierError>;

    /// Fetch an item of the given type, or `NotFound`.
    async fn get(&self, content_type: ContentType, id: &str) -> Result<ContentItem, AtelierError>;

    /// Items matching `filter`, oldest first.
    async fn list(&self, filter: &ContentFilter) -> Result<Vec<ContentItem>, AtelierError>;

    /// Overwrite `item` if the stored status still equals `expected` and the
    /// stored version still equals `item.version`. Returns the item with its
    /// version bumped. Fails with `Conflict` when another writer got there
    /// first.
    async fn replace(
        &self,
        item: ContentItem,
        expected: ContentStatus,
    ) -> Result<ContentItem, AtelierError>;

    async fn delete(&self, content_type: ContentType, id: &str) -> Result<(), AtelierError>;
}

pub(crate) fn not_found_submission(id: &str) -> AtelierError {
    AtelierError::NotFound(format!("Submission '{}' not found", id))
}

pub(crate) fn not_found_content(content_type: ContentType, id: &str) -> AtelierError {
    AtelierError::NotFound(format!("{} '{}' not found", content_type, id))
}

pub(crate) fn already_decided(id: &str, current: SubmissionStatus) -> AtelierError {
    AtelierError::AlreadyDecided(format!("Submission '{}' is already {}", id, current))
}

pub(crate) fn status_changed(id: &str, expected: ContentStatus) -> AtelierError {
    AtelierError::Conflict(format!(
        "Content '{}' is no longer {}; reload and retry",
        id, expected
    ))
}

pub(crate) fn edited_concurrently(id: &str) -> AtelierError {
    AtelierError::Conflict(format!(
        "Content '{}' was modified by another request; reload and retry",
        id
    ))
}
