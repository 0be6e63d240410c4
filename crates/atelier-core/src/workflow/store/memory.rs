use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{
    already_decided, edited_concurrently, not_found_content, not_found_submission,
    status_changed, ContentFilter, ContentStore, SubmissionStore,
};
use crate::error::AtelierError;
use crate::workflow::content::{ContentItem, ContentStatus, ContentType};
use crate::workflow::submission::{NewSubmission, SubmissionFilter, SubmissionPatch, SubmissionRequest};

fn paginate<T>(items: Vec<T>, limit: Option<u64>, offset: u64) -> Vec<T> {
    let skipped = items.into_iter().skip(offset as usize);
    match limit {
        Some(limit) => skipped.take(limit as usize).collect(),
        None => skipped.collect(),
    }
}

/// Submission store backed by a vector in insertion order.
///
/// The write lock is held for the whole check-and-write in
/// [`update`](SubmissionStore::update).
#[derive(Default)]
pub struct InMemorySubmissionStore {
    requests: RwLock<Vec<SubmissionRequest>>,
}

impl InMemorySubmissionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored requests, in any status.
    pub async fn len(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.requests.read().await.is_empty()
    }
}

#[async_trait]
impl SubmissionStore for InMemorySubmissionStore {
    async fn create_at(
        &self,
        request: NewSubmission,
        submitted_at: DateTime<Utc>,
    ) -> Result<String, AtelierError> {
        let id = uuid::Uuid::new_v4().to_string();
        let record = request.into_request_at(id.clone(), submitted_at);
        self.requests.write().await.push(record);
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<SubmissionRequest, AtelierError> {
        self.requests
            .read()
            .await
            .iter()
            .find(|r| r.id == id)
            .cloned()
            .ok_or_else(|| not_found_submission(id))
    }

    async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<SubmissionRequest>, AtelierError> {
        let mut matching: Vec<SubmissionRequest> = self
            .requests
            .read()
            .await
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        // Stable sort: ties stay in insertion order.
        matching.sort_by_key(|r| r.submitted_at);
        Ok(paginate(matching, filter.limit, filter.offset))
    }

    async fn update(
        &self,
        id: &str,
        patch: SubmissionPatch,
    ) -> Result<SubmissionRequest, AtelierError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found_submission(id))?;
        if !patch.expected.contains(&request.status) {
            return Err(already_decided(id, request.status));
        }
        patch.apply_to(request);
        Ok(request.clone())
    }

    async fn record_apply_error(
        &self,
        id: &str,
        error: &str,
    ) -> Result<SubmissionRequest, AtelierError> {
        let mut requests = self.requests.write().await;
        let request = requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| not_found_submission(id))?;
        request.apply_error = Some(error.to_string());
        Ok(request.clone())
    }
}

/// Content store backed by a vector in insertion order.
#[derive(Default)]
pub struct InMemoryContentStore {
    items: RwLock<Vec<ContentItem>>,
}

impl InMemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentStore for InMemoryContentStore {
    async fn insert(&self, item: ContentItem) -> Result<ContentItem, AtelierError> {
        let mut items = self.items.write().await;
        if items.iter().any(|i| i.id == item.id) {
            return Err(AtelierError::Conflict(format!(
                "Content '{}' already exists",
                item.id
            )));
        }
        items.push(item.clone());
        Ok(item)
    }

    async fn get(&self, content_type: ContentType, id: &str) -> Result<ContentItem, AtelierError> {
        self.items
            .read()
            .await
            .iter()
            .find(|i| i.id == id && i.content_type == content_type)
            .cloned()
            .ok_or_else(|| not_found_content(content_type, id))
    }

    async fn list(&self, filter: &ContentFilter) -> Result<Vec<ContentItem>, AtelierError> {
        let mut matching: Vec<ContentItem> = self
            .items
            .read()
            .await
            .iter()
            .filter(|i| filter.matches(i))
            .cloned()
            .collect();
        matching.sort_by_key(|i| i.created_at);
        Ok(paginate(matching, filter.limit, filter.offset))
    }

    async fn replace(
        &self,
        item: ContentItem,
        expected: ContentStatus,
    ) -> Result<ContentItem, AtelierError> {
        let mut items = self.items.write().await;
        let slot = items
            .iter_mut()
            .find(|i| i.id == item.id && i.content_type == item.content_type)
            .ok_or_else(|| not_found_content(item.content_type, &item.id))?;
        if slot.status != expected {
            return Err(status_changed(&item.id, expected));
        }
        if slot.version != item.version {
            return Err(edited_concurrently(&item.id));
        }
        let mut item = item;
        item.version += 1;
        *slot = item.clone();
        Ok(item)
    }

    async fn delete(&self, content_type: ContentType, id: &str) -> Result<(), AtelierError> {
        let mut items = self.items.write().await;
        let before = items.len();
        items.retain(|i| !(i.id == id && i.content_type == content_type));
        if items.len() == before {
            return Err(not_found_content(content_type, id));
        }
        Ok(())
    }
}
