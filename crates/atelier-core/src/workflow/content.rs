use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::error::AtelierError;

/// Kinds of content the agency site manages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    Article,
    Service,
    Portfolio,
    Testimonial,
    Product,
    Team,
}

impl ContentType {
    pub const ALL: [ContentType; 6] = [
        ContentType::Article,
        ContentType::Service,
        ContentType::Portfolio,
        ContentType::Testimonial,
        ContentType::Product,
        ContentType::Team,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::Article => "article",
            ContentType::Service => "service",
            ContentType::Portfolio => "portfolio",
            ContentType::Testimonial => "testimonial",
            ContentType::Product => "product",
            ContentType::Team => "team",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentType {
    type Err = AtelierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AtelierError::BadRequest(format!("unknown content type '{s}'")))
    }
}

/// Lifecycle status of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentStatus {
    Draft,
    PendingApproval,
    Published,
    Rejected,
    Archived,
}

impl ContentStatus {
    pub const ALL: [ContentStatus; 5] = [
        ContentStatus::Draft,
        ContentStatus::PendingApproval,
        ContentStatus::Published,
        ContentStatus::Rejected,
        ContentStatus::Archived,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ContentStatus::Draft => "draft",
            ContentStatus::PendingApproval => "pending_approval",
            ContentStatus::Published => "published",
            ContentStatus::Rejected => "rejected",
            ContentStatus::Archived => "archived",
        }
    }
}

impl fmt::Display for ContentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ContentStatus {
    type Err = AtelierError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ContentStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| AtelierError::BadRequest(format!("unknown content status '{s}'")))
    }
}

/// Status a newly created item may start in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InitialStatus {
    Draft,
    #[default]
    Published,
}

impl From<InitialStatus> for ContentStatus {
    fn from(status: InitialStatus) -> Self {
        match status {
            InitialStatus::Draft => ContentStatus::Draft,
            InitialStatus::Published => ContentStatus::Published,
        }
    }
}

/// One recorded status change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct HistoryEntry {
    pub from: ContentStatus,
    pub to: ContentStatus,
    pub at: DateTime<Utc>,
    pub actor_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A unit of publishable content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ContentItem {
    pub id: String,
    pub content_type: ContentType,
    pub title: String,
    pub body: String,
    pub category: Option<String>,
    pub tags: Vec<String>,
    /// Type-specific fields (service price, portfolio client, ...).
    #[schema(value_type = Object)]
    pub attributes: serde_json::Value,
    pub author_id: String,
    pub status: ContentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub rejection_reason: Option<String>,
    pub history: Vec<HistoryEntry>,
    /// Bumped by the store on every write. A write based on an older read fails.
    #[serde(default = "first_version")]
    pub version: i64,
}

fn first_version() -> i64 {
    1
}

impl ContentItem {
    /// Build a new item. Creation is the only place a status is assigned
    /// without going through the state machine, and it records no history.
    pub fn new(
        content_type: ContentType,
        draft: ContentDraft,
        author_id: impl Into<String>,
        status: InitialStatus,
    ) -> Self {
        let now = Utc::now();
        ContentItem {
            id: uuid::Uuid::new_v4().to_string(),
            content_type,
            title: draft.title,
            body: draft.body,
            category: draft.category,
            tags: draft.tags,
            attributes: draft.attributes,
            author_id: author_id.into(),
            status: status.into(),
            created_at: now,
            updated_at: now,
            rejection_reason: None,
            history: Vec::new(),
            version: first_version(),
        }
    }

    /// Apply a field patch. Status is untouched.
    pub fn apply_patch(&mut self, patch: ContentPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(body) = patch.body {
            self.body = body;
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(attributes) = patch.attributes {
            self.attributes = attributes;
        }
        self.updated_at = Utc::now();
    }

    /// Published items are public; everything else is editorial.
    pub fn is_public(&self) -> bool {
        self.status == ContentStatus::Published
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

/// Fields of a new content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ContentDraft {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    pub body: String,
    #[validate(length(min = 1, max = 80))]
    pub category: Option<String>,
    #[serde(default)]
    #[validate(length(max = 32))]
    pub tags: Vec<String>,
    #[serde(default = "empty_object")]
    #[schema(value_type = Object)]
    pub attributes: serde_json::Value,
}

/// Partial update of a content item's fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ContentPatch {
    #[validate(length(min = 1, max = 200))]
    pub title: Option<String>,
    pub body: Option<String>,
    #[validate(length(min = 1, max = 80))]
    pub category: Option<String>,
    #[validate(length(max = 32))]
    pub tags: Option<Vec<String>>,
    #[schema(value_type = Option<Object>)]
    pub attributes: Option<serde_json::Value>,
}

impl ContentPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.body.is_none()
            && self.category.is_none()
            && self.tags.is_none()
            && self.attributes.is_none()
    }
}
