use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::{NotSet, Set};
use serde::{Deserialize, Serialize};

use crate::error::AtelierError;
use crate::workflow::content::{ContentItem, HistoryEntry};

/// Content item document stored in the `content_items` table.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_items")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub content_type: String,

    pub title: String,

    #[sea_orm(column_type = "Text")]
    pub body: String,

    pub category: Option<String>,

    pub tags: Json,

    pub attributes: Json,

    pub author_id: String,

    pub status: String,

    pub rejection_reason: Option<String>,

    pub history: Json,

    pub version: i64,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

fn corrupt(id: &str, what: &str, err: impl std::fmt::Display) -> AtelierError {
    AtelierError::Storage(format!("content item '{id}' has an unreadable {what}: {err}"))
}

impl TryFrom<Model> for ContentItem {
    type Error = AtelierError;

    fn try_from(m: Model) -> Result<Self, Self::Error> {
        let tags: Vec<String> =
            serde_json::from_value(m.tags).map_err(|e| corrupt(&m.id, "tags column", e))?;
        let history: Vec<HistoryEntry> =
            serde_json::from_value(m.history).map_err(|e| corrupt(&m.id, "history column", e))?;
        Ok(ContentItem {
            content_type: m
                .content_type
                .parse()
                .map_err(|e| corrupt(&m.id, "content type", e))?,
            status: m.status.parse().map_err(|e| corrupt(&m.id, "status", e))?,
            id: m.id,
            title: m.title,
            body: m.body,
            category: m.category,
            tags,
            attributes: m.attributes,
            author_id: m.author_id,
            created_at: m.created_at,
            updated_at: m.updated_at,
            rejection_reason: m.rejection_reason,
            history,
            version: m.version,
        })
    }
}

/// Every column except the primary key, ready for insert or update.
pub fn active_model(item: &ContentItem, with_id: bool) -> Result<ActiveModel, AtelierError> {
    let history = serde_json::to_value(&item.history)
        .map_err(|e| AtelierError::Internal(format!("Failed to encode history: {e}")))?;
    Ok(ActiveModel {
        id: if with_id { Set(item.id.clone()) } else { NotSet },
        content_type: Set(item.content_type.to_string()),
        title: Set(item.title.clone()),
        body: Set(item.body.clone()),
        category: Set(item.category.clone()),
        tags: Set(serde_json::json!(item.tags)),
        attributes: Set(item.attributes.clone()),
        author_id: Set(item.author_id.clone()),
        status: Set(item.status.to_string()),
        rejection_reason: Set(item.rejection_reason.clone()),
        history: Set(history),
        version: Set(item.version),
        created_at: Set(item.created_at),
        updated_at: Set(item.updated_at),
    })
}
