use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect,
    SqlErr,
};

use super::{
    already_decided, edited_concurrently, not_found_content, not_found_submission,
    status_changed, ContentFilter, ContentStore, SubmissionStore,
};
use crate::error::AtelierError;
use crate::models::{content_item, submission_request};
use crate::workflow::content::{ContentItem, ContentStatus, ContentType};
use crate::workflow::submission::{NewSubmission, SubmissionFilter, SubmissionPatch, SubmissionRequest};

/// Submission store on top of the `submission_requests` table.
///
/// Decisions are a single conditional `UPDATE ... WHERE id = ? AND status IN (...)`;
/// the affected row count tells whether this writer won.
#[derive(Clone)]
pub struct DbSubmissionStore {
    db: DatabaseConnection,
}

impl DbSubmissionStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubmissionStore for DbSubmissionStore {
    async fn create_at(
        &self,
        request: NewSubmission,
        submitted_at: DateTime<Utc>,
    ) -> Result<String, AtelierError> {
        let id = uuid::Uuid::new_v4().to_string();
        let record = request.into_request_at(id.clone(), submitted_at);

        let model = submission_request::ActiveModel {
            seq: NotSet,
            id: Set(record.id),
            content_type: Set(record.content_type.to_string()),
            action: Set(record.action.to_string()),
            target_id: Set(record.target_id),
            payload: Set(record.payload),
            submitter_id: Set(record.submitter.id),
            submitter_name: Set(record.submitter.name),
            submitter_email: Set(record.submitter.email),
            reviewer_id: Set(None),
            reviewer_note: Set(None),
            status: Set(record.status.to_string()),
            submitted_at: Set(record.submitted_at),
            decided_at: Set(None),
            apply_error: Set(None),
        };
        submission_request::Entity::insert(model)
            .exec_without_returning(&self.db)
            .await?;
        Ok(id)
    }

    async fn get(&self, id: &str) -> Result<SubmissionRequest, AtelierError> {
        submission_request::Entity::find()
            .filter(submission_request::Column::Id.eq(id))
            .one(&self.db)
            .await?
            .ok_or_else(|| not_found_submission(id))?
            .try_into()
    }

    async fn list(&self, filter: &SubmissionFilter) -> Result<Vec<SubmissionRequest>, AtelierError> {
        let mut query = submission_request::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(submission_request::Column::Status.eq(status.as_str()));
        }
        if let Some(content_type) = filter.content_type {
            query = query.filter(submission_request::Column::ContentType.eq(content_type.as_str()));
        }
        if let Some(submitter_id) = filter.submitter_id.as_deref() {
            query = query.filter(submission_request::Column::SubmitterId.eq(submitter_id));
        }

        query
            .order_by_asc(submission_request::Column::SubmittedAt)
            .order_by_asc(submission_request::Column::Seq)
            .offset(filter.offset)
            .limit(filter.limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(SubmissionRequest::try_from)
            .collect()
    }

    async fn update(
        &self,
        id: &str,
        patch: SubmissionPatch,
    ) -> Result<SubmissionRequest, AtelierError> {
        use submission_request::Column;

        let mut update = submission_request::Entity::update_many()
            .col_expr(Column::Status, Expr::value(patch.status.as_str()))
            .filter(Column::Id.eq(id))
            .filter(Column::Status.is_in(patch.expected.iter().map(|s| s.as_str())));
        if let Some(reviewer_id) = patch.reviewer_id {
            update = update.col_expr(Column::ReviewerId, Expr::value(reviewer_id));
        }
        if let Some(note) = patch.reviewer_note {
            update = update.col_expr(Column::ReviewerNote, Expr::value(note));
        }
        if let Some(decided_at) = patch.decided_at {
            update = update.col_expr(Column::DecidedAt, Expr::value(decided_at));
        }

        let result = update.exec(&self.db).await?;
        let current = self.get(id).await?;
        if result.rows_affected == 0 {
            return Err(already_decided(id, current.status));
        }
        Ok(current)
    }

    async fn record_apply_error(
        &self,
        id: &str,
        error: &str,
    ) -> Result<SubmissionRequest, AtelierError> {
        use submission_request::Column;

        let result = submission_request::Entity::update_many()
            .col_expr(Column::ApplyError, Expr::value(error))
            .filter(Column::Id.eq(id))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found_submission(id));
        }
        self.get(id).await
    }
}

/// Content store on top of the `content_items` table.
#[derive(Clone)]
pub struct DbContentStore {
    db: DatabaseConnection,
}

impl DbContentStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn insert_error(id: &str, err: DbErr) -> AtelierError {
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AtelierError::Conflict(format!("Content '{}' already exists", id))
        }
        _ => AtelierError::Database(err),
    }
}

#[async_trait]
impl ContentStore for DbContentStore {
    async fn insert(&self, item: ContentItem) -> Result<ContentItem, AtelierError> {
        content_item::Entity::insert(content_item::active_model(&item, true)?)
            .exec_without_returning(&self.db)
            .await
            .map_err(|e| insert_error(&item.id, e))?;
        Ok(item)
    }

    async fn get(&self, content_type: ContentType, id: &str) -> Result<ContentItem, AtelierError> {
        content_item::Entity::find_by_id(id)
            .filter(content_item::Column::ContentType.eq(content_type.as_str()))
            .one(&self.db)
            .await?
            .ok_or_else(|| not_found_content(content_type, id))?
            .try_into()
    }

    async fn list(&self, filter: &ContentFilter) -> Result<Vec<ContentItem>, AtelierError> {
        let mut query = content_item::Entity::find();
        if let Some(content_type) = filter.content_type {
            query = query.filter(content_item::Column::ContentType.eq(content_type.as_str()));
        }
        if let Some(status) = filter.status {
            query = query.filter(content_item::Column::Status.eq(status.as_str()));
        }
        if let Some(author_id) = filter.author_id.as_deref() {
            query = query.filter(content_item::Column::AuthorId.eq(author_id));
        }

        query
            .order_by_asc(content_item::Column::CreatedAt)
            .offset(filter.offset)
            .limit(filter.limit)
            .all(&self.db)
            .await?
            .into_iter()
            .map(ContentItem::try_from)
            .collect()
    }

    async fn replace(
        &self,
        item: ContentItem,
        expected: ContentStatus,
    ) -> Result<ContentItem, AtelierError> {
        use content_item::Column;

        let read_version = item.version;
        let mut item = item;
        item.version = read_version + 1;

        let result = content_item::Entity::update_many()
            .set(content_item::active_model(&item, false)?)
            .filter(Column::Id.eq(item.id.as_str()))
            .filter(Column::ContentType.eq(item.content_type.as_str()))
            .filter(Column::Status.eq(expected.as_str()))
            .filter(Column::Version.eq(read_version))
            .exec(&self.db)
            .await?;

        if result.rows_affected == 0 {
            // Distinguish a vanished row from a lost race.
            let current = self.get(item.content_type, &item.id).await?;
            if current.status != expected {
                return Err(status_changed(&item.id, expected));
            }
            return Err(edited_concurrently(&item.id));
        }
        Ok(item)
    }

    async fn delete(&self, content_type: ContentType, id: &str) -> Result<(), AtelierError> {
        let result = content_item::Entity::delete_many()
            .filter(content_item::Column::Id.eq(id))
            .filter(content_item::Column::ContentType.eq(content_type.as_str()))
            .exec(&self.db)
            .await?;
        if result.rows_affected == 0 {
            return Err(not_found_content(content_type, id));
        }
        Ok(())
    }
}
