use sea_orm::entity::prelude::*;
use sea_orm::ActiveValue::Set;
use serde::{Deserialize, Serialize};

use crate::error::AtelierError;
use crate::workflow::permissions::{Actor, Role};

/// User entity. Users are managed elsewhere; the workflow only reads their
/// role set and active flag.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub name: String,

    #[sea_orm(unique)]
    pub email: String,

    /// JSON array of role tags, e.g. `["editor"]`.
    pub roles: Json,

    pub is_active: bool,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Parse the stored role tags. Tags that no longer name a role are
    /// skipped with a warning.
    pub fn parsed_roles(&self) -> Vec<Role> {
        let tags: Vec<String> = serde_json::from_value(self.roles.clone()).unwrap_or_else(|e| {
            tracing::warn!(user_id = %self.id, error = %e, "user roles column is not a string array");
            Vec::new()
        });
        let mut roles = Vec::with_capacity(tags.len());
        for tag in tags {
            match tag.parse::<Role>() {
                Ok(role) if !roles.contains(&role) => roles.push(role),
                Ok(_) => {}
                Err(_) => tracing::warn!(user_id = %self.id, role = %tag, "skipping unknown role"),
            }
        }
        roles
    }

    pub fn to_actor(&self) -> Actor {
        Actor::new(
            self.id.clone(),
            self.name.clone(),
            self.email.clone(),
            self.parsed_roles(),
        )
    }
}

/// Insert a user with a non-empty role set.
pub async fn create(
    db: &DatabaseConnection,
    name: &str,
    email: &str,
    roles: &[Role],
) -> Result<Model, AtelierError> {
    if roles.is_empty() {
        return Err(AtelierError::Validation(
            "A user needs at least one role".to_string(),
        ));
    }
    let email = email.trim().to_lowercase();
    if Entity::find()
        .filter(Column::Email.eq(email.as_str()))
        .one(db)
        .await?
        .is_some()
    {
        return Err(AtelierError::Conflict(format!(
            "A user with email '{}' already exists",
            email
        )));
    }

    let mut tags: Vec<&str> = Vec::with_capacity(roles.len());
    for role in roles {
        if !tags.contains(&role.as_str()) {
            tags.push(role.as_str());
        }
    }
    let now = chrono::Utc::now();
    let user = ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        name: Set(name.trim().to_string()),
        email: Set(email),
        roles: Set(serde_json::json!(tags)),
        is_active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    tracing::info!(user_id = %user.id, roles = ?tags, "user created");
    Ok(user)
}

pub async fn find(db: &DatabaseConnection, id: &str) -> Result<Option<Model>, AtelierError> {
    Ok(Entity::find_by_id(id).one(db).await?)
}
