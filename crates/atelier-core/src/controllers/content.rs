use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::controllers::AppState;
use crate::error::AtelierError;
use crate::extractors::{AuthActor, Json, MaybeActor, Pagination, Query};
use crate::response::ApiResponse;
use crate::workflow::content::HistoryEntry;
use crate::workflow::permissions::names::{APPROVE_CONTENT, MANAGE_ALL_CONTENT, MANAGE_OWN_CONTENT};
use crate::workflow::store::ContentFilter;
use crate::workflow::{
    Action, ActionRequest, Actor, ContentDraft, ContentItem, ContentPatch, ContentStatus,
    ContentType, Decision, InitialStatus,
};

// ── Request / response types ──

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateContentRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub draft: ContentDraft,
    /// Initial status for direct creation (default `published`).
    #[serde(default)]
    pub status: Option<InitialStatus>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TransitionRequest {
    pub to: ContentStatus,
    pub reason: Option<String>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListContentQuery {
    pub status: Option<ContentStatus>,
}

/// Result of a gateway-evaluated mutation. `queued` tells the client whether
/// the change happened or is waiting for review.
#[derive(Debug, Default, Serialize, ToSchema)]
pub struct MutationResponse {
    pub queued: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub item: Option<ContentItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<bool>,
}

impl MutationResponse {
    fn applied(item: ContentItem) -> Self {
        MutationResponse {
            item: Some(item),
            ..Default::default()
        }
    }

    fn deleted() -> Self {
        MutationResponse {
            deleted: Some(true),
            ..Default::default()
        }
    }

    fn queued(submission_id: String) -> Response {
        ApiResponse::success(MutationResponse {
            queued: true,
            submission_id: Some(submission_id),
            ..Default::default()
        })
        .with_status(StatusCode::ACCEPTED)
        .into_response()
    }
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/api/content/{type}",
            get(list_content).post(create_content),
        )
        .route("/api/content/{type}/drafts", post(create_draft))
        .route(
            "/api/content/{type}/{id}",
            get(get_content).put(update_content).delete(delete_content),
        )
        .route(
            "/api/content/{type}/{id}/transitions",
            post(transition_content),
        )
        .route("/api/content/{type}/{id}/history", get(content_history))
}

// ── Helpers ──

/// Actors who may see every item regardless of status.
fn is_editorial(state: &AppState, actor: &Actor) -> bool {
    state
        .policy
        .permissions
        .require_any(actor, &[MANAGE_ALL_CONTENT, APPROVE_CONTENT])
        .is_ok()
}

fn is_visible(state: &AppState, actor: Option<&Actor>, item: &ContentItem) -> bool {
    item.is_public()
        || actor.is_some_and(|a| a.id == item.author_id || is_editorial(state, a))
}

async fn load_visible(
    state: &AppState,
    actor: Option<&Actor>,
    content_type: ContentType,
    id: &str,
) -> Result<ContentItem, AtelierError> {
    let item = state.resources.get(content_type, id).await?;
    if is_visible(state, actor, &item) {
        Ok(item)
    } else {
        Err(AtelierError::NotFound(format!("{} '{}' not found", content_type, id)))
    }
}

/// Edits to an unpublished item stay with its author, like draft creation.
fn edits_private_item(state: &AppState, actor: &Actor, item: &ContentItem) -> bool {
    let private = matches!(item.status, ContentStatus::Draft | ContentStatus::Rejected);
    private
        && state
            .policy
            .permissions
            .can_act_with_any(actor, item, &[MANAGE_ALL_CONTENT, MANAGE_OWN_CONTENT])
}

fn to_payload<T: Serialize>(value: &T) -> Result<serde_json::Value, AtelierError> {
    serde_json::to_value(value)
        .map_err(|e| AtelierError::Internal(format!("Failed to encode payload: {}", e)))
}

// ── Handlers ──

/// List items of a content type.
#[utoipa::path(
    get,
    path = "/api/content/{type}",
    params(
        ("type" = ContentType, Path, description = "Content type"),
        ListContentQuery,
        Pagination
    ),
    responses(
        (status = 200, description = "Items, oldest first", body = ApiResponse<Vec<ContentItem>>),
        (status = 400, description = "Unknown content type")
    ),
    tag = "content"
)]
pub async fn list_content(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
    Path(content_type): Path<String>,
    Query(query): Query<ListContentQuery>,
    pagination: Pagination,
) -> Result<ApiResponse<Vec<ContentItem>>, AtelierError> {
    let content_type: ContentType = content_type.parse()?;
    let mut filter = ContentFilter {
        content_type: Some(content_type),
        status: query.status,
        author_id: None,
        limit: Some(pagination.limit),
        offset: pagination.offset,
    };

    match &actor {
        Some(actor) if is_editorial(&state, actor) => {}
        Some(actor) if query.status.is_some_and(|s| s != ContentStatus::Published) => {
            filter.author_id = Some(actor.id.clone());
        }
        _ => filter.status = Some(ContentStatus::Published),
    }

    let items = state.resources.list(&filter).await?;
    Ok(ApiResponse::success(items))
}

/// Create an item, directly or through the approval queue.
#[utoipa::path(
    post,
    path = "/api/content/{type}",
    params(("type" = ContentType, Path, description = "Content type")),
    request_body = CreateContentRequest,
    responses(
        (status = 201, description = "Created directly", body = ApiResponse<MutationResponse>),
        (status = 202, description = "Queued for approval", body = ApiResponse<MutationResponse>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Cannot create or submit this content"),
        (status = 422, description = "Invalid input")
    ),
    tag = "content",
    security(("bearer_auth" = []))
)]
pub async fn create_content(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Path(content_type): Path<String>,
    Json(payload): Json<CreateContentRequest>,
) -> Result<Response, AtelierError> {
    let content_type: ContentType = content_type.parse()?;
    payload.validate()?;

    let request = ActionRequest {
        content_type,
        action: Action::Create,
        target: None,
        payload: to_payload(&payload.draft)?,
    };
    match state.gateway.evaluate(&actor, request).await? {
        Decision::Direct => {
            let item = state
                .resources
                .create(
                    content_type,
                    payload.draft,
                    &actor.id,
                    payload.status.unwrap_or_default(),
                )
                .await?;
            Ok(ApiResponse::success(MutationResponse::applied(item))
                .with_status(StatusCode::CREATED)
                .into_response())
        }
        Decision::Queued { submission_id } => Ok(MutationResponse::queued(submission_id)),
    }
}

/// Create a private draft owned by the caller.
#[utoipa::path(
    post,
    path = "/api/content/{type}/drafts",
    params(("type" = ContentType, Path, description = "Content type")),
    request_body = ContentDraft,
    responses(
        (status = 201, description = "Draft created", body = ApiResponse<ContentItem>),
        (status = 403, description = "Cannot manage content"),
        (status = 422, description = "Invalid input")
    ),
    tag = "content",
    security(("bearer_auth" = []))
)]
pub async fn create_draft(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Path(content_type): Path<String>,
    Json(draft): Json<ContentDraft>,
) -> Result<Response, AtelierError> {
    let content_type: ContentType = content_type.parse()?;
    state
        .policy
        .permissions
        .require_any(&actor, &[MANAGE_OWN_CONTENT, MANAGE_ALL_CONTENT])?;
    draft.validate()?;

    let item = state
        .resources
        .create(content_type, draft, &actor.id, InitialStatus::Draft)
        .await?;
    Ok(ApiResponse::success(item)
        .with_status(StatusCode::CREATED)
        .into_response())
}

/// Fetch one item.
#[utoipa::path(
    get,
    path = "/api/content/{type}/{id}",
    params(
        ("type" = ContentType, Path, description = "Content type"),
        ("id" = String, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Item found", body = ApiResponse<ContentItem>),
        (status = 404, description = "Item not found or not visible")
    ),
    tag = "content"
)]
pub async fn get_content(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
    Path((content_type, id)): Path<(String, String)>,
) -> Result<ApiResponse<ContentItem>, AtelierError> {
    let content_type: ContentType = content_type.parse()?;
    let item = load_visible(&state, actor.as_ref(), content_type, &id).await?;
    Ok(ApiResponse::success(item))
}

/// Update an item's fields, directly or through the approval queue.
#[utoipa::path(
    put,
    path = "/api/content/{type}/{id}",
    params(
        ("type" = ContentType, Path, description = "Content type"),
        ("id" = String, Path, description = "Item ID")
    ),
    request_body = ContentPatch,
    responses(
        (status = 200, description = "Updated directly", body = ApiResponse<MutationResponse>),
        (status = 202, description = "Queued for approval", body = ApiResponse<MutationResponse>),
        (status = 403, description = "Cannot change this item"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Item changed concurrently")
    ),
    tag = "content",
    security(("bearer_auth" = []))
)]
pub async fn update_content(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Path((content_type, id)): Path<(String, String)>,
    Json(patch): Json<ContentPatch>,
) -> Result<Response, AtelierError> {
    let content_type: ContentType = content_type.parse()?;
    patch.validate()?;
    if patch.is_empty() {
        return Err(AtelierError::BadRequest("Nothing to update".to_string()));
    }

    let target = load_visible(&state, Some(&actor), content_type, &id).await?;
    let decision = if edits_private_item(&state, &actor, &target) {
        Decision::Direct
    } else {
        let request = ActionRequest {
            content_type,
            action: Action::Update,
            target: Some(target),
            payload: to_payload(&patch)?,
        };
        state.gateway.evaluate(&actor, request).await?
    };

    match decision {
        Decision::Direct => {
            let item = state.resources.update(content_type, &id, patch).await?;
            Ok(ApiResponse::success(MutationResponse::applied(item)).into_response())
        }
        Decision::Queued { submission_id } => Ok(MutationResponse::queued(submission_id)),
    }
}

/// Delete an item, directly or through the approval queue.
#[utoipa::path(
    delete,
    path = "/api/content/{type}/{id}",
    params(
        ("type" = ContentType, Path, description = "Content type"),
        ("id" = String, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Deleted directly", body = ApiResponse<MutationResponse>),
        (status = 202, description = "Queued for approval", body = ApiResponse<MutationResponse>),
        (status = 403, description = "Cannot delete this item"),
        (status = 404, description = "Item not found")
    ),
    tag = "content",
    security(("bearer_auth" = []))
)]
pub async fn delete_content(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Path((content_type, id)): Path<(String, String)>,
) -> Result<Response, AtelierError> {
    let content_type: ContentType = content_type.parse()?;
    let target = load_visible(&state, Some(&actor), content_type, &id).await?;

    let decision = if edits_private_item(&state, &actor, &target) {
        Decision::Direct
    } else {
        let request = ActionRequest {
            content_type,
            action: Action::Delete,
            target: Some(target),
            payload: serde_json::json!({}),
        };
        state.gateway.evaluate(&actor, request).await?
    };

    match decision {
        Decision::Direct => {
            state.resources.delete(content_type, &id).await?;
            Ok(ApiResponse::success(MutationResponse::deleted()).into_response())
        }
        Decision::Queued { submission_id } => Ok(MutationResponse::queued(submission_id)),
    }
}

/// Move an item to another status.
#[utoipa::path(
    post,
    path = "/api/content/{type}/{id}/transitions",
    params(
        ("type" = ContentType, Path, description = "Content type"),
        ("id" = String, Path, description = "Item ID")
    ),
    request_body = TransitionRequest,
    responses(
        (status = 200, description = "Transition applied", body = ApiResponse<ContentItem>),
        (status = 403, description = "Missing permission for this edge"),
        (status = 404, description = "Item not found"),
        (status = 409, description = "Illegal edge, or the status changed concurrently"),
        (status = 422, description = "Rejection without a reason")
    ),
    tag = "content",
    security(("bearer_auth" = []))
)]
pub async fn transition_content(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Path((content_type, id)): Path<(String, String)>,
    Json(payload): Json<TransitionRequest>,
) -> Result<ApiResponse<ContentItem>, AtelierError> {
    let content_type: ContentType = content_type.parse()?;
    load_visible(&state, Some(&actor), content_type, &id).await?;

    let item = state
        .resources
        .transition(
            &state.policy.permissions,
            &actor,
            content_type,
            &id,
            payload.to,
            payload.reason.as_deref(),
        )
        .await?;
    Ok(ApiResponse::success(item))
}

/// Status history of an item, oldest first.
#[utoipa::path(
    get,
    path = "/api/content/{type}/{id}/history",
    params(
        ("type" = ContentType, Path, description = "Content type"),
        ("id" = String, Path, description = "Item ID")
    ),
    responses(
        (status = 200, description = "Transition history", body = ApiResponse<Vec<HistoryEntry>>),
        (status = 404, description = "Item not found or not visible")
    ),
    tag = "content"
)]
pub async fn content_history(
    State(state): State<AppState>,
    MaybeActor(actor): MaybeActor,
    Path((content_type, id)): Path<(String, String)>,
) -> Result<ApiResponse<Vec<HistoryEntry>>, AtelierError> {
    let content_type: ContentType = content_type.parse()?;
    let item = load_visible(&state, actor.as_ref(), content_type, &id).await?;
    Ok(ApiResponse::success(item.history))
}
