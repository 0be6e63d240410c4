use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::routing::{get, patch};
use axum::Router;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::controllers::AppState;
use crate::error::AtelierError;
use crate::extractors::{AuthActor, Json, Pagination, Query};
use crate::response::ApiResponse;
use crate::workflow::{
    Applied, ContentType, ReviewDecision, SubmissionFilter, SubmissionRequest, SubmissionStatus,
};

// ── Request / response types ──

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SubmissionListQuery {
    /// Defaults to `pending` on the reviewer queue.
    pub status: Option<SubmissionStatus>,
    pub content_type: Option<ContentType>,
    pub submitter_id: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct DecisionRequest {
    pub note: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DecisionResponse {
    pub submission: SubmissionRequest,
    /// The mutation carried out on approval.
    pub applied: Option<Applied>,
    /// Why an approved mutation could not be applied (e.g. the target was
    /// deleted in the meantime).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub apply_error: Option<String>,
}

// ── Routes ──

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/submissions", get(list_submissions))
        .route("/api/submissions/mine", get(my_submissions))
        .route("/api/submissions/{id}", get(get_submission))
        .route("/api/submissions/{id}/claim", patch(claim_submission))
        .route("/api/submissions/{id}/approve", patch(approve_submission))
        .route("/api/submissions/{id}/reject", patch(reject_submission))
}

fn filter_from(query: SubmissionListQuery, pagination: &Pagination) -> SubmissionFilter {
    SubmissionFilter {
        status: query.status,
        content_type: query.content_type,
        submitter_id: query.submitter_id,
        limit: Some(pagination.limit),
        offset: pagination.offset,
    }
}

// ── Handlers ──

/// Reviewer queue, oldest submission first.
#[utoipa::path(
    get,
    path = "/api/submissions",
    params(SubmissionListQuery, Pagination),
    responses(
        (status = 200, description = "Submissions", body = ApiResponse<Vec<SubmissionRequest>>),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Requires approve_content")
    ),
    tag = "submissions",
    security(("bearer_auth" = []))
)]
pub async fn list_submissions(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Query(query): Query<SubmissionListQuery>,
    pagination: Pagination,
) -> Result<ApiResponse<Vec<SubmissionRequest>>, AtelierError> {
    let mut filter = filter_from(query, &pagination);
    filter.status.get_or_insert(SubmissionStatus::Pending);
    let requests = state.gateway.list(&actor, &filter).await?;
    Ok(ApiResponse::success(requests))
}

/// The caller's own submissions, in any status.
#[utoipa::path(
    get,
    path = "/api/submissions/mine",
    params(SubmissionListQuery, Pagination),
    responses(
        (status = 200, description = "Submissions", body = ApiResponse<Vec<SubmissionRequest>>),
        (status = 401, description = "Not authenticated")
    ),
    tag = "submissions",
    security(("bearer_auth" = []))
)]
pub async fn my_submissions(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Query(query): Query<SubmissionListQuery>,
    pagination: Pagination,
) -> Result<ApiResponse<Vec<SubmissionRequest>>, AtelierError> {
    let requests = state
        .gateway
        .mine(&actor, filter_from(query, &pagination))
        .await?;
    Ok(ApiResponse::success(requests))
}

/// One submission, for reviewers and its submitter.
#[utoipa::path(
    get,
    path = "/api/submissions/{id}",
    params(("id" = String, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Submission", body = ApiResponse<SubmissionRequest>),
        (status = 404, description = "Not found")
    ),
    tag = "submissions",
    security(("bearer_auth" = []))
)]
pub async fn get_submission(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> Result<ApiResponse<SubmissionRequest>, AtelierError> {
    let request = state.gateway.get_for(&actor, &id).await?;
    Ok(ApiResponse::success(request))
}

/// Take a pending submission into review.
#[utoipa::path(
    patch,
    path = "/api/submissions/{id}/claim",
    params(("id" = String, Path, description = "Submission ID")),
    responses(
        (status = 200, description = "Now in review", body = ApiResponse<SubmissionRequest>),
        (status = 403, description = "Requires approve_content"),
        (status = 404, description = "Not found"),
        (status = 409, description = "No longer pending")
    ),
    tag = "submissions",
    security(("bearer_auth" = []))
)]
pub async fn claim_submission(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
) -> Result<ApiResponse<SubmissionRequest>, AtelierError> {
    let request = state.gateway.claim(&id, &actor).await?;
    Ok(ApiResponse::success(request))
}

/// Approve a submission and apply the queued mutation.
#[utoipa::path(
    patch,
    path = "/api/submissions/{id}/approve",
    params(("id" = String, Path, description = "Submission ID")),
    request_body(content = DecisionRequest, description = "Optional reviewer note"),
    responses(
        (status = 200, description = "Approved", body = ApiResponse<DecisionResponse>),
        (status = 403, description = "Requires approve_content"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already decided")
    ),
    tag = "submissions",
    security(("bearer_auth" = []))
)]
pub async fn approve_submission(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<ApiResponse<DecisionResponse>, AtelierError> {
    // The note is optional, and so is the body.
    let payload: DecisionRequest = if body.iter().all(u8::is_ascii_whitespace) {
        DecisionRequest::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| AtelierError::Validation(format!("Invalid JSON: {}", e)))?
    };

    let decided = state
        .gateway
        .decide(&id, ReviewDecision::Approve, &actor, payload.note.as_deref())
        .await?;

    let mut response = DecisionResponse {
        submission: decided.request,
        applied: None,
        apply_error: None,
    };
    if let Some(mutation) = decided.pending_mutation {
        match state
            .resources
            .apply_approved(&state.gateway, &id, mutation)
            .await
        {
            Ok(applied) => response.applied = Some(applied),
            Err(err) if err.status_code().is_server_error() => return Err(err),
            Err(err) => {
                response.apply_error = Some(err.public_message());
                response.submission.apply_error = response.apply_error.clone();
            }
        }
    }
    Ok(ApiResponse::success(response))
}

/// Reject a submission. A non-blank note is required.
#[utoipa::path(
    patch,
    path = "/api/submissions/{id}/reject",
    params(("id" = String, Path, description = "Submission ID")),
    request_body = DecisionRequest,
    responses(
        (status = 200, description = "Rejected", body = ApiResponse<DecisionResponse>),
        (status = 403, description = "Requires approve_content"),
        (status = 404, description = "Not found"),
        (status = 409, description = "Already decided"),
        (status = 422, description = "Missing reason")
    ),
    tag = "submissions",
    security(("bearer_auth" = []))
)]
pub async fn reject_submission(
    State(state): State<AppState>,
    AuthActor(actor): AuthActor,
    Path(id): Path<String>,
    Json(payload): Json<DecisionRequest>,
) -> Result<ApiResponse<DecisionResponse>, AtelierError> {
    let decided = state
        .gateway
        .decide(&id, ReviewDecision::Reject, &actor, payload.note.as_deref())
        .await?;
    Ok(ApiResponse::success(DecisionResponse {
        submission: decided.request,
        applied: None,
        apply_error: None,
    }))
}
