use utoipa::OpenApi;

use crate::controllers::content::{CreateContentRequest, MutationResponse, TransitionRequest};
use crate::controllers::health::HealthReport;
use crate::controllers::submissions::{DecisionRequest, DecisionResponse};
use crate::error::{ErrorDetail, FieldError};
use crate::workflow::content::HistoryEntry;
use crate::workflow::{
    Action, Applied, ContentDraft, ContentItem, ContentPatch, ContentStatus, ContentType,
    InitialStatus, Role, SubmissionRequest, SubmissionStatus, Submitter,
};

/// OpenAPI document for the content and review endpoints.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Atelier API",
        version = "0.3.0",
        description = "Content publishing with role-based approval."
    ),
    paths(
        crate::controllers::health::health,
        crate::controllers::content::list_content,
        crate::controllers::content::create_content,
        crate::controllers::content::create_draft,
        crate::controllers::content::get_content,
        crate::controllers::content::update_content,
        crate::controllers::content::delete_content,
        crate::controllers::content::transition_content,
        crate::controllers::content::content_history,
        crate::controllers::submissions::list_submissions,
        crate::controllers::submissions::my_submissions,
        crate::controllers::submissions::get_submission,
        crate::controllers::submissions::claim_submission,
        crate::controllers::submissions::approve_submission,
        crate::controllers::submissions::reject_submission,
    ),
    components(
        schemas(
            ContentType,
            ContentStatus,
            InitialStatus,
            ContentItem,
            ContentDraft,
            ContentPatch,
            HistoryEntry,
            CreateContentRequest,
            TransitionRequest,
            MutationResponse,
            Action,
            SubmissionStatus,
            Submitter,
            SubmissionRequest,
            DecisionRequest,
            DecisionResponse,
            Applied,
            Role,
            HealthReport,
            ErrorDetail,
            FieldError,
        )
    ),
    tags(
        (name = "content", description = "Content items and their status"),
        (name = "submissions", description = "Approval queue"),
        (name = "health", description = "Service health")
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Add JWT Bearer security scheme to the OpenAPI spec.
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                utoipa::openapi::security::SecurityScheme::Http(
                    utoipa::openapi::security::Http::new(
                        utoipa::openapi::security::HttpAuthScheme::Bearer,
                    ),
                ),
            );
        }
    }
}
