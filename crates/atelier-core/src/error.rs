use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::response::ApiResponse;

/// Error type shared by the workflow core and the HTTP layer.
///
/// Workflow failures (`Unauthorized`, `InvalidTransition`, `AlreadyDecided`,
/// `MissingReason`, `NotFound`) are raised before any write happens, so a
/// failed operation never leaves a half-applied change behind.
#[derive(Debug, Error)]
pub enum AtelierError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Missing or invalid credentials.
    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    /// The actor is known but lacks the permission the action requires.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid transition from '{from}' to '{to}'")]
    InvalidTransition { from: String, to: String },

    #[error("Already decided: {0}")]
    AlreadyDecided(String),

    #[error("A non-empty reason is required")]
    MissingReason,

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Validation errors")]
    ValidationErrors(Vec<FieldError>),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Storage error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AtelierError {
    /// Get the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            AtelierError::NotFound(_) => StatusCode::NOT_FOUND,
            AtelierError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AtelierError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            AtelierError::Unauthorized(_) => StatusCode::FORBIDDEN,
            AtelierError::InvalidTransition { .. } => StatusCode::CONFLICT,
            AtelierError::AlreadyDecided(_) => StatusCode::CONFLICT,
            AtelierError::Conflict(_) => StatusCode::CONFLICT,
            AtelierError::MissingReason => StatusCode::UNPROCESSABLE_ENTITY,
            AtelierError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AtelierError::ValidationErrors(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AtelierError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AtelierError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AtelierError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AtelierError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    pub fn error_code(&self) -> &'static str {
        match self {
            AtelierError::NotFound(_) => "NOT_FOUND",
            AtelierError::BadRequest(_) => "BAD_REQUEST",
            AtelierError::Unauthenticated(_) => "UNAUTHENTICATED",
            AtelierError::Unauthorized(_) => "UNAUTHORIZED",
            AtelierError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AtelierError::AlreadyDecided(_) => "ALREADY_DECIDED",
            AtelierError::Conflict(_) => "CONFLICT",
            AtelierError::MissingReason => "MISSING_REASON",
            AtelierError::Validation(_) => "VALIDATION_ERROR",
            AtelierError::ValidationErrors(_) => "VALIDATION_ERROR",
            AtelierError::Configuration(_) => "CONFIG_ERROR",
            AtelierError::Storage(_) => "STORAGE_ERROR",
            AtelierError::Database(_) => "STORAGE_ERROR",
            AtelierError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Create a validation error with field-level details.
    pub fn validation_fields(errors: Vec<FieldError>) -> Self {
        AtelierError::ValidationErrors(errors)
    }
}

fn collect_field_errors(prefix: &str, errors: &validator::ValidationErrors, out: &mut Vec<FieldError>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        // Flattened structs report their fields under the parent's name.
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{}.{}", prefix, field)
        };
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| {
                    let message = e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| format!("failed '{}' check", e.code));
                    FieldError::with_code(path.clone(), message, e.code.to_string())
                }));
            }
            ValidationErrorsKind::Struct(inner) => collect_field_errors(&path, inner, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect_field_errors(&format!("{}[{}]", path, index), inner, out);
                }
            }
        }
    }
}

impl From<validator::ValidationErrors> for AtelierError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields = Vec::new();
        collect_field_errors("", &errors, &mut fields);
        fields.sort_by(|a, b| a.field.cmp(&b.field));
        AtelierError::ValidationErrors(fields)
    }
}

/// Error detail for API responses.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Vec<FieldError>>,
}

/// Field-level validation error.
///
/// ```json
/// {
///   "field": "title",
///   "message": "failed 'length' check",
///   "code": "length"
/// }
/// ```
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct FieldError {
    pub field: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl FieldError {
    /// Create a new field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
            code: None,
        }
    }

    /// Create a new field error with a code.
    pub fn with_code(
        field: impl Into<String>,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        FieldError {
            field: field.into(),
            message: message.into(),
            code: Some(code.into()),
        }
    }
}

impl AtelierError {
    /// Message safe to show to API clients.
    pub fn public_message(&self) -> String {
        match self {
            AtelierError::ValidationErrors(errs) => errs
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect::<Vec<_>>()
                .join("; "),
            // Storage details stay in the logs.
            AtelierError::Database(_) | AtelierError::Storage(_) => "Storage error".to_string(),
            _ => self.to_string(),
        }
    }
}

impl axum::response::IntoResponse for AtelierError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(error = %self, code = self.error_code(), "request failed");
        }
        let fields = match &self {
            AtelierError::ValidationErrors(errs) => Some(errs.clone()),
            _ => None,
        };
        let message = self.public_message();
        let body: ApiResponse<()> = ApiResponse {
            success: false,
            data: None,
            error: Some(ErrorDetail {
                code: self.error_code().to_string(),
                message,
                fields,
            }),
        };

        (status, axum::Json(body)).into_response()
    }
}
