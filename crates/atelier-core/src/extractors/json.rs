use axum::extract::{FromRequest, Request};
use serde::de::DeserializeOwned;

use crate::error::AtelierError;

/// Request bodies larger than this are refused.
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// JSON body extractor whose rejections use the API error envelope.
///
/// A malformed body is a 422 `VALIDATION_ERROR` rather than axum's plain-text
/// rejection.
///
/// ```rust,ignore
/// async fn create(Json(draft): Json<ContentDraft>) -> Result<..., AtelierError> {
///     draft.validate()?;
/// }
/// ```
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AtelierError;

    async fn from_request(req: Request, _state: &S) -> Result<Self, Self::Rejection> {
        let bytes = axum::body::to_bytes(req.into_body(), MAX_BODY_BYTES)
            .await
            .map_err(|e| AtelierError::BadRequest(format!("Failed to read body: {}", e)))?;

        let value: T = serde_json::from_slice(&bytes)
            .map_err(|e| AtelierError::Validation(format!("Invalid JSON: {}", e)))?;

        Ok(Json(value))
    }
}
