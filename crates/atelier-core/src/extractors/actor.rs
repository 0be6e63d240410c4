use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

use crate::auth;
use crate::controllers::AppState;
use crate::error::AtelierError;
use crate::models::user;
use crate::workflow::Actor;

/// The authenticated caller, loaded from the bearer token's user.
///
/// Missing or invalid tokens are `401`; deactivated users and users without
/// a usable role are `403`.
///
/// ```rust,ignore
/// async fn handler(AuthActor(actor): AuthActor) -> Result<..., AtelierError> {
///     state.policy.permissions.require(&actor, "approve_content")?;
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthActor(pub Actor);

/// Like [`AuthActor`] but anonymous requests yield `None`. A token that is
/// present but invalid is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeActor(pub Option<Actor>);

fn authorization(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
}

async fn load_actor(state: &AppState, header_value: &str) -> Result<Actor, AtelierError> {
    let token = auth::bearer_token(header_value).ok_or_else(|| {
        AtelierError::Unauthenticated("Invalid Authorization header format".to_string())
    })?;
    let claims = auth::validate_token(token, &state.config.jwt_secret)?;

    let user = user::find(&state.db, &claims.sub)
        .await?
        .ok_or_else(|| AtelierError::Unauthenticated("User not found".to_string()))?;

    if !user.is_active {
        return Err(AtelierError::Unauthorized("Account is deactivated".to_string()));
    }

    let actor = user.to_actor();
    if actor.roles.is_empty() {
        tracing::warn!(user_id = %actor.id, "user has no usable roles");
        return Err(AtelierError::Unauthorized("Account has no roles".to_string()));
    }
    Ok(actor)
}

impl FromRequestParts<AppState> for AuthActor {
    type Rejection = AtelierError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header_value = authorization(parts).ok_or_else(|| {
            AtelierError::Unauthenticated("Missing Authorization header".to_string())
        })?;
        load_actor(state, header_value).await.map(AuthActor)
    }
}

impl FromRequestParts<AppState> for MaybeActor {
    type Rejection = AtelierError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match authorization(parts) {
            Some(header_value) => Ok(MaybeActor(Some(load_actor(state, header_value).await?))),
            None => Ok(MaybeActor(None)),
        }
    }
}
