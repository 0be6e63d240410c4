use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::AtelierError;

/// JWT claims payload.
#[derive(Debug, Serialize, Deserialize, Clone, ToSchema)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Expiration time (Unix timestamp)
    pub exp: usize,
    /// Issued at (Unix timestamp)
    pub iat: usize,
}

/// Create an HS256 token for a user id.
pub fn create_token(user_id: &str, secret: &str, expiry_hours: u64) -> Result<String, AtelierError> {
    let now = Utc::now();
    let expires = i64::try_from(expiry_hours)
        .ok()
        .and_then(Duration::try_hours)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            AtelierError::Configuration(format!("Token lifetime of {} hours is out of range", expiry_hours))
        })?;

    let claims = Claims {
        sub: user_id.to_string(),
        exp: expires.timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AtelierError::Internal(format!("Failed to create token: {}", e)))
}

/// Validate a token and return its claims.
pub fn validate_token(token: &str, secret: &str) -> Result<Claims, AtelierError> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| AtelierError::Unauthenticated(format!("Invalid token: {}", e)))?;

    Ok(token_data.claims)
}

/// Token part of an `Authorization: Bearer <token>` header value.
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        let token = create_token("user-1", "secret", 1).unwrap();
        let claims = validate_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, "user-1");
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn test_out_of_range_lifetime_is_config_error() {
        for hours in [u64::MAX, i64::MAX as u64, (i64::MAX / 3600) as u64 + 1] {
            let err = create_token("user-1", "secret", hours).unwrap_err();
            assert_eq!(err.error_code(), "CONFIG_ERROR");
        }
    }

    #[test]
    fn test_wrong_secret_is_unauthenticated() {
        let token = create_token("user-1", "secret", 1).unwrap();
        let err = validate_token(&token, "other").unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHENTICATED");
    }

    #[test]
    fn test_bearer_token_parsing() {
        assert_eq!(bearer_token("Bearer abc"), Some("abc"));
        assert_eq!(bearer_token("bearer  abc "), Some("abc"));
        assert_eq!(bearer_token("Basic abc"), None);
        assert_eq!(bearer_token("Bearer "), None);
        assert_eq!(bearer_token("Bearer"), None);
    }
}
