use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};

/// Claims issued by the identity platform.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: Uuid,       // user id
    pub email: String,
    pub role: UserRole,
    pub exp: i64,        // expiration timestamp
    pub iat: i64,        // issued at timestamp
}

/// Mint a token the way the identity platform does. Used by local tooling and tests.
pub fn create_token(
    user_id: Uuid,
    email: &str,
    role: UserRole,
    secret: &str,
    expiration_hours: i64,
) -> AppResult<String> {
    let now = Utc::now();
    let exp = now + Duration::hours(expiration_hours);

    let claims = Claims {
        sub: user_id,
        email: email.to_string(),
        role,
        exp: exp.timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))
}

pub fn verify_token(token: &str, secret: &str) -> AppResult<Claims> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip_keeps_identity() {
        let user_id = Uuid::new_v4();
        let token = create_token(user_id, "a@example.com", UserRole::Admin, "secret", 1).unwrap();

        let claims = verify_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, UserRole::Admin);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = create_token(Uuid::new_v4(), "a@example.com", UserRole::User, "secret", 1).unwrap();

        let err = verify_token(&token, "other").unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let token = create_token(Uuid::new_v4(), "a@example.com", UserRole::User, "secret", -2).unwrap();
        assert!(verify_token(&token, "secret").is_err());
    }
}
