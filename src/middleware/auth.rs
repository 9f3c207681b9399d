use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use sea_orm::EntityTrait;

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::utils::jwt::{verify_token, Claims};
use crate::AppState;

/// Extract and validate JWT token from Authorization header
pub async fn auth_middleware(
    State(state): State<AppState>,
    TypedHeader(auth): TypedHeader<Authorization<Bearer>>,
    mut request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = verify_token(auth.token(), &state.config.jwt_secret)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Require admin role. The stored profile's role wins over the token's, so role
/// changes made here apply before the identity platform reissues tokens.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> AppResult<Response> {
    let claims = request
        .extensions()
        .get::<Claims>()
        .ok_or_else(|| AppError::Unauthorized("No authentication found".to_string()))?;

    let role = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .map(|u| u.role)
        .unwrap_or_else(|| claims.role.clone());

    if role != UserRole::Admin {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    Ok(next.run(request).await)
}
