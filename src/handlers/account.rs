use axum::{extract::State, Extension, Json};
use chrono::Utc;
use sea_orm::{ActiveModelTrait, EntityTrait, IntoActiveModel, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::user::{self, UserRole};
use crate::error::{AppError, AppResult};
use crate::handlers::bookings::validate_image_url;
use crate::reservation::validate::is_valid_phone;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub profile_picture_url: Option<String>,
    /// False until the user saves a profile here
    pub registered: bool,
}

impl From<user::Model> for ProfileResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            phone: u.phone,
            role: u.role,
            profile_picture_url: u.profile_picture_url,
            registered: true,
        }
    }
}

impl From<&Claims> for ProfileResponse {
    fn from(claims: &Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email.clone(),
            name: String::new(),
            phone: None,
            role: claims.role.clone(),
            profile_picture_url: None,
            registered: false,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: String,
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateAvatarRequest {
    pub url: String,
}

fn validated_profile(payload: UpdateProfileRequest) -> AppResult<(String, Option<String>)> {
    let name = payload.name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Name is required".to_string()));
    }

    let phone = payload
        .phone
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty());
    if let Some(p) = &phone {
        if !is_valid_phone(p) {
            return Err(AppError::BadRequest(
                "Phone must be a 10-digit number".to_string(),
            ));
        }
    }

    Ok((name, phone))
}

/// Current user's profile
pub async fn get_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<ProfileResponse>> {
    let profile = user::Entity::find_by_id(claims.sub).one(&state.db).await?;

    Ok(Json(match profile {
        Some(u) => u.into(),
        None => (&claims).into(),
    }))
}

/// Create or update the caller's profile. New profiles start with the role in the token.
pub async fn update_me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let (name, phone) = validated_profile(payload)?;

    let saved = match user::Entity::find_by_id(claims.sub).one(&state.db).await? {
        Some(existing) => {
            let mut active = existing.into_active_model();
            active.name = Set(name);
            active.phone = Set(phone);
            active.email = Set(claims.email.clone());
            active.update(&state.db).await?
        }
        None => {
            let created = user::ActiveModel {
                id: Set(claims.sub),
                email: Set(claims.email.clone()),
                name: Set(name),
                phone: Set(phone),
                role: Set(claims.role.clone()),
                profile_picture_url: Set(None),
                created_at: Set(Utc::now().fixed_offset()),
            }
            .insert(&state.db)
            .await?;

            tracing::info!(user_id = %created.id, "Profile created");
            created
        }
    };

    Ok(Json(saved.into()))
}

/// Set the caller's profile picture
pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateAvatarRequest>,
) -> AppResult<Json<ProfileResponse>> {
    let url = validate_image_url(&payload.url)?;

    let profile = user::Entity::find_by_id(claims.sub)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Save your profile before adding a picture".to_string()))?;

    let mut active = profile.into_active_model();
    active.profile_picture_url = Set(Some(url));
    let updated = active.update(&state.db).await?;

    Ok(Json(updated.into()))
}
