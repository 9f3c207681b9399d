use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap},
    Extension, Json,
};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::storage::ImageKind;
use crate::utils::jwt::Claims;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Store a raw image body and return where it can be fetched
pub async fn upload_image(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<UploadResponse>> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::BadRequest("Content-Type header is required".to_string()))?;

    let kind = ImageKind::from_content_type(content_type)?;
    let url = state.storage.store(&body, kind).await?;

    tracing::info!(user_id = %claims.sub, size = body.len(), url = %url, "Image uploaded");
    Ok(Json(UploadResponse { url }))
}
