use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::DbErr;
use serde_json::json;
use thiserror::Error;

use crate::reservation::{Rejection, ReservationError};
use crate::storage::StorageError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) | AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ReservationError> for AppError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::Invalid(e) => AppError::BadRequest(e.to_string()),
            ReservationError::Rejected(r @ Rejection::RideNotFound(_)) => AppError::NotFound(r.to_string()),
            ReservationError::Rejected(r @ Rejection::RideDeparted(_)) => AppError::BadRequest(r.to_string()),
            ReservationError::Rejected(r) => AppError::Conflict(r.to_string()),
            ReservationError::NotPermitted(msg) => AppError::Forbidden(msg),
            ReservationError::Unavailable(msg) => AppError::Unavailable(msg),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::Io(e) => AppError::Internal(format!("Upload failed: {}", e)),
            other => AppError::BadRequest(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(_) | AppError::Database(_) => {
                tracing::error!(error = %self, "Internal server error");
                "Internal server error".to_string()
            }
            AppError::Unavailable(_) => {
                tracing::warn!(error = %self, "Backing store unavailable");
                self.to_string()
            }
            _ => self.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(AppError::BadRequest("x".into()).status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::Conflict("x".into()).status(), StatusCode::CONFLICT);
        assert_eq!(
            AppError::Database(DbErr::Custom("boom".into())).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            AppError::Unavailable("down".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_internal_details_are_masked() {
        let response = AppError::Internal("secret detail".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_reservation_outcomes_map_to_statuses() {
        let missing: AppError = ReservationError::Rejected(Rejection::RideNotFound("x".into())).into();
        assert_eq!(missing.status(), StatusCode::NOT_FOUND);

        let taken: AppError =
            ReservationError::Rejected(Rejection::SeatsUnavailable { seats: vec![3] }).into();
        assert_eq!(taken.status(), StatusCode::CONFLICT);
        assert_eq!(taken.to_string(), "Seat 3 is not available");

        let gone: AppError =
            ReservationError::Rejected(Rejection::RideDeparted(uuid::Uuid::nil())).into();
        assert_eq!(gone.status(), StatusCode::BAD_REQUEST);

        let foreign: AppError = ReservationError::NotPermitted("no".into()).into();
        assert_eq!(foreign.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_bad_upload_is_client_error() {
        let err: AppError = StorageError::TooLarge { limit: 10 }.into();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
