use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus};
use crate::entities::ride;
use crate::entities::user::UserRole;
use crate::error::{AppError, AppResult};
use crate::reservation::{Passenger, Rejection, ReservationError, SeatSelection, ValidationError};
use crate::utils::jwt::Claims;
use crate::utils::schedule::{has_departed, service_now};
use crate::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReserveSeatsRequest {
    pub ride_id: String,
    pub seats: Vec<i32>,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ReserveSeatsResponse {
    Reserved {
        success: bool,
        booking: booking::Model,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        success: bool,
        reason: String,
        kind: &'static str,
        #[serde(skip_serializing_if = "Option::is_none")]
        unavailable_seats: Option<Vec<i32>>,
        retryable: bool,
    },
}

impl ReserveSeatsResponse {
    pub fn reserved(booking: booking::Model) -> (StatusCode, Self) {
        (
            StatusCode::OK,
            ReserveSeatsResponse::Reserved {
                success: true,
                booking,
            },
        )
    }

    pub fn failed(err: &ReservationError) -> (StatusCode, Self) {
        let (status, kind, unavailable_seats) = match err {
            ReservationError::Invalid(_) => (StatusCode::BAD_REQUEST, "invalid_request", None),
            ReservationError::Rejected(r @ Rejection::RideNotFound(_)) => {
                (StatusCode::NOT_FOUND, r.kind(), None)
            }
            ReservationError::Rejected(r @ Rejection::RideDeparted(_)) => {
                (StatusCode::BAD_REQUEST, r.kind(), None)
            }
            ReservationError::Rejected(r @ Rejection::SeatsUnavailable { seats }) => {
                (StatusCode::CONFLICT, r.kind(), Some(seats.clone()))
            }
            ReservationError::NotPermitted(_) => (StatusCode::FORBIDDEN, "forbidden", None),
            ReservationError::Unavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "service_unavailable", None)
            }
        };

        (
            status,
            ReserveSeatsResponse::Failed {
                success: false,
                reason: err.to_string(),
                kind,
                unavailable_seats,
                retryable: err.is_retryable(),
            },
        )
    }
}

/// Turn the raw request into validated inputs. A ride id that is not a UUID
/// cannot name any ride, so it is reported the same way as an unknown one.
pub fn parse_reservation(
    payload: &ReserveSeatsRequest,
) -> Result<(Uuid, SeatSelection, Passenger), ReservationError> {
    let raw_ride_id = payload.ride_id.trim();
    if raw_ride_id.is_empty() {
        return Err(ValidationError::MissingIdentifier("rideId").into());
    }
    let ride_id = Uuid::parse_str(raw_ride_id)
        .map_err(|_| Rejection::RideNotFound(raw_ride_id.to_string()))?;

    let seats = SeatSelection::new(payload.seats.iter().copied())?;
    let passenger = Passenger::new(&payload.passenger_name, &payload.passenger_phone)?;

    Ok((ride_id, seats, passenger))
}

/// Admins may book on behalf of someone else; everyone else books as themselves.
pub fn booking_owner(claims: &Claims, requested: Option<&str>) -> Result<Uuid, ReservationError> {
    let requested = match requested.map(str::trim).filter(|s| !s.is_empty()) {
        Some(raw) => raw,
        None => return Ok(claims.sub),
    };

    let user_id =
        Uuid::parse_str(requested).map_err(|_| ValidationError::InvalidIdentifier("userId"))?;

    if user_id != claims.sub && claims.role != UserRole::Admin {
        return Err(ReservationError::NotPermitted(
            "You can only book seats for yourself".to_string(),
        ));
    }
    Ok(user_id)
}

async fn reserve(
    state: &AppState,
    claims: &Claims,
    payload: Result<Json<ReserveSeatsRequest>, JsonRejection>,
) -> Result<booking::Model, ReservationError> {
    let Json(payload) =
        payload.map_err(|rejection| ValidationError::MalformedBody(rejection.body_text()))?;
    let user_id = booking_owner(claims, payload.user_id.as_deref())?;
    let (ride_id, seats, passenger) = parse_reservation(&payload)?;

    state
        .reservations
        .reserve_seats(ride_id, &seats, &passenger, user_id)
        .await
}

/// Atomically claim seats on a ride. Every outcome, including an unreadable
/// body, is answered with a `ReserveSeatsResponse`.
pub async fn reserve_seats(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    payload: Result<Json<ReserveSeatsRequest>, JsonRejection>,
) -> (StatusCode, Json<ReserveSeatsResponse>) {
    let (status, body) = match reserve(&state, &claims, payload).await {
        Ok(booking) => ReserveSeatsResponse::reserved(booking),
        Err(err) => ReserveSeatsResponse::failed(&err),
    };
    (status, Json(body))
}

#[derive(Debug, Serialize)]
pub struct BookingResponse {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
    pub departure_time: Option<String>,
    pub seat_numbers: Vec<i32>,
    pub total_price: Option<i32>,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub status: BookingStatus,
    pub payment_screenshot_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl BookingResponse {
    /// The ride may have been deleted since booking; its fields are then absent.
    pub fn new(b: booking::Model, ride: Option<&ride::Model>) -> Self {
        Self {
            id: b.id,
            ride_id: b.ride_id,
            origin: ride.map(|r| r.origin.clone()),
            destination: ride.map(|r| r.destination.clone()),
            date: ride.map(|r| r.date),
            departure_time: ride.map(|r| r.departure_time.clone()),
            total_price: ride.map(|r| r.price_per_seat * b.seat_numbers.0.len() as i32),
            seat_numbers: b.seat_numbers.0,
            passenger_name: b.passenger_name,
            passenger_phone: b.passenger_phone,
            status: b.status,
            payment_screenshot_url: b.payment_screenshot_url,
            created_at: b.created_at.with_timezone(&Utc),
        }
    }
}

/// Attach ride details to a list of bookings
pub async fn with_rides(
    state: &AppState,
    bookings: Vec<booking::Model>,
) -> AppResult<Vec<BookingResponse>> {
    let ride_ids: Vec<Uuid> = bookings.iter().map(|b| b.ride_id).collect();
    let rides = if ride_ids.is_empty() {
        Vec::new()
    } else {
        ride::Entity::find()
            .filter(ride::Column::Id.is_in(ride_ids))
            .all(&state.db)
            .await?
    };

    Ok(bookings
        .into_iter()
        .map(|b| {
            let ride = rides.iter().find(|r| r.id == b.ride_id);
            BookingResponse::new(b, ride)
        })
        .collect())
}

/// List the caller's bookings, newest first
pub async fn my_bookings(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking::Entity::find()
        .filter(booking::Column::UserId.eq(claims.sub))
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(with_rides(&state, bookings).await?))
}

async fn find_own_booking(state: &AppState, claims: &Claims, booking_id: Uuid) -> AppResult<booking::Model> {
    let booking = booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if booking.user_id != claims.sub {
        return Err(AppError::Forbidden(
            "You can only manage your own bookings".to_string(),
        ));
    }
    Ok(booking)
}

/// Cancel own booking and release its seats
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
) -> AppResult<Json<BookingResponse>> {
    let booking = find_own_booking(&state, &claims, booking_id).await?;
    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::Conflict("Booking is already cancelled".to_string()));
    }

    let ride = ride::Entity::find_by_id(booking.ride_id).one(&state.db).await?;
    if let Some(r) = &ride {
        let now = service_now(state.config.service_offset());
        if has_departed(r.date, &r.departure_time, now) {
            return Err(AppError::BadRequest(
                "Cannot cancel bookings for rides that have departed".to_string(),
            ));
        }
    }

    let cancelled = state
        .reservations
        .cancel_booking(booking_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    Ok(Json(BookingResponse::new(cancelled, ride.as_ref())))
}

#[derive(Debug, Deserialize)]
pub struct PaymentScreenshotRequest {
    pub url: String,
}

pub fn validate_image_url(raw: &str) -> AppResult<String> {
    let url = raw.trim();
    if !(url.starts_with("https://") || url.starts_with("http://")) || url.len() < 10 {
        return Err(AppError::BadRequest(
            "Image URL must be an http(s) address".to_string(),
        ));
    }
    Ok(url.to_string())
}

/// Attach proof of payment to own booking
pub async fn attach_payment_screenshot(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<PaymentScreenshotRequest>,
) -> AppResult<Json<BookingResponse>> {
    let url = validate_image_url(&payload.url)?;
    let booking = find_own_booking(&state, &claims, booking_id).await?;
    if booking.status == BookingStatus::Cancelled {
        return Err(AppError::Conflict("Booking is cancelled".to_string()));
    }

    let mut active = booking.into_active_model();
    active.payment_screenshot_url = Set(Some(url));
    let updated = active.update(&state.db).await?;

    tracing::info!(booking_id = %updated.id, user_id = %claims.sub, "Payment screenshot attached");

    let ride = ride::Entity::find_by_id(updated.ride_id).one(&state.db).await?;
    Ok(Json(BookingResponse::new(updated, ride.as_ref())))
}
