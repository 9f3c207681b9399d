use axum::{
    extract::{Path, State},
    Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{self, Schedule};
use crate::entities::booking::{self, BookingStatus};
use crate::entities::seat::{self, SeatStatus};
use crate::entities::user::{self, UserRole};
use crate::entities::{ride, site_content, vehicle_template};
use crate::error::{AppError, AppResult};
use crate::handlers::bookings::{validate_image_url, with_rides, BookingResponse};
use crate::handlers::rides::{seats_by_ride, RideDetail, RideSummary};
use crate::reservation::SeatChange;
use crate::utils::schedule::service_now;
use crate::AppState;

fn ensure_not_past(state: &AppState, date: NaiveDate) -> AppResult<()> {
    if date < service_now(state.config.service_offset()).date() {
        return Err(AppError::BadRequest("Date is in the past".to_string()));
    }
    Ok(())
}

// ============ Ride Management ============

#[derive(Debug, Deserialize)]
pub struct CreateRideRequest {
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub departure_time: String,
    pub arrival_time: String,
    pub vehicle_type: String,
    pub total_seats: i32,
    pub price_per_seat: i32,
}

/// Seat capacity is fixed once a ride exists.
#[derive(Debug, Deserialize)]
pub struct UpdateRideRequest {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
    pub departure_time: Option<String>,
    pub arrival_time: Option<String>,
    pub vehicle_type: Option<String>,
    pub price_per_seat: Option<i32>,
}

/// List every ride, past ones included (admin)
pub async fn list_rides(State(state): State<AppState>) -> AppResult<Json<Vec<RideSummary>>> {
    let rides = ride::Entity::find()
        .order_by_asc(ride::Column::Date)
        .order_by_asc(ride::Column::DepartureTime)
        .all(&state.db)
        .await?;

    let mut seats = seats_by_ride(&state, rides.iter().map(|r| r.id).collect()).await?;
    let responses = rides
        .iter()
        .map(|r| RideSummary::new(r, &seats.remove(&r.id).unwrap_or_default()))
        .collect();

    Ok(Json(responses))
}

/// Create a ride with every seat available (admin)
pub async fn create_ride(
    State(state): State<AppState>,
    Json(payload): Json<CreateRideRequest>,
) -> AppResult<Json<RideDetail>> {
    ensure_not_past(&state, payload.date)?;

    let schedule = Schedule {
        origin: payload.origin,
        destination: payload.destination,
        departure_time: payload.departure_time,
        arrival_time: payload.arrival_time,
        vehicle_type: payload.vehicle_type,
        total_seats: payload.total_seats,
        price_per_seat: payload.price_per_seat,
    }
    .validated(&state.config)?;

    let ride = catalog::create_ride(&state.db, schedule.on(payload.date, None)).await?;
    let seats = catalog::seats_of(&state.db, ride.id).await?;

    Ok(Json(RideDetail::new(&ride, &seats)))
}

/// Update a ride's route, schedule, vehicle or price (admin)
pub async fn update_ride(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateRideRequest>,
) -> AppResult<Json<ride::Model>> {
    let ride = ride::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;

    let origin = payload
        .origin
        .map(|o| o.trim().to_string())
        .unwrap_or_else(|| ride.origin.clone());
    let destination = payload
        .destination
        .map(|d| d.trim().to_string())
        .unwrap_or_else(|| ride.destination.clone());
    catalog::validate_route(&state.config, &origin, &destination)?;

    let mut active = ride.into_active_model();
    active.origin = Set(origin);
    active.destination = Set(destination);

    if let Some(date) = payload.date {
        ensure_not_past(&state, date)?;
        active.date = Set(date);
    }
    if let Some(time) = payload.departure_time {
        active.departure_time = Set(catalog::parse_time("departure_time", &time)?);
    }
    if let Some(time) = payload.arrival_time {
        active.arrival_time = Set(catalog::parse_time("arrival_time", &time)?);
    }
    if let Some(vehicle_type) = payload.vehicle_type {
        let vehicle_type = vehicle_type.trim().to_string();
        if vehicle_type.is_empty() {
            return Err(AppError::BadRequest("Vehicle type is required".to_string()));
        }
        active.vehicle_type = Set(vehicle_type);
    }
    if let Some(price) = payload.price_per_seat {
        catalog::validate_price(price)?;
        active.price_per_seat = Set(price);
    }

    let result = active.update(&state.db).await?;
    tracing::info!(ride_id = %result.id, "Ride updated");
    Ok(Json(result))
}

/// Delete a ride and its seats. Bookings on it are kept.
pub async fn delete_ride(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = ride::Entity::delete_by_id(id).exec(&state.db).await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Ride not found".to_string()));
    }

    tracing::warn!(ride_id = %id, "Ride deleted");
    Ok(Json(serde_json::json!({ "message": "Ride deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct SeatStatusRequest {
    pub status: SeatStatus,
}

/// Lock or unlock a single seat (admin)
pub async fn set_seat_status(
    State(state): State<AppState>,
    Path((ride_id, seat_number)): Path<(Uuid, i32)>,
    Json(payload): Json<SeatStatusRequest>,
) -> AppResult<Json<seat::Model>> {
    let locked = match payload.status {
        SeatStatus::Locked => true,
        SeatStatus::Available => false,
        SeatStatus::Booked => {
            return Err(AppError::BadRequest(
                "Seats can only be booked through a reservation".to_string(),
            ))
        }
    };

    match state
        .reservations
        .set_seat_lock(ride_id, seat_number, locked)
        .await?
    {
        SeatChange::Applied(seat) => Ok(Json(seat)),
        SeatChange::RideNotFound => Err(AppError::NotFound("Ride not found".to_string())),
        SeatChange::SeatNotFound => Err(AppError::NotFound(format!(
            "Seat {} does not exist on this ride",
            seat_number
        ))),
        SeatChange::SeatBooked => Err(AppError::Conflict(format!(
            "Seat {} is booked; cancel the booking first",
            seat_number
        ))),
    }
}

#[derive(Debug, Serialize)]
pub struct PassengerInfo {
    pub booking_id: Uuid,
    pub user_id: Uuid,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub seat_numbers: Vec<i32>,
    pub status: BookingStatus,
    pub payment_screenshot_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct RidePassengersResponse {
    #[serde(flatten)]
    pub ride: RideDetail,
    pub passengers: Vec<PassengerInfo>,
}

/// Passenger manifest for a ride: live bookings ordered by first seat
pub async fn ride_passengers(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<RidePassengersResponse>> {
    let ride = ride::Entity::find_by_id(ride_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;
    let seats = catalog::seats_of(&state.db, ride_id).await?;

    let bookings = booking::Entity::find()
        .filter(booking::Column::RideId.eq(ride_id))
        .filter(booking::Column::Status.ne(BookingStatus::Cancelled))
        .all(&state.db)
        .await?;

    let mut passengers: Vec<PassengerInfo> = bookings
        .into_iter()
        .map(|b| PassengerInfo {
            booking_id: b.id,
            user_id: b.user_id,
            passenger_name: b.passenger_name,
            passenger_phone: b.passenger_phone,
            seat_numbers: b.seat_numbers.0,
            status: b.status,
            payment_screenshot_url: b.payment_screenshot_url,
            created_at: b.created_at.with_timezone(&Utc),
        })
        .collect();
    passengers.sort_by_key(|p| p.seat_numbers.first().copied().unwrap_or(i32::MAX));

    Ok(Json(RidePassengersResponse {
        ride: RideDetail::new(&ride, &seats),
        passengers,
    }))
}

// ============ Template Management ============

#[derive(Debug, Deserialize)]
pub struct TemplateRequest {
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub vehicle_type: String,
    pub total_seats: i32,
    pub price_per_seat: i32,
}

impl TemplateRequest {
    fn split(self) -> (String, Schedule) {
        (
            self.name,
            Schedule {
                origin: self.origin,
                destination: self.destination,
                departure_time: self.departure_time,
                arrival_time: self.arrival_time,
                vehicle_type: self.vehicle_type,
                total_seats: self.total_seats,
                price_per_seat: self.price_per_seat,
            },
        )
    }
}

fn template_name(raw: String) -> AppResult<String> {
    let name = raw.trim().to_string();
    if name.is_empty() {
        return Err(AppError::BadRequest("Template name is required".to_string()));
    }
    Ok(name)
}

/// List vehicle templates (admin)
pub async fn list_templates(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<vehicle_template::Model>>> {
    let templates = vehicle_template::Entity::find()
        .order_by_asc(vehicle_template::Column::DepartureTime)
        .order_by_asc(vehicle_template::Column::Name)
        .all(&state.db)
        .await?;

    Ok(Json(templates))
}

/// Create a vehicle template (admin)
pub async fn create_template(
    State(state): State<AppState>,
    Json(payload): Json<TemplateRequest>,
) -> AppResult<Json<vehicle_template::Model>> {
    let (name, schedule) = payload.split();
    let name = template_name(name)?;
    let schedule = schedule.validated(&state.config)?;

    let template = vehicle_template::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        origin: Set(schedule.origin),
        destination: Set(schedule.destination),
        departure_time: Set(schedule.departure_time),
        arrival_time: Set(schedule.arrival_time),
        vehicle_type: Set(schedule.vehicle_type),
        total_seats: Set(schedule.total_seats),
        price_per_seat: Set(schedule.price_per_seat),
        created_at: Set(Utc::now().fixed_offset()),
    };

    let result = template.insert(&state.db).await?;
    Ok(Json(result))
}

/// Replace a vehicle template (admin). Rides already generated keep their values.
pub async fn update_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<TemplateRequest>,
) -> AppResult<Json<vehicle_template::Model>> {
    let template = vehicle_template::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;

    let (name, schedule) = payload.split();
    let name = template_name(name)?;
    let schedule = schedule.validated(&state.config)?;

    let mut active = template.into_active_model();
    active.name = Set(name);
    active.origin = Set(schedule.origin);
    active.destination = Set(schedule.destination);
    active.departure_time = Set(schedule.departure_time);
    active.arrival_time = Set(schedule.arrival_time);
    active.vehicle_type = Set(schedule.vehicle_type);
    active.total_seats = Set(schedule.total_seats);
    active.price_per_seat = Set(schedule.price_per_seat);

    let result = active.update(&state.db).await?;
    Ok(Json(result))
}

/// Delete a vehicle template (admin). Generated rides stay, unlinked.
pub async fn delete_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    let result = vehicle_template::Entity::delete_by_id(id)
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound("Template not found".to_string()));
    }

    Ok(Json(serde_json::json!({ "message": "Template deleted" })))
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub date: NaiveDate,
}

async fn template_has_ride_on(
    state: &AppState,
    template_id: Uuid,
    date: NaiveDate,
) -> AppResult<bool> {
    let existing = ride::Entity::find()
        .filter(ride::Column::TemplateId.eq(template_id))
        .filter(ride::Column::Date.eq(date))
        .one(&state.db)
        .await?;
    Ok(existing.is_some())
}

/// Create the ride for one template on a date (admin)
pub async fn generate_from_template(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<GenerateRequest>,
) -> AppResult<Json<RideDetail>> {
    ensure_not_past(&state, payload.date)?;

    let template = vehicle_template::Entity::find_by_id(id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Template not found".to_string()))?;

    if template_has_ride_on(&state, template.id, payload.date).await? {
        return Err(AppError::Conflict(format!(
            "Template '{}' already has a ride on {}",
            template.name, payload.date
        )));
    }

    let draft = Schedule::from(&template).on(payload.date, Some(template.id));
    let ride = catalog::create_ride(&state.db, draft).await?;
    let seats = catalog::seats_of(&state.db, ride.id).await?;

    Ok(Json(RideDetail::new(&ride, &seats)))
}

#[derive(Debug, Serialize)]
pub struct GenerateForDateResponse {
    pub date: NaiveDate,
    pub created: Vec<ride::Model>,
    pub skipped: usize,
}

/// Create rides for every template on a date, skipping templates already scheduled (admin)
pub async fn generate_for_date(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> AppResult<Json<GenerateForDateResponse>> {
    ensure_not_past(&state, payload.date)?;

    let templates = vehicle_template::Entity::find().all(&state.db).await?;

    let mut created = Vec::new();
    let mut skipped = 0;
    for template in templates {
        if template_has_ride_on(&state, template.id, payload.date).await? {
            skipped += 1;
            continue;
        }

        let draft = Schedule::from(&template).on(payload.date, Some(template.id));
        match catalog::create_ride(&state.db, draft).await {
            Ok(ride) => created.push(ride),
            // A concurrent generation created it first
            Err(AppError::Conflict(_)) => skipped += 1,
            Err(err) => return Err(err),
        }
    }

    tracing::info!(
        date = %payload.date,
        created = created.len(),
        skipped,
        "Rides generated from templates"
    );

    Ok(Json(GenerateForDateResponse {
        date: payload.date,
        created,
        skipped,
    }))
}

// ============ Bookings Management (Admin) ============

/// List all bookings, newest first (admin)
pub async fn list_all_bookings(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<BookingResponse>>> {
    let bookings = booking::Entity::find()
        .order_by_desc(booking::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(with_rides(&state, bookings).await?))
}

#[derive(Debug, Deserialize)]
pub struct UpdateBookingStatusRequest {
    pub status: BookingStatus,
}

/// Change a booking's status (admin). Cancelling releases its seats; a
/// cancelled booking cannot be brought back.
pub async fn update_booking_status(
    State(state): State<AppState>,
    Path(booking_id): Path<Uuid>,
    Json(payload): Json<UpdateBookingStatusRequest>,
) -> AppResult<Json<booking::Model>> {
    let current = booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

    if payload.status == BookingStatus::Cancelled {
        let cancelled = state
            .reservations
            .cancel_booking(booking_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
        return Ok(Json(cancelled));
    }

    if current.status == BookingStatus::Cancelled {
        return Err(AppError::Conflict(
            "Cancelled bookings cannot be reactivated".to_string(),
        ));
    }

    // Conditioned on the booking still being live so a concurrent cancel wins.
    let result = booking::Entity::update_many()
        .set(booking::ActiveModel {
            status: Set(payload.status),
            ..Default::default()
        })
        .filter(booking::Column::Id.eq(booking_id))
        .filter(booking::Column::Status.ne(BookingStatus::Cancelled))
        .exec(&state.db)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::Conflict(
            "Cancelled bookings cannot be reactivated".to_string(),
        ));
    }

    tracing::info!(%booking_id, status = ?payload.status, "Booking status changed");

    let updated = booking::Entity::find_by_id(booking_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;
    Ok(Json(updated))
}

/// Delete every booking and free every booked seat (admin)
pub async fn reset_bookings(State(state): State<AppState>) -> AppResult<Json<serde_json::Value>> {
    let removed = state.reservations.reset_all().await?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

// ============ User Management ============

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserResponse {
    fn from(u: user::Model) -> Self {
        Self {
            id: u.id,
            email: u.email,
            name: u.name,
            phone: u.phone,
            role: u.role,
            created_at: u.created_at.with_timezone(&Utc),
        }
    }
}

/// List all users (admin)
pub async fn list_all_users(State(state): State<AppState>) -> AppResult<Json<Vec<UserResponse>>> {
    let users = user::Entity::find()
        .order_by_asc(user::Column::CreatedAt)
        .all(&state.db)
        .await?;

    Ok(Json(users.into_iter().map(UserResponse::from).collect()))
}

#[derive(Debug, Deserialize)]
pub struct UpdateRoleRequest {
    pub role: UserRole,
}

/// Update user role (admin)
pub async fn update_user_role(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateRoleRequest>,
) -> AppResult<Json<UserResponse>> {
    let user = user::Entity::find_by_id(user_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    let mut active = user.into_active_model();
    active.role = Set(payload.role.clone());
    let updated = active.update(&state.db).await?;

    tracing::info!(%user_id, role = ?updated.role, "User role changed");
    Ok(Json(updated.into()))
}

// ============ Site Content ============

#[derive(Debug, Deserialize)]
pub struct UpdateContentRequest {
    pub footer_text: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub payment_qr_url: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Replace the public site content (admin)
pub async fn update_content(
    State(state): State<AppState>,
    Json(payload): Json<UpdateContentRequest>,
) -> AppResult<Json<site_content::Model>> {
    let payment_qr_url = non_blank(payload.payment_qr_url)
        .map(|url| validate_image_url(&url))
        .transpose()?;

    let content = site_content::ActiveModel {
        id: Set(site_content::SITE_CONTENT_ID),
        footer_text: Set(payload.footer_text.trim().to_string()),
        contact_phone: Set(non_blank(payload.contact_phone)),
        contact_email: Set(non_blank(payload.contact_email)),
        payment_qr_url: Set(payment_qr_url),
        updated_at: Set(Utc::now().fixed_offset()),
    };

    let existing = site_content::Entity::find_by_id(site_content::SITE_CONTENT_ID)
        .one(&state.db)
        .await?;
    let saved = match existing {
        Some(_) => content.update(&state.db).await?,
        None => content.insert(&state.db).await?,
    };

    Ok(Json(saved))
}
