use std::collections::HashMap;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog;
use crate::entities::seat::{self, SeatStatus};
use crate::entities::{ride, site_content};
use crate::error::{AppError, AppResult};
use crate::utils::schedule::{has_departed, service_now};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct RideFilters {
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct SeatInfo {
    pub number: i32,
    pub status: SeatStatus,
}

#[derive(Debug, Serialize)]
pub struct RideSummary {
    pub id: Uuid,
    pub template_id: Option<Uuid>,
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub departure_time: String,
    pub arrival_time: String,
    pub vehicle_type: String,
    pub price_per_seat: i32,
    pub total_seats: i32,
    pub available_seats: i32,
    pub booked_seats: i32,
}

#[derive(Debug, Serialize)]
pub struct RideDetail {
    #[serde(flatten)]
    pub summary: RideSummary,
    pub seats: Vec<SeatInfo>,
}

impl RideSummary {
    pub fn new(ride: &ride::Model, seats: &[seat::Model]) -> Self {
        let count = |status: SeatStatus| seats.iter().filter(|s| s.status == status).count() as i32;

        Self {
            id: ride.id,
            template_id: ride.template_id,
            origin: ride.origin.clone(),
            destination: ride.destination.clone(),
            date: ride.date,
            departure_time: ride.departure_time.clone(),
            arrival_time: ride.arrival_time.clone(),
            vehicle_type: ride.vehicle_type.clone(),
            price_per_seat: ride.price_per_seat,
            total_seats: ride.total_seats,
            available_seats: count(SeatStatus::Available),
            booked_seats: count(SeatStatus::Booked),
        }
    }
}

impl RideDetail {
    pub fn new(ride: &ride::Model, seats: &[seat::Model]) -> Self {
        Self {
            summary: RideSummary::new(ride, seats),
            seats: seats
                .iter()
                .map(|s| SeatInfo {
                    number: s.seat_number,
                    status: s.status,
                })
                .collect(),
        }
    }
}

/// Blank query-string values mean "no filter"
fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Drop rides that have already left, keeping input order.
pub fn upcoming(rides: Vec<ride::Model>, now: NaiveDateTime) -> Vec<ride::Model> {
    rides
        .into_iter()
        .filter(|r| !has_departed(r.date, &r.departure_time, now))
        .collect()
}

/// Seats for many rides in one query, grouped by ride
pub async fn seats_by_ride(
    state: &AppState,
    ride_ids: Vec<Uuid>,
) -> AppResult<HashMap<Uuid, Vec<seat::Model>>> {
    let mut grouped: HashMap<Uuid, Vec<seat::Model>> = HashMap::new();
    if ride_ids.is_empty() {
        return Ok(grouped);
    }

    let seats = seat::Entity::find()
        .filter(seat::Column::RideId.is_in(ride_ids))
        .order_by_asc(seat::Column::SeatNumber)
        .all(&state.db)
        .await?;

    for s in seats {
        grouped.entry(s.ride_id).or_default().push(s);
    }
    Ok(grouped)
}

pub async fn load_ride_detail(state: &AppState, ride_id: Uuid) -> AppResult<RideDetail> {
    let ride = ride::Entity::find_by_id(ride_id)
        .one(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Ride not found".to_string()))?;

    let seats = catalog::seats_of(&state.db, ride_id).await?;

    Ok(RideDetail::new(&ride, &seats))
}

/// List bookable rides, ordered by date then departure time
pub async fn list_rides(
    State(state): State<AppState>,
    Query(filters): Query<RideFilters>,
) -> AppResult<Json<Vec<RideSummary>>> {
    let now = service_now(state.config.service_offset());

    let mut query = ride::Entity::find().filter(ride::Column::Date.gte(now.date()));
    if let Some(origin) = present(&filters.origin) {
        query = query.filter(ride::Column::Origin.eq(origin));
    }
    if let Some(destination) = present(&filters.destination) {
        query = query.filter(ride::Column::Destination.eq(destination));
    }
    if let Some(date) = filters.date {
        query = query.filter(ride::Column::Date.eq(date));
    }

    let rides = query
        .order_by_asc(ride::Column::Date)
        .order_by_asc(ride::Column::DepartureTime)
        .all(&state.db)
        .await?;
    let rides = upcoming(rides, now);

    let mut seats = seats_by_ride(&state, rides.iter().map(|r| r.id).collect()).await?;
    let responses = rides
        .iter()
        .map(|r| RideSummary::new(r, &seats.remove(&r.id).unwrap_or_default()))
        .collect();

    Ok(Json(responses))
}

/// Get ride details with its seat map
pub async fn get_ride(
    State(state): State<AppState>,
    Path(ride_id): Path<Uuid>,
) -> AppResult<Json<RideDetail>> {
    Ok(Json(load_ride_detail(&state, ride_id).await?))
}

/// The two cities rides run between
pub async fn list_locations(State(state): State<AppState>) -> Json<[String; 2]> {
    Json(state.config.locations.clone())
}

#[derive(Debug, Serialize)]
pub struct SiteContentResponse {
    pub footer_text: String,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub payment_qr_url: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl From<Option<site_content::Model>> for SiteContentResponse {
    fn from(content: Option<site_content::Model>) -> Self {
        match content {
            Some(c) => Self {
                footer_text: c.footer_text,
                contact_phone: c.contact_phone,
                contact_email: c.contact_email,
                payment_qr_url: c.payment_qr_url,
                updated_at: Some(c.updated_at.with_timezone(&Utc)),
            },
            None => Self {
                footer_text: String::new(),
                contact_phone: None,
                contact_email: None,
                payment_qr_url: None,
                updated_at: None,
            },
        }
    }
}

/// Footer, contact details and payment QR code
pub async fn get_content(State(state): State<AppState>) -> AppResult<Json<SiteContentResponse>> {
    let content = site_content::Entity::find_by_id(site_content::SITE_CONTENT_ID)
        .one(&state.db)
        .await?;

    Ok(Json(content.into()))
}
