//! Ride and vehicle-template rules shared by the admin handlers.

use chrono::{NaiveDate, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use uuid::Uuid;

use crate::config::Config;
use crate::entities::{ride, seat, vehicle_template};
use crate::error::{AppError, AppResult};
use crate::reservation::ledger::initial_seats;
use crate::utils::schedule::normalize_time;

pub const MAX_SEATS_PER_RIDE: i32 = 60;

/// Everything needed to create a ride, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct RideDraft {
    pub template_id: Option<Uuid>,
    pub origin: String,
    pub destination: String,
    pub date: NaiveDate,
    pub departure_time: String,
    pub arrival_time: String,
    pub vehicle_type: String,
    pub total_seats: i32,
    pub price_per_seat: i32,
}

/// Schedule fields common to rides and templates.
#[derive(Debug, Clone, PartialEq)]
pub struct Schedule {
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub vehicle_type: String,
    pub total_seats: i32,
    pub price_per_seat: i32,
}

impl Schedule {
    /// Trim and check every field; times come back as `HH:MM`.
    pub fn validated(self, config: &Config) -> AppResult<Self> {
        let origin = self.origin.trim().to_string();
        let destination = self.destination.trim().to_string();
        validate_route(config, &origin, &destination)?;

        let departure_time = parse_time("departure_time", &self.departure_time)?;
        let arrival_time = parse_time("arrival_time", &self.arrival_time)?;

        let vehicle_type = self.vehicle_type.trim().to_string();
        if vehicle_type.is_empty() {
            return Err(AppError::BadRequest("Vehicle type is required".to_string()));
        }

        validate_capacity(self.total_seats)?;
        validate_price(self.price_per_seat)?;

        Ok(Self {
            origin,
            destination,
            departure_time,
            arrival_time,
            vehicle_type,
            total_seats: self.total_seats,
            price_per_seat: self.price_per_seat,
        })
    }

    pub fn on(self, date: NaiveDate, template_id: Option<Uuid>) -> RideDraft {
        RideDraft {
            template_id,
            origin: self.origin,
            destination: self.destination,
            date,
            departure_time: self.departure_time,
            arrival_time: self.arrival_time,
            vehicle_type: self.vehicle_type,
            total_seats: self.total_seats,
            price_per_seat: self.price_per_seat,
        }
    }
}

impl From<&vehicle_template::Model> for Schedule {
    fn from(t: &vehicle_template::Model) -> Self {
        Self {
            origin: t.origin.clone(),
            destination: t.destination.clone(),
            departure_time: t.departure_time.clone(),
            arrival_time: t.arrival_time.clone(),
            vehicle_type: t.vehicle_type.clone(),
            total_seats: t.total_seats,
            price_per_seat: t.price_per_seat,
        }
    }
}

pub fn validate_route(config: &Config, origin: &str, destination: &str) -> AppResult<()> {
    for place in [origin, destination] {
        if !config.is_known_location(place) {
            return Err(AppError::BadRequest(format!(
                "Unknown location '{}', expected one of {}",
                place,
                config.locations.join(", ")
            )));
        }
    }

    if origin == destination {
        return Err(AppError::BadRequest(
            "Origin and destination must be different".to_string(),
        ));
    }

    Ok(())
}

pub fn parse_time(field: &str, raw: &str) -> AppResult<String> {
    normalize_time(raw)
        .ok_or_else(|| AppError::BadRequest(format!("{} must be a HH:MM time", field)))
}

pub fn validate_capacity(total_seats: i32) -> AppResult<()> {
    if !(1..=MAX_SEATS_PER_RIDE).contains(&total_seats) {
        return Err(AppError::BadRequest(format!(
            "Total seats must be between 1 and {}",
            MAX_SEATS_PER_RIDE
        )));
    }
    Ok(())
}

pub fn validate_price(price_per_seat: i32) -> AppResult<()> {
    if price_per_seat < 0 {
        return Err(AppError::BadRequest("Price cannot be negative".to_string()));
    }
    Ok(())
}

/// Insert the ride and its full seat layout in one transaction.
///
/// A template yields at most one ride per date. If another writer already
/// created it, the insert is a no-op and the result is a conflict.
pub async fn create_ride(db: &DatabaseConnection, draft: RideDraft) -> AppResult<ride::Model> {
    let txn = db.begin().await?;

    let ride_id = Uuid::new_v4();
    let date = draft.date;
    let active = ride::ActiveModel {
        id: Set(ride_id),
        template_id: Set(draft.template_id),
        origin: Set(draft.origin),
        destination: Set(draft.destination),
        date: Set(draft.date),
        departure_time: Set(draft.departure_time),
        arrival_time: Set(draft.arrival_time),
        vehicle_type: Set(draft.vehicle_type),
        total_seats: Set(draft.total_seats),
        price_per_seat: Set(draft.price_per_seat),
        seat_version: Set(0),
        created_at: Set(Utc::now().fixed_offset()),
    };

    let inserted = ride::Entity::insert(active)
        .on_conflict(
            OnConflict::columns([ride::Column::TemplateId, ride::Column::Date])
                .do_nothing()
                .to_owned(),
        )
        .exec(&txn)
        .await;
    match inserted {
        Ok(_) => {}
        Err(DbErr::RecordNotInserted) => {
            return Err(AppError::Conflict(format!(
                "This template already has a ride on {}",
                date
            )));
        }
        Err(err) => return Err(err.into()),
    }

    let ride = ride::Entity::find_by_id(ride_id)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::Internal(format!("Ride {} missing after insert", ride_id)))?;

    let seats: Vec<seat::ActiveModel> = initial_seats(ride_id, ride.total_seats)
        .into_iter()
        .map(|s| seat::ActiveModel {
            ride_id: Set(s.ride_id),
            seat_number: Set(s.seat_number),
            status: Set(s.status),
            booking_id: Set(s.booking_id),
        })
        .collect();
    seat::Entity::insert_many(seats).exec(&txn).await?;

    txn.commit().await?;

    tracing::info!(
        ride_id = %ride.id,
        date = %ride.date,
        departure = %ride.departure_time,
        seats = ride.total_seats,
        "Ride created"
    );
    Ok(ride)
}

/// A ride's seats in seat-number order.
pub async fn seats_of(db: &DatabaseConnection, ride_id: Uuid) -> AppResult<Vec<seat::Model>> {
    let seats = seat::Entity::find()
        .filter(seat::Column::RideId.eq(ride_id))
        .order_by_asc(seat::Column::SeatNumber)
        .all(db)
        .await?;
    Ok(seats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;

    fn schedule() -> Schedule {
        Schedule {
            origin: " Kathmandu".to_string(),
            destination: "Pokhara ".to_string(),
            departure_time: "7:00".to_string(),
            arrival_time: "14:30".to_string(),
            vehicle_type: "Hiace".to_string(),
            total_seats: 9,
            price_per_seat: 1200,
        }
    }

    #[test]
    fn test_schedule_is_normalized() {
        let s = schedule().validated(&test_config()).unwrap();
        assert_eq!(s.origin, "Kathmandu");
        assert_eq!(s.destination, "Pokhara");
        assert_eq!(s.departure_time, "07:00");
    }

    #[test]
    fn test_route_must_join_the_two_cities() {
        let config = test_config();
        assert!(validate_route(&config, "Kathmandu", "Kathmandu").is_err());
        assert!(validate_route(&config, "Kathmandu", "Chitwan").is_err());
        assert!(validate_route(&config, "Pokhara", "Kathmandu").is_ok());
    }

    #[test]
    fn test_capacity_and_price_bounds() {
        let config = test_config();

        let mut s = schedule();
        s.total_seats = 0;
        assert!(s.validated(&config).is_err());

        let mut s = schedule();
        s.total_seats = MAX_SEATS_PER_RIDE + 1;
        assert!(s.validated(&config).is_err());

        let mut s = schedule();
        s.price_per_seat = -1;
        assert!(s.validated(&config).is_err());

        let mut s = schedule();
        s.arrival_time = "late".to_string();
        assert!(s.validated(&config).is_err());
    }

    #[tokio::test]
    async fn test_second_ride_for_template_date_is_a_conflict() {
        use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult};

        // ON CONFLICT DO NOTHING reports no inserted row
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_exec_results([MockExecResult {
                last_insert_id: 0,
                rows_affected: 0,
            }])
            .append_query_results([Vec::<ride::Model>::new()])
            .into_connection();

        let date = NaiveDate::from_ymd_opt(2099, 3, 10).unwrap();
        let draft = schedule()
            .validated(&test_config())
            .unwrap()
            .on(date, Some(Uuid::new_v4()));

        let err = create_ride(&db, draft).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(ref msg) if msg.ends_with("2099-03-10")));
    }

    #[test]
    fn test_template_schedule_becomes_dated_draft() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 10).unwrap();
        let template_id = Uuid::new_v4();
        let draft = schedule()
            .validated(&test_config())
            .unwrap()
            .on(date, Some(template_id));

        assert_eq!(draft.date, date);
        assert_eq!(draft.template_id, Some(template_id));
        assert_eq!(draft.total_seats, 9);
    }
}
