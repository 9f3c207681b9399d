//! Transactional access to ride seat collections.
//!
//! Every seat write in the service goes through a [`SeatLedger`]. Each write bumps
//! the ride's seat version, so a reservation that read an older version can never
//! commit on top of it.

use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::DbErr;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::booking;
use crate::entities::seat::{self, SeatStatus};

/// A ride's seats as read inside a ledger transaction, with when it leaves.
#[derive(Debug, Clone)]
pub struct SeatSnapshot {
    pub ride_id: Uuid,
    pub version: i64,
    pub date: NaiveDate,
    pub departure_time: String,
    pub seats: Vec<seat::Model>,
}

/// Booking a plan wants written when its seats are claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBooking {
    pub user_id: Uuid,
    pub seat_numbers: Vec<i32>,
    pub passenger_name: String,
    pub passenger_phone: String,
}

/// Deterministic business outcome: the reservation cannot go ahead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Ride {0} not found")]
    RideNotFound(String),

    #[error("Ride {0} has already departed")]
    RideDeparted(Uuid),

    #[error("{}", describe_unavailable(.seats))]
    SeatsUnavailable { seats: Vec<i32> },
}

impl Rejection {
    pub fn kind(&self) -> &'static str {
        match self {
            Rejection::RideNotFound(_) => "ride_not_found",
            Rejection::RideDeparted(_) => "ride_departed",
            Rejection::SeatsUnavailable { .. } => "seats_unavailable",
        }
    }
}

fn describe_unavailable(seats: &[i32]) -> String {
    let list = seats
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(", ");

    match seats.len() {
        1 => format!("Seat {} is not available", list),
        _ => format!("Seats {} are not available", list),
    }
}

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("Ride seats kept changing, gave up after {attempts} attempts")]
    Contention { attempts: u32 },

    #[error("Store error: {0}")]
    Database(#[from] DbErr),
}

/// Result of an administrator lock/unlock.
#[derive(Debug, Clone, PartialEq)]
pub enum SeatChange {
    Applied(seat::Model),
    RideNotFound,
    SeatNotFound,
    SeatBooked,
}

/// Pure decision over a snapshot: either the booking to write or why not.
pub type SeatPlan<'a> = &'a (dyn Fn(&SeatSnapshot) -> Result<NewBooking, Rejection> + Send + Sync);

#[async_trait]
pub trait SeatLedger: Send + Sync {
    /// Read the ride's seats, run `plan` on them and, if it yields a booking, mark its
    /// seats booked and insert the booking as one atomic unit. The commit only lands
    /// if no other seat write touched the ride since the read.
    async fn run_transaction(
        &self,
        ride_id: Uuid,
        plan: SeatPlan<'_>,
    ) -> Result<booking::Model, LedgerError>;

    /// Mark a live booking cancelled and hand its seats back. `None` if unknown.
    async fn cancel_booking(&self, booking_id: Uuid) -> Result<Option<booking::Model>, LedgerError>;

    /// Lock an available seat or unlock a locked one. Booked seats are left alone.
    async fn set_seat_lock(
        &self,
        ride_id: Uuid,
        seat_number: i32,
        locked: bool,
    ) -> Result<SeatChange, LedgerError>;

    /// Delete every booking and free every booked seat. Returns bookings removed.
    async fn reset_all(&self) -> Result<u64, LedgerError>;
}

/// Requested seats that are missing from `seats` or not available, ascending.
pub fn unavailable_seats(seats: &[seat::Model], requested: &[i32]) -> Vec<i32> {
    let mut unavailable: Vec<i32> = requested
        .iter()
        .copied()
        .filter(|n| {
            !seats
                .iter()
                .any(|s| s.seat_number == *n && s.status == SeatStatus::Available)
        })
        .collect();

    unavailable.sort_unstable();
    unavailable.dedup();
    unavailable
}

/// Fresh seat layout for a ride: `1..=total`, all available.
pub fn initial_seats(ride_id: Uuid, total: i32) -> Vec<seat::Model> {
    (1..=total)
        .map(|seat_number| seat::Model {
            ride_id,
            seat_number,
            status: SeatStatus::Available,
            booking_id: None,
        })
        .collect()
}
