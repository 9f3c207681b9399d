use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, SeatNumbers};
use crate::entities::seat::{self, SeatStatus};
use crate::reservation::ledger::{
    initial_seats, unavailable_seats, LedgerError, Rejection, SeatChange, SeatLedger, SeatPlan,
    SeatSnapshot,
};

/// Seat ledger held in process memory behind one mutex. Each call runs to
/// completion while holding the lock, so calls are serialized.
#[derive(Default)]
pub struct MemoryLedger {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    rides: HashMap<Uuid, MemoryRide>,
    bookings: Vec<booking::Model>,
}

struct MemoryRide {
    version: i64,
    date: NaiveDate,
    departure_time: String,
    seats: Vec<seat::Model>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ride with `total_seats` available seats that never departs.
    pub async fn add_ride(&self, total_seats: i32) -> Uuid {
        self.add_ride_departing(total_seats, NaiveDate::MAX, "23:59").await
    }

    /// Register a ride leaving at `departure_time` (`HH:MM`) on `date`.
    pub async fn add_ride_departing(
        &self,
        total_seats: i32,
        date: NaiveDate,
        departure_time: &str,
    ) -> Uuid {
        let ride_id = Uuid::new_v4();
        let mut state = self.state.lock().await;
        state.rides.insert(
            ride_id,
            MemoryRide {
                version: 0,
                date,
                departure_time: departure_time.to_string(),
                seats: initial_seats(ride_id, total_seats),
            },
        );
        ride_id
    }

    /// Drop a ride and its seats. Its bookings are kept, as with a deleted ride row.
    pub async fn remove_ride(&self, ride_id: Uuid) {
        self.state.lock().await.rides.remove(&ride_id);
    }

    pub async fn seat_status(&self, ride_id: Uuid, seat_number: i32) -> Option<SeatStatus> {
        let state = self.state.lock().await;
        state
            .rides
            .get(&ride_id)?
            .seats
            .iter()
            .find(|s| s.seat_number == seat_number)
            .map(|s| s.status)
    }

    pub async fn seat_version(&self, ride_id: Uuid) -> Option<i64> {
        self.state.lock().await.rides.get(&ride_id).map(|r| r.version)
    }

    pub async fn bookings(&self) -> Vec<booking::Model> {
        self.state.lock().await.bookings.clone()
    }
}

#[async_trait]
impl SeatLedger for MemoryLedger {
    async fn run_transaction(
        &self,
        ride_id: Uuid,
        plan: SeatPlan<'_>,
    ) -> Result<booking::Model, LedgerError> {
        let mut state = self.state.lock().await;

        let ride = state
            .rides
            .get_mut(&ride_id)
            .ok_or_else(|| Rejection::RideNotFound(ride_id.to_string()))?;

        let snapshot = SeatSnapshot {
            ride_id,
            version: ride.version,
            date: ride.date,
            departure_time: ride.departure_time.clone(),
            seats: ride.seats.clone(),
        };
        let claim = plan(&snapshot)?;

        let contested = unavailable_seats(&ride.seats, &claim.seat_numbers);
        if !contested.is_empty() {
            return Err(Rejection::SeatsUnavailable { seats: contested }.into());
        }

        let booking_id = Uuid::new_v4();
        for seat in ride
            .seats
            .iter_mut()
            .filter(|s| claim.seat_numbers.contains(&s.seat_number))
        {
            seat.status = SeatStatus::Booked;
            seat.booking_id = Some(booking_id);
        }
        ride.version += 1;

        let booking = booking::Model {
            id: booking_id,
            ride_id,
            user_id: claim.user_id,
            seat_numbers: SeatNumbers(claim.seat_numbers),
            passenger_name: claim.passenger_name,
            passenger_phone: claim.passenger_phone,
            status: BookingStatus::Confirmed,
            payment_screenshot_url: None,
            created_at: Utc::now().fixed_offset(),
        };
        state.bookings.push(booking.clone());

        Ok(booking)
    }

    async fn cancel_booking(&self, booking_id: Uuid) -> Result<Option<booking::Model>, LedgerError> {
        let mut guard = self.state.lock().await;
        let state = &mut *guard;

        let Some(booking) = state.bookings.iter_mut().find(|b| b.id == booking_id) else {
            return Ok(None);
        };
        if !booking.status.is_live() {
            return Ok(Some(booking.clone()));
        }

        if let Some(ride) = state.rides.get_mut(&booking.ride_id) {
            for seat in ride
                .seats
                .iter_mut()
                .filter(|s| s.booking_id == Some(booking_id))
            {
                seat.status = SeatStatus::Available;
                seat.booking_id = None;
            }
            ride.version += 1;
        }

        booking.status = BookingStatus::Cancelled;
        Ok(Some(booking.clone()))
    }

    async fn set_seat_lock(
        &self,
        ride_id: Uuid,
        seat_number: i32,
        locked: bool,
    ) -> Result<SeatChange, LedgerError> {
        let mut state = self.state.lock().await;

        let Some(ride) = state.rides.get_mut(&ride_id) else {
            return Ok(SeatChange::RideNotFound);
        };
        let Some(seat) = ride.seats.iter_mut().find(|s| s.seat_number == seat_number) else {
            return Ok(SeatChange::SeatNotFound);
        };
        if seat.status == SeatStatus::Booked {
            return Ok(SeatChange::SeatBooked);
        }

        seat.status = if locked { SeatStatus::Locked } else { SeatStatus::Available };
        let updated = seat.clone();
        ride.version += 1;

        Ok(SeatChange::Applied(updated))
    }

    async fn reset_all(&self) -> Result<u64, LedgerError> {
        let mut state = self.state.lock().await;

        for ride in state.rides.values_mut() {
            for seat in ride.seats.iter_mut().filter(|s| s.status == SeatStatus::Booked) {
                seat.status = SeatStatus::Available;
                seat.booking_id = None;
            }
            ride.version += 1;
        }

        let removed = state.bookings.len() as u64;
        state.bookings.clear();
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reservation::ledger::NewBooking;

    fn claim(seats: &[i32]) -> NewBooking {
        NewBooking {
            user_id: Uuid::new_v4(),
            seat_numbers: seats.to_vec(),
            passenger_name: "A".to_string(),
            passenger_phone: "9811111111".to_string(),
        }
    }

    #[tokio::test]
    async fn test_commit_flips_seats_and_bumps_version() {
        let ledger = MemoryLedger::new();
        let ride_id = ledger.add_ride(4).await;

        let plan = |_: &SeatSnapshot| -> Result<NewBooking, Rejection> { Ok(claim(&[2, 3])) };
        let booking = ledger.run_transaction(ride_id, &plan).await.unwrap();

        assert_eq!(booking.seat_numbers, SeatNumbers(vec![2, 3]));
        assert_eq!(ledger.seat_status(ride_id, 2).await, Some(SeatStatus::Booked));
        assert_eq!(ledger.seat_status(ride_id, 1).await, Some(SeatStatus::Available));
        assert_eq!(ledger.seat_version(ride_id).await, Some(1));
    }

    #[tokio::test]
    async fn test_plan_rejection_writes_nothing() {
        let ledger = MemoryLedger::new();
        let ride_id = ledger.add_ride(4).await;

        let plan = |_: &SeatSnapshot| -> Result<NewBooking, Rejection> { Err(Rejection::SeatsUnavailable { seats: vec![1] }) };
        let err = ledger.run_transaction(ride_id, &plan).await.unwrap_err();

        assert!(matches!(err, LedgerError::Rejected(_)));
        assert_eq!(ledger.seat_version(ride_id).await, Some(0));
        assert!(ledger.bookings().await.is_empty());
    }

    #[tokio::test]
    async fn test_removed_ride_is_not_found() {
        let ledger = MemoryLedger::new();
        let ride_id = ledger.add_ride(4).await;
        ledger.remove_ride(ride_id).await;

        let plan = |_: &SeatSnapshot| -> Result<NewBooking, Rejection> { Ok(claim(&[1])) };
        let err = ledger.run_transaction(ride_id, &plan).await.unwrap_err();

        assert!(matches!(err, LedgerError::Rejected(Rejection::RideNotFound(_))));
        assert_eq!(
            ledger.set_seat_lock(ride_id, 1, true).await.unwrap(),
            SeatChange::RideNotFound
        );
        assert!(ledger.bookings().await.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_releases_seats_once() {
        let ledger = MemoryLedger::new();
        let ride_id = ledger.add_ride(4).await;
        let plan = |_: &SeatSnapshot| -> Result<NewBooking, Rejection> { Ok(claim(&[1])) };
        let booking = ledger.run_transaction(ride_id, &plan).await.unwrap();

        let cancelled = ledger.cancel_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(cancelled.status, BookingStatus::Cancelled);
        assert_eq!(ledger.seat_status(ride_id, 1).await, Some(SeatStatus::Available));

        let again = ledger.cancel_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(again.status, BookingStatus::Cancelled);
        assert_eq!(ledger.seat_version(ride_id).await, Some(2));

        assert!(ledger.cancel_booking(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seat_lock_refuses_booked_seats() {
        let ledger = MemoryLedger::new();
        let ride_id = ledger.add_ride(3).await;
        let plan = |_: &SeatSnapshot| -> Result<NewBooking, Rejection> { Ok(claim(&[1])) };
        ledger.run_transaction(ride_id, &plan).await.unwrap();

        assert_eq!(
            ledger.set_seat_lock(ride_id, 1, true).await.unwrap(),
            SeatChange::SeatBooked
        );
        assert!(matches!(
            ledger.set_seat_lock(ride_id, 2, true).await.unwrap(),
            SeatChange::Applied(_)
        ));
        assert_eq!(ledger.seat_status(ride_id, 2).await, Some(SeatStatus::Locked));
        assert_eq!(
            ledger.set_seat_lock(ride_id, 7, true).await.unwrap(),
            SeatChange::SeatNotFound
        );
        assert_eq!(
            ledger.set_seat_lock(Uuid::new_v4(), 1, true).await.unwrap(),
            SeatChange::RideNotFound
        );
    }

    #[tokio::test]
    async fn test_reset_all_frees_booked_but_keeps_locks() {
        let ledger = MemoryLedger::new();
        let ride_id = ledger.add_ride(3).await;
        let plan = |_: &SeatSnapshot| -> Result<NewBooking, Rejection> { Ok(claim(&[1, 2])) };
        ledger.run_transaction(ride_id, &plan).await.unwrap();
        ledger.set_seat_lock(ride_id, 3, true).await.unwrap();

        assert_eq!(ledger.reset_all().await.unwrap(), 1);
        assert_eq!(ledger.seat_status(ride_id, 1).await, Some(SeatStatus::Available));
        assert_eq!(ledger.seat_status(ride_id, 3).await, Some(SeatStatus::Locked));
        assert!(ledger.bookings().await.is_empty());
    }
}
