use std::sync::Arc;

use chrono::{FixedOffset, NaiveDateTime, Offset, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::booking;
use crate::reservation::ledger::{
    unavailable_seats, LedgerError, NewBooking, Rejection, SeatChange, SeatLedger, SeatSnapshot,
};
use crate::reservation::validate::{Passenger, SeatSelection, ValidationError};
use crate::utils::schedule::{has_departed, service_now};

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),

    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("{0}")]
    NotPermitted(String),

    #[error("Reservation service unavailable: {0}")]
    Unavailable(String),
}

impl ReservationError {
    /// Only infrastructure failures are worth retrying unchanged; rejections and
    /// validation errors repeat deterministically against the same state.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ReservationError::Unavailable(_))
    }
}

impl From<LedgerError> for ReservationError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::Rejected(rejection) => ReservationError::Rejected(rejection),
            other => ReservationError::Unavailable(other.to_string()),
        }
    }
}

/// Decide whether `requested` can be claimed from `snapshot` at service-local `now`.
pub fn plan_claim(
    snapshot: &SeatSnapshot,
    requested: &SeatSelection,
    passenger: &Passenger,
    user_id: Uuid,
    now: NaiveDateTime,
) -> Result<NewBooking, Rejection> {
    if has_departed(snapshot.date, &snapshot.departure_time, now) {
        return Err(Rejection::RideDeparted(snapshot.ride_id));
    }

    let unavailable = unavailable_seats(&snapshot.seats, requested.numbers());
    if !unavailable.is_empty() {
        return Err(Rejection::SeatsUnavailable { seats: unavailable });
    }

    Ok(NewBooking {
        user_id,
        seat_numbers: requested.numbers().to_vec(),
        passenger_name: passenger.name().to_string(),
        passenger_phone: passenger.phone().to_string(),
    })
}

/// The only path that turns seats from available to booked.
#[derive(Clone)]
pub struct ReservationService {
    ledger: Arc<dyn SeatLedger>,
    service_offset: FixedOffset,
}

impl ReservationService {
    /// Departures are judged in UTC until [`with_service_offset`](Self::with_service_offset) says otherwise.
    pub fn new(ledger: Arc<dyn SeatLedger>) -> Self {
        Self {
            ledger,
            service_offset: Utc.fix(),
        }
    }

    pub fn with_service_offset(mut self, offset: FixedOffset) -> Self {
        self.service_offset = offset;
        self
    }

    pub async fn reserve_seats(
        &self,
        ride_id: Uuid,
        seats: &SeatSelection,
        passenger: &Passenger,
        user_id: Uuid,
    ) -> Result<booking::Model, ReservationError> {
        let now = service_now(self.service_offset);
        let plan = |snapshot: &SeatSnapshot| plan_claim(snapshot, seats, passenger, user_id, now);

        match self.ledger.run_transaction(ride_id, &plan).await {
            Ok(booking) => {
                tracing::info!(
                    booking_id = %booking.id,
                    %ride_id,
                    %user_id,
                    seats = ?seats.numbers(),
                    "Seats reserved"
                );
                Ok(booking)
            }
            Err(LedgerError::Rejected(rejection)) => {
                tracing::info!(
                    %ride_id,
                    %user_id,
                    seats = ?seats.numbers(),
                    reason = %rejection,
                    "Reservation rejected"
                );
                Err(rejection.into())
            }
            Err(err) => {
                tracing::error!(%ride_id, %user_id, error = %err, "Reservation failed");
                Err(err.into())
            }
        }
    }

    pub async fn cancel_booking(
        &self,
        booking_id: Uuid,
    ) -> Result<Option<booking::Model>, ReservationError> {
        let cancelled = self.ledger.cancel_booking(booking_id).await?;
        if cancelled.is_some() {
            tracing::info!(%booking_id, "Booking cancelled, seats released");
        }
        Ok(cancelled)
    }

    pub async fn set_seat_lock(
        &self,
        ride_id: Uuid,
        seat_number: i32,
        locked: bool,
    ) -> Result<SeatChange, ReservationError> {
        let change = self.ledger.set_seat_lock(ride_id, seat_number, locked).await?;
        if let SeatChange::Applied(_) = change {
            tracing::info!(%ride_id, seat_number, locked, "Seat lock changed");
        }
        Ok(change)
    }

    /// Clear every booking and free every booked seat.
    pub async fn reset_all(&self) -> Result<u64, ReservationError> {
        let removed = self.ledger.reset_all().await?;
        tracing::warn!(removed, "All bookings cleared and seats reset");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::booking::SeatNumbers;
    use crate::entities::seat::SeatStatus;
    use crate::reservation::memory::MemoryLedger;

    fn passenger(name: &str) -> Passenger {
        Passenger::new(name, "9811111111").unwrap()
    }

    fn seats(numbers: &[i32]) -> SeatSelection {
        SeatSelection::new(numbers.iter().copied()).unwrap()
    }

    async fn setup(total: i32) -> (Arc<MemoryLedger>, ReservationService, Uuid) {
        let ledger = Arc::new(MemoryLedger::new());
        let ride_id = ledger.add_ride(total).await;
        let service = ReservationService::new(ledger.clone());
        (ledger, service, ride_id)
    }

    #[tokio::test]
    async fn test_reserve_books_requested_seats() {
        let (ledger, service, ride_id) = setup(9).await;
        let user = Uuid::new_v4();

        let booking = service
            .reserve_seats(ride_id, &seats(&[3, 4]), &passenger("A"), user)
            .await
            .unwrap();

        assert_eq!(booking.ride_id, ride_id);
        assert_eq!(booking.user_id, user);
        assert_eq!(booking.seat_numbers, SeatNumbers(vec![3, 4]));
        assert_eq!(booking.status, booking::BookingStatus::Confirmed);
        assert_eq!(ledger.seat_status(ride_id, 3).await, Some(SeatStatus::Booked));
        assert_eq!(ledger.seat_status(ride_id, 4).await, Some(SeatStatus::Booked));
        assert_eq!(ledger.seat_status(ride_id, 5).await, Some(SeatStatus::Available));
    }

    #[tokio::test]
    async fn test_mixed_request_is_all_or_nothing() {
        let (ledger, service, ride_id) = setup(9).await;
        service
            .reserve_seats(ride_id, &seats(&[3, 4]), &passenger("A"), Uuid::new_v4())
            .await
            .unwrap();

        let err = service
            .reserve_seats(ride_id, &seats(&[4, 5]), &passenger("B"), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReservationError::Rejected(Rejection::SeatsUnavailable { ref seats }) if seats == &vec![4]
        ));
        assert!(!err.is_retryable());
        assert_eq!(ledger.seat_status(ride_id, 5).await, Some(SeatStatus::Available));
        assert_eq!(ledger.bookings().await.len(), 1);
    }

    #[tokio::test]
    async fn test_out_of_range_seat_is_a_conflict() {
        let (ledger, service, ride_id) = setup(9).await;

        let err = service
            .reserve_seats(ride_id, &seats(&[9, 10]), &passenger("A"), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ReservationError::Rejected(Rejection::SeatsUnavailable { ref seats }) if seats == &vec![10]
        ));
        assert_eq!(ledger.seat_status(ride_id, 9).await, Some(SeatStatus::Available));
        assert_eq!(ledger.seat_version(ride_id).await, Some(0));
    }

    #[tokio::test]
    async fn test_locked_seat_cannot_be_reserved() {
        let (_ledger, service, ride_id) = setup(4).await;
        service.set_seat_lock(ride_id, 2, true).await.unwrap();

        let err = service
            .reserve_seats(ride_id, &seats(&[2]), &passenger("A"), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::Rejected(Rejection::SeatsUnavailable { .. })));

        service.set_seat_lock(ride_id, 2, false).await.unwrap();
        assert!(service
            .reserve_seats(ride_id, &seats(&[2]), &passenger("A"), Uuid::new_v4())
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_missing_ride_is_not_found() {
        let (ledger, service, _) = setup(4).await;

        let err = service
            .reserve_seats(Uuid::new_v4(), &seats(&[1]), &passenger("A"), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, ReservationError::Rejected(Rejection::RideNotFound(_))));
        assert!(ledger.bookings().await.is_empty());
    }

    #[tokio::test]
    async fn test_departed_ride_is_rejected() {
        let ledger = Arc::new(MemoryLedger::new());
        let service = ReservationService::new(ledger.clone())
            .with_service_offset(FixedOffset::east_opt(345 * 60).unwrap());
        let yesterday = Utc::now().date_naive() - chrono::Duration::days(1);
        let ride_id = ledger.add_ride_departing(4, yesterday, "07:00").await;

        let err = service
            .reserve_seats(ride_id, &seats(&[1]), &passenger("A"), Uuid::new_v4())
            .await
            .unwrap_err();

        assert!(matches!(err, ReservationError::Rejected(Rejection::RideDeparted(id)) if id == ride_id));
        assert!(!err.is_retryable());
        assert_eq!(ledger.seat_status(ride_id, 1).await, Some(SeatStatus::Available));
        assert_eq!(ledger.seat_version(ride_id).await, Some(0));
    }

    #[test]
    fn test_plan_checks_departure_before_seats() {
        let ride_id = Uuid::new_v4();
        let snapshot = SeatSnapshot {
            ride_id,
            version: 3,
            date: chrono::NaiveDate::from_ymd_opt(2024, 3, 10).unwrap(),
            departure_time: "09:00".to_string(),
            seats: crate::reservation::ledger::initial_seats(ride_id, 4),
        };
        let at = |time: &str| {
            NaiveDateTime::parse_from_str(&format!("2024-03-10 {}", time), "%Y-%m-%d %H:%M").unwrap()
        };

        let claim = plan_claim(&snapshot, &seats(&[2]), &passenger("A"), Uuid::new_v4(), at("08:59"));
        assert_eq!(claim.unwrap().seat_numbers, vec![2]);

        let late = plan_claim(&snapshot, &seats(&[9]), &passenger("A"), Uuid::new_v4(), at("09:00"));
        assert_eq!(late, Err(Rejection::RideDeparted(ride_id)));
    }

    #[tokio::test]
    async fn test_failure_repeats_against_unchanged_state() {
        let (_ledger, service, ride_id) = setup(4).await;
        service
            .reserve_seats(ride_id, &seats(&[1]), &passenger("A"), Uuid::new_v4())
            .await
            .unwrap();

        let first = service
            .reserve_seats(ride_id, &seats(&[1, 2]), &passenger("B"), Uuid::new_v4())
            .await
            .unwrap_err();
        let second = service
            .reserve_seats(ride_id, &seats(&[1, 2]), &passenger("B"), Uuid::new_v4())
            .await
            .unwrap_err();

        assert_eq!(first.to_string(), second.to_string());
    }

    #[tokio::test]
    async fn test_cancel_makes_seats_bookable_again() {
        let (_ledger, service, ride_id) = setup(4).await;
        let booking = service
            .reserve_seats(ride_id, &seats(&[1]), &passenger("A"), Uuid::new_v4())
            .await
            .unwrap();

        service.cancel_booking(booking.id).await.unwrap();

        assert!(service
            .reserve_seats(ride_id, &seats(&[1]), &passenger("B"), Uuid::new_v4())
            .await
            .is_ok());
    }

    #[test]
    fn test_ledger_errors_map_to_retryable_unavailable() {
        let err: ReservationError = LedgerError::Contention { attempts: 5 }.into();
        assert!(err.is_retryable());

        let err: ReservationError =
            LedgerError::Database(sea_orm::DbErr::Custom("connection refused".into())).into();
        assert!(err.is_retryable());

        let err: ReservationError =
            LedgerError::Rejected(Rejection::RideNotFound("x".into())).into();
        assert!(!err.is_retryable());
    }
}
