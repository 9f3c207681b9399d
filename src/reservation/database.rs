use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::booking::{self, BookingStatus, SeatNumbers};
use crate::entities::ride;
use crate::entities::seat::{self, SeatStatus};
use crate::reservation::ledger::{
    LedgerError, Rejection, SeatChange, SeatLedger, SeatPlan, SeatSnapshot,
};

/// Seat ledger over PostgreSQL.
///
/// Each write runs in a transaction that first moves `ride.seat_version` from the
/// value it read to the next one with a conditional update. Concurrent writers to
/// the same ride serialize on that row; whoever commits second matches zero rows,
/// rolls back and re-reads, up to `max_attempts` times.
#[derive(Clone)]
pub struct DatabaseLedger {
    db: DatabaseConnection,
    max_attempts: u32,
}

enum Attempt<T> {
    Done(T),
    Stale,
}

impl DatabaseLedger {
    pub fn new(db: DatabaseConnection, max_attempts: u32) -> Self {
        Self {
            db,
            max_attempts: max_attempts.max(1),
        }
    }

    async fn load_snapshot(
        txn: &DatabaseTransaction,
        ride_id: Uuid,
    ) -> Result<Option<SeatSnapshot>, LedgerError> {
        let Some(ride) = ride::Entity::find_by_id(ride_id).one(txn).await? else {
            return Ok(None);
        };

        let seats = seat::Entity::find()
            .filter(seat::Column::RideId.eq(ride_id))
            .order_by_asc(seat::Column::SeatNumber)
            .all(txn)
            .await?;

        Ok(Some(SeatSnapshot {
            ride_id,
            version: ride.seat_version,
            date: ride.date,
            departure_time: ride.departure_time,
            seats,
        }))
    }

    /// Compare-and-swap on the ride's seat version. False if someone got there first.
    async fn advance_version(
        txn: &DatabaseTransaction,
        ride_id: Uuid,
        seen: i64,
    ) -> Result<bool, LedgerError> {
        let result = ride::Entity::update_many()
            .col_expr(ride::Column::SeatVersion, Expr::value(seen + 1))
            .filter(ride::Column::Id.eq(ride_id))
            .filter(ride::Column::SeatVersion.eq(seen))
            .exec(txn)
            .await?;

        Ok(result.rows_affected == 1)
    }

    async fn try_claim(
        txn: &DatabaseTransaction,
        ride_id: Uuid,
        plan: SeatPlan<'_>,
    ) -> Result<Attempt<booking::Model>, LedgerError> {
        let snapshot = Self::load_snapshot(txn, ride_id)
            .await?
            .ok_or_else(|| Rejection::RideNotFound(ride_id.to_string()))?;

        let claim = plan(&snapshot)?;

        if !Self::advance_version(txn, ride_id, snapshot.version).await? {
            return Ok(Attempt::Stale);
        }

        let booking_id = Uuid::new_v4();
        let flipped = seat::Entity::update_many()
            .set(seat::ActiveModel {
                status: Set(SeatStatus::Booked),
                booking_id: Set(Some(booking_id)),
                ..Default::default()
            })
            .filter(seat::Column::RideId.eq(ride_id))
            .filter(seat::Column::SeatNumber.is_in(claim.seat_numbers.clone()))
            .filter(seat::Column::Status.eq(SeatStatus::Available))
            .exec(txn)
            .await?;

        if flipped.rows_affected != claim.seat_numbers.len() as u64 {
            return Ok(Attempt::Stale);
        }

        let booking = booking::ActiveModel {
            id: Set(booking_id),
            ride_id: Set(ride_id),
            user_id: Set(claim.user_id),
            seat_numbers: Set(SeatNumbers(claim.seat_numbers)),
            passenger_name: Set(claim.passenger_name),
            passenger_phone: Set(claim.passenger_phone),
            status: Set(BookingStatus::Confirmed),
            payment_screenshot_url: Set(None),
            created_at: Set(Utc::now().fixed_offset()),
        }
        .insert(txn)
        .await?;

        Ok(Attempt::Done(booking))
    }

    async fn try_cancel(
        txn: &DatabaseTransaction,
        booking_id: Uuid,
    ) -> Result<Attempt<Option<booking::Model>>, LedgerError> {
        let Some(existing) = booking::Entity::find_by_id(booking_id).one(txn).await? else {
            return Ok(Attempt::Done(None));
        };
        if !existing.status.is_live() {
            return Ok(Attempt::Done(Some(existing)));
        }

        // The ride may already be gone; the booking is still cancelled.
        if let Some(ride) = ride::Entity::find_by_id(existing.ride_id).one(txn).await? {
            if !Self::advance_version(txn, ride.id, ride.seat_version).await? {
                return Ok(Attempt::Stale);
            }

            seat::Entity::update_many()
                .set(seat::ActiveModel {
                    status: Set(SeatStatus::Available),
                    booking_id: Set(None),
                    ..Default::default()
                })
                .filter(seat::Column::RideId.eq(ride.id))
                .filter(seat::Column::BookingId.eq(booking_id))
                .exec(txn)
                .await?;
        }

        let mut active: booking::ActiveModel = existing.into();
        active.status = Set(BookingStatus::Cancelled);
        let cancelled = active.update(txn).await?;

        Ok(Attempt::Done(Some(cancelled)))
    }

    async fn try_set_lock(
        txn: &DatabaseTransaction,
        ride_id: Uuid,
        seat_number: i32,
        locked: bool,
    ) -> Result<Attempt<SeatChange>, LedgerError> {
        let Some(snapshot) = Self::load_snapshot(txn, ride_id).await? else {
            return Ok(Attempt::Done(SeatChange::RideNotFound));
        };
        let Some(current) = snapshot
            .seats
            .iter()
            .find(|s| s.seat_number == seat_number)
            .cloned()
        else {
            return Ok(Attempt::Done(SeatChange::SeatNotFound));
        };
        if current.status == SeatStatus::Booked {
            return Ok(Attempt::Done(SeatChange::SeatBooked));
        }

        if !Self::advance_version(txn, ride_id, snapshot.version).await? {
            return Ok(Attempt::Stale);
        }

        let mut active: seat::ActiveModel = current.into();
        active.status = Set(if locked { SeatStatus::Locked } else { SeatStatus::Available });
        let updated = active.update(txn).await?;

        Ok(Attempt::Done(SeatChange::Applied(updated)))
    }
}

#[async_trait]
impl SeatLedger for DatabaseLedger {
    async fn run_transaction(
        &self,
        ride_id: Uuid,
        plan: SeatPlan<'_>,
    ) -> Result<booking::Model, LedgerError> {
        for attempt in 1..=self.max_attempts {
            let txn = self.db.begin().await?;
            match Self::try_claim(&txn, ride_id, plan).await? {
                Attempt::Done(booking) => {
                    txn.commit().await?;
                    return Ok(booking);
                }
                Attempt::Stale => {
                    txn.rollback().await?;
                    tracing::debug!(%ride_id, attempt, "Seat version moved during reservation, retrying");
                }
            }
        }

        Err(LedgerError::Contention {
            attempts: self.max_attempts,
        })
    }

    async fn cancel_booking(&self, booking_id: Uuid) -> Result<Option<booking::Model>, LedgerError> {
        for attempt in 1..=self.max_attempts {
            let txn = self.db.begin().await?;
            match Self::try_cancel(&txn, booking_id).await? {
                Attempt::Done(result) => {
                    txn.commit().await?;
                    return Ok(result);
                }
                Attempt::Stale => {
                    txn.rollback().await?;
                    tracing::debug!(%booking_id, attempt, "Seat version moved during cancellation, retrying");
                }
            }
        }

        Err(LedgerError::Contention {
            attempts: self.max_attempts,
        })
    }

    async fn set_seat_lock(
        &self,
        ride_id: Uuid,
        seat_number: i32,
        locked: bool,
    ) -> Result<SeatChange, LedgerError> {
        for attempt in 1..=self.max_attempts {
            let txn = self.db.begin().await?;
            match Self::try_set_lock(&txn, ride_id, seat_number, locked).await? {
                Attempt::Done(change) => {
                    txn.commit().await?;
                    return Ok(change);
                }
                Attempt::Stale => {
                    txn.rollback().await?;
                    tracing::debug!(%ride_id, seat_number, attempt, "Seat version moved during lock change, retrying");
                }
            }
        }

        Err(LedgerError::Contention {
            attempts: self.max_attempts,
        })
    }

    async fn reset_all(&self) -> Result<u64, LedgerError> {
        let txn = self.db.begin().await?;

        // Bumping every version first makes in-flight reservations re-read.
        ride::Entity::update_many()
            .col_expr(
                ride::Column::SeatVersion,
                Expr::col(ride::Column::SeatVersion).add(1),
            )
            .exec(&txn)
            .await?;

        seat::Entity::update_many()
            .set(seat::ActiveModel {
                status: Set(SeatStatus::Available),
                booking_id: Set(None),
                ..Default::default()
            })
            .filter(seat::Column::Status.eq(SeatStatus::Booked))
            .exec(&txn)
            .await?;

        let removed = booking::Entity::delete_many().exec(&txn).await?;

        txn.commit().await?;
        Ok(removed.rows_affected)
    }
}
