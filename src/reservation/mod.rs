//! Seat reservation: the one consistency-critical part of the service.

pub mod database;
pub mod ledger;
pub mod memory;
pub mod service;
pub mod validate;

pub use database::DatabaseLedger;
pub use ledger::{LedgerError, Rejection, SeatChange, SeatLedger};
pub use memory::MemoryLedger;
pub use service::{ReservationError, ReservationService};
pub use validate::{Passenger, SeatSelection, ValidationError};
