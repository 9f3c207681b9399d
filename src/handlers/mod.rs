pub mod account;
pub mod admin;
pub mod bookings;
pub mod rides;
pub mod uploads;
