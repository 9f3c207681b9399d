use sea_orm::entity::prelude::*;
use sea_orm::FromJsonQueryResult;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "booking_status")]
#[serde(rename_all = "kebab-case")]
pub enum BookingStatus {
    #[sea_orm(string_value = "confirmed")]
    Confirmed,
    #[sea_orm(string_value = "pending-payment")]
    PendingPayment,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl BookingStatus {
    pub fn is_live(self) -> bool {
        self != BookingStatus::Cancelled
    }
}

/// Seat numbers claimed by a booking, stored as a JSON array.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, FromJsonQueryResult)]
pub struct SeatNumbers(pub Vec<i32>);

// ride_id deliberately has no relation: bookings outlive deleted rides.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "booking")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub ride_id: Uuid,
    pub user_id: Uuid,
    #[sea_orm(column_type = "JsonBinary")]
    pub seat_numbers: SeatNumbers,
    pub passenger_name: String,
    pub passenger_phone: String,
    pub status: BookingStatus,
    pub payment_screenshot_url: Option<String>,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
