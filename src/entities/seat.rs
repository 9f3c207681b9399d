use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "seat_status")]
#[serde(rename_all = "lowercase")]
pub enum SeatStatus {
    #[sea_orm(string_value = "available")]
    Available,
    #[sea_orm(string_value = "booked")]
    Booked,
    #[sea_orm(string_value = "locked")]
    Locked,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "seat")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub ride_id: Uuid,
    #[sea_orm(primary_key, auto_increment = false)]
    pub seat_number: i32,
    pub status: SeatStatus,
    /// Live booking holding the seat; set iff `status` is `Booked`
    pub booking_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ride::Entity",
        from = "Column::RideId",
        to = "super::ride::Column::Id"
    )]
    Ride,
}

impl Related<super::ride::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ride.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
