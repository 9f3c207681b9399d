use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vehicle_template")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub name: String,
    pub origin: String,
    pub destination: String,
    pub departure_time: String,
    pub arrival_time: String,
    pub vehicle_type: String,
    pub total_seats: i32,
    pub price_per_seat: i32,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ride::Entity")]
    Rides,
}

impl Related<super::ride::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rides.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
