use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ride")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub template_id: Option<Uuid>,
    pub origin: String,
    pub destination: String,
    pub date: Date,
    /// `HH:MM`, zero padded so lexical order is chronological
    pub departure_time: String,
    pub arrival_time: String,
    pub vehicle_type: String,
    pub total_seats: i32,
    pub price_per_seat: i32,
    /// Bumped on every seat write; the reservation commit is conditioned on it.
    #[serde(skip_serializing)]
    pub seat_version: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::vehicle_template::Entity",
        from = "Column::TemplateId",
        to = "super::vehicle_template::Column::Id"
    )]
    Template,
    #[sea_orm(has_many = "super::seat::Entity")]
    Seats,
}

impl Related<super::vehicle_template::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Template.def()
    }
}

impl Related<super::seat::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Seats.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
