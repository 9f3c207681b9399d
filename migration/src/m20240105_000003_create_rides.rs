use sea_orm_migration::{prelude::*, schema::*};

use super::m20240105_000002_create_vehicle_templates::VehicleTemplate;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Ride::Table)
                    .if_not_exists()
                    .col(uuid(Ride::Id).primary_key())
                    .col(uuid_null(Ride::TemplateId))
                    .col(string_len(Ride::Origin, 100).not_null())
                    .col(string_len(Ride::Destination, 100).not_null())
                    .col(date(Ride::Date).not_null())
                    .col(string_len(Ride::DepartureTime, 5).not_null())
                    .col(string_len(Ride::ArrivalTime, 5).not_null())
                    .col(string_len(Ride::VehicleType, 50).not_null())
                    .col(integer(Ride::TotalSeats).not_null())
                    .col(integer(Ride::PricePerSeat).not_null())
                    .col(big_integer(Ride::SeatVersion).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(Ride::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_ride_template")
                            .from(Ride::Table, Ride::TemplateId)
                            .to(VehicleTemplate::Table, VehicleTemplate::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // One generated ride per template per day
        manager
            .create_index(
                Index::create()
                    .name("idx_ride_template_date")
                    .table(Ride::Table)
                    .col(Ride::TemplateId)
                    .col(Ride::Date)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ride_date_departure")
                    .table(Ride::Table)
                    .col(Ride::Date)
                    .col(Ride::DepartureTime)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Ride::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Ride {
    Table,
    Id,
    TemplateId,
    Origin,
    Destination,
    Date,
    DepartureTime,
    ArrivalTime,
    VehicleType,
    TotalSeats,
    PricePerSeat,
    SeatVersion,
    CreatedAt,
}
