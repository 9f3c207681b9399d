use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VehicleTemplate::Table)
                    .if_not_exists()
                    .col(uuid(VehicleTemplate::Id).primary_key())
                    .col(string_len(VehicleTemplate::Name, 100).not_null())
                    .col(string_len(VehicleTemplate::Origin, 100).not_null())
                    .col(string_len(VehicleTemplate::Destination, 100).not_null())
                    .col(string_len(VehicleTemplate::DepartureTime, 5).not_null())
                    .col(string_len(VehicleTemplate::ArrivalTime, 5).not_null())
                    .col(string_len(VehicleTemplate::VehicleType, 50).not_null())
                    .col(integer(VehicleTemplate::TotalSeats).not_null())
                    .col(integer(VehicleTemplate::PricePerSeat).not_null())
                    .col(
                        timestamp_with_time_zone(VehicleTemplate::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VehicleTemplate::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum VehicleTemplate {
    Table,
    Id,
    Name,
    Origin,
    Destination,
    DepartureTime,
    ArrivalTime,
    VehicleType,
    TotalSeats,
    PricePerSeat,
    CreatedAt,
}
