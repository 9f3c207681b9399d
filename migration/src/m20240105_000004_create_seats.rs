use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

use super::m20240105_000003_create_rides::Ride;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(SeatStatus::Enum)
                    .values([SeatStatus::Available, SeatStatus::Booked, SeatStatus::Locked])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Seat::Table)
                    .if_not_exists()
                    .col(uuid(Seat::RideId).not_null())
                    .col(integer(Seat::SeatNumber).not_null())
                    .col(
                        ColumnDef::new(Seat::Status)
                            .custom(SeatStatus::Enum)
                            .not_null(),
                    )
                    .col(uuid_null(Seat::BookingId))
                    .primary_key(Index::create().col(Seat::RideId).col(Seat::SeatNumber))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_seat_ride")
                            .from(Seat::Table, Seat::RideId)
                            .to(Ride::Table, Ride::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Seat::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(SeatStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Seat {
    Table,
    RideId,
    SeatNumber,
    Status,
    BookingId,
}

#[derive(DeriveIden)]
pub enum SeatStatus {
    #[sea_orm(iden = "seat_status")]
    Enum,
    #[sea_orm(iden = "available")]
    Available,
    #[sea_orm(iden = "booked")]
    Booked,
    #[sea_orm(iden = "locked")]
    Locked,
}
