use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(BookingStatus::Enum)
                    .values([
                        BookingStatus::Confirmed,
                        BookingStatus::PendingPayment,
                        BookingStatus::Cancelled,
                    ])
                    .to_owned(),
            )
            .await?;

        // No foreign key on ride_id: deleting a ride leaves its bookings in place.
        // user_id belongs to the identity platform and may have no local profile.
        manager
            .create_table(
                Table::create()
                    .table(Booking::Table)
                    .if_not_exists()
                    .col(uuid(Booking::Id).primary_key())
                    .col(uuid(Booking::RideId).not_null())
                    .col(uuid(Booking::UserId).not_null())
                    .col(json_binary(Booking::SeatNumbers).not_null())
                    .col(string_len(Booking::PassengerName, 100).not_null())
                    .col(string_len(Booking::PassengerPhone, 20).not_null())
                    .col(
                        ColumnDef::new(Booking::Status)
                            .custom(BookingStatus::Enum)
                            .not_null(),
                    )
                    .col(text_null(Booking::PaymentScreenshotUrl))
                    .col(
                        timestamp_with_time_zone(Booking::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_ride")
                    .table(Booking::Table)
                    .col(Booking::RideId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_booking_user")
                    .table(Booking::Table)
                    .col(Booking::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Booking::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(BookingStatus::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Booking {
    Table,
    Id,
    RideId,
    UserId,
    SeatNumbers,
    PassengerName,
    PassengerPhone,
    Status,
    PaymentScreenshotUrl,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum BookingStatus {
    #[sea_orm(iden = "booking_status")]
    Enum,
    #[sea_orm(iden = "confirmed")]
    Confirmed,
    #[sea_orm(iden = "pending-payment")]
    PendingPayment,
    #[sea_orm(iden = "cancelled")]
    Cancelled,
}
