use sea_orm_migration::{prelude::*, schema::*};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SiteContent::Table)
                    .if_not_exists()
                    .col(integer(SiteContent::Id).primary_key())
                    .col(text(SiteContent::FooterText).not_null().default(""))
                    .col(string_len_null(SiteContent::ContactPhone, 20))
                    .col(string_len_null(SiteContent::ContactEmail, 255))
                    .col(text_null(SiteContent::PaymentQrUrl))
                    .col(
                        timestamp_with_time_zone(SiteContent::UpdatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SiteContent::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum SiteContent {
    Table,
    Id,
    FooterText,
    ContactPhone,
    ContactEmail,
    PaymentQrUrl,
    UpdatedAt,
}
