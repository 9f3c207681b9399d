pub use sea_orm_migration::prelude::*;

mod m20240105_000001_create_users;
mod m20240105_000002_create_vehicle_templates;
mod m20240105_000003_create_rides;
mod m20240105_000004_create_seats;
mod m20240105_000005_create_bookings;
mod m20240212_000001_create_site_content;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240105_000001_create_users::Migration),
            Box::new(m20240105_000002_create_vehicle_templates::Migration),
            Box::new(m20240105_000003_create_rides::Migration),
            Box::new(m20240105_000004_create_seats::Migration),
            Box::new(m20240105_000005_create_bookings::Migration),
            Box::new(m20240212_000001_create_site_content::Migration),
        ]
    }
}
