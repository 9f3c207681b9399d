pub mod catalog;
pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod reservation;
pub mod routes;
pub mod storage;
pub mod utils;

use std::sync::Arc;

use sea_orm::DatabaseConnection;

pub use config::Config;
pub use error::{AppError, AppResult};

use reservation::ReservationService;
use storage::FileStorage;

#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: Config,
    pub reservations: ReservationService,
    pub storage: Arc<dyn FileStorage>,
}
