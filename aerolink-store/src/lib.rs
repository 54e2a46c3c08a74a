pub mod app_config;
pub mod database;
pub mod memory_repo;
pub mod airport_repo;
pub mod route_repo;
pub mod fleet_repo;
pub mod flight_repo;

pub use database::DbClient;
pub use memory_repo::MemoryStore;
pub use airport_repo::PostgresAirportRepository;
pub use route_repo::PostgresRouteRepository;
pub use fleet_repo::PostgresFleetRepository;
pub use flight_repo::PostgresFlightRepository;

use aerolink_core::CoreError;

/// Maps a driver error onto the domain taxonomy. Unique violations are
/// reported as conflicts; anything else is an internal failure.
pub(crate) fn db_error(err: sqlx::Error) -> CoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            CoreError::Conflict(db.message().to_string())
        }
        sqlx::Error::RowNotFound => CoreError::NotFound(err.to_string()),
        _ => {
            tracing::error!("Database error: {}", err);
            CoreError::InternalError(err.to_string())
        }
    }
}
