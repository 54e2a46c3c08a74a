use sqlx::postgres::PgPoolOptions;
use sqlx::{Pool, Postgres};
use std::time::Duration;
use tracing::info;

use crate::app_config::DatabaseConfig;
use crate::{
    PostgresAirportRepository, PostgresFleetRepository, PostgresFlightRepository, PostgresRouteRepository,
};

#[derive(Clone)]
pub struct DbClient {
    pub pool: Pool<Postgres>,
}

impl DbClient {
    pub async fn new(config: &DatabaseConfig) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&config.url)
            .await?;

        Ok(Self { pool })
    }

    pub async fn migrate(&self) -> Result<(), sqlx::migrate::MigrateError> {
        info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await?;
        info!("Migrations completed successfully.");
        Ok(())
    }

    pub fn airports(&self) -> PostgresAirportRepository {
        PostgresAirportRepository::new(self.pool.clone())
    }

    pub fn routes(&self) -> PostgresRouteRepository {
        PostgresRouteRepository::new(self.pool.clone())
    }

    pub fn fleet(&self) -> PostgresFleetRepository {
        PostgresFleetRepository::new(self.pool.clone())
    }

    pub fn flights(&self) -> PostgresFlightRepository {
        PostgresFlightRepository::new(self.pool.clone())
    }
}
