use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use aerolink_core::repository::AirportRepository;
use aerolink_core::CoreResult;
use aerolink_shared::models::Airport;

use crate::db_error;

pub struct PostgresAirportRepository {
    pool: PgPool,
}

impl PostgresAirportRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AirportRow {
    iata_code: String,
    name: String,
    latitude: f64,
    longitude: f64,
    city_id: Option<Uuid>,
}

#[async_trait]
impl AirportRepository for PostgresAirportRepository {
    async fn get_airport(&self, iata_code: &str) -> CoreResult<Option<Airport>> {
        let row = sqlx::query_as::<_, AirportRow>(
            "SELECT iata_code, name, latitude, longitude, city_id FROM airports WHERE iata_code = $1",
        )
        .bind(iata_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| Airport {
            iata_code: r.iata_code,
            name: r.name,
            latitude: r.latitude,
            longitude: r.longitude,
            city_id: r.city_id,
        }))
    }
}
