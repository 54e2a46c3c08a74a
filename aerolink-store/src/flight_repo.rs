use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use aerolink_core::plan::ScheduledPair;
use aerolink_core::repository::FlightRepository;
use aerolink_core::{CoreError, CoreResult};
use aerolink_shared::models::Flight;

use crate::db_error;

pub struct PostgresFlightRepository {
    pool: PgPool,
}

impl PostgresFlightRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct FlightRow {
    id: Uuid,
    route_code: String,
    aircraft_instance_id: Uuid,
    scheduled_departure_day: NaiveDate,
    scheduled_arrival_day: NaiveDate,
}

impl From<FlightRow> for Flight {
    fn from(row: FlightRow) -> Self {
        Flight {
            id: row.id,
            route_code: row.route_code,
            aircraft_instance_id: row.aircraft_instance_id,
            scheduled_departure_day: row.scheduled_departure_day,
            scheduled_arrival_day: row.scheduled_arrival_day,
        }
    }
}

async fn busy_day<'e>(
    executor: impl PgExecutor<'e>,
    aircraft_instance_id: Uuid,
    days: &[NaiveDate],
) -> CoreResult<Option<NaiveDate>> {
    sqlx::query_scalar::<_, NaiveDate>(
        r#"
        SELECT t.day
        FROM UNNEST($2::date[]) WITH ORDINALITY AS t(day, n)
        WHERE EXISTS (
            SELECT 1 FROM flights f
            WHERE f.aircraft_instance_id = $1
              AND (f.scheduled_departure_day = t.day OR f.scheduled_arrival_day = t.day)
        )
        ORDER BY t.n
        LIMIT 1
        "#,
    )
    .bind(aircraft_instance_id)
    .bind(days.to_vec())
    .fetch_optional(executor)
    .await
    .map_err(db_error)
}

#[async_trait]
impl FlightRepository for PostgresFlightRepository {
    async fn first_busy_day(&self, aircraft_instance_id: Uuid, days: &[NaiveDate]) -> CoreResult<Option<NaiveDate>> {
        busy_day(&self.pool, aircraft_instance_id, days).await
    }

    async fn insert_flight_pairs(&self, aircraft_instance_id: Uuid, pairs: &[ScheduledPair]) -> CoreResult<Vec<Flight>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Concurrent schedules for the same aircraft queue on this lock.
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM aircraft_instances WHERE id = $1 FOR UPDATE")
            .bind(aircraft_instance_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or_else(|| CoreError::NotFound(format!("Aircraft {} not found", aircraft_instance_id)))?;

        let mut created = Vec::with_capacity(pairs.len() * 2);
        for pair in pairs {
            if let Some(day) = busy_day(&mut *tx, aircraft_instance_id, &pair.guarded_days()).await? {
                return Err(CoreError::Conflict(format!(
                    "Aircraft {} already flies on {}",
                    aircraft_instance_id, day
                )));
            }

            for new_flight in [&pair.outbound, &pair.inbound] {
                let row = sqlx::query_as::<_, FlightRow>(
                    r#"
                    INSERT INTO flights (id, route_code, aircraft_instance_id, scheduled_departure_day, scheduled_arrival_day)
                    VALUES ($1, $2, $3, $4, $5)
                    RETURNING id, route_code, aircraft_instance_id, scheduled_departure_day, scheduled_arrival_day
                    "#,
                )
                .bind(Uuid::new_v4())
                .bind(&new_flight.route_code)
                .bind(aircraft_instance_id)
                .bind(new_flight.scheduled_departure_day)
                .bind(new_flight.scheduled_arrival_day)
                .fetch_one(&mut *tx)
                .await
                .map_err(db_error)?;
                created.push(Flight::from(row));
            }
        }

        tx.commit().await.map_err(db_error)?;
        info!(aircraft = %aircraft_instance_id, flights = created.len(), "Flight schedule persisted");
        Ok(created)
    }

    async fn list_flights_for_aircraft(&self, aircraft_instance_id: Uuid) -> CoreResult<Vec<Flight>> {
        let rows = sqlx::query_as::<_, FlightRow>(
            r#"
            SELECT id, route_code, aircraft_instance_id, scheduled_departure_day, scheduled_arrival_day
            FROM flights
            WHERE aircraft_instance_id = $1
            ORDER BY scheduled_departure_day, created_at
            "#,
        )
        .bind(aircraft_instance_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Flight::from).collect())
    }

    async fn list_flights_departing_on(&self, route_codes: &[String], day: NaiveDate) -> CoreResult<Vec<Flight>> {
        let rows = sqlx::query_as::<_, FlightRow>(
            r#"
            SELECT id, route_code, aircraft_instance_id, scheduled_departure_day, scheduled_arrival_day
            FROM flights
            WHERE route_code = ANY($1) AND scheduled_departure_day = $2
            ORDER BY route_code
            "#,
        )
        .bind(route_codes.to_vec())
        .bind(day)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Flight::from).collect())
    }
}
