use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use aerolink_core::plan::{NewRoute, NewRoutePair};
use aerolink_core::repository::RouteRepository;
use aerolink_core::{CoreError, CoreResult};
use aerolink_shared::models::{Route, RouteDetail};

use crate::db_error;

pub struct PostgresRouteRepository {
    pool: PgPool,
}

impl PostgresRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal structs for type-safe querying
#[derive(sqlx::FromRow)]
struct RouteRow {
    code: String,
    airline_code: String,
    start_date: NaiveDate,
    end_date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl From<RouteRow> for Route {
    fn from(row: RouteRow) -> Self {
        Route {
            code: row.code,
            airline_code: row.airline_code,
            start_date: row.start_date,
            end_date: row.end_date,
            created_at: row.created_at,
        }
    }
}

#[derive(sqlx::FromRow)]
struct RouteDetailRow {
    id: Uuid,
    route_code: String,
    route_section_id: Uuid,
    departure_airport: String,
    arrival_airport: String,
    departure_time: NaiveTime,
    arrival_time: NaiveTime,
    next_id: Option<Uuid>,
}

impl From<RouteDetailRow> for RouteDetail {
    fn from(row: RouteDetailRow) -> Self {
        RouteDetail {
            id: row.id,
            route_code: row.route_code,
            route_section_id: row.route_section_id,
            departure_airport: row.departure_airport,
            arrival_airport: row.arrival_airport,
            departure_time: row.departure_time,
            arrival_time: row.arrival_time,
            next_id: row.next_id,
        }
    }
}

const DETAIL_COLUMNS: &str = r#"
    d.id, d.route_code, d.route_section_id,
    s.departure_airport, s.arrival_airport,
    d.departure_time, d.arrival_time, d.next_id
"#;

/// Returns the id of the section for the pair, creating it on first use.
async fn resolve_section(conn: &mut PgConnection, departure: &str, arrival: &str) -> CoreResult<Uuid> {
    // The no-op update makes RETURNING yield the existing row on conflict.
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO route_sections (id, departure_airport, arrival_airport)
        VALUES ($1, $2, $3)
        ON CONFLICT (departure_airport, arrival_airport)
        DO UPDATE SET departure_airport = EXCLUDED.departure_airport
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(departure)
    .bind(arrival)
    .fetch_one(conn)
    .await
    .map_err(db_error)
}

async fn insert_route(conn: &mut PgConnection, route: &NewRoute) -> CoreResult<()> {
    sqlx::query(
        "INSERT INTO routes (code, airline_code, start_date, end_date) VALUES ($1, $2, $3, $4)",
    )
    .bind(&route.code)
    .bind(&route.airline_code)
    .bind(route.start_date)
    .bind(route.end_date)
    .execute(&mut *conn)
    .await
    .map_err(|e| match db_error(e) {
        CoreError::Conflict(_) => CoreError::Conflict(format!("Route {} already exists", route.code)),
        other => other,
    })?;

    // Tail first, so every next_id already exists when it is referenced.
    for detail in route.details.iter().rev() {
        let section_id = resolve_section(&mut *conn, &detail.departure_airport, &detail.arrival_airport).await?;
        sqlx::query(
            r#"
            INSERT INTO route_details (id, route_code, route_section_id, departure_time, arrival_time, next_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(detail.id)
        .bind(&route.code)
        .bind(section_id)
        .bind(detail.departure_time)
        .bind(detail.arrival_time)
        .bind(detail.next_id)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;
    }
    Ok(())
}

#[async_trait]
impl RouteRepository for PostgresRouteRepository {
    async fn get_route(&self, code: &str) -> CoreResult<Option<Route>> {
        let row = sqlx::query_as::<_, RouteRow>(
            "SELECT code, airline_code, start_date, end_date, created_at FROM routes WHERE code = $1",
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(Route::from))
    }

    async fn list_routes_by_airline(&self, airline_code: &str) -> CoreResult<Vec<Route>> {
        let rows = sqlx::query_as::<_, RouteRow>(
            "SELECT code, airline_code, start_date, end_date, created_at FROM routes WHERE airline_code = $1 ORDER BY code",
        )
        .bind(airline_code)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(Route::from).collect())
    }

    async fn list_route_details(&self, code: &str) -> CoreResult<Vec<RouteDetail>> {
        let sql = format!(
            "SELECT {} FROM route_details d JOIN route_sections s ON s.id = d.route_section_id WHERE d.route_code = $1",
            DETAIL_COLUMNS
        );
        let rows = sqlx::query_as::<_, RouteDetailRow>(&sql)
            .bind(code)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(RouteDetail::from).collect())
    }

    async fn list_all_route_details(&self) -> CoreResult<Vec<RouteDetail>> {
        let sql = format!(
            "SELECT {} FROM route_details d JOIN route_sections s ON s.id = d.route_section_id",
            DETAIL_COLUMNS
        );
        let rows = sqlx::query_as::<_, RouteDetailRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(rows.into_iter().map(RouteDetail::from).collect())
    }

    async fn route_codes_departing_from(&self, airport: &str) -> CoreResult<Vec<String>> {
        sqlx::query_scalar::<_, String>(
            r#"
            SELECT DISTINCT d.route_code
            FROM route_details d
            JOIN route_sections s ON s.id = d.route_section_id
            WHERE s.departure_airport = $1
            ORDER BY d.route_code
            "#,
        )
        .bind(airport)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)
    }

    async fn insert_route_pair(&self, pair: &NewRoutePair) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        for route in pair.routes() {
            insert_route(&mut *tx, route).await?;
        }

        tx.commit().await.map_err(db_error)?;
        info!(outbound = %pair.outbound.code, inbound = %pair.inbound.code, "Route pair persisted");
        Ok(())
    }
}
