use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgExecutor, PgPool};
use tracing::info;
use uuid::Uuid;

use aerolink_core::plan::{exceeds, NewSeatBlock};
use aerolink_core::repository::{ComposedBlock, FleetRepository};
use aerolink_core::{CoreError, CoreResult};
use aerolink_shared::models::{
    AircraftComposition, AircraftInstance, AircraftModel, Cell, CellsBlock, SeatClass,
};

use crate::db_error;

pub struct PostgresFleetRepository {
    pool: PgPool,
}

impl PostgresFleetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct AircraftInstanceRow {
    id: Uuid,
    airline_code: String,
    aircraft_model_id: Uuid,
    current_position: Option<String>,
    flying_towards: Option<String>,
}

#[derive(sqlx::FromRow)]
struct AircraftModelRow {
    id: Uuid,
    name: String,
    max_economy_seats: i32,
    max_cabin_cols: i32,
}

#[derive(sqlx::FromRow)]
struct SeatClassRow {
    id: Uuid,
    name: String,
    code: String,
}

#[derive(sqlx::FromRow)]
struct ComposedBlockRow {
    block_id: Uuid,
    rows: i32,
    cols: i32,
    created_at: DateTime<Utc>,
    seat_class_id: Uuid,
    class_name: String,
    class_code: String,
    proportion_economy_seat: f64,
}

#[derive(sqlx::FromRow)]
struct CellRow {
    id: Uuid,
    cells_block_id: Uuid,
    x: i32,
    y: i32,
    is_seat: bool,
}

async fn composed_seats<'e>(executor: impl PgExecutor<'e>, aircraft_instance_id: Uuid) -> CoreResult<f64> {
    sqlx::query_scalar::<_, f64>(
        r#"
        SELECT COALESCE(SUM(c.proportion_economy_seat * s.seats), 0)::FLOAT8
        FROM aircraft_compositions c
        JOIN (
            SELECT cells_block_id, COUNT(*) FILTER (WHERE is_seat) AS seats
            FROM cells
            GROUP BY cells_block_id
        ) s ON s.cells_block_id = c.cells_block_id
        WHERE c.aircraft_instance_id = $1
        "#,
    )
    .bind(aircraft_instance_id)
    .fetch_one(executor)
    .await
    .map_err(db_error)
}

async fn insert_block(conn: &mut PgConnection, block: &NewSeatBlock) -> CoreResult<Uuid> {
    let block_id = Uuid::new_v4();

    sqlx::query("INSERT INTO cells_blocks (id, rows, cols) VALUES ($1, $2, $3)")
        .bind(block_id)
        .bind(block.rows)
        .bind(block.cols)
        .execute(&mut *conn)
        .await
        .map_err(db_error)?;

    let ids: Vec<Uuid> = block.cells.iter().map(|_| Uuid::new_v4()).collect();
    let xs: Vec<i32> = block.cells.iter().map(|c| c.x).collect();
    let ys: Vec<i32> = block.cells.iter().map(|c| c.y).collect();
    let seats: Vec<bool> = block.cells.iter().map(|c| c.is_seat).collect();

    sqlx::query(
        r#"
        INSERT INTO cells (id, cells_block_id, x, y, is_seat)
        SELECT id, $2, x, y, is_seat
        FROM UNNEST($1::uuid[], $3::int4[], $4::int4[], $5::bool[]) AS t(id, x, y, is_seat)
        "#,
    )
    .bind(ids)
    .bind(block_id)
    .bind(xs)
    .bind(ys)
    .bind(seats)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    sqlx::query(
        r#"
        INSERT INTO aircraft_compositions (cells_block_id, aircraft_instance_id, seat_class_id, proportion_economy_seat)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(block_id)
    .bind(block.aircraft_instance_id)
    .bind(block.seat_class_id)
    .bind(block.proportion_economy_seat)
    .execute(&mut *conn)
    .await
    .map_err(db_error)?;

    Ok(block_id)
}

#[async_trait]
impl FleetRepository for PostgresFleetRepository {
    async fn get_aircraft_instance(&self, id: Uuid) -> CoreResult<Option<AircraftInstance>> {
        let row = sqlx::query_as::<_, AircraftInstanceRow>(
            r#"
            SELECT id, airline_code, aircraft_model_id, current_position, flying_towards
            FROM aircraft_instances WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| AircraftInstance {
            id: r.id,
            airline_code: r.airline_code,
            aircraft_model_id: r.aircraft_model_id,
            current_position: r.current_position,
            flying_towards: r.flying_towards,
        }))
    }

    async fn get_aircraft_model_for_instance(&self, aircraft_instance_id: Uuid) -> CoreResult<Option<AircraftModel>> {
        let row = sqlx::query_as::<_, AircraftModelRow>(
            r#"
            SELECT m.id, m.name, m.max_economy_seats, m.max_cabin_cols
            FROM aircraft_models m
            JOIN aircraft_instances a ON a.aircraft_model_id = m.id
            WHERE a.id = $1
            "#,
        )
        .bind(aircraft_instance_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(row.map(|r| AircraftModel {
            id: r.id,
            name: r.name,
            max_economy_seats: r.max_economy_seats,
            max_cabin_cols: r.max_cabin_cols,
        }))
    }

    async fn get_seat_class(&self, id: Uuid) -> CoreResult<Option<SeatClass>> {
        let row = sqlx::query_as::<_, SeatClassRow>("SELECT id, name, code FROM seat_classes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)?;

        Ok(row.map(|r| SeatClass {
            id: r.id,
            name: r.name,
            code: r.code,
        }))
    }

    async fn composed_economy_seats(&self, aircraft_instance_id: Uuid) -> CoreResult<f64> {
        composed_seats(&self.pool, aircraft_instance_id).await
    }

    async fn list_composed_blocks(&self, aircraft_instance_id: Uuid) -> CoreResult<Vec<ComposedBlock>> {
        let blocks = sqlx::query_as::<_, ComposedBlockRow>(
            r#"
            SELECT b.id AS block_id, b.rows, b.cols, b.created_at,
                   k.id AS seat_class_id, k.name AS class_name, k.code AS class_code,
                   c.proportion_economy_seat
            FROM aircraft_compositions c
            JOIN cells_blocks b ON b.id = c.cells_block_id
            JOIN seat_classes k ON k.id = c.seat_class_id
            WHERE c.aircraft_instance_id = $1
            ORDER BY b.created_at, b.id
            "#,
        )
        .bind(aircraft_instance_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let block_ids: Vec<Uuid> = blocks.iter().map(|b| b.block_id).collect();
        let cell_rows = sqlx::query_as::<_, CellRow>(
            "SELECT id, cells_block_id, x, y, is_seat FROM cells WHERE cells_block_id = ANY($1) ORDER BY y, x",
        )
        .bind(block_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(db_error)?;

        let mut cells_by_block: HashMap<Uuid, Vec<Cell>> = HashMap::new();
        for row in cell_rows {
            cells_by_block.entry(row.cells_block_id).or_default().push(Cell {
                id: row.id,
                cells_block_id: row.cells_block_id,
                x: row.x,
                y: row.y,
                is_seat: row.is_seat,
            });
        }

        Ok(blocks
            .into_iter()
            .map(|b| ComposedBlock {
                cells: cells_by_block.remove(&b.block_id).unwrap_or_default(),
                composition: AircraftComposition {
                    cells_block_id: b.block_id,
                    aircraft_instance_id,
                    seat_class_id: b.seat_class_id,
                    proportion_economy_seat: b.proportion_economy_seat,
                },
                seat_class: SeatClass {
                    id: b.seat_class_id,
                    name: b.class_name,
                    code: b.class_code,
                },
                block: CellsBlock {
                    id: b.block_id,
                    rows: b.rows,
                    cols: b.cols,
                    created_at: b.created_at,
                },
            })
            .collect())
    }

    async fn insert_seat_block(&self, block: &NewSeatBlock) -> CoreResult<Uuid> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Concurrent blocks for the same aircraft queue on this lock.
        let (max_economy_seats, model_name) = sqlx::query_as::<_, (i32, String)>(
            r#"
            SELECT m.max_economy_seats, m.name
            FROM aircraft_instances a
            JOIN aircraft_models m ON m.id = a.aircraft_model_id
            WHERE a.id = $1
            FOR UPDATE OF a
            "#,
        )
        .bind(block.aircraft_instance_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_error)?
        .ok_or_else(|| CoreError::NotFound(format!("Aircraft {} not found", block.aircraft_instance_id)))?;

        let composed = composed_seats(&mut *tx, block.aircraft_instance_id).await?;
        if exceeds(composed + block.economy_seats(), max_economy_seats) {
            return Err(CoreError::ValidationError(format!(
                "{} economy seats requested on top of {} exceed the {} allowed on {}",
                block.economy_seats(),
                composed,
                max_economy_seats,
                model_name
            )));
        }

        let block_id = insert_block(&mut *tx, block).await?;
        tx.commit().await.map_err(db_error)?;

        info!(%block_id, aircraft = %block.aircraft_instance_id, cells = block.cells.len(), "Seat block persisted");
        Ok(block_id)
    }

    async fn replace_seat_map(&self, aircraft_instance_id: Uuid, blocks: &[NewSeatBlock]) -> CoreResult<Vec<Uuid>> {
        let mut tx = self.pool.begin().await.map_err(db_error)?;

        // Serialises concurrent rewrites of the same aircraft.
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM aircraft_instances WHERE id = $1 FOR UPDATE")
            .bind(aircraft_instance_id)
            .fetch_optional(&mut *tx)
            .await
            .map_err(db_error)?
            .ok_or_else(|| CoreError::NotFound(format!("Aircraft {} not found", aircraft_instance_id)))?;

        // Cells and composition rows go with their block.
        let removed = sqlx::query(
            r#"
            DELETE FROM cells_blocks
            WHERE id IN (SELECT cells_block_id FROM aircraft_compositions WHERE aircraft_instance_id = $1)
            "#,
        )
        .bind(aircraft_instance_id)
        .execute(&mut *tx)
        .await
        .map_err(db_error)?
        .rows_affected();

        let mut created = Vec::with_capacity(blocks.len());
        for block in blocks {
            created.push(insert_block(&mut *tx, block).await?);
        }

        tx.commit().await.map_err(db_error)?;
        info!(aircraft = %aircraft_instance_id, removed, created = created.len(), "Seat map replaced");
        Ok(created)
    }
}
