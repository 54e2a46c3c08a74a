use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};

/// Static capacity attributes of an aircraft type
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AircraftModel {
    pub id: Uuid,
    pub name: String,
    pub max_economy_seats: i32,
    pub max_cabin_cols: i32,
}

/// A physical aircraft in an airline's fleet
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AircraftInstance {
    pub id: Uuid,
    pub airline_code: String,
    pub aircraft_model_id: Uuid,
    pub current_position: Option<String>,
    pub flying_towards: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeatClass {
    pub id: Uuid,
    pub name: String,
    pub code: String,
}

/// Rectangular seat grid owned by exactly one composition
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CellsBlock {
    pub id: Uuid,
    pub rows: i32,
    pub cols: i32,
    pub created_at: DateTime<Utc>,
}

/// One grid position. `x` is the column, `y` the row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cell {
    pub id: Uuid,
    pub cells_block_id: Uuid,
    pub x: i32,
    pub y: i32,
    pub is_seat: bool,
}

/// Binds a block and a seat class to an aircraft
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AircraftComposition {
    pub cells_block_id: Uuid,
    pub aircraft_instance_id: Uuid,
    pub seat_class_id: Uuid,
    /// Economy-equivalent seats one physical seat of this class costs
    pub proportion_economy_seat: f64,
}
