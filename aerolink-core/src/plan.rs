//! Fully validated write sets handed to a repository.
//!
//! Services build one of these after every domain check has passed; the
//! repository then persists it inside a single transaction.

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRouteDetail {
    pub id: Uuid,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub next_id: Option<Uuid>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoute {
    pub code: String,
    pub airline_code: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Head first; each detail's `next_id` points at its successor.
    pub details: Vec<NewRouteDetail>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRoutePair {
    pub outbound: NewRoute,
    pub inbound: NewRoute,
}

impl NewRoutePair {
    pub fn routes(&self) -> [&NewRoute; 2] {
        [&self.outbound, &self.inbound]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCell {
    pub x: i32,
    pub y: i32,
    pub is_seat: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSeatBlock {
    pub aircraft_instance_id: Uuid,
    pub seat_class_id: Uuid,
    pub proportion_economy_seat: f64,
    pub rows: i32,
    pub cols: i32,
    pub cells: Vec<NewCell>,
}

/// Absorbs float noise when economy-equivalent sums are compared to a limit.
pub const CAPACITY_TOLERANCE: f64 = 1e-9;

/// Whether `value` goes past `limit`; reaching it exactly is allowed.
pub fn exceeds(value: f64, limit: i32) -> bool {
    value > f64::from(limit) + CAPACITY_TOLERANCE
}

impl NewSeatBlock {
    /// Seat count weighted by the block's economy proportion
    pub fn economy_seats(&self) -> f64 {
        self.cells.iter().filter(|c| c.is_seat).count() as f64 * self.proportion_economy_seat
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewFlight {
    pub route_code: String,
    pub aircraft_instance_id: Uuid,
    pub scheduled_departure_day: NaiveDate,
    pub scheduled_arrival_day: NaiveDate,
}

/// Outbound and return flights of one requested date pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledPair {
    pub outbound: NewFlight,
    pub inbound: NewFlight,
}

impl ScheduledPair {
    /// Days on which the aircraft must have no other flight.
    pub fn guarded_days(&self) -> [NaiveDate; 2] {
        [
            self.outbound.scheduled_departure_day,
            self.inbound.scheduled_departure_day,
        ]
    }
}
