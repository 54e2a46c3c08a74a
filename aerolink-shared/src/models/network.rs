use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};

/// Airport looked up by its three-letter IATA code
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Airport {
    pub iata_code: String,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub city_id: Option<Uuid>,
}

/// Directed airport pair, shared by every route flying it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteSection {
    pub id: Uuid,
    pub departure_airport: String,
    pub arrival_airport: String,
}

/// One segment of a route.
///
/// Segments of the same route form a singly linked list through `next_id`.
/// The airports are denormalised from the referenced [`RouteSection`] so the
/// chain can be walked without a second lookup.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RouteDetail {
    pub id: Uuid,
    pub route_code: String,
    pub route_section_id: Uuid,
    pub departure_airport: String,
    pub arrival_airport: String,
    pub departure_time: NaiveTime,
    pub arrival_time: NaiveTime,
    pub next_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Route {
    pub code: String,
    pub airline_code: String,
    pub start_date: NaiveDate,
    /// Inclusive
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
}

impl Route {
    /// Whether `day` falls inside the validity window
    pub fn is_valid_on(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }
}
