use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::NaiveDate;

/// A dated instance of a route flown by one aircraft
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Flight {
    pub id: Uuid,
    pub route_code: String,
    pub aircraft_instance_id: Uuid,
    pub scheduled_departure_day: NaiveDate,
    pub scheduled_arrival_day: NaiveDate,
}

impl Flight {
    /// Whether this flight departs or lands on `day`
    pub fn touches(&self, day: NaiveDate) -> bool {
        self.scheduled_departure_day == day || self.scheduled_arrival_day == day
    }
}
