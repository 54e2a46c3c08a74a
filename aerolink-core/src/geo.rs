//! Great-circle distance and the time-of-day arithmetic used to lay out
//! segment timetables.

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

const MINUTES_PER_DAY: i64 = 24 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Haversine distance in kilometers
pub fn distance(a: GeoPoint, b: GeoPoint) -> f64 {
    let lat_a = a.latitude.to_radians();
    let lat_b = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Deterministic block-time model: cruise time at a fixed average speed
/// plus a fixed taxi/climb/descent overhead, rounded to whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlightTimeModel {
    pub cruise_speed_kmh: f64,
    pub overhead_minutes: i64,
}

impl Default for FlightTimeModel {
    fn default() -> Self {
        Self {
            cruise_speed_kmh: 800.0,
            overhead_minutes: 30,
        }
    }
}

impl FlightTimeModel {
    pub fn new(cruise_speed_kmh: f64, overhead_minutes: i64) -> Self {
        Self { cruise_speed_kmh, overhead_minutes }
    }

    pub fn duration(&self, distance_km: f64) -> TimeDelta {
        let cruise_minutes = (distance_km.max(0.0) / self.cruise_speed_kmh * 60.0).round() as i64;
        TimeDelta::minutes(cruise_minutes + self.overhead_minutes)
    }
}

/// Adds `duration` to a time of day.
///
/// Returns the new time of day and whether the sum crossed midnight.
pub fn add_time_of_day(t: NaiveTime, duration: TimeDelta) -> (NaiveTime, bool) {
    let (time, wrapped_secs) = t.overflowing_add_signed(duration);
    (time, wrapped_secs != 0)
}

/// Elapsed time from `from` to `to`, rolling across midnight when `to` is earlier.
pub fn elapsed_between(from: NaiveTime, to: NaiveTime) -> TimeDelta {
    let delta = to - from;
    if delta < TimeDelta::zero() {
        delta + TimeDelta::minutes(MINUTES_PER_DAY)
    } else {
        delta
    }
}

/// Formats a duration as `HH:MM`; hours are not capped at 24.
pub fn format_hh_mm(duration: TimeDelta) -> String {
    let minutes = duration.num_minutes();
    format!("{:02}:{:02}", minutes / 60, minutes % 60)
}
