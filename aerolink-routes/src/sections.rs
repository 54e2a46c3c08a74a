//! Nested section chain submitted when a route is created.

use chrono::{NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};

use aerolink_core::{CoreError, CoreResult};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// One node of a nested section chain.
///
/// The head carries the departure time of the whole route; every chained
/// node carries the minimum ground time before it departs instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSpec {
    pub departure_airport: String,
    pub arrival_airport: String,
    #[serde(default, with = "time_of_day")]
    pub departure_time: Option<NaiveTime>,
    /// Minutes
    #[serde(default)]
    pub waiting_time: Option<u32>,
    #[serde(default)]
    pub next_session: Option<Box<SectionSpec>>,
}

impl Drop for SectionSpec {
    // Unlink iteratively so long chains do not recurse on drop.
    fn drop(&mut self) {
        let mut next = self.next_session.take();
        while let Some(mut node) = next {
            next = node.next_session.take();
        }
    }
}

/// When a leg leaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegTiming {
    /// First leg: fixed time of day
    Departs(NaiveTime),
    /// Chained leg: ground time after the previous arrival
    WaitsFor(TimeDelta),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegSpec {
    pub departure_airport: String,
    pub arrival_airport: String,
    pub timing: LegTiming,
}

impl SectionSpec {
    /// Builds a chain from its head and the chained legs as
    /// `(departure, arrival, waiting minutes)`, in flying order.
    pub fn chain(
        departure_airport: &str,
        arrival_airport: &str,
        departure_time: NaiveTime,
        chained: &[(&str, &str, u32)],
    ) -> Self {
        let mut next: Option<Box<SectionSpec>> = None;
        for (from, to, waiting) in chained.iter().rev() {
            next = Some(Box::new(Self {
                departure_airport: from.to_string(),
                arrival_airport: to.to_string(),
                departure_time: None,
                waiting_time: Some(*waiting),
                next_session: next,
            }));
        }

        Self {
            departure_airport: departure_airport.to_string(),
            arrival_airport: arrival_airport.to_string(),
            departure_time: Some(departure_time),
            waiting_time: None,
            next_session: next,
        }
    }

    /// Flattens and validates the chain, head first.
    pub fn legs(&self, min_waiting_minutes: u32) -> CoreResult<Vec<LegSpec>> {
        let mut legs: Vec<LegSpec> = Vec::new();
        let mut cursor = Some(self);

        while let Some(node) = cursor {
            let position = legs.len() + 1;

            if node.departure_airport == node.arrival_airport {
                return Err(CoreError::ValidationError(format!(
                    "Segment {} departs from and arrives at {}",
                    position, node.departure_airport
                )));
            }

            let timing = match legs.last() {
                None => LegTiming::Departs(node.departure_time.ok_or_else(|| {
                    CoreError::ValidationError("First segment must have a departure time".to_string())
                })?),
                Some(previous) => {
                    if previous.arrival_airport != node.departure_airport {
                        return Err(CoreError::ValidationError(format!(
                            "Segment {} departs from {} but the previous segment arrives at {}",
                            position, node.departure_airport, previous.arrival_airport
                        )));
                    }
                    let minutes = node.waiting_time.ok_or_else(|| {
                        CoreError::ValidationError(format!("Segment {} must have a waiting time", position))
                    })?;
                    if minutes < min_waiting_minutes || minutes >= MINUTES_PER_DAY {
                        return Err(CoreError::ValidationError(format!(
                            "Segment {} waiting time {} min must be between {} and {} minutes",
                            position,
                            minutes,
                            min_waiting_minutes,
                            MINUTES_PER_DAY - 1
                        )));
                    }
                    LegTiming::WaitsFor(TimeDelta::minutes(i64::from(minutes)))
                }
            };

            legs.push(LegSpec {
                departure_airport: node.departure_airport.clone(),
                arrival_airport: node.arrival_airport.clone(),
                timing,
            });
            cursor = node.next_session.as_deref();
        }

        Ok(legs)
    }
}

/// Accepts `HH:MM` as well as `HH:MM:SS`; writes `HH:MM`.
mod time_of_day {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<NaiveTime>, serializer: S) -> Result<S::Ok, S::Error> {
        match value {
            Some(t) => serializer.serialize_some(&t.format("%H:%M").to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<NaiveTime>, D::Error> {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        raw.map(|s| {
            NaiveTime::parse_from_str(&s, "%H:%M")
                .or_else(|_| NaiveTime::parse_from_str(&s, "%H:%M:%S"))
                .map_err(|_| serde::de::Error::custom(format!("invalid time of day: {}", s)))
        })
        .transpose()
    }
}
