use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeDelta};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use aerolink_core::geo::{add_time_of_day, distance, FlightTimeModel, GeoPoint};
use aerolink_core::plan::{NewRoute, NewRouteDetail, NewRoutePair};
use aerolink_core::repository::{AirportRepository, RouteRepository};
use aerolink_core::{CoreError, CoreResult};

use crate::sections::{LegTiming, SectionSpec};

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Request to open a new outbound route and its paired return
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRouteRequest {
    pub airline_code: String,
    pub number: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub sections: SectionSpec,
    /// Ground time at the final destination before the return departs
    pub return_turnaround_minutes: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoutePairCreated {
    pub outbound_code: String,
    pub return_code: String,
}

/// One leg ready to be timetabled
#[derive(Debug, Clone)]
struct PlannedLeg {
    departure_airport: String,
    arrival_airport: String,
    flight_time: TimeDelta,
    /// Ground time before departure; `None` on the first leg
    wait_before: Option<TimeDelta>,
}

impl PlannedLeg {
    fn reversed(&self) -> Self {
        Self {
            departure_airport: self.arrival_airport.clone(),
            arrival_airport: self.departure_airport.clone(),
            flight_time: self.flight_time,
            wait_before: None,
        }
    }
}

/// Mirrors an outbound chain: legs in reverse order with airports swapped,
/// each layover reused at the same airport.
fn mirror(outbound: &[PlannedLeg]) -> Vec<PlannedLeg> {
    let n = outbound.len();
    (0..n)
        .map(|k| {
            let mut leg = outbound[n - 1 - k].reversed();
            if k > 0 {
                // Return leg k departs where outbound leg n-k waited.
                leg.wait_before = outbound[n - k].wait_before;
            }
            leg
        })
        .collect()
}

/// Assigns times of day to consecutive legs and links them head to tail.
fn timetable(legs: &[PlannedLeg], first_departure: NaiveTime) -> Vec<NewRouteDetail> {
    let mut details: Vec<NewRouteDetail> = Vec::with_capacity(legs.len());
    let mut day_offset = 0u32;

    for leg in legs {
        let departure_time = match (details.last(), leg.wait_before) {
            (Some(prev), Some(wait)) => {
                let (time, rolled) = add_time_of_day(prev.arrival_time, wait);
                day_offset += u32::from(rolled);
                time
            }
            (Some(prev), None) => prev.arrival_time,
            (None, _) => first_departure,
        };
        let (arrival_time, rolled) = add_time_of_day(departure_time, leg.flight_time);
        day_offset += u32::from(rolled);

        debug!(
            from = %leg.departure_airport,
            to = %leg.arrival_airport,
            %departure_time,
            %arrival_time,
            day_offset,
            "Timetabled leg"
        );

        details.push(NewRouteDetail {
            id: Uuid::new_v4(),
            departure_airport: leg.departure_airport.clone(),
            arrival_airport: leg.arrival_airport.clone(),
            departure_time,
            arrival_time,
            next_id: None,
        });
    }

    for i in 1..details.len() {
        let next_id = details[i].id;
        details[i - 1].next_id = Some(next_id);
    }
    details
}

/// Builds outbound/return route pairs from a nested section chain
pub struct RouteChainBuilder {
    airports: Arc<dyn AirportRepository>,
    routes: Arc<dyn RouteRepository>,
    time_model: FlightTimeModel,
    min_waiting_minutes: u32,
}

impl RouteChainBuilder {
    pub fn new(
        airports: Arc<dyn AirportRepository>,
        routes: Arc<dyn RouteRepository>,
        time_model: FlightTimeModel,
        min_waiting_minutes: u32,
    ) -> Self {
        Self {
            airports,
            routes,
            time_model,
            min_waiting_minutes,
        }
    }

    async fn code_is_free(&self, code: &str) -> CoreResult<bool> {
        Ok(self.routes.get_route(code).await?.is_none())
    }

    /// Picks `number + 1`, else `number - 1`, whichever is free first.
    async fn return_code(&self, airline_code: &str, number: u32) -> CoreResult<String> {
        let candidates = [number.checked_add(1), number.checked_sub(1)];
        for candidate in candidates.into_iter().flatten() {
            let code = format!("{}{}", airline_code, candidate);
            if self.code_is_free(&code).await? {
                return Ok(code);
            }
        }
        Err(CoreError::Conflict(format!(
            "Return slot busy: neither neighbour of {}{} is free",
            airline_code, number
        )))
    }

    async fn locate(&self, cache: &mut HashMap<String, GeoPoint>, iata_code: &str) -> CoreResult<GeoPoint> {
        if let Some(point) = cache.get(iata_code) {
            return Ok(*point);
        }
        let airport = self
            .airports
            .get_airport(iata_code)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Airport {} not found", iata_code)))?;
        let point = GeoPoint::new(airport.latitude, airport.longitude);
        cache.insert(iata_code.to_string(), point);
        Ok(point)
    }

    pub async fn insert_new_route(&self, request: &NewRouteRequest) -> CoreResult<RoutePairCreated> {
        if request.start_date > request.end_date {
            return Err(CoreError::ValidationError(format!(
                "Start date {} is after end date {}",
                request.start_date, request.end_date
            )));
        }
        if request.return_turnaround_minutes == 0 || request.return_turnaround_minutes >= MINUTES_PER_DAY {
            return Err(CoreError::ValidationError(format!(
                "Return turnaround {} min must be between 1 and {} minutes",
                request.return_turnaround_minutes,
                MINUTES_PER_DAY - 1
            )));
        }

        let legs = request.sections.legs(self.min_waiting_minutes)?;

        let outbound_code = format!("{}{}", request.airline_code, request.number);
        if !self.code_is_free(&outbound_code).await? {
            warn!(code = %outbound_code, "Route code already taken");
            return Err(CoreError::Conflict(format!("Route {} already exists", outbound_code)));
        }
        let return_code = self.return_code(&request.airline_code, request.number).await?;

        let mut locations = HashMap::new();
        let mut outbound_legs = Vec::with_capacity(legs.len());
        let mut first_departure = None;

        for leg in &legs {
            let from = self.locate(&mut locations, &leg.departure_airport).await?;
            let to = self.locate(&mut locations, &leg.arrival_airport).await?;
            let km = distance(from, to);
            let flight_time = self.time_model.duration(km);
            // Times of day cannot carry a leg of a day or more.
            if flight_time >= TimeDelta::days(1) {
                warn!(from = %leg.departure_airport, to = %leg.arrival_airport, km, "Leg too long");
                return Err(CoreError::ValidationError(format!(
                    "Segment {} -> {} takes {} min, legs must be shorter than a day",
                    leg.departure_airport,
                    leg.arrival_airport,
                    flight_time.num_minutes()
                )));
            }

            let wait_before = match leg.timing {
                LegTiming::Departs(time) => {
                    first_departure = Some(time);
                    None
                }
                LegTiming::WaitsFor(wait) => Some(wait),
            };

            outbound_legs.push(PlannedLeg {
                departure_airport: leg.departure_airport.clone(),
                arrival_airport: leg.arrival_airport.clone(),
                flight_time,
                wait_before,
            });
        }

        let first_departure = first_departure.ok_or_else(|| {
            CoreError::ValidationError("First segment must have a departure time".to_string())
        })?;
        let outbound_details = timetable(&outbound_legs, first_departure);

        let final_arrival = outbound_details
            .last()
            .map(|d| d.arrival_time)
            .unwrap_or(first_departure);
        let turnaround = TimeDelta::minutes(i64::from(request.return_turnaround_minutes));
        let (return_departure, _) = add_time_of_day(final_arrival, turnaround);
        let return_details = timetable(&mirror(&outbound_legs), return_departure);

        let pair = NewRoutePair {
            outbound: NewRoute {
                code: outbound_code.clone(),
                airline_code: request.airline_code.clone(),
                start_date: request.start_date,
                end_date: request.end_date,
                details: outbound_details,
            },
            inbound: NewRoute {
                code: return_code.clone(),
                airline_code: request.airline_code.clone(),
                start_date: request.start_date,
                end_date: request.end_date,
                details: return_details,
            },
        };
        self.routes.insert_route_pair(&pair).await?;

        info!(
            outbound = %outbound_code,
            inbound = %return_code,
            segments = legs.len(),
            "Created route pair"
        );

        Ok(RoutePairCreated {
            outbound_code,
            return_code,
        })
    }
}
