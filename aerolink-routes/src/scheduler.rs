use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use aerolink_core::plan::{NewFlight, ScheduledPair};
use aerolink_core::repository::{FleetRepository, FlightRepository, RouteRepository};
use aerolink_core::{CoreError, CoreResult};
use aerolink_shared::models::{Flight, Route};

use crate::chain::RouteChain;
use crate::resolver::RouteGraphResolver;
use crate::reverse::ReverseRouteMatcher;

/// Departure days requested for one outbound/return rotation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DatePair {
    #[serde(alias = "outbound")]
    pub departure_date_outbound: NaiveDate,
    #[serde(alias = "return_")]
    pub departure_date_inbound: NaiveDate,
}

impl DatePair {
    pub fn new(departure_date_outbound: NaiveDate, departure_date_inbound: NaiveDate) -> Self {
        Self {
            departure_date_outbound,
            departure_date_inbound,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScheduleCreated {
    pub outbound_route: String,
    pub return_route: String,
    pub flights: Vec<Flight>,
}

/// Dated departure and arrival of one flight
fn fly(route: &Route, chain: &RouteChain, aircraft_instance_id: Uuid, day: NaiveDate) -> NewFlight {
    let departure = day.and_time(chain.first_departure_time());
    let arrival = departure + chain.total_duration();
    NewFlight {
        route_code: route.code.clone(),
        aircraft_instance_id,
        scheduled_departure_day: departure.date(),
        scheduled_arrival_day: arrival.date(),
    }
}

fn check_window(route: &Route, day: NaiveDate) -> CoreResult<()> {
    if route.is_valid_on(day) {
        Ok(())
    } else {
        Err(CoreError::ValidationError(format!(
            "Route {} is not operated on {} (valid {} to {})",
            route.code, day, route.start_date, route.end_date
        )))
    }
}

/// Creates dated outbound/return flights for a route pair
pub struct FlightScheduler {
    routes: Arc<dyn RouteRepository>,
    fleet: Arc<dyn FleetRepository>,
    flights: Arc<dyn FlightRepository>,
    resolver: RouteGraphResolver,
    matcher: ReverseRouteMatcher,
}

impl FlightScheduler {
    pub fn new(
        routes: Arc<dyn RouteRepository>,
        fleet: Arc<dyn FleetRepository>,
        flights: Arc<dyn FlightRepository>,
    ) -> Self {
        Self {
            resolver: RouteGraphResolver::new(routes.clone()),
            matcher: ReverseRouteMatcher::new(routes.clone()),
            routes,
            fleet,
            flights,
        }
    }

    async fn require_route(&self, code: &str) -> CoreResult<Route> {
        self.routes
            .get_route(code)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Route {} not found", code)))
    }

    pub async fn insert_flight_schedule(
        &self,
        route_code: &str,
        aircraft_instance_id: Uuid,
        date_pairs: &[DatePair],
    ) -> CoreResult<ScheduleCreated> {
        if date_pairs.is_empty() {
            return Err(CoreError::ValidationError("No date pairs to schedule".to_string()));
        }
        let mut seen = HashSet::with_capacity(date_pairs.len());
        for pair in date_pairs {
            if !seen.insert(*pair) {
                return Err(CoreError::ValidationError(format!(
                    "Duplicate date pair ({}, {})",
                    pair.departure_date_outbound, pair.departure_date_inbound
                )));
            }
        }

        let outbound_route = self.require_route(route_code).await?;
        let aircraft = self
            .fleet
            .get_aircraft_instance(aircraft_instance_id)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("Aircraft {} not found", aircraft_instance_id)))?;
        if aircraft.airline_code != outbound_route.airline_code {
            return Err(CoreError::ValidationError(format!(
                "Aircraft {} belongs to {}, route {} to {}",
                aircraft.id, aircraft.airline_code, outbound_route.code, outbound_route.airline_code
            )));
        }

        let return_code = self
            .matcher
            .find_reverse_route(route_code)
            .await?
            .ok_or_else(|| CoreError::NotFound(format!("No return route for {}", route_code)))?;
        let return_route = self.require_route(&return_code).await?;
        if return_route.airline_code != outbound_route.airline_code {
            return Err(CoreError::ValidationError(format!(
                "Return route {} belongs to {}, not {}",
                return_route.code, return_route.airline_code, outbound_route.airline_code
            )));
        }

        let outbound_chain = self.resolver.get_route(&outbound_route.code).await?;
        let return_chain = self.resolver.get_route(&return_route.code).await?;

        let mut staged: Vec<ScheduledPair> = Vec::with_capacity(date_pairs.len());
        // Departure and arrival days of every flight staged so far
        let mut staged_days: BTreeSet<NaiveDate> = BTreeSet::new();

        for pair in date_pairs {
            check_window(&outbound_route, pair.departure_date_outbound)?;
            check_window(&return_route, pair.departure_date_inbound)?;

            let outbound = fly(&outbound_route, &outbound_chain, aircraft.id, pair.departure_date_outbound);
            if outbound.scheduled_arrival_day != pair.departure_date_inbound {
                warn!(
                    route = %route_code,
                    expected = %outbound.scheduled_arrival_day,
                    given = %pair.departure_date_inbound,
                    "Inbound date does not match outbound arrival"
                );
                return Err(CoreError::ValidationError(format!(
                    "Inbound date for outbound {} must be {} (outbound arrival), got {}",
                    pair.departure_date_outbound, outbound.scheduled_arrival_day, pair.departure_date_inbound
                )));
            }
            let inbound = fly(&return_route, &return_chain, aircraft.id, pair.departure_date_inbound);
            let scheduled = ScheduledPair { outbound, inbound };

            let guarded = scheduled.guarded_days();
            if let Some(day) = guarded.iter().find(|d| staged_days.contains(*d)) {
                return Err(CoreError::Conflict(format!(
                    "Aircraft {} is scheduled twice on {} in this request",
                    aircraft.id, day
                )));
            }
            if let Some(day) = self.flights.first_busy_day(aircraft.id, &guarded).await? {
                warn!(aircraft = %aircraft.id, %day, "Aircraft already booked");
                return Err(CoreError::Conflict(format!(
                    "Aircraft {} already flies on {}",
                    aircraft.id, day
                )));
            }

            for flight in [&scheduled.outbound, &scheduled.inbound] {
                staged_days.insert(flight.scheduled_departure_day);
                staged_days.insert(flight.scheduled_arrival_day);
            }
            staged.push(scheduled);
        }

        let flights = self.flights.insert_flight_pairs(aircraft.id, &staged).await?;
        info!(
            route = %outbound_route.code,
            reverse = %return_route.code,
            aircraft = %aircraft.id,
            pairs = staged.len(),
            "Flight schedule created"
        );

        Ok(ScheduleCreated {
            outbound_route: outbound_route.code,
            return_route: return_route.code,
            flights,
        })
    }

    /// Distinct codes of the routes an aircraft flies, sorted
    pub async fn routes_assigned_to_aircraft(&self, aircraft_instance_id: Uuid) -> CoreResult<Vec<String>> {
        if self.fleet.get_aircraft_instance(aircraft_instance_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("Aircraft {} not found", aircraft_instance_id)));
        }

        let codes: BTreeSet<String> = self
            .flights
            .list_flights_for_aircraft(aircraft_instance_id)
            .await?
            .into_iter()
            .map(|f| f.route_code)
            .collect();
        Ok(codes.into_iter().collect())
    }
}
