use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, warn};

use aerolink_core::repository::{AirportRepository, FlightRepository, RouteRepository};
use aerolink_core::{CoreError, CoreResult};
use aerolink_shared::models::{Flight, RouteDetail};

use crate::chain::RouteChain;

#[derive(Debug, Clone, Serialize)]
pub struct RoundTripResult {
    pub outbound_flights: Vec<Flight>,
    pub return_flights: Vec<Flight>,
}

/// Finds dated flights between two airports
pub struct FlightSearch {
    airports: Arc<dyn AirportRepository>,
    routes: Arc<dyn RouteRepository>,
    flights: Arc<dyn FlightRepository>,
}

impl FlightSearch {
    pub fn new(
        airports: Arc<dyn AirportRepository>,
        routes: Arc<dyn RouteRepository>,
        flights: Arc<dyn FlightRepository>,
    ) -> Self {
        Self {
            airports,
            routes,
            flights,
        }
    }

    async fn require_airport(&self, iata_code: &str) -> CoreResult<()> {
        match self.airports.get_airport(iata_code).await? {
            Some(_) => Ok(()),
            None => Err(CoreError::NotFound(format!("Airport {} not found", iata_code))),
        }
    }

    /// Codes of the routes flying from `departure` to `arrival`, sorted
    async fn matching_routes(&self, departure: &str, arrival: &str, direct_only: bool) -> CoreResult<Vec<String>> {
        let mut by_route: BTreeMap<String, Vec<RouteDetail>> = BTreeMap::new();
        for detail in self.routes.list_all_route_details().await? {
            by_route.entry(detail.route_code.clone()).or_default().push(detail);
        }

        let mut codes = Vec::new();
        for (code, details) in by_route {
            if direct_only && details.len() != 1 {
                continue;
            }
            let chain = RouteChain::from_details(&code, details)?;
            if chain.origin() == departure && chain.destination() == arrival {
                codes.push(code);
            }
        }
        Ok(codes)
    }

    pub async fn search_flights(
        &self,
        departure: &str,
        arrival: &str,
        date: NaiveDate,
        direct_only: bool,
    ) -> CoreResult<Vec<Flight>> {
        if departure == arrival {
            return Err(CoreError::ValidationError(format!(
                "Departure and arrival are both {}",
                departure
            )));
        }
        self.require_airport(departure).await?;
        self.require_airport(arrival).await?;

        let codes = self.matching_routes(departure, arrival, direct_only).await?;
        if codes.is_empty() {
            debug!(%departure, %arrival, "No route between airports");
            return Ok(Vec::new());
        }

        let flights = self.flights.list_flights_departing_on(&codes, date).await?;
        debug!(%departure, %arrival, %date, routes = codes.len(), flights = flights.len(), "Flight search");
        Ok(flights)
    }

    pub async fn search_round_trip(
        &self,
        departure: &str,
        arrival: &str,
        date: NaiveDate,
        return_date: NaiveDate,
        direct_only: bool,
    ) -> CoreResult<RoundTripResult> {
        if return_date <= date {
            warn!(%date, %return_date, "Return date not after outbound date");
            return Err(CoreError::ValidationError(format!(
                "Return date {} must be after departure date {}",
                return_date, date
            )));
        }

        Ok(RoundTripResult {
            outbound_flights: self.search_flights(departure, arrival, date, direct_only).await?,
            return_flights: self.search_flights(arrival, departure, return_date, direct_only).await?,
        })
    }
}
