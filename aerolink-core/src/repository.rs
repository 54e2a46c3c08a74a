use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;
use aerolink_shared::models::{
    AircraftComposition, AircraftInstance, AircraftModel, Airport, Cell, CellsBlock, Flight, Route,
    RouteDetail, SeatClass,
};

use crate::plan::{NewRoutePair, NewSeatBlock, ScheduledPair};
use crate::CoreResult;

/// A persisted block together with its cells and its composition row
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedBlock {
    pub block: CellsBlock,
    pub cells: Vec<Cell>,
    pub composition: AircraftComposition,
    pub seat_class: SeatClass,
}

/// Repository trait for airport lookups
#[async_trait]
pub trait AirportRepository: Send + Sync {
    async fn get_airport(&self, iata_code: &str) -> CoreResult<Option<Airport>>;
}

/// Repository trait for route and segment data access
#[async_trait]
pub trait RouteRepository: Send + Sync {
    async fn get_route(&self, code: &str) -> CoreResult<Option<Route>>;

    async fn list_routes_by_airline(&self, airline_code: &str) -> CoreResult<Vec<Route>>;

    /// All segments of one route, in no particular order.
    async fn list_route_details(&self, code: &str) -> CoreResult<Vec<RouteDetail>>;

    /// Every segment of every route, in no particular order.
    async fn list_all_route_details(&self) -> CoreResult<Vec<RouteDetail>>;

    /// Codes of routes owning at least one segment that departs from `airport`, sorted.
    async fn route_codes_departing_from(&self, airport: &str) -> CoreResult<Vec<String>>;

    /// Persists both routes, resolving or creating their sections, atomically.
    /// Fails with `Conflict` if either code is already taken.
    async fn insert_route_pair(&self, pair: &NewRoutePair) -> CoreResult<()>;
}

/// Repository trait for aircraft and seat layout data access
#[async_trait]
pub trait FleetRepository: Send + Sync {
    async fn get_aircraft_instance(&self, id: Uuid) -> CoreResult<Option<AircraftInstance>>;

    async fn get_aircraft_model_for_instance(&self, aircraft_instance_id: Uuid) -> CoreResult<Option<AircraftModel>>;

    async fn get_seat_class(&self, id: Uuid) -> CoreResult<Option<SeatClass>>;

    /// Sum over the aircraft's compositions of seat count times proportion.
    async fn composed_economy_seats(&self, aircraft_instance_id: Uuid) -> CoreResult<f64>;

    /// Blocks composed onto an aircraft, oldest first.
    async fn list_composed_blocks(&self, aircraft_instance_id: Uuid) -> CoreResult<Vec<ComposedBlock>>;

    /// Persists block, cells and composition atomically; returns the new block id.
    /// The aircraft's economy capacity is re-checked under a per-aircraft lock;
    /// a block that no longer fits fails with `ValidationError`.
    async fn insert_seat_block(&self, block: &NewSeatBlock) -> CoreResult<Uuid>;

    /// Deletes every composition (with blocks and cells) of `aircraft_instance_id`
    /// and persists `blocks` in its place, atomically. Returns the new block ids.
    async fn replace_seat_map(&self, aircraft_instance_id: Uuid, blocks: &[NewSeatBlock]) -> CoreResult<Vec<Uuid>>;
}

/// Repository trait for dated flight data access
#[async_trait]
pub trait FlightRepository: Send + Sync {
    /// First of `days` on which the aircraft already departs or lands, if any.
    async fn first_busy_day(&self, aircraft_instance_id: Uuid, days: &[NaiveDate]) -> CoreResult<Option<NaiveDate>>;

    /// Persists every pair atomically. The availability of each pair's guarded
    /// days is re-checked under a per-aircraft lock; a busy day fails the whole
    /// batch with `Conflict`.
    async fn insert_flight_pairs(&self, aircraft_instance_id: Uuid, pairs: &[ScheduledPair]) -> CoreResult<Vec<Flight>>;

    async fn list_flights_for_aircraft(&self, aircraft_instance_id: Uuid) -> CoreResult<Vec<Flight>>;

    async fn list_flights_departing_on(&self, route_codes: &[String], day: NaiveDate) -> CoreResult<Vec<Flight>>;
}
