use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use aerolink_core::plan::{exceeds, NewRoute, NewRoutePair, NewSeatBlock, ScheduledPair};
use aerolink_core::repository::{
    AirportRepository, ComposedBlock, FleetRepository, FlightRepository, RouteRepository,
};
use aerolink_core::{CoreError, CoreResult};
use aerolink_shared::models::{
    AircraftComposition, AircraftInstance, AircraftModel, Airport, Cell, CellsBlock, Flight, Route,
    RouteDetail, RouteSection, SeatClass,
};

#[derive(Debug, Clone, Default)]
struct Tables {
    airports: BTreeMap<String, Airport>,
    sections: Vec<RouteSection>,
    routes: BTreeMap<String, Route>,
    details: Vec<RouteDetail>,
    aircraft_models: HashMap<Uuid, AircraftModel>,
    aircraft: HashMap<Uuid, AircraftInstance>,
    seat_classes: HashMap<Uuid, SeatClass>,
    // Insertion order doubles as creation order.
    blocks: Vec<CellsBlock>,
    cells: Vec<Cell>,
    compositions: Vec<AircraftComposition>,
    flights: Vec<Flight>,
}

impl Tables {
    fn busy_day(&self, aircraft_instance_id: Uuid, days: &[NaiveDate]) -> Option<NaiveDate> {
        days.iter().copied().find(|day| {
            self.flights
                .iter()
                .any(|f| f.aircraft_instance_id == aircraft_instance_id && f.touches(*day))
        })
    }

    fn seat_count(&self, block_id: Uuid) -> usize {
        self.cells
            .iter()
            .filter(|c| c.cells_block_id == block_id && c.is_seat)
            .count()
    }

    fn composed_economy_seats(&self, aircraft_instance_id: Uuid) -> f64 {
        self.compositions
            .iter()
            .filter(|c| c.aircraft_instance_id == aircraft_instance_id)
            .fold(0.0, |sum, c| sum + self.seat_count(c.cells_block_id) as f64 * c.proportion_economy_seat)
    }

    fn check_capacity(&self, block: &NewSeatBlock) -> CoreResult<()> {
        let model = self
            .aircraft
            .get(&block.aircraft_instance_id)
            .and_then(|a| self.aircraft_models.get(&a.aircraft_model_id))
            .ok_or_else(|| {
                CoreError::NotFound(format!("Aircraft {} not found", block.aircraft_instance_id))
            })?;

        let composed = self.composed_economy_seats(block.aircraft_instance_id);
        if exceeds(composed + block.economy_seats(), model.max_economy_seats) {
            return Err(CoreError::ValidationError(format!(
                "{} economy seats requested on top of {} exceed the {} allowed on {}",
                block.economy_seats(),
                composed,
                model.max_economy_seats,
                model.name
            )));
        }
        Ok(())
    }
}

/// Row counts, used to assert that failed writes left nothing behind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RowCounts {
    pub sections: usize,
    pub routes: usize,
    pub details: usize,
    pub blocks: usize,
    pub cells: usize,
    pub compositions: usize,
    pub flights: usize,
}

/// Working copy of the tables for one write. Changes become visible only
/// when the closure passed to [`MemoryStore::transaction`] returns `Ok`.
struct Tx {
    tables: Tables,
    writes: usize,
    fail_at: Option<usize>,
}

impl Tx {
    fn write(&mut self) -> CoreResult<()> {
        self.writes += 1;
        if self.fail_at == Some(self.writes) {
            return Err(CoreError::InternalError(format!(
                "injected failure on row write {}",
                self.writes
            )));
        }
        Ok(())
    }

    fn resolve_section(&mut self, departure: &str, arrival: &str) -> CoreResult<RouteSection> {
        if let Some(section) = self
            .tables
            .sections
            .iter()
            .find(|s| s.departure_airport == departure && s.arrival_airport == arrival)
        {
            return Ok(section.clone());
        }

        for code in [departure, arrival] {
            if !self.tables.airports.contains_key(code) {
                return Err(CoreError::NotFound(format!("Airport {} not found", code)));
            }
        }

        self.write()?;
        let section = RouteSection {
            id: Uuid::new_v4(),
            departure_airport: departure.to_string(),
            arrival_airport: arrival.to_string(),
        };
        self.tables.sections.push(section.clone());
        Ok(section)
    }

    fn insert_route(&mut self, route: &NewRoute) -> CoreResult<()> {
        if self.tables.routes.contains_key(&route.code) {
            return Err(CoreError::Conflict(format!("Route {} already exists", route.code)));
        }

        self.write()?;
        self.tables.routes.insert(
            route.code.clone(),
            Route {
                code: route.code.clone(),
                airline_code: route.airline_code.clone(),
                start_date: route.start_date,
                end_date: route.end_date,
                created_at: Utc::now(),
            },
        );

        for detail in &route.details {
            let section = self.resolve_section(&detail.departure_airport, &detail.arrival_airport)?;
            self.write()?;
            self.tables.details.push(RouteDetail {
                id: detail.id,
                route_code: route.code.clone(),
                route_section_id: section.id,
                departure_airport: section.departure_airport,
                arrival_airport: section.arrival_airport,
                departure_time: detail.departure_time,
                arrival_time: detail.arrival_time,
                next_id: detail.next_id,
            });
        }
        Ok(())
    }

    fn insert_block(&mut self, block: &NewSeatBlock) -> CoreResult<Uuid> {
        if !self.tables.aircraft.contains_key(&block.aircraft_instance_id) {
            return Err(CoreError::NotFound(format!(
                "Aircraft {} not found",
                block.aircraft_instance_id
            )));
        }
        if !self.tables.seat_classes.contains_key(&block.seat_class_id) {
            return Err(CoreError::NotFound(format!("Seat class {} not found", block.seat_class_id)));
        }

        let block_id = Uuid::new_v4();
        self.write()?;
        self.tables.blocks.push(CellsBlock {
            id: block_id,
            rows: block.rows,
            cols: block.cols,
            created_at: Utc::now(),
        });

        for cell in &block.cells {
            self.write()?;
            self.tables.cells.push(Cell {
                id: Uuid::new_v4(),
                cells_block_id: block_id,
                x: cell.x,
                y: cell.y,
                is_seat: cell.is_seat,
            });
        }

        self.write()?;
        self.tables.compositions.push(AircraftComposition {
            cells_block_id: block_id,
            aircraft_instance_id: block.aircraft_instance_id,
            seat_class_id: block.seat_class_id,
            proportion_economy_seat: block.proportion_economy_seat,
        });
        Ok(block_id)
    }

    fn delete_seat_map(&mut self, aircraft_instance_id: Uuid) -> CoreResult<usize> {
        let owned: BTreeSet<Uuid> = self
            .tables
            .compositions
            .iter()
            .filter(|c| c.aircraft_instance_id == aircraft_instance_id)
            .map(|c| c.cells_block_id)
            .collect();

        if !owned.is_empty() {
            self.write()?;
        }
        self.tables.compositions.retain(|c| !owned.contains(&c.cells_block_id));
        self.tables.cells.retain(|c| !owned.contains(&c.cells_block_id));
        self.tables.blocks.retain(|b| !owned.contains(&b.id));
        Ok(owned.len())
    }
}

/// In-memory backend for tests and local development.
///
/// All tables sit behind one async mutex, so writes are serialised. Each write
/// runs against a copy of the tables that replaces the live state only on
/// success.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    // 1-based row write index to fail in the next transaction; 0 = off
    fail_at: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next transaction fail on its `nth` row write (1-based).
    pub fn fail_on_write(&self, nth: usize) {
        self.fail_at.store(nth, Ordering::SeqCst);
    }

    async fn transaction<T>(&self, f: impl FnOnce(&mut Tx) -> CoreResult<T>) -> CoreResult<T> {
        let mut live = self.tables.lock().await;
        let fail_at = match self.fail_at.swap(0, Ordering::SeqCst) {
            0 => None,
            n => Some(n),
        };

        let mut tx = Tx {
            tables: live.clone(),
            writes: 0,
            fail_at,
        };
        match f(&mut tx) {
            Ok(out) => {
                debug!(writes = tx.writes, "Memory transaction committed");
                *live = tx.tables;
                Ok(out)
            }
            Err(e) => {
                debug!(writes = tx.writes, error = %e, "Memory transaction rolled back");
                Err(e)
            }
        }
    }

    pub async fn add_airport(&self, airport: Airport) {
        self.tables.lock().await.airports.insert(airport.iata_code.clone(), airport);
    }

    pub async fn add_aircraft_model(&self, model: AircraftModel) {
        self.tables.lock().await.aircraft_models.insert(model.id, model);
    }

    pub async fn add_aircraft_instance(&self, aircraft: AircraftInstance) {
        self.tables.lock().await.aircraft.insert(aircraft.id, aircraft);
    }

    pub async fn add_seat_class(&self, seat_class: SeatClass) {
        self.tables.lock().await.seat_classes.insert(seat_class.id, seat_class);
    }

    /// Writes a route and its segments verbatim, without any chain checks.
    pub async fn add_raw_route(&self, route: Route, details: Vec<RouteDetail>) {
        let mut tables = self.tables.lock().await;
        tables.routes.insert(route.code.clone(), route);
        tables.details.extend(details);
    }

    pub async fn row_counts(&self) -> RowCounts {
        let tables = self.tables.lock().await;
        RowCounts {
            sections: tables.sections.len(),
            routes: tables.routes.len(),
            details: tables.details.len(),
            blocks: tables.blocks.len(),
            cells: tables.cells.len(),
            compositions: tables.compositions.len(),
            flights: tables.flights.len(),
        }
    }
}

#[async_trait]
impl AirportRepository for MemoryStore {
    async fn get_airport(&self, iata_code: &str) -> CoreResult<Option<Airport>> {
        Ok(self.tables.lock().await.airports.get(iata_code).cloned())
    }
}

#[async_trait]
impl RouteRepository for MemoryStore {
    async fn get_route(&self, code: &str) -> CoreResult<Option<Route>> {
        Ok(self.tables.lock().await.routes.get(code).cloned())
    }

    async fn list_routes_by_airline(&self, airline_code: &str) -> CoreResult<Vec<Route>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .routes
            .values()
            .filter(|r| r.airline_code == airline_code)
            .cloned()
            .collect())
    }

    async fn list_route_details(&self, code: &str) -> CoreResult<Vec<RouteDetail>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .details
            .iter()
            .filter(|d| d.route_code == code)
            .cloned()
            .collect())
    }

    async fn list_all_route_details(&self) -> CoreResult<Vec<RouteDetail>> {
        Ok(self.tables.lock().await.details.clone())
    }

    async fn route_codes_departing_from(&self, airport: &str) -> CoreResult<Vec<String>> {
        let tables = self.tables.lock().await;
        let codes: BTreeSet<String> = tables
            .details
            .iter()
            .filter(|d| d.departure_airport == airport)
            .map(|d| d.route_code.clone())
            .collect();
        Ok(codes.into_iter().collect())
    }

    async fn insert_route_pair(&self, pair: &NewRoutePair) -> CoreResult<()> {
        self.transaction(|tx| {
            for route in pair.routes() {
                tx.insert_route(route)?;
            }
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl FleetRepository for MemoryStore {
    async fn get_aircraft_instance(&self, id: Uuid) -> CoreResult<Option<AircraftInstance>> {
        Ok(self.tables.lock().await.aircraft.get(&id).cloned())
    }

    async fn get_aircraft_model_for_instance(&self, aircraft_instance_id: Uuid) -> CoreResult<Option<AircraftModel>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .aircraft
            .get(&aircraft_instance_id)
            .and_then(|a| tables.aircraft_models.get(&a.aircraft_model_id))
            .cloned())
    }

    async fn get_seat_class(&self, id: Uuid) -> CoreResult<Option<SeatClass>> {
        Ok(self.tables.lock().await.seat_classes.get(&id).cloned())
    }

    async fn composed_economy_seats(&self, aircraft_instance_id: Uuid) -> CoreResult<f64> {
        Ok(self.tables.lock().await.composed_economy_seats(aircraft_instance_id))
    }

    async fn list_composed_blocks(&self, aircraft_instance_id: Uuid) -> CoreResult<Vec<ComposedBlock>> {
        let tables = self.tables.lock().await;
        let mut composed = Vec::new();

        for block in &tables.blocks {
            let Some(composition) = tables
                .compositions
                .iter()
                .find(|c| c.cells_block_id == block.id && c.aircraft_instance_id == aircraft_instance_id)
            else {
                continue;
            };
            let seat_class = tables
                .seat_classes
                .get(&composition.seat_class_id)
                .cloned()
                .ok_or_else(|| {
                    CoreError::DataIntegrity(format!(
                        "Block {} references missing seat class {}",
                        block.id, composition.seat_class_id
                    ))
                })?;

            composed.push(ComposedBlock {
                block: block.clone(),
                cells: tables
                    .cells
                    .iter()
                    .filter(|c| c.cells_block_id == block.id)
                    .cloned()
                    .collect(),
                composition: composition.clone(),
                seat_class,
            });
        }
        Ok(composed)
    }

    async fn insert_seat_block(&self, block: &NewSeatBlock) -> CoreResult<Uuid> {
        self.transaction(|tx| {
            tx.tables.check_capacity(block)?;
            tx.insert_block(block)
        })
        .await
    }

    async fn replace_seat_map(&self, aircraft_instance_id: Uuid, blocks: &[NewSeatBlock]) -> CoreResult<Vec<Uuid>> {
        self.transaction(|tx| {
            let removed = tx.delete_seat_map(aircraft_instance_id)?;
            debug!(%aircraft_instance_id, removed, "Cleared seat map");
            blocks.iter().map(|b| tx.insert_block(b)).collect()
        })
        .await
    }
}

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn first_busy_day(&self, aircraft_instance_id: Uuid, days: &[NaiveDate]) -> CoreResult<Option<NaiveDate>> {
        Ok(self.tables.lock().await.busy_day(aircraft_instance_id, days))
    }

    async fn insert_flight_pairs(&self, aircraft_instance_id: Uuid, pairs: &[ScheduledPair]) -> CoreResult<Vec<Flight>> {
        self.transaction(|tx| {
            if !tx.tables.aircraft.contains_key(&aircraft_instance_id) {
                return Err(CoreError::NotFound(format!("Aircraft {} not found", aircraft_instance_id)));
            }

            let mut created = Vec::with_capacity(pairs.len() * 2);
            for pair in pairs {
                if let Some(day) = tx.tables.busy_day(aircraft_instance_id, &pair.guarded_days()) {
                    return Err(CoreError::Conflict(format!(
                        "Aircraft {} already flies on {}",
                        aircraft_instance_id, day
                    )));
                }
                for new_flight in [&pair.outbound, &pair.inbound] {
                    if !tx.tables.routes.contains_key(&new_flight.route_code) {
                        return Err(CoreError::NotFound(format!("Route {} not found", new_flight.route_code)));
                    }
                    tx.write()?;
                    let flight = Flight {
                        id: Uuid::new_v4(),
                        route_code: new_flight.route_code.clone(),
                        aircraft_instance_id,
                        scheduled_departure_day: new_flight.scheduled_departure_day,
                        scheduled_arrival_day: new_flight.scheduled_arrival_day,
                    };
                    tx.tables.flights.push(flight.clone());
                    created.push(flight);
                }
            }
            Ok(created)
        })
        .await
    }

    async fn list_flights_for_aircraft(&self, aircraft_instance_id: Uuid) -> CoreResult<Vec<Flight>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .flights
            .iter()
            .filter(|f| f.aircraft_instance_id == aircraft_instance_id)
            .cloned()
            .collect())
    }

    async fn list_flights_departing_on(&self, route_codes: &[String], day: NaiveDate) -> CoreResult<Vec<Flight>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .flights
            .iter()
            .filter(|f| f.scheduled_departure_day == day && route_codes.contains(&f.route_code))
            .cloned()
            .collect())
    }
}
