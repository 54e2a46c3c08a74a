use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use aerolink_core::plan::{exceeds, NewSeatBlock};
use aerolink_core::repository::FleetRepository;
use aerolink_core::{CoreError, CoreResult};

use crate::matrix::SeatMatrix;
use crate::view::{BlockView, SeatMapView};

fn rejected(aircraft_instance_id: Uuid, reason: String) -> CoreError {
    warn!(aircraft = %aircraft_instance_id, %reason, "Seat block rejected");
    CoreError::ValidationError(reason)
}

/// Validates seat blocks against an aircraft's capacity and composes them onto it
pub struct SeatLayoutComposer {
    fleet: Arc<dyn FleetRepository>,
}

impl SeatLayoutComposer {
    pub fn new(fleet: Arc<dyn FleetRepository>) -> Self {
        Self { fleet }
    }

    /// Persists `matrix` as a new block of `seat_class_id` on the aircraft.
    /// Returns the block id.
    pub async fn insert_block(
        &self,
        matrix: Vec<Vec<bool>>,
        seat_class_id: Uuid,
        proportion_economy_seat: f64,
        aircraft_instance_id: Uuid,
    ) -> CoreResult<Uuid> {
        let matrix = SeatMatrix::new(matrix)?;
        if !proportion_economy_seat.is_finite() || proportion_economy_seat <= 0.0 {
            return Err(CoreError::ValidationError(format!(
                "Economy proportion must be a positive number, got {}",
                proportion_economy_seat
            )));
        }

        if self.fleet.get_aircraft_instance(aircraft_instance_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("Aircraft {} not found", aircraft_instance_id)));
        }
        if self.fleet.get_seat_class(seat_class_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("Seat class {} not found", seat_class_id)));
        }
        let model = self
            .fleet
            .get_aircraft_model_for_instance(aircraft_instance_id)
            .await?
            .ok_or_else(|| {
                CoreError::DataIntegrity(format!("Aircraft {} has no model", aircraft_instance_id))
            })?;

        let weighted_cols = matrix.weighted_row_width(proportion_economy_seat);
        if exceeds(weighted_cols, model.max_cabin_cols) {
            return Err(rejected(
                aircraft_instance_id,
                format!(
                    "Weighted row width {} exceeds {} cabin columns of {}",
                    weighted_cols, model.max_cabin_cols, model.name
                ),
            ));
        }
        if matrix.cols() as i64 > i64::from(model.max_cabin_cols) {
            return Err(rejected(
                aircraft_instance_id,
                format!(
                    "{} columns exceed {} cabin columns of {}",
                    matrix.cols(),
                    model.max_cabin_cols,
                    model.name
                ),
            ));
        }
        if !matrix.has_corridor() {
            return Err(rejected(
                aircraft_instance_id,
                "Seat matrix has no continuous corridor".to_string(),
            ));
        }

        let composed = self.fleet.composed_economy_seats(aircraft_instance_id).await?;
        let requested = matrix.seat_count() as f64 * proportion_economy_seat;
        if exceeds(requested + composed, model.max_economy_seats) {
            return Err(rejected(
                aircraft_instance_id,
                format!(
                    "{} economy seats requested on top of {} exceed the {} allowed on {}",
                    requested, composed, model.max_economy_seats, model.name
                ),
            ));
        }

        let block = NewSeatBlock {
            aircraft_instance_id,
            seat_class_id,
            proportion_economy_seat,
            rows: matrix.rows() as i32,
            cols: matrix.cols() as i32,
            cells: matrix.cells(),
        };
        let block_id = self.fleet.insert_seat_block(&block).await?;

        info!(
            aircraft = %aircraft_instance_id,
            block = %block_id,
            rows = block.rows,
            cols = block.cols,
            seats = matrix.seat_count(),
            "Seat block composed"
        );
        Ok(block_id)
    }

    /// The aircraft's blocks in composition order
    pub async fn seat_map(&self, aircraft_instance_id: Uuid) -> CoreResult<SeatMapView> {
        if self.fleet.get_aircraft_instance(aircraft_instance_id).await?.is_none() {
            return Err(CoreError::NotFound(format!("Aircraft {} not found", aircraft_instance_id)));
        }

        let blocks = self
            .fleet
            .list_composed_blocks(aircraft_instance_id)
            .await?
            .into_iter()
            .map(BlockView::try_from)
            .collect::<CoreResult<Vec<_>>>()?;

        Ok(SeatMapView {
            aircraft_instance_id,
            economy_seats: blocks.iter().map(BlockView::economy_seats).fold(0.0, |a, b| a + b),
            blocks,
        })
    }
}
