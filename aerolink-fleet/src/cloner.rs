use std::sync::Arc;

use tracing::info;
use uuid::Uuid;

use aerolink_core::plan::{NewCell, NewSeatBlock};
use aerolink_core::repository::{ComposedBlock, FleetRepository};
use aerolink_core::{CoreError, CoreResult};

fn copy_for(target: Uuid, source: &ComposedBlock) -> NewSeatBlock {
    NewSeatBlock {
        aircraft_instance_id: target,
        seat_class_id: source.composition.seat_class_id,
        proportion_economy_seat: source.composition.proportion_economy_seat,
        rows: source.block.rows,
        cols: source.block.cols,
        cells: source
            .cells
            .iter()
            .map(|c| NewCell {
                x: c.x,
                y: c.y,
                is_seat: c.is_seat,
            })
            .collect(),
    }
}

/// Copies one aircraft's full seat composition onto another
pub struct SeatMapCloner {
    fleet: Arc<dyn FleetRepository>,
}

impl SeatMapCloner {
    pub fn new(fleet: Arc<dyn FleetRepository>) -> Self {
        Self { fleet }
    }

    /// Replaces the target's seat map with a copy of the source's.
    /// Returns the number of blocks copied.
    pub async fn clone_seat_map(&self, source: Uuid, target: Uuid) -> CoreResult<usize> {
        for id in [source, target] {
            if self.fleet.get_aircraft_instance(id).await?.is_none() {
                return Err(CoreError::NotFound(format!("Aircraft {} not found", id)));
            }
        }

        let blocks = self.fleet.list_composed_blocks(source).await?;
        if blocks.is_empty() {
            return Err(CoreError::NotFound(format!("No block found for source {}", source)));
        }

        let copies: Vec<NewSeatBlock> = blocks.iter().map(|b| copy_for(target, b)).collect();
        let created = self.fleet.replace_seat_map(target, &copies).await?;

        info!(%source, %target, blocks = created.len(), "Seat map cloned");
        Ok(created.len())
    }
}
