use serde::Serialize;
use uuid::Uuid;

use aerolink_core::repository::ComposedBlock;
use aerolink_core::CoreError;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BlockView {
    pub block_id: Uuid,
    pub seat_class: String,
    pub seat_class_code: String,
    pub proportion_economy_seat: f64,
    pub rows: i32,
    pub cols: i32,
    pub seats: usize,
    /// Row-major grid rebuilt from the stored cells
    pub layout: Vec<Vec<bool>>,
}

impl BlockView {
    pub fn economy_seats(&self) -> f64 {
        self.seats as f64 * self.proportion_economy_seat
    }
}

impl TryFrom<ComposedBlock> for BlockView {
    type Error = CoreError;

    fn try_from(composed: ComposedBlock) -> Result<Self, Self::Error> {
        let ComposedBlock {
            block,
            cells,
            composition,
            seat_class,
        } = composed;

        let mut layout = vec![vec![false; block.cols.max(0) as usize]; block.rows.max(0) as usize];
        for cell in &cells {
            let slot = usize::try_from(cell.y)
                .ok()
                .zip(usize::try_from(cell.x).ok())
                .and_then(|(y, x)| layout.get_mut(y).and_then(|row| row.get_mut(x)))
                .ok_or_else(|| {
                    CoreError::DataIntegrity(format!(
                        "Cell ({}, {}) lies outside {}x{} block {}",
                        cell.x, cell.y, block.rows, block.cols, block.id
                    ))
                })?;
            *slot = cell.is_seat;
        }

        Ok(Self {
            block_id: block.id,
            seat_class: seat_class.name,
            seat_class_code: seat_class.code,
            proportion_economy_seat: composition.proportion_economy_seat,
            rows: block.rows,
            cols: block.cols,
            seats: cells.iter().filter(|c| c.is_seat).count(),
            layout,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SeatMapView {
    pub aircraft_instance_id: Uuid,
    pub economy_seats: f64,
    pub blocks: Vec<BlockView>,
}
