use serde::{Deserialize, Serialize};

use aerolink_core::plan::NewCell;
use aerolink_core::{CoreError, CoreResult};

/// Rectangular seat grid; `true` is a seat, `false` an aisle or gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Vec<bool>>", into = "Vec<Vec<bool>>")]
pub struct SeatMatrix {
    rows: Vec<Vec<bool>>,
}

impl SeatMatrix {
    pub fn new(rows: Vec<Vec<bool>>) -> CoreResult<Self> {
        let width = match rows.first() {
            Some(first) if !first.is_empty() => first.len(),
            _ => return Err(CoreError::ValidationError("Seat matrix is empty".to_string())),
        };
        if let Some(row) = rows.iter().position(|r| r.len() != width) {
            return Err(CoreError::ValidationError(format!(
                "Seat matrix row {} has {} columns, expected {}",
                row,
                rows[row].len(),
                width
            )));
        }
        Ok(Self { rows })
    }

    pub fn rows(&self) -> usize {
        self.rows.len()
    }

    pub fn cols(&self) -> usize {
        self.rows[0].len()
    }

    pub fn seat_count(&self) -> usize {
        self.rows.iter().flatten().filter(|seat| **seat).count()
    }

    /// Whether some column holds no seat in any row
    pub fn has_corridor(&self) -> bool {
        (0..self.cols()).any(|col| self.rows.iter().all(|row| !row[col]))
    }

    /// Width of the first row with each seat counted at its economy weight
    /// and every other cell counted as one column.
    pub fn weighted_row_width(&self, proportion_economy_seat: f64) -> f64 {
        self.rows[0]
            .iter()
            .map(|seat| if *seat { proportion_economy_seat } else { 1.0 })
            .sum()
    }

    /// One cell per position, `x` the column and `y` the row.
    pub fn cells(&self) -> Vec<NewCell> {
        self.rows
            .iter()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter().enumerate().map(move |(x, seat)| NewCell {
                    x: x as i32,
                    y: y as i32,
                    is_seat: *seat,
                })
            })
            .collect()
    }
}

impl TryFrom<Vec<Vec<bool>>> for SeatMatrix {
    type Error = CoreError;

    fn try_from(rows: Vec<Vec<bool>>) -> Result<Self, Self::Error> {
        Self::new(rows)
    }
}

impl From<SeatMatrix> for Vec<Vec<bool>> {
    fn from(matrix: SeatMatrix) -> Self {
        matrix.rows
    }
}
