pub mod network;
pub mod fleet;
pub mod flight;

pub use network::{Airport, Route, RouteDetail, RouteSection};
pub use fleet::{AircraftComposition, AircraftInstance, AircraftModel, Cell, CellsBlock, SeatClass};
pub use flight::Flight;
