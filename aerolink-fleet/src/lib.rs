pub mod matrix;
pub mod view;
pub mod composer;
pub mod cloner;

pub use matrix::SeatMatrix;
pub use view::{BlockView, SeatMapView};
pub use composer::SeatLayoutComposer;
pub use cloner::SeatMapCloner;
