//! The shared grid: occupancy state, lane assignment, placement and motion

pub mod lanes;
pub mod motion;
pub mod placement;
pub mod state;

pub use lanes::{LaneRegistry, LaneSet};
pub use motion::{GridView, MotionController};
pub use placement::{Placement, PlacementAllocator};
pub use state::{GridSnapshot, GridState, Occupant};
