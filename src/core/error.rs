use crate::core::types::{LaneAxis, Position, VehicleId};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrafficError {
    #[error("Grid dimensions must be positive, got {rows}x{columns}")]
    InvalidDimensions { rows: usize, columns: usize },

    #[error("Empty {axis} range [{from}, {to})")]
    EmptyLaneRange { axis: LaneAxis, from: usize, to: usize },

    #[error("{axis} range [{from}, {to}) exceeds grid limit {limit}")]
    LaneOutOfBounds {
        axis: LaneAxis,
        from: usize,
        to: usize,
        limit: usize,
    },

    #[error("{axis} {lane} is already assigned to another generator")]
    OverlappingLanes { axis: LaneAxis, lane: usize },

    #[error("A default generator is already registered")]
    DuplicateDefaultGenerator,

    #[error("Default generator has no eligible lanes left")]
    NoEligibleLanes,

    #[error("Invalid speed bounds: maximum {maximum_ms}ms must be positive and not exceed minimum {minimum_ms}ms")]
    InvalidSpeedBounds { maximum_ms: u64, minimum_ms: u64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Simulation already started; lanes and generators are fixed")]
    AlreadyStarted,

    #[error("Cell {0} is already occupied")]
    CellOccupied(Position),

    #[error("Vehicle {vehicle} does not occupy {position}")]
    NotOccupant { vehicle: VehicleId, position: Position },

    #[error("Vehicle {0} is not on the grid")]
    UnknownVehicle(VehicleId),

    #[error("Position {0} is outside the grid")]
    OutOfGrid(Position),

    #[error("Grid guard poisoned by a panicking actor")]
    GridPoisoned,

    #[error("Shutdown did not complete within {0:?}")]
    ShutdownTimeout(std::time::Duration),

    #[error("Actor task failed: {0}")]
    TaskFailed(#[from] tokio::task::JoinError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl TrafficError {
    /// True for errors that indicate broken synchronization rather than bad input
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            TrafficError::CellOccupied(_)
                | TrafficError::NotOccupant { .. }
                | TrafficError::UnknownVehicle(_)
                | TrafficError::OutOfGrid(_)
                | TrafficError::GridPoisoned
        )
    }
}

pub type Result<T> = std::result::Result<T, TrafficError>;
