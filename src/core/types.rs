//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for vehicles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VehicleId(pub Uuid);

impl VehicleId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for VehicleId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VehicleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Generator identifier, assigned in registration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GeneratorId(pub u32);

/// Direction of travel along a lane.
///
/// Naming follows the simulation's own convention: a westbound vehicle enters
/// at column 0 and travels toward the last column, a southbound vehicle enters
/// at row 0 and travels toward the last row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    West,
    South,
    East,
    North,
}

impl Direction {
    /// Axis of the lanes this direction travels along
    pub fn axis(self) -> LaneAxis {
        match self {
            Direction::West | Direction::East => LaneAxis::Horizontal,
            Direction::South | Direction::North => LaneAxis::Vertical,
        }
    }

    /// Opposite direction on the same axis
    pub fn reversed(self) -> Self {
        match self {
            Direction::West => Direction::East,
            Direction::East => Direction::West,
            Direction::South => Direction::North,
            Direction::North => Direction::South,
        }
    }
}

/// The two lane families of the grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LaneAxis {
    /// Rows; vehicles travel West or East
    Horizontal,
    /// Columns; vehicles travel South or North
    Vertical,
}

impl LaneAxis {
    /// Direction every lane of this axis starts with
    pub fn default_direction(self) -> Direction {
        match self {
            LaneAxis::Horizontal => Direction::West,
            LaneAxis::Vertical => Direction::South,
        }
    }
}

impl fmt::Display for LaneAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LaneAxis::Horizontal => write!(f, "row"),
            LaneAxis::Vertical => write!(f, "column"),
        }
    }
}

/// A cell location, 0-indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: usize,
    pub column: usize,
}

impl Position {
    pub fn new(row: usize, column: usize) -> Self {
        Self { row, column }
    }

    /// The adjacent cell one step along `direction`.
    ///
    /// Returns `None` when the step would leave the grid on the low side;
    /// the high side is bounded by the caller's grid extent.
    pub fn step(self, direction: Direction) -> Option<Position> {
        match direction {
            Direction::West => Some(Position::new(self.row, self.column + 1)),
            Direction::East => self
                .column
                .checked_sub(1)
                .map(|column| Position::new(self.row, column)),
            Direction::South => Some(Position::new(self.row + 1, self.column)),
            Direction::North => self
                .row
                .checked_sub(1)
                .map(|row| Position::new(row, self.column)),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.column)
    }
}
