//! Grid occupancy state
//!
//! `GridState` is the single source of truth for which vehicle holds which cell
//! and which way each lane flows. It is plain data with no locking of its own;
//! `MotionController` owns the only instance behind the simulation's guard.

use crate::core::error::{Result, TrafficError};
use crate::core::types::{Direction, LaneAxis, Position, VehicleId};
use crate::grid::lanes::validate_lane_range;
use ahash::AHashMap;

/// What a cell holds when occupied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupant {
    pub vehicle: VehicleId,
    pub direction: Direction,
}

/// Occupancy array plus per-lane direction tables
#[derive(Debug, Clone)]
pub struct GridState {
    rows: usize,
    columns: usize,
    cells: Vec<Option<Occupant>>,
    row_directions: Vec<Direction>,
    column_directions: Vec<Direction>,
    /// Reverse index, kept in lockstep with `cells`
    positions: AHashMap<VehicleId, Position>,
}

impl GridState {
    /// Create an empty grid. Rows flow West, columns flow South.
    pub fn new(rows: usize, columns: usize) -> Result<Self> {
        if rows == 0 || columns == 0 {
            return Err(TrafficError::InvalidDimensions { rows, columns });
        }

        Ok(Self {
            rows,
            columns,
            cells: vec![None; rows * columns],
            row_directions: vec![LaneAxis::Horizontal.default_direction(); rows],
            column_directions: vec![LaneAxis::Vertical.default_direction(); columns],
            positions: AHashMap::new(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    /// Number of lanes on an axis
    pub fn lane_count(&self, axis: LaneAxis) -> usize {
        match axis {
            LaneAxis::Horizontal => self.rows,
            LaneAxis::Vertical => self.columns,
        }
    }

    #[inline]
    pub fn contains(&self, pos: Position) -> bool {
        pos.row < self.rows && pos.column < self.columns
    }

    #[inline]
    fn index(&self, pos: Position) -> Option<usize> {
        if self.contains(pos) {
            Some(pos.row * self.columns + pos.column)
        } else {
            None
        }
    }

    fn checked_index(&self, pos: Position) -> Result<usize> {
        self.index(pos).ok_or(TrafficError::OutOfGrid(pos))
    }

    /// Occupant of a cell, if any
    pub fn occupant(&self, pos: Position) -> Option<Occupant> {
        self.index(pos).and_then(|idx| self.cells[idx])
    }

    /// True iff a vehicle currently holds `pos`
    pub fn is_occupied(&self, pos: Position) -> bool {
        self.occupant(pos).is_some()
    }

    /// Cell currently held by `vehicle`
    pub fn position_of(&self, vehicle: VehicleId) -> Option<Position> {
        self.positions.get(&vehicle).copied()
    }

    pub fn vehicle_count(&self) -> usize {
        self.positions.len()
    }

    /// Put a vehicle on an empty cell
    pub fn place(&mut self, vehicle: VehicleId, pos: Position, direction: Direction) -> Result<()> {
        let idx = self.checked_index(pos)?;
        if self.cells[idx].is_some() {
            return Err(TrafficError::CellOccupied(pos));
        }

        debug_assert!(!self.positions.contains_key(&vehicle));
        self.cells[idx] = Some(Occupant { vehicle, direction });
        self.positions.insert(vehicle, pos);
        Ok(())
    }

    /// Relocate a vehicle from the cell it holds to an empty cell
    pub fn move_vehicle(&mut self, vehicle: VehicleId, from: Position, to: Position) -> Result<()> {
        let from_idx = self.checked_index(from)?;
        let to_idx = self.checked_index(to)?;

        let occupant = match self.cells[from_idx] {
            Some(occupant) if occupant.vehicle == vehicle => occupant,
            _ => {
                return Err(TrafficError::NotOccupant {
                    vehicle,
                    position: from,
                })
            }
        };
        if self.cells[to_idx].is_some() {
            return Err(TrafficError::CellOccupied(to));
        }

        self.cells[from_idx] = None;
        self.cells[to_idx] = Some(occupant);
        self.positions.insert(vehicle, to);
        Ok(())
    }

    /// Clear the cell held by `vehicle`, returning where it was
    pub fn remove(&mut self, vehicle: VehicleId) -> Result<Position> {
        let pos = self
            .positions
            .remove(&vehicle)
            .ok_or(TrafficError::UnknownVehicle(vehicle))?;
        let idx = self.checked_index(pos)?;
        self.cells[idx] = None;
        Ok(pos)
    }

    /// Current direction of a lane
    pub fn lane_direction(&self, axis: LaneAxis, lane: usize) -> Option<Direction> {
        match axis {
            LaneAxis::Horizontal => self.row_directions.get(lane).copied(),
            LaneAxis::Vertical => self.column_directions.get(lane).copied(),
        }
    }

    fn directions_mut(&mut self, axis: LaneAxis) -> &mut [Direction] {
        match axis {
            LaneAxis::Horizontal => &mut self.row_directions,
            LaneAxis::Vertical => &mut self.column_directions,
        }
    }

    /// Flip the direction of lanes in `[from, to)`.
    ///
    /// Vehicles already on those lanes keep the direction they spawned with.
    pub fn reverse_lanes(&mut self, axis: LaneAxis, from: usize, to: usize) -> Result<()> {
        let range = validate_lane_range(axis, from, to, self.lane_count(axis))?;
        for dir in &mut self.directions_mut(axis)[range] {
            *dir = dir.reversed();
        }
        Ok(())
    }

    /// Assign a direction to lanes in `[from, to)`
    pub fn set_lane_direction(
        &mut self,
        axis: LaneAxis,
        from: usize,
        to: usize,
        direction: Direction,
    ) -> Result<()> {
        if direction.axis() != axis {
            return Err(TrafficError::InvalidConfig(format!(
                "{:?} is not a {} direction",
                direction, axis
            )));
        }
        let range = validate_lane_range(axis, from, to, self.lane_count(axis))?;
        for dir in &mut self.directions_mut(axis)[range] {
            *dir = direction;
        }
        Ok(())
    }

    /// The only cell a vehicle may enter `lane` through, with the direction it will travel
    pub fn entry_cell(&self, axis: LaneAxis, lane: usize) -> Option<(Position, Direction)> {
        let direction = self.lane_direction(axis, lane)?;
        let pos = match direction {
            Direction::West => Position::new(lane, 0),
            Direction::East => Position::new(lane, self.columns - 1),
            Direction::South => Position::new(0, lane),
            Direction::North => Position::new(self.rows - 1, lane),
        };
        Some((pos, direction))
    }

    /// True when `pos` is the last cell in `direction`
    pub fn is_boundary(&self, pos: Position, direction: Direction) -> bool {
        match direction {
            Direction::West => pos.column + 1 >= self.columns,
            Direction::East => pos.column == 0,
            Direction::South => pos.row + 1 >= self.rows,
            Direction::North => pos.row == 0,
        }
    }

    /// Next cell along `direction`, or `None` at the boundary
    pub fn next_position(&self, pos: Position, direction: Direction) -> Option<Position> {
        pos.step(direction).filter(|next| self.contains(*next))
    }

    /// Point-in-time copy for rendering; holds no references into live cells
    pub fn snapshot(&self) -> GridSnapshot {
        GridSnapshot {
            rows: self.rows,
            columns: self.columns,
            cells: self
                .cells
                .iter()
                .map(|cell| cell.map(|occupant| occupant.direction))
                .collect(),
        }
    }

    /// Verify the cell array and the reverse index agree exactly
    pub fn check_invariants(&self) -> Result<()> {
        let mut occupied = 0;
        for (idx, cell) in self.cells.iter().enumerate() {
            if let Some(occupant) = cell {
                occupied += 1;
                let pos = Position::new(idx / self.columns, idx % self.columns);
                if self.positions.get(&occupant.vehicle) != Some(&pos) {
                    return Err(TrafficError::NotOccupant {
                        vehicle: occupant.vehicle,
                        position: pos,
                    });
                }
            }
        }

        if occupied != self.positions.len() {
            // Some vehicle is indexed at a cell that holds someone else
            let stray = self
                .positions
                .iter()
                .find(|(vehicle, pos)| {
                    self.occupant(**pos).map(|o| o.vehicle) != Some(**vehicle)
                })
                .map(|(vehicle, pos)| (*vehicle, *pos));
            return Err(match stray {
                Some((vehicle, position)) => TrafficError::NotOccupant { vehicle, position },
                None => TrafficError::InvalidConfig("occupancy index out of sync".into()),
            });
        }

        Ok(())
    }
}

/// Immutable rows x columns view of the grid: empty, or the occupant's direction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridSnapshot {
    rows: usize,
    columns: usize,
    cells: Vec<Option<Direction>>,
}

impl GridSnapshot {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn get(&self, row: usize, column: usize) -> Option<Direction> {
        if row < self.rows && column < self.columns {
            self.cells[row * self.columns + column]
        } else {
            None
        }
    }

    /// Cells of one row, left to right; `None` past the last row
    pub fn row(&self, row: usize) -> Option<&[Option<Direction>]> {
        if row >= self.rows {
            return None;
        }
        let start = row * self.columns;
        Some(&self.cells[start..start + self.columns])
    }

    pub fn occupied_count(&self) -> usize {
        self.cells.iter().filter(|cell| cell.is_some()).count()
    }
}
