//! Motion synchronization
//!
//! `MotionController` owns the grid behind one mutex and pairs it with a
//! vacancy signal. Every read and write of occupancy goes through here.
//!
//! Waiting follows one pattern everywhere:
//! 1. create a `Notified` future and `enable()` it (registers interest),
//! 2. lock, check the condition, act and return if it holds,
//! 3. unlock, await the notification, go to 1.
//!
//! Because interest is registered before the check, a vacancy signalled
//! between the check and the await still wakes the waiter. Every wake re-checks
//! its own target cell; a wake only means *some* cell became free.
//!
//! The mutex guard is never held across an `.await`.

use crate::core::error::{Result, TrafficError};
use crate::core::types::{Direction, LaneAxis, Position, VehicleId};
use crate::grid::lanes::LaneSet;
use crate::grid::placement::{Placement, PlacementAllocator};
use crate::grid::state::{GridSnapshot, GridState};
use rand::Rng;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::Notify;

/// Read-only access to the grid for rendering
pub trait GridView: Send + Sync {
    /// Consistent point-in-time copy of the grid
    fn snapshot(&self) -> Result<GridSnapshot>;
}

/// The single guard around `GridState` plus its wake mechanism
#[derive(Debug)]
pub struct MotionController {
    rows: usize,
    columns: usize,
    grid: Mutex<GridState>,
    vacancy: Notify,
}

impl MotionController {
    pub fn new(grid: GridState) -> Self {
        Self {
            rows: grid.rows(),
            columns: grid.columns(),
            grid: Mutex::new(grid),
            vacancy: Notify::new(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    fn lock(&self) -> Result<MutexGuard<'_, GridState>> {
        self.grid.lock().map_err(|_| TrafficError::GridPoisoned)
    }

    /// Run `f` with exclusive access to the grid
    pub fn with_grid<T>(&self, f: impl FnOnce(&mut GridState) -> Result<T>) -> Result<T> {
        let mut grid = self.lock()?;
        f(&mut grid)
    }

    /// Occupancy probe used inside the guarded section. A free cell also wakes
    /// every waiter so it can re-check its own target.
    fn probe(&self, grid: &GridState, pos: Position) -> bool {
        if grid.is_occupied(pos) {
            true
        } else {
            self.vacancy.notify_waiters();
            false
        }
    }

    /// True iff a vehicle currently occupies `pos`; wakes waiters when it does not
    pub fn is_occupied(&self, pos: Position) -> Result<bool> {
        let grid = self.lock()?;
        Ok(self.probe(&grid, pos))
    }

    /// False once `position` is the last cell in `direction`.
    ///
    /// Depends only on the grid extent, so it takes no lock.
    pub fn can_advance(&self, position: Position, direction: Direction) -> bool {
        match direction {
            Direction::West => position.column + 1 < self.columns,
            Direction::East => position.column > 0,
            Direction::South => position.row + 1 < self.rows,
            Direction::North => position.row > 0,
        }
    }

    /// Move `vehicle` one cell along `direction`, suspending while the target
    /// is occupied. Returns the new position.
    ///
    /// Cancel-safe: dropping the future while it waits leaves the grid untouched.
    pub async fn advance(
        &self,
        vehicle: VehicleId,
        from: Position,
        direction: Direction,
    ) -> Result<Position> {
        let to = from
            .step(direction)
            .filter(|_| self.can_advance(from, direction))
            .ok_or(TrafficError::OutOfGrid(from))?;

        let mut waits = 0u32;
        loop {
            let notified = self.vacancy.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut grid = self.lock()?;
                if !self.probe(&grid, to) {
                    grid.move_vehicle(vehicle, from, to)?;
                    // `from` is free now
                    self.vacancy.notify_waiters();
                    if waits > 0 {
                        tracing::trace!(%vehicle, %to, waits, "Blocked vehicle advanced");
                    }
                    return Ok(to);
                }
            }

            waits += 1;
            tracing::trace!(%vehicle, %to, "Target cell occupied, waiting");
            notified.await;
        }
    }

    /// Deregister a vehicle, freeing its cell
    pub fn remove(&self, vehicle: VehicleId) -> Result<Position> {
        let pos = self.with_grid(|grid| grid.remove(vehicle))?;
        self.vacancy.notify_waiters();
        Ok(pos)
    }

    /// Place a new vehicle on a free entry cell of `lanes`, waiting for a
    /// vacancy whenever every entry cell is taken.
    ///
    /// Cancel-safe in the same way as [`advance`](Self::advance).
    pub async fn place<R: Rng + ?Sized>(
        &self,
        vehicle: VehicleId,
        lanes: &LaneSet,
        allocator: &PlacementAllocator,
        rng: &mut R,
    ) -> Result<Placement> {
        let mut waits = 0u32;
        loop {
            let notified = self.vacancy.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let mut grid = self.lock()?;
                if let Some(placement) = allocator.allocate(&mut grid, lanes, vehicle, rng)? {
                    return Ok(placement);
                }
            }

            if waits == 0 {
                tracing::warn!(%vehicle, lanes = ?lanes.axes(), "Entry cells saturated, waiting for vacancy");
            } else {
                tracing::trace!(%vehicle, waits, "Still saturated");
            }
            waits += 1;
            notified.await;
        }
    }

    /// Flip lane directions in `[from, to)` under the guard
    pub fn reverse_lanes(&self, axis: LaneAxis, from: usize, to: usize) -> Result<()> {
        self.with_grid(|grid| grid.reverse_lanes(axis, from, to))
    }

    /// Assign lane directions in `[from, to)` under the guard
    pub fn set_lane_direction(
        &self,
        axis: LaneAxis,
        from: usize,
        to: usize,
        direction: Direction,
    ) -> Result<()> {
        self.with_grid(|grid| grid.set_lane_direction(axis, from, to, direction))
    }

    pub fn lane_direction(&self, axis: LaneAxis, lane: usize) -> Result<Option<Direction>> {
        self.with_grid(|grid| Ok(grid.lane_direction(axis, lane)))
    }

    pub fn vehicle_count(&self) -> Result<usize> {
        self.with_grid(|grid| Ok(grid.vehicle_count()))
    }

    /// Verify occupancy bookkeeping under the guard
    pub fn check_invariants(&self) -> Result<()> {
        self.with_grid(|grid| grid.check_invariants())
    }
}

impl GridView for MotionController {
    fn snapshot(&self) -> Result<GridSnapshot> {
        self.with_grid(|grid| Ok(grid.snapshot()))
    }
}
