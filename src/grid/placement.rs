//! Entry-cell selection for newly spawned vehicles
//!
//! A lane has exactly one entry cell, determined by its current direction.
//! The allocator samples lanes uniformly without replacement until it finds a
//! free entry cell. When every candidate is taken it reports saturation
//! instead of spinning; the caller waits for a vacancy and tries again.

use crate::core::error::{Result, TrafficError};
use crate::core::types::{Direction, LaneAxis, Position, VehicleId};
use crate::grid::lanes::LaneSet;
use crate::grid::state::GridState;
use rand::Rng;

/// Where a vehicle was put and which way it will travel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub position: Position,
    pub direction: Direction,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlacementAllocator;

impl PlacementAllocator {
    pub fn new() -> Self {
        Self
    }

    /// Pick the axis to spawn on. Specific sets have one; the default set
    /// chooses uniformly among axes that still have lanes.
    pub fn choose_axis<R: Rng + ?Sized>(&self, lanes: &LaneSet, rng: &mut R) -> Option<LaneAxis> {
        let axes = lanes.axes();
        match axes.len() {
            0 => None,
            1 => Some(axes[0]),
            n => Some(axes[rng.gen_range(0..n)]),
        }
    }

    /// One allocation attempt. Must run under the grid guard.
    ///
    /// Returns `Ok(None)` when every entry cell of the set is occupied.
    pub fn allocate<R: Rng + ?Sized>(
        &self,
        grid: &mut GridState,
        lanes: &LaneSet,
        vehicle: VehicleId,
        rng: &mut R,
    ) -> Result<Option<Placement>> {
        let first = match self.choose_axis(lanes, rng) {
            Some(axis) => axis,
            None => return Err(TrafficError::NoEligibleLanes),
        };

        let mut axes = vec![first];
        axes.extend(lanes.axes().into_iter().filter(|axis| *axis != first));

        for axis in axes {
            let lanes_on_axis = lanes.lanes(axis);
            if let Some(placement) = self.allocate_on_axis(grid, axis, lanes_on_axis, vehicle, rng)? {
                return Ok(Some(placement));
            }
        }
        Ok(None)
    }

    fn allocate_on_axis<R: Rng + ?Sized>(
        &self,
        grid: &mut GridState,
        axis: LaneAxis,
        lanes: &[usize],
        vehicle: VehicleId,
        rng: &mut R,
    ) -> Result<Option<Placement>> {
        let mut candidates = lanes.to_vec();

        while !candidates.is_empty() {
            let lane = candidates.swap_remove(rng.gen_range(0..candidates.len()));
            let (position, direction) = grid.entry_cell(axis, lane).ok_or_else(|| {
                TrafficError::LaneOutOfBounds {
                    axis,
                    from: lane,
                    to: lane + 1,
                    limit: grid.lane_count(axis),
                }
            })?;

            if !grid.is_occupied(position) {
                grid.place(vehicle, position, direction)?;
                return Ok(Some(Placement {
                    position,
                    direction,
                }));
            }
        }

        Ok(None)
    }
}
