//! Vehicle actor
//!
//! Each vehicle runs as its own task: sleep for its speed interval, try to
//! advance one cell, repeat until the boundary, then leave the grid and report
//! its travel time. Direction and lane are fixed at spawn.

use crate::core::error::Result;
use crate::core::types::{Direction, Position, VehicleId};
use crate::grid::motion::MotionController;
use crate::grid::placement::Placement;
use crate::traffic::shutdown_requested;
use crate::traffic::statistics::StatisticsSink;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{self, Instant};

/// A vehicle's mutable state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vehicle {
    pub id: VehicleId,
    /// Delay between two moves; lower is faster
    pub speed: Duration,
    pub direction: Direction,
    pub position: Position,
}

impl Vehicle {
    pub fn new(id: VehicleId, speed: Duration, placement: Placement) -> Self {
        Self {
            id,
            speed,
            direction: placement.direction,
            position: placement.position,
        }
    }
}

/// How a vehicle's run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VehicleOutcome {
    /// Reached the boundary and left the grid
    Exited { moves: u32, travel: Duration },
    /// Stopped by shutdown before reaching the boundary
    Cancelled { moves: u32 },
}

/// Per-vehicle lifecycle task
pub struct VehicleAgent {
    vehicle: Vehicle,
    motion: Arc<MotionController>,
    sink: Option<Arc<dyn StatisticsSink>>,
    spawned_at: Instant,
}

impl VehicleAgent {
    /// Wrap a vehicle that is already placed on the grid
    pub fn new(
        vehicle: Vehicle,
        motion: Arc<MotionController>,
        sink: Option<Arc<dyn StatisticsSink>>,
    ) -> Self {
        Self {
            vehicle,
            motion,
            sink,
            spawned_at: Instant::now(),
        }
    }

    pub fn vehicle(&self) -> &Vehicle {
        &self.vehicle
    }

    /// Drive the vehicle until it exits or `shutdown` turns true
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<VehicleOutcome> {
        let mut moves = 0u32;

        loop {
            tokio::select! {
                _ = time::sleep(self.vehicle.speed) => {}
                _ = shutdown_requested(&mut shutdown) => return self.cancel(moves),
            }

            let Vehicle {
                id,
                direction,
                position,
                ..
            } = self.vehicle;

            if !self.motion.can_advance(position, direction) {
                break;
            }

            let next = tokio::select! {
                result = self.motion.advance(id, position, direction) => result?,
                _ = shutdown_requested(&mut shutdown) => return self.cancel(moves),
            };
            self.vehicle.position = next;
            moves += 1;
        }

        self.motion.remove(self.vehicle.id)?;
        let travel = self.spawned_at.elapsed();
        if let Some(sink) = &self.sink {
            sink.record_travel_time(u64::try_from(travel.as_nanos()).unwrap_or(u64::MAX));
        }

        tracing::debug!(
            vehicle = %self.vehicle.id,
            exit = %self.vehicle.position,
            moves,
            travel_ms = travel.as_millis() as u64,
            "Vehicle left the grid"
        );
        Ok(VehicleOutcome::Exited { moves, travel })
    }

    fn cancel(&self, moves: u32) -> Result<VehicleOutcome> {
        self.motion.remove(self.vehicle.id)?;
        tracing::trace!(vehicle = %self.vehicle.id, moves, "Vehicle cancelled");
        Ok(VehicleOutcome::Cancelled { moves })
    }
}
