//! Traffic generator actor
//!
//! A generator sleeps for `frequency`, draws a speed for a new vehicle, places
//! it on one of its lanes and starts the vehicle's task, then sleeps again. A
//! long wait for a free entry cell never shortens the next sleep. Vehicles are
//! kept in a `JoinSet` and drained on shutdown.

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, TrafficError};
use crate::core::types::{GeneratorId, VehicleId};
use crate::grid::lanes::LaneSet;
use crate::grid::motion::MotionController;
use crate::grid::placement::PlacementAllocator;
use crate::traffic::shutdown_requested;
use crate::traffic::statistics::{StatisticsCollector, StatisticsSink};
use crate::traffic::vehicle::{Vehicle, VehicleAgent, VehicleOutcome};
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};
use tokio::time::{self, Instant};

/// Counters for one generator's run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorSummary {
    pub name: String,
    pub spawned: u64,
    pub exited: u64,
    pub cancelled: u64,
}

pub struct TrafficGenerator {
    id: GeneratorId,
    name: String,
    frequency: Duration,
    /// Delay bounds in milliseconds; `fastest_ms` is the configured maximum speed
    fastest_ms: u64,
    slowest_ms: u64,
    lanes: LaneSet,
    motion: Arc<MotionController>,
    collector: Option<Arc<StatisticsCollector>>,
    allocator: PlacementAllocator,
    rng: ChaCha8Rng,
}

impl TrafficGenerator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: GeneratorId,
        name: impl Into<String>,
        frequency: Duration,
        config: &SimulationConfig,
        lanes: LaneSet,
        motion: Arc<MotionController>,
        collector: Option<Arc<StatisticsCollector>>,
        rng: ChaCha8Rng,
    ) -> Result<Self> {
        let name = name.into();
        if frequency.is_zero() {
            return Err(TrafficError::InvalidConfig(format!(
                "generator '{}' has zero frequency",
                name
            )));
        }
        if lanes.is_empty() {
            return Err(TrafficError::NoEligibleLanes);
        }
        if config.maximum_speed_ms == 0 || config.maximum_speed_ms > config.minimum_speed_ms {
            return Err(TrafficError::InvalidSpeedBounds {
                maximum_ms: config.maximum_speed_ms,
                minimum_ms: config.minimum_speed_ms,
            });
        }

        Ok(Self {
            id,
            name,
            frequency,
            fastest_ms: config.maximum_speed_ms,
            slowest_ms: config.minimum_speed_ms,
            lanes,
            motion,
            collector,
            allocator: PlacementAllocator::new(),
            rng,
        })
    }

    pub fn id(&self) -> GeneratorId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn lanes(&self) -> &LaneSet {
        &self.lanes
    }

    /// Draw a move delay uniformly from the configured bounds
    pub fn sample_speed(&mut self) -> Duration {
        let delay = self.rng.gen_range(self.fastest_ms..=self.slowest_ms);
        Duration::from_millis(delay.max(self.fastest_ms))
    }

    /// Create one vehicle and place it, waiting while every entry cell is taken
    pub async fn spawn_vehicle(&mut self) -> Result<VehicleAgent> {
        let id = VehicleId::new();
        let speed = self.sample_speed();
        let placement = self
            .motion
            .place(id, &self.lanes, &self.allocator, &mut self.rng)
            .await?;

        tracing::debug!(
            generator = %self.name,
            vehicle = %id,
            entry = %placement.position,
            direction = ?placement.direction,
            speed_ms = speed.as_millis() as u64,
            "Vehicle spawned"
        );

        let sink = self
            .collector
            .clone()
            .map(|collector| collector as Arc<dyn StatisticsSink>);
        Ok(VehicleAgent::new(
            Vehicle::new(id, speed, placement),
            Arc::clone(&self.motion),
            sink,
        ))
    }

    /// Sleep `frequency`, spawn one vehicle, repeat until shutdown; then stop
    /// and drain the vehicles. A failed vehicle stops the generator and its
    /// remaining vehicles, which leave the grid before the error is returned.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> Result<GeneratorSummary> {
        let mut summary = GeneratorSummary {
            name: self.name.clone(),
            ..GeneratorSummary::default()
        };
        let mut vehicles: JoinSet<Result<VehicleOutcome>> = JoinSet::new();
        let (stop_vehicles, vehicle_shutdown) = watch::channel(false);
        let mut failure = None;

        // Measured from the end of the previous spawn, however long placement took
        let next_spawn = time::sleep(self.frequency);
        tokio::pin!(next_spawn);

        tracing::info!(generator = %self.name, lanes = ?self.lanes.axes(), "Generator started");

        loop {
            tokio::select! {
                _ = &mut next_spawn => {}
                Some(joined) = vehicles.join_next(), if !vehicles.is_empty() => {
                    if let Err(err) = self.record(&mut summary, joined) {
                        failure = Some(err);
                        break;
                    }
                    continue;
                }
                _ = shutdown_requested(&mut shutdown) => break,
            }

            let agent = tokio::select! {
                placed = self.spawn_vehicle() => match placed {
                    Ok(agent) => agent,
                    Err(err) => {
                        failure = Some(err);
                        break;
                    }
                },
                _ = shutdown_requested(&mut shutdown) => break,
            };
            vehicles.spawn(agent.run(vehicle_shutdown.clone()));
            summary.spawned += 1;
            next_spawn.as_mut().reset(Instant::now() + self.frequency);
        }

        stop_vehicles.send_replace(true);
        while let Some(joined) = vehicles.join_next().await {
            if let Err(err) = self.record(&mut summary, joined) {
                failure.get_or_insert(err);
            }
        }

        if let Some(err) = failure {
            tracing::error!(
                generator = %self.name,
                error = %err,
                cancelled = summary.cancelled,
                "Generator failed; remaining vehicles cancelled"
            );
            return Err(err);
        }

        tracing::info!(
            generator = %self.name,
            spawned = summary.spawned,
            exited = summary.exited,
            cancelled = summary.cancelled,
            "Generator stopped"
        );
        Ok(summary)
    }

    fn record(
        &self,
        summary: &mut GeneratorSummary,
        joined: std::result::Result<Result<VehicleOutcome>, JoinError>,
    ) -> Result<()> {
        match joined? {
            Ok(VehicleOutcome::Exited { .. }) => summary.exited += 1,
            Ok(VehicleOutcome::Cancelled { .. }) => summary.cancelled += 1,
            Err(err) => {
                tracing::error!(generator = %self.name, error = %err, "Vehicle failed");
                return Err(err);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{Direction, Position};
    use crate::grid::state::GridState;
    use rand::SeedableRng;

    fn generator(motion: Arc<MotionController>, lanes: LaneSet, config: &SimulationConfig) -> TrafficGenerator {
        TrafficGenerator::new(
            GeneratorId(0),
            "test",
            Duration::from_millis(100),
            config,
            lanes,
            motion,
            None,
            ChaCha8Rng::seed_from_u64(11),
        )
        .unwrap()
    }

    #[test]
    fn test_speed_within_bounds() {
        let config = SimulationConfig::default();
        let motion = Arc::new(MotionController::new(GridState::new(10, 20).unwrap()));
        let mut generator = generator(motion, LaneSet::Horizontal(vec![0]), &config);

        for _ in 0..500 {
            let speed = generator.sample_speed();
            assert!(speed >= Duration::from_millis(80));
            assert!(speed <= Duration::from_millis(450));
        }
    }

    #[test]
    fn test_rejects_empty_lanes_and_zero_frequency() {
        let config = SimulationConfig::default();
        let motion = Arc::new(MotionController::new(GridState::new(4, 4).unwrap()));

        let empty = TrafficGenerator::new(
            GeneratorId(1),
            "empty",
            Duration::from_millis(10),
            &config,
            LaneSet::Vertical(Vec::new()),
            Arc::clone(&motion),
            None,
            ChaCha8Rng::seed_from_u64(0),
        );
        assert!(matches!(empty, Err(TrafficError::NoEligibleLanes)));

        let stalled = TrafficGenerator::new(
            GeneratorId(2),
            "stalled",
            Duration::ZERO,
            &config,
            LaneSet::Vertical(vec![0]),
            motion,
            None,
            ChaCha8Rng::seed_from_u64(0),
        );
        assert!(matches!(stalled, Err(TrafficError::InvalidConfig(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawns_on_cadence_and_drains_on_shutdown() {
        let config = SimulationConfig {
            maximum_speed_ms: 5,
            minimum_speed_ms: 5,
            ..SimulationConfig::default()
        };
        let motion = Arc::new(MotionController::new(GridState::new(10, 20).unwrap()));
        let collector = Arc::new(StatisticsCollector::new("cadence"));
        let generator = TrafficGenerator::new(
            GeneratorId(0),
            "cadence",
            Duration::from_millis(100),
            &config,
            LaneSet::Horizontal(vec![3]),
            Arc::clone(&motion),
            Some(Arc::clone(&collector)),
            ChaCha8Rng::seed_from_u64(5),
        )
        .unwrap();

        let (stop, shutdown) = watch::channel(false);
        let task = tokio::spawn(generator.run(shutdown));

        // Spawns at 100..=1000ms; each vehicle needs 100ms to cross 20 columns
        time::sleep(Duration::from_millis(1050)).await;
        stop.send(true).unwrap();

        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.spawned, 10);
        assert_eq!(summary.exited + summary.cancelled, 10);
        assert_eq!(summary.exited, collector.count() as u64);
        assert!(summary.exited >= 9);
        assert_eq!(motion.vehicle_count().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_saturation_wait_does_not_shorten_next_sleep() {
        let config = SimulationConfig {
            maximum_speed_ms: 5,
            minimum_speed_ms: 5,
            ..SimulationConfig::default()
        };
        let motion = Arc::new(MotionController::new(GridState::new(2, 50).unwrap()));
        let blockers = [VehicleId::new(), VehicleId::new()];
        motion
            .with_grid(|grid| {
                grid.place(blockers[0], Position::new(0, 0), Direction::West)?;
                grid.place(blockers[1], Position::new(1, 0), Direction::West)
            })
            .unwrap();
        let generator = generator(Arc::clone(&motion), LaneSet::Horizontal(vec![0, 1]), &config);

        let (stop, shutdown) = watch::channel(false);
        let task = tokio::spawn(generator.run(shutdown));

        // The 100ms attempt finds both entries taken and waits
        time::sleep(Duration::from_millis(350)).await;
        assert_eq!(motion.vehicle_count().unwrap(), 2);
        for blocker in blockers {
            motion.remove(blocker).unwrap();
        }

        // One vehicle for the vacancy, the next only a full frequency later
        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(motion.vehicle_count().unwrap(), 1);
        time::sleep(Duration::from_millis(60)).await;
        assert_eq!(motion.vehicle_count().unwrap(), 2);

        stop.send(true).unwrap();
        let summary = task.await.unwrap().unwrap();
        assert_eq!(summary.spawned, 2);
        assert_eq!(motion.vehicle_count().unwrap(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_vehicle_failure_cancels_remaining_vehicles() {
        let config = SimulationConfig {
            maximum_speed_ms: 50,
            minimum_speed_ms: 50,
            ..SimulationConfig::default()
        };
        let motion = Arc::new(MotionController::new(GridState::new(1, 50).unwrap()));
        let generator = generator(Arc::clone(&motion), LaneSet::Horizontal(vec![0]), &config);

        let (_stop, shutdown) = watch::channel(false);
        let task = tokio::spawn(generator.run(shutdown));

        // Vehicles enter at 100ms and 200ms; the leader is at column 2 by now
        time::sleep(Duration::from_millis(210)).await;
        assert_eq!(motion.vehicle_count().unwrap(), 2);
        let leader = motion
            .with_grid(|grid| {
                Ok((1..grid.columns()).find_map(|column| grid.occupant(Position::new(0, column))))
            })
            .unwrap()
            .unwrap()
            .vehicle;
        // Pulled off the grid behind its back: its next move is an invariant violation
        motion.with_grid(|grid| grid.remove(leader)).unwrap();

        let result = time::timeout(Duration::from_secs(1), task)
            .await
            .expect("generator kept running after a vehicle failed")
            .unwrap();
        match result {
            Err(err) => assert!(err.is_invariant_violation(), "{}", err),
            Ok(summary) => panic!("unexpected success {:?}", summary),
        }
        assert_eq!(motion.vehicle_count().unwrap(), 0);
        motion.check_invariants().unwrap();
    }
}
