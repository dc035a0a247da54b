//! Simulation lifecycle
//!
//! `Simulation` owns the grid, the lane registry and the generators. Lanes and
//! generators are configured up front, `start()` launches one task per
//! generator, and `shutdown()` stops every actor and returns the reports.

use crate::core::config::{GeneratorConfig, LaneSpec, ScenarioConfig, SimulationConfig};
use crate::core::error::{Result, TrafficError};
use crate::core::types::{GeneratorId, LaneAxis};
use crate::grid::lanes::LaneRegistry;
use crate::grid::motion::{GridView, MotionController};
use crate::grid::state::GridState;
use crate::traffic::generator::{GeneratorSummary, TrafficGenerator};
use crate::traffic::statistics::{StatisticsCollector, TravelReport};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// A generator registered but not yet running
struct PendingGenerator {
    id: GeneratorId,
    name: String,
    frequency: Duration,
    collector: Option<Arc<StatisticsCollector>>,
}

/// Everything a finished run produced
#[derive(Debug, Clone, Default)]
pub struct SimulationReport {
    pub generators: Vec<GeneratorSummary>,
    /// One entry per monitored generator that saw at least one vehicle finish
    pub travel: Vec<TravelReport>,
}

pub struct Simulation {
    config: SimulationConfig,
    motion: Arc<MotionController>,
    registry: LaneRegistry,
    pending: Vec<PendingGenerator>,
    collectors: Vec<Arc<StatisticsCollector>>,
    shutdown: watch::Sender<bool>,
    running: Vec<JoinHandle<Result<GeneratorSummary>>>,
    started: bool,
}

impl Simulation {
    pub fn new(config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        let grid = GridState::new(config.grid_rows, config.grid_columns)?;
        let registry = LaneRegistry::new(config.grid_rows, config.grid_columns)?;
        let (shutdown, _) = watch::channel(false);

        Ok(Self {
            config,
            motion: Arc::new(MotionController::new(grid)),
            registry,
            pending: Vec::new(),
            collectors: Vec::new(),
            shutdown,
            running: Vec::new(),
            started: false,
        })
    }

    /// Build a simulation with the scenario's reversals and generators applied
    pub fn from_scenario(scenario: &ScenarioConfig) -> Result<Self> {
        scenario.validate()?;
        let mut simulation = Self::new(scenario.simulation.clone())?;

        for reversal in &scenario.reversals {
            simulation.reverse_lanes(reversal.axis, reversal.from, reversal.to)?;
        }
        for generator in &scenario.generators {
            simulation.add_generator(generator)?;
        }

        Ok(simulation)
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Shared handle to the guarded grid
    pub fn motion(&self) -> Arc<MotionController> {
        Arc::clone(&self.motion)
    }

    /// Read-only view for renderers
    pub fn view(&self) -> Arc<dyn GridView> {
        self.motion.clone()
    }

    /// Receiver that turns true when the simulation shuts down
    pub fn shutdown_signal(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    pub fn is_running(&self) -> bool {
        self.started
    }

    /// Flip lane directions in `[from, to)`. Only allowed before `start()`.
    pub fn reverse_lanes(&self, axis: LaneAxis, from: usize, to: usize) -> Result<()> {
        if self.started {
            return Err(TrafficError::AlreadyStarted);
        }
        self.motion.reverse_lanes(axis, from, to)?;
        tracing::info!(%axis, from, to, "Lanes reversed");
        Ok(())
    }

    /// Register a generator described by a scenario entry
    pub fn add_generator(&mut self, generator: &GeneratorConfig) -> Result<GeneratorId> {
        let frequency = generator.frequency();
        match generator.lanes {
            LaneSpec::Default => {
                self.add_default_generator(&generator.name, frequency, generator.monitored)
            }
            LaneSpec::Horizontal { from, to } => self.add_horizontal_generator(
                &generator.name,
                frequency,
                generator.monitored,
                from,
                to,
            ),
            LaneSpec::Vertical { from, to } => self.add_vertical_generator(
                &generator.name,
                frequency,
                generator.monitored,
                from,
                to,
            ),
        }
    }

    /// Register the generator serving every lane no specific generator owns
    pub fn add_default_generator(
        &mut self,
        name: &str,
        frequency: Duration,
        monitored: bool,
    ) -> Result<GeneratorId> {
        self.ensure_configurable(frequency)?;
        let id = self.registry.register_default()?;
        self.push_pending(id, name, frequency, monitored);
        Ok(id)
    }

    /// Register a generator owning rows `[from, to)`
    pub fn add_horizontal_generator(
        &mut self,
        name: &str,
        frequency: Duration,
        monitored: bool,
        from: usize,
        to: usize,
    ) -> Result<GeneratorId> {
        self.ensure_configurable(frequency)?;
        let id = self.registry.register_horizontal(from, to)?;
        self.push_pending(id, name, frequency, monitored);
        Ok(id)
    }

    /// Register a generator owning columns `[from, to)`
    pub fn add_vertical_generator(
        &mut self,
        name: &str,
        frequency: Duration,
        monitored: bool,
        from: usize,
        to: usize,
    ) -> Result<GeneratorId> {
        self.ensure_configurable(frequency)?;
        let id = self.registry.register_vertical(from, to)?;
        self.push_pending(id, name, frequency, monitored);
        Ok(id)
    }

    /// Lane assignment as registered so far
    pub fn lanes(&self) -> &LaneRegistry {
        &self.registry
    }

    fn ensure_configurable(&self, frequency: Duration) -> Result<()> {
        if self.started {
            return Err(TrafficError::AlreadyStarted);
        }
        if frequency.is_zero() {
            return Err(TrafficError::InvalidConfig(
                "generator frequency must be positive".into(),
            ));
        }
        Ok(())
    }

    fn push_pending(&mut self, id: GeneratorId, name: &str, frequency: Duration, monitored: bool) {
        let collector = monitored.then(|| Arc::new(StatisticsCollector::new(name)));
        if let Some(collector) = &collector {
            self.collectors.push(Arc::clone(collector));
        }
        tracing::debug!(generator = name, id = id.0, monitored, "Generator registered");
        self.pending.push(PendingGenerator {
            id,
            name: name.to_string(),
            frequency,
            collector,
        });
    }

    fn generator_rng(&self, id: GeneratorId) -> ChaCha8Rng {
        match self.config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed.wrapping_add(u64::from(id.0))),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Launch every registered generator. Must be called inside a tokio runtime.
    pub fn start(&mut self) -> Result<()> {
        if self.started {
            return Err(TrafficError::AlreadyStarted);
        }
        if self.pending.is_empty() {
            return Err(TrafficError::InvalidConfig("no generators registered".into()));
        }

        let mut generators = Vec::with_capacity(self.pending.len());
        for pending in &self.pending {
            let lanes = self
                .registry
                .lane_set(pending.id)
                .ok_or(TrafficError::NoEligibleLanes)?;
            generators.push(TrafficGenerator::new(
                pending.id,
                pending.name.clone(),
                pending.frequency,
                &self.config,
                lanes,
                Arc::clone(&self.motion),
                pending.collector.clone(),
                self.generator_rng(pending.id),
            )?);
        }

        for generator in generators {
            self.running
                .push(tokio::spawn(generator.run(self.shutdown.subscribe())));
        }
        self.started = true;

        tracing::info!(
            rows = self.config.grid_rows,
            columns = self.config.grid_columns,
            generators = self.running.len(),
            "Simulation started"
        );
        Ok(())
    }

    /// Stop every generator and vehicle, then produce the run's reports
    pub async fn shutdown(self) -> Result<SimulationReport> {
        self.shutdown.send_replace(true);

        let mut report = SimulationReport::default();
        let mut first_error = None;
        for handle in self.running {
            match handle.await {
                Ok(Ok(summary)) => report.generators.push(summary),
                Ok(Err(err)) => {
                    first_error.get_or_insert(err);
                }
                Err(err) => {
                    first_error.get_or_insert(TrafficError::from(err));
                }
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        self.motion.check_invariants()?;
        report.travel = self
            .collectors
            .iter()
            .filter_map(|collector| collector.report())
            .collect();

        tracing::info!(
            vehicles_left = self.motion.vehicle_count()?,
            reports = report.travel.len(),
            "Simulation finished"
        );
        Ok(report)
    }
}
