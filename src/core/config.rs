//! Simulation configuration
//!
//! Every tunable of the simulation lives in an explicit object that is handed
//! to constructors. Nothing here is process-wide state; a scenario file is
//! decoded into these types with `toml` and validated before any actor starts.

use crate::core::error::{Result, TrafficError};
use crate::core::types::LaneAxis;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Configuration for the grid and the vehicles placed on it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Number of horizontal lanes
    pub grid_rows: usize,

    /// Number of vertical lanes
    pub grid_columns: usize,

    /// Shortest delay between two moves of a vehicle (milliseconds).
    ///
    /// Lower delay means a faster vehicle, so this is the *maximum speed*
    /// even though it is the smaller number.
    pub maximum_speed_ms: u64,

    /// Longest delay between two moves of a vehicle (milliseconds)
    pub minimum_speed_ms: u64,

    /// Seed for the generators' random choices; entropy when absent
    pub seed: Option<u64>,

    pub visualisation: VisualisationConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            grid_rows: 10,
            grid_columns: 20,
            maximum_speed_ms: 80,
            minimum_speed_ms: 450,
            seed: None,
            visualisation: VisualisationConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lower bound on the inter-move delay
    pub fn maximum_speed(&self) -> Duration {
        Duration::from_millis(self.maximum_speed_ms)
    }

    /// Upper bound on the inter-move delay
    pub fn minimum_speed(&self) -> Duration {
        Duration::from_millis(self.minimum_speed_ms)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.grid_rows == 0 || self.grid_columns == 0 {
            return Err(TrafficError::InvalidDimensions {
                rows: self.grid_rows,
                columns: self.grid_columns,
            });
        }

        if self.maximum_speed_ms == 0 || self.maximum_speed_ms > self.minimum_speed_ms {
            return Err(TrafficError::InvalidSpeedBounds {
                maximum_ms: self.maximum_speed_ms,
                minimum_ms: self.minimum_speed_ms,
            });
        }

        self.visualisation.validate()
    }
}

/// Settings for the console visualiser
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisualisationConfig {
    /// Number of frames to draw before the run ends
    pub frames: u32,

    /// Delay between two frames (milliseconds)
    pub refresh_ms: u64,

    /// Symbol for a vehicle travelling along a row
    pub horizontal_symbol: char,

    /// Symbol for a vehicle travelling along a column
    pub vertical_symbol: char,
}

impl Default for VisualisationConfig {
    fn default() -> Self {
        Self {
            frames: 2000,
            refresh_ms: 20,
            horizontal_symbol: '-',
            vertical_symbol: 'o',
        }
    }
}

impl VisualisationConfig {
    pub fn refresh_rate(&self) -> Duration {
        Duration::from_millis(self.refresh_ms)
    }

    fn validate(&self) -> Result<()> {
        if self.refresh_ms == 0 {
            return Err(TrafficError::InvalidConfig(
                "visualisation.refresh_ms must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Lanes a generator is responsible for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LaneSpec {
    /// Every lane not claimed by a specific generator, on both axes
    Default,
    /// Rows in `[from, to)`
    Horizontal { from: usize, to: usize },
    /// Columns in `[from, to)`
    Vertical { from: usize, to: usize },
}

/// One generator entry of a scenario
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    /// Name used in logs and in the travel-time report
    pub name: String,

    /// Delay between two spawns (milliseconds)
    pub frequency_ms: u64,

    pub lanes: LaneSpec,

    /// Attach a statistics collector to every vehicle this generator spawns
    #[serde(default)]
    pub monitored: bool,
}

impl GeneratorConfig {
    pub fn frequency(&self) -> Duration {
        Duration::from_millis(self.frequency_ms)
    }
}

/// Lane direction flip applied before generators start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaneReversal {
    pub axis: LaneAxis,
    pub from: usize,
    pub to: usize,
}

/// A complete runnable scenario
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioConfig {
    pub simulation: SimulationConfig,
    pub reversals: Vec<LaneReversal>,
    pub generators: Vec<GeneratorConfig>,
}

impl ScenarioConfig {
    /// Parse a scenario from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: ScenarioConfig = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Load a scenario from a TOML file on disk
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// One default generator spawning every 250ms
    pub fn basic() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            reversals: Vec::new(),
            generators: vec![GeneratorConfig {
                name: "Default".into(),
                frequency_ms: 250,
                lanes: LaneSpec::Default,
                monitored: false,
            }],
        }
    }

    /// Reversed lanes plus three monitored generators with disjoint lanes
    pub fn mixed() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            reversals: vec![
                LaneReversal {
                    axis: LaneAxis::Horizontal,
                    from: 5,
                    to: 10,
                },
                LaneReversal {
                    axis: LaneAxis::Vertical,
                    from: 10,
                    to: 20,
                },
            ],
            generators: vec![
                GeneratorConfig {
                    name: "Default".into(),
                    frequency_ms: 350,
                    lanes: LaneSpec::Default,
                    monitored: true,
                },
                GeneratorConfig {
                    name: "Horizontal Generator".into(),
                    frequency_ms: 500,
                    lanes: LaneSpec::Horizontal { from: 5, to: 10 },
                    monitored: true,
                },
                GeneratorConfig {
                    name: "Vertical Generator".into(),
                    frequency_ms: 600,
                    lanes: LaneSpec::Vertical { from: 10, to: 20 },
                    monitored: true,
                },
            ],
        }
    }

    /// Validate everything that can be checked without building the grid.
    ///
    /// Lane overlaps are checked at registration time by the lane registry.
    pub fn validate(&self) -> Result<()> {
        self.simulation.validate()?;

        if self.generators.is_empty() {
            return Err(TrafficError::InvalidConfig(
                "scenario declares no generators".into(),
            ));
        }

        for generator in &self.generators {
            if generator.frequency_ms == 0 {
                return Err(TrafficError::InvalidConfig(format!(
                    "generator '{}' has zero frequency_ms",
                    generator.name
                )));
            }
        }

        Ok(())
    }
}
