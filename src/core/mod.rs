pub mod config;
pub mod error;
pub mod types;

pub use config::{GeneratorConfig, LaneReversal, LaneSpec, ScenarioConfig, SimulationConfig, VisualisationConfig};
pub use error::{Result, TrafficError};
pub use types::{Direction, GeneratorId, LaneAxis, Position, VehicleId};
