//! Traffic actors: generators, vehicles, and the statistics they feed

pub mod generator;
pub mod statistics;
pub mod vehicle;

pub use generator::{GeneratorSummary, TrafficGenerator};
pub use statistics::{StatisticsCollector, StatisticsSink, TravelReport};
pub use vehicle::{Vehicle, VehicleAgent, VehicleOutcome};

use tokio::sync::watch;

/// Resolves once shutdown is signalled, or once the signal's owner is gone
pub(crate) async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    let _ = shutdown.wait_for(|stop| *stop).await;
}
