//! Travel-time statistics
//!
//! Vehicles report how long they spent on the grid to a `StatisticsSink`.
//! `StatisticsCollector` keeps every sample for one generator and produces a
//! `TravelReport` when the owner asks for it at the end of a run.

use serde::Serialize;
use std::fmt;
use std::sync::{Mutex, PoisonError};

const NANOS_PER_SECOND: f64 = 1_000_000_000.0;

/// Receives one travel-time sample per finished vehicle.
///
/// Called concurrently from many vehicle tasks.
pub trait StatisticsSink: Send + Sync {
    fn record_travel_time(&self, duration_nanos: u64);
}

/// Collects travel times for one generator
#[derive(Debug)]
pub struct StatisticsCollector {
    name: String,
    times: Mutex<Vec<u64>>,
}

impl StatisticsCollector {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            times: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of samples recorded so far
    pub fn count(&self) -> usize {
        self.times.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Summarise the samples recorded so far. `None` if no vehicle finished.
    pub fn report(&self) -> Option<TravelReport> {
        let times = self.times.lock().unwrap_or_else(PoisonError::into_inner);
        TravelReport::from_samples(&self.name, &times)
    }
}

impl StatisticsSink for StatisticsCollector {
    fn record_travel_time(&self, duration_nanos: u64) {
        // A Vec push cannot be left half-done, so a poisoned lock is still usable
        self.times
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(duration_nanos);
    }
}

/// Summary of one generator's travel times, in nanoseconds
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TravelReport {
    pub name: String,
    pub count: usize,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    /// Population variance (divides by `count`)
    pub variance: f64,
}

impl TravelReport {
    pub fn from_samples(name: &str, samples: &[u64]) -> Option<Self> {
        let min = *samples.iter().min()?;
        let max = *samples.iter().max()?;
        let count = samples.len();

        let mean = samples.iter().map(|&t| t as f64).sum::<f64>() / count as f64;
        let variance = samples
            .iter()
            .map(|&t| {
                let diff = t as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / count as f64;

        Some(Self {
            name: name.to_string(),
            count,
            min,
            max,
            mean,
            variance,
        })
    }
}

impl fmt::Display for TravelReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Report for Generator - {}", self.name)?;
        writeln!(f, "========================================")?;
        writeln!(f, "Number of vehicles generated : {}", self.count)?;
        writeln!(
            f,
            "Minimum travel time : {:.5}s",
            self.min as f64 / NANOS_PER_SECOND
        )?;
        writeln!(
            f,
            "Maximum travel time : {:.5}s",
            self.max as f64 / NANOS_PER_SECOND
        )?;
        writeln!(f, "Mean travel time : {:.5}s", self.mean / NANOS_PER_SECOND)?;
        write!(
            f,
            "Variance of travel times : {:.5}s²",
            self.variance / (NANOS_PER_SECOND * NANOS_PER_SECOND)
        )
    }
}
