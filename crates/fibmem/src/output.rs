//! Final report rendering: the two console lines, or JSON.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::sampler::Measurement;

/// Output format for the final report.
///
/// * `Table` - the two human-readable lines (default)
/// * `Json` - compact JSON on a single line
/// * `JsonPretty` - indented JSON
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum Format {
    #[default]
    Table,
    Json,
    JsonPretty,
}

/// Which Fibonacci implementation produced the value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Memoized,
    Naive,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Strategy::Memoized => write!(f, "memoized"),
            Strategy::Naive => write!(f, "naive"),
        }
    }
}

/// Summary of one measured Fibonacci run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub n: u64,
    pub strategy: Strategy,
    /// Serialized as a string, JSON numbers can't carry 128 bits.
    pub value: String,
    pub elapsed_secs: f64,
    pub peak_bytes: u64,
    pub peak_mb: f64,
    pub samples: u64,
    pub failed_samples: u64,
    pub sample_interval_ms: u64,
}

impl Report {
    pub fn new(
        n: u64,
        strategy: Strategy,
        measurement: &Measurement<u128>,
        sample_interval: Duration,
    ) -> Self {
        Self {
            n,
            strategy,
            value: measurement.value.to_string(),
            elapsed_secs: measurement.elapsed.as_secs_f64(),
            peak_bytes: measurement.peak_bytes,
            peak_mb: bytes_to_megabytes(measurement.peak_bytes),
            samples: measurement.samples,
            failed_samples: measurement.failed_samples,
            sample_interval_ms: sample_interval.as_millis() as u64,
        }
    }

    pub fn render(&self, format: Format) -> Result<String, serde_json::Error> {
        match format {
            Format::Table => Ok(self.to_string()),
            Format::Json => serde_json::to_string(self),
            Format::JsonPretty => serde_json::to_string_pretty(self),
        }
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Execution time: {:.2} seconds", self.elapsed_secs)?;
        write!(f, "Maximum memory usage: {}", format_megabytes(self.peak_bytes))
    }
}

fn bytes_to_megabytes(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

/// Formats a byte count as megabytes with two decimals, e.g. `"1.50 MB"`.
pub fn format_megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes_to_megabytes(bytes))
}
