//! Data models for the latency API.
//!
//! This module contains the telemetry records loaded at startup, the
//! request body accepted by the aggregation endpoint, and the per-region
//! statistics returned to callers.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// A single telemetry sample for one region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Region the sample was taken in.
    pub region: String,
    /// Observed latency in milliseconds.
    pub latency_ms: f64,
    /// Uptime percentage (0-100) at the time of the sample.
    pub uptime_pct: f64,
}

impl TelemetryRecord {
    /// Creates a new record.
    #[cfg(test)]
    pub fn new(region: impl Into<String>, latency_ms: f64, uptime_pct: f64) -> Self {
        Self {
            region: region.into(),
            latency_ms,
            uptime_pct,
        }
    }

    /// Returns true if the sample holds values outside their expected ranges.
    pub fn is_out_of_range(&self) -> bool {
        self.latency_ms < 0.0 || !(0.0..=100.0).contains(&self.uptime_pct)
    }
}

/// Aggregated statistics for a single region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegionStats {
    /// Mean latency, rounded to 2 decimals.
    pub avg_latency: f64,
    /// 95th percentile latency, rounded to 2 decimals.
    pub p95_latency: f64,
    /// Mean uptime, rounded to 3 decimals.
    pub avg_uptime: f64,
    /// Number of samples whose latency exceeded the threshold.
    pub breaches: usize,
}

/// Region name to statistics, in first-insertion order.
pub type LatencyReport = IndexMap<String, RegionStats>;

/// Body of `POST /api/latency`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyQuery {
    /// Regions to aggregate. Unknown regions are ignored.
    #[serde(default)]
    pub regions: Vec<String>,
    /// Latency above which a sample counts as a breach.
    #[serde(default)]
    pub threshold_ms: f64,
}

/// Plain message payload used by the informational endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
