//! Telemetry dataset loading.
//!
//! The dataset is a JSON array of `{region, latency_ms, uptime_pct}` objects
//! read once at startup. After loading it is never mutated, so it is shared
//! between request handlers without locking.

use crate::models::TelemetryRecord;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors raised while loading the dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("failed to read dataset {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse dataset {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Read-only set of telemetry samples.
#[derive(Debug, Clone)]
pub struct Dataset {
    records: Arc<[TelemetryRecord]>,
}

impl Dataset {
    /// Load the dataset from a JSON file.
    pub fn load(path: &Path) -> Result<Self, DatasetError> {
        debug!("Reading dataset from {}", path.display());

        let content = std::fs::read_to_string(path).map_err(|source| DatasetError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let records: Vec<TelemetryRecord> =
            serde_json::from_str(&content).map_err(|source| DatasetError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let suspicious = records.iter().filter(|r| r.is_out_of_range()).count();
        if suspicious > 0 {
            warn!(
                "{} of {} samples have negative latency or uptime outside 0-100",
                suspicious,
                records.len()
            );
        }

        info!("Loaded {} telemetry samples", records.len());
        Ok(Self::from_records(records))
    }

    /// Build a dataset from records already in memory.
    pub fn from_records(records: Vec<TelemetryRecord>) -> Self {
        Self {
            records: records.into(),
        }
    }

    /// All samples recorded for `region`, in file order.
    pub fn records_for_region(&self, region: &str) -> Vec<&TelemetryRecord> {
        self.records.iter().filter(|r| r.region == region).collect()
    }

    /// Distinct regions with their sample counts, in first-seen order.
    pub fn regions(&self) -> Vec<(String, usize)> {
        let mut counts: indexmap::IndexMap<&str, usize> = indexmap::IndexMap::new();

        for record in self.records.iter() {
            *counts.entry(record.region.as_str()).or_default() += 1;
        }

        counts
            .into_iter()
            .map(|(region, count)| (region.to_string(), count))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
