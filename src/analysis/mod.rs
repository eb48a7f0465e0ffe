//! Telemetry analysis modules.
//!
//! This module contains the per-region statistics computed for each
//! aggregation request.

pub mod aggregator;

pub use aggregator::*;
