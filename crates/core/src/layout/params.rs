//! Clustering parameters.
//!
//! Contains ClusteringParams for controlling the merge loop and neighbour
//! discovery.

use serde::{Deserialize, Serialize};

use crate::error::{ClusterError, Result};

/// Parameters for box clustering.
///
/// Controls how far neighbour discovery searches, which relations are
/// eligible for merging and when the merge loop gives up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusteringParams {
    /// Relations scoring above this are never merged. Range: [0.0, 1.0].
    pub clustering_threshold: f64,

    /// Once the merge loop has run this many iterations, a relation between
    /// two clusters aborts the loop instead of merging them.
    pub cluster_iteration_cap: usize,

    /// Step by which the search strip grows to the left and right.
    pub lateral_step: f64,

    /// Step by which the search strip grows upwards and downwards.
    pub vertical_step: f64,

    /// Container removal passes. A box whose shrunk rectangle intersects more
    /// than `container_limits[pass]` other entities is dropped.
    pub container_limits: Vec<usize>,

    /// Amount by which rectangles are shrunk before overlap queries.
    pub shrink: f64,

    /// Upper bound on absorption rounds for a single merge candidate.
    pub max_absorption_rounds: usize,

    /// Run neighbour discovery on the rayon thread pool.
    pub parallel_discovery: bool,
}

impl Default for ClusteringParams {
    fn default() -> Self {
        Self {
            clustering_threshold: 0.2,
            cluster_iteration_cap: 50,
            lateral_step: 100.0,
            vertical_step: 50.0,
            container_limits: vec![2, 1],
            shrink: 1.0,
            max_absorption_rounds: 1024,
            parallel_discovery: true,
        }
    }
}

impl ClusteringParams {
    /// Creates clustering parameters with the given threshold and defaults
    /// for everything else.
    pub fn with_threshold(clustering_threshold: f64) -> Result<Self> {
        let params = Self {
            clustering_threshold,
            ..Self::default()
        };
        params.validate()?;
        Ok(params)
    }

    /// Checks that every field is in range.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.clustering_threshold) {
            return Err(invalid(
                "clustering_threshold",
                format!("expected 0..=1, got {}", self.clustering_threshold),
            ));
        }
        if !(self.lateral_step.is_finite() && self.lateral_step > 0.0) {
            return Err(invalid(
                "lateral_step",
                format!("expected a positive step, got {}", self.lateral_step),
            ));
        }
        if !(self.vertical_step.is_finite() && self.vertical_step > 0.0) {
            return Err(invalid(
                "vertical_step",
                format!("expected a positive step, got {}", self.vertical_step),
            ));
        }
        if !(self.shrink.is_finite() && self.shrink >= 0.0) {
            return Err(invalid(
                "shrink",
                format!("expected a non-negative amount, got {}", self.shrink),
            ));
        }
        if self.max_absorption_rounds == 0 {
            return Err(invalid("max_absorption_rounds", "must be at least 1".into()));
        }
        Ok(())
    }
}

fn invalid(name: &'static str, reason: String) -> ClusterError {
    ClusterError::InvalidParams { name, reason }
}
