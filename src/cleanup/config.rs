//! Configuration for the local repair step

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Tunables for one repair step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupConfig {
    /// Number of optimizer steps
    pub iterations: usize,

    /// Adam learning rate
    pub learning_rate: f64,

    /// Run feasibility projection every this many steps; 0 disables it
    pub projection_interval: usize,

    /// Write a layout snapshot every this many steps (the last step is always written)
    pub snapshot_interval: usize,

    /// Damping applied to the summed loss terms
    pub loss_scale: f64,

    /// Upper bound on the global gradient norm
    pub max_grad_norm: f64,

    /// Directory for snapshot frames and loss curves
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagnostics_dir: Option<PathBuf>,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            iterations: 40,
            learning_rate: 0.01,
            projection_interval: 10,
            snapshot_interval: 10,
            loss_scale: 0.01,
            max_grad_norm: 1.0,
            diagnostics_dir: None,
        }
    }
}

impl CleanupConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_learning_rate(mut self, learning_rate: f64) -> Self {
        self.learning_rate = learning_rate;
        self
    }

    pub fn with_projection_interval(mut self, interval: usize) -> Self {
        self.projection_interval = interval;
        self
    }

    pub fn with_snapshot_interval(mut self, interval: usize) -> Self {
        self.snapshot_interval = interval;
        self
    }

    pub fn with_loss_scale(mut self, scale: f64) -> Self {
        self.loss_scale = scale;
        self
    }

    pub fn with_max_grad_norm(mut self, max_norm: f64) -> Self {
        self.max_grad_norm = max_norm;
        self
    }

    /// Enable snapshot frames and loss curves under `dir`
    pub fn with_diagnostics_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.diagnostics_dir = Some(dir.into());
        self
    }

    /// Whether step `i` should be projected
    pub(crate) fn projects_after(&self, i: usize) -> bool {
        self.projection_interval > 0 && (i + 1) % self.projection_interval == 0
    }

    /// Whether step `i` should produce a snapshot frame
    pub(crate) fn snapshots_at(&self, i: usize) -> bool {
        let periodic = self.snapshot_interval > 0 && i % self.snapshot_interval == 0;
        periodic || i + 1 == self.iterations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = CleanupConfig::default();
        assert_eq!(config.iterations, 40);
        assert_eq!(config.learning_rate, 0.01);
        assert_eq!(config.projection_interval, 10);
        assert_eq!(config.loss_scale, 0.01);
        assert_eq!(config.max_grad_norm, 1.0);
        assert!(config.diagnostics_dir.is_none());
    }

    #[test]
    fn test_builder() {
        let config = CleanupConfig::new()
            .with_iterations(5)
            .with_learning_rate(0.1)
            .with_diagnostics_dir("frames");
        assert_eq!(config.iterations, 5);
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.diagnostics_dir, Some(PathBuf::from("frames")));
    }

    #[test]
    fn test_partial_table_keeps_defaults() {
        let config: CleanupConfig = toml::from_str("iterations = 12\nprojection_interval = 0").unwrap();
        assert_eq!(
            config,
            CleanupConfig::default()
                .with_iterations(12)
                .with_projection_interval(0)
        );
    }

    #[test]
    fn test_projection_schedule() {
        let config = CleanupConfig::default();
        let steps: Vec<usize> = (0..40).filter(|&i| config.projects_after(i)).collect();
        assert_eq!(steps, vec![9, 19, 29, 39]);

        let disabled = config.with_projection_interval(0);
        assert!((0..40).all(|i| !disabled.projects_after(i)));
    }

    #[test]
    fn test_snapshot_schedule_includes_last_step() {
        let config = CleanupConfig::default();
        let frames: Vec<usize> = (0..40).filter(|&i| config.snapshots_at(i)).collect();
        assert_eq!(frames, vec![0, 10, 20, 30, 39]);
    }
}
