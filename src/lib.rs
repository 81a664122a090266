//! Layout Repair - local cleanup of overlapping furniture after layout optimization
//!
//! This library provides the overlap detector, the freeze/restore guard and the
//! local gradient repair loop, plus a TOML reference scene and an SVG renderer
//! for diagnostic frames.
//!
//! # Example
//!
//! ```rust
//! use layout_repair::repair;
//!
//! let outcome = repair(r#"
//!     [room]
//!     boundary = [[0, 0], [5, 0], [5, 4], [0, 4]]
//!
//!     [[asset]]
//!     id = "bed"
//!     size = [2.0, 1.6]
//!     position = [2.0, 2.0]
//!
//!     [[asset]]
//!     id = "desk"
//!     size = [1.2, 0.6]
//!     position = [2.5, 2.0]
//! "#).unwrap();
//!
//! assert_eq!(outcome.report.problematic.len(), 2);
//! ```

pub mod cleanup;
pub mod error;
pub mod layout;
pub mod renderer;
pub mod scene;
pub mod stylesheet;

pub use cleanup::{
    repair_assets, run_cleanup_step, run_cleanup_step_with, CleanupConfig, CleanupError,
    CleanupReport, LayoutSolver, OverlapPair, SnapshotSink,
};
pub use error::SceneError;
pub use layout::{Asset, Assets, Footprint, GeometryError, Point, Shape};
pub use renderer::{render_layout, SvgConfig, SvgSnapshots};
pub use scene::{Scene, SceneConstraint};

use thiserror::Error;

// Re-export Palette for public API
pub use stylesheet::Palette;

/// Errors that can occur during the repair pipeline
#[derive(Debug, Error)]
pub enum RepairError {
    /// Error while loading the scene
    #[error("scene error: {0}")]
    Scene(#[from] SceneError),

    /// Error raised during the repair step
    #[error("repair error: {0}")]
    Cleanup(#[from] CleanupError),
}

/// Configuration for the complete repair pipeline
#[derive(Debug, Clone, Default)]
pub struct RepairConfig {
    /// Repair settings; `None` uses the scene's `[cleanup]` table
    pub cleanup: Option<CleanupConfig>,
    /// SVG output configuration for frames
    pub svg: SvgConfig,
    /// Palette for frames and loss charts
    pub palette: Palette,
}

impl RepairConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the scene's repair settings
    pub fn with_cleanup(mut self, config: CleanupConfig) -> Self {
        self.cleanup = Some(config);
        self
    }

    /// Set the SVG configuration
    pub fn with_svg(mut self, config: SvgConfig) -> Self {
        self.svg = config;
        self
    }

    /// Set the palette for color resolution
    pub fn with_palette(mut self, palette: Palette) -> Self {
        self.palette = palette;
        self
    }
}

/// A repaired scene together with what the repair did
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub scene: Scene,
    pub report: CleanupReport,
}

/// Load scene TOML and run one repair step with the scene's own settings
pub fn repair(source: &str) -> Result<RepairOutcome, RepairError> {
    repair_with_config(source, RepairConfig::default())
}

/// Load scene TOML and run one repair step with custom configuration
pub fn repair_with_config(source: &str, config: RepairConfig) -> Result<RepairOutcome, RepairError> {
    let scene = Scene::from_str(source)?;
    repair_scene(scene, &config)
}

/// Run one repair step on an already loaded scene
pub fn repair_scene(mut scene: Scene, config: &RepairConfig) -> Result<RepairOutcome, RepairError> {
    let cleanup = config
        .cleanup
        .clone()
        .unwrap_or_else(|| scene.cleanup_config().clone());
    let existing = scene.existing_constraints().to_vec();
    let new = scene.new_constraints().to_vec();

    let mut sink = SvgSnapshots::new(config.svg.clone(), config.palette.clone());
    let report = run_cleanup_step_with(&mut scene, &existing, &new, &cleanup, &mut sink)?;
    Ok(RepairOutcome { scene, report })
}
