//! SVG renderer for layout snapshots and loss curves
//!
//! `SvgSnapshots` is the default diagnostics sink for a repair step: every
//! frame is a standalone SVG of the room and its assets.

pub mod chart;
pub mod config;
pub mod svg;

use std::path::Path;

use crate::cleanup::{BoxError, LossBreakdown, SnapshotSink};
use crate::layout::{Assets, Point};
use crate::stylesheet::Palette;

pub use chart::render_loss_curves;
pub use config::SvgConfig;
pub use svg::{render_layout, SvgBuilder, TextAnchor};

/// Writes repair frames and loss charts as SVG files
#[derive(Debug, Clone, Default)]
pub struct SvgSnapshots {
    pub config: SvgConfig,
    pub palette: Palette,
}

impl SvgSnapshots {
    pub fn new(config: SvgConfig, palette: Palette) -> Self {
        Self { config, palette }
    }
}

impl SnapshotSink for SvgSnapshots {
    fn render_snapshot(
        &mut self,
        boundary: &[Point],
        assets: &Assets,
        path: &Path,
    ) -> Result<(), BoxError> {
        let svg = render_layout(boundary, assets, &self.config, &self.palette);
        std::fs::write(path, svg)?;
        Ok(())
    }

    fn render_loss_curves(
        &mut self,
        history: &[LossBreakdown],
        path: &Path,
    ) -> Result<(), BoxError> {
        let svg = render_loss_curves(history, &self.config, &self.palette);
        std::fs::write(path, svg)?;
        Ok(())
    }
}
