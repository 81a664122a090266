//! Local repair of an optimized furniture layout
//!
//! After a global optimization pass a few items may still overlap. A repair step
//! finds those items, freezes everything else, and runs a short gradient loop
//! that moves only the overlapping items. Periodic projection keeps them inside
//! their feasible regions.
//!
//! ```text
//! detect pairs -> problematic set -> freeze -> collect params -> loop -> restore
//! ```
//!
//! The solver is reached through the [`LayoutSolver`] trait and snapshots
//! through [`SnapshotSink`], so the core has no opinion on how losses are
//! computed or how frames are drawn.

pub mod config;
pub mod detect;
pub mod error;
pub mod guard;
pub mod optimizer;
pub mod penalty;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::layout::{Assets, Point};
use crate::renderer::SvgSnapshots;

pub use config::CleanupConfig;
pub use detect::{find_overlapping_pairs, problematic_assets, OverlapPair};
pub use error::CleanupError;
pub use guard::{FreezeGuard, SavedState};
pub use optimizer::{clip_grad_norm, collect_parameters, zero_grad, Adam};
pub use penalty::{LossBreakdown, LossContext, LossTerms, Penalty};

/// Boxed collaborator error
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The differentiable layout a repair step operates on
pub trait LayoutSolver {
    /// Constraint representation understood by the loss and projection
    type Constraint: Clone;
    type Error: std::error::Error + Send + Sync + 'static;

    fn assets(&self) -> &Assets;
    fn assets_mut(&mut self) -> &mut Assets;

    /// Immovable items such as walls, doors and windows
    fn is_fixture(&self, id: &str) -> bool;

    /// Declared (below, above) stacking relations
    fn on_top_of(&self) -> &[(String, String)];

    /// Room outline, used only for snapshots
    fn boundary(&self) -> &[Point];

    /// Evaluate the four penalty terms at the current poses
    fn compute_losses(
        &mut self,
        existing: &[Self::Constraint],
        new: &[Self::Constraint],
        ctx: LossContext,
    ) -> Result<LossTerms, Self::Error>;

    /// Snap poses back onto the feasible region of `constraints`
    fn project_to_feasible(&mut self, constraints: &[Self::Constraint]) -> Result<(), Self::Error>;
}

/// Destination for diagnostic frames
pub trait SnapshotSink {
    fn render_snapshot(
        &mut self,
        boundary: &[Point],
        assets: &Assets,
        path: &Path,
    ) -> Result<(), BoxError>;

    fn render_loss_curves(
        &mut self,
        history: &[LossBreakdown],
        path: &Path,
    ) -> Result<(), BoxError> {
        let _ = (history, path);
        Ok(())
    }
}

/// What a repair step found and did
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanupReport {
    pub overlap_pairs: BTreeSet<OverlapPair>,
    pub problematic: BTreeSet<String>,
    /// Optimizer updates applied
    pub steps: usize,
    pub projections: usize,
    /// The loss lost its gradient before the iteration budget ran out
    pub stopped_early: bool,
    pub history: Vec<LossBreakdown>,
    pub frames: Vec<PathBuf>,
}

impl CleanupReport {
    /// No overlaps were found, so nothing ran
    pub fn is_noop(&self) -> bool {
        self.overlap_pairs.is_empty()
    }
}

/// Detect overlaps and repair them, writing SVG frames when configured
pub fn run_cleanup_step<S: LayoutSolver + ?Sized>(
    solver: &mut S,
    existing: &[S::Constraint],
    new: &[S::Constraint],
    config: &CleanupConfig,
) -> Result<CleanupReport, CleanupError> {
    let mut sink = SvgSnapshots::default();
    run_cleanup_step_with(solver, existing, new, config, &mut sink)
}

/// Same as [`run_cleanup_step`] with a caller-provided snapshot sink
pub fn run_cleanup_step_with<S: LayoutSolver + ?Sized>(
    solver: &mut S,
    existing: &[S::Constraint],
    new: &[S::Constraint],
    config: &CleanupConfig,
    sink: &mut dyn SnapshotSink,
) -> Result<CleanupReport, CleanupError> {
    let view: &S = solver;
    let pairs = find_overlapping_pairs(view.assets(), |id| view.is_fixture(id), view.on_top_of());
    if pairs.is_empty() {
        info!("no overlapping assets, nothing to repair");
        return Ok(CleanupReport::default());
    }

    let problematic = problematic_assets(&pairs);
    info!(
        pairs = pairs.len(),
        assets = ?problematic,
        "repairing overlapping assets"
    );

    let mut report = repair_assets(solver, &problematic, existing, new, config, sink)?;
    report.overlap_pairs = pairs;
    Ok(report)
}

/// Freeze everything except `problematic`, run the repair loop, restore.
///
/// Flags are restored before an error is returned.
pub fn repair_assets<S: LayoutSolver + ?Sized>(
    solver: &mut S,
    problematic: &BTreeSet<String>,
    existing: &[S::Constraint],
    new: &[S::Constraint],
    config: &CleanupConfig,
    sink: &mut dyn SnapshotSink,
) -> Result<CleanupReport, CleanupError> {
    let mut report = CleanupReport {
        problematic: problematic.clone(),
        ..CleanupReport::default()
    };

    let mut guard = FreezeGuard::freeze(solver, problematic);
    let params = collect_parameters(guard.assets(), problematic, |id| guard.is_fixture(id));
    if params.is_empty() {
        warn!(assets = ?problematic, "no trainable parameters among problematic assets");
        guard.restore();
        return Ok(report);
    }

    let result = optimizer::run_repair_loop(
        &mut *guard,
        &params,
        existing,
        new,
        config,
        sink,
        &mut report,
    );
    guard.restore();
    result?;

    info!(
        steps = report.steps,
        projections = report.projections,
        stopped_early = report.stopped_early,
        "repair finished"
    );
    Ok(report)
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-crate stand-ins for the solver and snapshot collaborators

    use std::collections::BTreeSet;
    use std::path::Path;

    use thiserror::Error;

    use super::{BoxError, LayoutSolver, LossContext, LossTerms, Penalty, SnapshotSink};
    use crate::layout::{Asset, Assets, ParamId, Point, Shape};

    #[derive(Debug, Error)]
    #[error("stub failure")]
    pub struct StubError;

    type LossFn = Box<dyn Fn(&Assets) -> Penalty>;

    /// Solver whose overlap term pulls every trainable center toward the origin
    pub struct StubSolver {
        pub assets: Assets,
        pub fixtures: BTreeSet<String>,
        pub on_top_of: Vec<(String, String)>,
        pub loss_calls: usize,
        pub projection_calls: usize,
        pub fail_projection: bool,
        loss: LossFn,
    }

    impl StubSolver {
        pub fn new(assets: Vec<Asset>) -> Self {
            Self {
                assets: assets.into_iter().map(|a| (a.id.clone(), a)).collect(),
                fixtures: BTreeSet::new(),
                on_top_of: Vec::new(),
                loss_calls: 0,
                projection_calls: 0,
                fail_projection: false,
                loss: Box::new(pull_to_origin),
            }
        }

        pub fn with_fixtures(mut self, ids: &[&str]) -> Self {
            self.fixtures = ids.iter().map(|s| s.to_string()).collect();
            self
        }

        pub fn with_loss(mut self, loss: impl Fn(&Assets) -> Penalty + 'static) -> Self {
            self.loss = Box::new(loss);
            self
        }
    }

    fn pull_to_origin(assets: &Assets) -> Penalty {
        let mut total = Penalty::constant(0.0);
        for (id, asset) in assets {
            if !asset.optimize || !asset.position.requires_grad() {
                continue;
            }
            let c = asset.center();
            total = total
                + Penalty::constant(c.x * c.x + c.y * c.y)
                    .with_grad(ParamId::position(id.as_str()), vec![2.0 * c.x, 2.0 * c.y]);
        }
        total
    }

    pub fn unit_box(id: &str, x: f64, y: f64) -> Asset {
        Asset::new(
            id,
            Shape::Box {
                width: 1.0,
                depth: 1.0,
            },
            vec![x, y],
            0.0,
        )
    }

    impl LayoutSolver for StubSolver {
        type Constraint = ();
        type Error = StubError;

        fn assets(&self) -> &Assets {
            &self.assets
        }

        fn assets_mut(&mut self) -> &mut Assets {
            &mut self.assets
        }

        fn is_fixture(&self, id: &str) -> bool {
            self.fixtures.contains(id)
        }

        fn on_top_of(&self) -> &[(String, String)] {
            &self.on_top_of
        }

        fn boundary(&self) -> &[Point] {
            &[]
        }

        fn compute_losses(
            &mut self,
            _existing: &[()],
            _new: &[()],
            _ctx: LossContext,
        ) -> Result<LossTerms, StubError> {
            self.loss_calls += 1;
            Ok(LossTerms {
                overlap: (self.loss)(&self.assets),
                ..LossTerms::default()
            })
        }

        fn project_to_feasible(&mut self, _constraints: &[()]) -> Result<(), StubError> {
            self.projection_calls += 1;
            if self.fail_projection {
                return Err(StubError);
            }
            Ok(())
        }
    }

    /// Sink that discards everything
    pub struct NullSink;

    impl SnapshotSink for NullSink {
        fn render_snapshot(
            &mut self,
            _boundary: &[Point],
            _assets: &Assets,
            _path: &Path,
        ) -> Result<(), BoxError> {
            Ok(())
        }
    }
}
