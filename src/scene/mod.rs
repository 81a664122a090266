//! Reference room scene
//!
//! A `Scene` is a room outline, a set of assets and two constraint lists, loaded
//! from TOML. It implements [`LayoutSolver`] with finite-difference losses and
//! kasuari projection, which is enough to run a repair step end to end.

pub mod constraint;
pub mod file;
pub mod loss;
pub mod projection;

use std::collections::BTreeSet;
use std::path::Path;

use tracing::debug;

pub use constraint::SceneConstraint;
pub use file::{AssetSpec, ConstraintSpec, RoomSpec, SceneFile};

use crate::cleanup::{CleanupConfig, LayoutSolver, LossContext, LossTerms};
use crate::error::SceneError;
use crate::layout::{Asset, Assets, Footprint, Point, Shape};

/// A loaded, validated scene
#[derive(Debug, Clone)]
pub struct Scene {
    boundary: Vec<Point>,
    room: Footprint,
    walkway: f64,
    on_top_of: Vec<(String, String)>,
    assets: Assets,
    fixtures: BTreeSet<String>,
    existing: Vec<SceneConstraint>,
    new: Vec<SceneConstraint>,
    cleanup: CleanupConfig,
}

impl Scene {
    /// Load and validate a scene file
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_str(&source)
    }

    /// Parse and validate scene TOML
    pub fn from_str(source: &str) -> Result<Self, SceneError> {
        Self::from_file(SceneFile::parse(source)?)
    }

    pub fn from_file(file: SceneFile) -> Result<Self, SceneError> {
        file.validate()?;

        let boundary: Vec<Point> = file
            .room
            .boundary
            .iter()
            .map(|[x, y]| Point::new(*x, *y))
            .collect();
        let room = Footprint::from_points(&boundary)
            .map_err(|e| SceneError::InvalidRoom(e.to_string()))?;

        let mut assets = Assets::with_capacity(file.assets.len());
        let mut fixtures = BTreeSet::new();
        for spec in file.assets {
            let shape = match (spec.size, spec.outline) {
                (Some([width, depth]), _) => Shape::Box { width, depth },
                (None, Some(outline)) => {
                    Shape::Outline(outline.iter().map(|[x, y]| Point::new(*x, *y)).collect())
                }
                (None, None) => return Err(SceneError::invalid_asset(&spec.id, "missing shape")),
            };
            let asset = Asset::new(spec.id.clone(), shape, spec.position, spec.rotation.to_radians())
                .with_optimize(spec.optimize && !spec.fixture);
            if spec.fixture {
                fixtures.insert(spec.id.clone());
            }
            assets.insert(spec.id, asset);
        }

        debug!(
            assets = assets.len(),
            fixtures = fixtures.len(),
            existing = file.constraints.existing.len(),
            new = file.constraints.new.len(),
            "loaded scene"
        );

        Ok(Self {
            boundary,
            room,
            walkway: file.room.walkway,
            on_top_of: file
                .room
                .on_top_of
                .into_iter()
                .map(|[below, above]| (below, above))
                .collect(),
            assets,
            fixtures,
            existing: file.constraints.existing,
            new: file.constraints.new,
            cleanup: file.cleanup.unwrap_or_default(),
        })
    }

    /// Current state as a scene file, rotations in degrees
    pub fn to_file(&self) -> SceneFile {
        let assets = self
            .assets
            .values()
            .map(|asset| {
                let (size, outline) = match &asset.shape {
                    Shape::Box { width, depth } => (Some([*width, *depth]), None),
                    Shape::Outline(points) => {
                        (None, Some(points.iter().map(|p| [p.x, p.y]).collect()))
                    }
                };
                AssetSpec {
                    id: asset.id.clone(),
                    size,
                    outline,
                    position: asset.position.values().to_vec(),
                    rotation: asset.heading().to_degrees(),
                    fixture: self.is_fixture(&asset.id),
                    optimize: asset.optimize,
                }
            })
            .collect();

        SceneFile {
            room: RoomSpec {
                boundary: self.boundary.iter().map(|p| [p.x, p.y]).collect(),
                walkway: self.walkway,
                on_top_of: self
                    .on_top_of
                    .iter()
                    .map(|(below, above)| [below.clone(), above.clone()])
                    .collect(),
            },
            assets,
            constraints: ConstraintSpec {
                existing: self.existing.clone(),
                new: self.new.clone(),
            },
            cleanup: (self.cleanup != CleanupConfig::default()).then(|| self.cleanup.clone()),
        }
    }

    pub fn to_toml(&self) -> Result<String, SceneError> {
        self.to_file().to_toml()
    }

    pub fn boundary(&self) -> &[Point] {
        &self.boundary
    }

    /// The room as a footprint polygon
    pub fn room(&self) -> &Footprint {
        &self.room
    }

    pub fn walkway(&self) -> f64 {
        self.walkway
    }

    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    pub fn assets_mut(&mut self) -> &mut Assets {
        &mut self.assets
    }

    pub fn is_fixture(&self, id: &str) -> bool {
        self.fixtures.contains(id)
    }

    /// Whether `a` and `b` are a declared on-top-of pair, in either order
    pub fn is_stacked(&self, a: &str, b: &str) -> bool {
        self.on_top_of
            .iter()
            .any(|(below, above)| (below == a && above == b) || (below == b && above == a))
    }

    pub fn existing_constraints(&self) -> &[SceneConstraint] {
        &self.existing
    }

    pub fn new_constraints(&self) -> &[SceneConstraint] {
        &self.new
    }

    /// Repair settings from the file's `[cleanup]` table
    pub fn cleanup_config(&self) -> &CleanupConfig {
        &self.cleanup
    }
}

impl LayoutSolver for Scene {
    type Constraint = SceneConstraint;
    type Error = SceneError;

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
        &self.boundary
    }

    fn compute_losses(
        &mut self,
        existing: &[SceneConstraint],
        new: &[SceneConstraint],
        ctx: LossContext,
    ) -> Result<LossTerms, SceneError> {
        loss::compute_losses(self, existing, new, ctx)
    }

    fn project_to_feasible(&mut self, constraints: &[SceneConstraint]) -> Result<(), SceneError> {
        projection::project(self, constraints)
    }
}
