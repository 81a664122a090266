//! Layout primitives shared by the repair core and the reference scene
//!
//! Assets with trainable poses, footprint polygons, and the kasuari-backed
//! solver used for feasibility projection.

pub mod error;
pub mod geometry;
pub mod solver;
pub mod types;

pub use error::GeometryError;
pub use geometry::Footprint;
pub use solver::{ConstraintSolver, LayoutConstraint, LayoutVariable, SolverError};
pub use types::*;

