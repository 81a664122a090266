//! Layout constraints understood by the reference scene

use std::f64::consts::{PI, TAU};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::layout::{Assets, Footprint};

/// A soft layout rule, penalized by its squared violation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SceneConstraint {
    /// The asset's footprint lies inside the room
    InsideBoundary { asset: String },
    /// Footprint gap between `a` and `b` is at least `distance`
    MinDistance { a: String, b: String, distance: f64 },
    /// Footprint gap between `a` and `b` is at most `distance`
    MaxDistance { a: String, b: String, distance: f64 },
    /// The asset keeps a heading of `degrees`
    FixedRotation { asset: String, degrees: f64 },
}

impl SceneConstraint {
    pub fn kind(&self) -> &'static str {
        match self {
            SceneConstraint::InsideBoundary { .. } => "inside_boundary",
            SceneConstraint::MinDistance { .. } => "min_distance",
            SceneConstraint::MaxDistance { .. } => "max_distance",
            SceneConstraint::FixedRotation { .. } => "fixed_rotation",
        }
    }

    /// IDs of the assets this constraint reads
    pub fn assets(&self) -> Vec<&str> {
        match self {
            SceneConstraint::InsideBoundary { asset } | SceneConstraint::FixedRotation { asset, .. } => {
                vec![asset.as_str()]
            }
            SceneConstraint::MinDistance { a, b, .. } | SceneConstraint::MaxDistance { a, b, .. } => {
                vec![a.as_str(), b.as_str()]
            }
        }
    }

    /// Squared violation at the given poses; zero when satisfied.
    ///
    /// Assets that are missing or have no usable footprint contribute nothing.
    pub fn violation(&self, assets: &Assets, room: &Footprint) -> f64 {
        match self {
            SceneConstraint::InsideBoundary { asset } => {
                let Some(footprint) = assets.get(asset).and_then(|a| a.footprint().ok()) else {
                    return 0.0;
                };
                let outside = (footprint.area() - footprint.intersection_area(room)).max(0.0);
                outside * outside
            }
            SceneConstraint::MinDistance { a, b, distance } => match gap(assets, a, b) {
                Some(gap) if gap < *distance => (distance - gap).powi(2),
                _ => 0.0,
            },
            SceneConstraint::MaxDistance { a, b, distance } => match gap(assets, a, b) {
                Some(gap) if gap > *distance => (gap - distance).powi(2),
                _ => 0.0,
            },
            SceneConstraint::FixedRotation { asset, degrees } => {
                let Some(heading) = assets.get(asset).map(|a| a.heading()) else {
                    return 0.0;
                };
                wrap_angle(heading - degrees.to_radians()).powi(2)
            }
        }
    }
}

impl fmt::Display for SceneConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SceneConstraint::InsideBoundary { asset } => write!(f, "inside_boundary({asset})"),
            SceneConstraint::MinDistance { a, b, distance } => {
                write!(f, "min_distance({a}, {b}, {distance})")
            }
            SceneConstraint::MaxDistance { a, b, distance } => {
                write!(f, "max_distance({a}, {b}, {distance})")
            }
            SceneConstraint::FixedRotation { asset, degrees } => {
                write!(f, "fixed_rotation({asset}, {degrees})")
            }
        }
    }
}

fn gap(assets: &Assets, a: &str, b: &str) -> Option<f64> {
    let fa = assets.get(a)?.footprint().ok()?;
    let fb = assets.get(b)?.footprint().ok()?;
    Some(fa.distance(&fb))
}

/// Map an angle difference into [-PI, PI)
pub(crate) fn wrap_angle(delta: f64) -> f64 {
    (delta + PI).rem_euclid(TAU) - PI
}
