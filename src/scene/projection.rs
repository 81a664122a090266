//! Feasibility projection through the constraint solver
//!
//! Only `inside_boundary` has a hard counterpart: the asset's axis-aligned
//! extent must fit inside the room's bounding box. Centers are suggested at
//! their current values, so the solver moves an asset only as far as needed.

use tracing::debug;

use super::constraint::SceneConstraint;
use super::Scene;
use crate::error::SceneError;
use crate::layout::{BoundingBox, ConstraintSolver, LayoutConstraint, LayoutVariable, Point};

/// Snap every optimize-enabled asset with an `inside_boundary` constraint
/// back inside the room
pub fn project(scene: &mut Scene, constraints: &[SceneConstraint]) -> Result<(), SceneError> {
    let Some(room) = BoundingBox::from_points(scene.boundary()) else {
        return Ok(());
    };

    let mut solver = ConstraintSolver::new();
    let mut moved: Vec<String> = Vec::new();

    for (id, asset) in scene.assets() {
        if scene.is_fixture(id) || !asset.optimize {
            continue;
        }
        let bounded = constraints.iter().any(|c| {
            matches!(c, SceneConstraint::InsideBoundary { asset } if asset == id)
        });
        if !bounded {
            continue;
        }

        let center = asset.center();
        let Some(extent) = BoundingBox::from_points(&asset.footprint_points()) else {
            continue;
        };
        if !center.is_finite() || !extent.x.is_finite() || !extent.y.is_finite() {
            debug!(asset = %id, "skipping projection of non-finite pose");
            continue;
        }

        let source = format!("inside_boundary({id})");
        let (x, y) = (LayoutVariable::x(id.as_str()), LayoutVariable::y(id.as_str()));
        let bounds = [
            (x.clone(), room.x + (center.x - extent.x), true),
            (x.clone(), room.right() - (extent.right() - center.x), false),
            (y.clone(), room.y + (center.y - extent.y), true),
            (y.clone(), room.top() - (extent.top() - center.y), false),
        ];
        for (variable, value, lower) in bounds {
            let constraint = if lower {
                LayoutConstraint::GreaterOrEqual {
                    variable,
                    value,
                    source: source.clone(),
                }
            } else {
                LayoutConstraint::LessOrEqual {
                    variable,
                    value,
                    source: source.clone(),
                }
            };
            solver.add_constraint(constraint)?;
        }
        solver.suggest_value(&x, center.x)?;
        solver.suggest_value(&y, center.y)?;
        moved.push(id.clone());
    }

    if moved.is_empty() {
        return Ok(());
    }

    let solution = solver.solve()?;
    let assets = scene.assets_mut();
    for id in &moved {
        let Some(asset) = assets.get_mut(id) else {
            continue;
        };
        let current = asset.center();
        let target = Point::new(
            solution.get(&LayoutVariable::x(id.as_str())).unwrap_or(current.x),
            solution.get(&LayoutVariable::y(id.as_str())).unwrap_or(current.y),
        );
        if target != current {
            debug!(asset = %id, x = target.x, y = target.y, "projected into room");
        }
        asset.set_center(target);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::SolverError;

    fn scene(position: &str, size: &str) -> Scene {
        Scene::from_str(&format!(
            r#"
[room]
boundary = [[0, 0], [4, 0], [4, 3], [0, 3]]

[[asset]]
id = "bed"
size = {size}
position = {position}

[[asset]]
id = "rug"
size = [1, 1]
position = [-3.0, 1.0]
"#
        ))
        .unwrap()
    }

    fn inside(id: &str) -> Vec<SceneConstraint> {
        vec![SceneConstraint::InsideBoundary { asset: id.into() }]
    }

    #[test]
    fn test_asset_outside_is_pulled_in() {
        let mut s = scene("[4.5, 1.5]", "[2, 1]");
        project(&mut s, &inside("bed")).unwrap();
        let c = s.assets()["bed"].center();
        assert!((c.x - 3.0).abs() < 1e-9);
        assert!((c.y - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_feasible_asset_stays_put() {
        let mut s = scene("[1.5, 1.5]", "[2, 1]");
        project(&mut s, &inside("bed")).unwrap();
        let c = s.assets()["bed"].center();
        assert!((c.x - 1.5).abs() < 1e-9);
        assert!((c.y - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_unconstrained_asset_untouched() {
        let mut s = scene("[1.5, 1.5]", "[2, 1]");
        project(&mut s, &inside("bed")).unwrap();
        assert_eq!(s.assets()["rug"].center(), Point::new(-3.0, 1.0));
    }

    #[test]
    fn test_oversized_asset_is_unsatisfiable() {
        let mut s = scene("[2.0, 1.5]", "[5, 1]");
        let err = project(&mut s, &inside("bed")).unwrap_err();
        assert!(matches!(
            err,
            SceneError::Projection(SolverError::Unsatisfiable { .. })
        ));
    }
}
