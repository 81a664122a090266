//! Penalty terms for the reference scene.
//!
//! Every term is a plain function of the asset poses. Gradients come from
//! central finite differences over the trainable parameter components, so any
//! geometric quantity `geo` can measure is usable as a loss. Boolean ops snap
//! coordinates to a fixed grid, so area-based gradients carry an error of
//! roughly snap / STEP (about 1e-5).

use tracing::trace;

use super::constraint::SceneConstraint;
use super::Scene;
use crate::cleanup::{LossContext, LossTerms, Penalty};
use crate::error::SceneError;
use crate::layout::{Assets, Footprint, ParamId, ParamKind};

const STEP: f64 = 1e-4;

/// Parameters the loss may differentiate: tracking-enabled poses of
/// optimize-enabled, non-fixture assets
pub fn trainable_params(scene: &Scene) -> Vec<ParamId> {
    let mut params = Vec::new();
    for (id, asset) in scene.assets() {
        if scene.is_fixture(id) || !asset.optimize {
            continue;
        }
        for kind in [ParamKind::Position, ParamKind::Rotation] {
            if asset.param(kind).requires_grad() {
                params.push(ParamId::new(id.clone(), kind));
            }
        }
    }
    params
}

/// Evaluate `f` and its central-difference gradient with respect to `params`
pub fn differentiate(assets: &Assets, params: &[ParamId], f: impl Fn(&Assets) -> f64) -> Penalty {
    let mut penalty = Penalty::constant(f(assets));
    if params.is_empty() {
        return penalty;
    }

    let mut probe = assets.clone();
    for id in params {
        let Some(len) = probe.get(&id.asset).map(|a| a.param(id.kind).len()) else {
            continue;
        };
        let mut grad = vec![0.0; len];
        for (k, slot) in grad.iter_mut().enumerate() {
            let plus = nudge(&mut probe, id, k, STEP).map(|_| f(&probe));
            let minus = nudge(&mut probe, id, k, -2.0 * STEP).map(|_| f(&probe));
            nudge(&mut probe, id, k, STEP);
            if let (Some(plus), Some(minus)) = (plus, minus) {
                *slot = (plus - minus) / (2.0 * STEP);
            }
        }
        penalty = penalty.with_grad(id.clone(), grad);
    }
    penalty
}

fn nudge(assets: &mut Assets, id: &ParamId, component: usize, delta: f64) -> Option<()> {
    let value = assets
        .get_mut(&id.asset)?
        .param_mut(id.kind)
        .values_mut()
        .get_mut(component)?;
    *value += delta;
    Some(())
}

/// Footprints of every asset that has a usable one
fn footprints(assets: &Assets) -> Vec<(&str, Footprint)> {
    assets
        .iter()
        .filter_map(|(id, asset)| asset.footprint().ok().map(|f| (id.as_str(), f)))
        .collect()
}

/// Pairs the overlap and reachability terms look at
fn scored_pairs<'a>(
    scene: &Scene,
    shapes: &'a [(&'a str, Footprint)],
) -> Vec<(&'a Footprint, &'a Footprint)> {
    let mut pairs = Vec::new();
    for (i, (id_i, fp_i)) in shapes.iter().enumerate() {
        for (id_j, fp_j) in &shapes[i + 1..] {
            if scene.is_fixture(id_i) && scene.is_fixture(id_j) {
                continue;
            }
            if scene.is_stacked(id_i, id_j) {
                continue;
            }
            pairs.push((fp_i, fp_j));
        }
    }
    pairs
}

/// Total intersection area over non-stacked pairs
pub fn overlap_area(scene: &Scene, assets: &Assets) -> f64 {
    let shapes = footprints(assets);
    scored_pairs(scene, &shapes)
        .into_iter()
        .map(|(a, b)| a.intersection_area(b))
        .sum()
}

/// Squared walkway shortfall over non-stacked pairs
pub fn walkway_shortfall(scene: &Scene, assets: &Assets) -> f64 {
    let walkway = scene.walkway();
    if walkway <= 0.0 {
        return 0.0;
    }
    let shapes = footprints(assets);
    scored_pairs(scene, &shapes)
        .into_iter()
        .map(|(a, b)| {
            let gap = a.distance(b);
            if gap < walkway {
                (walkway - gap).powi(2)
            } else {
                0.0
            }
        })
        .sum()
}

/// Sum of squared violations of `constraints`
pub fn constraint_penalty(
    scene: &Scene,
    constraints: &[SceneConstraint],
    params: &[ParamId],
    ctx: LossContext,
) -> Result<Penalty, SceneError> {
    let mut total = Penalty::constant(0.0);
    for constraint in constraints {
        let involved = constraint.assets();
        let relevant: Vec<ParamId> = params
            .iter()
            .filter(|p| involved.contains(&p.asset.as_str()))
            .cloned()
            .collect();

        if relevant.is_empty() && !ctx.allow_nograd_constraints {
            return Err(SceneError::ConstraintWithoutGradient {
                constraint: constraint.to_string(),
            });
        }

        let term = differentiate(scene.assets(), &relevant, |assets| {
            constraint.violation(assets, scene.room())
        });
        trace!(%constraint, value = term.value(), "constraint penalty");
        total = total + term;
    }
    Ok(total)
}

/// All four terms at the scene's current poses
pub fn compute_losses(
    scene: &Scene,
    existing: &[SceneConstraint],
    new: &[SceneConstraint],
    ctx: LossContext,
) -> Result<LossTerms, SceneError> {
    let params = trainable_params(scene);
    Ok(LossTerms {
        overlap: differentiate(scene.assets(), &params, |a| overlap_area(scene, a)),
        existing_constraint: constraint_penalty(scene, existing, &params, ctx)?,
        new_constraint: constraint_penalty(scene, new, &params, ctx)?,
        reachability: differentiate(scene.assets(), &params, |a| walkway_shortfall(scene, a)),
    })
}
