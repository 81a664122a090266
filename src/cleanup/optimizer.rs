//! Gradient-based local repair loop
//!
//! Parameters live inside the asset collection, so every routine here takes the
//! collection plus the list of `ParamId`s it is allowed to touch.

use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use super::config::CleanupConfig;
use super::error::CleanupError;
use super::penalty::LossContext;
use super::{CleanupReport, LayoutSolver, SnapshotSink};
use crate::layout::{Assets, ParamId, ParamKind};

const CLIP_EPSILON: f64 = 1e-6;

/// Trainable parameters of the problematic assets, in a stable order.
///
/// An asset contributes only when it is present, not a fixture, optimize-enabled
/// and gradient-tracking. Anything else is skipped without error.
pub fn collect_parameters(
    assets: &Assets,
    problematic: &BTreeSet<String>,
    is_fixture: impl Fn(&str) -> bool,
) -> Vec<ParamId> {
    let mut params = Vec::new();
    for id in problematic {
        let Some(asset) = assets.get(id) else {
            debug!(asset = %id, "problematic asset not in collection");
            continue;
        };
        if is_fixture(id) || !asset.optimize {
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

/// Drop accumulated gradients on the listed parameters
pub fn zero_grad(assets: &mut Assets, params: &[ParamId]) {
    for id in params {
        if let Some(asset) = assets.get_mut(&id.asset) {
            asset.param_mut(id.kind).zero_grad();
        }
    }
}

/// Scale gradients so their global L2 norm is at most `max_norm`.
///
/// Returns the norm before clipping.
pub fn clip_grad_norm(assets: &mut Assets, params: &[ParamId], max_norm: f64) -> f64 {
    let total: f64 = params
        .iter()
        .filter_map(|id| assets.get(&id.asset).and_then(|a| a.param(id.kind).grad()))
        .flatten()
        .map(|g| g * g)
        .sum::<f64>()
        .sqrt();

    let coefficient = max_norm / (total + CLIP_EPSILON);
    if coefficient < 1.0 {
        for id in params {
            let Some(asset) = assets.get_mut(&id.asset) else {
                continue;
            };
            if let Some(grad) = asset.param_mut(id.kind).grad_mut() {
                for g in grad.iter_mut() {
                    *g *= coefficient;
                }
            }
        }
    }
    total
}

#[derive(Debug, Clone, Default)]
struct Moments {
    step: i32,
    first: Vec<f64>,
    second: Vec<f64>,
}

/// Adam with bias correction
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f64,
    beta1: f64,
    beta2: f64,
    eps: f64,
    state: HashMap<ParamId, Moments>,
}

impl Adam {
    pub fn new(learning_rate: f64) -> Self {
        Self {
            learning_rate,
            beta1: 0.9,
            beta2: 0.999,
            eps: 1e-8,
            state: HashMap::new(),
        }
    }

    /// Update every listed parameter that has a gradient
    pub fn step(&mut self, assets: &mut Assets, params: &[ParamId]) {
        for id in params {
            let Some(asset) = assets.get_mut(&id.asset) else {
                continue;
            };
            let param = asset.param_mut(id.kind);
            let Some(grad) = param.grad().map(<[f64]>::to_vec) else {
                continue;
            };

            let moments = self.state.entry(id.clone()).or_default();
            if moments.first.len() != grad.len() {
                moments.first = vec![0.0; grad.len()];
                moments.second = vec![0.0; grad.len()];
            }
            moments.step += 1;
            let bias1 = 1.0 - self.beta1.powi(moments.step);
            let bias2 = 1.0 - self.beta2.powi(moments.step);

            for (k, value) in param.values_mut().iter_mut().enumerate() {
                let Some(&g) = grad.get(k) else {
                    break;
                };
                moments.first[k] = self.beta1 * moments.first[k] + (1.0 - self.beta1) * g;
                moments.second[k] = self.beta2 * moments.second[k] + (1.0 - self.beta2) * g * g;
                let m_hat = moments.first[k] / bias1;
                let v_hat = moments.second[k] / bias2;
                *value -= self.learning_rate * m_hat / (v_hat.sqrt() + self.eps);
            }
        }
    }
}

/// Run the configured number of repair iterations on an already-frozen solver.
///
/// Counters and history are written into `report` as the loop goes, so after an
/// error the caller's `report` still shows how far the loop got.
/// [`repair_assets`](super::repair_assets) drops that partial report and
/// returns only the error.
pub fn run_repair_loop<S: LayoutSolver + ?Sized>(
    solver: &mut S,
    params: &[ParamId],
    existing: &[S::Constraint],
    new: &[S::Constraint],
    config: &CleanupConfig,
    sink: &mut dyn SnapshotSink,
    report: &mut CleanupReport,
) -> Result<(), CleanupError> {
    if let Some(dir) = &config.diagnostics_dir {
        std::fs::create_dir_all(dir).map_err(|source| CleanupError::Diagnostics {
            path: dir.clone(),
            source,
        })?;
    }

    let all_constraints: Vec<S::Constraint> = existing.iter().chain(new).cloned().collect();
    let mut adam = Adam::new(config.learning_rate);

    for i in 0..config.iterations {
        zero_grad(solver.assets_mut(), params);

        let terms = solver
            .compute_losses(existing, new, LossContext::repair())
            .map_err(CleanupError::loss)?;
        let breakdown = terms.breakdown(i, config.loss_scale);
        debug!("{breakdown}");
        report.history.push(breakdown);

        let loss = terms.combined(config.loss_scale);
        if !loss.requires_grad() {
            debug!(iteration = i, "loss carries no gradient, stopping");
            report.stopped_early = true;
            break;
        }

        loss.backward(solver.assets_mut(), params);
        clip_grad_norm(solver.assets_mut(), params, config.max_grad_norm);
        adam.step(solver.assets_mut(), params);
        report.steps += 1;

        if config.projects_after(i) {
            solver
                .project_to_feasible(&all_constraints)
                .map_err(CleanupError::projection)?;
            report.projections += 1;
        }

        if let Some(dir) = &config.diagnostics_dir {
            if config.snapshots_at(i) {
                let path = dir.join(format!("frame_cleanup_{i:04}.svg"));
                sink.render_snapshot(solver.boundary(), solver.assets(), &path)
                    .map_err(|e| CleanupError::snapshot(&path, e))?;
                report.frames.push(path);
            }
        }
    }

    if let Some(dir) = &config.diagnostics_dir {
        let path = dir.join("loss_curves_cleanup.svg");
        sink.render_loss_curves(&report.history, &path)
            .map_err(|e| CleanupError::snapshot(&path, e))?;
    }
    Ok(())
}
