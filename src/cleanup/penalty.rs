//! Differentiable scalar penalties exchanged with the loss collaborator

use std::collections::BTreeMap;
use std::fmt;
use std::ops::Add;

use crate::layout::{Assets, ParamId};

/// Options threaded through every loss call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LossContext {
    /// Accept constraints whose penalty has no trainable input
    pub allow_nograd_constraints: bool,
}

impl LossContext {
    /// Context used during a local repair
    pub fn repair() -> Self {
        Self {
            allow_nograd_constraints: true,
        }
    }
}

/// A scalar value together with its gradient with respect to pose parameters.
///
/// A penalty with no gradient entries is a constant: nothing it depends on is
/// trainable, and stepping on it is meaningless.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Penalty {
    value: f64,
    grads: BTreeMap<ParamId, Vec<f64>>,
}

impl Penalty {
    /// A penalty that does not depend on any trainable parameter
    pub fn constant(value: f64) -> Self {
        Self {
            value,
            grads: BTreeMap::new(),
        }
    }

    /// Attach (or add to) the gradient with respect to `param`
    pub fn with_grad(mut self, param: ParamId, grad: Vec<f64>) -> Self {
        self.add_grad(param, &grad);
        self
    }

    fn add_grad(&mut self, param: ParamId, grad: &[f64]) {
        let slot = self.grads.entry(param).or_default();
        if slot.len() < grad.len() {
            slot.resize(grad.len(), 0.0);
        }
        for (acc, g) in slot.iter_mut().zip(grad) {
            *acc += g;
        }
    }

    pub fn value(&self) -> f64 {
        self.value
    }

    /// Whether any trainable parameter contributes to this penalty
    pub fn requires_grad(&self) -> bool {
        !self.grads.is_empty()
    }

    pub fn grad(&self, param: &ParamId) -> Option<&[f64]> {
        self.grads.get(param).map(Vec::as_slice)
    }

    pub fn scaled(mut self, factor: f64) -> Self {
        self.value *= factor;
        for grad in self.grads.values_mut() {
            for g in grad.iter_mut() {
                *g *= factor;
            }
        }
        self
    }

    /// Accumulate this penalty's gradient into the listed parameters.
    ///
    /// Entries for parameters outside `params` are ignored.
    pub fn backward(&self, assets: &mut Assets, params: &[ParamId]) {
        for id in params {
            let Some(grad) = self.grads.get(id) else {
                continue;
            };
            if let Some(asset) = assets.get_mut(&id.asset) {
                asset.param_mut(id.kind).accumulate_grad(grad);
            }
        }
    }
}

impl Add for Penalty {
    type Output = Penalty;

    fn add(mut self, rhs: Penalty) -> Penalty {
        self.value += rhs.value;
        for (param, grad) in rhs.grads {
            self.add_grad(param, &grad);
        }
        self
    }
}

/// The four penalty components produced by a loss evaluation
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LossTerms {
    pub overlap: Penalty,
    pub existing_constraint: Penalty,
    pub new_constraint: Penalty,
    pub reachability: Penalty,
}

impl LossTerms {
    /// Unweighted sum of the four terms, scaled by `scale`
    pub fn combined(&self, scale: f64) -> Penalty {
        (self.overlap.clone()
            + self.existing_constraint.clone()
            + self.new_constraint.clone()
            + self.reachability.clone())
        .scaled(scale)
    }

    /// Plain values for logging and plotting
    pub fn breakdown(&self, iteration: usize, scale: f64) -> LossBreakdown {
        let overlap = self.overlap.value();
        let existing_constraint = self.existing_constraint.value();
        let new_constraint = self.new_constraint.value();
        let reachability = self.reachability.value();
        LossBreakdown {
            iteration,
            total: (overlap + existing_constraint + new_constraint + reachability) * scale,
            overlap,
            existing_constraint,
            new_constraint,
            reachability,
        }
    }
}

/// One iteration's loss values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LossBreakdown {
    pub iteration: usize,
    pub total: f64,
    pub overlap: f64,
    pub existing_constraint: f64,
    pub new_constraint: f64,
    pub reachability: f64,
}

impl fmt::Display for LossBreakdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Iteration {}, Total Loss: {}, Overlap Loss: {}, Existing Constraint Loss: {}, New Constraint Loss: {}, Reachability Loss: {}",
            self.iteration,
            self.total,
            self.overlap,
            self.existing_constraint,
            self.new_constraint,
            self.reachability
        )
    }
}
