//! Constraint solver integration for feasibility projection
//!
//! This module wraps the kasuari Cassowary solver. Asset centers become solver
//! variables, feasibility bounds become REQUIRED inequalities, and the current
//! pose is suggested with STRONG strength so the solution moves each center as
//! little as the bounds allow.

use std::collections::HashMap;

use kasuari::{Solver as KasuariSolver, Strength, Variable as KasuariVariable, WeightedRelation::*};
use thiserror::Error;

/// Center coordinates that can be constrained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayoutProperty {
    CenterX,
    CenterY,
}

/// A variable in the constraint system
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LayoutVariable {
    pub asset_id: String,
    pub property: LayoutProperty,
}

impl LayoutVariable {
    pub fn new(asset_id: impl Into<String>, property: LayoutProperty) -> Self {
        Self {
            asset_id: asset_id.into(),
            property,
        }
    }

    /// Variable for the asset's center x
    pub fn x(asset_id: impl Into<String>) -> Self {
        Self::new(asset_id, LayoutProperty::CenterX)
    }

    /// Variable for the asset's center y
    pub fn y(asset_id: impl Into<String>) -> Self {
        Self::new(asset_id, LayoutProperty::CenterY)
    }
}

/// A bound in the projection system
#[derive(Debug, Clone)]
pub enum LayoutConstraint {
    /// variable >= value
    GreaterOrEqual {
        variable: LayoutVariable,
        value: f64,
        source: String,
    },

    /// variable <= value
    LessOrEqual {
        variable: LayoutVariable,
        value: f64,
        source: String,
    },
}

/// Errors from the constraint solver
#[derive(Debug, Error)]
pub enum SolverError {
    #[error("Unsatisfiable constraints: {reason}")]
    Unsatisfiable {
        conflicting: Vec<String>,
        reason: String,
    },

    #[error("Internal solver error: {0}")]
    Internal(String),
}

/// Wrapper around kasuari solver
pub struct ConstraintSolver {
    solver: KasuariSolver,
    /// Maps our variables to kasuari variables
    variables: HashMap<LayoutVariable, KasuariVariable>,
    /// Descriptions of added constraints, for error reporting
    sources: Vec<String>,
}

impl ConstraintSolver {
    pub fn new() -> Self {
        Self {
            solver: KasuariSolver::new(),
            variables: HashMap::new(),
            sources: Vec::new(),
        }
    }

    fn get_or_create_var(&mut self, var: &LayoutVariable) -> KasuariVariable {
        if let Some(&kvar) = self.variables.get(var) {
            kvar
        } else {
            let kvar = KasuariVariable::new();
            self.variables.insert(var.clone(), kvar);
            kvar
        }
    }

    /// Convert a kasuari error to a SolverError with context
    fn convert_kasuari_error(
        &self,
        e: kasuari::AddConstraintError,
        source: &str,
        constraint_desc: &str,
    ) -> SolverError {
        match e {
            kasuari::AddConstraintError::UnsatisfiableConstraint => {
                let mut conflicting = vec![source.to_string()];
                conflicting.extend(self.sources.iter().cloned());
                SolverError::Unsatisfiable {
                    conflicting,
                    reason: format!(
                        "Cannot satisfy {}: conflicts with existing constraints",
                        constraint_desc
                    ),
                }
            }
            kasuari::AddConstraintError::DuplicateConstraint => {
                SolverError::Internal(format!("Duplicate constraint: {}", constraint_desc))
            }
            kasuari::AddConstraintError::InternalSolverError(msg) => SolverError::Internal(
                format!("Internal solver error for {}: {}", constraint_desc, msg),
            ),
        }
    }

    /// Add a constraint to the solver
    pub fn add_constraint(&mut self, constraint: LayoutConstraint) -> Result<(), SolverError> {
        match &constraint {
            LayoutConstraint::GreaterOrEqual {
                variable,
                value,
                source,
            } => {
                let kvar = self.get_or_create_var(variable);
                let desc = format!("{}.{:?} >= {}", variable.asset_id, variable.property, value);
                self.solver
                    .add_constraint(kvar | GE(Strength::REQUIRED) | *value)
                    .map_err(|e| self.convert_kasuari_error(e, source, &desc))?;
                self.sources.push(source.clone());
            }

            LayoutConstraint::LessOrEqual {
                variable,
                value,
                source,
            } => {
                let kvar = self.get_or_create_var(variable);
                let desc = format!("{}.{:?} <= {}", variable.asset_id, variable.property, value);
                self.solver
                    .add_constraint(kvar | LE(Strength::REQUIRED) | *value)
                    .map_err(|e| self.convert_kasuari_error(e, source, &desc))?;
                self.sources.push(source.clone());
            }
        }
        Ok(())
    }

    /// Add an edit variable with suggested value (pulls the solution toward it)
    pub fn suggest_value(&mut self, var: &LayoutVariable, value: f64) -> Result<(), SolverError> {
        let kvar = self.get_or_create_var(var);
        self.solver
            .add_edit_variable(kvar, Strength::STRONG)
            .map_err(|e| SolverError::Internal(format!("Failed to add edit variable: {}", e)))?;
        self.solver
            .suggest_value(kvar, value)
            .map_err(|e| SolverError::Internal(format!("Failed to suggest value: {}", e)))?;
        Ok(())
    }

    /// Solve the constraint system
    pub fn solve(&mut self) -> Result<Solution, SolverError> {
        let changes = self.solver.fetch_changes();

        // kasuari only reports variables that moved away from zero
        let mut values: HashMap<LayoutVariable, f64> =
            self.variables.keys().map(|var| (var.clone(), 0.0)).collect();
        for (kvar, value) in changes {
            for (our_var, &k) in &self.variables {
                if k == *kvar {
                    values.insert(our_var.clone(), *value);
                    break;
                }
            }
        }

        Ok(Solution { values })
    }
}

impl Default for ConstraintSolver {
    fn default() -> Self {
        Self::new()
    }
}

/// Solution from the constraint solver
pub struct Solution {
    pub values: HashMap<LayoutVariable, f64>,
}

impl Solution {
    /// Get value for a variable
    pub fn get(&self, var: &LayoutVariable) -> Option<f64> {
        self.values.get(var).copied()
    }
}
