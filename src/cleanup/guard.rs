//! Freeze/restore of per-asset optimization state.
//!
//! `FreezeGuard` holds the exclusive borrow of the solver for the duration of a
//! repair. Every exit path restores the recorded flags: an explicit `restore`,
//! an early return, `?` propagation, or unwinding through `Drop`.

use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use indexmap::IndexMap;
use tracing::debug;

use super::LayoutSolver;

/// The flags an asset had before a repair started
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SavedState {
    pub optimize: bool,
    pub position_trainable: bool,
    pub rotation_trainable: bool,
}

/// Scoped freeze of every non-problematic, non-fixture asset
pub struct FreezeGuard<'a, S: LayoutSolver + ?Sized> {
    solver: &'a mut S,
    saved: IndexMap<String, SavedState>,
    restored: bool,
}

impl<'a, S: LayoutSolver + ?Sized> FreezeGuard<'a, S> {
    /// Record every non-fixture asset's flags, then make problematic assets
    /// fully trainable and freeze the rest
    pub fn freeze(solver: &'a mut S, problematic: &BTreeSet<String>) -> Self {
        let ids: Vec<String> = solver
            .assets()
            .keys()
            .filter(|id| !solver.is_fixture(id))
            .cloned()
            .collect();

        let mut saved = IndexMap::with_capacity(ids.len());
        let assets = solver.assets_mut();
        for id in ids {
            let Some(asset) = assets.get_mut(&id) else {
                continue;
            };
            saved.insert(
                id.clone(),
                SavedState {
                    optimize: asset.optimize,
                    position_trainable: asset.position.requires_grad(),
                    rotation_trainable: asset.rotation.requires_grad(),
                },
            );

            let trainable = problematic.contains(&id);
            asset.optimize = trainable;
            asset.position.set_requires_grad(trainable);
            asset.rotation.set_requires_grad(trainable);
        }
        debug!(
            recorded = saved.len(),
            unfrozen = problematic.len(),
            "froze non-problematic assets"
        );

        Self {
            solver,
            saved,
            restored: false,
        }
    }

    /// Recorded pre-freeze state of an asset, if it was touched
    pub fn saved_state(&self, id: &str) -> Option<SavedState> {
        self.saved.get(id).copied()
    }

    /// Write back the recorded flags. Calling it again is a no-op.
    pub fn restore(&mut self) {
        if self.restored {
            return;
        }
        let assets = self.solver.assets_mut();
        for (id, state) in &self.saved {
            if let Some(asset) = assets.get_mut(id) {
                asset.optimize = state.optimize;
                asset.position.set_requires_grad(state.position_trainable);
                asset.rotation.set_requires_grad(state.rotation_trainable);
            }
        }
        self.restored = true;
        debug!(restored = self.saved.len(), "restored optimization flags");
    }
}

impl<S: LayoutSolver + ?Sized> Deref for FreezeGuard<'_, S> {
    type Target = S;

    fn deref(&self) -> &S {
        self.solver
    }
}

impl<S: LayoutSolver + ?Sized> DerefMut for FreezeGuard<'_, S> {
    fn deref_mut(&mut self) -> &mut S {
        self.solver
    }
}

impl<S: LayoutSolver + ?Sized> Drop for FreezeGuard<'_, S> {
    fn drop(&mut self) {
        self.restore();
    }
}
