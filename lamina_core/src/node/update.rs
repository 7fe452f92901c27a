// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The transform/alpha propagation pass.
//!
//! [`NodeStore::update_transforms`] walks every root top-down, recomposing
//! world matrices only where version counters say something changed. A
//! subtree whose ancestors and own local state are untouched performs zero
//! matrix work; the walk itself (one version compare per node) is the only
//! steady-state cost.

use alloc::vec::Vec;

use crate::matrix::Matrix;

use super::NodeStore;
use super::id::{INVALID, NodeId};

impl NodeStore {
    /// Replaces the base transform applied above all roots (e.g. a camera
    /// or device-pixel-ratio matrix) and forces roots to recompose on the
    /// next pass.
    pub fn set_base_transform(&mut self, base: Matrix) {
        self.base_world = base;
        self.base_version = self.base_version.wrapping_add(1);
    }

    /// The base transform applied above all roots.
    #[must_use]
    pub fn base_transform(&self) -> &Matrix {
        &self.base_world
    }

    /// Propagates transforms and alpha top-down through every visible
    /// subtree.
    ///
    /// Each visited node gets a fresh world matrix (recomposed only if its
    /// local state or an ancestor changed), a fresh world alpha, and a
    /// bumped bounds revision. Invisible subtrees are skipped entirely and
    /// keep whatever state they had.
    pub fn update_transforms(&mut self) {
        let base_world = self.base_world;
        let base_version = self.base_version;
        for idx in 0..self.len {
            let i = idx as usize;
            if self.alive[i] && self.parent[i] == INVALID {
                self.update_subtree(idx, base_world, base_version, 1.0);
            }
        }
    }

    /// Propagates with the given base transform, replacing the current one
    /// first if it differs. A steady base costs no extra recomposition.
    pub fn update_transforms_with(&mut self, base: &Matrix) {
        if self.base_world != *base {
            self.set_base_transform(*base);
        }
        self.update_transforms();
    }

    /// Recomposes the chain from the root down to `idx` (inclusive),
    /// without descending into siblings or children. Used by bounds and
    /// hit-test queries that must not pay for a full pass.
    pub(crate) fn refresh_ancestry(&mut self, idx: u32) {
        let mut chain = Vec::new();
        let mut cursor = idx;
        while cursor != INVALID {
            chain.push(cursor);
            cursor = self.parent[cursor as usize];
        }

        let mut parent_world = self.base_world;
        let mut parent_version = self.base_version;
        for &node in chain.iter().rev() {
            let i = node as usize;
            if self.transform[i].update_world(&parent_world, parent_version) {
                self.bounds[i].invalidate();
            }
            parent_world = *self.transform[i].world_matrix();
            parent_version = self.transform[i].world_version();
        }
    }

    /// Returns the world frame (matrix, version, alpha) a node composes
    /// against: its parent's computed state, or the base for roots.
    pub(crate) fn parent_frame(&self, idx: u32) -> (Matrix, u32, f64) {
        let p = self.parent[idx as usize];
        if p == INVALID {
            (self.base_world, self.base_version, 1.0)
        } else {
            let t = &self.transform[p as usize];
            (
                *t.world_matrix(),
                t.world_version(),
                self.world_alpha[p as usize],
            )
        }
    }

    /// Updates `idx` and its visible descendants against the given parent
    /// frame. Parent state is passed by value so the recursion never holds
    /// two array borrows at once.
    pub(crate) fn update_subtree(
        &mut self,
        idx: u32,
        parent_world: Matrix,
        parent_version: u32,
        parent_alpha: f64,
    ) {
        if !self.visible[idx as usize] {
            return;
        }
        self.update_subtree_always(idx, parent_world, parent_version, parent_alpha);
    }

    /// Like [`update_subtree`](Self::update_subtree), but updates `idx` even
    /// while it is hidden. Bounds queries measure hidden nodes too;
    /// visibility gates rendering and parent accumulation, not direct
    /// measurement. Hidden *descendants* are still skipped — they never
    /// contribute to the measured rectangle.
    pub(crate) fn update_subtree_always(
        &mut self,
        idx: u32,
        parent_world: Matrix,
        parent_version: u32,
        parent_alpha: f64,
    ) {
        let i = idx as usize;
        if self.sort_dirty[i] {
            if self.sortable_children[i] {
                self.sort_children(idx);
            }
            self.sort_dirty[i] = false;
        }

        self.transform[i].update_world(&parent_world, parent_version);
        self.world_alpha[i] = parent_alpha * self.alpha[i];
        // Every visited node gets a new bounds revision: even if this node's
        // own matrix is unchanged, a descendant's may not be, and the cached
        // rectangle must not outlive the pass.
        self.bounds[i].invalidate();

        let world = *self.transform[i].world_matrix();
        let version = self.transform[i].world_version();
        let alpha = self.world_alpha[i];

        let mut child = self.first_child[i];
        while child != INVALID {
            let next = self.next_sibling[child as usize];
            self.update_subtree(child, world, version, alpha);
            child = next;
        }
    }

    /// Stable-sorts the child list of `idx` by z-index. Ties keep their
    /// insertion order.
    fn sort_children(&mut self, idx: u32) {
        let i = idx as usize;
        let mut order: Vec<u32> = Vec::new();
        let mut child = self.first_child[i];
        while child != INVALID {
            order.push(child);
            child = self.next_sibling[child as usize];
        }
        order.sort_by_key(|&c| self.z_index[c as usize]);

        self.first_child[i] = order.first().copied().unwrap_or(INVALID);
        let mut prev = INVALID;
        for &c in &order {
            self.prev_sibling[c as usize] = prev;
            if prev != INVALID {
                self.next_sibling[prev as usize] = c;
            }
            prev = c;
        }
        if prev != INVALID {
            self.next_sibling[prev as usize] = INVALID;
        }
    }

    /// Returns every live root node, in slot order.
    pub fn roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.len).filter_map(move |idx| {
            let i = idx as usize;
            (self.alive[i] && self.parent[i] == INVALID).then(|| NodeId {
                idx,
                generation: self.generation[i],
            })
        })
    }
}
