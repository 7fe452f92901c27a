// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounds and hit-test queries over the scene graph.

use kurbo::{Point, Rect};

use crate::bounds::Bounds;
use crate::matrix::Matrix;
use crate::transform::Transform;

use super::NodeStore;
use super::id::{INVALID, NodeId};

impl NodeStore {
    /// Returns the node's world-space axis-aligned bounds.
    ///
    /// The ancestor chain and the node's subtree are brought up to date
    /// first, so this is correct even between update passes. Rectangles are
    /// cached per node against the bounds revision, so shared subtrees are
    /// not re-measured within one query.
    ///
    /// An empty subtree (no geometry, or everything hidden) yields
    /// [`Rect::ZERO`]. The queried node itself is measured even while
    /// hidden — visibility gates rendering and inclusion in an ancestor's
    /// bounds, not direct measurement.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn get_bounds(&mut self, id: NodeId) -> Rect {
        self.validate(id);
        self.refresh_ancestry(id.idx);
        let (world, version, alpha) = self.parent_frame(id.idx);
        self.update_subtree_always(id.idx, world, version, alpha);
        self.recompute_bounds(id.idx);
        self.bounds[id.idx as usize].rect()
    }

    /// Like [`get_bounds`](Self::get_bounds), but trusts the world matrices
    /// from the last propagation pass instead of refreshing them. Used
    /// during rendering, where the pass has already run this frame.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn get_bounds_cached(&mut self, id: NodeId) -> Rect {
        self.validate(id);
        self.recompute_bounds(id.idx);
        self.bounds[id.idx as usize].rect()
    }

    /// Returns the node's bounds in its own untransformed local space,
    /// ignoring its position, rotation, scale, and parent chain.
    ///
    /// The node is measured detached under an identity frame and fully
    /// restored afterwards, even if measurement panics.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn get_local_bounds(&mut self, id: NodeId) -> Rect {
        self.validate(id);
        let i = id.idx as usize;

        let parent = self.parent[i];
        let transform = core::mem::take(&mut self.transform[i]);
        let base_world = self.base_world;
        let base_version = self.base_version;

        let mut guard = RestoreNode {
            idx: id.idx,
            parent,
            transform: Some(transform),
            base_world,
            base_version,
            store: self,
        };

        let s = &mut *guard.store;
        s.parent[i] = INVALID;
        s.base_world = Matrix::IDENTITY;
        s.base_version = s.base_version.wrapping_add(1);
        s.get_bounds(id)
        // `guard` drops here, restoring parent link, transform, and base.
    }

    /// Whether a world-space point falls inside this node's own content
    /// (children are not consulted).
    ///
    /// Uses the world matrix from the last update pass; run
    /// [`update_transforms`](Self::update_transforms) first if the graph
    /// changed. A non-invertible (zero-scale) world matrix never contains
    /// anything.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn contains_point(&self, id: NodeId, point: Point) -> bool {
        self.validate(id);
        self.content_hit(id.idx, point)
    }

    /// Finds the topmost node under a world-space point, searching the
    /// subtree rooted at `root` in reverse paint order.
    ///
    /// Invisible subtrees and mask nodes are skipped; a node with a mask
    /// only matches when the point also falls inside the mask's geometry.
    /// Only renderable nodes with content can be hit directly, but a group
    /// still relays hits from its children.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    #[must_use]
    pub fn hit_test(&self, root: NodeId, point: Point) -> Option<NodeId> {
        self.validate(root);
        self.hit_test_idx(root.idx, point)
    }

    fn hit_test_idx(&self, idx: u32, point: Point) -> Option<NodeId> {
        let i = idx as usize;
        if !self.visible[i] || self.is_mask[i] {
            return None;
        }
        if let Some(mask) = self.live_mask(idx) {
            if !self.mask_allows(mask, point) {
                return None;
            }
        }

        // Topmost first: walk the child list from the back.
        let mut last = INVALID;
        let mut child = self.first_child[i];
        while child != INVALID {
            last = child;
            child = self.next_sibling[child as usize];
        }
        let mut cursor = last;
        while cursor != INVALID {
            if let Some(hit) = self.hit_test_idx(cursor, point) {
                return Some(hit);
            }
            cursor = self.prev_sibling[cursor as usize];
        }

        if self.renderable[i] && self.content_hit(idx, point) {
            return Some(NodeId {
                idx,
                generation: self.generation[i],
            });
        }
        None
    }

    /// Whether the point falls inside any content in the mask's subtree.
    fn mask_allows(&self, mask: u32, point: Point) -> bool {
        if self.content_hit(mask, point) {
            return true;
        }
        let mut child = self.first_child[mask as usize];
        while child != INVALID {
            if self.mask_allows(child, point) {
                return true;
            }
            child = self.next_sibling[child as usize];
        }
        false
    }

    fn content_hit(&self, idx: u32, point: Point) -> bool {
        let i = idx as usize;
        match self.transform[i].world_matrix().apply_inverse(point) {
            Some(local) => self.content[i].contains_point(local),
            None => false,
        }
    }

    /// Recomputes the cached bounds of `idx` from its content and children
    /// if its revision changed, depth-first.
    fn recompute_bounds(&mut self, idx: u32) {
        let i = idx as usize;
        if self.last_bounds_version[i] == self.bounds[i].update_id() {
            return;
        }

        // Children first, so their accumulators are fresh when unioned.
        let mut child = self.first_child[i];
        while child != INVALID {
            let c = child as usize;
            if self.visible[c] && self.renderable[c] && !self.is_mask[c] {
                self.recompute_bounds(child);
            }
            child = self.next_sibling[c];
        }

        let world = *self.transform[i].world_matrix();
        let mut acc = Bounds::new();
        self.content[i].measure_bounds(&world, &mut acc);

        let mut child = self.first_child[i];
        while child != INVALID {
            let c = child as usize;
            if self.visible[c] && self.renderable[c] && !self.is_mask[c] {
                if let Some(mask) = self.live_mask(child) {
                    self.recompute_bounds(mask);
                    let clip = self.bounds[mask as usize].rect();
                    acc.add_bounds_mask(&self.bounds[c], clip);
                } else {
                    acc.add_bounds(&self.bounds[c]);
                }
            }
            child = self.next_sibling[c];
        }

        let b = &mut self.bounds[i];
        b.min_x = acc.min_x;
        b.min_y = acc.min_y;
        b.max_x = acc.max_x;
        b.max_y = acc.max_y;
        self.last_bounds_version[i] = b.update_id();
    }
}

/// Restores a node temporarily detached for local-bounds measurement.
///
/// Runs on drop so the store is consistent even if measurement panics. The
/// restored transform is re-invalidated, forcing the next pass to recompose
/// the real world matrix through the whole subtree.
struct RestoreNode<'a> {
    idx: u32,
    parent: u32,
    transform: Option<Transform>,
    base_world: Matrix,
    base_version: u32,
    store: &'a mut NodeStore,
}

impl Drop for RestoreNode<'_> {
    fn drop(&mut self) {
        let i = self.idx as usize;
        self.store.parent[i] = self.parent;
        if let Some(t) = self.transform.take() {
            self.store.transform[i] = t;
        }
        self.store.base_world = self.base_world;
        // A fresh version forces every root to recompose against the
        // restored base; the detached node itself is re-invalidated too.
        self.store.base_version = self.base_version.wrapping_add(2);
        self.store.transform[i].invalidate_world();
        self.store.bounds[i].invalidate();
    }
}
