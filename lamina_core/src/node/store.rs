// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property
//! management.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::bounds::Bounds;
use crate::filter::Filter;
use crate::matrix::Matrix;
use crate::transform::Transform;

use super::content::Content;
use super::id::{INVALID, NodeId};
use super::traverse::Children;

/// Struct-of-arrays storage for all nodes of one scene graph.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// The `parent` link is a non-owning back-reference; the child list is the
/// sole ownership edge — destroying a node cascades to its children.
#[derive(Debug)]
pub struct NodeStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,

    // -- Local properties (set by callers) --
    pub(crate) transform: Vec<Transform>,
    pub(crate) alpha: Vec<f64>,
    pub(crate) visible: Vec<bool>,
    pub(crate) renderable: Vec<bool>,
    pub(crate) content: Vec<Content>,
    pub(crate) filters: Vec<Vec<Filter>>,
    pub(crate) filter_area: Vec<Option<Rect>>,
    pub(crate) mask: Vec<Option<NodeId>>,
    pub(crate) is_mask: Vec<bool>,
    pub(crate) z_index: Vec<i32>,
    pub(crate) sortable_children: Vec<bool>,
    pub(crate) sort_dirty: Vec<bool>,

    // -- Computed properties (written by the update pass) --
    pub(crate) world_alpha: Vec<f64>,
    pub(crate) bounds: Vec<Bounds>,
    pub(crate) last_bounds_version: Vec<u32>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) alive: Vec<bool>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Synthetic root parent for update passes --
    pub(crate) base_world: Matrix,
    pub(crate) base_version: u32,
}

impl Default for NodeStore {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeStore {
    /// Creates an empty node store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            transform: Vec::new(),
            alpha: Vec::new(),
            visible: Vec::new(),
            renderable: Vec::new(),
            content: Vec::new(),
            filters: Vec::new(),
            filter_area: Vec::new(),
            mask: Vec::new(),
            is_mask: Vec::new(),
            z_index: Vec::new(),
            sortable_children: Vec::new(),
            sort_dirty: Vec::new(),
            world_alpha: Vec::new(),
            bounds: Vec::new(),
            last_bounds_version: Vec::new(),
            generation: Vec::new(),
            alive: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            base_world: Matrix::IDENTITY,
            base_version: 0,
        }
    }

    // -- Allocation API --

    /// Creates a new detached node with the given content.
    ///
    /// The node starts with an identity transform, alpha 1, visible,
    /// renderable, no filters, no mask, and no parent.
    pub fn create_node(&mut self, content: Content) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot; pooled sub-resources were reset on destroy.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.transform[i] = Transform::new();
            self.alpha[i] = 1.0;
            self.visible[i] = true;
            self.renderable[i] = true;
            self.content[i] = content;
            self.filters[i].clear();
            self.filter_area[i] = None;
            self.mask[i] = None;
            self.is_mask[i] = false;
            self.z_index[i] = 0;
            self.sortable_children[i] = false;
            self.sort_dirty[i] = false;
            self.world_alpha[i] = 1.0;
            self.bounds[i].clear();
            self.bounds[i].invalidate();
            self.alive[i] = true;
            idx
        } else {
            let idx = self.len;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.transform.push(Transform::new());
            self.alpha.push(1.0);
            self.visible.push(true);
            self.renderable.push(true);
            self.content.push(content);
            self.filters.push(Vec::new());
            self.filter_area.push(None);
            self.mask.push(None);
            self.is_mask.push(false);
            self.z_index.push(0);
            self.sortable_children.push(false);
            self.sort_dirty.push(false);
            self.world_alpha.push(1.0);
            self.bounds.push(Bounds::new());
            self.last_bounds_version.push(u32::MAX);
            self.generation.push(0);
            self.alive.push(true);
            idx
        };
        self.len = self.len.max(idx + 1);

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node and its entire subtree.
    ///
    /// The node is first detached from its parent (if any); children are
    /// destroyed recursively (the child list is the ownership edge), and
    /// each slot's sub-resources are released for reuse.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        if self.parent[id.idx as usize] != INVALID {
            self.unlink_from_parent(id.idx);
        }
        self.destroy_subtree(id.idx);
    }

    /// Frees `idx` and every node below it. `idx` must already be detached.
    fn destroy_subtree(&mut self, idx: u32) {
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            let next = self.next_sibling[child as usize];
            self.destroy_subtree(child);
            child = next;
        }

        let i = idx as usize;
        // Release per-slot resources; the slot itself goes on the free list.
        self.first_child[i] = INVALID;
        self.next_sibling[i] = INVALID;
        self.prev_sibling[i] = INVALID;
        self.parent[i] = INVALID;
        self.filters[i].clear();
        self.content[i] = Content::Group;
        // Drop the outbound mask reference and unflag the surviving mask
        // node, so it resumes rendering as ordinary content.
        if let Some(m) = self.mask[i].take() {
            if self.is_alive(m) {
                self.is_mask[m.idx as usize] = false;
            }
        }
        self.is_mask[i] = false;
        // Bump generation so old handles immediately fail validation.
        self.generation[i] += 1;
        self.alive[i] = false;
        self.free_list.push(idx);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        id.idx < self.len && self.generation[id.idx as usize] == id.generation
    }

    // -- Topology API --

    /// Adds `child` as the last child of `parent`, detaching it from its
    /// current parent first if it has one.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, or if the attachment would create a
    /// cycle (`parent` is `child` or one of its descendants).
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        self.validate(parent);
        self.validate(child);
        self.assert_no_cycle(parent.idx, child.idx);

        if self.parent[child.idx as usize] != INVALID {
            self.unlink_from_parent(child.idx);
        }

        let p = parent.idx;
        let c = child.idx;
        self.parent[c as usize] = p;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;

        if self.first_child[p as usize] == INVALID {
            self.first_child[p as usize] = c;
        } else {
            // Walk to last child.
            let mut last = self.first_child[p as usize];
            while self.next_sibling[last as usize] != INVALID {
                last = self.next_sibling[last as usize];
            }
            self.next_sibling[last as usize] = c;
            self.prev_sibling[c as usize] = last;
        }

        // The child's ancestry changed: force its world matrix to recompose
        // and the parent's bounds to be recomputed on next query.
        self.transform[c as usize].invalidate_world();
        self.bounds[p as usize].invalidate();
        self.sort_dirty[p as usize] = true;
    }

    /// Moves `child` under `new_parent`. Equivalent to
    /// [`add_child`](Self::add_child)`(new_parent, child)`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or the move would create a cycle.
    pub fn set_parent(&mut self, child: NodeId, new_parent: NodeId) {
        self.add_child(new_parent, child);
    }

    /// Removes `child` from its current parent, leaving it detached.
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale or the node has no parent.
    pub fn remove_from_parent(&mut self, child: NodeId) {
        self.validate(child);
        let c = child.idx;
        assert!(self.parent[c as usize] != INVALID, "node has no parent");

        let p = self.parent[c as usize];
        self.unlink_from_parent(c);
        self.transform[c as usize].invalidate_world();
        self.bounds[p as usize].invalidate();
    }

    /// Inserts `child` before `sibling` in the sibling list.
    ///
    /// `child` must not already have a parent. `sibling` must have one.
    ///
    /// # Panics
    ///
    /// Panics if handles are stale, `child` already has a parent, `sibling`
    /// has no parent, or the insertion would create a cycle.
    pub fn insert_before(&mut self, child: NodeId, sibling: NodeId) {
        self.validate(child);
        self.validate(sibling);
        let c = child.idx;
        let s = sibling.idx;
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        let p = self.parent[s as usize];
        assert!(p != INVALID, "sibling has no parent");
        self.assert_no_cycle(p, c);

        self.parent[c as usize] = p;
        self.next_sibling[c as usize] = s;
        self.prev_sibling[c as usize] = self.prev_sibling[s as usize];

        if self.prev_sibling[s as usize] != INVALID {
            self.next_sibling[self.prev_sibling[s as usize] as usize] = c;
        } else {
            // `sibling` was the first child.
            self.first_child[p as usize] = c;
        }
        self.prev_sibling[s as usize] = c;

        self.transform[c as usize].invalidate_world();
        self.bounds[p as usize].invalidate();
        self.sort_dirty[p as usize] = true;
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        let p = self.parent[id.idx as usize];
        if p == INVALID {
            None
        } else {
            Some(NodeId {
                idx: p,
                generation: self.generation[p as usize],
            })
        }
    }

    /// Returns an iterator over the direct children of a node.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    // -- Property access --

    /// Returns the node's transform.
    #[must_use]
    pub fn transform(&self, id: NodeId) -> &Transform {
        self.validate(id);
        &self.transform[id.idx as usize]
    }

    /// Returns the node's transform for mutation.
    pub fn transform_mut(&mut self, id: NodeId) -> &mut Transform {
        self.validate(id);
        &mut self.transform[id.idx as usize]
    }

    /// Returns the node's local alpha.
    #[must_use]
    pub fn alpha(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.alpha[id.idx as usize]
    }

    /// Sets the node's local alpha.
    pub fn set_alpha(&mut self, id: NodeId, alpha: f64) {
        self.validate(id);
        self.alpha[id.idx as usize] = alpha;
    }

    /// Returns the computed world alpha.
    ///
    /// Only valid after an update pass has visited the node.
    #[must_use]
    pub fn world_alpha(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.world_alpha[id.idx as usize]
    }

    /// Returns whether the node is visible.
    #[must_use]
    pub fn visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.visible[id.idx as usize]
    }

    /// Sets visibility. An invisible node and its whole subtree are skipped
    /// by update and render passes and hit tests, and excluded from an
    /// ancestor's bounds; querying the node's bounds directly still
    /// measures it.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.validate(id);
        self.visible[id.idx as usize] = visible;
        if self.parent[id.idx as usize] != INVALID {
            self.bounds[self.parent[id.idx as usize] as usize].invalidate();
        }
    }

    /// Returns whether the node draws itself.
    #[must_use]
    pub fn renderable(&self, id: NodeId) -> bool {
        self.validate(id);
        self.renderable[id.idx as usize]
    }

    /// Sets renderability. A non-renderable node is not drawn, but its
    /// descendants still get fresh transforms during update passes.
    pub fn set_renderable(&mut self, id: NodeId, renderable: bool) {
        self.validate(id);
        self.renderable[id.idx as usize] = renderable;
    }

    /// Returns the node's content.
    #[must_use]
    pub fn content(&self, id: NodeId) -> &Content {
        self.validate(id);
        &self.content[id.idx as usize]
    }

    /// Replaces the node's content.
    pub fn set_content(&mut self, id: NodeId, content: Content) {
        self.validate(id);
        self.content[id.idx as usize] = content;
        self.bounds[id.idx as usize].invalidate();
    }

    /// Returns the node's filter chain (possibly empty).
    #[must_use]
    pub fn filters(&self, id: NodeId) -> &[Filter] {
        self.validate(id);
        &self.filters[id.idx as usize]
    }

    /// Replaces the node's filter chain.
    pub fn set_filters(&mut self, id: NodeId, filters: Vec<Filter>) {
        self.validate(id);
        self.filters[id.idx as usize] = filters;
    }

    /// Returns the explicit filter area override, if set.
    #[must_use]
    pub fn filter_area(&self, id: NodeId) -> Option<Rect> {
        self.validate(id);
        self.filter_area[id.idx as usize]
    }

    /// Sets or clears the explicit filter area override.
    ///
    /// When set, filter passes use this rectangle (in the ancestor target's
    /// pixel space) instead of the node's measured bounds.
    pub fn set_filter_area(&mut self, id: NodeId, area: Option<Rect>) {
        self.validate(id);
        self.filter_area[id.idx as usize] = area;
    }

    /// Returns the node's stencil mask, if any.
    ///
    /// The link is generational: if the mask node has since been destroyed,
    /// the link resolves as no mask even when its slot has been reused.
    #[must_use]
    pub fn mask(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.mask[id.idx as usize].filter(|&m| self.is_alive(m))
    }

    /// Sets or clears the node's stencil mask.
    ///
    /// The mask node is referenced, not owned; while assigned it stops
    /// rendering as ordinary content and only contributes stencil geometry.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale.
    pub fn set_mask(&mut self, id: NodeId, mask: Option<NodeId>) {
        self.validate(id);
        if let Some(old) = self.mask[id.idx as usize] {
            if self.is_alive(old) {
                self.is_mask[old.idx as usize] = false;
            }
        }
        match mask {
            Some(m) => {
                self.validate(m);
                self.mask[id.idx as usize] = Some(m);
                self.is_mask[m.idx as usize] = true;
            }
            None => {
                self.mask[id.idx as usize] = None;
            }
        }
    }

    /// Returns whether the node currently serves as another node's mask.
    #[must_use]
    pub fn is_mask_node(&self, id: NodeId) -> bool {
        self.validate(id);
        self.is_mask[id.idx as usize]
    }

    /// Returns the node's z-index.
    #[must_use]
    pub fn z_index(&self, id: NodeId) -> i32 {
        self.validate(id);
        self.z_index[id.idx as usize]
    }

    /// Sets the z-index and marks the parent's child order dirty.
    ///
    /// Sorting only happens for parents with
    /// [`set_sortable_children`](Self::set_sortable_children) enabled; ties
    /// keep their current order (stable).
    pub fn set_z_index(&mut self, id: NodeId, z: i32) {
        self.validate(id);
        self.z_index[id.idx as usize] = z;
        let p = self.parent[id.idx as usize];
        if p != INVALID {
            self.sort_dirty[p as usize] = true;
        }
    }

    /// Enables or disables z-index sorting of this node's children.
    pub fn set_sortable_children(&mut self, id: NodeId, sortable: bool) {
        self.validate(id);
        self.sortable_children[id.idx as usize] = sortable;
        self.sort_dirty[id.idx as usize] = true;
    }

    /// Returns the node's accumulated world-space bounds revision counter.
    #[must_use]
    pub fn bounds_revision(&self, id: NodeId) -> u32 {
        self.validate(id);
        self.bounds[id.idx as usize].update_id()
    }

    // -- Internal helpers --

    /// The mask's slot index, only while the generational link is live.
    pub(crate) fn live_mask(&self, idx: u32) -> Option<u32> {
        self.mask[idx as usize]
            .filter(|&m| self.is_alive(m))
            .map(|m| m.idx)
    }

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    /// Panics if attaching `child` under `parent` would create a cycle.
    fn assert_no_cycle(&self, parent: u32, child: u32) {
        let mut cursor = parent;
        while cursor != INVALID {
            assert!(
                cursor != child,
                "cannot attach a node to itself or its own descendant"
            );
            cursor = self.parent[cursor as usize];
        }
    }

    /// Removes `idx` from its parent's child list.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
    }
}
