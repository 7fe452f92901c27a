// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decomposed node transform with change-version tracking.
//!
//! A [`Transform`] owns a local matrix (relative to the parent) and a world
//! matrix (relative to the root), both recomposed lazily from version
//! counters:
//!
//! - Mutating any decomposed field (position, scale, pivot, skew, rotation)
//!   bumps `local_version`. The local matrix is valid iff `local_version ==
//!   applied_local_version`.
//! - The world matrix is valid iff the snapshot taken of the parent's
//!   `world_version` still matches, and the local matrix did not change.
//!   Recomposing the world matrix bumps this transform's own
//!   `world_version`, which cascades invalidation to children on the next
//!   top-down pass.
//!
//! The core performance invariant: a subtree whose ancestors and own local
//! state are unchanged performs **zero matrix work** during an update pass.

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use kurbo::{Point, Vec2};

use crate::matrix::Matrix;

/// Sentinel parent snapshot meaning "never composed" — forces the next
/// [`Transform::update_world`] to recompose unconditionally.
const PARENT_UNSEEN: u32 = u32::MAX;

/// Local/world affine transform pair with decomposed fields and versioning.
///
/// Owned by exactly one node; created with it and recycled with it.
#[derive(Clone, Debug)]
pub struct Transform {
    local: Matrix,
    world: Matrix,

    position: Point,
    scale: Vec2,
    pivot: Point,
    skew: Vec2,
    rotation: f64,

    // Cosine/sine quartet shared by rotation and skew. Updated whenever
    // either field changes; rotation and skew act on independent axes.
    cos_row_x: f64,
    sin_row_x: f64,
    neg_sin_row_y: f64,
    cos_row_y: f64,

    local_version: u32,
    applied_local_version: u32,
    world_version: u32,
    parent_world_seen: u32,
}

impl Default for Transform {
    fn default() -> Self {
        Self::new()
    }
}

impl Transform {
    /// Creates an identity transform.
    #[must_use]
    pub fn new() -> Self {
        Self {
            local: Matrix::IDENTITY,
            world: Matrix::IDENTITY,
            position: Point::ZERO,
            scale: Vec2::new(1.0, 1.0),
            pivot: Point::ZERO,
            skew: Vec2::ZERO,
            rotation: 0.0,
            cos_row_x: 1.0,
            sin_row_x: 0.0,
            neg_sin_row_y: 0.0,
            cos_row_y: 1.0,
            local_version: 0,
            applied_local_version: 0,
            world_version: 0,
            parent_world_seen: PARENT_UNSEEN,
        }
    }

    // -- Decomposed field accessors --

    /// Position of the node's pivot in the parent's coordinate space.
    #[inline]
    #[must_use]
    pub fn position(&self) -> Point {
        self.position
    }

    /// Per-axis scale factors.
    #[inline]
    #[must_use]
    pub fn scale(&self) -> Vec2 {
        self.scale
    }

    /// Pivot point in local coordinates.
    #[inline]
    #[must_use]
    pub fn pivot(&self) -> Point {
        self.pivot
    }

    /// Per-axis skew angles (radians).
    #[inline]
    #[must_use]
    pub fn skew(&self) -> Vec2 {
        self.skew
    }

    /// Rotation angle (radians).
    #[inline]
    #[must_use]
    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    // -- Mutation (each bumps `local_version`) --

    /// Sets the position.
    pub fn set_position(&mut self, x: f64, y: f64) {
        self.position = Point::new(x, y);
        self.local_version = self.local_version.wrapping_add(1);
    }

    /// Sets the per-axis scale.
    pub fn set_scale(&mut self, x: f64, y: f64) {
        self.scale = Vec2::new(x, y);
        self.local_version = self.local_version.wrapping_add(1);
    }

    /// Sets the pivot.
    pub fn set_pivot(&mut self, x: f64, y: f64) {
        self.pivot = Point::new(x, y);
        self.local_version = self.local_version.wrapping_add(1);
    }

    /// Sets the per-axis skew (radians). Does not perturb rotation.
    pub fn set_skew(&mut self, x: f64, y: f64) {
        self.skew = Vec2::new(x, y);
        self.update_quartet();
        self.local_version = self.local_version.wrapping_add(1);
    }

    /// Sets the rotation (radians). Does not perturb skew.
    pub fn set_rotation(&mut self, radians: f64) {
        self.rotation = radians;
        self.update_quartet();
        self.local_version = self.local_version.wrapping_add(1);
    }

    /// Recomputes the cached cosine/sine quartet from rotation and skew.
    fn update_quartet(&mut self) {
        let (sin_x, cos_x) = (self.rotation + self.skew.y).sin_cos();
        let (sin_y, cos_y) = (self.rotation - self.skew.x).sin_cos();
        self.cos_row_x = cos_x;
        self.sin_row_x = sin_x;
        self.neg_sin_row_y = -sin_y;
        self.cos_row_y = cos_y;
    }

    // -- Matrix access --

    /// The local matrix. Valid after [`update_local`](Self::update_local).
    #[inline]
    #[must_use]
    pub fn local_matrix(&self) -> &Matrix {
        &self.local
    }

    /// The world matrix. Valid after [`update_world`](Self::update_world).
    #[inline]
    #[must_use]
    pub fn world_matrix(&self) -> &Matrix {
        &self.world
    }

    /// Monotonic counter bumped each time the world matrix is recomposed.
    #[inline]
    #[must_use]
    pub fn world_version(&self) -> u32 {
        self.world_version
    }

    // -- Recomposition --

    /// Recomposes the local matrix from the decomposed fields, if any of
    /// them changed since the last recompose. Returns whether work was done.
    pub fn update_local(&mut self) -> bool {
        if self.local_version == self.applied_local_version {
            return false;
        }
        self.applied_local_version = self.local_version;

        let a = self.cos_row_x * self.scale.x;
        let b = self.sin_row_x * self.scale.x;
        let c = self.neg_sin_row_y * self.scale.y;
        let d = self.cos_row_y * self.scale.y;
        self.local = Matrix {
            a,
            b,
            c,
            d,
            tx: self.position.x - (self.pivot.x * a + self.pivot.y * c),
            ty: self.position.y - (self.pivot.x * b + self.pivot.y * d),
        };

        // Force the world matrix to recompose on the next update pass.
        self.parent_world_seen = PARENT_UNSEEN;
        true
    }

    /// Recomposes the world matrix against the parent's world matrix, if
    /// either the local matrix or the parent's world version changed.
    /// Returns whether work was done.
    ///
    /// Calling this twice with no intervening mutation leaves the world
    /// matrix bit-identical and does not bump `world_version`.
    pub fn update_world(&mut self, parent_world: &Matrix, parent_world_version: u32) -> bool {
        self.update_local();
        if self.parent_world_seen == parent_world_version {
            return false;
        }
        self.world = *parent_world * self.local;
        self.world_version = self.world_version.wrapping_add(1);
        self.parent_world_seen = parent_world_version;
        true
    }

    /// Forces the next [`update_world`](Self::update_world) to recompose,
    /// regardless of the parent's version. Used when the ancestor chain
    /// itself changes (re-parenting).
    pub fn invalidate_world(&mut self) {
        self.parent_world_seen = PARENT_UNSEEN;
    }
}
