// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Axis-aligned bounds accumulation.
//!
//! [`Bounds`] is a running min/max accumulator. The empty state is
//! `(+inf, +inf, −inf, −inf)`, so `min_x > max_x` identifies it without a
//! separate flag, and any added point becomes the initial extent. "No
//! bounds" is a valid, non-exceptional state — invisible or childless
//! subtrees report the canonical empty rectangle, never an error and never
//! NaN.
//!
//! The `update_id` counter invalidates cached rectangles derived from the
//! accumulator; the node store bumps it whenever a node's world matrix
//! recomposes.

use kurbo::{Point, Rect};

use crate::matrix::Matrix;

/// A running axis-aligned bounding box stored as min/max corners.
#[derive(Clone, Debug)]
pub struct Bounds {
    /// Left edge, `+inf` when empty.
    pub min_x: f64,
    /// Top edge, `+inf` when empty.
    pub min_y: f64,
    /// Right edge, `−inf` when empty.
    pub max_x: f64,
    /// Bottom edge, `−inf` when empty.
    pub max_y: f64,
    update_id: u32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::new()
    }
}

impl Bounds {
    /// Creates an empty accumulator.
    #[must_use]
    pub fn new() -> Self {
        Self {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
            update_id: 0,
        }
    }

    /// Whether no geometry has been accumulated.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    /// Resets to the empty state. Does not touch `update_id`.
    pub fn clear(&mut self) {
        self.min_x = f64::INFINITY;
        self.min_y = f64::INFINITY;
        self.max_x = f64::NEG_INFINITY;
        self.max_y = f64::NEG_INFINITY;
    }

    /// Monotonic counter identifying the current revision of this bounds.
    #[inline]
    #[must_use]
    pub fn update_id(&self) -> u32 {
        self.update_id
    }

    /// Bumps the revision counter, invalidating cached derived rectangles.
    pub fn invalidate(&mut self) {
        self.update_id = self.update_id.wrapping_add(1);
    }

    /// Unions a single point.
    #[inline]
    pub fn add_point(&mut self, p: Point) {
        self.min_x = self.min_x.min(p.x);
        self.min_y = self.min_y.min(p.y);
        self.max_x = self.max_x.max(p.x);
        self.max_y = self.max_y.max(p.y);
    }

    /// Unions a single point transformed through `matrix`.
    #[inline]
    pub fn add_point_matrix(&mut self, matrix: &Matrix, p: Point) {
        self.add_point(matrix.apply(p));
    }

    /// Unions an axis-aligned frame given by two corners, untransformed.
    pub fn add_frame_plain(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) {
        self.min_x = self.min_x.min(x0).min(x1);
        self.min_y = self.min_y.min(y0).min(y1);
        self.max_x = self.max_x.max(x0).max(x1);
        self.max_y = self.max_y.max(y0).max(y1);
    }

    /// Unions a local-space frame transformed through `matrix`.
    ///
    /// All four corners are transformed and accumulated — under rotation or
    /// skew any corner can be extremal, so two are not enough.
    pub fn add_frame(&mut self, matrix: &Matrix, x0: f64, y0: f64, x1: f64, y1: f64) {
        self.add_point(matrix.apply(Point::new(x0, y0)));
        self.add_point(matrix.apply(Point::new(x1, y0)));
        self.add_point(matrix.apply(Point::new(x0, y1)));
        self.add_point(matrix.apply(Point::new(x1, y1)));
    }

    /// Unions a range of interleaved `x, y` vertices transformed through
    /// `matrix`. `begin`/`end` are indices into `vertices` and must be even.
    ///
    /// # Panics
    ///
    /// Panics if the range is out of bounds or not vertex-aligned.
    pub fn add_vertex_range(&mut self, matrix: &Matrix, vertices: &[f64], begin: usize, end: usize) {
        assert!(
            begin % 2 == 0 && end % 2 == 0 && end <= vertices.len(),
            "vertex range {begin}..{end} not aligned to x,y pairs (len {})",
            vertices.len()
        );
        let mut i = begin;
        while i < end {
            self.add_point(matrix.apply(Point::new(vertices[i], vertices[i + 1])));
            i += 2;
        }
    }

    /// Unions another accumulated bounds.
    pub fn add_bounds(&mut self, other: &Self) {
        if other.is_empty() {
            return;
        }
        self.add_frame_plain(other.min_x, other.min_y, other.max_x, other.max_y);
    }

    /// Unions the intersection of `other` and `mask`.
    ///
    /// The intersection is computed conservatively; if it is degenerate
    /// (`min > max` on either axis) it contributes nothing.
    pub fn add_bounds_mask(&mut self, other: &Self, mask: Rect) {
        if other.is_empty() {
            return;
        }
        let min_x = other.min_x.max(mask.x0);
        let min_y = other.min_y.max(mask.y0);
        let max_x = other.max_x.min(mask.x1);
        let max_y = other.max_y.min(mask.y1);
        if min_x > max_x || min_y > max_y {
            return;
        }
        self.add_frame_plain(min_x, min_y, max_x, max_y);
    }

    /// Grows the accumulated extent by `padding` on every side.
    ///
    /// No-op when empty.
    pub fn pad(&mut self, padding: f64) {
        if self.is_empty() {
            return;
        }
        self.min_x -= padding;
        self.min_y -= padding;
        self.max_x += padding;
        self.max_y += padding;
    }

    /// Returns the accumulated extent as a rectangle.
    ///
    /// Width and height are always re-derived from the corners
    /// (`max − min`), and the empty state returns the canonical
    /// [`Rect::ZERO`].
    #[must_use]
    pub fn rect(&self) -> Rect {
        if self.is_empty() {
            return Rect::ZERO;
        }
        Rect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_bounds_returns_canonical_rect() {
        let b = Bounds::new();
        assert!(b.is_empty());
        let r = b.rect();
        assert_eq!(r, Rect::ZERO);
        assert!(r.x0.is_finite() && r.y1.is_finite());
    }

    #[test]
    fn add_point_sets_extent() {
        let mut b = Bounds::new();
        b.add_point(Point::new(2.0, 3.0));
        b.add_point(Point::new(-1.0, 5.0));
        assert_eq!(b.rect(), Rect::new(-1.0, 3.0, 2.0, 5.0));
    }

    #[test]
    fn union_is_commutative() {
        let mut a = Bounds::new();
        a.add_frame_plain(0.0, 0.0, 10.0, 10.0);
        let mut b = Bounds::new();
        b.add_frame_plain(5.0, -5.0, 20.0, 8.0);

        let mut ab = Bounds::new();
        ab.add_bounds(&a);
        ab.add_bounds(&b);

        let mut ba = Bounds::new();
        ba.add_bounds(&b);
        ba.add_bounds(&a);

        assert_eq!(ab.rect(), ba.rect());
    }

    #[test]
    fn union_matches_independent_geometric_union() {
        // Regression guard: the rectangle must be built from corner deltas,
        // not from raw corner coordinates reused as width/height.
        let mut a = Bounds::new();
        a.add_frame_plain(2.0, 3.0, 10.0, 12.0);
        let mut b = Bounds::new();
        b.add_frame_plain(-4.0, 6.0, 5.0, 20.0);

        let mut acc = Bounds::new();
        acc.add_bounds(&a);
        acc.add_bounds(&b);

        let expected = Rect::new(2.0, 3.0, 10.0, 12.0).union(Rect::new(-4.0, 6.0, 5.0, 20.0));
        assert_eq!(acc.rect(), expected);
        assert_eq!(acc.rect().width(), expected.width());
        assert_eq!(acc.rect().height(), expected.height());
    }

    #[test]
    fn add_frame_transforms_all_four_corners() {
        // A quarter turn makes the former top-right corner extremal on -x.
        let rot = Matrix::from_rotation(core::f64::consts::FRAC_PI_2);
        let mut b = Bounds::new();
        b.add_frame(&rot, 0.0, 0.0, 10.0, 4.0);
        let r = b.rect();
        assert!((r.x0 - -4.0).abs() < 1e-9);
        assert!((r.x1 - 0.0).abs() < 1e-9);
        assert!((r.y0 - 0.0).abs() < 1e-9);
        assert!((r.y1 - 10.0).abs() < 1e-9);
    }

    #[test]
    fn add_vertex_range_respects_window() {
        let verts = [0.0, 0.0, 100.0, 100.0, 3.0, 4.0, 7.0, 1.0];
        let mut b = Bounds::new();
        b.add_vertex_range(&Matrix::IDENTITY, &verts, 4, 8);
        assert_eq!(b.rect(), Rect::new(3.0, 1.0, 7.0, 4.0));
    }

    #[test]
    #[should_panic(expected = "not aligned")]
    fn add_vertex_range_rejects_odd_offsets() {
        let verts = [0.0, 0.0, 1.0, 1.0];
        let mut b = Bounds::new();
        b.add_vertex_range(&Matrix::IDENTITY, &verts, 1, 3);
    }

    #[test]
    fn masked_union_clips_to_mask() {
        let mut child = Bounds::new();
        child.add_frame_plain(0.0, 0.0, 100.0, 100.0);

        let mut acc = Bounds::new();
        acc.add_bounds_mask(&child, Rect::new(25.0, 25.0, 50.0, 50.0));
        assert_eq!(acc.rect(), Rect::new(25.0, 25.0, 50.0, 50.0));
    }

    #[test]
    fn degenerate_masked_intersection_contributes_nothing() {
        let mut child = Bounds::new();
        child.add_frame_plain(0.0, 0.0, 10.0, 10.0);

        let mut acc = Bounds::new();
        acc.add_bounds_mask(&child, Rect::new(50.0, 50.0, 60.0, 60.0));
        assert!(acc.is_empty());
    }

    #[test]
    fn empty_operand_union_is_identity() {
        let empty = Bounds::new();
        let mut acc = Bounds::new();
        acc.add_frame_plain(1.0, 1.0, 2.0, 2.0);
        let before = acc.rect();
        acc.add_bounds(&empty);
        assert_eq!(acc.rect(), before);
    }

    #[test]
    fn pad_grows_every_side() {
        let mut b = Bounds::new();
        b.add_frame_plain(10.0, 10.0, 20.0, 20.0);
        b.pad(4.0);
        assert_eq!(b.rect(), Rect::new(6.0, 6.0, 24.0, 24.0));

        let mut empty = Bounds::new();
        empty.pad(4.0);
        assert!(empty.is_empty());
    }

    #[test]
    fn invalidate_bumps_update_id() {
        let mut b = Bounds::new();
        let id = b.update_id();
        b.invalidate();
        assert_ne!(b.update_id(), id);
    }
}
