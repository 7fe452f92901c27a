// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal 2D affine matrix.
//!
//! This type covers the subset of 2D affine transforms that `lamina_core`
//! actually needs (identity, multiply, point application, inversion) without
//! pulling in a full linear-algebra crate. Components are named after the
//! conventional six-coefficient affine form:
//!
//! ```text
//! | a  c  tx |
//! | b  d  ty |
//! | 0  0  1  |
//! ```
//!
//! so a point maps as `x' = a·x + c·y + tx`, `y' = b·x + d·y + ty`.

use core::ops::Mul;

#[cfg(not(feature = "std"))]
use kurbo::common::FloatFuncs as _;

use kurbo::Point;

/// Determinants smaller than this are treated as singular.
const DET_EPSILON: f64 = 1e-10;

/// A six-coefficient 2D affine transform.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Matrix {
    /// X-axis basis, x component.
    pub a: f64,
    /// X-axis basis, y component.
    pub b: f64,
    /// Y-axis basis, x component.
    pub c: f64,
    /// Y-axis basis, y component.
    pub d: f64,
    /// Translation, x component.
    pub tx: f64,
    /// Translation, y component.
    pub ty: f64,
}

impl Matrix {
    /// The identity matrix.
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        tx: 0.0,
        ty: 0.0,
    };

    /// Creates a matrix from its six coefficients.
    #[inline]
    #[must_use]
    pub const fn new(a: f64, b: f64, c: f64, d: f64, tx: f64, ty: f64) -> Self {
        Self { a, b, c, d, tx, ty }
    }

    /// Creates a pure translation.
    #[inline]
    #[must_use]
    pub const fn from_translation(tx: f64, ty: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            tx,
            ty,
        }
    }

    /// Creates a non-uniform scale.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Creates a counter-clockwise rotation (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation(radians: f64) -> Self {
        let (sin, cos) = radians.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            tx: 0.0,
            ty: 0.0,
        }
    }

    /// Applies the matrix to a point.
    #[inline]
    #[must_use]
    pub fn apply(&self, p: Point) -> Point {
        Point::new(
            self.a * p.x + self.c * p.y + self.tx,
            self.b * p.x + self.d * p.y + self.ty,
        )
    }

    /// The determinant of the linear part.
    #[inline]
    #[must_use]
    pub fn determinant(&self) -> f64 {
        self.a * self.d - self.b * self.c
    }

    /// Returns the inverse matrix, or `None` if the matrix is singular.
    #[must_use]
    pub fn invert(&self) -> Option<Self> {
        let det = self.determinant();
        if det.abs() < DET_EPSILON {
            return None;
        }
        let inv_det = 1.0 / det;
        Some(Self {
            a: self.d * inv_det,
            b: -self.b * inv_det,
            c: -self.c * inv_det,
            d: self.a * inv_det,
            tx: (self.c * self.ty - self.d * self.tx) * inv_det,
            ty: (self.b * self.tx - self.a * self.ty) * inv_det,
        })
    }

    /// Applies the inverse matrix to a point, or `None` if singular.
    #[inline]
    #[must_use]
    pub fn apply_inverse(&self, p: Point) -> Option<Point> {
        self.invert().map(|inv| inv.apply(p))
    }
}

impl Default for Matrix {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Mul for Matrix {
    type Output = Self;

    /// Composes two transforms: `(p * l).apply(pt) == p.apply(l.apply(pt))`,
    /// i.e. the right-hand side applies first.
    fn mul(self, rhs: Self) -> Self {
        Self {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            tx: self.a * rhs.tx + self.c * rhs.ty + self.tx,
            ty: self.b * rhs.tx + self.d * rhs.ty + self.ty,
        }
    }
}

#[cfg(test)]
mod tests {
    #[cfg(not(feature = "std"))]
    use kurbo::common::FloatFuncs as _;

    use super::*;

    fn assert_close(a: Point, b: Point) {
        assert!((a.x - b.x).abs() < 1e-9, "x: {} vs {}", a.x, b.x);
        assert!((a.y - b.y).abs() < 1e-9, "y: {} vs {}", a.y, b.y);
    }

    #[test]
    fn identity_is_noop() {
        let p = Point::new(3.0, -7.5);
        assert_eq!(Matrix::IDENTITY.apply(p), p);
    }

    #[test]
    fn translation_applies() {
        let m = Matrix::from_translation(10.0, 20.0);
        assert_eq!(m.apply(Point::ZERO), Point::new(10.0, 20.0));
    }

    #[test]
    fn mul_applies_rhs_first() {
        let translate = Matrix::from_translation(10.0, 0.0);
        let scale = Matrix::from_scale(2.0, 2.0);

        // Scale first, then translate.
        let m = translate * scale;
        assert_close(m.apply(Point::new(1.0, 1.0)), Point::new(12.0, 2.0));

        // Translate first, then scale.
        let m = scale * translate;
        assert_close(m.apply(Point::new(1.0, 1.0)), Point::new(22.0, 2.0));
    }

    #[test]
    fn rotation_quarter_turn() {
        let m = Matrix::from_rotation(core::f64::consts::FRAC_PI_2);
        assert_close(m.apply(Point::new(1.0, 0.0)), Point::new(0.0, 1.0));
    }

    #[test]
    fn invert_round_trips() {
        let m = Matrix::from_translation(5.0, -3.0)
            * Matrix::from_rotation(0.7)
            * Matrix::from_scale(2.0, 0.5);
        let inv = m.invert().expect("non-singular");
        let p = Point::new(4.0, 9.0);
        assert_close(inv.apply(m.apply(p)), p);
    }

    #[test]
    fn singular_matrix_has_no_inverse() {
        let m = Matrix::from_scale(0.0, 1.0);
        assert!(m.invert().is_none());
        assert!(m.apply_inverse(Point::new(1.0, 1.0)).is_none());
    }
}
