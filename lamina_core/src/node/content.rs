// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Node content variants.
//!
//! Nodes come in a closed set of variants behind a small capability surface
//! (measure bounds, hit-test a local point) rather than an inheritance
//! chain, keeping the transform and bounds algorithms variant-agnostic.

use alloc::vec::Vec;

use kurbo::Point;

use crate::bounds::Bounds;
use crate::matrix::Matrix;

use super::id::TextureId;

/// What a node contributes visually.
#[derive(Clone, Debug, PartialEq)]
pub enum Content {
    /// A pure grouping node with no geometry of its own.
    Group,
    /// An axis-aligned textured quad anchored at the local origin.
    Quad {
        /// Width in local units.
        width: f64,
        /// Height in local units.
        height: f64,
        /// The texture presented by the quad.
        texture: TextureId,
    },
    /// A textured triangle list with interleaved `x, y` vertices.
    Mesh {
        /// Interleaved vertex positions; length must be a multiple of 6
        /// (three `x, y` pairs per triangle).
        vertices: Vec<f64>,
        /// The texture sampled by the mesh.
        texture: TextureId,
    },
}

impl Content {
    /// Accumulates this content's world-space extent into `bounds`.
    ///
    /// Groups contribute nothing; their extent comes from children.
    pub fn measure_bounds(&self, world: &Matrix, bounds: &mut Bounds) {
        match self {
            Self::Group => {}
            Self::Quad { width, height, .. } => {
                bounds.add_frame(world, 0.0, 0.0, *width, *height);
            }
            Self::Mesh { vertices, .. } => {
                bounds.add_vertex_range(world, vertices, 0, vertices.len());
            }
        }
    }

    /// Whether a point in the node's local space lies inside the content.
    #[must_use]
    pub fn contains_point(&self, local: Point) -> bool {
        match self {
            Self::Group => false,
            Self::Quad { width, height, .. } => {
                local.x >= 0.0 && local.x <= *width && local.y >= 0.0 && local.y <= *height
            }
            Self::Mesh { vertices, .. } => {
                vertices.chunks_exact(6).any(|tri| {
                    point_in_triangle(
                        local,
                        Point::new(tri[0], tri[1]),
                        Point::new(tri[2], tri[3]),
                        Point::new(tri[4], tri[5]),
                    )
                })
            }
        }
    }
}

/// Sign of the cross product `(b − a) × (p − a)`.
fn edge_sign(p: Point, a: Point, b: Point) -> f64 {
    (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x)
}

/// Barycentric-sign containment test, tolerant of either winding.
fn point_in_triangle(p: Point, a: Point, b: Point, c: Point) -> bool {
    let d1 = edge_sign(p, a, b);
    let d2 = edge_sign(p, b, c);
    let d3 = edge_sign(p, c, a);

    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}
