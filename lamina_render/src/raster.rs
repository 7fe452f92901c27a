// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for rasterization.
//!
//! Lamina splits actual pixel work into *backend* crates. The renderer in
//! this crate only orchestrates: it decides draw order, target binding,
//! stencil-mask nesting, and filter-pass plumbing, and expresses all of it
//! through the [`Rasterizer`] trait. A backend provides:
//!
//! - **Texture storage** — `create_texture`/`destroy_texture` manage
//!   offscreen color targets, addressed by backend-assigned [`TextureKey`]s.
//!   Decoding and uploading image content is out of scope entirely; leaf
//!   nodes reference already-resident textures via
//!   [`TextureId`](lamina_core::node::TextureId).
//! - **Target binding** — `bind_target` selects the screen or an offscreen
//!   texture together with the logical frame being rendered into it.
//! - **Drawing** — `draw` consumes a flushed batch of [`DrawRecord`]s in
//!   order; `push_mask`/`pop_mask` bracket stencil regions.
//! - **Filter passes** — `apply_filter` runs one full-target pass of a
//!   backend-compiled program, sampling `input` and writing to `output`.
//! - **Loss reporting** — `context_lost` lets the renderer skip whole
//!   frames while the underlying context is gone.
//!
//! Both GPU-backed and recording test backends implement this trait (see
//! `testing`), enabling generic frame loops and test doubles.

use alloc::vec::Vec;
use core::fmt;

use kurbo::Rect;

use lamina_core::filter::FilterProgramId;
use lamina_core::matrix::Matrix;
use lamina_core::node::{NodeId, TextureId};

use crate::filters::FilterUniforms;

/// An opaque handle to a backend-managed render texture.
///
/// Keys are assigned by the backend in `create_texture` and passed back
/// without interpretation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureKey(pub u64);

impl fmt::Debug for TextureKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureKey({})", self.0)
    }
}

/// Where draw output lands.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderTarget {
    /// The backend's default framebuffer.
    Screen,
    /// An offscreen texture previously created through the rasterizer.
    Texture(TextureKey),
}

/// The geometry of one draw record.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawKind {
    /// An axis-aligned quad anchored at the local origin.
    Quad {
        /// Width in local units.
        width: f64,
        /// Height in local units.
        height: f64,
    },
    /// A triangle list with interleaved `x, y` vertices.
    Mesh {
        /// Interleaved vertex positions, three pairs per triangle.
        vertices: Vec<f64>,
    },
}

/// A single queued draw command.
///
/// Records are produced in paint order during the render walk and handed to
/// the backend in batches at flush points.
#[derive(Clone, Debug)]
pub struct DrawRecord {
    /// The node this record originates from.
    pub node: NodeId,
    /// The resident texture sampled by the draw.
    pub texture: TextureId,
    /// World transform at draw time.
    pub world: Matrix,
    /// Effective alpha (0.0–1.0, accumulated from ancestors).
    pub alpha: f64,
    /// Geometry.
    pub kind: DrawKind,
}

/// Issues orchestrated rendering work to a concrete backend.
///
/// Call order is meaningful: the renderer guarantees that `draw` only runs
/// against the most recently bound target, that `push_mask`/`pop_mask` and
/// filter passes nest strictly, and that every created texture is destroyed
/// at most once.
pub trait Rasterizer {
    /// Allocates an offscreen color target of the given physical size in
    /// device pixels and returns its key.
    fn create_texture(&mut self, width: u32, height: u32) -> TextureKey;

    /// Frees a texture previously returned by
    /// [`create_texture`](Self::create_texture).
    fn destroy_texture(&mut self, key: TextureKey);

    /// Makes `target` the destination of subsequent draws. `frame` is the
    /// logical rectangle being rendered into it.
    fn bind_target(&mut self, target: RenderTarget, frame: Rect);

    /// Clears the currently bound target to transparent.
    fn clear(&mut self);

    /// Begins a stencil region defined by the given records; subsequent
    /// draws are clipped to it until the matching [`pop_mask`](Self::pop_mask).
    fn push_mask(&mut self, records: &[DrawRecord]);

    /// Ends the innermost stencil region.
    fn pop_mask(&mut self);

    /// Draws a batch of records, in order, into the bound target.
    fn draw(&mut self, records: &[DrawRecord]);

    /// Runs one full-target pass of `program`, sampling `input` and writing
    /// to `output`. `clear` requests clearing `output` first (used for
    /// intermediate ping-pong passes, never for the final destination).
    fn apply_filter(
        &mut self,
        program: FilterProgramId,
        input: TextureKey,
        output: RenderTarget,
        uniforms: &FilterUniforms,
        clear: bool,
    );

    /// Whether the underlying context is currently lost. When `true`, the
    /// renderer skips the whole frame without issuing any call.
    fn context_lost(&self) -> bool {
        false
    }
}
