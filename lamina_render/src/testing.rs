// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A recording [`Rasterizer`] for tests.
//!
//! Backends are exercised through the trait boundary, so renderer and
//! filter behavior can be pinned without a GPU: the recorder logs every
//! call as a [`RasterOp`] and assertions inspect the sequence.

use alloc::vec::Vec;

use kurbo::Rect;

use lamina_core::filter::FilterProgramId;

use crate::filters::FilterUniforms;
use crate::raster::{DrawRecord, Rasterizer, RenderTarget, TextureKey};

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum RasterOp {
    /// `create_texture` with the assigned key and physical size.
    CreateTexture {
        /// Assigned key value.
        key: u64,
        /// Physical width.
        width: u32,
        /// Physical height.
        height: u32,
    },
    /// `destroy_texture`.
    DestroyTexture(u64),
    /// `bind_target`.
    BindTarget {
        /// The bound target.
        target: RenderTarget,
        /// The logical frame.
        frame: Rect,
    },
    /// `clear` of the bound target.
    Clear,
    /// `push_mask` with the number of stencil records.
    PushMask(usize),
    /// `pop_mask`.
    PopMask,
    /// `draw` with the number of records in the batch.
    Draw(usize),
    /// `apply_filter`.
    ApplyFilter {
        /// Program handle value.
        program: u32,
        /// Input texture key value.
        input: u64,
        /// Output target.
        output: RenderTarget,
        /// Whether the output was cleared first.
        clear: bool,
    },
}

/// A [`Rasterizer`] that records calls instead of drawing.
#[derive(Debug, Default)]
pub struct RecordingRasterizer {
    /// Every recorded call, in order.
    pub ops: Vec<RasterOp>,
    /// When `true`, `context_lost` reports a lost context.
    pub lost: bool,
    next_key: u64,
}

impl RecordingRasterizer {
    /// Number of `create_texture` calls so far.
    #[must_use]
    pub fn created_textures(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, RasterOp::CreateTexture { .. }))
            .count()
    }

    /// Keys passed to `destroy_texture`, in order.
    #[must_use]
    pub fn destroyed_textures(&self) -> Vec<TextureKey> {
        self.ops
            .iter()
            .filter_map(|op| match op {
                RasterOp::DestroyTexture(key) => Some(TextureKey(*key)),
                _ => None,
            })
            .collect()
    }

    /// Physical size of the most recent `create_texture` call.
    #[must_use]
    pub fn last_created_size(&self) -> Option<(u32, u32)> {
        self.ops.iter().rev().find_map(|op| match op {
            RasterOp::CreateTexture { width, height, .. } => Some((*width, *height)),
            _ => None,
        })
    }

    /// Total records drawn across all `draw` calls.
    #[must_use]
    pub fn drawn_records(&self) -> usize {
        self.ops
            .iter()
            .filter_map(|op| match op {
                RasterOp::Draw(n) => Some(*n),
                _ => None,
            })
            .sum()
    }
}

impl Rasterizer for RecordingRasterizer {
    fn create_texture(&mut self, width: u32, height: u32) -> TextureKey {
        self.next_key += 1;
        let key = self.next_key;
        self.ops.push(RasterOp::CreateTexture { key, width, height });
        TextureKey(key)
    }

    fn destroy_texture(&mut self, key: TextureKey) {
        self.ops.push(RasterOp::DestroyTexture(key.0));
    }

    fn bind_target(&mut self, target: RenderTarget, frame: Rect) {
        self.ops.push(RasterOp::BindTarget { target, frame });
    }

    fn clear(&mut self) {
        self.ops.push(RasterOp::Clear);
    }

    fn push_mask(&mut self, records: &[DrawRecord]) {
        self.ops.push(RasterOp::PushMask(records.len()));
    }

    fn pop_mask(&mut self) {
        self.ops.push(RasterOp::PopMask);
    }

    fn draw(&mut self, records: &[DrawRecord]) {
        self.ops.push(RasterOp::Draw(records.len()));
    }

    fn apply_filter(
        &mut self,
        program: FilterProgramId,
        input: TextureKey,
        output: RenderTarget,
        _uniforms: &FilterUniforms,
        clear: bool,
    ) {
        self.ops.push(RasterOp::ApplyFilter {
            program: program.0,
            input: input.0,
            output,
            clear,
        });
    }

    fn context_lost(&self) -> bool {
        self.lost
    }
}
