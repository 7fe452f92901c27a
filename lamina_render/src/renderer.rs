// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame orchestration.
//!
//! [`Renderer::render`] turns one scene graph into one ordered stream of
//! backend calls: advance pools, propagate transforms, bind the
//! destination, walk the tree depth-first queueing draws, and flush the
//! batch wherever bound state changes (filter boundaries, stencil masks,
//! frame end). The whole frame runs or none of it does — a lost context is
//! reported before any backend call is issued, and there is no
//! mid-frame cancellation path.

use alloc::vec::Vec;

use kurbo::Rect;
use thiserror::Error;

use lamina_core::matrix::Matrix;
use lamina_core::node::{Content, NodeId, NodeStore};
use lamina_core::trace::{
    FrameBeginEvent, FrameEndEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, TraceSink, Tracer,
};

use crate::batch::Batch;
use crate::filters::FilterSystem;
use crate::raster::{DrawKind, DrawRecord, Rasterizer, RenderTarget};
use crate::texture_pool::TexturePool;

/// Where the renderer is within a frame.
///
/// Transitions run strictly `Idle → PreRender → Rendering → PostRender →
/// Idle`; a failed frame never leaves `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    /// Between frames.
    Idle,
    /// Dependent systems prepare (pool frame advance, GC sweep).
    PreRender,
    /// The update pass and render walk.
    Rendering,
    /// Frame bookkeeping after the final flush.
    PostRender,
}

/// A recoverable whole-frame failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The backend's rendering context is gone; the frame was skipped
    /// before any draw was issued.
    #[error("rendering context lost")]
    ContextLost,
}

/// Per-frame rendering options.
#[derive(Clone, Copy, Debug)]
pub struct RenderOptions {
    /// Destination of the frame.
    pub target: RenderTarget,
    /// Logical frame of the destination; defaults to the screen rectangle
    /// when `None`.
    pub target_frame: Option<Rect>,
    /// Whether to clear the destination before drawing.
    pub clear: bool,
    /// Transform applied above the scene roots (camera, device scale).
    pub base_transform: Option<Matrix>,
    /// Skips the transform pass; the caller guarantees world state is
    /// already fresh this frame.
    pub skip_update_transform: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            target: RenderTarget::Screen,
            target_frame: None,
            clear: true,
            base_transform: None,
            skip_update_transform: false,
        }
    }
}

/// Renders scene graphs through a [`Rasterizer`].
///
/// Owns the per-instance pools (render textures, filter states, the draw
/// batch), so independent renderers never share mutable caches.
#[derive(Debug)]
pub struct Renderer {
    phase: Phase,
    frame_index: u64,
    textures: TexturePool,
    filters: FilterSystem,
    batch: Batch,
    screen: Rect,
    resolution: f64,
    last_rendered: Option<NodeId>,
}

impl Renderer {
    /// Creates a renderer for a screen of the given logical size at
    /// `resolution` device pixels per logical unit.
    #[must_use]
    #[expect(
        clippy::cast_possible_truncation,
        reason = "screen sizes are clamped non-negative and ceiled before the cast"
    )]
    pub fn new(width: f64, height: f64, resolution: f64) -> Self {
        let px_w = ((width * resolution).ceil().max(1.0)) as u32;
        let px_h = ((height * resolution).ceil().max(1.0)) as u32;
        Self {
            phase: Phase::Idle,
            frame_index: 0,
            textures: TexturePool::new(px_w, px_h),
            filters: FilterSystem::new(),
            batch: Batch::new(),
            screen: Rect::new(0.0, 0.0, width, height),
            resolution,
            last_rendered: None,
        }
    }

    /// Current frame phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Number of frames fully rendered or in flight.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The root of the last fully rendered frame, if any.
    ///
    /// Read-only and stale between frames; downstream consumers (hit
    /// testing, accessibility) anchor on it.
    #[must_use]
    pub fn last_rendered(&self) -> Option<NodeId> {
        self.last_rendered
    }

    /// The render-texture pool, for balance inspection.
    #[must_use]
    pub fn texture_pool(&self) -> &TexturePool {
        &self.textures
    }

    /// Resizes the logical screen, flushing pooled screen-sized textures.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "screen sizes are clamped non-negative and ceiled before the cast"
    )]
    pub fn resize<R: Rasterizer + ?Sized>(&mut self, ras: &mut R, width: f64, height: f64) {
        let px_w = ((width * self.resolution).ceil().max(1.0)) as u32;
        let px_h = ((height * self.resolution).ceil().max(1.0)) as u32;
        self.screen = Rect::new(0.0, 0.0, width, height);
        self.textures
            .set_screen_size(ras, &mut Tracer::none(), px_w, px_h);
    }

    /// Renders one frame of the subtree rooted at `root`.
    ///
    /// # Errors
    ///
    /// [`FrameError::ContextLost`] if the backend reports a lost context;
    /// the frame is skipped entirely and no backend call is made.
    ///
    /// # Panics
    ///
    /// Panics if called re-entrantly or with a stale `root` handle.
    pub fn render<R: Rasterizer + ?Sized>(
        &mut self,
        ras: &mut R,
        store: &mut NodeStore,
        root: NodeId,
        options: &RenderOptions,
    ) -> Result<(), FrameError> {
        self.render_traced(ras, store, root, options, &mut Tracer::none())
    }

    /// Like [`render`](Self::render), with trace events delivered to
    /// `sink` (when the `trace` feature is enabled).
    pub fn render_with_sink<R: Rasterizer + ?Sized>(
        &mut self,
        ras: &mut R,
        store: &mut NodeStore,
        root: NodeId,
        options: &RenderOptions,
        sink: &mut dyn TraceSink,
    ) -> Result<(), FrameError> {
        self.render_traced(ras, store, root, options, &mut Tracer::new(sink))
    }

    fn render_traced<R: Rasterizer + ?Sized>(
        &mut self,
        ras: &mut R,
        store: &mut NodeStore,
        root: NodeId,
        options: &RenderOptions,
        tracer: &mut Tracer<'_>,
    ) -> Result<(), FrameError> {
        assert!(
            self.phase == Phase::Idle,
            "render re-entered while a frame is in flight"
        );
        if ras.context_lost() {
            return Err(FrameError::ContextLost);
        }

        self.frame_index += 1;
        let frame_index = self.frame_index;
        tracer.frame_begin(&FrameBeginEvent { frame_index });

        self.phase = Phase::PreRender;
        self.textures.advance_frame(ras, tracer);

        tracer.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase: PhaseKind::Update,
        });
        if !options.skip_update_transform {
            match options.base_transform {
                Some(base) => store.update_transforms_with(&base),
                None => store.update_transforms(),
            }
        }
        tracer.phase_end(&PhaseEndEvent {
            frame_index,
            phase: PhaseKind::Update,
        });

        self.phase = Phase::Rendering;
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index,
            phase: PhaseKind::Render,
        });

        let frame = options.target_frame.unwrap_or(self.screen);
        self.filters
            .begin_frame(options.target, frame, self.resolution, frame_index);
        ras.bind_target(options.target, frame);
        if options.clear {
            ras.clear();
        }

        let mut draws = 0;
        self.render_node(ras, store, root, tracer, &mut draws);
        draws += self.batch.flush(ras);
        assert!(self.filters.is_empty(), "filter stack not drained");

        ras.bind_target(RenderTarget::Screen, self.screen);
        tracer.phase_end(&PhaseEndEvent {
            frame_index,
            phase: PhaseKind::Render,
        });

        self.phase = Phase::PostRender;
        self.last_rendered = Some(root);
        tracer.frame_end(&FrameEndEvent { frame_index, draws });
        self.phase = Phase::Idle;
        Ok(())
    }

    /// Depth-first walk: skipped subtrees produce nothing; filter and
    /// stencil boundaries force batch flushes so queued draws land in the
    /// target that was bound when they were queued.
    fn render_node<R: Rasterizer + ?Sized>(
        &mut self,
        ras: &mut R,
        store: &mut NodeStore,
        id: NodeId,
        tracer: &mut Tracer<'_>,
        draws: &mut u32,
    ) {
        if !store.visible(id)
            || store.world_alpha(id) <= 0.0
            || !store.renderable(id)
            || store.is_mask_node(id)
        {
            return;
        }

        let filters = store.filters(id).to_vec();
        let filtered = !filters.is_empty();
        if filtered {
            *draws += self.batch.flush(ras);
            self.filters
                .push(ras, &mut self.textures, tracer, store, id, &filters);
        }

        let mask = store.mask(id);
        if let Some(mask_id) = mask {
            *draws += self.batch.flush(ras);
            let records = mask_records(store, mask_id);
            ras.push_mask(&records);
        }

        self.queue_content(store, id);

        let children: Vec<NodeId> = store.children(id).collect();
        for child in children {
            self.render_node(ras, store, child, tracer, draws);
        }

        if mask.is_some() {
            *draws += self.batch.flush(ras);
            ras.pop_mask();
        }
        if filtered {
            *draws += self.batch.flush(ras);
            self.filters.pop(ras, &mut self.textures, tracer);
        }
    }

    fn queue_content(&mut self, store: &NodeStore, id: NodeId) {
        match store.content(id) {
            Content::Group => {}
            Content::Quad {
                width,
                height,
                texture,
            } => self.batch.queue(DrawRecord {
                node: id,
                texture: *texture,
                world: *store.transform(id).world_matrix(),
                alpha: store.world_alpha(id),
                kind: DrawKind::Quad {
                    width: *width,
                    height: *height,
                },
            }),
            Content::Mesh { vertices, texture } => self.batch.queue(DrawRecord {
                node: id,
                texture: *texture,
                world: *store.transform(id).world_matrix(),
                alpha: store.world_alpha(id),
                kind: DrawKind::Mesh {
                    vertices: vertices.clone(),
                },
            }),
        }
    }
}

/// Collects the stencil geometry of a mask subtree, in paint order.
fn mask_records(store: &NodeStore, id: NodeId) -> Vec<DrawRecord> {
    let mut records = Vec::new();
    collect_mask(store, id, &mut records);
    records
}

fn collect_mask(store: &NodeStore, id: NodeId, out: &mut Vec<DrawRecord>) {
    if !store.visible(id) {
        return;
    }
    match store.content(id) {
        Content::Group => {}
        Content::Quad {
            width,
            height,
            texture,
        } => out.push(DrawRecord {
            node: id,
            texture: *texture,
            world: *store.transform(id).world_matrix(),
            alpha: 1.0,
            kind: DrawKind::Quad {
                width: *width,
                height: *height,
            },
        }),
        Content::Mesh { vertices, texture } => out.push(DrawRecord {
            node: id,
            texture: *texture,
            world: *store.transform(id).world_matrix(),
            alpha: 1.0,
            kind: DrawKind::Mesh {
                vertices: vertices.clone(),
            },
        }),
    }
    for child in store.children(id) {
        collect_mask(store, child, out);
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use kurbo::Rect;

    use lamina_core::filter::{Filter, FilterProgramId};
    use lamina_core::node::{Content, NodeId, NodeStore, TextureId};

    use super::*;
    use crate::raster::TextureKey;
    use crate::testing::{RasterOp, RecordingRasterizer};

    fn quad(store: &mut NodeStore, w: f64, h: f64) -> NodeId {
        store.create_node(Content::Quad {
            width: w,
            height: h,
            texture: TextureId(0),
        })
    }

    fn simple_scene() -> (NodeStore, NodeId, NodeId) {
        let mut store = NodeStore::new();
        let root = store.create_node(Content::Group);
        let child = quad(&mut store, 10.0, 10.0);
        store.add_child(root, child);
        (store, root, child)
    }

    #[test]
    fn frame_binds_clears_draws_and_returns_to_idle() {
        let (mut store, root, _) = simple_scene();
        let mut ras = RecordingRasterizer::default();
        let mut renderer = Renderer::new(800.0, 600.0, 1.0);

        renderer
            .render(&mut ras, &mut store, root, &RenderOptions::default())
            .unwrap();

        assert_eq!(
            ras.ops[0],
            RasterOp::BindTarget {
                target: RenderTarget::Screen,
                frame: Rect::new(0.0, 0.0, 800.0, 600.0),
            }
        );
        assert_eq!(ras.ops[1], RasterOp::Clear);
        assert_eq!(ras.drawn_records(), 1);
        assert_eq!(renderer.phase(), Phase::Idle);
        assert_eq!(renderer.last_rendered(), Some(root));
        assert_eq!(renderer.frame_index(), 1);
    }

    #[test]
    fn lost_context_skips_the_whole_frame() {
        let (mut store, root, _) = simple_scene();
        let mut ras = RecordingRasterizer::default();
        ras.lost = true;
        let mut renderer = Renderer::new(800.0, 600.0, 1.0);

        let result = renderer.render(&mut ras, &mut store, root, &RenderOptions::default());
        assert_eq!(result, Err(FrameError::ContextLost));
        assert!(ras.ops.is_empty(), "no backend call on a lost context");
        assert_eq!(renderer.last_rendered(), None);
        assert_eq!(renderer.frame_index(), 0);
        assert_eq!(renderer.phase(), Phase::Idle);
    }

    #[test]
    fn clear_false_skips_the_clear() {
        let (mut store, root, _) = simple_scene();
        let mut ras = RecordingRasterizer::default();
        let mut renderer = Renderer::new(800.0, 600.0, 1.0);

        let options = RenderOptions {
            clear: false,
            ..Default::default()
        };
        renderer.render(&mut ras, &mut store, root, &options).unwrap();
        assert!(!ras.ops.contains(&RasterOp::Clear));
    }

    #[test]
    fn renders_into_a_given_texture_target() {
        let (mut store, root, _) = simple_scene();
        let mut ras = RecordingRasterizer::default();
        let mut renderer = Renderer::new(800.0, 600.0, 1.0);

        let options = RenderOptions {
            target: RenderTarget::Texture(TextureKey(42)),
            target_frame: Some(Rect::new(0.0, 0.0, 128.0, 128.0)),
            ..Default::default()
        };
        renderer.render(&mut ras, &mut store, root, &options).unwrap();

        assert_eq!(
            ras.ops[0],
            RasterOp::BindTarget {
                target: RenderTarget::Texture(TextureKey(42)),
                frame: Rect::new(0.0, 0.0, 128.0, 128.0),
            }
        );
        // The screen is restored at frame end.
        assert_eq!(
            ras.ops.last(),
            Some(&RasterOp::BindTarget {
                target: RenderTarget::Screen,
                frame: Rect::new(0.0, 0.0, 800.0, 600.0),
            })
        );
    }

    #[test]
    fn hidden_and_non_renderable_subtrees_draw_nothing() {
        let mut store = NodeStore::new();
        let root = store.create_node(Content::Group);
        let hidden = quad(&mut store, 10.0, 10.0);
        let disabled = quad(&mut store, 10.0, 10.0);
        let shown = quad(&mut store, 10.0, 10.0);
        store.add_child(root, hidden);
        store.add_child(root, disabled);
        store.add_child(root, shown);
        store.set_visible(hidden, false);
        store.set_renderable(disabled, false);

        let mut ras = RecordingRasterizer::default();
        let mut renderer = Renderer::new(800.0, 600.0, 1.0);
        renderer
            .render(&mut ras, &mut store, root, &RenderOptions::default())
            .unwrap();
        assert_eq!(ras.drawn_records(), 1);
    }

    #[test]
    fn zero_world_alpha_skips_the_subtree() {
        let (mut store, root, child) = simple_scene();
        store.set_alpha(child, 0.0);

        let mut ras = RecordingRasterizer::default();
        let mut renderer = Renderer::new(800.0, 600.0, 1.0);
        renderer
            .render(&mut ras, &mut store, root, &RenderOptions::default())
            .unwrap();
        assert_eq!(ras.drawn_records(), 0);
    }

    #[test]
    fn filtered_subtree_applies_and_balances_the_pool() {
        let (mut store, root, child) = simple_scene();
        store.set_filters(child, vec![Filter::new(FilterProgramId(5))]);

        let mut ras = RecordingRasterizer::default();
        let mut renderer = Renderer::new(800.0, 600.0, 1.0);
        renderer
            .render(&mut ras, &mut store, root, &RenderOptions::default())
            .unwrap();

        let applies: Vec<_> = ras
            .ops
            .iter()
            .filter(|op| matches!(op, RasterOp::ApplyFilter { .. }))
            .collect();
        assert_eq!(applies.len(), 1);
        assert_eq!(renderer.texture_pool().outstanding(), 0);
        assert_eq!(renderer.texture_pool().idle(), 1);
    }

    #[test]
    fn mask_brackets_the_masked_subtree() {
        let mut store = NodeStore::new();
        let root = store.create_node(Content::Group);
        let content = quad(&mut store, 100.0, 100.0);
        let mask = quad(&mut store, 30.0, 30.0);
        store.add_child(root, content);
        store.add_child(root, mask);
        store.set_mask(content, Some(mask));

        let mut ras = RecordingRasterizer::default();
        let mut renderer = Renderer::new(800.0, 600.0, 1.0);
        renderer
            .render(&mut ras, &mut store, root, &RenderOptions::default())
            .unwrap();

        let push_at = ras
            .ops
            .iter()
            .position(|op| matches!(op, RasterOp::PushMask(1)))
            .unwrap();
        let pop_at = ras
            .ops
            .iter()
            .position(|op| matches!(op, RasterOp::PopMask))
            .unwrap();
        let draw_at = ras
            .ops
            .iter()
            .position(|op| matches!(op, RasterOp::Draw(_)))
            .unwrap();
        assert!(push_at < draw_at && draw_at < pop_at);
        // The mask node itself contributes stencil records, not a draw.
        assert_eq!(ras.drawn_records(), 1);
    }

    #[test]
    fn base_transform_scales_the_queued_draw() {
        let (mut store, root, child) = simple_scene();
        let mut ras = RecordingRasterizer::default();
        let mut renderer = Renderer::new(800.0, 600.0, 1.0);

        let options = RenderOptions {
            base_transform: Some(Matrix::from_scale(2.0, 2.0)),
            ..Default::default()
        };
        renderer.render(&mut ras, &mut store, root, &options).unwrap();
        assert_eq!(store.transform(child).world_matrix().a, 2.0);
    }

    #[test]
    fn skip_update_transform_leaves_world_state_alone() {
        let (mut store, root, child) = simple_scene();
        store.transform_mut(child).set_position(50.0, 0.0);

        let mut ras = RecordingRasterizer::default();
        let mut renderer = Renderer::new(800.0, 600.0, 1.0);
        let options = RenderOptions {
            skip_update_transform: true,
            ..Default::default()
        };
        renderer.render(&mut ras, &mut store, root, &options).unwrap();
        // The pending position change was never propagated.
        assert_eq!(store.transform(child).world_matrix().tx, 0.0);
    }

    #[test]
    fn nested_filters_drain_in_lifo_order() {
        let mut store = NodeStore::new();
        let root = store.create_node(Content::Group);
        let outer = quad(&mut store, 50.0, 50.0);
        let inner = quad(&mut store, 10.0, 10.0);
        store.add_child(root, outer);
        store.add_child(outer, inner);
        store.set_filters(outer, vec![Filter::new(FilterProgramId(1))]);
        store.set_filters(inner, vec![Filter::new(FilterProgramId(2))]);

        let mut ras = RecordingRasterizer::default();
        let mut renderer = Renderer::new(800.0, 600.0, 1.0);
        renderer
            .render(&mut ras, &mut store, root, &RenderOptions::default())
            .unwrap();

        let programs: Vec<_> = ras
            .ops
            .iter()
            .filter_map(|op| match op {
                RasterOp::ApplyFilter { program, .. } => Some(*program),
                _ => None,
            })
            .collect();
        // The inner subtree pops (and applies) before the outer one.
        assert_eq!(programs, vec![2, 1]);
        assert_eq!(renderer.texture_pool().outstanding(), 0);
    }
}
