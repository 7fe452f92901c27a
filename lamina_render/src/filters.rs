// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The filter stack: deferred post-processing around rendered subtrees.
//!
//! Entering a filtered subtree *pushes*: the pipeline measures the subtree,
//! acquires a pooled offscreen texture covering it, and redirects rendering
//! there. Leaving *pops*: the recorded filter chain runs over the captured
//! texture and the result lands in whatever target was active before the
//! push. Pushes and pops nest strictly (LIFO); the renderer drives them from
//! its depth-first walk, so nesting is guaranteed by construction.
//!
//! Chain application is the correctness-critical part. A single filter
//! writes straight into the outer target. A chain of N ≥ 2 ping-pongs
//! between the captured texture and exactly one extra scratch texture for
//! filters `0..N−1`, and the **last** filter writes to the real outer
//! target. Every acquired texture returns to the pool before `pop` returns.

use alloc::vec::Vec;

use kurbo::Rect;

use lamina_core::filter::Filter;
use lamina_core::node::{NodeId, NodeStore};
use lamina_core::pool::{Pool, Recycle};
use lamina_core::trace::{FilterPopEvent, FilterPushEvent, Tracer};

use crate::raster::{Rasterizer, RenderTarget};
use crate::texture::RenderTexture;
use crate::texture_pool::TexturePool;

/// Per-pass uniform values a backend feeds to filter programs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FilterUniforms {
    /// The logical rectangle the pass writes, in the filtered subtree's
    /// ancestor space.
    pub output_frame: Rect,
    /// Input texture size: logical width, height, and their inverses.
    pub input_size: [f64; 4],
    /// Input texture size in device pixels, with inverses.
    pub input_pixel: [f64; 4],
    /// UV clamp rectangle, inset half a texel to prevent edge-sampling
    /// bleed from the unused region of the pooled texture.
    pub input_clamp: [f64; 4],
    /// Device pixels per logical unit for the pass.
    pub resolution: f64,
    /// Compatibility flag for programs sampling raw UV attributes.
    pub legacy: bool,
}

impl FilterUniforms {
    fn new(state: &FilterState, input: &RenderTexture) -> Self {
        let pw = f64::from(input.width);
        let ph = f64::from(input.height);
        let lw = pw / state.resolution;
        let lh = ph / state.resolution;
        Self {
            output_frame: state.source_frame,
            input_size: [lw, lh, 1.0 / lw, 1.0 / lh],
            input_pixel: [pw, ph, 1.0 / pw, 1.0 / ph],
            input_clamp: [
                0.5 / pw,
                0.5 / ph,
                state.source_frame.width() / lw - 0.5 / pw,
                state.source_frame.height() / lh - 0.5 / ph,
            ],
            resolution: state.resolution,
            legacy: state.legacy,
        }
    }
}

/// One entry of the filter stack. Pooled and reset, not freed, after use.
#[derive(Debug)]
struct FilterState {
    /// Snapshot of the enabled filters at push time. Empty for the
    /// degenerate marker states pushed when every filter is disabled.
    filters: Vec<Filter>,
    /// The filtered node.
    target: Option<NodeId>,
    /// Measured (padded, fitted, pixel-aligned) subtree frame.
    source_frame: Rect,
    /// Frame bound while rendering into the texture.
    destination_frame: Rect,
    /// The captured offscreen target. Taken back out during `pop`.
    texture: Option<RenderTexture>,
    resolution: f64,
    legacy: bool,
}

impl Default for FilterState {
    fn default() -> Self {
        Self {
            filters: Vec::new(),
            target: None,
            source_frame: Rect::ZERO,
            destination_frame: Rect::ZERO,
            texture: None,
            resolution: 1.0,
            legacy: false,
        }
    }
}

impl Recycle for FilterState {
    fn recycle(&mut self) {
        assert!(
            self.texture.is_none(),
            "filter state recycled while holding a texture"
        );
        self.filters.clear();
        self.target = None;
        self.source_frame = Rect::ZERO;
        self.destination_frame = Rect::ZERO;
        self.resolution = 1.0;
        self.legacy = false;
    }
}

/// LIFO stack of filter passes plus the state pool backing it.
#[derive(Debug)]
pub struct FilterSystem {
    stack: Vec<FilterState>,
    state_pool: Pool<FilterState>,
    root_target: RenderTarget,
    root_frame: Rect,
    root_resolution: f64,
    frame_index: u64,
}

impl Default for FilterSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl FilterSystem {
    /// Creates an empty filter system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            state_pool: Pool::new(),
            root_target: RenderTarget::Screen,
            root_frame: Rect::ZERO,
            root_resolution: 1.0,
            frame_index: 0,
        }
    }

    /// Records the frame's root destination, which `pop` falls back to when
    /// the stack empties.
    ///
    /// # Panics
    ///
    /// Panics if the previous frame left entries on the stack.
    pub fn begin_frame(
        &mut self,
        target: RenderTarget,
        frame: Rect,
        resolution: f64,
        frame_index: u64,
    ) {
        assert!(self.stack.is_empty(), "filter stack not drained");
        self.root_target = target;
        self.root_frame = frame;
        self.root_resolution = resolution;
        self.frame_index = frame_index;
    }

    /// Whether any filter pass is currently active.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Current stack depth.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Enters a filtered subtree: combines the chain's requirements,
    /// measures and pixel-aligns the source frame, captures a pooled
    /// texture, and binds it (cleared) as the active target.
    ///
    /// Disabled filters are skipped. If the whole list is disabled, a
    /// marker entry keeps push/pop balanced and rendering continues into
    /// the current target unchanged.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "filter chains are far smaller than u32::MAX"
    )]
    pub fn push<R: Rasterizer + ?Sized>(
        &mut self,
        ras: &mut R,
        pool: &mut TexturePool,
        tracer: &mut Tracer<'_>,
        store: &mut NodeStore,
        target: NodeId,
        filters: &[Filter],
    ) {
        let (_, outer_frame, outer_resolution) = self.current_destination();

        // Conservative combination: the chain must satisfy every filter's
        // requirements simultaneously.
        let mut resolution = f64::INFINITY;
        let mut padding = 0.0_f64;
        let mut auto_fit = false;
        let mut legacy = false;
        let mut chain = Vec::new();
        for f in filters.iter().filter(|f| f.enabled) {
            let r = if f.resolution == 0.0 {
                outer_resolution
            } else {
                f.resolution
            };
            resolution = resolution.min(r);
            padding = padding.max(f.padding);
            auto_fit |= f.auto_fit;
            legacy |= f.legacy;
            chain.push(f.clone());
        }

        let mut state = self.state_pool.acquire();
        state.target = Some(target);

        if chain.is_empty() {
            tracer.filter_push(&FilterPushEvent {
                frame_index: self.frame_index,
                depth: self.depth_after_push(),
                filter_count: 0,
                source_frame: [0.0; 4],
            });
            self.stack.push(state);
            return;
        }

        let measured = store
            .filter_area(target)
            .unwrap_or_else(|| store.get_bounds_cached(target));
        let source_frame = fit_source_frame(measured, padding, auto_fit, outer_frame, resolution);

        let mut texture = pool.acquire(
            ras,
            tracer,
            source_frame.width(),
            source_frame.height(),
            resolution,
        );
        texture.source_frame = source_frame;
        let destination_frame = Rect::new(0.0, 0.0, source_frame.width(), source_frame.height());

        ras.bind_target(RenderTarget::Texture(texture.key), destination_frame);
        ras.clear();

        tracer.filter_push(&FilterPushEvent {
            frame_index: self.frame_index,
            depth: self.depth_after_push(),
            filter_count: chain.len() as u32,
            source_frame: [
                source_frame.x0,
                source_frame.y0,
                source_frame.width(),
                source_frame.height(),
            ],
        });

        state.filters = chain;
        state.source_frame = source_frame;
        state.destination_frame = destination_frame;
        state.texture = Some(texture);
        state.resolution = resolution;
        state.legacy = legacy;
        self.stack.push(state);
    }

    /// Leaves the innermost filtered subtree: applies the recorded chain
    /// over the captured texture into the outer target, returns every
    /// texture to the pool, and re-binds the outer target.
    ///
    /// # Panics
    ///
    /// Panics if the stack is empty.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "stack depth and chain length are far smaller than u32::MAX"
    )]
    pub fn pop<R: Rasterizer + ?Sized>(
        &mut self,
        ras: &mut R,
        pool: &mut TexturePool,
        tracer: &mut Tracer<'_>,
    ) {
        let depth = self.stack.len();
        let Some(mut state) = self.stack.pop() else {
            panic!("filter stack underflow");
        };
        let (outer_target, outer_frame, _) = self.current_destination();

        tracer.filter_pop(&FilterPopEvent {
            frame_index: self.frame_index,
            depth: depth as u32,
            filter_count: state.filters.len() as u32,
        });

        if let Some(input) = state.texture.take() {
            let uniforms = FilterUniforms::new(&state, &input);
            let chain = &state.filters;
            let last = chain.len() - 1;

            if last == 0 {
                ras.apply_filter(chain[0].program, input.key, outer_target, &uniforms, false);
                pool.release(tracer, input);
            } else {
                // Ping-pong: intermediate passes alternate between the
                // captured texture and one scratch; the last filter must
                // write to the real destination, never a scratch.
                let mut flip = input;
                let mut flop = pool.acquire(
                    ras,
                    tracer,
                    state.source_frame.width(),
                    state.source_frame.height(),
                    state.resolution,
                );
                for f in &chain[..last] {
                    ras.apply_filter(
                        f.program,
                        flip.key,
                        RenderTarget::Texture(flop.key),
                        &uniforms,
                        true,
                    );
                    core::mem::swap(&mut flip, &mut flop);
                }
                ras.apply_filter(chain[last].program, flip.key, outer_target, &uniforms, false);
                pool.release(tracer, flip);
                pool.release(tracer, flop);
            }
        }

        ras.bind_target(outer_target, outer_frame);
        self.state_pool.release(state);
    }

    /// The destination currently receiving draws: the innermost texture on
    /// the stack, or the frame's root target.
    fn current_destination(&self) -> (RenderTarget, Rect, f64) {
        for state in self.stack.iter().rev() {
            if let Some(tex) = &state.texture {
                return (
                    RenderTarget::Texture(tex.key),
                    state.destination_frame,
                    state.resolution,
                );
            }
        }
        (self.root_target, self.root_frame, self.root_resolution)
    }

    #[expect(
        clippy::cast_possible_truncation,
        reason = "stack depth is far smaller than u32::MAX"
    )]
    fn depth_after_push(&self) -> u32 {
        self.stack.len() as u32 + 1
    }
}

/// Pads, optionally fits, pixel-aligns, and clamps a measured source frame.
fn fit_source_frame(
    measured: Rect,
    padding: f64,
    auto_fit: bool,
    outer_frame: Rect,
    resolution: f64,
) -> Rect {
    let mut x0 = measured.x0 - padding;
    let mut y0 = measured.y0 - padding;
    let mut x1 = measured.x1 + padding;
    let mut y1 = measured.y1 + padding;

    if auto_fit {
        x0 = x0.max(outer_frame.x0);
        y0 = y0.max(outer_frame.y0);
        x1 = x1.min(outer_frame.x1);
        y1 = y1.min(outer_frame.y1);
    }

    // Snap outward to whole device pixels so the pass covers the frame.
    x0 = (x0 * resolution).floor() / resolution;
    y0 = (y0 * resolution).floor() / resolution;
    x1 = (x1 * resolution).ceil() / resolution;
    y1 = (y1 * resolution).ceil() / resolution;

    // Degenerate regions clamp to one device pixel.
    if x1 <= x0 {
        x1 = x0 + 1.0 / resolution;
    }
    if y1 <= y0 {
        y1 = y0 + 1.0 / resolution;
    }
    Rect::new(x0, y0, x1, y1)
}

#[cfg(test)]
mod tests {
    use alloc::vec;
    use alloc::vec::Vec;

    use kurbo::Rect;

    use lamina_core::filter::{Filter, FilterProgramId};
    use lamina_core::node::{Content, NodeId, NodeStore, TextureId};
    use lamina_core::trace::Tracer;

    use super::*;
    use crate::testing::{RasterOp, RecordingRasterizer};

    fn scene() -> (NodeStore, NodeId) {
        let mut store = NodeStore::new();
        let node = store.create_node(Content::Quad {
            width: 100.0,
            height: 50.0,
            texture: TextureId(0),
        });
        store.update_transforms();
        (store, node)
    }

    fn system() -> (FilterSystem, TexturePool, RecordingRasterizer) {
        let mut sys = FilterSystem::new();
        sys.begin_frame(RenderTarget::Screen, Rect::new(0.0, 0.0, 1920.0, 1080.0), 1.0, 1);
        (sys, TexturePool::new(1920, 1080), RecordingRasterizer::default())
    }

    #[test]
    fn single_filter_applies_into_the_outer_target() {
        let (mut store, node) = scene();
        let (mut sys, mut pool, mut ras) = system();
        let filters = vec![Filter::new(FilterProgramId(7))];

        sys.push(&mut ras, &mut pool, &mut Tracer::none(), &mut store, node, &filters);
        assert_eq!(pool.outstanding(), 1);
        sys.pop(&mut ras, &mut pool, &mut Tracer::none());

        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.idle(), 1);

        let applies: Vec<_> = ras
            .ops
            .iter()
            .filter_map(|op| match op {
                RasterOp::ApplyFilter { program, output, clear, .. } => {
                    Some((*program, *output, *clear))
                }
                _ => None,
            })
            .collect();
        assert_eq!(applies, vec![(7, RenderTarget::Screen, false)]);
    }

    #[test]
    fn three_filter_chain_ping_pongs_with_two_textures() {
        let (mut store, node) = scene();
        let (mut sys, mut pool, mut ras) = system();
        let filters = vec![
            Filter::new(FilterProgramId(1)),
            Filter::new(FilterProgramId(2)),
            Filter::new(FilterProgramId(3)),
        ];

        sys.push(&mut ras, &mut pool, &mut Tracer::none(), &mut store, node, &filters);
        sys.pop(&mut ras, &mut pool, &mut Tracer::none());

        // Exactly two textures existed in total, both back in the pool.
        assert_eq!(ras.created_textures(), 2);
        assert_eq!(pool.outstanding(), 0);
        assert_eq!(pool.idle(), 2);

        let applies: Vec<_> = ras
            .ops
            .iter()
            .filter_map(|op| match op {
                RasterOp::ApplyFilter { program, input, output, clear } => {
                    Some((*program, *input, *output, *clear))
                }
                _ => None,
            })
            .collect();
        assert_eq!(applies.len(), 3);

        // Intermediate passes alternate textures and clear their scratch.
        let (_, in0, out0, clear0) = applies[0];
        let (_, in1, out1, clear1) = applies[1];
        let (_, in2, out2, clear2) = applies[2];
        assert!(clear0 && clear1 && !clear2);
        assert_eq!(out0, RenderTarget::Texture(crate::raster::TextureKey(in1)));
        assert_eq!(out1, RenderTarget::Texture(crate::raster::TextureKey(in2)));
        assert_ne!(in0, in1);
        // The last filter writes to the real destination.
        assert_eq!(out2, RenderTarget::Screen);
    }

    #[test]
    fn nested_pops_restore_the_enclosing_texture() {
        let (mut store, node) = scene();
        let inner = store.create_node(Content::Quad {
            width: 10.0,
            height: 10.0,
            texture: TextureId(0),
        });
        store.add_child(node, inner);
        store.update_transforms();

        let (mut sys, mut pool, mut ras) = system();
        sys.push(
            &mut ras,
            &mut pool,
            &mut Tracer::none(),
            &mut store,
            node,
            &[Filter::new(FilterProgramId(1))],
        );
        let outer_key = match ras.ops.iter().rev().find(|op| matches!(op, RasterOp::BindTarget { .. })) {
            Some(RasterOp::BindTarget { target: RenderTarget::Texture(k), .. }) => *k,
            other => panic!("expected a texture bind, got {other:?}"),
        };

        sys.push(
            &mut ras,
            &mut pool,
            &mut Tracer::none(),
            &mut store,
            inner,
            &[Filter::new(FilterProgramId(2))],
        );
        sys.pop(&mut ras, &mut pool, &mut Tracer::none());

        // After the inner pop, drawing goes back into the outer texture.
        let last_bind = ras
            .ops
            .iter()
            .rev()
            .find_map(|op| match op {
                RasterOp::BindTarget { target, .. } => Some(*target),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_bind, RenderTarget::Texture(outer_key));

        sys.pop(&mut ras, &mut pool, &mut Tracer::none());
        assert!(sys.is_empty());
        assert_eq!(pool.outstanding(), 0);
    }

    #[test]
    fn combination_uses_min_resolution_and_max_padding() {
        let (mut store, node) = scene();
        let (mut sys, mut pool, mut ras) = system();
        let filters = vec![
            Filter::new(FilterProgramId(1)).with_resolution(2.0).with_padding(4.0),
            Filter::new(FilterProgramId(2)).with_resolution(0.5).with_padding(10.0),
        ];

        sys.push(&mut ras, &mut pool, &mut Tracer::none(), &mut store, node, &filters);
        // Quad is 100×50; padding 10 each side → 120×70 at resolution 0.5
        // → 60×35 device pixels → pow2 texture 64×64.
        let (w, h) = ras.last_created_size().unwrap();
        assert_eq!((w, h), (64, 64));
        sys.pop(&mut ras, &mut pool, &mut Tracer::none());
    }

    #[test]
    fn disabled_filters_are_skipped() {
        let (mut store, node) = scene();
        let (mut sys, mut pool, mut ras) = system();
        let mut off = Filter::new(FilterProgramId(9));
        off.enabled = false;
        let filters = vec![off, Filter::new(FilterProgramId(1))];

        sys.push(&mut ras, &mut pool, &mut Tracer::none(), &mut store, node, &filters);
        sys.pop(&mut ras, &mut pool, &mut Tracer::none());

        let programs: Vec<_> = ras
            .ops
            .iter()
            .filter_map(|op| match op {
                RasterOp::ApplyFilter { program, .. } => Some(*program),
                _ => None,
            })
            .collect();
        assert_eq!(programs, vec![1]);
    }

    #[test]
    fn fully_disabled_list_degenerates_to_a_marker() {
        let (mut store, node) = scene();
        let (mut sys, mut pool, mut ras) = system();
        let mut off = Filter::new(FilterProgramId(9));
        off.enabled = false;

        sys.push(&mut ras, &mut pool, &mut Tracer::none(), &mut store, node, &[off]);
        assert_eq!(sys.depth(), 1);
        assert_eq!(pool.outstanding(), 0);
        sys.pop(&mut ras, &mut pool, &mut Tracer::none());

        assert!(sys.is_empty());
        assert!(ras.ops.iter().all(|op| !matches!(op, RasterOp::ApplyFilter { .. })));
    }

    #[test]
    fn explicit_filter_area_overrides_measured_bounds() {
        let (mut store, node) = scene();
        store.set_filter_area(node, Some(Rect::new(0.0, 0.0, 8.0, 8.0)));
        let (mut sys, mut pool, mut ras) = system();

        sys.push(
            &mut ras,
            &mut pool,
            &mut Tracer::none(),
            &mut store,
            node,
            &[Filter::new(FilterProgramId(1))],
        );
        assert_eq!(ras.last_created_size().unwrap(), (8, 8));
        sys.pop(&mut ras, &mut pool, &mut Tracer::none());
    }

    #[test]
    #[should_panic(expected = "filter stack underflow")]
    fn popping_an_empty_stack_panics() {
        let (mut sys, mut pool, mut ras) = system();
        sys.pop(&mut ras, &mut pool, &mut Tracer::none());
    }

    #[test]
    fn source_frame_snaps_to_device_pixels() {
        let r = fit_source_frame(
            Rect::new(0.3, 0.3, 10.2, 10.2),
            0.0,
            false,
            Rect::ZERO,
            1.0,
        );
        assert_eq!(r, Rect::new(0.0, 0.0, 11.0, 11.0));
    }

    #[test]
    fn zero_area_region_clamps_to_one_pixel() {
        let r = fit_source_frame(Rect::new(5.0, 5.0, 5.0, 5.0), 0.0, false, Rect::ZERO, 2.0);
        assert_eq!(r, Rect::new(5.0, 5.0, 5.5, 5.5));
    }

    #[test]
    fn auto_fit_clips_to_the_outer_frame() {
        let r = fit_source_frame(
            Rect::new(-50.0, -50.0, 500.0, 500.0),
            0.0,
            true,
            Rect::new(0.0, 0.0, 100.0, 100.0),
            1.0,
        );
        assert_eq!(r, Rect::new(0.0, 0.0, 100.0, 100.0));
    }
}
