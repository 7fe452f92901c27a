// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pooled offscreen render targets.
//!
//! Filter passes need short-lived color targets every frame. Creating and
//! destroying backend textures per pass would thrash the backend, so the
//! pool buckets released textures by size class and hands them back out on
//! the next acquire of the same class.
//!
//! Size classes are covering powers of two (a 300×200 request and a 290×190
//! request share one bucket), except exact screen-sized requests, which get
//! a dedicated class so full-screen passes never round up to the next
//! power of two.
//!
//! Resource exhaustion is handled by eviction, never signaled: a sweep runs
//! every [`check_period`](TexturePool::new) frames and destroys textures
//! idle longer than `max_idle` frames.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use kurbo::Rect;

use lamina_core::trace::{TextureEvent, TextureEventKind, Tracer};

use crate::raster::Rasterizer;
use crate::texture::RenderTexture;

/// Bucket key for requests matching the exact screen size.
const SCREEN_KEY: u64 = u64::MAX;

/// Sweep cadence and idle threshold, in frames.
const DEFAULT_CHECK_PERIOD: u64 = 600;
const DEFAULT_MAX_IDLE: u64 = 3600;

/// A pool of backend render textures bucketed by size class.
#[derive(Debug)]
pub struct TexturePool {
    buckets: BTreeMap<u64, Vec<RenderTexture>>,
    screen_width: u32,
    screen_height: u32,
    frame: u64,
    check_period: u64,
    max_idle: u64,
    outstanding: u32,
}

impl TexturePool {
    /// Creates a pool for the given screen size (device pixels) with the
    /// default GC cadence.
    #[must_use]
    pub fn new(screen_width: u32, screen_height: u32) -> Self {
        Self::with_gc(
            screen_width,
            screen_height,
            DEFAULT_CHECK_PERIOD,
            DEFAULT_MAX_IDLE,
        )
    }

    /// Creates a pool with an explicit GC cadence: a sweep every
    /// `check_period` frames destroys textures idle for more than
    /// `max_idle` frames.
    #[must_use]
    pub fn with_gc(
        screen_width: u32,
        screen_height: u32,
        check_period: u64,
        max_idle: u64,
    ) -> Self {
        Self {
            buckets: BTreeMap::new(),
            screen_width,
            screen_height,
            frame: 0,
            check_period,
            max_idle,
            outstanding: 0,
        }
    }

    /// Acquires a texture at least `min_width` × `min_height` logical units
    /// at `resolution` device pixels per unit.
    ///
    /// Degenerate requests clamp to 1×1 device pixels. The returned record
    /// must come back through [`release`](Self::release) exactly once.
    #[expect(
        clippy::cast_possible_truncation,
        reason = "sizes are clamped non-negative and ceiled before the cast"
    )]
    pub fn acquire<R: Rasterizer + ?Sized>(
        &mut self,
        ras: &mut R,
        tracer: &mut Tracer<'_>,
        min_width: f64,
        min_height: f64,
        resolution: f64,
    ) -> RenderTexture {
        let px_w = ((min_width * resolution).ceil().max(1.0)) as u32;
        let px_h = ((min_height * resolution).ceil().max(1.0)) as u32;

        let (key, width, height) = if px_w == self.screen_width && px_h == self.screen_height {
            (SCREEN_KEY, px_w, px_h)
        } else {
            let w = px_w.next_power_of_two();
            let h = px_h.next_power_of_two();
            (pack_key(w, h), w, h)
        };

        self.outstanding += 1;
        let bucket = self.buckets.entry(key).or_default();
        let mut tex = match bucket.pop() {
            Some(tex) => tex,
            None => {
                let backend_key = ras.create_texture(width, height);
                tracer.texture_event(&TextureEvent {
                    kind: TextureEventKind::Created,
                    key: backend_key.0,
                    width,
                    height,
                });
                RenderTexture {
                    key: backend_key,
                    width,
                    height,
                    resolution,
                    source_frame: Rect::ZERO,
                    returned_at_frame: 0,
                    in_use: false,
                }
            }
        };

        tex.in_use = true;
        tex.resolution = resolution;
        tracer.texture_event(&TextureEvent {
            kind: TextureEventKind::Acquired,
            key: tex.key.0,
            width: tex.width,
            height: tex.height,
        });
        tex
    }

    /// Returns a texture to its size-class bucket.
    ///
    /// # Panics
    ///
    /// Panics if the texture was already released.
    pub fn release(&mut self, tracer: &mut Tracer<'_>, mut tex: RenderTexture) {
        assert!(tex.in_use, "render texture released twice");
        let key = self.bucket_key(tex.width, tex.height);
        let bucket = self.buckets.entry(key).or_default();
        assert!(
            !bucket.iter().any(|t| t.key == tex.key),
            "render texture released twice"
        );

        tex.in_use = false;
        tex.returned_at_frame = self.frame;
        self.outstanding -= 1;
        tracer.texture_event(&TextureEvent {
            kind: TextureEventKind::Returned,
            key: tex.key.0,
            width: tex.width,
            height: tex.height,
        });
        bucket.push(tex);
    }

    /// Advances the frame counter and, on sweep frames, evicts textures
    /// idle for longer than the configured threshold.
    pub fn advance_frame<R: Rasterizer + ?Sized>(
        &mut self,
        ras: &mut R,
        tracer: &mut Tracer<'_>,
    ) {
        self.frame += 1;
        if self.frame % self.check_period != 0 {
            return;
        }
        let frame = self.frame;
        let max_idle = self.max_idle;
        for bucket in self.buckets.values_mut() {
            bucket.retain(|tex| {
                if frame - tex.returned_at_frame <= max_idle {
                    return true;
                }
                ras.destroy_texture(tex.key);
                tracer.texture_event(&TextureEvent {
                    kind: TextureEventKind::Evicted,
                    key: tex.key.0,
                    width: tex.width,
                    height: tex.height,
                });
                false
            });
        }
    }

    /// Updates the screen size, destroying every pooled screen-sized
    /// texture (their class no longer matches any request).
    pub fn set_screen_size<R: Rasterizer + ?Sized>(
        &mut self,
        ras: &mut R,
        tracer: &mut Tracer<'_>,
        width: u32,
        height: u32,
    ) {
        if let Some(bucket) = self.buckets.remove(&SCREEN_KEY) {
            for tex in bucket {
                ras.destroy_texture(tex.key);
                tracer.texture_event(&TextureEvent {
                    kind: TextureEventKind::Evicted,
                    key: tex.key.0,
                    width: tex.width,
                    height: tex.height,
                });
            }
        }
        self.screen_width = width;
        self.screen_height = height;
    }

    /// Number of textures currently handed out.
    #[must_use]
    pub fn outstanding(&self) -> u32 {
        self.outstanding
    }

    /// Number of textures currently idle in buckets.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    fn bucket_key(&self, width: u32, height: u32) -> u64 {
        if width == self.screen_width && height == self.screen_height {
            SCREEN_KEY
        } else {
            // Physical sizes are already powers of two for pool textures.
            pack_key(width, height)
        }
    }
}

/// Packs a size class into a bucket key. Each dimension keeps its full
/// 32-bit range, so no pow2 pair can collide with another.
fn pack_key(width: u32, height: u32) -> u64 {
    (u64::from(width) << 32) | u64::from(height)
}

#[cfg(test)]
mod tests {
    use lamina_core::trace::Tracer;

    use super::*;
    use crate::testing::RecordingRasterizer;

    fn pool() -> TexturePool {
        TexturePool::new(1920, 1080)
    }

    #[test]
    fn sizes_round_up_to_powers_of_two() {
        let mut ras = RecordingRasterizer::default();
        let mut p = pool();
        let tex = p.acquire(&mut ras, &mut Tracer::none(), 300.0, 200.0, 1.0);
        assert_eq!((tex.width, tex.height), (512, 256));
        p.release(&mut Tracer::none(), tex);
    }

    #[test]
    fn nearby_sizes_share_a_bucket() {
        let mut ras = RecordingRasterizer::default();
        let mut p = pool();
        let a = p.acquire(&mut ras, &mut Tracer::none(), 300.0, 200.0, 1.0);
        let key = a.key;
        p.release(&mut Tracer::none(), a);

        let b = p.acquire(&mut ras, &mut Tracer::none(), 290.0, 190.0, 1.0);
        assert_eq!(b.key, key);
        assert_eq!(ras.created_textures(), 1);
        p.release(&mut Tracer::none(), b);
    }

    #[test]
    fn screen_sized_requests_use_the_exact_size() {
        let mut ras = RecordingRasterizer::default();
        let mut p = pool();
        let tex = p.acquire(&mut ras, &mut Tracer::none(), 1920.0, 1080.0, 1.0);
        // 1920/1080 are not powers of two; the screen class keeps them exact.
        assert_eq!((tex.width, tex.height), (1920, 1080));
        p.release(&mut Tracer::none(), tex);
    }

    #[test]
    fn resolution_scales_the_physical_size() {
        let mut ras = RecordingRasterizer::default();
        let mut p = pool();
        let tex = p.acquire(&mut ras, &mut Tracer::none(), 100.0, 100.0, 2.0);
        assert_eq!((tex.width, tex.height), (256, 256));
        assert!((tex.logical_width() - 128.0).abs() < 1e-12);
        p.release(&mut Tracer::none(), tex);
    }

    #[test]
    fn degenerate_requests_clamp_to_one_pixel() {
        let mut ras = RecordingRasterizer::default();
        let mut p = pool();
        let tex = p.acquire(&mut ras, &mut Tracer::none(), 0.0, -5.0, 1.0);
        assert_eq!((tex.width, tex.height), (1, 1));
        p.release(&mut Tracer::none(), tex);
    }

    #[test]
    fn large_dimensions_keep_distinct_buckets() {
        let mut ras = RecordingRasterizer::default();
        let mut p = pool();
        let wide = p.acquire(&mut ras, &mut Tracer::none(), 70_000.0, 1.0, 1.0);
        let tall = p.acquire(&mut ras, &mut Tracer::none(), 1.0, 70_000.0, 1.0);
        assert_eq!((wide.width, wide.height), (131_072, 1));
        assert_eq!((tall.width, tall.height), (1, 131_072));
        p.release(&mut Tracer::none(), wide);
        p.release(&mut Tracer::none(), tall);

        // A repeat request must land in the matching bucket, not a
        // colliding one.
        let again = p.acquire(&mut ras, &mut Tracer::none(), 70_000.0, 1.0, 1.0);
        assert_eq!((again.width, again.height), (131_072, 1));
        assert_eq!(ras.created_textures(), 2);
        p.release(&mut Tracer::none(), again);
    }

    #[test]
    fn acquire_release_balance_is_tracked() {
        let mut ras = RecordingRasterizer::default();
        let mut p = pool();
        let a = p.acquire(&mut ras, &mut Tracer::none(), 64.0, 64.0, 1.0);
        let b = p.acquire(&mut ras, &mut Tracer::none(), 64.0, 64.0, 1.0);
        assert_eq!(p.outstanding(), 2);
        assert_ne!(a.key, b.key);

        p.release(&mut Tracer::none(), a);
        p.release(&mut Tracer::none(), b);
        assert_eq!(p.outstanding(), 0);
        assert_eq!(p.idle(), 2);
    }

    #[test]
    #[should_panic(expected = "released twice")]
    fn double_release_panics() {
        let mut ras = RecordingRasterizer::default();
        let mut p = pool();
        let tex = p.acquire(&mut ras, &mut Tracer::none(), 64.0, 64.0, 1.0);
        let dup = RenderTexture {
            key: tex.key,
            width: tex.width,
            height: tex.height,
            resolution: tex.resolution,
            source_frame: tex.source_frame,
            returned_at_frame: 0,
            in_use: true,
        };
        p.release(&mut Tracer::none(), tex);
        p.release(&mut Tracer::none(), dup);
    }

    #[test]
    fn idle_textures_are_evicted_by_the_sweep() {
        let mut ras = RecordingRasterizer::default();
        let mut p = TexturePool::with_gc(1920, 1080, 2, 3);
        let tex = p.acquire(&mut ras, &mut Tracer::none(), 64.0, 64.0, 1.0);
        let key = tex.key;
        p.release(&mut Tracer::none(), tex);

        // Not yet past the idle threshold.
        for _ in 0..4 {
            p.advance_frame(&mut ras, &mut Tracer::none());
        }
        assert_eq!(p.idle(), 1);

        for _ in 0..4 {
            p.advance_frame(&mut ras, &mut Tracer::none());
        }
        assert_eq!(p.idle(), 0);
        assert!(ras.destroyed_textures().contains(&key));
    }

    #[test]
    fn recently_used_textures_survive_the_sweep() {
        let mut ras = RecordingRasterizer::default();
        let mut p = TexturePool::with_gc(1920, 1080, 2, 100);
        let tex = p.acquire(&mut ras, &mut Tracer::none(), 64.0, 64.0, 1.0);
        p.release(&mut Tracer::none(), tex);

        for _ in 0..10 {
            p.advance_frame(&mut ras, &mut Tracer::none());
        }
        assert_eq!(p.idle(), 1);
    }

    #[test]
    fn screen_resize_flushes_the_screen_bucket() {
        let mut ras = RecordingRasterizer::default();
        let mut p = pool();
        let tex = p.acquire(&mut ras, &mut Tracer::none(), 1920.0, 1080.0, 1.0);
        let key = tex.key;
        p.release(&mut Tracer::none(), tex);

        p.set_screen_size(&mut ras, &mut Tracer::none(), 1280, 720);
        assert_eq!(p.idle(), 0);
        assert!(ras.destroyed_textures().contains(&key));
    }
}
