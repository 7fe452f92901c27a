// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pooled render-texture records.

use kurbo::Rect;

use crate::raster::TextureKey;

/// A pooled offscreen render target.
///
/// The backing texture is owned by the backend; this record tracks how the
/// pool hands it around. Instances move out of the pool on acquire and back
/// on release — a released instance must not be used again by the caller.
#[derive(Debug)]
pub struct RenderTexture {
    /// Backend key of the underlying texture.
    pub key: TextureKey,
    /// Physical width in device pixels.
    pub width: u32,
    /// Physical height in device pixels.
    pub height: u32,
    /// Device pixels per logical unit when last acquired.
    pub resolution: f64,
    /// The logical region rendered into the texture (set by the filter
    /// stack; the physical texture may be larger).
    pub source_frame: Rect,
    /// Pool frame counter value at the last release. Drives idle GC.
    pub returned_at_frame: u64,
    /// Whether the texture is currently handed out.
    pub in_use: bool,
}

impl RenderTexture {
    /// Logical width of the rendered region at the current resolution.
    #[must_use]
    pub fn logical_width(&self) -> f64 {
        f64::from(self.width) / self.resolution
    }

    /// Logical height of the rendered region at the current resolution.
    #[must_use]
    pub fn logical_height(&self) -> f64 {
        f64::from(self.height) / self.resolution
    }
}
