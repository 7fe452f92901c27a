// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Frame orchestration and render resources for the Lamina renderer.
//!
//! `lamina_render` turns a [`lamina_core`] scene graph into an ordered
//! stream of backend calls behind the [`raster::Rasterizer`] trait. It
//! provides:
//!
//! - [`renderer::Renderer`] — per-frame orchestration state machine
//! - [`raster::Rasterizer`] — the backend trait and draw record types
//! - [`texture_pool::TexturePool`] — pooled render textures with
//!   power-of-two bucketing and idle GC
//! - [`filters::FilterSystem`] — the LIFO filter stack with ping-pong
//!   chain execution
//! - [`batch::Batch`] — deferred draw queue flushed at state boundaries
//!
//! The crate is `no_std` compatible (with `alloc`); it issues no GPU or
//! windowing calls of its own.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod batch;
pub mod filters;
pub mod raster;
pub mod renderer;
pub mod testing;
pub mod texture;
pub mod texture_pool;
