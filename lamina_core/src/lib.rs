// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Core scene graph and change tracking for the Lamina renderer.
//!
//! `lamina_core` provides the retained scene model: a struct-of-arrays node
//! tree addressed by generational handles, decomposed transforms with
//! version-counter change tracking, axis-aligned bounds accumulation, and
//! the descriptors the render layer consumes. It is `no_std` compatible
//! (with `alloc`) and performs no drawing itself.
//!
//! # Architecture
//!
//! A frame flows top-down through the tree and bottom-up through queries:
//!
//! ```text
//!   property mutations ──► version bumps (no matrix math)
//!        │
//!        ▼
//!   NodeStore::update_transforms() ──► world matrices + world alpha
//!        │
//!        ▼
//!   bounds / hit-test queries ──► cached per bounds revision
//! ```
//!
//! **[`node`]** — Struct-of-arrays scene tree with generational handles.
//! Topology, display state, the propagation pass, and bounds/hit queries.
//!
//! **[`transform`]** — Decomposed local/world transform pair. Mutations bump
//! a local version; world matrices recompose only when a version compare
//! says they must. An untouched subtree costs zero matrix work per pass.
//!
//! **[`matrix`]** — 2D affine matrix in row-basis form.
//!
//! **[`bounds`]** — Running min/max accumulator with an explicit empty
//! state and a revision counter for cache invalidation.
//!
//! **[`filter`]** — Filter descriptors attached to nodes; applied by the
//! render layer.
//!
//! **[`pool`]** — Generic free-list object pool for per-frame scratch
//! state.
//!
//! **[`trace`]** — [`TraceSink`](trace::TraceSink) trait and event types
//! for frame instrumentation, with zero-overhead
//! [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one
//!   branch per call site).

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod bounds;
pub mod filter;
pub mod matrix;
pub mod node;
pub mod pool;
pub mod trace;
pub mod transform;
