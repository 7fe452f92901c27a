// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Trace sinks, Chrome trace export, and scene-tree dumps for Lamina
//! diagnostics.
//!
//! This crate provides [`TraceSink`](lamina_core::trace::TraceSink)
//! implementations for development and post-mortem analysis:
//!
//! - [`pretty::PrettyPrintSink`] — human-readable one-line-per-event output.
//! - [`chrome::ChromeTraceSink`] — collects events as Chrome Trace Event
//!   Format JSON for `chrome://tracing` or Perfetto.
//! - [`tree::dump`] — an indented dump of a scene subtree.

pub mod chrome;
pub mod pretty;
pub mod tree;
