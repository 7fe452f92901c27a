// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Chrome Trace Event Format exporter.
//!
//! [`ChromeTraceSink`] collects events as they arrive and
//! [`ChromeTraceSink::write`] emits [Chrome Trace Event Format][spec]
//! JSON, suitable for loading into `chrome://tracing` or
//! [Perfetto](https://ui.perfetto.dev/).
//!
//! The pipeline carries no wall-clock timestamps, so events are placed on
//! a synthetic timeline: one microsecond per event, in arrival order.
//! Durations are meaningless; nesting and ordering are what the view
//! shows.
//!
//! [spec]: https://docs.google.com/document/d/1CvAClvFfyA5R-PhYUmn5OOQtYMH4h6I0nSsKchNAySU

use std::io::{self, Write};

use serde_json::{Value, json};

use lamina_core::trace::{
    FilterPopEvent, FilterPushEvent, FrameBeginEvent, FrameEndEvent, PhaseBeginEvent,
    PhaseEndEvent, TextureEvent, TraceSink,
};

/// Collects trace events for Chrome Trace Event Format export.
#[derive(Debug, Default)]
pub struct ChromeTraceSink {
    events: Vec<Value>,
    ts: u64,
}

impl ChromeTraceSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of events collected so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Writes the collected events as a complete JSON array.
    ///
    /// # Errors
    ///
    /// Propagates I/O errors from the writer.
    pub fn write(&self, writer: &mut dyn Write) -> io::Result<()> {
        serde_json::to_writer_pretty(writer, &self.events)?;
        Ok(())
    }

    fn next_ts(&mut self) -> u64 {
        self.ts += 1;
        self.ts
    }
}

impl TraceSink for ChromeTraceSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let ts = self.next_ts();
        self.events.push(json!({
            "ph": "B",
            "name": "Frame",
            "cat": "Frame",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
            }
        }));
    }

    fn on_frame_end(&mut self, e: &FrameEndEvent) {
        let ts = self.next_ts();
        self.events.push(json!({
            "ph": "E",
            "name": "Frame",
            "cat": "Frame",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
                "draws": e.draws,
            }
        }));
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let ts = self.next_ts();
        self.events.push(json!({
            "ph": "B",
            "name": format!("{:?}", e.phase),
            "cat": "Phase",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
            }
        }));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let ts = self.next_ts();
        self.events.push(json!({
            "ph": "E",
            "name": format!("{:?}", e.phase),
            "cat": "Phase",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
            }
        }));
    }

    fn on_filter_push(&mut self, e: &FilterPushEvent) {
        let ts = self.next_ts();
        self.events.push(json!({
            "ph": "B",
            "name": "Filter",
            "cat": "Filter",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
                "depth": e.depth,
                "filter_count": e.filter_count,
                "source_frame": e.source_frame,
            }
        }));
    }

    fn on_filter_pop(&mut self, e: &FilterPopEvent) {
        let ts = self.next_ts();
        self.events.push(json!({
            "ph": "E",
            "name": "Filter",
            "cat": "Filter",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "args": {
                "frame_index": e.frame_index,
                "depth": e.depth,
                "filter_count": e.filter_count,
            }
        }));
    }

    fn on_texture_event(&mut self, e: &TextureEvent) {
        let ts = self.next_ts();
        self.events.push(json!({
            "ph": "i",
            "name": format!("Texture{:?}", e.kind),
            "cat": "Texture",
            "ts": ts,
            "pid": 0,
            "tid": 0,
            "s": "t",
            "args": {
                "key": e.key,
                "width": e.width,
                "height": e.height,
            }
        }));
    }
}
