// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per
//! event to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use lamina_core::trace::{
    FilterPopEvent, FilterPushEvent, FrameBeginEvent, FrameEndEvent, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, TextureEvent, TextureEventKind, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink").finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self {
            writer: Box::new(std::io::stderr()),
        }
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self { writer }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self { writer }
    }
}

fn phase_name(phase: PhaseKind) -> &'static str {
    match phase {
        PhaseKind::Update => "update",
        PhaseKind::Render => "render",
    }
}

fn texture_verb(kind: TextureEventKind) -> &'static str {
    match kind {
        TextureEventKind::Created => "created",
        TextureEventKind::Acquired => "acquired",
        TextureEventKind::Returned => "returned",
        TextureEventKind::Evicted => "evicted",
    }
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        let _ = writeln!(self.writer, "[frame:begin] frame={}", e.frame_index);
    }

    fn on_frame_end(&mut self, e: &FrameEndEvent) {
        let _ = writeln!(
            self.writer,
            "[frame:end] frame={} draws={}",
            e.frame_index, e.draws,
        );
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {}",
            e.frame_index,
            phase_name(e.phase),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {}",
            e.frame_index,
            phase_name(e.phase),
        );
    }

    fn on_filter_push(&mut self, e: &FilterPushEvent) {
        let _ = writeln!(
            self.writer,
            "[filter:push] frame={} depth={} filters={} source={:.1}x{:.1}@({:.1},{:.1})",
            e.frame_index,
            e.depth,
            e.filter_count,
            e.source_frame[2],
            e.source_frame[3],
            e.source_frame[0],
            e.source_frame[1],
        );
    }

    fn on_filter_pop(&mut self, e: &FilterPopEvent) {
        let _ = writeln!(
            self.writer,
            "[filter:pop] frame={} depth={} filters={}",
            e.frame_index, e.depth, e.filter_count,
        );
    }

    fn on_texture_event(&mut self, e: &TextureEvent) {
        let _ = writeln!(
            self.writer,
            "[texture:{}] key={} {}x{}",
            texture_verb(e.kind),
            e.key,
            e.width,
            e.height,
        );
    }
}
