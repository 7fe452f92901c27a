// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! renderer and pools call at each stage. All method bodies default to
//! no-ops, so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace`
//! feature is **off**, every `Tracer` method compiles to nothing (zero
//! overhead). When **on**, each method performs a single `Option` branch
//! before dispatching.

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the frame is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Transform/alpha propagation over the scene graph.
    Update,
    /// The recursive render walk, including filter passes.
    Render,
}

/// What happened to a pooled render texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureEventKind {
    /// A fresh texture was created through the rasterizer.
    Created,
    /// A texture was handed out from the pool.
    Acquired,
    /// A texture was returned to the pool.
    Returned,
    /// An idle texture was destroyed by the GC sweep.
    Evicted,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the renderer begins a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
}

/// Emitted when the renderer finishes a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameEndEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Number of draw records flushed this frame.
    pub draws: u32,
}

/// Marks the beginning of a frame phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of a frame phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
}

/// Emitted when a filter subtree is entered and its offscreen target bound.
#[derive(Clone, Copy, Debug)]
pub struct FilterPushEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Stack depth after the push (1 = outermost).
    pub depth: u32,
    /// Number of enabled filters in the chain.
    pub filter_count: u32,
    /// Source frame as `[x, y, width, height]` in logical pixels.
    pub source_frame: [f64; 4],
}

/// Emitted when a filter subtree is exited and its chain applied.
#[derive(Clone, Copy, Debug)]
pub struct FilterPopEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Stack depth before the pop.
    pub depth: u32,
    /// Number of filters that were applied.
    pub filter_count: u32,
}

/// Emitted on render-texture pool traffic.
#[derive(Clone, Copy, Debug)]
pub struct TextureEvent {
    /// What happened.
    pub kind: TextureEventKind,
    /// Backend-assigned texture key.
    pub key: u64,
    /// Physical width in device pixels.
    pub width: u32,
    /// Physical height in device pixels.
    pub height: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame pipeline.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called when a frame begins.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called when a frame ends.
    fn on_frame_end(&mut self, e: &FrameEndEvent) {
        _ = e;
    }

    /// Called at the beginning of a frame phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a frame phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called when a filter state is pushed.
    fn on_filter_push(&mut self, e: &FilterPushEvent) {
        _ = e;
    }

    /// Called when a filter state is popped and applied.
    fn on_filter_pop(&mut self, e: &FilterPopEvent) {
        _ = e;
    }

    /// Called on render-texture pool traffic.
    fn on_texture_event(&mut self, e: &TextureEvent) {
        _ = e;
    }
}

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing.
/// When **on**, each method checks the inner `Option` (one branch) before
/// dispatching to the sink.
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

macro_rules! emit {
    ($self:ident, $method:ident, $e:ident) => {{
        #[cfg(feature = "trace")]
        if let Some(s) = &mut $self.sink {
            s.$method($e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = $e;
        }
    }};
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Emits a [`FrameBeginEvent`].
    #[inline]
    pub fn frame_begin(&mut self, e: &FrameBeginEvent) {
        emit!(self, on_frame_begin, e);
    }

    /// Emits a [`FrameEndEvent`].
    #[inline]
    pub fn frame_end(&mut self, e: &FrameEndEvent) {
        emit!(self, on_frame_end, e);
    }

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        emit!(self, on_phase_begin, e);
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        emit!(self, on_phase_end, e);
    }

    /// Emits a [`FilterPushEvent`].
    #[inline]
    pub fn filter_push(&mut self, e: &FilterPushEvent) {
        emit!(self, on_filter_push, e);
    }

    /// Emits a [`FilterPopEvent`].
    #[inline]
    pub fn filter_pop(&mut self, e: &FilterPopEvent) {
        emit!(self, on_filter_pop, e);
    }

    /// Emits a [`TextureEvent`].
    #[inline]
    pub fn texture_event(&mut self, e: &TextureEvent) {
        emit!(self, on_texture_event, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(feature = "trace")]
    #[derive(Default)]
    struct CountingSink {
        frames: u32,
        phases: u32,
        textures: u32,
    }

    #[cfg(feature = "trace")]
    impl TraceSink for CountingSink {
        fn on_frame_begin(&mut self, _e: &FrameBeginEvent) {
            self.frames += 1;
        }
        fn on_phase_begin(&mut self, _e: &PhaseBeginEvent) {
            self.phases += 1;
        }
        fn on_texture_event(&mut self, _e: &TextureEvent) {
            self.textures += 1;
        }
    }

    #[test]
    fn noop_sink_accepts_everything() {
        let mut sink = NoopSink;
        let mut tracer = Tracer::new(&mut sink);
        tracer.frame_begin(&FrameBeginEvent { frame_index: 0 });
        tracer.filter_pop(&FilterPopEvent {
            frame_index: 0,
            depth: 1,
            filter_count: 2,
        });
    }

    #[cfg(feature = "trace")]
    #[test]
    fn events_reach_the_sink() {
        let mut sink = CountingSink::default();
        {
            let mut tracer = Tracer::new(&mut sink);
            tracer.frame_begin(&FrameBeginEvent { frame_index: 1 });
            tracer.phase_begin(&PhaseBeginEvent {
                frame_index: 1,
                phase: PhaseKind::Update,
            });
            tracer.texture_event(&TextureEvent {
                kind: TextureEventKind::Created,
                key: 7,
                width: 64,
                height: 64,
            });
        }
        assert_eq!((sink.frames, sink.phases, sink.textures), (1, 1, 1));
    }

    #[test]
    fn none_tracer_is_silent() {
        let mut tracer = Tracer::none();
        tracer.frame_end(&FrameEndEvent {
            frame_index: 2,
            draws: 10,
        });
    }
}
