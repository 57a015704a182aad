// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the frame pipeline.
//!
//! This module provides a [`TraceSink`] trait with per-event methods that the
//! frame pipeline calls at each stage. All method bodies default to no-ops,
//! so implementing only the events you care about is fine.
//!
//! [`Tracer`] wraps an optional `&mut dyn TraceSink`. When the `trace` feature
//! is **off**, every `Tracer` method compiles to nothing (zero overhead). When
//! **on**, each method performs a single `Option` branch before dispatching.
//!
//! [`FrameSummaryBuilder`] tallies what happened during a frame and produces
//! a [`FrameSummary`] at the end.
//!
//! # Crate features
//!
//! - `trace`: enables the `Tracer` method bodies (one branch per call).
//! - `trace-rich` (implies `trace`): gates per-rectangle dirty-region events
//!   and per-node paint events plus the corresponding `TraceSink` methods.

#[cfg(feature = "trace-rich")]
use kurbo::Rect;

use crate::render_root::RenderRootResult;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of the frame pipeline is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Dirty-region accumulation over the tree.
    Accumulate,
    /// Culling-bit assignment against the accumulated regions.
    Cull,
    /// Render-root (occlusion) search, one per region.
    RenderRoot,
    /// Painting through the graphics backend.
    Paint,
}

impl PhaseKind {
    /// Every phase, in pipeline order.
    pub const ALL: [Self; 4] = [Self::Accumulate, Self::Cull, Self::RenderRoot, Self::Paint];

    /// Short lowercase label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Accumulate => "accumulate",
            Self::Cull => "cull",
            Self::RenderRoot => "render-root",
            Self::Paint => "paint",
        }
    }
}

/// What a cached node did with its raster during paint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheAction {
    /// The raster was (re)rendered.
    Regenerated {
        /// Raster width in pixels.
        width: u32,
        /// Raster height in pixels.
        height: u32,
    },
    /// The raster was blitted unchanged.
    Reused,
    /// The raster was shifted and the exposed strip repainted.
    Scrolled {
        /// Horizontal shift in raster pixels.
        dx: i32,
        /// Vertical shift in raster pixels.
        dy: i32,
    },
    /// Caching was skipped for this frame and the node painted directly.
    Fallback,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Marks the beginning of a pipeline phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
}

/// Marks the end of a pipeline phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
}

/// Emitted once accumulation has settled the frame's dirty regions.
#[derive(Clone, Copy, Debug)]
pub struct DirtyRegionsEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Number of regions that will be painted.
    pub region_count: u32,
    /// Whether the whole viewport is repainted.
    pub full_repaint: bool,
}

/// Emitted for every region after the render-root search.
#[derive(Clone, Copy, Debug)]
pub struct RenderRootEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which dirty region the search ran for.
    pub region_index: u32,
    /// Outcome of the search.
    pub result: RenderRootResult,
    /// Slot index of the render root, when one was found.
    pub node_index: Option<u32>,
    /// Path length from the tree root to the render root.
    pub depth: u32,
}

/// Emitted whenever a cached node decides what to do with its raster.
#[derive(Clone, Copy, Debug)]
pub struct CacheEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Slot index of the cached node.
    pub node_index: u32,
    /// What happened.
    pub action: CacheAction,
}

/// Per-frame summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Dirty regions painted.
    pub region_count: u32,
    /// Whether the whole viewport was repainted.
    pub full_repaint: bool,
    /// Regions whose paint started below the tree root.
    pub render_roots: u32,
    /// Regions skipped entirely because their render root was clean.
    pub regions_skipped: u32,
    /// Nodes whose paint routine ran.
    pub nodes_painted: u32,
    /// Cache rasters regenerated.
    pub caches_regenerated: u32,
    /// Cache rasters reused as-is.
    pub caches_reused: u32,
    /// Cache rasters shifted by a scroll.
    pub caches_scrolled: u32,
    /// Cached nodes painted directly.
    pub cache_fallbacks: u32,
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the frame pipeline.
///
/// All methods have default no-op implementations, so you only need to
/// override the events you care about.
pub trait TraceSink {
    /// Called at the beginning of a pipeline phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a pipeline phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called once the frame's dirty regions are known.
    fn on_dirty_regions(&mut self, e: &DirtyRegionsEvent) {
        _ = e;
    }

    /// Called after each render-root search.
    fn on_render_root(&mut self, e: &RenderRootEvent) {
        _ = e;
    }

    /// Called for every cached-node decision.
    fn on_cache(&mut self, e: &CacheEvent) {
        _ = e;
    }

    /// Called with the per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called with the frame's dirty rectangles (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_dirty_rects(&mut self, frame_index: u64, rects: &[Rect]) {
        _ = (frame_index, rects);
    }

    /// Called for every node painted (requires `trace-rich`).
    #[cfg(feature = "trace-rich")]
    fn on_node_painted(&mut self, frame_index: u64, node_index: u32) {
        _ = (frame_index, node_index);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
///
/// When the `trace` feature is **off**, every method compiles to nothing. When
/// **on**, each method checks the inner `Option` (one branch) before
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

    /// Emits a [`PhaseBeginEvent`].
    #[inline]
    pub fn phase_begin(&mut self, e: &PhaseBeginEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_begin(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`PhaseEndEvent`].
    #[inline]
    pub fn phase_end(&mut self, e: &PhaseEndEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_phase_end(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`DirtyRegionsEvent`].
    #[inline]
    pub fn dirty_regions(&mut self, e: &DirtyRegionsEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_dirty_regions(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`RenderRootEvent`].
    #[inline]
    pub fn render_root(&mut self, e: &RenderRootEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_render_root(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`CacheEvent`].
    #[inline]
    pub fn cache(&mut self, e: &CacheEvent) {
        #[cfg(feature = "trace")]
        if let Some(s) = &mut self.sink {
            s.on_cache(e);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = e;
        }
    }

    /// Emits a [`FrameSummary`].
    #[inline]
    pub fn frame_summary(&mut self, s: &FrameSummary) {
        #[cfg(feature = "trace")]
        if let Some(sink) = &mut self.sink {
            sink.on_frame_summary(s);
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = s;
        }
    }

    /// Emits dirty rectangles (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn dirty_rects(&mut self, frame_index: u64, rects: &[Rect]) {
        if let Some(s) = &mut self.sink {
            s.on_dirty_rects(frame_index, rects);
        }
    }

    /// Emits a node-painted event (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn node_painted(&mut self, frame_index: u64, node_index: u32) {
        if let Some(s) = &mut self.sink {
            s.on_node_painted(frame_index, node_index);
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Tallies per-frame counters and produces a [`FrameSummary`].
#[derive(Debug, Default)]
pub struct FrameSummaryBuilder {
    summary: FrameSummary,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given frame.
    #[must_use]
    pub fn new(frame_index: u64) -> Self {
        Self {
            summary: FrameSummary {
                frame_index,
                ..FrameSummary::default()
            },
        }
    }

    /// Records the settled dirty regions.
    pub fn set_regions(&mut self, region_count: u32, full_repaint: bool) {
        self.summary.region_count = region_count;
        self.summary.full_repaint = full_repaint;
    }

    /// Records one render-root outcome.
    pub fn record_render_root(&mut self, result: RenderRootResult) {
        match result {
            RenderRootResult::HasRenderRoot => self.summary.render_roots += 1,
            RenderRootResult::HasRenderRootAndIsClean => self.summary.regions_skipped += 1,
            RenderRootResult::NoRenderRoot => {}
        }
    }

    /// Records one cache decision.
    pub fn record_cache(&mut self, action: CacheAction) {
        match action {
            CacheAction::Regenerated { .. } => self.summary.caches_regenerated += 1,
            CacheAction::Reused => self.summary.caches_reused += 1,
            CacheAction::Scrolled { .. } => self.summary.caches_scrolled += 1,
            CacheAction::Fallback => self.summary.cache_fallbacks += 1,
        }
    }

    /// Adds to the painted-node counter.
    pub fn add_nodes_painted(&mut self, n: u32) {
        self.summary.nodes_painted += n;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        self.summary
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn noop_sink_compiles() {
        let mut sink = NoopSink;
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 0,
            phase: PhaseKind::Accumulate,
        });
        sink.on_frame_summary(&FrameSummary::default());
    }

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.phase_begin(&PhaseBeginEvent {
            frame_index: 1,
            phase: PhaseKind::Paint,
        });
        tracer.cache(&CacheEvent {
            frame_index: 1,
            node_index: 3,
            action: CacheAction::Reused,
        });
    }

    #[test]
    fn summary_builder_tallies() {
        let mut builder = FrameSummaryBuilder::new(9);
        builder.set_regions(2, false);
        builder.record_render_root(RenderRootResult::HasRenderRoot);
        builder.record_render_root(RenderRootResult::NoRenderRoot);
        builder.record_render_root(RenderRootResult::HasRenderRootAndIsClean);
        builder.record_cache(CacheAction::Regenerated {
            width: 10,
            height: 10,
        });
        builder.record_cache(CacheAction::Scrolled { dx: 5, dy: 0 });
        builder.record_cache(CacheAction::Fallback);
        builder.add_nodes_painted(4);

        let summary = builder.finish();
        assert_eq!(summary.frame_index, 9);
        assert_eq!(summary.region_count, 2);
        assert_eq!(summary.render_roots, 1);
        assert_eq!(summary.regions_skipped, 1);
        assert_eq!(summary.caches_regenerated, 1);
        assert_eq!(summary.caches_scrolled, 1);
        assert_eq!(summary.cache_fallbacks, 1);
        assert_eq!(summary.caches_reused, 0);
        assert_eq!(summary.nodes_painted, 4);
    }

    #[test]
    fn phase_labels_are_distinct() {
        let labels: Vec<_> = PhaseKind::ALL.iter().map(|p| p.label()).collect();
        assert_eq!(labels, ["accumulate", "cull", "render-root", "paint"]);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        struct RecordingSink {
            caches: Vec<u32>,
        }
        impl TraceSink for RecordingSink {
            fn on_cache(&mut self, e: &CacheEvent) {
                self.caches.push(e.node_index);
            }
        }

        let mut sink = RecordingSink { caches: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.cache(&CacheEvent {
            frame_index: 0,
            node_index: 42,
            action: CacheAction::Fallback,
        });
        drop(tracer);
        assert_eq!(sink.caches, &[42]);
    }
}
