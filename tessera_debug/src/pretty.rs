// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output.
//!
//! [`PrettyPrintSink`] implements [`TraceSink`] and writes one line per event
//! to a [`Write`](std::io::Write) destination (default: stderr).

use std::io::Write;

use kurbo::Rect;
use tessera_core::render_root::RenderRootResult;
use tessera_core::trace::{
    CacheAction, CacheEvent, DirtyRegionsEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent,
    RenderRootEvent, TraceSink,
};

/// Writes human-readable trace lines to a [`Write`](std::io::Write) destination.
pub struct PrettyPrintSink<W: Write = Box<dyn Write>> {
    writer: W,
    /// Also print one line per painted node.
    verbose: bool,
}

impl<W: Write> std::fmt::Debug for PrettyPrintSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrettyPrintSink")
            .field("verbose", &self.verbose)
            .finish_non_exhaustive()
    }
}

impl PrettyPrintSink {
    /// Creates a sink that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates a sink that writes to a boxed writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write>) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink that writes to the given destination.
    #[must_use]
    pub fn with_writer(writer: W) -> Self {
        Self {
            writer,
            verbose: false,
        }
    }

    /// Enables per-node paint lines.
    #[must_use]
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

fn render_root_name(result: RenderRootResult) -> &'static str {
    match result {
        RenderRootResult::NoRenderRoot => "none",
        RenderRootResult::HasRenderRoot => "found",
        RenderRootResult::HasRenderRootAndIsClean => "clean",
    }
}

fn fmt_rect(r: &Rect) -> String {
    format!("({:.0},{:.0} {:.0}x{:.0})", r.x0, r.y0, r.width(), r.height())
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:begin] frame={} {}",
            e.frame_index,
            e.phase.label(),
        );
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        let _ = writeln!(
            self.writer,
            "[phase:end] frame={} {}",
            e.frame_index,
            e.phase.label(),
        );
    }

    fn on_dirty_regions(&mut self, e: &DirtyRegionsEvent) {
        let full = if e.full_repaint { " FULL" } else { "" };
        let _ = writeln!(
            self.writer,
            "[regions] frame={} count={}{full}",
            e.frame_index, e.region_count,
        );
    }

    fn on_render_root(&mut self, e: &RenderRootEvent) {
        let node = e
            .node_index
            .map_or_else(|| "-".to_owned(), |n| format!("#{n}"));
        let _ = writeln!(
            self.writer,
            "[render-root] frame={} region={} {} node={node} depth={}",
            e.frame_index,
            e.region_index,
            render_root_name(e.result),
            e.depth,
        );
    }

    fn on_cache(&mut self, e: &CacheEvent) {
        let action = match e.action {
            CacheAction::Regenerated { width, height } => format!("regenerated {width}x{height}"),
            CacheAction::Reused => "reused".to_owned(),
            CacheAction::Scrolled { dx, dy } => format!("scrolled by ({dx},{dy})"),
            CacheAction::Fallback => "fallback".to_owned(),
        };
        let _ = writeln!(
            self.writer,
            "[cache] frame={} node=#{} {action}",
            e.frame_index, e.node_index,
        );
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        let full = if s.full_repaint { "full" } else { "partial" };
        let _ = writeln!(
            self.writer,
            "[summary] frame={} regions={} ({full}) roots={} skipped={} painted={} \
             cache: regen={} reuse={} scroll={} fallback={}",
            s.frame_index,
            s.region_count,
            s.render_roots,
            s.regions_skipped,
            s.nodes_painted,
            s.caches_regenerated,
            s.caches_reused,
            s.caches_scrolled,
            s.cache_fallbacks,
        );
    }

    fn on_dirty_rects(&mut self, frame_index: u64, rects: &[Rect]) {
        let list: Vec<String> = rects.iter().map(fmt_rect).collect();
        let _ = writeln!(
            self.writer,
            "[dirty] frame={frame_index} rects=[{}]",
            list.join(" "),
        );
    }

    fn on_node_painted(&mut self, frame_index: u64, node_index: u32) {
        if self.verbose {
            let _ = writeln!(self.writer, "[paint] frame={frame_index} node=#{node_index}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_core::trace::PhaseKind;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).unwrap()
    }

    #[test]
    fn summary_line_has_counts() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_frame_summary(&FrameSummary {
            frame_index: 3,
            region_count: 2,
            nodes_painted: 9,
            caches_reused: 1,
            ..FrameSummary::default()
        });
        let out = output(sink);
        assert!(out.starts_with("[summary] frame=3 regions=2 (partial)"), "got: {out}");
        assert!(out.contains("painted=9"), "got: {out}");
        assert!(out.contains("reuse=1"), "got: {out}");
    }

    #[test]
    fn phases_use_labels() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 1,
            phase: PhaseKind::RenderRoot,
        });
        assert_eq!(output(sink), "[phase:begin] frame=1 render-root\n");
    }

    #[test]
    fn render_root_and_cache_lines() {
        let mut sink = PrettyPrintSink::with_writer(Vec::<u8>::new());
        sink.on_render_root(&RenderRootEvent {
            frame_index: 2,
            region_index: 0,
            result: RenderRootResult::HasRenderRoot,
            node_index: Some(4),
            depth: 2,
        });
        sink.on_cache(&CacheEvent {
            frame_index: 2,
            node_index: 4,
            action: CacheAction::Scrolled { dx: 0, dy: -8 },
        });
        let out = output(sink);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "[render-root] frame=2 region=0 found node=#4 depth=2",
                "[cache] frame=2 node=#4 scrolled by (0,-8)",
            ]
        );
    }

    #[test]
    fn node_paint_lines_only_when_verbose() {
        let mut quiet = PrettyPrintSink::with_writer(Vec::<u8>::new());
        quiet.on_node_painted(1, 7);
        assert!(output(quiet).is_empty());

        let mut loud = PrettyPrintSink::with_writer(Vec::<u8>::new()).verbose(true);
        loud.on_node_painted(1, 7);
        loud.on_dirty_rects(1, &[Rect::new(10.0, 20.0, 40.0, 30.0)]);
        assert_eq!(
            output(loud),
            "[paint] frame=1 node=#7\n[dirty] frame=1 rects=[(10,20 30x10)]\n"
        );
    }
}
