// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and encodes events into a
//! `Vec<u8>` as fixed-size little-endian records. [`decode`] reads them back
//! as an iterator of [`RecordedEvent`].
//!
//! Dirty rectangles ([`on_dirty_rects`](TraceSink::on_dirty_rects)) store
//! only the count.

use kurbo::Rect;
use tessera_core::render_root::RenderRootResult;
use tessera_core::trace::{
    CacheAction, CacheEvent, DirtyRegionsEvent, FrameSummary, PhaseBeginEvent, PhaseEndEvent,
    PhaseKind, RenderRootEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_PHASE_BEGIN: u8 = 1;
const TAG_PHASE_END: u8 = 2;
const TAG_DIRTY_REGIONS: u8 = 3;
const TAG_RENDER_ROOT: u8 = 4;
const TAG_CACHE: u8 = 5;
const TAG_FRAME_SUMMARY: u8 = 6;
const TAG_DIRTY_RECTS_COUNT: u8 = 7;
const TAG_NODE_PAINTED: u8 = 8;

const CACHE_REGENERATED: u8 = 0;
const CACHE_REUSED: u8 = 1;
const CACHE_SCROLLED: u8 = 2;
const CACHE_FALLBACK: u8 = 3;

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_option_u32(&mut self, v: Option<u32>) {
        match v {
            Some(val) => {
                self.write_u8(1);
                self.write_u32(val);
            }
            None => {
                self.write_u8(0);
                self.write_u32(0);
            }
        }
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Accumulate => 0,
            PhaseKind::Cull => 1,
            PhaseKind::RenderRoot => 2,
            PhaseKind::Paint => 3,
        });
    }

    fn write_render_root(&mut self, r: RenderRootResult) {
        self.write_u8(match r {
            RenderRootResult::NoRenderRoot => 0,
            RenderRootResult::HasRenderRoot => 1,
            RenderRootResult::HasRenderRootAndIsClean => 2,
        });
    }

    /// Every cache action takes a tag and two 32-bit operands.
    fn write_cache_action(&mut self, a: CacheAction) {
        match a {
            CacheAction::Regenerated { width, height } => {
                self.write_u8(CACHE_REGENERATED);
                self.write_u32(width);
                self.write_u32(height);
            }
            CacheAction::Reused => {
                self.write_u8(CACHE_REUSED);
                self.write_u64(0);
            }
            CacheAction::Scrolled { dx, dy } => {
                self.write_u8(CACHE_SCROLLED);
                self.write_i32(dx);
                self.write_i32(dy);
            }
            CacheAction::Fallback => {
                self.write_u8(CACHE_FALLBACK);
                self.write_u64(0);
            }
        }
    }
}

impl TraceSink for RecorderSink {
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
    }

    fn on_dirty_regions(&mut self, e: &DirtyRegionsEvent) {
        self.write_u8(TAG_DIRTY_REGIONS);
        self.write_u64(e.frame_index);
        self.write_u32(e.region_count);
        self.write_bool(e.full_repaint);
    }

    fn on_render_root(&mut self, e: &RenderRootEvent) {
        self.write_u8(TAG_RENDER_ROOT);
        self.write_u64(e.frame_index);
        self.write_u32(e.region_index);
        self.write_render_root(e.result);
        self.write_option_u32(e.node_index);
        self.write_u32(e.depth);
    }

    fn on_cache(&mut self, e: &CacheEvent) {
        self.write_u8(TAG_CACHE);
        self.write_u64(e.frame_index);
        self.write_u32(e.node_index);
        self.write_cache_action(e.action);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u32(s.region_count);
        self.write_bool(s.full_repaint);
        self.write_u32(s.render_roots);
        self.write_u32(s.regions_skipped);
        self.write_u32(s.nodes_painted);
        self.write_u32(s.caches_regenerated);
        self.write_u32(s.caches_reused);
        self.write_u32(s.caches_scrolled);
        self.write_u32(s.cache_fallbacks);
    }

    fn on_dirty_rects(&mut self, frame_index: u64, rects: &[Rect]) {
        self.write_u8(TAG_DIRTY_RECTS_COUNT);
        self.write_u64(frame_index);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "dirty rect count capped at u32::MAX for recording"
        )]
        let count = rects.len().min(u32::MAX as usize) as u32;
        self.write_u32(count);
    }

    fn on_node_painted(&mut self, frame_index: u64, node_index: u32) {
        self.write_u8(TAG_NODE_PAINTED);
        self.write_u64(frame_index);
        self.write_u32(node_index);
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`DirtyRegionsEvent`].
    DirtyRegions(DirtyRegionsEvent),
    /// A [`RenderRootEvent`].
    RenderRoot(RenderRootEvent),
    /// A [`CacheEvent`].
    Cache(CacheEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
    /// Dirty-rect count for a frame.
    DirtyRectsCount {
        /// Frame counter.
        frame_index: u64,
        /// Number of dirty rects.
        count: u32,
    },
    /// A node painted during a frame.
    NodePainted {
        /// Frame counter.
        frame_index: u64,
        /// Slot index of the painted node.
        node_index: u32,
    },
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let bytes = self.data.get(self.pos..self.pos + N)?;
        self.pos += N;
        bytes.try_into().ok()
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.take::<1>().map(|[b]| b)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.take().map(u32::from_le_bytes)
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.take().map(i32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.take().map(u64::from_le_bytes)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_option_u32(&mut self) -> Option<Option<u32>> {
        let present = self.read_u8()?;
        let val = self.read_u32()?;
        Some((present != 0).then_some(val))
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Accumulate,
            1 => PhaseKind::Cull,
            2 => PhaseKind::RenderRoot,
            3 => PhaseKind::Paint,
            _ => return None,
        })
    }

    fn read_render_root(&mut self) -> Option<RenderRootResult> {
        Some(match self.read_u8()? {
            0 => RenderRootResult::NoRenderRoot,
            1 => RenderRootResult::HasRenderRoot,
            2 => RenderRootResult::HasRenderRootAndIsClean,
            _ => return None,
        })
    }

    fn read_cache_action(&mut self) -> Option<CacheAction> {
        let kind = self.read_u8()?;
        Some(match kind {
            CACHE_REGENERATED => CacheAction::Regenerated {
                width: self.read_u32()?,
                height: self.read_u32()?,
            },
            CACHE_SCROLLED => CacheAction::Scrolled {
                dx: self.read_i32()?,
                dy: self.read_i32()?,
            },
            CACHE_REUSED => {
                self.read_u64()?;
                CacheAction::Reused
            }
            CACHE_FALLBACK => {
                self.read_u64()?;
                CacheAction::Fallback
            }
            _ => return None,
        })
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
        }))
    }

    fn decode_dirty_regions(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::DirtyRegions(DirtyRegionsEvent {
            frame_index: self.read_u64()?,
            region_count: self.read_u32()?,
            full_repaint: self.read_bool()?,
        }))
    }

    fn decode_render_root(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::RenderRoot(RenderRootEvent {
            frame_index: self.read_u64()?,
            region_index: self.read_u32()?,
            result: self.read_render_root()?,
            node_index: self.read_option_u32()?,
            depth: self.read_u32()?,
        }))
    }

    fn decode_cache(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Cache(CacheEvent {
            frame_index: self.read_u64()?,
            node_index: self.read_u32()?,
            action: self.read_cache_action()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            region_count: self.read_u32()?,
            full_repaint: self.read_bool()?,
            render_roots: self.read_u32()?,
            regions_skipped: self.read_u32()?,
            nodes_painted: self.read_u32()?,
            caches_regenerated: self.read_u32()?,
            caches_reused: self.read_u32()?,
            caches_scrolled: self.read_u32()?,
            cache_fallbacks: self.read_u32()?,
        }))
    }

    fn decode_dirty_rects_count(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let count = self.read_u32()?;
        Some(RecordedEvent::DirtyRectsCount { frame_index, count })
    }

    fn decode_node_painted(&mut self) -> Option<RecordedEvent> {
        let frame_index = self.read_u64()?;
        let node_index = self.read_u32()?;
        Some(RecordedEvent::NodePainted {
            frame_index,
            node_index,
        })
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        let tag = self.read_u8()?;
        match tag {
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_DIRTY_REGIONS => self.decode_dirty_regions(),
            TAG_RENDER_ROOT => self.decode_render_root(),
            TAG_CACHE => self.decode_cache(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            TAG_DIRTY_RECTS_COUNT => self.decode_dirty_rects_count(),
            TAG_NODE_PAINTED => self.decode_node_painted(),
            _ => None, // unknown tag → stop iteration
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
