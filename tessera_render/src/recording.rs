// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A [`Graphics`] implementation that records every call instead of drawing.
//!
//! Useful for tests and for inspecting what a frame would send to a real
//! backend. Rasters are plain ids; allocation, locking and target binding
//! can be made to fail on demand.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::vec::Vec;

use kurbo::{Rect, RoundedRect};
use tessera_core::backend::{BlendMode, Color, Graphics, GraphicsState, RasterId};
use tessera_core::transform::Transform3d;

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq)]
pub enum Op {
    /// A raster was allocated.
    Allocate {
        /// The new raster.
        raster: RasterId,
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// A raster was released.
    Release(RasterId),
    /// Drawing was redirected into a raster.
    PushTarget(RasterId),
    /// Drawing returned to the previous target.
    PopTarget,
    /// The clip rectangle changed.
    SetClip(Option<Rect>),
    /// The target (or part of it) was cleared.
    Clear(Option<Rect>),
    /// A solid rectangle fill.
    FillRect {
        /// Local-space rectangle.
        rect: Rect,
        /// Fill colour.
        color: Color,
        /// Transform in effect.
        transform: Transform3d,
        /// Extra alpha in effect.
        alpha: f32,
    },
    /// A solid rounded-rectangle fill.
    FillRoundedRect {
        /// Local-space shape.
        rect: RoundedRect,
        /// Fill colour.
        color: Color,
        /// Transform in effect.
        transform: Transform3d,
    },
    /// A rectangle outline.
    StrokeRect {
        /// Local-space rectangle.
        rect: Rect,
        /// Stroke width.
        width: f64,
        /// Stroke colour.
        color: Color,
    },
    /// A raster drawn as a textured quad.
    DrawRaster {
        /// Source raster.
        raster: RasterId,
        /// Source rectangle in raster pixels.
        src: Rect,
        /// Destination rectangle in local space.
        dst: Rect,
        /// Transform in effect.
        transform: Transform3d,
        /// Extra alpha in effect.
        alpha: f32,
    },
    /// Content composited through a mask.
    DrawMasked {
        /// Content raster.
        content: RasterId,
        /// Mask raster.
        mask: RasterId,
        /// Destination rectangle.
        dst: Rect,
    },
    /// Content composited with a blend mode.
    DrawBlended {
        /// Content raster.
        content: RasterId,
        /// Blend mode.
        mode: BlendMode,
        /// Destination rectangle.
        dst: Rect,
    },
}

/// A recording graphics backend.
#[derive(Debug)]
pub struct RecordingGraphics {
    ops: Vec<Op>,
    state: GraphicsState,
    targets: Vec<(RasterId, GraphicsState)>,
    rasters: BTreeMap<RasterId, (u32, u32)>,
    locked: BTreeSet<RasterId>,
    lost: BTreeSet<RasterId>,
    next_raster: u64,
    pixel_scale: (f64, f64),
    max_raster_size: u32,
    fail_allocations: bool,
}

impl Default for RecordingGraphics {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingGraphics {
    /// Creates a backend with unit pixel scale and a 4096-pixel raster limit.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ops: Vec::new(),
            state: GraphicsState {
                transform: Transform3d::IDENTITY,
                clip: None,
                extra_alpha: 1.0,
                depth_test: false,
            },
            targets: Vec::new(),
            rasters: BTreeMap::new(),
            locked: BTreeSet::new(),
            lost: BTreeSet::new(),
            next_raster: 1,
            pixel_scale: (1.0, 1.0),
            max_raster_size: 4096,
            fail_allocations: false,
        }
    }

    /// Sets the reported device pixel scale.
    #[must_use]
    pub fn with_pixel_scale(mut self, sx: f64, sy: f64) -> Self {
        self.pixel_scale = (sx, sy);
        self
    }

    /// Sets the largest raster edge the backend accepts.
    #[must_use]
    pub fn with_max_raster_size(mut self, max: u32) -> Self {
        self.max_raster_size = max;
        self
    }

    /// Makes every subsequent allocation fail (or succeed again).
    pub fn set_fail_allocations(&mut self, fail: bool) {
        self.fail_allocations = fail;
    }

    /// Simulates the device dropping a raster's contents.
    pub fn lose_raster(&mut self, raster: RasterId) {
        self.lost.insert(raster);
    }

    /// Returns the recorded calls.
    #[must_use]
    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Returns and forgets the recorded calls.
    pub fn take_ops(&mut self) -> Vec<Op> {
        core::mem::take(&mut self.ops)
    }

    /// Number of allocated, unreleased rasters.
    #[must_use]
    pub fn live_rasters(&self) -> usize {
        self.rasters.len()
    }

    /// Is `raster` allocated and unreleased?
    #[must_use]
    pub fn is_live(&self, raster: RasterId) -> bool {
        self.rasters.contains_key(&raster)
    }

    /// Returns the raster currently drawn into, if any.
    #[must_use]
    pub fn current_target(&self) -> Option<RasterId> {
        self.targets.last().map(|(id, _)| *id)
    }
}

impl Graphics for RecordingGraphics {
    fn transform(&self) -> Transform3d {
        self.state.transform
    }

    fn set_transform(&mut self, transform: Transform3d) {
        self.state.transform = transform;
    }

    fn clip_rect(&self) -> Option<Rect> {
        self.state.clip
    }

    fn set_clip_rect(&mut self, clip: Option<Rect>) {
        if self.state.clip != clip {
            self.ops.push(Op::SetClip(clip));
        }
        self.state.clip = clip;
    }

    fn extra_alpha(&self) -> f32 {
        self.state.extra_alpha
    }

    fn set_extra_alpha(&mut self, alpha: f32) {
        self.state.extra_alpha = alpha;
    }

    fn depth_test(&self) -> bool {
        self.state.depth_test
    }

    fn set_depth_test(&mut self, enabled: bool) {
        self.state.depth_test = enabled;
    }

    fn pixel_scale(&self) -> (f64, f64) {
        self.pixel_scale
    }

    fn max_raster_size(&self) -> u32 {
        self.max_raster_size
    }

    fn allocate_raster(&mut self, width: u32, height: u32) -> Option<RasterId> {
        if self.fail_allocations || width > self.max_raster_size || height > self.max_raster_size {
            return None;
        }
        let raster = RasterId(self.next_raster);
        self.next_raster += 1;
        self.rasters.insert(raster, (width, height));
        self.ops.push(Op::Allocate {
            raster,
            width,
            height,
        });
        Some(raster)
    }

    fn lock_raster(&mut self, raster: RasterId) -> bool {
        if !self.rasters.contains_key(&raster) || self.lost.contains(&raster) {
            return false;
        }
        self.locked.insert(raster)
    }

    fn unlock_raster(&mut self, raster: RasterId) {
        self.locked.remove(&raster);
    }

    fn release_raster(&mut self, raster: RasterId) {
        assert!(
            !self.locked.contains(&raster),
            "released {raster:?} while locked"
        );
        if self.rasters.remove(&raster).is_some() {
            self.lost.remove(&raster);
            self.ops.push(Op::Release(raster));
        }
    }

    fn push_target(&mut self, raster: RasterId) -> bool {
        if self.fail_allocations || !self.rasters.contains_key(&raster) {
            return false;
        }
        let saved = self.state;
        self.targets.push((raster, saved));
        self.state = GraphicsState {
            transform: Transform3d::IDENTITY,
            clip: None,
            extra_alpha: 1.0,
            depth_test: false,
        };
        self.ops.push(Op::PushTarget(raster));
        true
    }

    fn pop_target(&mut self) {
        let (_, saved) = self
            .targets
            .pop()
            .unwrap_or_else(|| panic!("pop_target without a matching push_target"));
        self.state = saved;
        self.ops.push(Op::PopTarget);
    }

    fn clear(&mut self, area: Option<Rect>) {
        self.ops.push(Op::Clear(area));
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ops.push(Op::FillRect {
            rect,
            color,
            transform: self.state.transform,
            alpha: self.state.extra_alpha,
        });
    }

    fn fill_rounded_rect(&mut self, rect: RoundedRect, color: Color) {
        self.ops.push(Op::FillRoundedRect {
            rect,
            color,
            transform: self.state.transform,
        });
    }

    fn stroke_rect(&mut self, rect: Rect, width: f64, color: Color) {
        self.ops.push(Op::StrokeRect { rect, width, color });
    }

    fn draw_raster(&mut self, raster: RasterId, src: Rect, dst: Rect) {
        self.ops.push(Op::DrawRaster {
            raster,
            src,
            dst,
            transform: self.state.transform,
            alpha: self.state.extra_alpha,
        });
    }

    fn draw_masked(&mut self, content: RasterId, mask: RasterId, dst: Rect) {
        self.ops.push(Op::DrawMasked { content, mask, dst });
    }

    fn draw_blended(&mut self, content: RasterId, mode: BlendMode, dst: Rect) {
        self.ops.push(Op::DrawBlended { content, mode, dst });
    }
}
