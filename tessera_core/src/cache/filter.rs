// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-node bitmap cache state.
//!
//! A [`CacheFilter`] owns the raster a cached node was last rendered into
//! and decides, frame by frame, whether that raster can be reused under the
//! live transform, shifted in place after a pure translation of the node's
//! only child, or must be regenerated. Drawing itself happens in the render
//! crate; this module only keeps the bookkeeping honest.

use alloc::vec::Vec;

use kurbo::{Affine, Point, Rect, Vec2};

use crate::backend::RasterId;
use crate::geom;
use crate::node::{INVALID, NodeId, NodeKind, SceneStore};
use crate::transform::Transform3d;

use super::hint::CacheHint;
use super::unmatrix::{EPS, XformInfo};

/// Whether translations of the cached node's child may shift the raster.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ScrollCacheState {
    /// Not yet known; decided at the next render with a pending delta.
    #[default]
    CheckingPreconditions,
    /// Translations scroll the raster.
    Enabled,
    /// Translations repaint the raster.
    Disabled,
}

/// A raster holding a cached node's content.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CachedRaster {
    /// Backend handle.
    pub id: RasterId,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Cache-space rectangle covered by the raster. Pixel `(0, 0)` sits at
    /// its top-left corner.
    pub bounds: Rect,
}

impl CachedRaster {
    /// Returns the raster's pixel rectangle.
    #[must_use]
    pub fn pixel_rect(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width), f64::from(self.height))
    }
}

/// How to shift a raster by a whole-pixel delta.
///
/// All rectangles are in raster pixels.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScrollPlan {
    /// Pixel offset of the content.
    pub delta: Vec2,
    /// Pixels that survive the shift, before moving.
    pub keep_src: Rect,
    /// Where the surviving pixels land.
    pub keep_dst: Rect,
    /// The strip uncovered by the shift, to be repainted.
    pub strip: Rect,
}

/// Bitmap cache bookkeeping for one node.
#[derive(Clone, Debug)]
pub struct CacheFilter {
    hint: CacheHint,
    raster: Option<CachedRaster>,
    scratch: Option<RasterId>,
    content_valid: bool,
    cached_xform: Affine,
    cached_info: XformInfo,
    was_unsupported: bool,
    scroll_state: ScrollCacheState,
    last_x_delta: f64,
    last_y_delta: f64,
    screen_xform: Affine,
}

impl CacheFilter {
    /// Creates an empty filter; the first render regenerates.
    #[must_use]
    pub fn new(hint: CacheHint) -> Self {
        Self {
            hint,
            raster: None,
            scratch: None,
            content_valid: false,
            cached_xform: Affine::IDENTITY,
            cached_info: XformInfo::IDENTITY,
            was_unsupported: false,
            scroll_state: ScrollCacheState::CheckingPreconditions,
            last_x_delta: 0.0,
            last_y_delta: 0.0,
            screen_xform: Affine::IDENTITY,
        }
    }

    /// Returns the cache hint.
    #[must_use]
    pub fn hint(&self) -> CacheHint {
        self.hint
    }

    /// Does this filter already use `hint`?
    #[must_use]
    pub fn matches_hint(&self, hint: CacheHint) -> bool {
        self.hint == hint
    }

    /// Changes the hint. The raster is kept and judged against the new hint
    /// at the next render.
    pub fn set_hint(&mut self, hint: CacheHint) {
        self.hint = hint;
    }

    /// Returns the current raster, if any.
    #[must_use]
    pub fn raster(&self) -> Option<&CachedRaster> {
        self.raster.as_ref()
    }

    /// Returns whether the raster's pixels reflect the node's content.
    #[must_use]
    pub fn is_content_valid(&self) -> bool {
        self.content_valid
    }

    /// Returns the linear transform the raster was rendered with.
    #[must_use]
    pub fn cached_xform(&self) -> Affine {
        self.cached_xform
    }

    /// Returns the decomposition of [`cached_xform`](Self::cached_xform).
    #[must_use]
    pub fn cached_info(&self) -> XformInfo {
        self.cached_info
    }

    /// Returns the scroll-state machine's state.
    #[must_use]
    pub fn scroll_state(&self) -> ScrollCacheState {
        self.scroll_state
    }

    /// Returns the accumulated, not yet applied child translation.
    #[must_use]
    pub fn scroll_delta(&self) -> (f64, f64) {
        (self.last_x_delta, self.last_y_delta)
    }

    /// Returns the transform from cache space to the live linear space.
    #[must_use]
    pub fn screen_xform(&self) -> Affine {
        self.screen_xform
    }

    /// The cached content no longer matches the node.
    pub fn invalidate(&mut self) {
        self.scroll_state = ScrollCacheState::CheckingPreconditions;
        self.content_valid = false;
        self.last_x_delta = 0.0;
        self.last_y_delta = 0.0;
    }

    /// The node's only child moved by `(dx, dy)` in the node's space and
    /// nothing else changed.
    pub fn invalidate_by_translation(&mut self, dx: f64, dy: f64) {
        if self.scroll_state == ScrollCacheState::Disabled || (dx != 0.0 && dy != 0.0) {
            self.content_valid = false;
            return;
        }
        self.last_x_delta += dx;
        self.last_y_delta += dy;
    }

    /// Decides whether the raster must be regenerated before drawing under
    /// `render_xform`.
    ///
    /// `info` is the decomposition of `render_xform`, `pixel_scale` the
    /// device pixel scale, and `scroll_capable` whether the node meets the
    /// scroll preconditions
    /// ([`scroll_cache_capable`](SceneStore::scroll_cache_capable)).
    pub fn need_to_render_cache(
        &mut self,
        render_xform: &Affine,
        info: &XformInfo,
        pixel_scale: (f64, f64),
        scroll_capable: bool,
    ) -> bool {
        let Some(raster) = self.raster else {
            return true;
        };
        if !self.content_valid {
            return true;
        }

        if self.last_x_delta != 0.0 || self.last_y_delta != 0.0 {
            if self.pixel_delta(&raster).is_none() {
                self.last_x_delta = 0.0;
                self.last_y_delta = 0.0;
                return true;
            }
            if self.scroll_state == ScrollCacheState::CheckingPreconditions {
                if scroll_capable {
                    self.scroll_state = ScrollCacheState::Enabled;
                } else {
                    self.scroll_state = ScrollCacheState::Disabled;
                    return true;
                }
            }
        }

        let [a, b, c, d, _, _] = render_xform.as_coeffs();
        let [ca, cb, cc, cd, _, _] = self.cached_xform.as_coeffs();
        if a == ca && b == cb && c == cc && d == cd {
            return false;
        }

        if self.was_unsupported || info.is_unsupported() {
            return true;
        }

        let cached = self.cached_info;
        match (self.hint.scale_hint(), self.hint.rotate_hint()) {
            (true, rotate) => {
                if cached.scale_x < pixel_scale.0 || cached.scale_y.abs() < pixel_scale.1 {
                    return true;
                }
                !rotate && (cached.rotate - info.rotate).abs() > EPS
            }
            (false, true) => cached.scale_x != info.scale_x || cached.scale_y != info.scale_y,
            (false, false) => true,
        }
    }

    /// Records the transform a regeneration renders with, and returns it.
    ///
    /// With a scale hint the raster is rendered at no less than the device
    /// pixel scale, so later enlargement up to that scale stays sharp. A
    /// transform [`unmatrix`](fn@super::unmatrix) cannot split is cached as is,
    /// and the next change of its linear part regenerates.
    pub fn prepare_regeneration(
        &mut self,
        render_xform: &Affine,
        info: &XformInfo,
        pixel_scale: (f64, f64),
    ) -> Affine {
        self.was_unsupported = info.is_unsupported();
        if self.hint.scale_hint() && !self.was_unsupported {
            let scale_x = info.scale_x.max(pixel_scale.0);
            let scale_y = info.scale_y.abs().max(pixel_scale.1).copysign(info.scale_y);
            self.cached_info = XformInfo {
                scale_x,
                scale_y,
                rotate: info.rotate,
            };
            self.cached_xform =
                Affine::scale_non_uniform(scale_x, scale_y) * Affine::rotate(info.rotate);
        } else {
            self.cached_info = *info;
            let [a, b, c, d, _, _] = render_xform.as_coeffs();
            self.cached_xform = Affine::new([a, b, c, d, 0.0, 0.0]);
        }
        self.cached_xform
    }

    /// Installs a freshly rendered raster and returns the one it replaces.
    pub fn install_raster(&mut self, raster: CachedRaster) -> Option<CachedRaster> {
        self.content_valid = true;
        self.last_x_delta = 0.0;
        self.last_y_delta = 0.0;
        self.raster.replace(raster)
    }

    /// Removes the raster, leaving the filter to regenerate.
    pub fn take_raster(&mut self) -> Option<CachedRaster> {
        self.content_valid = false;
        self.raster.take()
    }

    /// Returns the scratch raster used for shifting, if one was allocated.
    #[must_use]
    pub fn scratch(&self) -> Option<RasterId> {
        self.scratch
    }

    /// Replaces the scratch raster and returns the old one.
    pub fn set_scratch(&mut self, scratch: Option<RasterId>) -> Option<RasterId> {
        core::mem::replace(&mut self.scratch, scratch)
    }

    /// Computes the difference between the cached and live transforms from
    /// the live decomposition.
    pub fn update_screen_xform(&mut self, info: &XformInfo) {
        if self.was_unsupported {
            // Reused only under the exact cached linear part.
            self.screen_xform = Affine::IDENTITY;
            return;
        }
        let cached = self.cached_info;
        let scale = if self.hint.scale_hint() {
            Affine::scale_non_uniform(info.scale_x / cached.scale_x, info.scale_y / cached.scale_y)
        } else {
            Affine::IDENTITY
        };
        let rotate = if self.hint.rotate_hint() {
            Affine::rotate(info.rotate - cached.rotate)
        } else {
            Affine::IDENTITY
        };
        self.screen_xform = scale * rotate;
    }

    /// Consumes the pending translation when scrolling is enabled, returning
    /// how to shift the raster.
    pub fn take_scroll(&mut self) -> Option<ScrollPlan> {
        if self.scroll_state != ScrollCacheState::Enabled {
            return None;
        }
        if self.last_x_delta == 0.0 && self.last_y_delta == 0.0 {
            return None;
        }
        let raster = self.raster?;
        let delta = self.pixel_delta(&raster);
        self.last_x_delta = 0.0;
        self.last_y_delta = 0.0;
        let delta = delta?;

        let (w, h) = (f64::from(raster.width), f64::from(raster.height));
        let keep_src = Rect::new(
            (-delta.x).max(0.0),
            (-delta.y).max(0.0),
            w - delta.x.max(0.0),
            h - delta.y.max(0.0),
        );
        let strip = if delta.x > 0.0 {
            Rect::new(0.0, 0.0, delta.x, h)
        } else if delta.x < 0.0 {
            Rect::new(w + delta.x, 0.0, w, h)
        } else if delta.y > 0.0 {
            Rect::new(0.0, 0.0, w, delta.y)
        } else {
            Rect::new(0.0, h + delta.y, w, h)
        };
        Some(ScrollPlan {
            delta,
            keep_src,
            keep_dst: keep_src + delta,
            strip,
        })
    }

    /// Releases everything, returning the rasters the backend must free.
    pub fn dispose(&mut self) -> Vec<RasterId> {
        self.content_valid = false;
        self.raster
            .take()
            .map(|r| r.id)
            .into_iter()
            .chain(self.scratch.take())
            .collect()
    }

    /// Maps the pending delta into raster pixels, or `None` when it cannot
    /// be applied by shifting pixels.
    fn pixel_delta(&self, raster: &CachedRaster) -> Option<Vec2> {
        let p = self.cached_xform * Point::new(self.last_x_delta, self.last_y_delta);
        let axis_aligned = p.x == 0.0 || p.y == 0.0;
        let integral = p.x.round() == p.x && p.y.round() == p.y;
        let fits = p.x.abs() < f64::from(raster.width) && p.y.abs() < f64::from(raster.height);
        (axis_aligned && integral && fits).then(|| p.to_vec2())
    }

    #[cfg(test)]
    pub(crate) fn attach_raster_for_test(&mut self, id: RasterId) {
        self.install_raster(CachedRaster {
            id,
            width: 100,
            height: 100,
            bounds: Rect::new(0.0, 0.0, 100.0, 100.0),
        });
    }
}

impl SceneStore {
    /// Can translations of `id`'s child scroll its cached raster?
    ///
    /// Requires a group with exactly one 2-D transformed child, clipped by a
    /// plain rectangle. A region must additionally paint nothing the scroll
    /// would smear: no border, no images, and at most one opaque fill that
    /// covers exactly the clip.
    #[must_use]
    pub fn scroll_cache_capable(&self, id: NodeId) -> bool {
        self.validate(id);
        let i = id.idx as usize;
        if !self.kind[i].is_group() {
            return false;
        }
        let child = self.first_child[i];
        if child == INVALID || self.next_sibling[child as usize] != INVALID {
            return false;
        }
        if !self.transform[child as usize].is_2d() {
            return false;
        }
        let clip = self.clip_node[i];
        if clip == INVALID || !self.is_rect_clip_slot(clip, &Transform3d::IDENTITY) {
            return false;
        }
        let NodeKind::Region(style) = &self.kind[i] else {
            return true;
        };
        if style.border.is_some() || style.has_images {
            return false;
        }
        match style.fills.as_slice() {
            [] => true,
            [fill] => {
                let clip_bounds = self.clipped_bounds_slot(clip, &self.transform[clip as usize]);
                fill.color.is_opaque()
                    && fill.insets.is_empty()
                    && clip_bounds == Some(Rect::new(0.0, 0.0, style.width, style.height))
            }
            _ => false,
        }
    }

    /// Dirty area of a cached node: its dirty (or transformed) bounds rounded
    /// out to whole pixels, then mapped by `tx` and `pv`.
    pub(crate) fn cache_dirty_bounds_slot(
        &self,
        idx: u32,
        tx: &Transform3d,
        pv: &Transform3d,
    ) -> Option<Rect> {
        let i = idx as usize;
        let bounds = geom::round_out(self.dirty_bounds[i].or(self.transformed_bounds[i])?);
        let bounds = tx.transform_rect(bounds);
        Some(if pv.is_identity() {
            bounds
        } else {
            pv.transform_rect(bounds)
        })
    }
}
