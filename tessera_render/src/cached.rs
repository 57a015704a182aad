// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Painting nodes cached as bitmaps.
//!
//! A cached node keeps its clip, effect and content in a raster rendered
//! under a *cached transform* (the live transform without translation, or a
//! scale-and-rotate approximation of it when the node's hint allows and the
//! transform decomposes cleanly). Each
//! paint either regenerates the raster, scrolls it by a whole-pixel delta
//! and repaints the exposed strip, or reuses it as is. The raster is then
//! drawn under the live translation and the difference between the live
//! and cached transforms.
//!
//! Anything the backend cannot do (3D transforms, rasters past the size
//! limit, failed allocations) falls back to painting the node directly.

use kurbo::Rect;
use tessera_core::backend::{Graphics, RasterId};
use tessera_core::cache::{CachedRaster, ScrollPlan, XformInfo, unmatrix};
use tessera_core::geom;
use tessera_core::node::NodeId;
use tessera_core::trace::CacheAction;
use tessera_core::transform::Transform3d;

use crate::paint::{Painter, raster_size};

impl Painter<'_> {
    pub(crate) fn render_cached(&mut self, g: &mut dyn Graphics, id: NodeId) {
        let xform = g.transform();
        if !xform.is_2d() {
            self.render_from_clip(g, id);
            self.record(id, CacheAction::Fallback);
            return;
        }
        let live = xform.to_affine();
        let info = unmatrix(&live);
        let pixel_scale = g.pixel_scale();
        let scroll_capable = self.store.scroll_cache_capable(id);

        let Some(filter) = self.store.cache_filter_mut(id) else {
            self.render_from_clip(g, id);
            return;
        };
        let mut locked = None;
        if let Some(raster) = filter.raster().copied() {
            if g.lock_raster(raster.id) {
                locked = Some(raster.id);
            } else {
                // The device dropped the pixels.
                filter.take_raster();
                g.release_raster(raster.id);
            }
        }

        let action = if filter.need_to_render_cache(&live, &info, pixel_scale, scroll_capable) {
            if let Some(raster) = locked.take() {
                g.unlock_raster(raster);
            }
            let Some(action) = self.regenerate(g, id, &info, pixel_scale) else {
                return;
            };
            if action == CacheAction::Fallback {
                self.record(id, action);
                return;
            }
            locked = self
                .store
                .cache_filter(id)
                .and_then(|f| f.raster())
                .map(|r| r.id)
                .filter(|&r| g.lock_raster(r));
            action
        } else if let Some(plan) = filter.take_scroll() {
            self.scroll(g, id, plan)
        } else {
            CacheAction::Reused
        };
        self.record(id, action);

        let Some(raster_id) = locked else {
            return;
        };
        let Some(filter) = self.store.cache_filter_mut(id) else {
            g.unlock_raster(raster_id);
            return;
        };
        filter.update_screen_xform(&info);
        let screen = Transform3d::from_affine(filter.screen_xform());
        if let Some(raster) = filter.raster().copied() {
            let [.., e, f] = live.as_coeffs();
            g.set_transform(Transform3d::from_translation(e, f, 0.0) * screen);
            g.draw_raster(raster.id, raster.pixel_rect(), raster.bounds);
            g.set_transform(xform);
        }
        g.unlock_raster(raster_id);
    }

    fn record(&mut self, id: NodeId, action: CacheAction) {
        self.stats.cache_actions.push((id, action));
    }

    /// Renders the node's content into a new raster under a fresh cached
    /// transform.
    ///
    /// Returns `None` when there is nothing to cache, and
    /// [`Fallback`](CacheAction::Fallback) after painting the node directly.
    fn regenerate(
        &mut self,
        g: &mut dyn Graphics,
        id: NodeId,
        info: &XformInfo,
        pixel_scale: (f64, f64),
    ) -> Option<CacheAction> {
        let live = g.transform().to_affine();
        let cached = self
            .store
            .cache_filter_mut(id)?
            .prepare_regeneration(&live, info, pixel_scale);
        let cache_tx = Transform3d::from_affine(cached);

        let bounds = self.store.clipped_bounds(id, &cache_tx).map(geom::round_out);
        let Some(bounds) = bounds.filter(|b| b.width() > 0.0 && b.height() > 0.0) else {
            self.drop_rasters(g, id);
            self.store.clear_dirty_tree(id);
            return None;
        };

        let Some(raster) = self.render_into_new_raster(g, id, bounds, cache_tx) else {
            self.drop_rasters(g, id);
            self.render_from_clip(g, id);
            return Some(CacheAction::Fallback);
        };
        let filter = self.store.cache_filter_mut(id)?;
        // The scratch raster must match the new size.
        let scratch = filter.set_scratch(None);
        let old = filter.install_raster(raster);
        for stale in old.map(|r| r.id).into_iter().chain(scratch) {
            g.release_raster(stale);
        }
        self.store.clear_dirty_tree(id);
        Some(CacheAction::Regenerated {
            width: raster.width,
            height: raster.height,
        })
    }

    fn render_into_new_raster(
        &mut self,
        g: &mut dyn Graphics,
        id: NodeId,
        bounds: Rect,
        cache_tx: Transform3d,
    ) -> Option<CachedRaster> {
        let (width, height) = raster_size(bounds, g.max_raster_size())?;
        let raster = g.allocate_raster(width, height)?;
        if !g.push_target(raster) {
            g.release_raster(raster);
            return None;
        }
        g.clear(None);
        g.set_transform(Transform3d::from_translation(-bounds.x0, -bounds.y0, 0.0) * cache_tx);
        self.render_detached(g, |p, g| p.render_from_clip(g, id));
        g.pop_target();
        Some(CachedRaster {
            id: raster,
            width,
            height,
            bounds,
        })
    }

    /// Shifts the raster by `plan` and repaints the strip it exposes.
    fn scroll(&mut self, g: &mut dyn Graphics, id: NodeId, plan: ScrollPlan) -> CacheAction {
        let Some(filter) = self.store.cache_filter_mut(id) else {
            return CacheAction::Fallback;
        };
        let Some(raster) = filter.raster().copied() else {
            return CacheAction::Fallback;
        };
        let scratch = match filter.scratch() {
            Some(s) => Some(s),
            None => g.allocate_raster(raster.width, raster.height).map(|s| {
                filter.set_scratch(Some(s));
                s
            }),
        };
        let cached = filter.cached_xform();

        if !scratch.is_some_and(|s| copy_shifted(g, raster.id, s, &plan)) {
            // Without a scratch raster the whole content is repainted in
            // place.
            self.repaint_area(g, id, &raster, cached, raster.pixel_rect());
            return CacheAction::Regenerated {
                width: raster.width,
                height: raster.height,
            };
        }
        self.repaint_area(g, id, &raster, cached, plan.strip);
        #[expect(
            clippy::cast_possible_truncation,
            reason = "scroll deltas are whole pixels smaller than the raster"
        )]
        let (dx, dy) = (plan.delta.x as i32, plan.delta.y as i32);
        CacheAction::Scrolled { dx, dy }
    }

    /// Repaints `area` (raster pixels) of the node's raster.
    fn repaint_area(
        &mut self,
        g: &mut dyn Graphics,
        id: NodeId,
        raster: &CachedRaster,
        cached: kurbo::Affine,
        area: Rect,
    ) {
        if g.push_target(raster.id) {
            g.set_clip_rect(Some(area));
            g.clear(Some(area));
            g.set_transform(
                Transform3d::from_translation(-raster.bounds.x0, -raster.bounds.y0, 0.0)
                    * Transform3d::from_affine(cached),
            );
            self.render_detached(g, |p, g| p.render_from_clip(g, id));
            g.pop_target();
        }
        self.store.clear_dirty_tree(id);
    }

    fn drop_rasters(&mut self, g: &mut dyn Graphics, id: NodeId) {
        let Some(filter) = self.store.cache_filter_mut(id) else {
            return;
        };
        let raster = filter.take_raster().map(|r| r.id);
        let scratch = filter.set_scratch(None);
        for r in raster.into_iter().chain(scratch) {
            g.release_raster(r);
        }
    }
}

/// Copies the kept part of `raster` through `scratch` to its shifted
/// position. Returns `false` if either target could not be bound.
fn copy_shifted(g: &mut dyn Graphics, raster: RasterId, scratch: RasterId, plan: &ScrollPlan) -> bool {
    if !g.push_target(scratch) {
        return false;
    }
    g.clear(None);
    g.draw_raster(raster, plan.keep_src, plan.keep_src);
    g.pop_target();
    if !g.push_target(raster) {
        return false;
    }
    g.clear(None);
    g.draw_raster(scratch, plan.keep_src, plan.keep_dst);
    g.pop_target();
    true
}
