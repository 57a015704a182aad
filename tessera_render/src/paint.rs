// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint traversal.
//!
//! A [`Painter`] walks a subtree and issues [`Graphics`] calls. Each node
//! passes through a fixed chain of stages, and the first one that applies
//! handles the node and hands the rest of the chain on:
//!
//! ```text
//! blend -> opacity -> cache -> clip -> effect -> content
//! ```
//!
//! Stages that need intermediate pixels (non-`SourceOver` blending,
//! overlapping translucent groups, non-rectangular clips) render the rest of
//! the chain into an offscreen raster. If the backend cannot provide one the
//! node is skipped and its subtree marked clean.
//!
//! Painting a dirty region uses the culling bits computed by
//! [`SceneStore::pre_cull`] to skip untouched subtrees, and an optional
//! render-root [`NodePath`] to skip everything behind an opaque occluder.

use alloc::vec::Vec;

use kurbo::Rect;
use tessera_core::backend::{BlendMode, Graphics, GraphicsState, RasterId};
use tessera_core::geom;
use tessera_core::node::{NodeId, NodeKind, Outline, SceneStore};
use tessera_core::render_root::NodePath;
use tessera_core::trace::CacheAction;
use tessera_core::transform::Transform3d;

/// Counters gathered while painting.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PaintStats {
    /// Nodes that passed culling and ran their paint routine.
    pub nodes_painted: u32,
    /// Cache decisions, in paint order.
    pub cache_actions: Vec<(NodeId, CacheAction)>,
    /// Every node counted in `nodes_painted`, in paint order.
    #[cfg(feature = "trace-rich")]
    pub painted: Vec<NodeId>,
}

/// Paints nodes of a [`SceneStore`] into a [`Graphics`] backend.
#[derive(Debug)]
pub struct Painter<'a> {
    pub(crate) store: &'a mut SceneStore,
    region: Option<usize>,
    pub(crate) culling: bool,
    pub(crate) path: Option<&'a NodePath>,
    path_pos: usize,
    pub(crate) stats: PaintStats,
}

impl<'a> Painter<'a> {
    /// Creates a painter with no culling and no render root.
    pub fn new(store: &'a mut SceneStore) -> Self {
        Self {
            store,
            region: None,
            culling: false,
            path: None,
            path_pos: 0,
            stats: PaintStats::default(),
        }
    }

    /// Paints on behalf of dirty region `index`.
    ///
    /// With `culling` on, nodes whose culling bits do not touch the region
    /// are skipped. The index also selects the overdraw bits recorded when
    /// [`show_overdraw`](tessera_core::config::EngineConfig::show_overdraw)
    /// is set.
    #[must_use]
    pub fn with_region(mut self, index: usize, culling: bool) -> Self {
        self.region = Some(index);
        self.culling = culling;
        self
    }

    /// Starts painting at the end of `path` instead of the whole tree.
    ///
    /// `path` must begin at the node later passed to [`render`](Self::render).
    #[must_use]
    pub fn with_render_root(mut self, path: &'a NodePath) -> Self {
        self.path = (!path.is_empty()).then_some(path);
        self.path_pos = 0;
        self
    }

    /// Returns the counters gathered so far.
    #[must_use]
    pub fn stats(&self) -> &PaintStats {
        &self.stats
    }

    /// Consumes the painter, returning its counters.
    #[must_use]
    pub fn into_stats(self) -> PaintStats {
        self.stats
    }

    /// Paints `id` and its subtree, clearing their dirty state.
    pub fn render(&mut self, g: &mut dyn Graphics, id: NodeId) {
        self.store.clear_dirty(id);
        if !self.store.is_visible(id) || self.store.opacity(id) == 0.0 {
            return;
        }
        self.do_render(g, id);
    }

    fn do_render(&mut self, g: &mut dyn Graphics, id: NodeId) {
        let mut culling_suspended = false;
        if self.culling
            && let Some(i) = self.region
        {
            let bits = self.store.culling_bits(id);
            if !bits.touches(i) {
                return;
            }
            if bits.contained(i) {
                self.culling = false;
                culling_suspended = true;
            }
        }

        let saved = GraphicsState::save(g);
        g.set_depth_test(self.store.flags(id).depth_test);
        g.set_transform(saved.transform * self.store.transform(id));

        let painted = self.has_filters(id) || self.store.kind(id).has_visuals();
        if let Some(mode) = self.blend_offscreen(id) {
            self.render_blended(g, id, mode);
        } else {
            self.render_from_opacity(g, id);
        }

        saved.restore(g);
        if culling_suspended {
            self.culling = true;
        }
        self.stats.nodes_painted += 1;
        #[cfg(feature = "trace-rich")]
        self.stats.painted.push(id);
        if painted
            && self.store.config().show_overdraw
            && let Some(i) = self.region
        {
            self.store.mark_painted(id, i);
        }
    }

    fn has_filters(&self, id: NodeId) -> bool {
        self.store.blend_mode(id).is_some()
            || self.store.opacity(id) < 1.0
            || self.store.cache_filter(id).is_some()
            || self.store.clip_node(id).is_some()
            || self.store.effect(id).is_some()
    }

    /// Groups composite their children as one layer for any explicit blend
    /// mode; leaves only need help for modes other than `SourceOver`.
    fn blend_offscreen(&self, id: NodeId) -> Option<BlendMode> {
        match self.store.blend_mode(id)? {
            BlendMode::SourceOver if !self.store.kind(id).is_group() => None,
            mode => Some(mode),
        }
    }

    fn render_blended(&mut self, g: &mut dyn Graphics, id: NodeId, mode: BlendMode) {
        let Some(bounds) = self.device_bounds(g, id) else {
            self.store.clear_dirty_tree(id);
            return;
        };
        let Some(raster) = self.render_offscreen(g, bounds, |p, g| p.render_from_opacity(g, id))
        else {
            self.store.clear_dirty_tree(id);
            return;
        };
        let tx = g.transform();
        g.set_transform(Transform3d::IDENTITY);
        g.draw_blended(raster, mode, bounds);
        g.set_transform(tx);
        g.release_raster(raster);
    }

    fn render_from_opacity(&mut self, g: &mut dyn Graphics, id: NodeId) {
        if self.store.opacity(id) < 1.0 {
            self.render_opacity(g, id);
        } else {
            self.render_from_cache(g, id);
        }
    }

    fn render_opacity(&mut self, g: &mut dyn Graphics, id: NodeId) {
        let opacity = self.store.opacity(id);
        let alpha = g.extra_alpha();
        let layered = self.store.effect(id).is_some()
            || self.store.cache_filter(id).is_some()
            || self.store.clip_node(id).is_some();
        if layered || !self.has_overlapping_contents(id) {
            g.set_extra_alpha(alpha * opacity);
            self.render_from_cache(g, id);
            g.set_extra_alpha(alpha);
            return;
        }

        // Overlapping children must be flattened first or they would show
        // through each other.
        let Some(bounds) = self.device_bounds(g, id) else {
            self.store.clear_dirty_tree(id);
            return;
        };
        let Some(raster) = self.render_offscreen(g, bounds, |p, g| p.render_from_cache(g, id))
        else {
            self.store.clear_dirty_tree(id);
            return;
        };
        let tx = g.transform();
        g.set_transform(Transform3d::IDENTITY);
        g.set_extra_alpha(alpha * opacity);
        g.draw_raster(raster, pixel_rect(bounds), bounds);
        g.set_extra_alpha(alpha);
        g.set_transform(tx);
        g.release_raster(raster);
    }

    fn has_overlapping_contents(&self, id: NodeId) -> bool {
        match self.store.kind(id) {
            NodeKind::Group => self.store.children(id).nth(1).is_some(),
            kind @ NodeKind::Region(_) => {
                let kids = self.store.children(id).take(2).count();
                kids + usize::from(kind.has_visuals()) > 1
            }
            NodeKind::Rect(_) => false,
            NodeKind::Content(c) => c.has_overlapping_contents(),
        }
    }

    pub(crate) fn render_from_cache(&mut self, g: &mut dyn Graphics, id: NodeId) {
        if self.store.cache_filter(id).is_some() {
            self.render_cached(g, id);
        } else {
            self.render_from_clip(g, id);
        }
    }

    pub(crate) fn render_from_clip(&mut self, g: &mut dyn Graphics, id: NodeId) {
        match self.store.clip_node(id) {
            Some(clip) => self.render_clip(g, id, clip),
            None => self.render_from_effect(g, id),
        }
    }

    fn render_clip(&mut self, g: &mut dyn Graphics, id: NodeId, clip: NodeId) {
        if self.store.opacity(clip) == 0.0 || !self.store.is_visible(clip) {
            self.store.clear_dirty_tree(id);
            return;
        }
        let tx = g.transform();

        if self.store.is_rect_clip(clip, &tx)
            && let NodeKind::Rect(shape) = self.store.kind(clip)
            && let Outline::Rect(local) = shape.outline
        {
            let device = (tx * self.store.transform(clip)).transform_rect(local);
            let old = g.clip_rect();
            let clipped = match old {
                Some(old) => geom::intersect(old, device),
                None => Some(device),
            };
            let Some(clipped) = clipped else {
                self.store.clear_dirty_tree(id);
                return;
            };
            g.set_clip_rect(Some(clipped));
            self.render_from_effect(g, id);
            g.set_clip_rect(old);
            return;
        }

        let Some(bounds) = self.device_bounds(g, id) else {
            self.store.clear_dirty_tree(id);
            return;
        };
        let content = self.render_offscreen(g, bounds, |p, g| p.render_from_effect(g, id));
        let mask = content.and_then(|_| self.render_offscreen(g, bounds, |p, g| p.render(g, clip)));
        match (content, mask) {
            (Some(content), Some(mask)) => {
                g.set_transform(Transform3d::IDENTITY);
                g.draw_masked(content, mask, bounds);
                g.set_transform(tx);
                g.release_raster(content);
                g.release_raster(mask);
            }
            (content, _) => {
                if let Some(content) = content {
                    g.release_raster(content);
                }
                self.store.clear_dirty_tree(id);
            }
        }
    }

    fn render_from_effect(&mut self, g: &mut dyn Graphics, id: NodeId) {
        match self.store.effect(id).cloned() {
            Some(effect) => {
                effect.render(g, &mut |g: &mut dyn Graphics| self.render_content(g, id));
            }
            None => self.render_content(g, id),
        }
    }

    fn render_content(&mut self, g: &mut dyn Graphics, id: NodeId) {
        match self.store.kind(id) {
            NodeKind::Group => {}
            NodeKind::Region(style) => {
                // A render root below this region hides its background.
                if !self.path_continues_below(id) {
                    for fill in &style.fills {
                        g.fill_rect(fill.insets.apply(style.width, style.height), fill.color);
                    }
                    if let Some(border) = style.border {
                        let half = border.width / 2.0;
                        let rect = Rect::new(half, half, style.width - half, style.height - half);
                        g.stroke_rect(rect, border.width, border.color);
                    }
                }
            }
            NodeKind::Rect(shape) => match shape.outline {
                Outline::Rect(r) => g.fill_rect(r, shape.fill),
                Outline::RoundedRect(r) => g.fill_rounded_rect(r, shape.fill),
            },
            NodeKind::Content(c) => c.render_content(g),
        }
        if self.store.kind(id).is_group() {
            self.render_children(g, id);
        }
    }

    fn path_continues_below(&self, id: NodeId) -> bool {
        self.path
            .is_some_and(|p| p.get(self.path_pos) == Some(id) && self.path_pos + 1 < p.len())
    }

    fn render_children(&mut self, g: &mut dyn Graphics, id: NodeId) {
        let children = self.store.ordered_children(id);
        let mut start = 0;
        if let Some(path) = self.path {
            if self.path_pos + 1 < path.len() {
                self.path_pos += 1;
                if let Some(next) = path.get(self.path_pos) {
                    start = children.iter().position(|&c| c == next).unwrap_or(0);
                }
                // Everything behind the render root is hidden by it.
                for &hidden in &children[..start] {
                    self.store.clear_dirty_tree(hidden);
                }
            } else {
                self.path = None;
            }
        }
        for &child in &children[start..] {
            self.render(g, child);
        }
    }

    /// Runs `f` with culling and the render-root path switched off.
    pub(crate) fn render_detached(
        &mut self,
        g: &mut dyn Graphics,
        f: impl FnOnce(&mut Self, &mut dyn Graphics),
    ) {
        let culling = core::mem::replace(&mut self.culling, false);
        let path = self.path.take();
        f(self, g);
        self.culling = culling;
        self.path = path;
    }

    /// Renders `f` into a fresh raster covering device-space `bounds`,
    /// keeping the current transform.
    fn render_offscreen(
        &mut self,
        g: &mut dyn Graphics,
        bounds: Rect,
        f: impl FnOnce(&mut Self, &mut dyn Graphics),
    ) -> Option<RasterId> {
        let (width, height) = raster_size(bounds, g.max_raster_size())?;
        let raster = g.allocate_raster(width, height)?;
        let tx = g.transform();
        if !g.push_target(raster) {
            g.release_raster(raster);
            return None;
        }
        g.set_transform(Transform3d::from_translation(-bounds.x0, -bounds.y0, 0.0) * tx);
        g.clear(None);
        self.render_detached(g, f);
        g.pop_target();
        Some(raster)
    }

    /// Device-space pixel bounds of `id` under the current transform and
    /// clip.
    fn device_bounds(&self, g: &dyn Graphics, id: NodeId) -> Option<Rect> {
        let bounds = self.store.clipped_bounds(id, &g.transform())?;
        let bounds = match g.clip_rect() {
            Some(clip) => geom::intersect(bounds, clip)?,
            None => bounds,
        };
        let bounds = geom::round_out(bounds);
        (bounds.width() > 0.0 && bounds.height() > 0.0).then_some(bounds)
    }
}

/// The whole of a raster covering `bounds`, in raster pixels.
pub(crate) fn pixel_rect(bounds: Rect) -> Rect {
    Rect::new(0.0, 0.0, bounds.width(), bounds.height())
}

/// Pixel size of a raster covering whole-pixel `bounds`, or `None` when it
/// is empty or exceeds `max` on either edge.
#[expect(
    clippy::cast_possible_truncation,
    reason = "bounds are rounded out and checked against the device limit first"
)]
pub(crate) fn raster_size(bounds: Rect, max: u32) -> Option<(u32, u32)> {
    let (w, h) = (bounds.width(), bounds.height());
    let max = f64::from(max);
    if !(w > 0.0 && h > 0.0) || w > max || h > max {
        return None;
    }
    Some((w as u32, h as u32))
}
