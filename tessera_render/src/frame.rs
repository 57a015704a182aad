// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-frame pipeline.
//!
//! [`FrameRenderer::render_frame`] turns the dirty state of a scene into
//! backend calls:
//!
//! 1. release rasters dropped by cache filters since the last frame;
//! 2. accumulate dirty regions (or take the whole viewport);
//! 3. pre-cull every node against the regions;
//! 4. find a render root for each region, all before anything is painted,
//!    since painting cleans the nodes the search looks at;
//! 5. paint each region that still needs it, clipped to the region;
//! 6. mark the whole tree clean.

use alloc::vec::Vec;

use kurbo::Rect;
use tessera_core::accumulate::AccumulateStatus;
use tessera_core::backend::{Graphics, GraphicsState};
use tessera_core::node::{NodeId, SceneStore};
use tessera_core::region::{DirtyRegionContainer, DirtyRegionPool};
use tessera_core::render_root::{NodePath, RenderRootResult};
use tessera_core::trace::{
    CacheEvent, DirtyRegionsEvent, FrameSummary, FrameSummaryBuilder, PhaseBeginEvent,
    PhaseEndEvent, PhaseKind, RenderRootEvent, Tracer,
};
use tessera_core::transform::Transform3d;

use crate::damage::DamageRegion;
use crate::paint::Painter;

/// What one call to [`FrameRenderer::render_frame`] did.
#[derive(Clone, Debug, PartialEq)]
pub struct FrameReport {
    /// Monotonic frame counter, starting at 0.
    pub frame_index: u64,
    /// The repainted area.
    pub damage: DamageRegion,
    /// Render-root outcome per dirty region, in region order.
    pub render_roots: Vec<RenderRootResult>,
    /// Frame counters.
    pub summary: FrameSummary,
}

/// Drives frames for one scene, reusing its region buffers between frames.
#[derive(Debug)]
pub struct FrameRenderer {
    pool: DirtyRegionPool,
    regions: DirtyRegionContainer,
    paths: Vec<NodePath>,
    frame_index: u64,
}

impl Default for FrameRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameRenderer {
    /// Creates a renderer. Buffers are sized from the store's config on the
    /// first frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pool: DirtyRegionPool::new(1),
            regions: DirtyRegionContainer::new(1),
            paths: Vec::new(),
            frame_index: 0,
        }
    }

    /// Index the next frame will get.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Dirty regions of the last frame that had any.
    #[must_use]
    pub fn regions(&self) -> &DirtyRegionContainer {
        &self.regions
    }

    /// Render-root path computed for region `i` of the last frame.
    #[must_use]
    pub fn path(&self, i: usize) -> Option<&NodePath> {
        self.paths.get(i)
    }

    /// Renders one frame of the tree under `root` into `g`.
    ///
    /// `viewport` is the visible scene-space area; nothing outside it is
    /// repainted.
    pub fn render_frame(
        &mut self,
        store: &mut SceneStore,
        root: NodeId,
        g: &mut dyn Graphics,
        viewport: Rect,
        tracer: &mut Tracer<'_>,
    ) -> FrameReport {
        let frame_index = self.frame_index;
        self.frame_index += 1;
        let mut summary = FrameSummaryBuilder::new(frame_index);

        for raster in store.take_released_rasters() {
            g.release_raster(raster);
        }

        if store.is_clean(root) {
            return finish(frame_index, DamageRegion::None, Vec::new(), summary, tracer);
        }

        let config = *store.config();
        let capacity = config.region_capacity();
        if self.regions.capacity() != capacity {
            self.pool = DirtyRegionPool::new(capacity);
        }
        self.regions.reset(capacity);

        // Accumulate.
        phase_begin(tracer, frame_index, PhaseKind::Accumulate);
        let full = !config.dirty_opts_enabled
            || store.accumulate_dirty_regions(
                root,
                viewport,
                &mut self.pool,
                &mut self.regions,
                &Transform3d::IDENTITY,
                &Transform3d::IDENTITY,
            ) == AccumulateStatus::ContainsClip;
        if full {
            self.regions.clear();
            self.regions.add_dirty_region(viewport);
        }
        phase_end(tracer, frame_index, PhaseKind::Accumulate);

        #[expect(
            clippy::cast_possible_truncation,
            reason = "region count is capped far below u32::MAX"
        )]
        let region_count = self.regions.len() as u32;
        summary.set_regions(region_count, full);
        tracer.dirty_regions(&DirtyRegionsEvent {
            frame_index,
            region_count,
            full_repaint: full,
        });
        #[cfg(feature = "trace-rich")]
        tracer.dirty_rects(frame_index, self.regions.regions());

        if self.regions.is_empty() {
            store.clear_dirty_tree(root);
            return finish(frame_index, DamageRegion::None, Vec::new(), summary, tracer);
        }

        if config.show_overdraw {
            store.clear_painted();
        }

        // Cull.
        phase_begin(tracer, frame_index, PhaseKind::Cull);
        store.pre_cull(
            root,
            &self.regions,
            &Transform3d::IDENTITY,
            &Transform3d::IDENTITY,
        );
        phase_end(tracer, frame_index, PhaseKind::Cull);

        // Render roots, for every region before any is painted.
        phase_begin(tracer, frame_index, PhaseKind::RenderRoot);
        let count = self.regions.len();
        self.paths.resize_with(count, NodePath::new);
        let mut render_roots = Vec::with_capacity(count);
        for (i, path) in self.paths.iter_mut().enumerate() {
            path.clear();
            let result = if config.occlusion_culling {
                store.render_root(
                    root,
                    path,
                    self.regions.region(i),
                    Some(i),
                    &Transform3d::IDENTITY,
                    &Transform3d::IDENTITY,
                )
            } else {
                RenderRootResult::NoRenderRoot
            };
            summary.record_render_root(result);
            #[expect(
                clippy::cast_possible_truncation,
                reason = "region indices and tree depths fit in u32"
            )]
            let (region_index, depth) = (i as u32, path.len().saturating_sub(1) as u32);
            tracer.render_root(&RenderRootEvent {
                frame_index,
                region_index,
                result,
                node_index: path.render_root().map(NodeId::index),
                depth,
            });
            render_roots.push(result);
        }
        phase_end(tracer, frame_index, PhaseKind::RenderRoot);

        // Paint.
        phase_begin(tracer, frame_index, PhaseKind::Paint);
        let mut painted = Vec::new();
        for (i, &result) in render_roots.iter().enumerate() {
            if result == RenderRootResult::HasRenderRootAndIsClean {
                continue;
            }
            let region = self.regions.region(i);
            let path = &self.paths[i];
            let saved = GraphicsState::save(g);
            g.set_clip_rect(Some(region));
            // Below a render root every pixel gets covered anyway.
            if path.len() <= 1 {
                g.clear(Some(region));
            }
            let mut painter = Painter::new(store)
                .with_region(i, true)
                .with_render_root(path);
            painter.render(g, root);
            let stats = painter.into_stats();
            saved.restore(g);

            summary.add_nodes_painted(stats.nodes_painted);
            for (node, action) in stats.cache_actions {
                summary.record_cache(action);
                tracer.cache(&CacheEvent {
                    frame_index,
                    node_index: node.index(),
                    action,
                });
            }
            #[cfg(feature = "trace-rich")]
            for node in stats.painted {
                tracer.node_painted(frame_index, node.index());
            }
            painted.push(region);
        }
        phase_end(tracer, frame_index, PhaseKind::Paint);

        store.clear_dirty_tree(root);

        let damage = if painted.is_empty() {
            DamageRegion::None
        } else if full {
            DamageRegion::Full
        } else {
            DamageRegion::Rects(painted)
        };
        finish(frame_index, damage, render_roots, summary, tracer)
    }
}

fn finish(
    frame_index: u64,
    damage: DamageRegion,
    render_roots: Vec<RenderRootResult>,
    summary: FrameSummaryBuilder,
    tracer: &mut Tracer<'_>,
) -> FrameReport {
    let summary = summary.finish();
    tracer.frame_summary(&summary);
    FrameReport {
        frame_index,
        damage,
        render_roots,
        summary,
    }
}

fn phase_begin(tracer: &mut Tracer<'_>, frame_index: u64, phase: PhaseKind) {
    tracer.phase_begin(&PhaseBeginEvent { frame_index, phase });
}

fn phase_end(tracer: &mut Tracer<'_>, frame_index: u64, phase: PhaseKind) {
    tracer.phase_end(&PhaseEndEvent { frame_index, phase });
}
