// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Occlusion: finding the node painting can start from.
//!
//! For one dirty region, the search walks the tree front to back looking
//! for the deepest node whose opaque region covers the whole region.
//! Everything painted before that node is hidden by it, so painting can
//! start there. If that node and everything in front of it are clean, the
//! region needs no painting at all.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::backend::BlendMode;
use crate::config::MAX_DIRTY_REGIONS;
use crate::geom;
use crate::node::{INVALID, NodeId, SceneStore};
use crate::transform::Transform3d;

/// Outcome of a render-root search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RenderRootResult {
    /// No opaque node covers the region; paint from the tree root.
    NoRenderRoot,
    /// A dirty node (or a node with dirty content in front of it) covers the
    /// region; paint from it.
    HasRenderRoot,
    /// A clean node covers the region and nothing in front of it is dirty;
    /// nothing needs painting.
    HasRenderRootAndIsClean,
}

/// The chain of nodes from the tree root down to a render root.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NodePath {
    nodes: Vec<NodeId>,
}

impl NodePath {
    /// Creates an empty path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Is the path empty (nothing to paint)?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Number of nodes on the path.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns the node at `depth` (0 is the tree root).
    #[must_use]
    pub fn get(&self, depth: usize) -> Option<NodeId> {
        self.nodes.get(depth).copied()
    }

    /// Returns the nodes, tree root first.
    #[must_use]
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Returns the render root (the deepest node), if any.
    #[must_use]
    pub fn render_root(&self) -> Option<NodeId> {
        self.nodes.last().copied()
    }

    /// Removes every node.
    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    fn push(&mut self, id: NodeId) {
        self.nodes.push(id);
    }
}

/// Returns whether `quad`, mapped through `tx` and then `pv`, contains
/// `inner`.
///
/// Transforms that keep rectangles axis-aligned take a bounds-containment
/// fast path; anything else tests all four corners of `inner` against the
/// mapped convex quad.
#[must_use]
pub fn check_bounds_in_quad(quad: Rect, inner: Rect, tx: &Transform3d, pv: &Transform3d) -> bool {
    if pv.is_identity() && tx.is_axis_aligned() {
        let mapped = if tx.is_identity() {
            quad
        } else {
            tx.transform_rect(quad)
        };
        return geom::contains(mapped, inner);
    }
    let mut corners = tx.transform_corners(quad);
    if !pv.is_identity() {
        for c in &mut corners {
            *c = pv.transform_point(*c);
        }
    }
    geom::rect_in_convex_quad(inner, &corners)
}

impl SceneStore {
    /// Searches the tree under `root` for the render root of `dirty_region`
    /// and fills `path` accordingly.
    ///
    /// - [`NoRenderRoot`](RenderRootResult::NoRenderRoot): `path` is `[root]`.
    /// - [`HasRenderRoot`](RenderRootResult::HasRenderRoot): `path` runs from
    ///   `root` to the render root.
    /// - [`HasRenderRootAndIsClean`](RenderRootResult::HasRenderRootAndIsClean):
    ///   `path` is empty.
    ///
    /// `culling_index` selects the pre-culling bits to consult; `None`
    /// ignores them.
    ///
    /// # Panics
    ///
    /// Panics if `culling_index` is not below [`MAX_DIRTY_REGIONS`].
    pub fn render_root(
        &mut self,
        root: NodeId,
        path: &mut NodePath,
        dirty_region: Rect,
        culling_index: Option<usize>,
        tx: &Transform3d,
        pv: &Transform3d,
    ) -> RenderRootResult {
        self.validate(root);
        if let Some(ci) = culling_index {
            assert!(
                ci < MAX_DIRTY_REGIONS,
                "culling index {ci} out of range (max {MAX_DIRTY_REGIONS})"
            );
        }
        path.clear();
        let result = self.compute_render_root(root.idx, path, dirty_region, culling_index, tx, pv);
        match result {
            RenderRootResult::NoRenderRoot => {
                path.clear();
                path.push(root);
            }
            RenderRootResult::HasRenderRoot => path.nodes.reverse(),
            RenderRootResult::HasRenderRootAndIsClean => path.clear(),
        }
        result
    }

    fn compute_render_root(
        &mut self,
        idx: u32,
        path: &mut NodePath,
        region: Rect,
        culling_index: Option<usize>,
        tx: &Transform3d,
        pv: &Transform3d,
    ) -> RenderRootResult {
        if !self.kind[idx as usize].is_group() {
            return self.compute_node_render_root(idx, path, region, culling_index, tx, pv);
        }
        let result = self.compute_group_render_root(idx, path, region, culling_index, tx, pv);
        if result == RenderRootResult::NoRenderRoot && self.kind[idx as usize].has_visuals() {
            // A region draws its own background behind its children.
            return self.compute_node_render_root(idx, path, region, culling_index, tx, pv);
        }
        result
    }

    fn compute_group_render_root(
        &mut self,
        idx: u32,
        path: &mut NodePath,
        region: Rect,
        mut culling_index: Option<usize>,
        tx: &Transform3d,
        pv: &Transform3d,
    ) -> RenderRootResult {
        let i = idx as usize;
        if let Some(ci) = culling_index {
            let bits = self.culling_bits[i];
            if !bits.touches(ci) {
                return RenderRootResult::NoRenderRoot;
            }
            if bits.contained(ci) {
                culling_index = None;
            }
        }
        if !self.flags[i].visible {
            return RenderRootResult::NoRenderRoot;
        }
        let reduces = self.effect[i]
            .as_ref()
            .is_some_and(|e| e.reduces_opaque_pixels());
        let blends = !matches!(self.blend_mode[i], None | Some(BlendMode::SourceOver));
        if self.opacity[i] != 1.0 || reduces || blends || self.cache_filter[i].is_some() {
            return RenderRootResult::NoRenderRoot;
        }

        let own = self.transform[i];
        let clip = self.clip_node[i];
        if clip != INVALID {
            let Some(clip_region) = self.opaque_region_slot(clip) else {
                return RenderRootResult::NoRenderRoot;
            };
            let clip_tx = *tx * own * self.transform[clip as usize];
            if !check_bounds_in_quad(clip_region, region, &clip_tx, pv) {
                return RenderRootResult::NoRenderRoot;
            }
        }

        let child_tx = *tx * own;
        let id = self.id_at(idx);
        let children = self.ordered_children(id);
        let mut result = RenderRootResult::NoRenderRoot;
        let mut following_clean = true;
        for &child in children.iter().rev() {
            result =
                self.compute_render_root(child.idx, path, region, culling_index, &child_tx, pv);
            following_clean &= self.is_clean_slot(child.idx);
            match result {
                RenderRootResult::NoRenderRoot => {}
                RenderRootResult::HasRenderRoot => {
                    path.push(id);
                    break;
                }
                RenderRootResult::HasRenderRootAndIsClean => {
                    path.push(id);
                    if !following_clean {
                        result = RenderRootResult::HasRenderRoot;
                    }
                    break;
                }
            }
        }
        result
    }

    fn compute_node_render_root(
        &mut self,
        idx: u32,
        path: &mut NodePath,
        region: Rect,
        culling_index: Option<usize>,
        tx: &Transform3d,
        pv: &Transform3d,
    ) -> RenderRootResult {
        let i = idx as usize;
        if let Some(ci) = culling_index {
            if !self.culling_bits[i].touches(ci) {
                return RenderRootResult::NoRenderRoot;
            }
        }
        if !self.flags[i].visible {
            return RenderRootResult::NoRenderRoot;
        }
        let Some(opaque) = self.opaque_region_slot(idx) else {
            return RenderRootResult::NoRenderRoot;
        };
        let local_tx = *tx * self.transform[i];
        if !check_bounds_in_quad(opaque, region, &local_tx, pv) {
            return RenderRootResult::NoRenderRoot;
        }
        path.push(self.id_at(idx));
        if self.is_clean_slot(idx) {
            RenderRootResult::HasRenderRootAndIsClean
        } else {
            RenderRootResult::HasRenderRoot
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::backend::Color;
    use crate::node::{Insets, Outline, RectShape, RegionStyle};
    use crate::region::DirtyRegionContainer;

    fn rect(store: &mut SceneStore, r: Rect) -> NodeId {
        store.create_rect(RectShape {
            outline: Outline::Rect(r),
            fill: Color::WHITE,
        })
    }

    fn search(store: &mut SceneStore, root: NodeId, region: Rect) -> (RenderRootResult, NodePath) {
        let mut path = NodePath::new();
        let result = store.render_root(
            root,
            &mut path,
            region,
            None,
            &Transform3d::IDENTITY,
            &Transform3d::IDENTITY,
        );
        (result, path)
    }

    #[test]
    fn exact_cover_is_render_root() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let back = rect(&mut store, Rect::new(0.0, 0.0, 200.0, 200.0));
        let cover = rect(&mut store, Rect::new(10.0, 10.0, 60.0, 60.0));
        store.add_child(root, back, None);
        store.add_child(root, cover, None);
        store.update_bounds(root);

        let (result, path) = search(&mut store, root, Rect::new(10.0, 10.0, 60.0, 60.0));
        assert_eq!(result, RenderRootResult::HasRenderRoot);
        assert_eq!(path.nodes(), &[root, cover]);
        assert_eq!(path.render_root(), Some(cover));
    }

    #[test]
    fn deeper_descendants_are_not_visited_once_found() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let cover = rect(&mut store, Rect::new(0.0, 0.0, 50.0, 50.0));
        let g = store.create_group();
        // Behind `cover`; would also qualify.
        let hidden = rect(&mut store, Rect::new(0.0, 0.0, 50.0, 50.0));
        store.add_child(g, hidden, None);
        store.add_child(root, g, None);
        store.add_child(root, cover, None);
        store.update_bounds(root);

        let (_, path) = search(&mut store, root, Rect::new(0.0, 0.0, 50.0, 50.0));
        assert_eq!(path.nodes(), &[root, cover]);
    }

    #[test]
    fn clean_cover_means_nothing_to_paint() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let back = rect(&mut store, Rect::new(0.0, 0.0, 200.0, 200.0));
        let cover = rect(&mut store, Rect::new(0.0, 0.0, 100.0, 100.0));
        store.add_child(root, back, None);
        store.add_child(root, cover, None);
        store.update_bounds(root);
        store.clear_dirty_tree(root);
        // Something behind the cover changed.
        store.set_rect_shape(
            back,
            RectShape {
                outline: Outline::Rect(Rect::new(0.0, 0.0, 200.0, 200.0)),
                fill: Color::BLACK,
            },
        );

        let (result, path) = search(&mut store, root, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(result, RenderRootResult::HasRenderRootAndIsClean);
        assert!(path.is_empty());
    }

    #[test]
    fn dirty_node_in_front_keeps_painting() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let cover = rect(&mut store, Rect::new(0.0, 0.0, 100.0, 100.0));
        let small = store.create_rect(RectShape {
            outline: Outline::Rect(Rect::new(10.0, 10.0, 20.0, 20.0)),
            fill: Color::rgba(0.0, 0.0, 1.0, 0.5),
        });
        store.add_child(root, cover, None);
        store.add_child(root, small, None);
        store.update_bounds(root);
        store.clear_dirty_tree(root);
        store.mark_dirty(small);

        let (result, path) = search(&mut store, root, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(result, RenderRootResult::HasRenderRoot);
        assert_eq!(path.nodes(), &[root, cover]);
    }

    #[test]
    fn nothing_opaque_paints_from_root() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let r = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        store.add_child(root, r, None);
        store.update_bounds(root);
        let (result, path) = search(&mut store, root, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(result, RenderRootResult::NoRenderRoot);
        assert_eq!(path.nodes(), &[root]);
    }

    #[test]
    fn translucent_group_hides_roots() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let g = store.create_group();
        let r = rect(&mut store, Rect::new(0.0, 0.0, 100.0, 100.0));
        store.add_child(g, r, None);
        store.add_child(root, g, None);
        store.set_opacity(g, 0.5);
        let (result, _) = search(&mut store, root, Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(result, RenderRootResult::NoRenderRoot);
    }

    #[test]
    fn region_background_is_searched_after_children() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let region = store.create_region(RegionStyle {
            width: 100.0,
            height: 100.0,
            fills: vec![crate::node::BackgroundFill {
                color: Color::WHITE,
                insets: Insets::EMPTY,
            }],
            opaque_insets: Some(Insets::EMPTY),
            ..RegionStyle::default()
        });
        store.add_child(root, region, None);
        let (result, path) = search(&mut store, root, Rect::new(0.0, 0.0, 100.0, 100.0));
        assert_eq!(result, RenderRootResult::HasRenderRoot);
        assert_eq!(path.nodes(), &[root, region]);
    }

    #[test]
    fn rotated_cover_uses_quad_test() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let r = rect(&mut store, Rect::new(-100.0, -100.0, 100.0, 100.0));
        store.add_child(root, r, None);
        store.set_transform(r, Transform3d::from_rotation_z(core::f64::consts::FRAC_PI_4));
        store.update_bounds(root);

        let (inside, _) = search(&mut store, root, Rect::new(-10.0, -10.0, 10.0, 10.0));
        assert_eq!(inside, RenderRootResult::HasRenderRoot);
        // Corners of this square poke out of the rotated cover.
        let (outside, _) = search(&mut store, root, Rect::new(-90.0, -90.0, 90.0, 90.0));
        assert_eq!(outside, RenderRootResult::NoRenderRoot);
    }

    #[test]
    fn culled_nodes_are_skipped() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let r = rect(&mut store, Rect::new(0.0, 0.0, 100.0, 100.0));
        store.add_child(root, r, None);
        store.update_bounds(root);
        let mut regions = DirtyRegionContainer::new(2);
        regions.add_dirty_region(Rect::new(500.0, 500.0, 510.0, 510.0));
        regions.add_dirty_region(Rect::new(10.0, 10.0, 20.0, 20.0));
        store.pre_cull(root, &regions, &Transform3d::IDENTITY, &Transform3d::IDENTITY);

        let mut path = NodePath::new();
        let id = Transform3d::IDENTITY;
        let hit = store.render_root(root, &mut path, regions.region(1), Some(1), &id, &id);
        assert_eq!(hit, RenderRootResult::HasRenderRoot);
        let region0 = regions.region(0);
        let miss = store.render_root(root, &mut path, region0, Some(0), &id, &id);
        assert_eq!(miss, RenderRootResult::NoRenderRoot);
    }

    #[test]
    fn axis_aligned_fast_path_agrees_with_quad() {
        let quad = Rect::new(0.0, 0.0, 10.0, 10.0);
        let tx = Transform3d::from_scale(2.0, 3.0, 1.0);
        let pv = Transform3d::IDENTITY;
        assert!(check_bounds_in_quad(quad, Rect::new(0.0, 0.0, 20.0, 30.0), &tx, &pv));
        assert!(!check_bounds_in_quad(quad, Rect::new(0.0, 0.0, 21.0, 30.0), &tx, &pv));
    }

    #[test]
    #[should_panic(expected = "culling index")]
    fn culling_index_fifteen_panics() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let mut path = NodePath::new();
        let id = Transform3d::IDENTITY;
        let _ = store.render_root(root, &mut path, Rect::ZERO, Some(15), &id, &id);
    }
}
