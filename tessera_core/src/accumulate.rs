// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Collecting the scene-space areas that changed since the last frame.
//!
//! Accumulation walks only the dirty parts of the tree. A dirty node
//! contributes its dirty bounds (old and new area) and stops the walk; a
//! clean group with dirty descendants forwards to its removed-child
//! snapshots and children. As soon as one contribution covers the whole
//! clip the walk short-circuits with [`AccumulateStatus::ContainsClip`].

use kurbo::Rect;

use crate::geom;
use crate::node::{INVALID, NodeId, NodeKind, SceneStore};
use crate::region::{DirtyRegionContainer, DirtyRegionPool};
use crate::transform::Transform3d;

/// Outcome of an accumulation step.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AccumulateStatus {
    /// Regions (if any) were added to the container.
    Ok,
    /// Some dirty area covers the whole clip; the container contents are
    /// meaningless and the clip itself should be repainted.
    ContainsClip,
}

impl SceneStore {
    /// Adds the dirty areas of `root`'s subtree, in scene space and limited
    /// to `clip`, to `container`.
    ///
    /// `tx` maps the root's parent space to the scene and `pv` is the
    /// camera projection. Scratch containers for clipped and filtered groups
    /// come from `pool`.
    ///
    /// # Panics
    ///
    /// Panics if `clip` is not finite.
    pub fn accumulate_dirty_regions(
        &self,
        root: NodeId,
        clip: Rect,
        pool: &mut DirtyRegionPool,
        container: &mut DirtyRegionContainer,
        tx: &Transform3d,
        pv: &Transform3d,
    ) -> AccumulateStatus {
        self.validate(root);
        assert!(
            clip.is_finite(),
            "accumulation clip must be finite, got {clip:?}"
        );
        self.accumulate_slot(root.idx, clip, pool, container, tx, pv)
    }

    fn accumulate_slot(
        &self,
        idx: u32,
        clip: Rect,
        pool: &mut DirtyRegionPool,
        container: &mut DirtyRegionContainer,
        tx: &Transform3d,
        pv: &Transform3d,
    ) -> AccumulateStatus {
        if self.is_clean_slot(idx) {
            return AccumulateStatus::Ok;
        }
        if self.dirty[idx as usize].is_dirty() {
            self.accumulate_node_slot(idx, clip, container, tx, pv)
        } else {
            self.accumulate_group_slot(idx, clip, pool, container, tx, pv)
        }
    }

    fn accumulate_node_slot(
        &self,
        idx: u32,
        clip: Rect,
        container: &mut DirtyRegionContainer,
        tx: &Transform3d,
        pv: &Transform3d,
    ) -> AccumulateStatus {
        let region = if self.cache_filter[idx as usize].is_some() {
            self.cache_dirty_bounds_slot(idx, tx, pv)
        } else {
            self.node_dirty_bounds_slot(idx, tx, pv)
        };
        accumulate_rect(region, clip, container)
    }

    fn node_dirty_bounds_slot(&self, idx: u32, tx: &Transform3d, pv: &Transform3d) -> Option<Rect> {
        let i = idx as usize;
        let mut region = self.dirty_bounds[i].or(self.transformed_bounds[i])?;
        if let NodeKind::Content(content) = &self.kind[i] {
            region = content.pad_dirty_region(region);
        }
        Some(project(region, tx, pv))
    }

    fn accumulate_group_slot(
        &self,
        idx: u32,
        clip: Rect,
        pool: &mut DirtyRegionPool,
        container: &mut DirtyRegionContainer,
        tx: &Transform3d,
        pv: &Transform3d,
    ) -> AccumulateStatus {
        let i = idx as usize;
        if self.dirty_children_accumulated[i] > self.config.dirty_children_threshold {
            return self.accumulate_node_slot(idx, clip, container, tx, pv);
        }

        let render_tx = *tx * self.transform[i];
        let clip_node = self.clip_node[i];

        if let Some(effect) = self.effect[i].as_ref() {
            let Some(local_clip) = render_tx.inverse_transform_rect(clip) else {
                return AccumulateStatus::Ok;
            };
            return pool.with_container(|pool, scratch| {
                let status = self.accumulate_children_slot(
                    idx,
                    local_clip,
                    pool,
                    scratch,
                    &Transform3d::IDENTITY,
                    &Transform3d::IDENTITY,
                );
                if status == AccumulateStatus::ContainsClip {
                    return status;
                }
                effect.map_dirty_regions(scratch);
                if clip_node != INVALID {
                    match self.complete_bounds_slot(clip_node, &Transform3d::IDENTITY) {
                        Some(bounds) => scratch.intersect_with(bounds),
                        None => scratch.clear(),
                    }
                }
                scratch.apply_transform(&render_tx);
                if !pv.is_identity() {
                    scratch.apply_transform(pv);
                }
                container.merge(scratch);
                AccumulateStatus::Ok
            });
        }

        if clip_node != INVALID {
            let clip_bounds = self
                .complete_bounds_slot(clip_node, &render_tx)
                .map(|b| project(b, &Transform3d::IDENTITY, pv));
            let Some(my_clip) = clip_bounds.and_then(|b| geom::intersect(b, clip)) else {
                // Nothing inside the clip can show.
                return AccumulateStatus::Ok;
            };
            return pool.with_container(|pool, scratch| {
                let status = self.accumulate_children_slot(idx, my_clip, pool, scratch, &render_tx, pv);
                match status {
                    AccumulateStatus::ContainsClip => {
                        self.accumulate_node_slot(idx, clip, container, tx, pv)
                    }
                    AccumulateStatus::Ok => {
                        container.merge(scratch);
                        AccumulateStatus::Ok
                    }
                }
            });
        }

        self.accumulate_children_slot(idx, clip, pool, container, &render_tx, pv)
    }

    /// Accumulates removed-child snapshots (most recent first) and then the
    /// live children of `idx`, in the group's space `render_tx`.
    fn accumulate_children_slot(
        &self,
        idx: u32,
        clip: Rect,
        pool: &mut DirtyRegionPool,
        container: &mut DirtyRegionContainer,
        render_tx: &Transform3d,
        pv: &Transform3d,
    ) -> AccumulateStatus {
        for removed in self.removed[idx as usize].iter().rev() {
            let region = Some(project(removed.bounds, render_tx, pv));
            if accumulate_rect(region, clip, container) == AccumulateStatus::ContainsClip {
                return AccumulateStatus::ContainsClip;
            }
        }
        let mut c = self.first_child[idx as usize];
        while c != INVALID {
            let status = self.accumulate_slot(c, clip, pool, container, render_tx, pv);
            if status == AccumulateStatus::ContainsClip {
                return status;
            }
            c = self.next_sibling[c as usize];
        }
        AccumulateStatus::Ok
    }
}

fn project(region: Rect, tx: &Transform3d, pv: &Transform3d) -> Rect {
    let region = if tx.is_identity() {
        region
    } else {
        tx.transform_rect(region)
    };
    if pv.is_identity() {
        region
    } else {
        pv.transform_rect(region)
    }
}

fn accumulate_rect(
    region: Option<Rect>,
    clip: Rect,
    container: &mut DirtyRegionContainer,
) -> AccumulateStatus {
    let Some(region) = region else {
        return AccumulateStatus::Ok;
    };
    if !geom::intersects(region, clip) {
        return AccumulateStatus::Ok;
    }
    if geom::contains(region, clip) {
        return AccumulateStatus::ContainsClip;
    }
    if let Some(r) = geom::intersect(region, clip) {
        container.add_dirty_region(r);
    }
    AccumulateStatus::Ok
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;

    use super::*;
    use crate::backend::{Color, Graphics};
    use crate::node::{Effect, Outline, RectShape};

    const VIEW: Rect = Rect::new(0.0, 0.0, 1000.0, 1000.0);

    #[derive(Debug)]
    struct Grow(f64);

    impl Effect for Grow {
        fn bounds(&self, input: Rect) -> Rect {
            input.inflate(self.0, self.0)
        }

        fn render(&self, g: &mut dyn Graphics, input: &mut dyn FnMut(&mut dyn Graphics)) {
            input(g);
        }
    }

    fn rect(store: &mut SceneStore, r: Rect) -> NodeId {
        store.create_rect(RectShape {
            outline: Outline::Rect(r),
            fill: Color::WHITE,
        })
    }

    fn settle(store: &mut SceneStore, root: NodeId) {
        store.update_bounds(root);
        store.clear_dirty_tree(root);
    }

    fn accumulate(store: &SceneStore, root: NodeId, clip: Rect) -> (AccumulateStatus, Vec<Rect>) {
        let mut pool = DirtyRegionPool::new(6);
        let mut container = DirtyRegionContainer::new(6);
        let status = store.accumulate_dirty_regions(
            root,
            clip,
            &mut pool,
            &mut container,
            &Transform3d::IDENTITY,
            &Transform3d::IDENTITY,
        );
        assert_eq!(pool.outstanding(), 0);
        (status, container.regions().to_vec())
    }

    #[test]
    fn clean_tree_contributes_nothing() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let leaf = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        store.add_child(root, leaf, None);
        settle(&mut store, root);
        assert_eq!(accumulate(&store, root, VIEW), (AccumulateStatus::Ok, vec![]));
    }

    #[test]
    fn moved_leaf_owes_old_and_new_area() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let leaf = rect(&mut store, Rect::new(0.0, 0.0, 100.0, 100.0));
        store.add_child(root, leaf, None);
        settle(&mut store, root);

        store.set_transform(leaf, Transform3d::from_translation(5.0, 0.0, 0.0));
        store.update_bounds(root);
        assert_eq!(
            accumulate(&store, root, VIEW),
            (AccumulateStatus::Ok, vec![Rect::new(0.0, 0.0, 105.0, 100.0)])
        );
    }

    #[test]
    fn dirty_area_covering_clip_short_circuits() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let a = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        let big = rect(&mut store, Rect::new(-50.0, -50.0, 500.0, 500.0));
        store.add_child(root, a, None);
        store.add_child(root, big, None);
        settle(&mut store, root);
        store.mark_dirty(a);
        store.mark_dirty(big);
        let (status, _) = accumulate(&store, root, Rect::new(0.0, 0.0, 200.0, 200.0));
        assert_eq!(status, AccumulateStatus::ContainsClip);
    }

    #[test]
    fn dirty_area_is_clipped() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let a = rect(&mut store, Rect::new(150.0, 150.0, 250.0, 180.0));
        store.add_child(root, a, None);
        settle(&mut store, root);
        store.mark_dirty(a);
        assert_eq!(
            accumulate(&store, root, Rect::new(0.0, 0.0, 200.0, 200.0)).1,
            vec![Rect::new(150.0, 150.0, 200.0, 180.0)]
        );
        // Entirely outside the clip.
        assert_eq!(accumulate(&store, root, Rect::new(0.0, 0.0, 100.0, 100.0)).1, vec![]);
    }

    #[test]
    fn removed_children_leave_their_area() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let a = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = rect(&mut store, Rect::new(300.0, 0.0, 310.0, 10.0));
        store.add_child(root, a, None);
        store.add_child(root, b, None);
        store.set_transform(root, Transform3d::from_translation(0.0, 20.0, 0.0));
        settle(&mut store, root);

        store.remove_child(root, b);
        let (status, regions) = accumulate(&store, root, VIEW);
        assert_eq!(status, AccumulateStatus::Ok);
        assert_eq!(regions, vec![Rect::new(300.0, 20.0, 310.0, 30.0)]);
    }

    #[test]
    fn many_dirty_children_accumulate_the_group() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let mut kids = Vec::new();
        for i in 0..13 {
            let x = f64::from(i) * 10.0;
            let kid = rect(&mut store, Rect::new(x, 0.0, x + 5.0, 5.0));
            store.add_child(root, kid, None);
            kids.push(kid);
        }
        settle(&mut store, root);
        for &kid in &kids {
            store.mark_dirty(kid);
        }
        assert_eq!(store.dirty_children_accumulated(root), 13);
        assert_eq!(
            accumulate(&store, root, VIEW).1,
            vec![Rect::new(0.0, 0.0, 125.0, 5.0)]
        );
    }

    #[test]
    fn overflowing_clipped_group_accumulates_itself() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let g = store.create_group();
        let leaf = rect(&mut store, Rect::new(0.0, 0.0, 100.0, 100.0));
        let clip = store.create_rect(RectShape::clip(Rect::new(0.0, 0.0, 50.0, 50.0)));
        store.add_child(root, g, None);
        store.add_child(g, leaf, None);
        store.set_clip_node(g, Some(clip));
        settle(&mut store, root);

        store.set_transform(leaf, Transform3d::from_translation(5.0, 0.0, 0.0));
        store.update_bounds(root);
        assert_eq!(
            accumulate(&store, root, VIEW),
            (AccumulateStatus::Ok, vec![Rect::new(0.0, 0.0, 50.0, 50.0)])
        );
    }

    #[test]
    fn clipped_group_keeps_small_changes() {
        let mut store = SceneStore::default();
        let g = store.create_group();
        let leaf = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        let clip = store.create_rect(RectShape::clip(Rect::new(0.0, 0.0, 50.0, 50.0)));
        store.add_child(g, leaf, None);
        store.set_clip_node(g, Some(clip));
        settle(&mut store, g);

        store.mark_dirty(leaf);
        assert_eq!(
            accumulate(&store, g, VIEW).1,
            vec![Rect::new(0.0, 0.0, 10.0, 10.0)]
        );
    }

    #[test]
    fn effect_maps_child_regions() {
        let mut store = SceneStore::default();
        let g = store.create_group();
        let leaf = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        store.add_child(g, leaf, None);
        store.set_effect(g, Some(Rc::new(Grow(2.0))));
        store.set_transform(g, Transform3d::from_translation(100.0, 0.0, 0.0));
        settle(&mut store, g);

        store.mark_dirty(leaf);
        assert_eq!(
            accumulate(&store, g, VIEW).1,
            vec![Rect::new(98.0, -2.0, 112.0, 12.0)]
        );
    }

    #[test]
    fn singular_transform_under_effect_contributes_nothing() {
        let mut store = SceneStore::default();
        let g = store.create_group();
        let leaf = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        store.add_child(g, leaf, None);
        store.set_effect(g, Some(Rc::new(Grow(2.0))));
        store.set_transform(g, Transform3d::from_scale(0.0, 0.0, 1.0));
        settle(&mut store, g);

        store.mark_dirty(leaf);
        assert_eq!(accumulate(&store, g, VIEW), (AccumulateStatus::Ok, vec![]));
    }

    #[test]
    #[should_panic(expected = "clip must be finite")]
    fn infinite_clip_panics() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let _ = accumulate(&store, root, Rect::new(0.0, 0.0, f64::INFINITY, 1.0));
    }
}
