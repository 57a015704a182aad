// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounds queries under an arbitrary transform.
//!
//! Four nested notions of bounds exist for every node:
//!
//! - *content*: what the node itself (or, for groups, its children) covers
//!   in local space;
//! - *effect*: content grown by the node's effect;
//! - *clipped*: effect bounds intersected with the clip's complete bounds;
//! - *complete*: clipped bounds under the node's own transform. With an
//!   identity outer transform this is the cached transformed bounds.

use kurbo::Rect;

use crate::geom;
use crate::transform::Transform3d;

use super::id::{INVALID, NodeId};
use super::shape::{NodeKind, Outline};
use super::store::SceneStore;

impl SceneStore {
    /// Returns the complete bounds of `id` mapped through `tx` (the
    /// transform up to but not including the node's own).
    #[must_use]
    pub fn complete_bounds(&self, id: NodeId, tx: &Transform3d) -> Option<Rect> {
        self.validate(id);
        self.complete_bounds_slot(id.idx, tx)
    }

    /// Returns the effect bounds of `id`, intersected with its clip, under
    /// `tx` (which already includes the node's own transform).
    #[must_use]
    pub fn clipped_bounds(&self, id: NodeId, tx: &Transform3d) -> Option<Rect> {
        self.validate(id);
        self.clipped_bounds_slot(id.idx, tx)
    }

    /// Recomputes content bounds of groups and transformed bounds of every
    /// node under `root`, children first.
    ///
    /// Changes flow through [`set_transformed_bounds`](Self::set_transformed_bounds),
    /// so the old and new bounds of anything that moved are owed a repaint.
    pub fn update_bounds(&mut self, root: NodeId) {
        self.validate(root);
        self.update_bounds_slot(root.idx);
    }

    /// Recomputes the transformed bounds of `id` alone from its content,
    /// effect and clip under its own transform.
    ///
    /// Unlike [`update_bounds`](Self::update_bounds) this does not descend,
    /// so group content bounds must already be current.
    pub fn sync_transformed_bounds(&mut self, id: NodeId) {
        self.validate(id);
        let i = id.idx as usize;
        let bounds = self.clipped_bounds_slot(id.idx, &self.transform[i]);
        self.set_transformed_bounds(id, bounds, true);
    }

    pub(crate) fn content_bounds_slot(&self, idx: u32, tx: &Transform3d) -> Option<Rect> {
        self.content_bounds[idx as usize].map(|b| tx.transform_rect(b))
    }

    pub(crate) fn effect_bounds_slot(&self, idx: u32, tx: &Transform3d) -> Option<Rect> {
        match &self.effect[idx as usize] {
            Some(effect) => self.content_bounds[idx as usize].map(|b| tx.transform_rect(effect.bounds(b))),
            None => self.content_bounds_slot(idx, tx),
        }
    }

    pub(crate) fn clipped_bounds_slot(&self, idx: u32, tx: &Transform3d) -> Option<Rect> {
        let bounds = self.effect_bounds_slot(idx, tx)?;
        let clip = self.clip_node[idx as usize];
        if clip == INVALID {
            return Some(bounds);
        }
        geom::intersect(bounds, self.complete_bounds_slot(clip, tx)?)
    }

    pub(crate) fn complete_bounds_slot(&self, idx: u32, tx: &Transform3d) -> Option<Rect> {
        if tx.is_identity() {
            return self.transformed_bounds[idx as usize];
        }
        let own = self.transform[idx as usize];
        if own.is_identity() {
            self.clipped_bounds_slot(idx, tx)
        } else {
            self.clipped_bounds_slot(idx, &(*tx * own))
        }
    }

    /// Is `id` a plain opaque rectangle that stays axis-aligned under `tx`
    /// (the transform above it)?
    ///
    /// Such a clip can be applied as a device-space clip rectangle instead of
    /// a mask.
    #[must_use]
    pub fn is_rect_clip(&self, id: NodeId, tx: &Transform3d) -> bool {
        self.validate(id);
        self.is_rect_clip_slot(id.idx, tx)
    }

    pub(crate) fn is_rect_clip_slot(&self, idx: u32, tx: &Transform3d) -> bool {
        let i = idx as usize;
        let NodeKind::Rect(shape) = &self.kind[i] else {
            return false;
        };
        matches!(shape.outline, Outline::Rect(_))
            && shape.fill.is_opaque()
            && self.clip_node[i] == INVALID
            && self.opacity[i] == 1.0
            && self.effect[i]
                .as_ref()
                .is_none_or(|e| !e.reduces_opaque_pixels())
            && (*tx * self.transform[i]).is_axis_aligned()
    }

    fn update_bounds_slot(&mut self, idx: u32) {
        let i = idx as usize;
        let clip = self.clip_node[i];
        if clip != INVALID {
            self.update_bounds_slot(clip);
        }
        let mut children = None;
        let mut c = self.first_child[i];
        while c != INVALID {
            self.update_bounds_slot(c);
            children = geom::union(children, self.transformed_bounds[c as usize]);
            c = self.next_sibling[c as usize];
        }
        match &self.kind[i] {
            NodeKind::Group => self.content_bounds[i] = children,
            NodeKind::Region(style) => {
                let own = Rect::new(0.0, 0.0, style.width, style.height);
                self.content_bounds[i] = geom::union(Some(own), children);
            }
            NodeKind::Rect(_) | NodeKind::Content(_) => {}
        }
        let id = self.id_at(idx);
        self.sync_transformed_bounds(id);
    }
}

#[cfg(test)]
mod tests {
    use alloc::rc::Rc;

    use super::*;
    use crate::backend::{Color, Graphics};
    use crate::node::shape::{Effect, Outline, RectShape};

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

    #[test]
    fn group_bounds_follow_children() {
        let mut store = SceneStore::default();
        let g = store.create_group();
        let a = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        store.add_child(g, a, None);
        store.add_child(g, b, None);
        store.set_transform(b, Transform3d::from_translation(20.0, 0.0, 0.0));
        store.set_transform(g, Transform3d::from_translation(0.0, 5.0, 0.0));
        store.update_bounds(g);

        assert_eq!(store.content_bounds(g), Some(Rect::new(0.0, 0.0, 30.0, 10.0)));
        assert_eq!(
            store.transformed_bounds(g),
            Some(Rect::new(0.0, 5.0, 30.0, 15.0))
        );
        assert_eq!(
            store.complete_bounds(g, &Transform3d::from_scale(2.0, 2.0, 1.0)),
            Some(Rect::new(0.0, 10.0, 60.0, 30.0))
        );
    }

    #[test]
    fn clip_and_effect_shape_bounds() {
        let mut store = SceneStore::default();
        let n = rect(&mut store, Rect::new(0.0, 0.0, 100.0, 100.0));
        store.set_effect(n, Some(Rc::new(Grow(5.0))));
        store.update_bounds(n);
        assert_eq!(
            store.transformed_bounds(n),
            Some(Rect::new(-5.0, -5.0, 105.0, 105.0))
        );

        let clip = rect(&mut store, Rect::new(10.0, 10.0, 20.0, 20.0));
        store.set_clip_node(n, Some(clip));
        store.update_bounds(n);
        assert_eq!(
            store.transformed_bounds(n),
            Some(Rect::new(10.0, 10.0, 20.0, 20.0))
        );
    }

    #[test]
    fn rect_clip_detection() {
        let mut store = SceneStore::default();
        let clip = store.create_rect(RectShape::clip(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert!(store.is_rect_clip(clip, &Transform3d::IDENTITY));
        assert!(store.is_rect_clip(clip, &Transform3d::from_scale(2.0, 3.0, 1.0)));
        assert!(!store.is_rect_clip(clip, &Transform3d::from_rotation_z(0.2)));
        store.set_opacity(clip, 0.5);
        assert!(!store.is_rect_clip(clip, &Transform3d::IDENTITY));

        let rounded = store.create_rect(RectShape {
            outline: Outline::RoundedRect(kurbo::RoundedRect::new(0.0, 0.0, 10.0, 10.0, 2.0)),
            fill: Color::BLACK,
        });
        assert!(!store.is_rect_clip(rounded, &Transform3d::IDENTITY));
    }

    #[test]
    fn sync_only_touches_the_node() {
        let mut store = SceneStore::default();
        let g = store.create_group();
        let n = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        store.add_child(g, n, None);
        store.update_bounds(g);
        store.clear_dirty_tree(g);

        store.set_transform(n, Transform3d::from_scale(3.0, 1.0, 1.0));
        store.sync_transformed_bounds(n);
        assert_eq!(
            store.transformed_bounds(n),
            Some(Rect::new(0.0, 0.0, 30.0, 10.0))
        );
        assert_eq!(store.content_bounds(g), Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn moving_a_leaf_owes_old_and_new_area() {
        let mut store = SceneStore::default();
        let n = rect(&mut store, Rect::new(0.0, 0.0, 100.0, 100.0));
        store.update_bounds(n);
        store.clear_dirty(n);
        store.set_transform(n, Transform3d::from_translation(5.0, 0.0, 0.0));
        store.update_bounds(n);
        assert_eq!(
            store.dirty_bounds(n),
            Some(Rect::new(0.0, 0.0, 105.0, 100.0))
        );
    }
}
