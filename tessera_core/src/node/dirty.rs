// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The per-node dirty state machine.
//!
//! Every node carries a [`DirtyFlag`] for its own visuals and a
//! `child_dirty` bit that says "something below me changed". Marking a node
//! walks up the tree setting `child_dirty` until it reaches an ancestor that
//! already knows, invalidating bitmap caches along the way. A clip node
//! reports to the node it clips, which becomes fully dirty.
//!
//! A node that only moved inside a bitmap-cached parent is marked
//! [`DirtyFlag::DirtyByTranslation`] so the parent can scroll its raster.

use super::id::{INVALID, NodeId};
use super::store::SceneStore;

/// Dirty state of a single node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DirtyFlag {
    /// Nothing about the node changed since it was last painted.
    Clean,
    /// The node only translated inside a bitmap-cached parent.
    DirtyByTranslation,
    /// The node must be repainted.
    #[default]
    Dirty,
}

impl DirtyFlag {
    /// Is this anything other than [`Clean`](Self::Clean)?
    #[must_use]
    pub fn is_dirty(self) -> bool {
        self != Self::Clean
    }
}

impl SceneStore {
    /// Returns the node's own dirty flag.
    #[must_use]
    pub fn dirty(&self, id: NodeId) -> DirtyFlag {
        self.validate(id);
        self.dirty[id.idx as usize]
    }

    /// Returns whether some descendant (or the clip) is dirty.
    #[must_use]
    pub fn is_child_dirty(&self, id: NodeId) -> bool {
        self.validate(id);
        self.child_dirty[id.idx as usize]
    }

    /// Returns whether the node and its whole subtree are clean.
    #[must_use]
    pub fn is_clean(&self, id: NodeId) -> bool {
        self.validate(id);
        self.is_clean_slot(id.idx)
    }

    /// Returns how many child changes the node collected since it was last
    /// cleaned.
    #[must_use]
    pub fn dirty_children_accumulated(&self, id: NodeId) -> u32 {
        self.validate(id);
        self.dirty_children_accumulated[id.idx as usize]
    }

    /// Marks the node dirty. Has no effect if it already is.
    pub fn mark_dirty(&mut self, id: NodeId) {
        self.validate(id);
        self.mark_dirty_slot(id.idx);
    }

    /// Marks the node dirty and invalidates its bitmap cache.
    pub fn visuals_changed(&mut self, id: NodeId) {
        self.validate(id);
        self.visuals_changed_slot(id.idx);
    }

    /// Invalidates the cache and opaque region after a geometry change, and
    /// marks the node dirty if it draws anything.
    pub fn geometry_changed(&mut self, id: NodeId) {
        self.validate(id);
        self.geometry_changed_slot(id.idx);
    }

    /// Resets the node's own dirty state, including removed-child snapshots.
    pub fn clear_dirty(&mut self, id: NodeId) {
        self.validate(id);
        self.clear_dirty_slot(id.idx);
    }

    /// Clears the dirty state of the node, its clip and every dirty
    /// descendant.
    pub fn clear_dirty_tree(&mut self, id: NodeId) {
        self.validate(id);
        self.clear_dirty_tree_slot(id.idx);
    }

    // -- Slot-level machine --

    pub(crate) fn is_clean_slot(&self, idx: u32) -> bool {
        let i = idx as usize;
        self.dirty[i] == DirtyFlag::Clean && !self.child_dirty[i]
    }

    pub(crate) fn mark_dirty_slot(&mut self, idx: u32) {
        if self.dirty[idx as usize] != DirtyFlag::Dirty {
            self.dirty[idx as usize] = DirtyFlag::Dirty;
            self.mark_tree_dirty(idx);
        }
    }

    pub(crate) fn visuals_changed_slot(&mut self, idx: u32) {
        self.invalidate_cache(idx);
        self.mark_dirty_slot(idx);
    }

    pub(crate) fn geometry_changed_slot(&mut self, idx: u32) {
        self.invalidate_cache(idx);
        self.invalidate_opaque_slot(idx);
        if self.kind[idx as usize].has_visuals() {
            self.mark_dirty_slot(idx);
        }
    }

    /// Records a pure translation by `(dx, dy)` of a child of a cached
    /// parent.
    ///
    /// Only a clean node under a clean parent takes the translation path;
    /// anything else falls back to a full [`mark_dirty_slot`](Self::mark_dirty_slot).
    pub(crate) fn mark_dirty_by_translation(&mut self, idx: u32, dx: f64, dy: f64) {
        let i = idx as usize;
        if self.dirty[i] != DirtyFlag::Clean {
            return;
        }
        let p = self.parent[i];
        if p != INVALID
            && self.dirty[p as usize] == DirtyFlag::Clean
            && !self.child_dirty[p as usize]
        {
            self.dirty[i] = DirtyFlag::DirtyByTranslation;
            let pi = p as usize;
            self.child_dirty[pi] = true;
            self.dirty_children_accumulated[pi] += 1;
            if let Some(filter) = self.cache_filter[pi].as_mut() {
                filter.invalidate_by_translation(dx, dy);
            }
            self.mark_tree_dirty(p);
        } else {
            self.mark_dirty_slot(idx);
        }
    }

    /// Propagates a change from a node that is not itself the source of it
    /// (a group that gained or lost a child).
    pub(crate) fn mark_tree_dirty_no_increment(&mut self, idx: u32) {
        let i = idx as usize;
        let p = self.up(idx);
        if p != INVALID
            && (!self.child_dirty[p as usize] || self.dirty[i] == DirtyFlag::DirtyByTranslation)
        {
            self.mark_tree_dirty(idx);
        }
    }

    /// Walks up from `idx` telling ancestors a descendant changed.
    pub(crate) fn mark_tree_dirty(&mut self, idx: u32) {
        let mut p = self.up(idx);
        let mut at_clip = self.clip_owner[idx as usize] != INVALID;
        let mut by_translation = self.dirty[idx as usize] == DirtyFlag::DirtyByTranslation;
        while p != INVALID {
            let pi = p as usize;
            if self.dirty[pi] == DirtyFlag::Dirty
                || (self.child_dirty[pi] && !at_clip && !by_translation)
            {
                break;
            }
            if at_clip {
                self.dirty[pi] = DirtyFlag::Dirty;
            } else if !by_translation {
                self.child_dirty[pi] = true;
                self.dirty_children_accumulated[pi] += 1;
            }
            self.invalidate_cache(p);
            at_clip = self.clip_owner[pi] != INVALID;
            by_translation = self.dirty[pi] == DirtyFlag::DirtyByTranslation;
            p = self.up(p);
        }
        if p != INVALID {
            // Stopped at an ancestor that already knew; count the extra change.
            let pi = p as usize;
            if self.dirty[pi] == DirtyFlag::Clean && !at_clip && !by_translation {
                self.dirty_children_accumulated[pi] += 1;
            }
            self.invalidate_cache(p);
        }
    }

    pub(crate) fn invalidate_cache(&mut self, idx: u32) {
        if let Some(filter) = self.cache_filter[idx as usize].as_mut() {
            filter.invalidate();
        }
    }

    pub(crate) fn clear_dirty_slot(&mut self, idx: u32) {
        let i = idx as usize;
        self.dirty[i] = DirtyFlag::Clean;
        self.child_dirty[i] = false;
        self.dirty_bounds[i] = None;
        self.dirty_children_accumulated[i] = 0;
        self.removed[i].clear();
        self.removed_overflow[i] = false;
    }

    pub(crate) fn clear_dirty_tree_slot(&mut self, idx: u32) {
        self.clear_dirty_slot(idx);
        let clip = self.clip_node[idx as usize];
        if clip != INVALID {
            self.clear_dirty_tree_slot(clip);
        }
        let mut child = self.first_child[idx as usize];
        while child != INVALID {
            if !self.is_clean_slot(child) {
                self.clear_dirty_tree_slot(child);
            }
            child = self.next_sibling[child as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;
    use crate::backend::Color;
    use crate::cache::CacheHint;
    use crate::config::EngineConfig;
    use crate::node::shape::{Outline, RectShape};
    use crate::transform::Transform3d;

    fn leaf(store: &mut SceneStore) -> NodeId {
        store.create_rect(RectShape {
            outline: Outline::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)),
            fill: Color::WHITE,
        })
    }

    /// root -> mid -> leaf, all clean.
    fn chain(store: &mut SceneStore) -> (NodeId, NodeId, NodeId) {
        let root = store.create_group();
        let mid = store.create_group();
        let l = leaf(store);
        store.add_child(root, mid, None);
        store.add_child(mid, l, None);
        store.clear_dirty_tree(root);
        (root, mid, l)
    }

    #[test]
    fn new_nodes_start_dirty() {
        let mut store = SceneStore::default();
        let n = store.create_group();
        assert_eq!(store.dirty(n), DirtyFlag::Dirty);
        assert!(!store.is_clean(n));
    }

    #[test]
    fn mark_dirty_sets_child_dirty_up_the_tree() {
        let mut store = SceneStore::default();
        let (root, mid, l) = chain(&mut store);
        assert!(store.is_clean(root));

        store.mark_dirty(l);
        assert_eq!(store.dirty(l), DirtyFlag::Dirty);
        assert!(store.is_child_dirty(mid));
        assert!(store.is_child_dirty(root));
        assert_eq!(store.dirty(mid), DirtyFlag::Clean);
        assert_eq!(store.dirty_children_accumulated(mid), 1);
        assert_eq!(store.dirty_children_accumulated(root), 1);
    }

    #[test]
    fn walk_stops_at_informed_ancestor_and_counts() {
        let mut store = SceneStore::default();
        let (root, mid, l) = chain(&mut store);
        let other = leaf(&mut store);
        store.add_child(mid, other, None);
        store.clear_dirty_tree(root);

        store.mark_dirty(l);
        store.mark_dirty(other);
        assert_eq!(store.dirty_children_accumulated(mid), 2);
        // The root heard about mid only once.
        assert_eq!(store.dirty_children_accumulated(root), 1);
    }

    #[test]
    fn clip_change_dirties_owner() {
        let mut store = SceneStore::default();
        let (root, mid, _) = chain(&mut store);
        let clip = store.create_rect(RectShape::clip(Rect::new(0.0, 0.0, 5.0, 5.0)));
        store.set_clip_node(mid, Some(clip));
        store.clear_dirty_tree(root);
        assert!(store.is_clean(clip));

        store.set_visible(clip, false);
        assert_eq!(store.dirty(mid), DirtyFlag::Dirty);
        assert!(store.is_child_dirty(root));
    }

    #[test]
    fn clear_dirty_tree_cleans_everything() {
        let mut store = SceneStore::default();
        let (root, mid, l) = chain(&mut store);
        let clip = store.create_rect(RectShape::clip(Rect::new(0.0, 0.0, 5.0, 5.0)));
        store.set_clip_node(mid, Some(clip));
        store.mark_dirty(l);
        store.set_transformed_bounds(l, Some(Rect::new(0.0, 0.0, 20.0, 20.0)), false);
        assert!(store.dirty_bounds(l).is_some());

        store.clear_dirty_tree(root);
        for n in [root, mid, l, clip] {
            assert!(store.is_clean(n), "{n:?} still dirty");
        }
        assert_eq!(store.dirty_bounds(l), None);
        assert_eq!(store.dirty_children_accumulated(mid), 0);
    }

    #[test]
    fn translation_in_cached_parent_is_recorded() {
        let mut store = SceneStore::new(EngineConfig {
            scroll_cache_opt: true,
            ..EngineConfig::default()
        });
        let (root, mid, l) = chain(&mut store);
        store.set_cached_as_bitmap(mid, true, CacheHint::Default);
        // First transform only arms the translation hint.
        store.set_transform(l, Transform3d::from_translation(1.0, 0.0, 0.0));
        store.clear_dirty_tree(root);

        store.set_transform(l, Transform3d::from_translation(6.0, 0.0, 0.0));
        assert_eq!(store.dirty(l), DirtyFlag::DirtyByTranslation);
        assert!(store.is_child_dirty(mid));
        assert_eq!(store.dirty(mid), DirtyFlag::Clean);
        assert!(store.is_child_dirty(root));
        let filter = store.cache_filter(mid).expect("cached");
        assert_eq!(filter.scroll_delta(), (5.0, 0.0));
    }

    #[test]
    fn translation_without_cache_is_plain_dirty() {
        let mut store = SceneStore::new(EngineConfig {
            scroll_cache_opt: true,
            ..EngineConfig::default()
        });
        let (_, _, l) = chain(&mut store);
        store.set_transform(l, Transform3d::from_translation(1.0, 0.0, 0.0));
        store.clear_dirty(l);
        store.set_transform(l, Transform3d::from_translation(2.0, 0.0, 0.0));
        assert_eq!(store.dirty(l), DirtyFlag::Dirty);
    }

    #[test]
    fn no_increment_skips_informed_parent() {
        let mut store = SceneStore::default();
        let (root, mid, l) = chain(&mut store);
        store.mark_dirty(l);
        let before = store.dirty_children_accumulated(root);
        store.mark_tree_dirty_no_increment(mid.idx);
        assert_eq!(store.dirty_children_accumulated(root), before);
    }
}
