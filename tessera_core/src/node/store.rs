// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Struct-of-arrays node storage with allocation, topology, and property management.

use alloc::boxed::Box;
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec::Vec;

use kurbo::Rect;

use crate::backend::{BlendMode, RasterId};
use crate::cache::{CacheFilter, CacheHint};
use crate::config::EngineConfig;
use crate::cull::CullingBits;
use crate::transform::Transform3d;

use super::dirty::DirtyFlag;
use super::id::{INVALID, NodeId};
use super::shape::{Effect, NodeContent, NodeKind, RectShape, RegionStyle};
use super::traverse::Children;

/// Per-node boolean flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct NodeFlags {
    /// Whether the node (and its subtree) is drawn.
    pub visible: bool,
    /// Whether depth testing applies while drawing the node.
    pub depth_test: bool,
}

impl Default for NodeFlags {
    fn default() -> Self {
        Self {
            visible: true,
            depth_test: true,
        }
    }
}

/// Where a child used to be, kept until the next paint so the vacated area
/// is repainted.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RemovedChild {
    /// Slot index the child had when it was removed.
    pub index: u32,
    /// Dirty bounds (or transformed bounds) in the group's local space.
    pub bounds: Rect,
}

/// Struct-of-arrays storage for all scene nodes.
///
/// Nodes are addressed by [`NodeId`] handles. Internally, each node occupies
/// a slot in parallel arrays. Destroyed nodes are recycled via a free list,
/// and generation counters prevent stale handle access.
///
/// Every setter carries its invalidation side effects: dirty marking up the
/// tree, cache invalidation on ancestors and opaque-region invalidation.
#[derive(Debug)]
pub struct SceneStore {
    // -- Topology --
    pub(crate) parent: Vec<u32>,
    pub(crate) first_child: Vec<u32>,
    pub(crate) next_sibling: Vec<u32>,
    pub(crate) prev_sibling: Vec<u32>,
    pub(crate) clip_node: Vec<u32>,
    pub(crate) clip_owner: Vec<u32>,

    // -- Properties (set by callers) --
    pub(crate) kind: Vec<NodeKind>,
    pub(crate) name: Vec<Option<String>>,
    pub(crate) transform: Vec<Transform3d>,
    pub(crate) content_bounds: Vec<Option<Rect>>,
    pub(crate) transformed_bounds: Vec<Option<Rect>>,
    pub(crate) flags: Vec<NodeFlags>,
    pub(crate) opacity: Vec<f32>,
    pub(crate) view_order: Vec<f64>,
    pub(crate) blend_mode: Vec<Option<BlendMode>>,
    pub(crate) effect: Vec<Option<Rc<dyn Effect>>>,
    pub(crate) cache_filter: Vec<Option<CacheFilter>>,

    // -- Dirty state --
    pub(crate) dirty: Vec<DirtyFlag>,
    pub(crate) child_dirty: Vec<bool>,
    pub(crate) dirty_bounds: Vec<Option<Rect>>,
    pub(crate) dirty_children_accumulated: Vec<u32>,
    pub(crate) removed: Vec<Vec<RemovedChild>>,
    pub(crate) removed_overflow: Vec<bool>,
    pub(crate) translation_hint: Vec<bool>,

    // -- Render bookkeeping --
    pub(crate) culling_bits: Vec<CullingBits>,
    pub(crate) opaque_region: Vec<Option<Rect>>,
    pub(crate) opaque_region_invalid: Vec<bool>,
    pub(crate) painted: Vec<u32>,

    // -- Allocation --
    pub(crate) generation: Vec<u32>,
    pub(crate) free_list: Vec<u32>,
    pub(crate) len: u32,

    // -- Lifecycle --
    pub(crate) released_rasters: Vec<RasterId>,
    pub(crate) config: EngineConfig,
}

impl Default for SceneStore {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl SceneStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            parent: Vec::new(),
            first_child: Vec::new(),
            next_sibling: Vec::new(),
            prev_sibling: Vec::new(),
            clip_node: Vec::new(),
            clip_owner: Vec::new(),
            kind: Vec::new(),
            name: Vec::new(),
            transform: Vec::new(),
            content_bounds: Vec::new(),
            transformed_bounds: Vec::new(),
            flags: Vec::new(),
            opacity: Vec::new(),
            view_order: Vec::new(),
            blend_mode: Vec::new(),
            effect: Vec::new(),
            cache_filter: Vec::new(),
            dirty: Vec::new(),
            child_dirty: Vec::new(),
            dirty_bounds: Vec::new(),
            dirty_children_accumulated: Vec::new(),
            removed: Vec::new(),
            removed_overflow: Vec::new(),
            translation_hint: Vec::new(),
            culling_bits: Vec::new(),
            opaque_region: Vec::new(),
            opaque_region_invalid: Vec::new(),
            painted: Vec::new(),
            generation: Vec::new(),
            free_list: Vec::new(),
            len: 0,
            released_rasters: Vec::new(),
            config,
        }
    }

    /// Returns the engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Replaces the engine configuration.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    // -- Allocation API --

    /// Creates an empty group.
    pub fn create_group(&mut self) -> NodeId {
        self.create_node(NodeKind::Group)
    }

    /// Creates a region with the given style.
    pub fn create_region(&mut self, style: RegionStyle) -> NodeId {
        let id = self.create_node(NodeKind::Region(style));
        self.sync_region_content_bounds(id.idx);
        id
    }

    /// Creates a filled rectangle.
    pub fn create_rect(&mut self, shape: RectShape) -> NodeId {
        let id = self.create_node(NodeKind::Rect(shape));
        self.content_bounds[id.idx as usize] = Some(shape.outline.bounds());
        id
    }

    /// Creates a node whose painting is delegated to `content`.
    pub fn create_content(&mut self, content: Box<dyn NodeContent>) -> NodeId {
        self.create_node(NodeKind::Content(content))
    }

    /// Creates a node of the given kind and returns its handle.
    ///
    /// The node starts dirty, visible, fully opaque, with an identity
    /// transform, empty bounds and no parent.
    pub fn create_node(&mut self, kind: NodeKind) -> NodeId {
        let idx = if let Some(idx) = self.free_list.pop() {
            // Reuse a freed slot.
            let i = idx as usize;
            self.generation[i] += 1;
            self.parent[i] = INVALID;
            self.first_child[i] = INVALID;
            self.next_sibling[i] = INVALID;
            self.prev_sibling[i] = INVALID;
            self.clip_node[i] = INVALID;
            self.clip_owner[i] = INVALID;
            self.kind[i] = kind;
            self.name[i] = None;
            self.transform[i] = Transform3d::IDENTITY;
            self.content_bounds[i] = None;
            self.transformed_bounds[i] = None;
            self.flags[i] = NodeFlags::default();
            self.opacity[i] = 1.0;
            self.view_order[i] = 0.0;
            self.blend_mode[i] = None;
            self.effect[i] = None;
            self.cache_filter[i] = None;
            self.dirty[i] = DirtyFlag::Dirty;
            self.child_dirty[i] = false;
            self.dirty_bounds[i] = None;
            self.dirty_children_accumulated[i] = 0;
            self.removed[i].clear();
            self.removed_overflow[i] = false;
            self.translation_hint[i] = false;
            self.culling_bits[i] = CullingBits::NONE;
            self.opaque_region[i] = None;
            self.opaque_region_invalid[i] = true;
            self.painted[i] = 0;
            idx
        } else {
            // Allocate a new slot.
            let idx = self.len;
            self.len += 1;
            self.parent.push(INVALID);
            self.first_child.push(INVALID);
            self.next_sibling.push(INVALID);
            self.prev_sibling.push(INVALID);
            self.clip_node.push(INVALID);
            self.clip_owner.push(INVALID);
            self.kind.push(kind);
            self.name.push(None);
            self.transform.push(Transform3d::IDENTITY);
            self.content_bounds.push(None);
            self.transformed_bounds.push(None);
            self.flags.push(NodeFlags::default());
            self.opacity.push(1.0);
            self.view_order.push(0.0);
            self.blend_mode.push(None);
            self.effect.push(None);
            self.cache_filter.push(None);
            self.dirty.push(DirtyFlag::Dirty);
            self.child_dirty.push(false);
            self.dirty_bounds.push(None);
            self.dirty_children_accumulated.push(0);
            self.removed.push(Vec::new());
            self.removed_overflow.push(false);
            self.translation_hint.push(false);
            self.culling_bits.push(CullingBits::NONE);
            self.opaque_region.push(None);
            self.opaque_region_invalid.push(true);
            self.painted.push(0);
            self.generation.push(0);
            idx
        };

        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Destroys a node (and its clip node), freeing the slots for reuse.
    ///
    /// Rasters owned by the node's cache filter are queued for release; see
    /// [`take_released_rasters`](Self::take_released_rasters).
    ///
    /// # Panics
    ///
    /// Panics if the handle is stale, the node has children, still has a
    /// parent, or is another node's clip.
    pub fn destroy_node(&mut self, id: NodeId) {
        self.validate(id);
        let idx = id.idx as usize;
        assert!(
            self.first_child[idx] == INVALID,
            "cannot destroy node with children"
        );
        assert!(self.parent[idx] == INVALID, "cannot destroy attached node");
        assert!(
            self.clip_owner[idx] == INVALID,
            "cannot destroy a node in use as a clip"
        );

        let clip = self.clip_node[idx];
        if clip != INVALID {
            self.clip_owner[clip as usize] = INVALID;
            self.clip_node[idx] = INVALID;
            let clip_id = self.id_at(clip);
            self.destroy_node(clip_id);
        }

        if let Some(mut filter) = self.cache_filter[idx].take() {
            self.released_rasters.extend(filter.dispose());
        }
        self.effect[idx] = None;
        self.kind[idx] = NodeKind::Group;
        self.removed[idx].clear();

        // Bump generation so old handles immediately fail validation.
        self.generation[idx] += 1;
        self.free_list.push(id.idx);
    }

    /// Returns whether the given handle refers to a live node.
    #[must_use]
    pub fn is_alive(&self, id: NodeId) -> bool {
        (id.idx < self.len)
            && self.generation[id.idx as usize] == id.generation
            && !self.free_list.contains(&id.idx)
    }

    /// Drains rasters whose owners were destroyed or stopped caching.
    ///
    /// The renderer hands these back to the backend once per frame.
    pub fn take_released_rasters(&mut self) -> Vec<RasterId> {
        core::mem::take(&mut self.released_rasters)
    }

    // -- Topology API --

    /// Inserts `child` into `group` at `index`, or appends when `index` is
    /// `None`.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale, `group` cannot hold children,
    /// `child` already has a parent or is a clip, or `index` is past the end.
    pub fn add_child(&mut self, group: NodeId, child: NodeId, index: Option<usize>) {
        self.validate(group);
        self.validate(child);
        let g = group.idx;
        let c = child.idx;
        assert!(
            self.kind[g as usize].is_group(),
            "{} nodes cannot have children",
            self.kind[g as usize].label()
        );
        assert!(
            self.parent[c as usize] == INVALID,
            "child already has a parent"
        );
        assert!(
            self.clip_owner[c as usize] == INVALID,
            "a clip node cannot also be a child"
        );
        assert!(g != c, "a node cannot be its own child");

        let count = self.children(group).count();
        let index = index.unwrap_or(count);
        assert!(
            index <= count,
            "child index {index} out of range (len {count})"
        );

        self.parent[c as usize] = g;
        self.prev_sibling[c as usize] = INVALID;
        self.next_sibling[c as usize] = INVALID;
        if index == 0 {
            let old_first = self.first_child[g as usize];
            self.first_child[g as usize] = c;
            self.next_sibling[c as usize] = old_first;
            if old_first != INVALID {
                self.prev_sibling[old_first as usize] = c;
            }
        } else {
            // Walk to the child currently at index - 1.
            let mut prev = self.first_child[g as usize];
            for _ in 1..index {
                prev = self.next_sibling[prev as usize];
            }
            let next = self.next_sibling[prev as usize];
            self.next_sibling[prev as usize] = c;
            self.prev_sibling[c as usize] = prev;
            self.next_sibling[c as usize] = next;
            if next != INVALID {
                self.prev_sibling[next as usize] = c;
            }
        }

        // A re-added child no longer needs its vacated area repainted.
        self.removed[g as usize].retain(|r| r.index != c);

        let gi = g as usize;
        self.dirty[c as usize] = DirtyFlag::Dirty;
        self.child_dirty[gi] = true;
        self.dirty_children_accumulated[gi] += 1;
        self.mark_tree_dirty_no_increment(g);
        self.geometry_changed_slot(g);
    }

    /// Detaches `child` from `group`, remembering the area it covered.
    ///
    /// # Panics
    ///
    /// Panics if either handle is stale or `child` is not a child of `group`.
    pub fn remove_child(&mut self, group: NodeId, child: NodeId) {
        self.validate(group);
        self.validate(child);
        let g = group.idx as usize;
        let c = child.idx;
        assert!(
            self.parent[c as usize] == group.idx,
            "node is not a child of this group"
        );

        let area = self.dirty_bounds[c as usize].or(self.transformed_bounds[c as usize]);
        self.unlink_from_parent(c);

        if !self.removed_overflow[g] && self.removed[g].len() < self.config.removed_children_threshold
        {
            if let Some(bounds) = area {
                self.removed[g].push(RemovedChild { index: c, bounds });
            }
            self.dirty_children_accumulated[g] += 1;
        } else {
            // Too many to track one by one; repaint the whole group.
            self.removed_overflow[g] = true;
            self.removed[g].clear();
            self.dirty_children_accumulated[g] = self.config.dirty_children_threshold + 1;
        }
        self.child_dirty[g] = true;
        self.mark_tree_dirty_no_increment(group.idx);
        self.geometry_changed_slot(group.idx);
    }

    /// Detaches every child of `group`; the next frame repaints the whole
    /// group area.
    pub fn clear_children(&mut self, group: NodeId) {
        self.validate(group);
        let g = group.idx;
        if self.first_child[g as usize] == INVALID {
            return;
        }
        while self.first_child[g as usize] != INVALID {
            let c = self.first_child[g as usize];
            self.unlink_from_parent(c);
        }
        let gi = g as usize;
        self.removed[gi].clear();
        self.dirty_children_accumulated[gi] = self.config.dirty_children_threshold + 1;
        self.child_dirty[gi] = true;
        self.mark_tree_dirty_no_increment(g);
        self.geometry_changed_slot(g);
    }

    /// Returns the parent of a node, if any.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt_id(self.parent[id.idx as usize])
    }

    /// Returns the node this node clips, if it is a clip.
    #[must_use]
    pub fn clip_owner(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt_id(self.clip_owner[id.idx as usize])
    }

    /// Returns an iterator over the direct children of a node in insertion
    /// order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> Children<'_> {
        self.validate(id);
        Children::new(self, self.first_child[id.idx as usize])
    }

    /// Returns the removed-child snapshots still waiting to be repainted.
    #[must_use]
    pub fn removed_children(&self, id: NodeId) -> &[RemovedChild] {
        self.validate(id);
        &self.removed[id.idx as usize]
    }

    // -- Property getters (read-only, no dirty marking) --

    /// Returns what the node draws.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        self.validate(id);
        &self.kind[id.idx as usize]
    }

    /// Returns the debug name.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.validate(id);
        self.name[id.idx as usize].as_deref()
    }

    /// Returns the local transform.
    #[must_use]
    pub fn transform(&self, id: NodeId) -> Transform3d {
        self.validate(id);
        self.transform[id.idx as usize]
    }

    /// Returns the untransformed content bounds.
    #[must_use]
    pub fn content_bounds(&self, id: NodeId) -> Option<Rect> {
        self.validate(id);
        self.content_bounds[id.idx as usize]
    }

    /// Returns the complete bounds in parent space.
    #[must_use]
    pub fn transformed_bounds(&self, id: NodeId) -> Option<Rect> {
        self.validate(id);
        self.transformed_bounds[id.idx as usize]
    }

    /// Returns the bounds owed a repaint since the last clean.
    #[must_use]
    pub fn dirty_bounds(&self, id: NodeId) -> Option<Rect> {
        self.validate(id);
        self.dirty_bounds[id.idx as usize]
    }

    /// Returns whether the node is visible.
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.validate(id);
        self.flags[id.idx as usize].visible
    }

    /// Returns the node flags.
    #[must_use]
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.validate(id);
        self.flags[id.idx as usize]
    }

    /// Returns the node opacity.
    #[must_use]
    pub fn opacity(&self, id: NodeId) -> f32 {
        self.validate(id);
        self.opacity[id.idx as usize]
    }

    /// Returns the view order.
    #[must_use]
    pub fn view_order(&self, id: NodeId) -> f64 {
        self.validate(id);
        self.view_order[id.idx as usize]
    }

    /// Returns the blend mode, `None` meaning pass-through.
    #[must_use]
    pub fn blend_mode(&self, id: NodeId) -> Option<BlendMode> {
        self.validate(id);
        self.blend_mode[id.idx as usize]
    }

    /// Returns the clip node.
    #[must_use]
    pub fn clip_node(&self, id: NodeId) -> Option<NodeId> {
        self.validate(id);
        self.opt_id(self.clip_node[id.idx as usize])
    }

    /// Returns the effect, if any.
    #[must_use]
    pub fn effect(&self, id: NodeId) -> Option<&Rc<dyn Effect>> {
        self.validate(id);
        self.effect[id.idx as usize].as_ref()
    }

    /// Returns the cache filter, if the node is cached as a bitmap.
    #[must_use]
    pub fn cache_filter(&self, id: NodeId) -> Option<&CacheFilter> {
        self.validate(id);
        self.cache_filter[id.idx as usize].as_ref()
    }

    /// Returns mutable access to the cache filter.
    pub fn cache_filter_mut(&mut self, id: NodeId) -> Option<&mut CacheFilter> {
        self.validate(id);
        self.cache_filter[id.idx as usize].as_mut()
    }

    /// Returns the culling bits from the last pre-culling pass.
    #[must_use]
    pub fn culling_bits(&self, id: NodeId) -> CullingBits {
        self.validate(id);
        self.culling_bits[id.idx as usize]
    }

    /// Returns the overdraw bits recorded while painting.
    #[must_use]
    pub fn painted_bits(&self, id: NodeId) -> u32 {
        self.validate(id);
        self.painted[id.idx as usize]
    }

    /// Records that region `region_index` painted this node.
    pub fn mark_painted(&mut self, id: NodeId, region_index: usize) {
        self.validate(id);
        let i = id.idx as usize;
        let shift = 2 * region_index;
        let count = (self.painted[i] >> shift) & 0b11;
        if count < 0b11 {
            self.painted[i] += 1 << shift;
        }
    }

    /// Resets the overdraw bits of every node.
    pub fn clear_painted(&mut self) {
        self.painted.fill(0);
    }

    // -- Mutation API (auto-marks dirty) --

    /// Sets the debug name.
    pub fn set_name(&mut self, id: NodeId, name: Option<String>) {
        self.validate(id);
        self.name[id.idx as usize] = name;
    }

    /// Shows or hides the node.
    pub fn set_visible(&mut self, id: NodeId, visible: bool) {
        self.validate(id);
        let i = id.idx as usize;
        if self.flags[i].visible != visible {
            self.flags[i].visible = visible;
            self.mark_dirty_slot(id.idx);
        }
    }

    /// Sets the untransformed content bounds. No dirty marking: the caller
    /// follows up with [`set_transformed_bounds`](Self::set_transformed_bounds)
    /// or [`update_bounds`](Self::update_bounds).
    pub fn set_content_bounds(&mut self, id: NodeId, bounds: Option<Rect>) {
        self.validate(id);
        self.content_bounds[id.idx as usize] = bounds;
    }

    /// Sets the complete bounds in parent space.
    ///
    /// The old and new bounds are both added to the dirty bounds. Unless the
    /// change came from a transform alone (which already marked the node),
    /// a node with visuals is marked dirty.
    pub fn set_transformed_bounds(
        &mut self,
        id: NodeId,
        bounds: Option<Rect>,
        by_transform_change_only: bool,
    ) {
        self.validate(id);
        let i = id.idx as usize;
        if self.transformed_bounds[i] == bounds {
            return;
        }
        let owed = crate::geom::union(self.dirty_bounds[i], self.transformed_bounds[i]);
        self.dirty_bounds[i] = crate::geom::union(owed, bounds);
        self.transformed_bounds[i] = bounds;
        if self.kind[i].has_visuals() && !by_transform_change_only {
            self.mark_dirty_slot(id.idx);
        }
    }

    /// Sets the local transform.
    ///
    /// When the parent caches itself as a bitmap and scroll caching is on, a
    /// change that only moves the node is recorded as a translation so the
    /// parent can shift its raster instead of regenerating it.
    pub fn set_transform(&mut self, id: NodeId, transform: Transform3d) {
        self.validate(id);
        let i = id.idx as usize;
        let old = self.transform[i];
        if old == transform {
            return;
        }
        let mut delta = None;
        let p = self.parent[i];
        if p != INVALID && self.cache_filter[p as usize].is_some() && self.config.scroll_cache_opt {
            if !self.translation_hint[i] {
                self.translation_hint[i] = true;
            } else if old.linear_eq(&transform) && old.cols[3][2] == transform.cols[3][2] {
                delta = Some((
                    transform.cols[3][0] - old.cols[3][0],
                    transform.cols[3][1] - old.cols[3][1],
                ));
            }
        }
        self.transform[i] = transform;
        match delta {
            Some((dx, dy)) => self.mark_dirty_by_translation(id.idx, dx, dy),
            None => self.mark_dirty_slot(id.idx),
        }
        self.invalidate_opaque_slot(id.idx);
    }

    /// Sets (or clears) the node's clip.
    ///
    /// # Panics
    ///
    /// Panics if `clip` is attached to a tree or already clips another node.
    pub fn set_clip_node(&mut self, id: NodeId, clip: Option<NodeId>) {
        self.validate(id);
        let i = id.idx as usize;
        let new = match clip {
            Some(c) => {
                self.validate(c);
                c.idx
            }
            None => INVALID,
        };
        if self.clip_node[i] == new {
            return;
        }
        if new != INVALID {
            assert!(
                self.parent[new as usize] == INVALID,
                "a tree child cannot also be a clip"
            );
            assert!(
                self.clip_owner[new as usize] == INVALID,
                "node already clips another node"
            );
            assert!(new != id.idx, "a node cannot clip itself");
        }
        let old = self.clip_node[i];
        if old != INVALID {
            self.clip_owner[old as usize] = INVALID;
        }
        if new != INVALID {
            self.clip_owner[new as usize] = id.idx;
        }
        self.clip_node[i] = new;
        self.visuals_changed_slot(id.idx);
        self.invalidate_opaque_slot(id.idx);
    }

    /// Sets the node opacity.
    ///
    /// # Panics
    ///
    /// Panics if `opacity` is outside `[0, 1]` or NaN.
    pub fn set_opacity(&mut self, id: NodeId, opacity: f32) {
        self.validate(id);
        assert!(
            (0.0..=1.0).contains(&opacity),
            "opacity {opacity} outside [0, 1]"
        );
        let i = id.idx as usize;
        let old = self.opacity[i];
        if old == opacity {
            return;
        }
        self.opacity[i] = opacity;
        self.mark_dirty_slot(id.idx);
        // Moving between two partial values leaves the opaque region alone.
        let was_partial = old < 1.0 && old > 0.0;
        let is_partial = opacity < 1.0 && opacity > 0.0;
        if (old < 1.0 && !is_partial) || (opacity < 1.0 && !was_partial) {
            self.invalidate_opaque_slot(id.idx);
        }
    }

    /// Sets the view order; lower values paint in front.
    pub fn set_view_order(&mut self, id: NodeId, view_order: f64) {
        self.validate(id);
        let i = id.idx as usize;
        if self.view_order[i] != view_order {
            self.view_order[i] = view_order;
            self.visuals_changed_slot(id.idx);
        }
    }

    /// Turns depth testing on or off for the node.
    pub fn set_depth_test(&mut self, id: NodeId, depth_test: bool) {
        self.validate(id);
        let i = id.idx as usize;
        if self.flags[i].depth_test != depth_test {
            self.flags[i].depth_test = depth_test;
            self.visuals_changed_slot(id.idx);
        }
    }

    /// Sets the node blend mode.
    pub fn set_blend_mode(&mut self, id: NodeId, mode: Option<BlendMode>) {
        self.validate(id);
        let i = id.idx as usize;
        if self.blend_mode[i] != mode {
            self.blend_mode[i] = mode;
            self.mark_dirty_slot(id.idx);
            self.invalidate_opaque_slot(id.idx);
        }
    }

    /// Turns bitmap caching on (with `hint`) or off.
    pub fn set_cached_as_bitmap(&mut self, id: NodeId, cached: bool, hint: CacheHint) {
        self.validate(id);
        let i = id.idx as usize;
        if cached {
            match &mut self.cache_filter[i] {
                None => {
                    self.cache_filter[i] = Some(CacheFilter::new(hint));
                    self.mark_dirty_slot(id.idx);
                }
                Some(filter) if !filter.matches_hint(hint) => {
                    filter.set_hint(hint);
                    self.mark_dirty_slot(id.idx);
                }
                Some(_) => {}
            }
        } else if let Some(mut filter) = self.cache_filter[i].take() {
            self.released_rasters.extend(filter.dispose());
            self.mark_dirty_slot(id.idx);
        }
    }

    /// Sets (or clears) the node effect.
    ///
    /// Ignored (treated as `None`) when effects are disabled in the config.
    pub fn set_effect(&mut self, id: NodeId, effect: Option<Rc<dyn Effect>>) {
        self.validate(id);
        let i = id.idx as usize;
        let effect = if self.config.disable_effects {
            None
        } else {
            effect
        };
        let same = match (&self.effect[i], &effect) {
            (Some(a), Some(b)) => Rc::ptr_eq(a, b),
            (None, None) => true,
            _ => false,
        };
        if same {
            return;
        }
        let presence_changed = self.effect[i].is_some() != effect.is_some();
        self.effect[i] = effect;
        self.visuals_changed_slot(id.idx);
        if presence_changed {
            self.invalidate_opaque_slot(id.idx);
        }
    }

    /// Notifies the node that its effect's parameters changed.
    pub fn effect_changed(&mut self, id: NodeId) {
        self.validate(id);
        self.visuals_changed_slot(id.idx);
    }

    /// Replaces the shape of a rectangle node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a rectangle.
    pub fn set_rect_shape(&mut self, id: NodeId, shape: RectShape) {
        self.validate(id);
        let i = id.idx as usize;
        match &mut self.kind[i] {
            NodeKind::Rect(s) => *s = shape,
            other => panic!("set_rect_shape on a {} node", other.label()),
        }
        self.content_bounds[i] = Some(shape.outline.bounds());
        self.geometry_changed_slot(id.idx);
    }

    /// Replaces the style of a region node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a region.
    pub fn set_region_style(&mut self, id: NodeId, style: RegionStyle) {
        self.validate(id);
        match &mut self.kind[id.idx as usize] {
            NodeKind::Region(s) => *s = style,
            other => panic!("set_region_style on a {} node", other.label()),
        }
        self.sync_region_content_bounds(id.idx);
        self.geometry_changed_slot(id.idx);
    }

    /// Resizes a region node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a region.
    pub fn set_region_size(&mut self, id: NodeId, width: f64, height: f64) {
        self.validate(id);
        match &mut self.kind[id.idx as usize] {
            NodeKind::Region(s) => {
                s.width = width;
                s.height = height;
            }
            other => panic!("set_region_size on a {} node", other.label()),
        }
        self.sync_region_content_bounds(id.idx);
        self.geometry_changed_slot(id.idx);
    }

    /// Sets the insets of a region's known-opaque area.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a region.
    pub fn set_opaque_insets(&mut self, id: NodeId, insets: Option<super::shape::Insets>) {
        self.validate(id);
        match &mut self.kind[id.idx as usize] {
            NodeKind::Region(s) => s.opaque_insets = insets,
            other => panic!("set_opaque_insets on a {} node", other.label()),
        }
        self.geometry_changed_slot(id.idx);
    }

    /// Replaces the content of an external-content node.
    ///
    /// # Panics
    ///
    /// Panics if the node is not a content node.
    pub fn set_content(&mut self, id: NodeId, content: Box<dyn NodeContent>) {
        self.validate(id);
        match &mut self.kind[id.idx as usize] {
            NodeKind::Content(c) => *c = content,
            other => panic!("set_content on a {} node", other.label()),
        }
        self.geometry_changed_slot(id.idx);
    }

    // -- Raw-index accessors --
    //
    // These accept raw slot indices (as found in trace events and
    // `RemovedChild`) rather than `NodeId` handles.

    /// Returns the current handle for raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn id_at(&self, idx: u32) -> NodeId {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        NodeId {
            idx,
            generation: self.generation[idx as usize],
        }
    }

    /// Returns the dirty flag at raw slot `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx >= self.len`.
    #[must_use]
    pub fn dirty_at(&self, idx: u32) -> DirtyFlag {
        assert!(
            idx < self.len,
            "slot index {idx} out of range (len {})",
            self.len
        );
        self.dirty[idx as usize]
    }

    // -- Internal helpers --

    /// Panics if the handle is stale.
    pub(crate) fn validate(&self, id: NodeId) {
        assert!(
            id.idx < self.len && self.generation[id.idx as usize] == id.generation,
            "stale NodeId: {id:?} (current gen: {})",
            if id.idx < self.len {
                self.generation[id.idx as usize]
            } else {
                u32::MAX
            }
        );
    }

    pub(crate) fn opt_id(&self, idx: u32) -> Option<NodeId> {
        (idx != INVALID).then(|| NodeId {
            idx,
            generation: self.generation[idx as usize],
        })
    }

    /// Tree parent, or the owner when `idx` is a clip.
    pub(crate) fn up(&self, idx: u32) -> u32 {
        let p = self.parent[idx as usize];
        if p != INVALID {
            p
        } else {
            self.clip_owner[idx as usize]
        }
    }

    fn sync_region_content_bounds(&mut self, idx: u32) {
        if let NodeKind::Region(style) = &self.kind[idx as usize] {
            self.content_bounds[idx as usize] = Some(Rect::new(0.0, 0.0, style.width, style.height));
        }
    }

    /// Removes `idx` from its parent's child list without touching dirty state.
    fn unlink_from_parent(&mut self, idx: u32) {
        let p = self.parent[idx as usize];
        let prev = self.prev_sibling[idx as usize];
        let next = self.next_sibling[idx as usize];

        if prev != INVALID {
            self.next_sibling[prev as usize] = next;
        } else {
            // Was first child.
            self.first_child[p as usize] = next;
        }

        if next != INVALID {
            self.prev_sibling[next as usize] = prev;
        }

        self.parent[idx as usize] = INVALID;
        self.prev_sibling[idx as usize] = INVALID;
        self.next_sibling[idx as usize] = INVALID;
        self.translation_hint[idx as usize] = false;
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec;

    use super::*;
    use crate::backend::Color;

    fn rect_node(store: &mut SceneStore, w: f64, h: f64) -> NodeId {
        store.create_rect(RectShape {
            outline: super::super::shape::Outline::Rect(Rect::new(0.0, 0.0, w, h)),
            fill: Color::WHITE,
        })
    }

    #[test]
    fn create_and_destroy() {
        let mut store = SceneStore::default();
        let id = store.create_group();
        assert!(store.is_alive(id));
        store.destroy_node(id);
        assert!(!store.is_alive(id));
    }

    #[test]
    fn generation_prevents_stale_access() {
        let mut store = SceneStore::default();
        let id1 = store.create_group();
        store.destroy_node(id1);
        let id2 = store.create_group();
        assert!(!store.is_alive(id1));
        assert!(store.is_alive(id2));
        assert_eq!(id1.idx, id2.idx);
        assert_ne!(id1.generation, id2.generation);
    }

    #[test]
    fn add_child_at_index() {
        let mut store = SceneStore::default();
        let g = store.create_group();
        let a = store.create_group();
        let b = store.create_group();
        let c = store.create_group();

        store.add_child(g, a, None);
        store.add_child(g, c, None);
        store.add_child(g, b, Some(1));

        let kids: Vec<_> = store.children(g).collect();
        assert_eq!(kids, vec![a, b, c]);
        assert_eq!(store.parent(b), Some(g));

        let d = store.create_group();
        store.add_child(g, d, Some(0));
        assert_eq!(store.children(g).next(), Some(d));
    }

    #[test]
    fn remove_child_records_vacated_area() {
        let mut store = SceneStore::default();
        let g = store.create_group();
        let r = rect_node(&mut store, 10.0, 10.0);
        store.add_child(g, r, None);
        store.set_transformed_bounds(r, Some(Rect::new(0.0, 0.0, 10.0, 10.0)), false);
        store.clear_dirty_tree(g);

        store.remove_child(g, r);
        assert_eq!(store.parent(r), None);
        assert_eq!(
            store.removed_children(g),
            &[RemovedChild {
                index: r.index(),
                bounds: Rect::new(0.0, 0.0, 10.0, 10.0)
            }]
        );
        assert!(store.is_child_dirty(g), "group must owe a repaint");
    }

    #[test]
    fn removed_snapshots_overflow_to_whole_group() {
        let mut store = SceneStore::new(EngineConfig {
            removed_children_threshold: 2,
            ..EngineConfig::default()
        });
        let g = store.create_group();
        let kids: Vec<_> = (0..3).map(|_| rect_node(&mut store, 1.0, 1.0)).collect();
        for &k in &kids {
            store.add_child(g, k, None);
            store.set_transformed_bounds(k, Some(Rect::new(0.0, 0.0, 1.0, 1.0)), false);
        }
        store.clear_dirty_tree(g);
        for &k in &kids {
            store.remove_child(g, k);
        }
        assert!(store.removed_children(g).is_empty());
        assert!(store.dirty_children_accumulated(g) > store.config().dirty_children_threshold);
    }

    #[test]
    fn clear_children_detaches_all() {
        let mut store = SceneStore::default();
        let g = store.create_group();
        let a = store.create_group();
        let b = store.create_group();
        store.add_child(g, a, None);
        store.add_child(g, b, None);
        store.clear_children(g);
        assert!(store.children(g).next().is_none());
        assert_eq!(store.parent(a), None);
    }

    #[test]
    fn clip_links_are_separate_from_parent() {
        let mut store = SceneStore::default();
        let g = store.create_group();
        let clip = rect_node(&mut store, 5.0, 5.0);
        store.set_clip_node(g, Some(clip));
        assert_eq!(store.clip_node(g), Some(clip));
        assert_eq!(store.clip_owner(clip), Some(g));
        assert_eq!(store.parent(clip), None);
        store.set_clip_node(g, None);
        assert_eq!(store.clip_owner(clip), None);
    }

    #[test]
    fn destroy_takes_clip_along() {
        let mut store = SceneStore::default();
        let g = store.create_group();
        let clip = rect_node(&mut store, 5.0, 5.0);
        store.set_clip_node(g, Some(clip));
        store.destroy_node(g);
        assert!(!store.is_alive(clip));
    }

    #[test]
    fn disabling_cache_queues_raster_release() {
        let mut store = SceneStore::default();
        let g = store.create_group();
        store.set_cached_as_bitmap(g, true, CacheHint::Default);
        store
            .cache_filter_mut(g)
            .expect("cached")
            .attach_raster_for_test(RasterId(7));
        store.set_cached_as_bitmap(g, false, CacheHint::Default);
        assert!(store.cache_filter(g).is_none());
        assert_eq!(store.take_released_rasters(), vec![RasterId(7)]);
        assert!(store.take_released_rasters().is_empty());
    }

    #[test]
    fn overdraw_counts_saturate() {
        let mut store = SceneStore::default();
        let n = store.create_group();
        for _ in 0..5 {
            store.mark_painted(n, 1);
        }
        store.mark_painted(n, 0);
        assert_eq!(store.painted_bits(n), 0b11_01);
        store.clear_painted();
        assert_eq!(store.painted_bits(n), 0);
    }

    #[test]
    #[should_panic(expected = "child already has a parent")]
    fn double_parent_panics() {
        let mut store = SceneStore::default();
        let g1 = store.create_group();
        let g2 = store.create_group();
        let c = store.create_group();
        store.add_child(g1, c, None);
        store.add_child(g2, c, None);
    }

    #[test]
    #[should_panic(expected = "cannot have children")]
    fn rect_cannot_hold_children() {
        let mut store = SceneStore::default();
        let r = rect_node(&mut store, 1.0, 1.0);
        let c = store.create_group();
        store.add_child(r, c, None);
    }

    #[test]
    #[should_panic(expected = "cannot destroy node with children")]
    fn destroy_with_children_panics() {
        let mut store = SceneStore::default();
        let parent = store.create_group();
        let child = store.create_group();
        store.add_child(parent, child, None);
        store.destroy_node(parent);
    }

    #[test]
    #[should_panic(expected = "opacity")]
    fn opacity_out_of_range_panics() {
        let mut store = SceneStore::default();
        let n = store.create_group();
        store.set_opacity(n, 1.5);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_set_transform() {
        let mut store = SceneStore::default();
        let id = store.create_group();
        store.destroy_node(id);
        store.set_transform(id, Transform3d::IDENTITY);
    }

    #[test]
    #[should_panic(expected = "stale NodeId")]
    fn destroyed_handle_panics_on_parent() {
        let mut store = SceneStore::default();
        let id = store.create_group();
        store.destroy_node(id);
        let _ = store.parent(id);
    }
}
