// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pre-culling: classifying every node against every dirty region before
//! painting.
//!
//! Each node gets two bits per region (up to [`MAX_DIRTY_REGIONS`]):
//! `01` when its bounds cross the region's edge and `10` when the region
//! contains them. Painting region `i` skips any node whose bits for `i` are
//! zero, and stops checking below a node the region contains.

use core::fmt;

use crate::config::MAX_DIRTY_REGIONS;
use crate::geom;
use crate::node::{INVALID, NodeId, SceneStore};
use crate::region::DirtyRegionContainer;
use crate::transform::Transform3d;

/// Two bits per dirty region describing how a node relates to it.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct CullingBits(u32);

impl CullingBits {
    /// Outside every region.
    pub const NONE: Self = Self(0);

    /// The region crosses the node's bounds.
    pub const INTERSECTS: u32 = 0b01;
    /// The region contains the node's bounds.
    pub const CONTAINS: u32 = 0b10;

    /// Wraps raw bits.
    #[must_use]
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits)
    }

    /// Returns the raw bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Returns the two bits for region `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i` is not below [`MAX_DIRTY_REGIONS`].
    #[must_use]
    pub fn region(self, i: usize) -> u32 {
        assert!(
            i < MAX_DIRTY_REGIONS,
            "culling index {i} out of range (max {MAX_DIRTY_REGIONS})"
        );
        (self.0 >> (2 * i)) & 0b11
    }

    /// Does the node touch region `i` at all?
    #[must_use]
    pub fn touches(self, i: usize) -> bool {
        self.region(i) != 0
    }

    /// Does region `i` cross the node's bounds without containing them?
    #[must_use]
    pub fn intersects(self, i: usize) -> bool {
        self.region(i) & Self::INTERSECTS != 0
    }

    /// Is the node wholly inside region `i`?
    #[must_use]
    pub fn contained(self, i: usize) -> bool {
        self.region(i) & Self::CONTAINS != 0
    }

    /// Is the node outside every region?
    #[must_use]
    pub fn is_culled(self) -> bool {
        self.0 == 0
    }

    fn with(self, i: usize, bits: u32) -> Self {
        Self(self.0 | (bits << (2 * i)))
    }
}

impl fmt::Debug for CullingBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CullingBits({:#b})", self.0)
    }
}

impl SceneStore {
    /// Computes culling bits for `root` and its subtree against `regions`.
    ///
    /// `tx` maps the root's parent space to the scene, and `pv` is the
    /// camera projection. Dirty nodes culled out of every region are
    /// cleaned, since nothing will paint them this frame.
    pub fn pre_cull(
        &mut self,
        root: NodeId,
        regions: &DirtyRegionContainer,
        tx: &Transform3d,
        pv: &Transform3d,
    ) {
        self.validate(root);
        self.mark_cull_regions(root.idx, regions, None, tx, pv);
    }

    fn mark_cull_regions(
        &mut self,
        idx: u32,
        regions: &DirtyRegionContainer,
        parent_bits: Option<CullingBits>,
        tx: &Transform3d,
        pv: &Transform3d,
    ) {
        let i = idx as usize;
        let bounds = self.transformed_bounds[i].map(|b| {
            let b = if tx.is_identity() {
                b
            } else {
                tx.transform_rect(b)
            };
            if pv.is_identity() {
                b
            } else {
                pv.transform_rect(b)
            }
        });

        let mut bits = CullingBits::NONE;
        if let Some(bounds) = bounds {
            for (r, region) in regions.regions().iter().enumerate() {
                if region.is_zero_area() {
                    break;
                }
                // Only nodes inside a parent that merely intersects are
                // classified; the root has no parent gate.
                let gate = parent_bits.is_none_or(|p| p.intersects(r));
                if gate && geom::intersects(*region, bounds) {
                    let b = if geom::contains(*region, bounds) {
                        CullingBits::CONTAINS
                    } else {
                        CullingBits::INTERSECTS
                    };
                    bits = bits.with(r, b);
                }
            }
        }
        self.culling_bits[i] = bits;

        if bits.is_culled() && !self.is_clean_slot(idx) {
            self.clear_dirty_tree_slot(idx);
        }

        if !self.kind[i].is_group() {
            return;
        }
        // Children of a group a region contains are painted unconditionally.
        if !(0..regions.len()).any(|r| bits.intersects(r)) {
            return;
        }
        let child_tx = *tx * self.transform[i];
        let mut c = self.first_child[i];
        while c != INVALID {
            self.mark_cull_regions(c, regions, Some(bits), &child_tx, pv);
            c = self.next_sibling[c as usize];
        }
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;

    use super::*;
    use crate::backend::Color;
    use crate::node::{Outline, RectShape};

    fn rect(store: &mut SceneStore, r: Rect) -> NodeId {
        store.create_rect(RectShape {
            outline: Outline::Rect(r),
            fill: Color::WHITE,
        })
    }

    #[test]
    fn bits_encode_per_region() {
        let b = CullingBits::NONE
            .with(0, CullingBits::INTERSECTS)
            .with(2, CullingBits::CONTAINS);
        assert!(b.intersects(0));
        assert!(!b.contained(0));
        assert!(!b.intersects(1));
        assert!(b.contained(2));
        assert!(b.touches(2));
        assert!(!b.intersects(2));
        assert_eq!(b.bits(), 0b10_00_01);
    }

    #[test]
    fn nodes_are_classified_against_each_region() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let inside = rect(&mut store, Rect::new(10.0, 10.0, 20.0, 20.0));
        let across = rect(&mut store, Rect::new(40.0, 0.0, 60.0, 10.0));
        let outside = rect(&mut store, Rect::new(200.0, 200.0, 210.0, 210.0));
        for n in [inside, across, outside] {
            store.add_child(root, n, None);
        }
        store.update_bounds(root);

        let mut regions = DirtyRegionContainer::new(4);
        regions.add_dirty_region(Rect::new(0.0, 0.0, 50.0, 50.0));
        regions.add_dirty_region(Rect::new(100.0, 100.0, 150.0, 150.0));
        store.pre_cull(root, &regions, &Transform3d::IDENTITY, &Transform3d::IDENTITY);

        assert!(store.culling_bits(root).intersects(0));
        assert!(store.culling_bits(root).touches(1));
        assert!(store.culling_bits(inside).contained(0));
        assert!(store.culling_bits(across).intersects(0));
        assert!(!store.culling_bits(across).contained(0));
        assert!(store.culling_bits(outside).is_culled());
    }

    #[test]
    fn culled_dirty_nodes_are_cleaned() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let far = rect(&mut store, Rect::new(500.0, 500.0, 510.0, 510.0));
        let near = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        store.add_child(root, far, None);
        store.add_child(root, near, None);
        store.update_bounds(root);
        assert!(!store.is_clean(far));

        let mut regions = DirtyRegionContainer::new(2);
        regions.add_dirty_region(Rect::new(0.0, 0.0, 20.0, 20.0));
        store.pre_cull(root, &regions, &Transform3d::IDENTITY, &Transform3d::IDENTITY);
        assert!(store.is_clean(far));
        assert!(!store.is_clean(near));
    }

    #[test]
    fn contained_group_children_are_not_reclassified() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let g = store.create_group();
        let leaf = rect(&mut store, Rect::new(0.0, 0.0, 5.0, 5.0));
        store.add_child(root, g, None);
        store.add_child(g, leaf, None);
        store.update_bounds(root);

        let mut regions = DirtyRegionContainer::new(2);
        regions.add_dirty_region(Rect::new(-10.0, -10.0, 100.0, 100.0));
        store.pre_cull(root, &regions, &Transform3d::IDENTITY, &Transform3d::IDENTITY);
        assert!(store.culling_bits(root).contained(0));
        // The root is wholly inside, so its descendants keep stale bits.
        assert_eq!(store.culling_bits(leaf), CullingBits::NONE);
    }

    #[test]
    #[should_panic(expected = "culling index")]
    fn index_past_max_panics() {
        let _ = CullingBits::NONE.region(MAX_DIRTY_REGIONS);
    }
}
