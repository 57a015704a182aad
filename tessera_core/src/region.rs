// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bounded dirty-region sets and their scratch pool.
//!
//! A [`DirtyRegionContainer`] holds at most `capacity` pairwise-disjoint
//! rectangles. Adding a rectangle first absorbs every region it touches;
//! when the container is full, the pair whose union wastes the least area is
//! merged to make room. The container therefore never grows past its
//! capacity no matter how many disjoint changes a frame has.
//!
//! Accumulation recursion needs short-lived scratch containers for subtrees
//! with effects or clips. [`DirtyRegionPool`] hands those out through
//! [`with_container`](DirtyRegionPool::with_container), which returns the
//! container on every exit path.

use alloc::vec::Vec;

use kurbo::Rect;

use crate::config::MAX_DIRTY_REGIONS;
use crate::geom;
use crate::transform::Transform3d;

/// A capped set of disjoint dirty rectangles in a single coordinate space.
#[derive(Clone, Debug, PartialEq)]
pub struct DirtyRegionContainer {
    regions: Vec<Rect>,
    capacity: usize,
}

impl DirtyRegionContainer {
    /// Creates an empty container.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is zero or exceeds [`MAX_DIRTY_REGIONS`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(
            (1..=MAX_DIRTY_REGIONS).contains(&capacity),
            "dirty region capacity {capacity} outside 1..={MAX_DIRTY_REGIONS}"
        );
        Self {
            regions: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Maximum number of regions.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of regions currently held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Is the container empty?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Returns region `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    #[must_use]
    pub fn region(&self, i: usize) -> Rect {
        self.regions[i]
    }

    /// Returns all regions.
    #[must_use]
    pub fn regions(&self) -> &[Rect] {
        &self.regions
    }

    /// Returns the union of all regions.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect> {
        self.regions.iter().copied().reduce(|a, b| a.union(b))
    }

    /// Removes every region.
    pub fn clear(&mut self) {
        self.regions.clear();
    }

    /// Empties the container and changes its capacity.
    ///
    /// # Panics
    ///
    /// Panics under the same conditions as [`new`](Self::new).
    pub fn reset(&mut self, capacity: usize) {
        assert!(
            (1..=MAX_DIRTY_REGIONS).contains(&capacity),
            "dirty region capacity {capacity} outside 1..={MAX_DIRTY_REGIONS}"
        );
        self.regions.clear();
        self.capacity = capacity;
    }

    /// Adds `region`, merging as needed to keep regions disjoint and within
    /// capacity. Non-finite rectangles are ignored.
    pub fn add_dirty_region(&mut self, region: Rect) {
        if !(region.x0.is_finite()
            && region.y0.is_finite()
            && region.x1.is_finite()
            && region.y1.is_finite())
            || region.x1 < region.x0
            || region.y1 < region.y0
        {
            return;
        }
        let region = self.absorb(region);
        if self.regions.len() < self.capacity {
            self.regions.push(region);
            return;
        }
        if self.capacity == 1 {
            self.regions[0] = self.regions[0].union(region);
            return;
        }
        self.regions.push(region);
        self.compress();
    }

    /// Adds every region of `other`.
    pub fn merge(&mut self, other: &Self) {
        for &r in &other.regions {
            self.add_dirty_region(r);
        }
    }

    /// Replaces the contents with a copy of `other`'s regions, keeping this
    /// container's capacity.
    pub fn copy_from(&mut self, other: &Self) {
        self.regions.clear();
        self.merge(other);
    }

    /// Clips every region to `clip`, dropping those left empty.
    pub fn intersect_with(&mut self, clip: Rect) {
        self.regions.retain_mut(|r| match geom::intersect(*r, clip) {
            Some(i) => {
                *r = i;
                true
            }
            None => false,
        });
    }

    /// Maps every region through `tx` (bounding box of the result).
    pub fn apply_transform(&mut self, tx: &Transform3d) {
        if tx.is_identity() {
            return;
        }
        self.map_regions(|r| tx.transform_rect(r));
    }

    /// Replaces each region with `f(region)` and re-establishes
    /// disjointness.
    pub fn map_regions(&mut self, mut f: impl FnMut(Rect) -> Rect) {
        let old = core::mem::take(&mut self.regions);
        for r in old {
            self.add_dirty_region(f(r));
        }
    }

    /// Overwrites region `i`.
    ///
    /// # Panics
    ///
    /// Panics if `i >= len()`.
    pub fn set_region(&mut self, i: usize, region: Rect) {
        self.regions[i] = region;
    }

    /// Removes every region that `region` touches and returns the union.
    fn absorb(&mut self, mut region: Rect) -> Rect {
        loop {
            let before = self.regions.len();
            self.regions.retain(|r| {
                if geom::intersects(*r, region) {
                    region = region.union(*r);
                    false
                } else {
                    true
                }
            });
            if self.regions.len() == before {
                return region;
            }
        }
    }

    /// Merges the cheapest pair until the container is back within capacity.
    fn compress(&mut self) {
        while self.regions.len() > self.capacity {
            let mut best = (0, 1);
            let mut best_cost = f64::INFINITY;
            for i in 0..self.regions.len() {
                for j in i + 1..self.regions.len() {
                    let a = self.regions[i];
                    let b = self.regions[j];
                    let cost = a.union(b).area() - a.area() - b.area();
                    if cost < best_cost {
                        best_cost = cost;
                        best = (i, j);
                    }
                }
            }
            let (i, j) = best;
            let b = self.regions.swap_remove(j);
            let a = self.regions.swap_remove(i);
            let merged = self.absorb(a.union(b));
            self.regions.push(merged);
        }
    }
}

/// A stack of reusable scratch containers.
#[derive(Debug)]
pub struct DirtyRegionPool {
    free: Vec<DirtyRegionContainer>,
    capacity: usize,
    outstanding: usize,
}

impl DirtyRegionPool {
    /// Creates a pool whose containers have the given capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            free: Vec::new(),
            capacity,
            outstanding: 0,
        }
    }

    /// Number of containers currently checked out.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Runs `f` with an empty scratch container and returns the container to
    /// the pool afterwards, however `f` exits.
    pub fn with_container<R>(
        &mut self,
        f: impl FnOnce(&mut Self, &mut DirtyRegionContainer) -> R,
    ) -> R {
        let mut container = self
            .free
            .pop()
            .unwrap_or_else(|| DirtyRegionContainer::new(self.capacity));
        container.reset(self.capacity);
        self.outstanding += 1;
        let out = f(self, &mut container);
        self.outstanding -= 1;
        self.free.push(container);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(x0: f64, y0: f64, x1: f64, y1: f64) -> Rect {
        Rect::new(x0, y0, x1, y1)
    }

    #[test]
    fn overlapping_regions_merge() {
        let mut c = DirtyRegionContainer::new(6);
        c.add_dirty_region(r(0.0, 0.0, 10.0, 10.0));
        c.add_dirty_region(r(5.0, 5.0, 15.0, 15.0));
        assert_eq!(c.regions(), &[r(0.0, 0.0, 15.0, 15.0)]);
    }

    #[test]
    fn bridging_region_merges_transitively() {
        let mut c = DirtyRegionContainer::new(6);
        c.add_dirty_region(r(0.0, 0.0, 10.0, 10.0));
        c.add_dirty_region(r(20.0, 0.0, 30.0, 10.0));
        assert_eq!(c.len(), 2);
        c.add_dirty_region(r(9.0, 0.0, 21.0, 5.0));
        assert_eq!(c.regions(), &[r(0.0, 0.0, 30.0, 10.0)]);
    }

    #[test]
    fn cap_is_never_exceeded() {
        let mut c = DirtyRegionContainer::new(15);
        for i in 0..1000 {
            let x = f64::from(i % 40) * 30.0;
            let y = f64::from(i / 40) * 30.0;
            c.add_dirty_region(r(x, y, x + 10.0, y + 10.0));
            assert!(c.len() <= 15, "len {} after {i} adds", c.len());
        }
        let all = c.bounds().expect("non-empty");
        assert!(geom::contains(all, r(0.0, 0.0, 10.0, 10.0)));
        for (i, a) in c.regions().iter().enumerate() {
            for b in &c.regions()[i + 1..] {
                assert!(!geom::intersects(*a, *b), "{a:?} overlaps {b:?}");
            }
        }
    }

    #[test]
    fn compress_prefers_cheap_pair() {
        let mut c = DirtyRegionContainer::new(2);
        c.add_dirty_region(r(0.0, 0.0, 10.0, 10.0));
        c.add_dirty_region(r(100.0, 100.0, 110.0, 110.0));
        c.add_dirty_region(r(12.0, 0.0, 20.0, 10.0));
        assert_eq!(c.len(), 2);
        assert!(c.regions().contains(&r(0.0, 0.0, 20.0, 10.0)));
        assert!(c.regions().contains(&r(100.0, 100.0, 110.0, 110.0)));
    }

    #[test]
    fn single_slot_unions_everything() {
        let mut c = DirtyRegionContainer::new(1);
        c.add_dirty_region(r(0.0, 0.0, 1.0, 1.0));
        c.add_dirty_region(r(5.0, 5.0, 6.0, 6.0));
        assert_eq!(c.regions(), &[r(0.0, 0.0, 6.0, 6.0)]);
    }

    #[test]
    fn invalid_regions_are_ignored() {
        let mut c = DirtyRegionContainer::new(4);
        c.add_dirty_region(r(0.0, 0.0, f64::NAN, 1.0));
        c.add_dirty_region(r(5.0, 5.0, 1.0, 1.0));
        assert!(c.is_empty());
    }

    #[test]
    fn intersect_drops_outside() {
        let mut c = DirtyRegionContainer::new(4);
        c.add_dirty_region(r(0.0, 0.0, 10.0, 10.0));
        c.add_dirty_region(r(50.0, 50.0, 60.0, 60.0));
        c.intersect_with(r(5.0, 5.0, 20.0, 20.0));
        assert_eq!(c.regions(), &[r(5.0, 5.0, 10.0, 10.0)]);
    }

    #[test]
    fn transform_maps_regions() {
        let mut c = DirtyRegionContainer::new(4);
        c.add_dirty_region(r(0.0, 0.0, 10.0, 10.0));
        c.apply_transform(&Transform3d::from_translation(3.0, 4.0, 0.0));
        assert_eq!(c.regions(), &[r(3.0, 4.0, 13.0, 14.0)]);
    }

    #[test]
    fn pool_returns_containers() {
        let mut pool = DirtyRegionPool::new(4);
        let inner_len = pool.with_container(|pool, outer| {
            outer.add_dirty_region(r(0.0, 0.0, 1.0, 1.0));
            assert_eq!(pool.outstanding(), 1);
            pool.with_container(|pool, inner| {
                assert_eq!(pool.outstanding(), 2);
                assert!(inner.is_empty(), "scratch must start empty");
                inner.len()
            })
        });
        assert_eq!(inner_len, 0);
        assert_eq!(pool.outstanding(), 0);
        pool.with_container(|_, c| assert!(c.is_empty(), "recycled container must be cleared"));
    }

    #[test]
    #[should_panic(expected = "dirty region capacity")]
    fn zero_capacity_panics() {
        let _ = DirtyRegionContainer::new(0);
    }
}
