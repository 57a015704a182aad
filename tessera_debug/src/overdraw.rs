// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Per-pixel overdraw counting.
//!
//! With [`show_overdraw`](tessera_core::config::EngineConfig::show_overdraw)
//! on, the painter records how often each node was painted in each dirty
//! region. [`OverdrawMap`] turns those counters into a pixel grid over one
//! region, so hot spots where many layers stack up can be found.

use kurbo::Rect;
use tessera_core::node::{NodeId, SceneStore};
use tessera_core::transform::Transform3d;

/// How heavily a pixel was painted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OverdrawLevel {
    /// Painted at most once.
    Low,
    /// Painted two or three times.
    Medium,
    /// Painted four or more times.
    High,
}

impl OverdrawLevel {
    /// Classifies a paint count.
    #[must_use]
    pub fn from_count(count: u8) -> Self {
        match count {
            0 | 1 => Self::Low,
            2 | 3 => Self::Medium,
            _ => Self::High,
        }
    }
}

/// Paint counts for every pixel of one dirty region.
#[derive(Clone, Debug)]
pub struct OverdrawMap {
    x0: i64,
    y0: i64,
    width: usize,
    height: usize,
    counts: Vec<u8>,
}

impl OverdrawMap {
    /// Creates an empty map covering `clip`, rounded out to whole pixels.
    #[must_use]
    pub fn new(clip: Rect) -> Self {
        let clip = clip.expand();
        let (x0, y0) = (to_pixel(clip.x0), to_pixel(clip.y0));
        let width = to_len(clip.width());
        let height = to_len(clip.height());
        Self {
            x0,
            y0,
            width,
            height,
            counts: vec![0; width * height],
        }
    }

    /// Width in pixels.
    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Adds every node under `root` that region `region_index` painted.
    ///
    /// Each painted node covers its content bounds in scene space; a node
    /// painted several times in the region counts that many times.
    pub fn accumulate(&mut self, store: &SceneStore, root: NodeId, region_index: usize) {
        self.visit(store, root, &Transform3d::IDENTITY, region_index);
    }

    fn visit(&mut self, store: &SceneStore, id: NodeId, tx: &Transform3d, region_index: usize) {
        let tx = *tx * store.transform(id);
        let times = (store.painted_bits(id) >> (2 * region_index)) & 0b11;
        if times != 0
            && let Some(bounds) = store.content_bounds(id)
        {
            #[expect(
                clippy::cast_possible_truncation,
                reason = "painted counters are two bits wide"
            )]
            let times = times as u8;
            self.add(tx.transform_rect(bounds), times);
        }
        for child in store.children(id) {
            self.visit(store, child, &tx, region_index);
        }
    }

    fn add(&mut self, bounds: Rect, times: u8) {
        let rel = Rect::new(
            bounds.x0 - self.x0 as f64,
            bounds.y0 - self.y0 as f64,
            bounds.x1 - self.x0 as f64,
            bounds.y1 - self.y0 as f64,
        )
        .round()
        .intersect(Rect::new(0.0, 0.0, self.width as f64, self.height as f64));
        if rel.width() <= 0.0 || rel.height() <= 0.0 {
            return;
        }
        let (x0, x1) = (to_len(rel.x0), to_len(rel.x1));
        for y in to_len(rel.y0)..to_len(rel.y1) {
            let row = &mut self.counts[y * self.width..(y + 1) * self.width];
            for c in &mut row[x0..x1] {
                *c = c.saturating_add(times);
            }
        }
    }

    /// Returns the paint count at scene pixel `(x, y)`, or `None` outside the
    /// map.
    #[must_use]
    pub fn count_at(&self, x: i64, y: i64) -> Option<u8> {
        let col = usize::try_from(x - self.x0).ok()?;
        let row = usize::try_from(y - self.y0).ok()?;
        if col >= self.width || row >= self.height {
            return None;
        }
        Some(self.counts[row * self.width + col])
    }

    /// Returns how many pixels fall into each level, as `[low, medium, high]`.
    #[must_use]
    pub fn histogram(&self) -> [usize; 3] {
        let mut out = [0; 3];
        for &c in &self.counts {
            let slot = match OverdrawLevel::from_count(c) {
                OverdrawLevel::Low => 0,
                OverdrawLevel::Medium => 1,
                OverdrawLevel::High => 2,
            };
            out[slot] += 1;
        }
        out
    }

    /// Largest paint count in the map.
    #[must_use]
    pub fn max_count(&self) -> u8 {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "scene coordinates are far inside the i64 range"
)]
fn to_pixel(v: f64) -> i64 {
    v as i64
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "non-negative pixel extents of a dirty region"
)]
fn to_len(v: f64) -> usize {
    v.max(0.0) as usize
}

#[cfg(test)]
mod tests {
    use tessera_core::backend::Color;
    use tessera_core::node::{Outline, RectShape};

    use super::*;

    fn rect(store: &mut SceneStore, r: Rect) -> NodeId {
        store.create_rect(RectShape {
            outline: Outline::Rect(r),
            fill: Color::WHITE,
        })
    }

    #[test]
    fn stacked_nodes_raise_the_count() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let a = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        let b = rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        store.add_child(root, a, None);
        store.add_child(root, b, None);
        store.set_transform(b, Transform3d::from_translation(5.0, 0.0, 0.0));
        store.update_bounds(root);
        store.mark_painted(a, 0);
        store.mark_painted(b, 0);
        store.mark_painted(b, 0);
        store.mark_painted(b, 1);

        let mut map = OverdrawMap::new(Rect::new(0.0, 0.0, 20.0, 10.0));
        map.accumulate(&store, root, 0);
        assert_eq!(map.count_at(0, 0), Some(1));
        assert_eq!(map.count_at(7, 3), Some(3));
        assert_eq!(map.count_at(12, 9), Some(2));
        assert_eq!(map.count_at(17, 0), Some(0));
        assert_eq!(map.count_at(20, 0), None);
        assert_eq!(map.max_count(), 3);
        assert_eq!(map.histogram(), [5 * 10 + 5 * 10, 10 * 10, 0]);
    }

    #[test]
    fn nodes_outside_the_map_are_clipped() {
        let mut store = SceneStore::default();
        let n = rect(&mut store, Rect::new(-50.0, -50.0, 5.0, 5.0));
        store.update_bounds(n);
        store.mark_painted(n, 2);

        let mut map = OverdrawMap::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        map.accumulate(&store, n, 0);
        assert_eq!(map.max_count(), 0);
        map.accumulate(&store, n, 2);
        assert_eq!(map.count_at(4, 4), Some(1));
        assert_eq!(map.count_at(5, 5), Some(0));
        assert_eq!(map.histogram(), [100, 0, 0]);
        assert_eq!(OverdrawLevel::from_count(7), OverdrawLevel::High);
    }
}
