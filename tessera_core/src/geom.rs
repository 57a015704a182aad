// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle helpers shared by dirty-region, culling and occlusion code.
//!
//! Bounds throughout the crate are `Option<Rect>`, with `None` meaning
//! "empty". A zero-area `Rect` is *not* empty: a degenerate line still has a
//! position that can be dirtied.

use kurbo::{Point, Rect};

/// Unions two optional bounds; `None` is the identity.
#[must_use]
pub fn union(a: Option<Rect>, b: Option<Rect>) -> Option<Rect> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.union(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Intersects two rectangles, returning `None` when they do not overlap.
#[must_use]
pub fn intersect(a: Rect, b: Rect) -> Option<Rect> {
    let r = Rect::new(a.x0.max(b.x0), a.y0.max(b.y0), a.x1.min(b.x1), a.y1.min(b.y1));
    (r.x0 <= r.x1 && r.y0 <= r.y1).then_some(r)
}

/// Returns whether the two rectangles share any point (edges included).
#[must_use]
pub fn intersects(a: Rect, b: Rect) -> bool {
    a.x0 <= b.x1 && b.x0 <= a.x1 && a.y0 <= b.y1 && b.y0 <= a.y1
}

/// Returns whether `outer` fully contains `inner`.
#[must_use]
pub fn contains(outer: Rect, inner: Rect) -> bool {
    outer.x0 <= inner.x0 && outer.y0 <= inner.y0 && outer.x1 >= inner.x1 && outer.y1 >= inner.y1
}

/// Expands `r` outward to whole-pixel coordinates.
#[must_use]
pub fn round_out(r: Rect) -> Rect {
    Rect::new(r.x0.floor(), r.y0.floor(), r.x1.ceil(), r.y1.ceil())
}

/// Returns whether `p` lies inside the convex quad `q` (edges inclusive).
///
/// The quad may be wound either way; the point is inside when every edge
/// cross product has the same sign (or is zero). A point collinear with all
/// four edges (a degenerate quad) is outside.
#[must_use]
pub fn point_in_convex_quad(p: Point, q: &[Point; 4]) -> bool {
    let mut pos = false;
    let mut neg = false;
    for i in 0..4 {
        let a = q[i];
        let b = q[(i + 1) % 4];
        let cross = (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x);
        if cross > 0.0 {
            pos = true;
        } else if cross < 0.0 {
            neg = true;
        }
        if pos && neg {
            return false;
        }
    }
    pos || neg
}

/// Returns whether `region` lies inside the convex quad `q`.
#[must_use]
pub fn rect_in_convex_quad(region: Rect, q: &[Point; 4]) -> bool {
    [
        Point::new(region.x0, region.y0),
        Point::new(region.x1, region.y0),
        Point::new(region.x1, region.y1),
        Point::new(region.x0, region.y1),
    ]
    .into_iter()
    .all(|p| point_in_convex_quad(p, q))
}
