// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Opaque regions: the local-space rectangle a node is known to cover with
//! fully opaque pixels.
//!
//! The region is cached per node and recomputed lazily after
//! [`invalidate_opaque_slot`](SceneStore::invalidate_opaque_slot). Nodes with
//! an effect are always recomputed, since effect parameters can change
//! without the node hearing about it.

use kurbo::Rect;

use crate::backend::BlendMode;
use crate::geom;

use super::id::{INVALID, NodeId};
use super::shape::NodeKind;
use super::store::SceneStore;

impl SceneStore {
    /// Returns the node's opaque region in local coordinates, recomputing it
    /// if needed.
    pub fn opaque_region(&mut self, id: NodeId) -> Option<Rect> {
        self.validate(id);
        self.opaque_region_slot(id.idx)
    }

    /// Returns whether the cached opaque region must be recomputed.
    #[must_use]
    pub fn is_opaque_region_invalid(&self, id: NodeId) -> bool {
        self.validate(id);
        self.opaque_region_invalid[id.idx as usize]
    }

    pub(crate) fn invalidate_opaque_slot(&mut self, idx: u32) {
        self.opaque_region_invalid[idx as usize] = true;
        let owner = self.clip_owner[idx as usize];
        if owner != INVALID {
            self.invalidate_opaque_slot(owner);
        }
    }

    pub(crate) fn opaque_region_slot(&mut self, idx: u32) -> Option<Rect> {
        let i = idx as usize;
        if !self.opaque_region_invalid[i] && self.effect[i].is_none() {
            return self.opaque_region[i];
        }
        self.opaque_region_invalid[i] = false;
        self.opaque_region[i] = None;
        if !(self.supports_opaque_slot(idx) && self.has_opaque_slot(idx)) {
            return None;
        }
        // A kind that claims an opaque region but produces none is treated
        // as having none.
        let mut region = self.compute_opaque_slot(idx)?;
        let clip = self.clip_node[i];
        if clip != INVALID {
            let clip_tx = self.transform[clip as usize];
            let clip_region = self.opaque_region_slot(clip)?;
            if !clip_tx.is_translate_or_scale() {
                return None;
            }
            region = geom::intersect(region, clip_tx.transform_rect(clip_region))?;
        }
        self.opaque_region[i] = Some(region);
        Some(region)
    }

    fn supports_opaque_slot(&self, idx: u32) -> bool {
        match &self.kind[idx as usize] {
            NodeKind::Group => false,
            NodeKind::Region(_) | NodeKind::Rect(_) => true,
            NodeKind::Content(c) => c.supports_opaque_region(),
        }
    }

    fn has_opaque_slot(&self, idx: u32) -> bool {
        let i = idx as usize;
        let effect_ok = self.effect[i]
            .as_ref()
            .is_none_or(|e| !e.reduces_opaque_pixels());
        let blend_ok = matches!(self.blend_mode[i], None | Some(BlendMode::SourceOver));
        let clip = self.clip_node[i];
        let clip_ok =
            clip == INVALID || (self.supports_opaque_slot(clip) && self.has_opaque_slot(clip));
        let common = effect_ok && self.opacity[i] == 1.0 && blend_ok && clip_ok;
        common
            && match &self.kind[i] {
                NodeKind::Group => false,
                NodeKind::Region(style) => style.opaque_insets.is_some(),
                NodeKind::Rect(shape) => {
                    shape.fill.is_opaque() && {
                        let b = shape.outline.bounds();
                        b.width() > 0.0 && b.height() > 0.0
                    }
                }
                NodeKind::Content(c) => c.has_opaque_region(),
            }
    }

    fn compute_opaque_slot(&self, idx: u32) -> Option<Rect> {
        match &self.kind[idx as usize] {
            NodeKind::Group => None,
            NodeKind::Region(style) => style
                .opaque_insets
                .map(|insets| insets.apply(style.width, style.height)),
            NodeKind::Rect(shape) => Some(shape.outline.inner_rect()),
            NodeKind::Content(c) => c.compute_opaque_region(),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::boxed::Box;
    use alloc::rc::Rc;

    use kurbo::RoundedRect;

    use super::*;
    use crate::backend::{Color, Graphics};
    use crate::node::shape::{Effect, Insets, NodeContent, Outline, RectShape, RegionStyle};
    use crate::transform::Transform3d;

    fn opaque_rect(store: &mut SceneStore, r: Rect) -> NodeId {
        store.create_rect(RectShape {
            outline: Outline::Rect(r),
            fill: Color::WHITE,
        })
    }

    #[derive(Debug)]
    struct Blur;

    impl Effect for Blur {
        fn bounds(&self, input: Rect) -> Rect {
            input.inflate(2.0, 2.0)
        }

        fn render(&self, g: &mut dyn Graphics, input: &mut dyn FnMut(&mut dyn Graphics)) {
            input(g);
        }
    }

    #[derive(Debug)]
    struct Liar;

    impl NodeContent for Liar {
        fn render_content(&self, _g: &mut dyn Graphics) {}

        fn supports_opaque_region(&self) -> bool {
            true
        }

        fn has_opaque_region(&self) -> bool {
            true
        }
    }

    #[test]
    fn opaque_rect_covers_itself() {
        let mut store = SceneStore::default();
        let n = opaque_rect(&mut store, Rect::new(0.0, 0.0, 50.0, 40.0));
        assert_eq!(
            store.opaque_region(n),
            Some(Rect::new(0.0, 0.0, 50.0, 40.0))
        );
        assert!(!store.is_opaque_region_invalid(n));
    }

    #[test]
    fn rounded_rect_uses_inner_rect() {
        let mut store = SceneStore::default();
        let n = store.create_rect(RectShape {
            outline: Outline::RoundedRect(RoundedRect::new(0.0, 0.0, 100.0, 100.0, 10.0)),
            fill: Color::BLACK,
        });
        let r = store.opaque_region(n).expect("opaque");
        assert!(r.x0 > 0.0 && r.x1 < 100.0, "{r:?}");
    }

    #[test]
    fn translucency_removes_opaque_region() {
        let mut store = SceneStore::default();
        let n = opaque_rect(&mut store, Rect::new(0.0, 0.0, 10.0, 10.0));
        store.set_opacity(n, 0.5);
        assert_eq!(store.opaque_region(n), None);
        store.set_opacity(n, 1.0);
        assert!(store.opaque_region(n).is_some());

        store.set_blend_mode(n, Some(BlendMode::Multiply));
        assert_eq!(store.opaque_region(n), None);
        store.set_blend_mode(n, Some(BlendMode::SourceOver));
        assert!(store.opaque_region(n).is_some());

        store.set_effect(n, Some(Rc::new(Blur)));
        assert_eq!(store.opaque_region(n), None);
    }

    #[test]
    fn translucent_fill_is_not_opaque() {
        let mut store = SceneStore::default();
        let n = store.create_rect(RectShape {
            outline: Outline::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)),
            fill: Color::rgba(1.0, 0.0, 0.0, 0.5),
        });
        assert_eq!(store.opaque_region(n), None);
    }

    #[test]
    fn region_needs_opaque_insets() {
        let mut store = SceneStore::default();
        let n = store.create_region(RegionStyle {
            width: 100.0,
            height: 80.0,
            ..RegionStyle::default()
        });
        assert_eq!(store.opaque_region(n), None);
        store.set_opaque_insets(n, Some(Insets::uniform(2.0)));
        assert_eq!(
            store.opaque_region(n),
            Some(Rect::new(2.0, 2.0, 98.0, 78.0))
        );
    }

    #[test]
    fn clip_intersects_opaque_region() {
        let mut store = SceneStore::default();
        let n = opaque_rect(&mut store, Rect::new(0.0, 0.0, 100.0, 100.0));
        let clip = store.create_rect(RectShape::clip(Rect::new(0.0, 0.0, 30.0, 30.0)));
        store.set_transform(clip, Transform3d::from_translation(10.0, 10.0, 0.0));
        store.set_clip_node(n, Some(clip));
        assert_eq!(
            store.opaque_region(n),
            Some(Rect::new(10.0, 10.0, 40.0, 40.0))
        );

        // A rotated clip gives up.
        store.set_transform(clip, Transform3d::from_rotation_z(0.3));
        assert_eq!(store.opaque_region(n), None);
    }

    #[test]
    fn clip_change_invalidates_owner() {
        let mut store = SceneStore::default();
        let n = opaque_rect(&mut store, Rect::new(0.0, 0.0, 100.0, 100.0));
        let clip = store.create_rect(RectShape::clip(Rect::new(0.0, 0.0, 30.0, 30.0)));
        store.set_clip_node(n, Some(clip));
        let _ = store.opaque_region(n);
        assert!(!store.is_opaque_region_invalid(n));
        store.set_rect_shape(clip, RectShape::clip(Rect::new(0.0, 0.0, 60.0, 60.0)));
        assert!(store.is_opaque_region_invalid(n));
        assert_eq!(
            store.opaque_region(n),
            Some(Rect::new(0.0, 0.0, 60.0, 60.0))
        );
    }

    #[test]
    fn content_claiming_but_missing_region_is_neutralised() {
        let mut store = SceneStore::default();
        let n = store.create_content(Box::new(Liar));
        assert_eq!(store.opaque_region(n), None);
    }
}
