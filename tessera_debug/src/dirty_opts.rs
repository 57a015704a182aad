// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Annotated tree dumps for inspecting dirty-region decisions.
//!
//! [`print_dirty_opts`] renders every visible node under a root as one
//! indented line, tagged with the state that drove the last frame: dirty
//! flags, culling bits per region, render roots, filters and opaque regions.
//! Clip nodes are printed under their owner with a `cl` marker.

use std::fmt::Write;

use tessera_core::config::MAX_DIRTY_REGIONS;
use tessera_core::cull::CullingBits;
use tessera_core::node::{DirtyFlag, NodeId, SceneStore};
use tessera_core::transform::Transform3d;
use tessera_render::FrameRenderer;

/// Legend printed ahead of every dump.
pub const LEGEND: &str = "\
*=Render Root
d=Dirty
dt=Dirty By Translation
i=Dirty Region Intersects the node
c=Dirty Region Contains the node
ef=Effect Filter
cf=Cache Filter
cl=This node is a clip node
b=Blend mode is set
or=Opaque Region
";

/// Returns the render root of each region of the last painted frame.
///
/// Regions painted from the tree root report `None`.
#[must_use]
pub fn frame_render_roots(renderer: &FrameRenderer) -> Vec<Option<NodeId>> {
    (0..renderer.regions().len())
        .map(|i| {
            renderer
                .path(i)
                .filter(|p| p.len() > 1)
                .and_then(|p| p.render_root())
        })
        .collect()
}

/// Dumps the tree under `root` with dirty-region annotations.
///
/// `roots[i]` is the render root found for region `i`, as returned by
/// [`frame_render_roots`]. Invisible and fully transparent subtrees are
/// left out.
///
/// Opaque regions are computed on demand, which is why the store is
/// borrowed mutably.
pub fn print_dirty_opts(store: &mut SceneStore, root: NodeId, roots: &[Option<NodeId>]) -> String {
    let mut out = String::from("\n");
    out.push_str(LEGEND);
    print_node(&mut out, store, root, &Transform3d::IDENTITY, "", roots);
    out
}

fn label(store: &SceneStore, id: NodeId) -> String {
    match store.name(id) {
        Some(name) => name.to_owned(),
        None => format!("{}#{}", store.kind(id).label(), id.index()),
    }
}

fn culling_tags(bits: CullingBits, tags: &mut Vec<String>) {
    for i in 0..MAX_DIRTY_REGIONS {
        let tag = match bits.region(i) {
            0 => continue,
            CullingBits::INTERSECTS => "i",
            CullingBits::CONTAINS => "c",
            _ => "ci",
        };
        tags.push(format!("{tag}{i}"));
    }
}

fn print_node(
    out: &mut String,
    store: &mut SceneStore,
    id: NodeId,
    tx: &Transform3d,
    prefix: &str,
    roots: &[Option<NodeId>],
) {
    if !store.is_visible(id) || store.opacity(id) == 0.0 {
        return;
    }
    let tx = *tx * store.transform(id);

    let mut tags = Vec::new();
    for (i, r) in roots.iter().enumerate() {
        if *r == Some(id) {
            tags.push(format!("*{i}"));
        }
    }
    match store.dirty(id) {
        DirtyFlag::Clean => {}
        DirtyFlag::Dirty => tags.push("d".to_owned()),
        DirtyFlag::DirtyByTranslation => tags.push("dt".to_owned()),
    }
    culling_tags(store.culling_bits(id), &mut tags);
    if store.effect(id).is_some() {
        tags.push("ef".to_owned());
    }
    if store.cache_filter(id).is_some() {
        tags.push("cf".to_owned());
    }
    if store.blend_mode(id).is_some() {
        tags.push("b".to_owned());
    }
    if let Some(or) = store.opaque_region(id) {
        let or = tx.transform_rect(or);
        tags.push(format!(
            "or={}, {}, {}, {}",
            or.x0,
            or.y0,
            or.width(),
            or.height()
        ));
    }

    let name = label(store, id);
    if tags.is_empty() {
        let _ = writeln!(out, "{prefix}{name}");
    } else {
        let _ = writeln!(out, "{prefix}{name} [{}]", tags.join(" "));
    }

    if let Some(clip) = store.clip_node(id) {
        print_node(out, store, clip, &tx, &format!("{prefix}  cl "), roots);
    }
    let children = store.ordered_children(id);
    let nested = format!("{prefix}  ");
    for child in children {
        print_node(out, store, child, &tx, &nested, roots);
    }
}

#[cfg(test)]
mod tests {
    use kurbo::Rect;
    use tessera_core::backend::{BlendMode, Color};
    use tessera_core::cache::CacheHint;
    use tessera_core::node::{Outline, RectShape};
    use tessera_core::trace::Tracer;
    use tessera_render::RecordingGraphics;

    use super::*;

    fn named_rect(store: &mut SceneStore, name: &str, r: Rect, fill: Color) -> NodeId {
        let id = store.create_rect(RectShape {
            outline: Outline::Rect(r),
            fill,
        });
        store.set_name(id, Some(name.to_owned()));
        id
    }

    fn body(dump: &str) -> Vec<&str> {
        dump.lines().skip(1 + LEGEND.lines().count()).collect()
    }

    #[test]
    fn fresh_tree_is_all_dirty() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        store.set_name(root, Some("root".to_owned()));
        let bg = named_rect(
            &mut store,
            "bg",
            Rect::new(0.0, 0.0, 50.0, 50.0),
            Color::WHITE,
        );
        let fg = named_rect(
            &mut store,
            "fg",
            Rect::new(0.0, 0.0, 10.0, 10.0),
            Color::rgba(1.0, 0.0, 0.0, 0.5),
        );
        store.add_child(root, bg, None);
        store.add_child(root, fg, None);
        store.set_cached_as_bitmap(fg, true, CacheHint::Default);
        store.set_blend_mode(fg, Some(BlendMode::Multiply));
        store.set_transform(bg, Transform3d::from_translation(5.0, 5.0, 0.0));
        store.update_bounds(root);

        let dump = print_dirty_opts(&mut store, root, &[Some(root)]);
        assert!(dump.starts_with("\n*=Render Root\n"), "got: {dump}");
        assert_eq!(
            body(&dump),
            [
                "root [*0 d]",
                "  bg [d or=5, 5, 50, 50]",
                "  fg [d cf b]",
            ]
        );
    }

    #[test]
    fn render_roots_come_from_the_last_frame() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        store.set_name(root, Some("root".to_owned()));
        let back = named_rect(
            &mut store,
            "back",
            Rect::new(10.0, 10.0, 20.0, 20.0),
            Color::BLACK,
        );
        let cover = named_rect(
            &mut store,
            "cover",
            Rect::new(0.0, 0.0, 100.0, 100.0),
            Color::WHITE,
        );
        store.add_child(root, back, None);
        store.add_child(root, cover, None);
        store.update_bounds(root);

        let mut renderer = FrameRenderer::new();
        let mut g = RecordingGraphics::new();
        let _ = renderer.render_frame(
            &mut store,
            root,
            &mut g,
            Rect::new(0.0, 0.0, 400.0, 400.0),
            &mut Tracer::none(),
        );
        let roots = frame_render_roots(&renderer);
        assert_eq!(roots, [Some(cover)]);

        let dump = print_dirty_opts(&mut store, root, &roots);
        let lines = body(&dump);
        assert_eq!(lines.len(), 3, "got: {dump}");
        assert!(lines[0].starts_with("root ["), "got: {dump}");
        assert!(!lines[0].contains('*'), "got: {dump}");
        assert!(lines[1].starts_with("  back"), "got: {dump}");
        assert!(lines[2].starts_with("  cover [*0 "), "got: {dump}");
        let dirty_tag = |l: &&str| l.split([' ', '[', ']']).any(|t| t == "d" || t == "dt");
        assert!(!lines.iter().any(dirty_tag), "frame left dirty nodes: {dump}");
    }

    #[test]
    fn clips_are_nested_and_hidden_nodes_skipped() {
        let mut store = SceneStore::default();
        let root = store.create_group();
        let clip = named_rect(
            &mut store,
            "mask",
            Rect::new(0.0, 0.0, 5.0, 5.0),
            Color::rgba(0.0, 0.0, 0.0, 0.04),
        );
        let hidden = named_rect(
            &mut store,
            "hidden",
            Rect::new(0.0, 0.0, 5.0, 5.0),
            Color::WHITE,
        );
        store.add_child(root, hidden, None);
        store.set_visible(hidden, false);
        store.set_clip_node(root, Some(clip));
        store.update_bounds(root);
        store.clear_dirty_tree(root);

        let dump = print_dirty_opts(&mut store, root, &[]);
        assert_eq!(body(&dump), [format!("Group#{}", root.index()), "  cl mask".to_owned()]);
    }
}
