// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene-graph data model.
//!
//! A *node* is an element of a retained scene tree. Each node has:
//!
//! - An identity ([`NodeId`]), a generational handle that becomes stale when
//!   the node is destroyed.
//! - Topology: parent, first-child and sibling links forming an ordered
//!   tree, plus an optional clip node owned one-to-one.
//! - A [`NodeKind`] saying what it draws: nothing (a group), a region, a
//!   rectangle or external [`NodeContent`].
//! - Properties set through [`SceneStore`] setters (transform, opacity,
//!   visibility, blend mode, effect, clip, bitmap caching).
//! - Dirty state: a [`DirtyFlag`] for the node itself and a `child_dirty`
//!   bit for its subtree.
//!
//! Every setter encodes its own invalidation: it marks the node dirty, walks
//! up telling ancestors, invalidates bitmap caches and drops cached opaque
//! regions as needed. Nothing else mutates a node.
//!
//! Nodes are stored in struct-of-arrays layout with index-based handles.

mod bounds;
mod dirty;
mod id;
mod opaque;
mod shape;
mod store;
mod traverse;

pub use dirty::DirtyFlag;
pub use id::{INVALID, NodeId};
pub use shape::{
    BackgroundFill, Border, Effect, Insets, NodeContent, NodeKind, Outline, RectShape, RegionStyle,
};
pub use store::{NodeFlags, RemovedChild, SceneStore};
pub use traverse::Children;
