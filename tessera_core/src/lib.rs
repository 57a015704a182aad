// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Scene graph and dirty-region engine for retained-mode rendering.
//!
//! `tessera_core` keeps a tree of nodes in struct-of-arrays storage with
//! generational handles, and works out, frame by frame, the smallest amount
//! of painting that brings the screen up to date with the tree.
//!
//! # Architecture
//!
//! ```text
//!   setters on SceneStore ──► dirty flags, dirty bounds, cache invalidation
//!                                        │
//!                 ┌──────────────────────┘
//!                 ▼
//!   accumulate_dirty_regions() ──► DirtyRegionContainer (≤ 15 rects)
//!                                        │
//!                 ┌──────────────────────┘
//!                 ▼
//!   pre_cull() ──► render_root() per region ──► painter (tessera_render)
//! ```
//!
//! **[`node`]**: The scene store: nodes, topology, properties and the dirty
//! state machine. Every setter performs its own invalidation.
//!
//! **[`region`]**: Bounded sets of disjoint dirty rectangles and the scratch
//! pool accumulation borrows from.
//!
//! **[`accumulate`]**: Walks dirty branches and collects scene-space dirty
//! rectangles, short-circuiting when one covers the clip.
//!
//! **[`cull`]**: Two culling bits per node per region.
//!
//! **[`render_root`]**: Occlusion search for the deepest clean or opaque node
//! that fully covers a region, so nothing behind it is painted.
//!
//! **[`cache`]**: Bitmap caching of subtrees, including scroll shifting.
//!
//! **[`backend`]**: The [`Graphics`](backend::Graphics) trait that drawing
//! backends implement.
//!
//! **[`transform`]**: Column-major 4×4 transform.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types for
//! frame instrumentation, with a zero-overhead [`Tracer`](trace::Tracer)
//! wrapper.
//!
//! # Crate features
//!
//! - `trace` (disabled by default): Enables `Tracer` method bodies (one branch
//!   per call site).
//! - `trace-rich` (disabled by default, implies `trace`): Gates per-rectangle
//!   and per-node paint events.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

pub mod accumulate;
pub mod backend;
pub mod cache;
pub mod config;
pub mod cull;
pub mod geom;
pub mod node;
pub mod region;
pub mod render_root;
pub mod trace;
pub mod transform;
