// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Painting and frame driving for [`tessera_core`] scene graphs.
//!
//! This crate turns the dirty state kept by a
//! [`SceneStore`](tessera_core::node::SceneStore) into calls on a
//! [`Graphics`](tessera_core::backend::Graphics) backend:
//!
//! - [`FrameRenderer`]: the per-frame pipeline (accumulate, cull, find
//!   render roots, paint, clean) producing a [`FrameReport`].
//! - [`Painter`]: the paint traversal, including offscreen blending,
//!   opacity layers, clip masks, effects and bitmap-cached nodes.
//! - [`DamageRegion`]: what a frame repainted, for partial presentation.
//! - [`RecordingGraphics`]: a backend that records calls, for tests and
//!   inspection.
//!
//! # Features
//!
//! - `trace`: forward pipeline events to a
//!   [`TraceSink`](tessera_core::trace::TraceSink).
//! - `trace-rich`: also report dirty rectangles and every painted node.

#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod cached;
mod damage;
mod frame;
mod paint;
mod recording;

pub use damage::DamageRegion;
pub use frame::{FrameRenderer, FrameReport};
pub use paint::{PaintStats, Painter};
pub use recording::{Op, RecordingGraphics};
