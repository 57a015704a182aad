// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Recording, pretty-printing, tree dumps and Chrome trace export for
//! tessera diagnostics.
//!
//! This crate provides [`TraceSink`](tessera_core::trace::TraceSink)
//! implementations for development and post-mortem analysis, plus tools that
//! read the scene store directly:
//!
//! - [`pretty::PrettyPrintSink`]: human-readable one-line-per-event output.
//! - [`recorder::RecorderSink`]: compact binary recording with
//!   [`recorder::decode`] for playback.
//! - [`chrome::export`]: writes Chrome Trace Event Format JSON from recorded
//!   bytes.
//! - [`dirty_opts::print_dirty_opts`]: an annotated tree dump showing dirty
//!   flags, culling bits and render roots.
//! - [`overdraw::OverdrawMap`]: per-pixel paint counts for a dirty region.

pub mod chrome;
pub mod dirty_opts;
pub mod overdraw;
pub mod pretty;
pub mod recorder;
