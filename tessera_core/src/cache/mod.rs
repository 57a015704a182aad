// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Bitmap caching of subtrees.
//!
//! A node cached as a bitmap is rendered once into a raster and then drawn
//! from it for as long as its [`CacheHint`] allows the live transform to be
//! reproduced from the cached one. Pure translations of a scroll pane's
//! content shift the raster in place and repaint only the exposed strip.

mod filter;
mod hint;
mod unmatrix;

pub use filter::{CacheFilter, CachedRaster, ScrollCacheState, ScrollPlan};
pub use hint::CacheHint;
pub use unmatrix::{EPS, XformInfo, unmatrix};
