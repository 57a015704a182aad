// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Engine-wide tuning knobs.

/// Hard upper bound on the number of dirty regions tracked per frame.
///
/// Culling bits pack two bits per region into a `u32`, which leaves room for
/// fifteen regions plus the unused top pair.
pub const MAX_DIRTY_REGIONS: usize = 15;

/// Configuration shared by the scene store and the frame renderer.
///
/// The defaults match a desktop-class renderer: dirty-region optimisation
/// on, six regions, scroll caching off.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EngineConfig {
    /// When off, every frame repaints the whole viewport.
    pub dirty_opts_enabled: bool,
    /// Capacity of the per-frame dirty-region container, clamped to
    /// `1..=MAX_DIRTY_REGIONS`.
    pub dirty_region_count: usize,
    /// Detect pure translations of a cached node's children and shift the
    /// cached raster instead of regenerating it.
    pub scroll_cache_opt: bool,
    /// A group with more dirty children than this is accumulated as a single
    /// dirty node.
    pub dirty_children_threshold: u32,
    /// Maximum number of removed-child snapshots a group keeps between
    /// frames before falling back to whole-group accumulation.
    pub removed_children_threshold: usize,
    /// Search for render roots so occluded content is not repainted.
    pub occlusion_culling: bool,
    /// Record which dirty regions painted each node.
    pub show_overdraw: bool,
    /// Ignore node effects entirely.
    pub disable_effects: bool,
}

impl EngineConfig {
    /// Returns the region capacity clamped to its legal range.
    #[must_use]
    pub fn region_capacity(&self) -> usize {
        self.dirty_region_count.clamp(1, MAX_DIRTY_REGIONS)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dirty_opts_enabled: true,
            dirty_region_count: 6,
            scroll_cache_opt: false,
            dirty_children_threshold: 12,
            removed_children_threshold: 20,
            occlusion_culling: true,
            show_overdraw: false,
            disable_effects: false,
        }
    }
}
