// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! What a cached node expects to change while its raster is reused.

/// Tells the cache filter which transform changes may reuse the raster.
///
/// A scale hint lets the raster be stretched instead of regenerated (at the
/// cost of sharpness when enlarged). A rotate hint lets it be drawn rotated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CacheHint {
    /// Reuse only under translation.
    #[default]
    Default,
    /// Reuse under scale and rotation.
    Speed,
    /// Regenerate for anything but translation.
    Quality,
    /// Reuse under scale.
    Scale,
    /// Reuse under rotation.
    Rotate,
    /// Reuse under scale and rotation.
    ScaleAndRotate,
}

impl CacheHint {
    /// Can the raster be reused at a different scale?
    #[must_use]
    pub const fn scale_hint(self) -> bool {
        matches!(self, Self::Speed | Self::Scale | Self::ScaleAndRotate)
    }

    /// Can the raster be reused at a different rotation?
    #[must_use]
    pub const fn rotate_hint(self) -> bool {
        matches!(self, Self::Speed | Self::Rotate | Self::ScaleAndRotate)
    }
}
