// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! What a frame repainted, for presenting partial updates.

use alloc::vec::Vec;

use kurbo::Rect;

/// The part of the output a frame changed.
///
/// Backends can present only these areas (swap-with-damage, partial
/// uploads) instead of the whole surface.
#[derive(Clone, Debug, Default, PartialEq)]
pub enum DamageRegion {
    /// The entire output was repainted.
    #[default]
    Full,
    /// These scene-space rectangles were repainted.
    Rects(Vec<Rect>),
    /// Nothing changed; the previous frame is still valid.
    None,
}

impl DamageRegion {
    /// Returns `true` if nothing was repainted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::None)
    }

    /// Returns the union of the damage, clamped to `viewport` for
    /// [`Full`](Self::Full).
    #[must_use]
    pub fn bounds(&self, viewport: Rect) -> Option<Rect> {
        match self {
            Self::Full => Some(viewport),
            Self::Rects(rects) => rects.iter().copied().reduce(|a, b| a.union(b)),
            Self::None => None,
        }
    }

    /// Merges another damage region into this one.
    pub fn merge(&mut self, other: &Self) {
        match (&*self, other) {
            (Self::Full, _) | (_, Self::Full) => *self = Self::Full,
            (Self::None, _) => *self = other.clone(),
            (_, Self::None) => {}
            (Self::Rects(a), Self::Rects(b)) => {
                let mut merged = a.clone();
                merged.extend_from_slice(b);
                *self = Self::Rects(merged);
            }
        }
    }
}
