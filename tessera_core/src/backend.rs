// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Backend contract for graphics integrations.
//!
//! The scene graph never touches pixels itself. Everything that allocates,
//! binds or draws goes through the [`Graphics`] trait, which a GPU or
//! software backend implements. The contract is deliberately narrow:
//!
//! - **State**: current transform, device-space clip rectangle, extra alpha
//!   and depth-test flag. Callers save and restore these around each node.
//! - **Rasters**: offscreen images addressed by [`RasterId`]. Allocation,
//!   locking and binding report failure through `None` / `false` instead of
//!   panicking; the caller degrades to direct rendering.
//! - **Targets**: [`push_target`](Graphics::push_target) redirects drawing
//!   into a raster (with fresh identity state) until the matching
//!   [`pop_target`](Graphics::pop_target).
//! - **Drawing**: solid fills plus three ways of compositing a raster back.
//!
//! # Crate boundaries
//!
//! `tessera_core` owns the data model, the dirty-region machinery and this
//! contract module. `tessera_render` drives a `Graphics` implementation frame
//! by frame. Backends depend only on `tessera_core`.

use core::fmt;

use kurbo::{Rect, RoundedRect};

use crate::transform::Transform3d;

/// An opaque handle to a backend-managed raster (texture, render target).
///
/// Raster ids are assigned by backends and passed through the scene graph
/// without interpretation.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RasterId(pub u64);

impl fmt::Debug for RasterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RasterId({})", self.0)
    }
}

/// A non-premultiplied RGBA colour with `f32` components in `0..=1`.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Color {
    /// Red.
    pub r: f32,
    /// Green.
    pub g: f32,
    /// Blue.
    pub b: f32,
    /// Alpha.
    pub a: f32,
}

impl Color {
    /// Fully transparent black.
    pub const TRANSPARENT: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);
    /// Opaque black.
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    /// Opaque white.
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);

    /// Creates a colour from its components.
    #[must_use]
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Is this colour fully opaque?
    #[must_use]
    pub fn is_opaque(self) -> bool {
        self.a >= 1.0
    }
}

/// How a node's pixels combine with what is already in the target.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum BlendMode {
    /// Standard source-over alpha compositing.
    #[default]
    SourceOver,
    /// Multiply blend.
    Multiply,
    /// Screen blend.
    Screen,
    /// Overlay blend.
    Overlay,
    /// Keep the darker of source and destination.
    Darken,
    /// Keep the lighter of source and destination.
    Lighten,
    /// Additive blend.
    Add,
    /// Absolute difference.
    Difference,
}

/// Immediate-mode drawing surface implemented by backends.
///
/// All coordinates passed to drawing calls are in the current user space and
/// are mapped through [`transform`](Self::transform). The clip rectangle is
/// in device space of the current target.
pub trait Graphics {
    // -- State --

    /// Returns the current user-to-device transform.
    fn transform(&self) -> Transform3d;
    /// Replaces the current transform.
    fn set_transform(&mut self, transform: Transform3d);
    /// Returns the device-space clip rectangle, if any.
    fn clip_rect(&self) -> Option<Rect>;
    /// Replaces the device-space clip rectangle.
    fn set_clip_rect(&mut self, clip: Option<Rect>);
    /// Returns the extra alpha multiplied into every draw.
    fn extra_alpha(&self) -> f32;
    /// Replaces the extra alpha.
    fn set_extra_alpha(&mut self, alpha: f32);
    /// Returns whether depth testing is on.
    fn depth_test(&self) -> bool;
    /// Turns depth testing on or off.
    fn set_depth_test(&mut self, enabled: bool);

    // -- Device facts --

    /// Returns the device pixel scale `(x, y)` of the current target.
    fn pixel_scale(&self) -> (f64, f64);
    /// Returns the largest raster side length the device supports.
    fn max_raster_size(&self) -> u32;

    // -- Rasters --

    /// Allocates a transparent raster, or `None` when the device is out of
    /// memory.
    fn allocate_raster(&mut self, width: u32, height: u32) -> Option<RasterId>;
    /// Locks a raster for use this frame. Returns `false` when its contents
    /// were lost (device reset) and must be regenerated.
    fn lock_raster(&mut self, raster: RasterId) -> bool;
    /// Releases a lock taken by [`lock_raster`](Self::lock_raster).
    fn unlock_raster(&mut self, raster: RasterId);
    /// Frees a raster. Unknown ids are ignored.
    fn release_raster(&mut self, raster: RasterId);
    /// Redirects drawing into `raster` with identity transform, no clip and
    /// full alpha. Returns `false` if the raster cannot be bound.
    fn push_target(&mut self, raster: RasterId) -> bool;
    /// Restores the previous target and its state.
    fn pop_target(&mut self);

    // -- Drawing --

    /// Clears `area` (device space) of the current target, or all of it,
    /// to transparent.
    fn clear(&mut self, area: Option<Rect>);
    /// Fills a rectangle.
    fn fill_rect(&mut self, rect: Rect, color: Color);
    /// Fills a rounded rectangle.
    fn fill_rounded_rect(&mut self, rect: RoundedRect, color: Color);
    /// Strokes the outline of a rectangle.
    fn stroke_rect(&mut self, rect: Rect, width: f64, color: Color);
    /// Draws the `src` pixel rectangle of `raster` into `dst`.
    fn draw_raster(&mut self, raster: RasterId, src: Rect, dst: Rect);
    /// Draws `content` into `dst` masked by the alpha of `mask`.
    fn draw_masked(&mut self, content: RasterId, mask: RasterId, dst: Rect);
    /// Draws `content` into `dst` combined with the target using `mode`.
    fn draw_blended(&mut self, content: RasterId, mode: BlendMode, dst: Rect);
}

/// Saved [`Graphics`] state for restoring after a node is drawn.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GraphicsState {
    /// Current transform.
    pub transform: Transform3d,
    /// Device-space clip.
    pub clip: Option<Rect>,
    /// Extra alpha.
    pub extra_alpha: f32,
    /// Depth-test flag.
    pub depth_test: bool,
}

impl GraphicsState {
    /// Snapshots the state of `g`.
    #[must_use]
    pub fn save(g: &dyn Graphics) -> Self {
        Self {
            transform: g.transform(),
            clip: g.clip_rect(),
            extra_alpha: g.extra_alpha(),
            depth_test: g.depth_test(),
        }
    }

    /// Writes the snapshot back into `g`.
    pub fn restore(&self, g: &mut dyn Graphics) {
        g.set_transform(self.transform);
        g.set_clip_rect(self.clip);
        g.set_extra_alpha(self.extra_alpha);
        g.set_depth_test(self.depth_test);
    }
}
