// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Built-in node kinds and the capability traits external painters implement.

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use kurbo::{Rect, RoundedRect};

use crate::backend::{Color, Graphics};
use crate::region::DirtyRegionContainer;

/// The outline of a [`RectShape`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Outline {
    /// An axis-aligned rectangle.
    Rect(Rect),
    /// A rectangle with rounded corners.
    RoundedRect(RoundedRect),
}

impl Outline {
    /// Returns the bounding rectangle.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        match self {
            Self::Rect(r) => *r,
            Self::RoundedRect(r) => r.rect(),
        }
    }

    /// Returns the largest axis-aligned rectangle known to be covered.
    #[must_use]
    pub fn inner_rect(&self) -> Rect {
        match self {
            Self::Rect(r) => *r,
            Self::RoundedRect(r) => {
                let radii = r.radii();
                let max = radii
                    .top_left
                    .max(radii.top_right)
                    .max(radii.bottom_right)
                    .max(radii.bottom_left);
                // The point at 45 degrees on a corner arc.
                let inset = max * (1.0 - core::f64::consts::FRAC_1_SQRT_2);
                r.rect().inset(-inset)
            }
        }
    }
}

/// A filled rectangle leaf. Also the shape a clip node usually has.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RectShape {
    /// Geometry in local coordinates.
    pub outline: Outline,
    /// Fill colour.
    pub fill: Color,
}

impl RectShape {
    /// An opaque black rectangle, handy for clips.
    #[must_use]
    pub fn clip(rect: Rect) -> Self {
        Self {
            outline: Outline::Rect(rect),
            fill: Color::BLACK,
        }
    }
}

/// Distances inward from each edge of a region.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Insets {
    /// Top inset.
    pub top: f64,
    /// Right inset.
    pub right: f64,
    /// Bottom inset.
    pub bottom: f64,
    /// Left inset.
    pub left: f64,
}

impl Insets {
    /// No inset on any side.
    pub const EMPTY: Self = Self::uniform(0.0);

    /// The same inset on every side.
    #[must_use]
    pub const fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    /// Are all four sides zero?
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::EMPTY
    }

    /// Shrinks `(0, 0, width, height)` by these insets.
    #[must_use]
    pub fn apply(&self, width: f64, height: f64) -> Rect {
        Rect::new(self.left, self.top, width - self.right, height - self.bottom)
    }
}

/// One solid background layer of a [`RegionStyle`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackgroundFill {
    /// Fill colour.
    pub color: Color,
    /// Inset from the region's edges.
    pub insets: Insets,
}

/// A solid border drawn on top of a region's backgrounds.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Border {
    /// Stroke width.
    pub width: f64,
    /// Stroke colour.
    pub color: Color,
}

/// Visual description of a region: a sized box with backgrounds, an optional
/// border and children.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RegionStyle {
    /// Width in local units.
    pub width: f64,
    /// Height in local units.
    pub height: f64,
    /// Background fills, painted in order.
    pub fills: Vec<BackgroundFill>,
    /// Whether the region also paints background images.
    pub has_images: bool,
    /// Optional border.
    pub border: Option<Border>,
    /// Insets of the area known to be opaque, or `None` if unknown.
    pub opaque_insets: Option<Insets>,
}

/// Paint and geometry callbacks for node kinds defined outside this crate.
pub trait NodeContent: fmt::Debug {
    /// Paints the node's own content in local coordinates.
    fn render_content(&self, g: &mut dyn Graphics);

    /// Does this node draw anything at all?
    fn has_visuals(&self) -> bool {
        true
    }

    /// Can this kind of content ever report an opaque region?
    fn supports_opaque_region(&self) -> bool {
        false
    }

    /// Does the current content have an opaque region?
    fn has_opaque_region(&self) -> bool {
        false
    }

    /// Computes the opaque region in local coordinates.
    fn compute_opaque_region(&self) -> Option<Rect> {
        None
    }

    /// Can paint operations of this content overlap each other?
    fn has_overlapping_contents(&self) -> bool {
        true
    }

    /// Grows a dirty region for content that paints outside its bounds
    /// (antialiasing fringes, strokes).
    fn pad_dirty_region(&self, region: Rect) -> Rect {
        region
    }
}

/// An image filter applied to a node's rendered content.
pub trait Effect: fmt::Debug {
    /// Returns the output bounds for input occupying `input`.
    fn bounds(&self, input: Rect) -> Rect;

    /// Can the effect turn opaque input pixels translucent?
    fn reduces_opaque_pixels(&self) -> bool {
        true
    }

    /// Maps dirty regions of the effect's input to regions of its output.
    fn map_dirty_regions(&self, regions: &mut DirtyRegionContainer) {
        regions.map_regions(|r| self.bounds(r));
    }

    /// Renders the effect. `input` paints the unfiltered content into
    /// whatever graphics it is handed.
    fn render(&self, g: &mut dyn Graphics, input: &mut dyn FnMut(&mut dyn Graphics));
}

/// What a node draws.
#[derive(Debug)]
pub enum NodeKind {
    /// An ordered container of children with no visuals of its own.
    Group,
    /// A sized box with backgrounds and children.
    Region(RegionStyle),
    /// A filled rectangle.
    Rect(RectShape),
    /// Externally defined content.
    Content(Box<dyn NodeContent>),
}

impl NodeKind {
    /// Can this node have children?
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, Self::Group | Self::Region(_))
    }

    /// Does this node draw anything itself?
    #[must_use]
    pub fn has_visuals(&self) -> bool {
        match self {
            Self::Group => false,
            Self::Region(style) => {
                !style.fills.is_empty() || style.has_images || style.border.is_some()
            }
            Self::Rect(_) => true,
            Self::Content(c) => c.has_visuals(),
        }
    }

    /// Short label for diagnostics.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Group => "Group",
            Self::Region(_) => "Region",
            Self::Rect(_) => "Rect",
            Self::Content(_) => "Content",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounded_inner_rect_stays_inside_arcs() {
        let outline = Outline::RoundedRect(RoundedRect::new(0.0, 0.0, 100.0, 50.0, 10.0));
        let inner = outline.inner_rect();
        let inset = 10.0 * (1.0 - core::f64::consts::FRAC_1_SQRT_2);
        assert!((inner.x0 - inset).abs() < 1e-9, "inner {inner:?}");
        assert!((inner.y1 - (50.0 - inset)).abs() < 1e-9, "inner {inner:?}");
        assert_eq!(outline.bounds(), Rect::new(0.0, 0.0, 100.0, 50.0));
    }

    #[test]
    fn insets_shrink_box() {
        let i = Insets {
            top: 1.0,
            right: 2.0,
            bottom: 3.0,
            left: 4.0,
        };
        assert_eq!(i.apply(100.0, 50.0), Rect::new(4.0, 1.0, 98.0, 47.0));
        assert!(Insets::EMPTY.is_empty());
        assert!(!i.is_empty());
    }

    #[test]
    fn group_kinds() {
        assert!(NodeKind::Group.is_group());
        assert!(NodeKind::Region(RegionStyle::default()).is_group());
        assert!(!NodeKind::Rect(RectShape::clip(Rect::ZERO)).is_group());
        assert!(!NodeKind::Group.has_visuals());
    }
}
