// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Minimal column-major 4×4 transform.
//!
//! This type covers the subset of 3-D transforms that the scene graph needs
//! (identity, multiply, classification, rectangle projection, inversion)
//! without pulling in a full linear-algebra crate. 2-D work is delegated to
//! [`kurbo::Affine`] through [`Transform3d::to_affine`].

use core::ops::Mul;

use kurbo::{Affine, Point, Rect};

/// A column-major 4×4 transform stored as `[[f64; 4]; 4]`.
///
/// Each inner array is one *column* of the matrix, matching the memory layout
/// used by GPU APIs. Element `(row, col)` lives at `cols[col][row]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transform3d {
    /// Four columns, each a 4-element array `[x, y, z, w]`.
    pub cols: [[f64; 4]; 4],
}

impl Transform3d {
    /// The 4×4 identity matrix.
    pub const IDENTITY: Self = Self {
        cols: [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, 1.0, 0.0, 0.0],
            [0.0, 0.0, 1.0, 0.0],
            [0.0, 0.0, 0.0, 1.0],
        ],
    };

    /// Creates a transform from four column arrays.
    #[inline]
    #[must_use]
    pub const fn from_cols(col0: [f64; 4], col1: [f64; 4], col2: [f64; 4], col3: [f64; 4]) -> Self {
        Self {
            cols: [col0, col1, col2, col3],
        }
    }

    /// Returns column `i` (0-based).
    ///
    /// # Panics
    ///
    /// Panics if `i >= 4`.
    #[inline]
    #[must_use]
    pub const fn col(self, i: usize) -> [f64; 4] {
        self.cols[i]
    }

    /// Creates a pure translation transform.
    #[inline]
    #[must_use]
    pub const fn from_translation(x: f64, y: f64, z: f64) -> Self {
        Self {
            cols: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [x, y, z, 1.0],
            ],
        }
    }

    /// Creates a non-uniform scale transform.
    #[inline]
    #[must_use]
    pub const fn from_scale(sx: f64, sy: f64, sz: f64) -> Self {
        Self {
            cols: [
                [sx, 0.0, 0.0, 0.0],
                [0.0, sy, 0.0, 0.0],
                [0.0, 0.0, sz, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Creates a rotation around the Z axis (radians).
    #[inline]
    #[must_use]
    pub fn from_rotation_z(radians: f64) -> Self {
        let (s, c) = radians.sin_cos();
        Self {
            cols: [
                [c, s, 0.0, 0.0],
                [-s, c, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }

    /// Embeds a 2-D affine transform in the XY plane.
    #[must_use]
    pub fn from_affine(affine: Affine) -> Self {
        let [a, b, c, d, e, f] = affine.as_coeffs();
        Self {
            cols: [
                [a, b, 0.0, 0.0],
                [c, d, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [e, f, 0.0, 1.0],
            ],
        }
    }

    /// Returns the XY part of this transform as a 2-D affine.
    ///
    /// Z and perspective terms are dropped; check [`is_2d`](Self::is_2d)
    /// first when that matters.
    #[must_use]
    pub fn to_affine(&self) -> Affine {
        let c = &self.cols;
        Affine::new([c[0][0], c[0][1], c[1][0], c[1][1], c[3][0], c[3][1]])
    }

    /// Returns the translation column `(x, y, z)`.
    #[inline]
    #[must_use]
    pub const fn translation(&self) -> (f64, f64, f64) {
        (self.cols[3][0], self.cols[3][1], self.cols[3][2])
    }

    /// Returns a copy of this transform with the XY translation zeroed.
    #[must_use]
    pub fn without_translation(&self) -> Self {
        let mut out = *self;
        out.cols[3][0] = 0.0;
        out.cols[3][1] = 0.0;
        out.cols[3][2] = 0.0;
        out
    }

    /// Is this exactly the identity?
    #[inline]
    #[must_use]
    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Does this transform have a projective (bottom row) component?
    #[must_use]
    pub fn has_perspective(&self) -> bool {
        let c = &self.cols;
        c[0][3] != 0.0 || c[1][3] != 0.0 || c[2][3] != 0.0 || c[3][3] != 1.0
    }

    /// Does this transform keep the XY plane in place with no Z coupling?
    #[must_use]
    pub fn is_2d(&self) -> bool {
        let c = &self.cols;
        !self.has_perspective()
            && c[0][2] == 0.0
            && c[1][2] == 0.0
            && c[2][0] == 0.0
            && c[2][1] == 0.0
            && c[2][2] == 1.0
            && c[3][2] == 0.0
    }

    /// Is this a pure translation (or the identity)?
    #[must_use]
    pub fn is_translate_or_identity(&self) -> bool {
        let c = &self.cols;
        self.is_2d() && c[0][0] == 1.0 && c[0][1] == 0.0 && c[1][0] == 0.0 && c[1][1] == 1.0
    }

    /// Is this a 2-D translate plus axis scale (no rotation or shear)?
    #[must_use]
    pub fn is_translate_or_scale(&self) -> bool {
        let c = &self.cols;
        self.is_2d() && c[0][1] == 0.0 && c[1][0] == 0.0
    }

    /// Does this 2-D transform map axis-aligned rectangles to axis-aligned
    /// rectangles (translation, scale, quadrant rotation)?
    #[must_use]
    pub fn is_axis_aligned(&self) -> bool {
        let c = &self.cols;
        self.is_2d()
            && ((c[0][1] == 0.0 && c[1][0] == 0.0) || (c[0][0] == 0.0 && c[1][1] == 0.0))
    }

    /// Compares everything except the translation column.
    #[must_use]
    pub fn linear_eq(&self, other: &Self) -> bool {
        self.cols[0] == other.cols[0]
            && self.cols[1] == other.cols[1]
            && self.cols[2] == other.cols[2]
            && self.cols[3][3] == other.cols[3][3]
    }

    /// Maps a point in the z = 0 plane, including the perspective divide.
    #[must_use]
    pub fn transform_point(&self, p: Point) -> Point {
        let c = &self.cols;
        let x = c[0][0] * p.x + c[1][0] * p.y + c[3][0];
        let y = c[0][1] * p.x + c[1][1] * p.y + c[3][1];
        let w = c[0][3] * p.x + c[1][3] * p.y + c[3][3];
        if w == 1.0 || w == 0.0 {
            Point::new(x, y)
        } else {
            Point::new(x / w, y / w)
        }
    }

    /// Maps the four corners of `rect` and returns their bounding box.
    #[must_use]
    pub fn transform_rect(&self, rect: Rect) -> Rect {
        if self.is_translate_or_identity() {
            let (tx, ty, _) = self.translation();
            return Rect::new(rect.x0 + tx, rect.y0 + ty, rect.x1 + tx, rect.y1 + ty);
        }
        let corners = self.transform_corners(rect);
        let mut out = Rect::from_points(corners[0], corners[1]);
        out = out.union_pt(corners[2]);
        out.union_pt(corners[3])
    }

    /// Maps the corners of `rect` in order: top-left, top-right,
    /// bottom-right, bottom-left.
    #[must_use]
    pub fn transform_corners(&self, rect: Rect) -> [Point; 4] {
        [
            self.transform_point(Point::new(rect.x0, rect.y0)),
            self.transform_point(Point::new(rect.x1, rect.y0)),
            self.transform_point(Point::new(rect.x1, rect.y1)),
            self.transform_point(Point::new(rect.x0, rect.y1)),
        ]
    }

    /// Returns the inverse, or `None` when the matrix is singular.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        // Gauss-Jordan on the row-major view.
        let mut m = [[0.0_f64; 8]; 4];
        for (r, row) in m.iter_mut().enumerate() {
            for c in 0..4 {
                row[c] = self.cols[c][r];
            }
            row[4 + r] = 1.0;
        }
        for pivot in 0..4 {
            let mut best = pivot;
            for r in pivot + 1..4 {
                if m[r][pivot].abs() > m[best][pivot].abs() {
                    best = r;
                }
            }
            if m[best][pivot].abs() < 1e-12 {
                return None;
            }
            m.swap(pivot, best);
            let inv = 1.0 / m[pivot][pivot];
            for v in &mut m[pivot] {
                *v *= inv;
            }
            for r in 0..4 {
                if r != pivot {
                    let factor = m[r][pivot];
                    if factor != 0.0 {
                        for c in 0..8 {
                            m[r][c] -= factor * m[pivot][c];
                        }
                    }
                }
            }
        }
        let mut out = Self::IDENTITY;
        for (r, row) in m.iter().enumerate() {
            for c in 0..4 {
                out.cols[c][r] = row[4 + c];
            }
        }
        Some(out)
    }

    /// Maps `rect` through the inverse of this transform.
    #[must_use]
    pub fn inverse_transform_rect(&self, rect: Rect) -> Option<Rect> {
        self.inverse().map(|inv| inv.transform_rect(rect))
    }

    /// Is this transform [finite]?
    ///
    /// [finite]: f64::is_finite
    #[inline]
    #[must_use]
    pub fn is_finite(&self) -> bool {
        self.cols.iter().flatten().all(|v| v.is_finite())
    }

    /// Is this transform [NaN]?
    ///
    /// [NaN]: f64::is_nan
    #[inline]
    #[must_use]
    pub fn is_nan(&self) -> bool {
        self.cols.iter().flatten().any(|v| v.is_nan())
    }
}

impl Default for Transform3d {
    #[inline]
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl From<Affine> for Transform3d {
    fn from(affine: Affine) -> Self {
        Self::from_affine(affine)
    }
}

impl Mul for Transform3d {
    type Output = Self;

    #[inline]
    fn mul(self, rhs: Self) -> Self {
        let a = &self.cols;
        let b = &rhs.cols;
        let mut out = [[0.0_f64; 4]; 4];
        let mut j = 0;
        while j < 4 {
            let mut i = 0;
            while i < 4 {
                out[j][i] =
                    a[0][i] * b[j][0] + a[1][i] * b[j][1] + a[2][i] * b[j][2] + a[3][i] * b[j][3];
                i += 1;
            }
            j += 1;
        }
        Self { cols: out }
    }
}
