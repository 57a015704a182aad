// Copyright 2026 the Tessera Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Decomposing a 2-D linear transform into scale and rotation.

use core::f64::consts::{PI, TAU};

use kurbo::Affine;

/// Tolerance used when comparing decomposed angles and scales.
pub const EPS: f64 = 1e-7;

/// Scale and rotation extracted from a transform by [`unmatrix`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct XformInfo {
    /// Length of the first row.
    pub scale_x: f64,
    /// Length of the second row after shear removal, negated when the
    /// transform mirrors.
    pub scale_y: f64,
    /// Rotation in radians, in `[0, 2π)`.
    pub rotate: f64,
}

impl XformInfo {
    /// No scale, no rotation.
    pub const IDENTITY: Self = Self {
        scale_x: 1.0,
        scale_y: 1.0,
        rotate: 0.0,
    };

    /// Is there a rotation the raster cannot represent once scaled
    /// non-uniformly?
    ///
    /// Rotation combined with a non-uniform scale cannot be reproduced by
    /// scaling and rotating a cached raster.
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        let rotated = self.rotate > EPS && self.rotate < TAU - EPS;
        rotated && (self.scale_x - self.scale_y).abs() > EPS
    }
}

/// Splits the linear part of `affine` into scale and rotation.
///
/// Translation is ignored and any shear is dropped.
#[must_use]
pub fn unmatrix(affine: &Affine) -> XformInfo {
    let [mxx, myx, mxy, myy, _, _] = affine.as_coeffs();

    let mut r0 = [mxx, mxy];
    let mut r1 = [myx, myy];

    let scale_x = r0[0].hypot(r0[1]);
    if scale_x != 0.0 {
        r0 = [r0[0] / scale_x, r0[1] / scale_x];
    }
    let shear = r0[0] * r1[0] + r0[1] * r1[1];
    r1 = [r1[0] - shear * r0[0], r1[1] - shear * r0[1]];
    let mut scale_y = r1[0].hypot(r1[1]);
    if scale_y != 0.0 {
        r1 = [r1[0] / scale_y, r1[1] / scale_y];
    }
    if mxx * myy - mxy * myx < 0.0 {
        scale_y = -scale_y;
    }

    let sin = r1[0];
    let cos = r0[0].clamp(-1.0, 1.0);
    let rotate = if sin >= 0.0 {
        cos.acos()
    } else if cos > 0.0 {
        TAU + sin.clamp(-1.0, 1.0).asin()
    } else {
        PI + (-cos).acos()
    };

    XformInfo {
        scale_x,
        scale_y,
        rotate,
    }
}
