// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Useful constants.

The F-statistic core is single precision, so the constants used
inside the kernel are `f32`. Anything consumed before the single-precision
split (timing, weights) is double precision.
 */

pub use std::f64::consts::{PI, TAU};

/// Single-precision 2π.
pub const TWOPI_F32: f32 = std::f32::consts::TAU;

/// Single-precision 1 / 2π.
pub const OO_TWOPI_F32: f32 = 1.0 / TWOPI_F32;

/// A fractional bin offset closer than this to 0 or 1 is treated as an exact
/// bin-centre hit, and the Dirichlet kernel collapses to a single bin.
pub const KAPPA_SMALL: f32 = 2.0e-4;

/// Resolution of the sin/cos lookup table (samples per period).
pub const LUT_RES: usize = 64;

/// The maximum number of spindown terms (fkdot\[1..\]) accepted in a
/// parameter-space point.
pub const MAX_SPINDOWN_ORDER: usize = 6;

/// Inverse factorials 1/s! for s = 0..=[`MAX_SPINDOWN_ORDER`] + 1.
pub const INV_FACT: [f32; MAX_SPINDOWN_ORDER + 2] = [
    1.0,
    1.0,
    1.0 / 2.0,
    1.0 / 6.0,
    1.0 / 24.0,
    1.0 / 120.0,
    1.0 / 720.0,
    1.0 / 5040.0,
];

/// The default number of Dirichlet-kernel terms either side of the signal
/// bin.
pub const DEFAULT_DTERMS: u32 = 16;

/// The largest accepted number of Dirichlet-kernel terms. Keeps the window
/// arithmetic within `i32`.
pub const MAX_DTERMS: u32 = 1 << 16;

/// Speed of light \[metres per second\].
pub const VEL_C: f64 = 299_792_458.0;
