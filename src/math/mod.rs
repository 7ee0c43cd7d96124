// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.
//!
//! The F-statistic kernel evaluates sin/cos twice per SFT for every frequency
//! bin, so the transcendental calls are replaced with a small lookup table and
//! a second-order Taylor expansion about the nearest table node.


use crate::constants::LUT_RES;

const OO_LUT_RES: f32 = 1.0 / LUT_RES as f32;

lazy_static::lazy_static! {
    static ref SHARED_LUT: SinCosLut = SinCosLut::new();
}

/// Samples of sin(2πx) and cos(2πx) over one period, including the end
/// point.
#[derive(Debug, Clone)]
pub struct SinCosLut {
    sin_val: [f32; LUT_RES + 1],
    cos_val: [f32; LUT_RES + 1],
}

impl SinCosLut {
    /// Build a new table. The values are computed in double precision before
    /// being demoted.
    pub fn new() -> SinCosLut {
        let mut sin_val = [0.0; LUT_RES + 1];
        let mut cos_val = [0.0; LUT_RES + 1];
        for (k, (s, c)) in sin_val.iter_mut().zip(cos_val.iter_mut()).enumerate() {
            let (sin, cos) = (std::f64::consts::TAU * k as f64 / LUT_RES as f64).sin_cos();
            *s = sin as f32;
            *c = cos as f32;
        }
        SinCosLut { sin_val, cos_val }
    }

    /// Get the process-wide table. It is built the first time this function is
    /// called; every later call returns the same table.
    pub fn shared() -> &'static SinCosLut {
        &SHARED_LUT
    }

    /// sin(2πx) and cos(2πx) for any finite `x`.
    #[inline]
    pub fn sin_cos_2pi(&self, x: f32) -> (f32, f32) {
        self.sin_cos_2pi_trimmed(trim_unit(x))
    }

    /// sin(2πx) and cos(2πx) for `x` already reduced to `[0, 1]`.
    #[inline]
    pub fn sin_cos_2pi_trimmed(&self, x: f32) -> (f32, f32) {
        debug_assert!((0.0..=1.0).contains(&x), "x = {x} was not trimmed");

        let i0 = (x * LUT_RES as f32 + 0.5) as usize;
        let d = std::f32::consts::TAU * (x - OO_LUT_RES * i0 as f32);
        let d2 = 0.5 * d * d;

        let ts = self.sin_val[i0];
        let tc = self.cos_val[i0];
        (ts + d * tc - d2 * ts, tc - d * ts - d2 * tc)
    }
}

impl Default for SinCosLut {
    fn default() -> Self {
        Self::new()
    }
}

/// Reduce `x` into `[0, 1)`.
#[inline]
pub(crate) fn trim_unit(x: f32) -> f32 {
    let t = rem(x);
    if t < 0.0 {
        // Tiny negative remainders round to exactly 1.0; keep the interval
        // half-open.
        let t = t + 1.0;
        if t >= 1.0 {
            0.0
        } else {
            t
        }
    } else {
        t
    }
}

/// The remainder of `x` after truncation towards zero. The result has the same
/// sign as `x`.
#[inline]
pub(crate) fn rem(x: f32) -> f32 {
    x - (x as i32) as f32
}

/// Split a double-precision value into its integer part (truncated towards
/// zero) and the single-precision remainder. The integer part is what the
/// single-precision kernel treats as "exact".
#[inline]
pub(crate) fn split_f64(x: f64) -> (i32, f32) {
    let int = x as i32;
    (int, (x - int as f64) as f32)
}
