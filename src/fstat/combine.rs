// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Combining per-detector Fa/Fb into the multi-detector F-statistic.

use marlu::c32;

use super::{FstatError, Fcomponents};
use crate::antenna::AntennaPatternMatrix;

/// The multi-detector F-statistic from the Fa/Fb of every detector:
///
/// F = (Bd |Fa|² + Ad |Fb|² - 2 Cd Re(Fa Fb*)) / Dd
///
/// where Fa and Fb are summed over detectors.
///
/// The SFTs are assumed to be normalised by the double-sided PSD. With
/// single-sided normalisation the result is off by a factor of 2.
pub fn core_fstat(
    components: &[Fcomponents],
    mmunu: &AntennaPatternMatrix,
) -> Result<f32, FstatError> {
    let mut fa = c32::default();
    let mut fb = c32::default();
    for c in components {
        for (what, value) in [
            ("Fa.re", c.fa.re),
            ("Fa.im", c.fa.im),
            ("Fb.re", c.fb.re),
            ("Fb.im", c.fb.im),
        ] {
            if !value.is_finite() {
                return Err(FstatError::NonFinite { what, value });
            }
        }
        fa += c.fa;
        fb += c.fb;
    }

    checked_fstat(fa, fb, mmunu.ad, mmunu.bd, mmunu.cd, mmunu.dd_inv())
}

/// The F-statistic formula applied to detector-summed Fa and Fb, rejecting a
/// non-finite result (e.g. from a singular antenna-pattern matrix).
#[inline]
pub(crate) fn checked_fstat(
    fa: c32,
    fb: c32,
    ad: f32,
    bd: f32,
    cd: f32,
    dd_inv: f32,
) -> Result<f32, FstatError> {
    let fstat = fstat_from_sums(fa, fb, ad, bd, cd, dd_inv);
    if !fstat.is_finite() {
        return Err(FstatError::NonFinite {
            what: "F-statistic",
            value: fstat,
        });
    }
    Ok(fstat)
}

#[inline]
fn fstat_from_sums(fa: c32, fb: c32, ad: f32, bd: f32, cd: f32, dd_inv: f32) -> f32 {
    dd_inv * (bd * fa.norm_sqr() + ad * fb.norm_sqr() - 2.0 * cd * (fa.re * fb.re + fa.im * fb.im))
}
