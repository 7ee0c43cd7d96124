// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The single-detector Fa/Fb kernel.
//!
//! For every SFT α the signal's instantaneous frequency, in units of SFT bins,
//! is Dφ = k* + κ. Fa and Fb are the antenna-weighted sums over SFTs of the SFT
//! bins around k*, interpolated with a Dirichlet kernel truncated to `dterms`
//! bins either side and rotated by the signal's phase at the SFT midpoint.
//!
//! Everything here is single precision. The frequency arrives split into an
//! integer and a remainder (see [`SpinsF32`]) and the SSB times are split the
//! same way, so the large products that would destroy the phase are either
//! integers or never formed.

use marlu::c32;
use ndarray::prelude::*;

use super::FstatError;
use crate::{
    constants::{INV_FACT, KAPPA_SMALL, MAX_DTERMS, OO_TWOPI_F32, TWOPI_F32},
    math::{rem, trim_unit, SinCosLut},
    params::SpinsF32,
};

/// Everything the kernel needs to know about one detector in one segment.
#[derive(Debug, Clone, Copy)]
pub struct DetectorKernelInputs<'a> {
    /// SFT bins, one row per SFT. Rows may be longer than `num_bins` (e.g.
    /// padded device rows); only the first `num_bins` columns are read.
    pub sft_data: ArrayView2<'a, c32>,

    /// The number of valid bins in each SFT row.
    pub num_bins: usize,

    /// The bin index of the first column of `sft_data`, counted from 0 Hz.
    pub freq_index0: i32,

    /// The SFT duration \[seconds\].
    pub tsft: f32,

    pub delta_t_int: &'a [f32],
    pub delta_t_rem: &'a [f32],
    pub tdot_m1: &'a [f32],

    /// Noise-weighted antenna-pattern coefficients.
    pub a: &'a [f32],
    pub b: &'a [f32],
}

impl DetectorKernelInputs<'_> {
    pub fn num_sfts(&self) -> usize {
        self.a.len()
    }

    fn check(&self) -> Result<(), FstatError> {
        let n = self.num_sfts();
        let rows = self.sft_data.len_of(Axis(0));
        let cols = self.sft_data.len_of(Axis(1));
        for (what, expected, got) in [
            ("b", n, self.b.len()),
            ("delta_t_int", n, self.delta_t_int.len()),
            ("delta_t_rem", n, self.delta_t_rem.len()),
            ("tdot_m1", n, self.tdot_m1.len()),
            ("SFT data", n, rows.min(n)),
            ("SFT row", self.num_bins, cols.min(self.num_bins)),
        ] {
            if got != expected {
                return Err(FstatError::KernelLengthMismatch {
                    what,
                    expected,
                    got,
                });
            }
        }
        Ok(())
    }
}

/// Single-detector Fa and Fb.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Fcomponents {
    pub fa: c32,
    pub fb: c32,
}

/// The per-SFT quantities derived from the phase model.
#[derive(Debug, Clone, Copy)]
struct SftPhase {
    /// The central bin.
    kstar: i32,
    /// The offset of the signal from `kstar`, in `[0, 1)`.
    kappa: f32,
    /// The residual phase (in cycles) used to rotate the sum.
    lambda: f32,
}

/// Phase quantities that don't change from SFT to SFT.
struct PhaseModel<'a> {
    spins: &'a SpinsF32,
    freq: f32,
    t0_offs: f32,
    phi_offs: f32,
    tsft: f32,
}

impl<'a> PhaseModel<'a> {
    fn new(spins: &'a SpinsF32, t0_offs: f32, tsft: f32) -> PhaseModel<'a> {
        let f0 = spins.freq_main;
        let df = spins.freq_rem;
        let tau = 1.0 / df;
        let phi_offs = df * (t0_offs % tau);
        PhaseModel {
            spins,
            freq: f0 + df,
            t0_offs,
            phi_offs,
            tsft,
        }
    }

    fn sft_phase(&self, delta_t_int: f32, delta_t_rem: f32, tdot_m1: f32) -> SftPhase {
        let f0 = self.spins.freq_main;
        let df = self.spins.freq_rem;

        let dt = delta_t_rem;
        let t0 = delta_t_int - self.t0_offs;
        let delta_t = delta_t_int + dt;

        // f0 * t0 is a whole number of cycles and is left out.
        let mut phi_rem = self.phi_offs + f0 * dt + t0 * df + df * dt;
        let mut dphi_int = f0;
        let mut dphi_rem = df + self.freq * tdot_m1;

        let mut tas = delta_t;
        for (s, &fsdot) in self.spins.spindowns.iter().enumerate() {
            let s = s + 1;
            dphi_rem += fsdot * tas * INV_FACT[s];
            tas *= delta_t;
            phi_rem += fsdot * tas * INV_FACT[s + 1];
        }

        dphi_int *= self.tsft;
        dphi_rem *= self.tsft;

        let lambda = phi_rem - (rem(0.5 * dphi_int) + rem(0.5 * dphi_rem));
        let mut kstar = dphi_int as i32 + dphi_rem as i32;
        let mut kappa = rem(dphi_int) + rem(dphi_rem);
        // Carry whole bins into kstar so that kappa is in [0, 1). The kernel
        // only depends on Dφ - k, so this just recentres the window.
        if kappa < 0.0 {
            kappa += 1.0;
            kstar -= 1;
        } else if kappa >= 1.0 {
            kappa -= 1.0;
            kstar += 1;
        }

        SftPhase {
            kstar,
            kappa,
            lambda,
        }
    }
}

/// Compute Fa and Fb for a single detector.
///
/// `dterms` is the number of bins used either side of the signal bin. The
/// required bins must all be present in the SFTs; the window is never clamped.
pub fn compute_fa_fb(
    inputs: &DetectorKernelInputs,
    spins: &SpinsF32,
    dterms: u32,
    lut: &SinCosLut,
) -> Result<Fcomponents, FstatError> {
    if dterms == 0 {
        return Err(FstatError::NoDterms);
    }
    if dterms > MAX_DTERMS {
        return Err(FstatError::TooManyDterms(dterms));
    }
    inputs.check()?;
    if inputs.num_sfts() == 0 {
        return Ok(Fcomponents::default());
    }

    let dterms_i = dterms as i32;
    let index0 = inputs.freq_index0;
    let index1 = index0 + inputs.num_bins as i32;
    let model = PhaseModel::new(spins, inputs.delta_t_int[0], inputs.tsft);

    let mut fa = c32::default();
    let mut fb = c32::default();
    for (i_sft, x_alpha) in inputs
        .sft_data
        .outer_iter()
        .take(inputs.num_sfts())
        .enumerate()
    {
        let phase = model.sft_phase(
            inputs.delta_t_int[i_sft],
            inputs.delta_t_rem[i_sft],
            inputs.tdot_m1[i_sft],
        );
        for (what, value) in [("kappa", phase.kappa), ("lambda", phase.lambda)] {
            if !value.is_finite() {
                return Err(FstatError::NonFinite { what, value });
            }
        }

        let k0 = phase.kstar - dterms_i + 1;
        let k1 = k0 + 2 * dterms_i - 1;
        if k0 < index0 || k1 >= index1 {
            return Err(FstatError::Domain {
                k0,
                k1,
                index0,
                index1,
            });
        }
        let first = (k0 - index0) as usize;
        let window = x_alpha.slice(s![first..first + 2 * dterms as usize]);

        let xp = if phase.kappa > KAPPA_SMALL && phase.kappa < 1.0 - KAPPA_SMALL {
            kernel_sum_general(window, phase.kappa, dterms, lut)?
        } else {
            kernel_sum_limit(window, phase.kappa, dterms)
        };

        // Q = exp(-2πiλ)
        let (imag_q, real_q) = lut.sin_cos_2pi(-phase.lambda);
        let qxp = c32::new(real_q, imag_q) * xp;

        let a = inputs.a[i_sft];
        let b = inputs.b[i_sft];
        if !qxp.re.is_finite() || !qxp.im.is_finite() {
            return Err(FstatError::NonFinite {
                what: "SFT contribution",
                value: if qxp.re.is_finite() { qxp.im } else { qxp.re },
            });
        }
        fa += qxp * a;
        fb += qxp * b;
    }

    Ok(Fcomponents {
        fa: fa * OO_TWOPI_F32,
        fb: fb * OO_TWOPI_F32,
    })
}

/// The truncated Dirichlet-kernel sum Σₖ Xₖ Pₖ over a `2 * dterms` bin window
/// starting at `kstar - dterms + 1`.
///
/// The 2·dterms fractions 1/(κ + dterms - 1 - l) are accumulated over a common
/// denominator so only one division is needed.
pub(crate) fn kernel_sum_general(
    window: ArrayView1<c32>,
    kappa: f32,
    dterms: u32,
    lut: &SinCosLut,
) -> Result<c32, FstatError> {
    let kappa_max = kappa + dterms as f32 - 1.0;

    let mut iter = window.iter();
    let first = iter.next().copied().unwrap_or_default();
    let mut sn = first.re;
    let mut tn = first.im;
    let mut pn = kappa_max;
    let mut qn = pn;
    for x in iter {
        pn -= 1.0;
        sn = pn * sn + qn * x.re;
        tn = pn * tn + qn * x.im;
        qn *= pn;
    }

    let qn_inv = 1.0 / qn;
    let u = sn * qn_inv;
    let v = tn * qn_inv;
    for (what, value) in [("U", u), ("V", v), ("Sn", sn), ("Tn", tn), ("qn", qn)] {
        if !value.is_finite() {
            return Err(FstatError::NonFinite { what, value });
        }
    }

    let (s, c) = lut.sin_cos_2pi_trimmed(trim_unit(kappa));
    let c = c - 1.0;
    Ok(c32::new(s * u - c * v, c * u + s * v))
}

/// The κ → 0 (or κ → 1) limit of [`kernel_sum_general`]: 2π times the bin
/// the signal sits on.
pub(crate) fn kernel_sum_limit(window: ArrayView1<c32>, kappa: f32, dterms: u32) -> c32 {
    let ind0 = if kappa <= KAPPA_SMALL {
        dterms as usize - 1
    } else {
        dterms as usize
    };
    window[ind0] * TWOPI_F32
}
