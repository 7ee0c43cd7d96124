// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Antenna-pattern coefficients, and their noise weighting.

mod error;

pub use error::AntennaError;

use log::{trace, warn};
use marlu::RADec;

use crate::{data::MultiNoiseWeights, detector::DetectorStateSeries};

/// Amplitude-modulation coefficients a(t), b(t) of one detector, one per SFT,
/// along with their sums.
#[derive(Debug, Clone, PartialEq)]
pub struct AmCoeffs {
    pub a: Vec<f32>,
    pub b: Vec<f32>,

    /// Σa²
    pub sum_aa: f32,
    /// Σb²
    pub sum_bb: f32,
    /// Σab
    pub sum_ab: f32,
    /// Σa²Σb² - (Σab)²
    pub det: f32,
}

impl AmCoeffs {
    /// Package a(t) and b(t), computing their sums.
    pub fn new(a: Vec<f32>, b: Vec<f32>) -> Result<AmCoeffs, AntennaError> {
        if a.len() != b.len() {
            return Err(AntennaError::LengthMismatch {
                a: a.len(),
                b: b.len(),
            });
        }
        let sums = Sums::of(&a, &b);
        Ok(AmCoeffs {
            a,
            b,
            sum_aa: sums.aa as f32,
            sum_bb: sums.bb as f32,
            sum_ab: sums.ab as f32,
            det: sums.det() as f32,
        })
    }

    pub fn len(&self) -> usize {
        self.a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
    }
}

/// The multi-detector antenna-pattern matrix Mμν.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AntennaPatternMatrix {
    pub ad: f32,
    pub bd: f32,
    pub cd: f32,
    /// Ad·Bd - Cd²
    pub dd: f32,
    /// The noise normalisation S⁻¹·Tsft that the weights were built with.
    pub sinv_tsft: f64,
}

impl AntennaPatternMatrix {
    pub fn dd_inv(&self) -> f32 {
        1.0 / self.dd
    }
}

/// Noise-weighted coefficients for every detector of a segment.
#[derive(Debug, Clone, PartialEq)]
pub struct MultiAmCoeffs {
    pub data: Vec<AmCoeffs>,
    pub mmunu: AntennaPatternMatrix,
}

/// Anything that can compute the antenna pattern of a detector towards a sky
/// position.
pub trait AntennaPattern: Sync {
    fn am_coeffs(&self, series: &DetectorStateSeries, sky: RADec)
        -> Result<AmCoeffs, AntennaError>;
}

/// The antenna pattern derived from the response tensor carried by each
/// detector state. a = ξᵀdξ - ηᵀdη and b = 2ξᵀdη, where ξ and η span the
/// plane of the sky.
#[derive(Debug, Clone, Copy, Default)]
pub struct TensorAntennaPattern;

impl AntennaPattern for TensorAntennaPattern {
    fn am_coeffs(
        &self,
        series: &DetectorStateSeries,
        sky: RADec,
    ) -> Result<AmCoeffs, AntennaError> {
        if series.is_empty() {
            return Err(AntennaError::NoStates(series.detector.clone()));
        }
        let (s_ra, c_ra) = sky.ra.sin_cos();
        let (s_dec, c_dec) = sky.dec.sin_cos();
        let xi = [-s_ra, c_ra, 0.0];
        let eta = [s_dec * c_ra, s_dec * s_ra, -c_dec];

        let (a, b): (Vec<f32>, Vec<f32>) = series
            .states
            .iter()
            .map(|state| {
                let d = &state.tensor;
                let a = quad_form(d, &xi, &xi) - quad_form(d, &eta, &eta);
                let b = 2.0 * quad_form(d, &xi, &eta);
                (a as f32, b as f32)
            })
            .unzip();
        AmCoeffs::new(a, b)
    }
}

/// uᵀ d v
fn quad_form(d: &[[f64; 3]; 3], u: &[f64; 3], v: &[f64; 3]) -> f64 {
    let mut sum = 0.0;
    for (i, row) in d.iter().enumerate() {
        for (j, d_ij) in row.iter().enumerate() {
            sum += u[i] * d_ij * v[j];
        }
    }
    sum
}

#[derive(Default)]
struct Sums {
    aa: f64,
    bb: f64,
    ab: f64,
}

impl Sums {
    fn of(a: &[f32], b: &[f32]) -> Sums {
        a.iter().zip(b).fold(Sums::default(), |mut acc, (&a, &b)| {
            let (a, b) = (a as f64, b as f64);
            acc.aa += a * a;
            acc.bb += b * b;
            acc.ab += a * b;
            acc
        })
    }

    fn det(&self) -> f64 {
        self.aa * self.bb - self.ab * self.ab
    }
}

/// Apply noise weights to the coefficients of every detector in a segment and
/// build the antenna-pattern matrix. With weights w, a ← a√w and b ← b√w.
/// Without weights, the coefficients are used as they are and the
/// normalisation is 1.
pub fn weigh_multi_am_coeffs(
    mut coeffs: Vec<AmCoeffs>,
    weights: Option<&MultiNoiseWeights>,
) -> Result<MultiAmCoeffs, AntennaError> {
    if coeffs.is_empty() {
        return Err(AntennaError::NoDetectors);
    }
    if let Some(weights) = weights {
        if weights.data.len() != coeffs.len() {
            return Err(AntennaError::WeightsDetectorMismatch {
                coeffs: coeffs.len(),
                weights: weights.data.len(),
            });
        }
    }

    let mut multi = Sums::default();
    for (i_det, c) in coeffs.iter_mut().enumerate() {
        if let Some(weights) = weights {
            let w = &weights.data[i_det];
            if w.len() != c.len() {
                return Err(AntennaError::WeightsLengthMismatch {
                    detector: i_det,
                    coeffs: c.len(),
                    weights: w.len(),
                });
            }
            for ((a, b), &w) in c.a.iter_mut().zip(c.b.iter_mut()).zip(w) {
                let sqrt_w = w.sqrt() as f32;
                *a *= sqrt_w;
                *b *= sqrt_w;
            }
        }

        let sums = Sums::of(&c.a, &c.b);
        c.sum_aa = sums.aa as f32;
        c.sum_bb = sums.bb as f32;
        c.sum_ab = sums.ab as f32;
        c.det = sums.det() as f32;

        multi.aa += sums.aa;
        multi.bb += sums.bb;
        multi.ab += sums.ab;
    }

    let mmunu = AntennaPatternMatrix {
        ad: multi.aa as f32,
        bd: multi.bb as f32,
        cd: multi.ab as f32,
        dd: multi.det() as f32,
        sinv_tsft: weights.map(|w| w.sinv_tsft).unwrap_or(1.0),
    };
    if !(mmunu.dd > 0.0) {
        warn!(
            "Antenna-pattern matrix is singular (Dd = {}); the F-statistic will not be finite",
            mmunu.dd
        );
    }
    trace!(
        "Ad = {}, Bd = {}, Cd = {}, Dd = {}",
        mmunu.ad,
        mmunu.bd,
        mmunu.cd,
        mmunu.dd
    );

    Ok(MultiAmCoeffs { data: coeffs, mmunu })
}
