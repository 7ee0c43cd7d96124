// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Frequency-domain input data (SFTs), noise weights and the F-statistic band
//! output.

mod error;
mod file;

pub use error::{DataFileError, SftError};
pub use file::{
    DetectorRecord, FstatBandRecord, FstatData, SegmentRecord, SftDataFile, SftRecord,
};

use hifitime::{Duration, Epoch};
use log::trace;
use marlu::c32;
use ndarray::prelude::*;
use serde::{Deserialize, Serialize};
use vec1::Vec1;

/// A single short Fourier transform.
#[derive(Debug, Clone, PartialEq)]
pub struct Sft {
    /// The start time of the SFT.
    pub epoch: Epoch,

    /// The frequency of the first bin \[Hz\].
    pub f0: f64,

    /// The frequency resolution \[Hz\]. The SFT duration is `1 / df`.
    pub df: f64,

    /// The (PSD-normalised) complex bins.
    pub data: Vec<c32>,
}

/// All of the SFTs of one detector in one segment. Every SFT shares the same
/// `f0`, `df` and number of bins; this is checked when the vector is built.
#[derive(Debug, Clone, PartialEq)]
pub struct SftVector {
    /// The name of the detector these SFTs came from (e.g. "H1").
    pub detector: String,

    /// The frequency of the first bin \[Hz\].
    pub f0: f64,

    /// The frequency resolution \[Hz\].
    pub df: f64,

    /// The start time of each SFT.
    pub epochs: Vec<Epoch>,

    /// The SFT bins. The first dimension is SFT, the second is frequency.
    pub data: Array2<c32>,
}

/// The SFTs of all detectors in a single segment.
pub type MultiSftVector = Vec1<SftVector>;

impl SftVector {
    /// Gather individual SFTs into a vector, checking that they all have the
    /// same frequency resolution, first frequency and number of bins.
    pub fn from_sfts(detector: &str, sfts: &[Sft]) -> Result<SftVector, SftError> {
        let first = sfts.first().ok_or(SftError::Empty)?;
        if !(first.df > 0.0) || !first.df.is_finite() {
            return Err(SftError::BadResolution(first.df));
        }
        let num_bins = first.data.len();
        if num_bins == 0 {
            return Err(SftError::NoBins);
        }

        let mut data = Array2::zeros((sfts.len(), num_bins));
        for (i_sft, (sft, mut row)) in sfts.iter().zip(data.outer_iter_mut()).enumerate() {
            if sft.df != first.df {
                return Err(SftError::InconsistentResolution {
                    index: i_sft,
                    expected: first.df,
                    got: sft.df,
                });
            }
            if sft.data.len() != num_bins {
                return Err(SftError::InconsistentLength {
                    index: i_sft,
                    expected: num_bins,
                    got: sft.data.len(),
                });
            }
            // The first bin index is what matters to the kernel; compare that
            // rather than the floats.
            if freq_index(sft.f0, sft.df) != freq_index(first.f0, first.df) {
                return Err(SftError::InconsistentStartFreq {
                    index: i_sft,
                    expected: first.f0,
                    got: sft.f0,
                });
            }
            row.assign(&ArrayView1::from(sft.data.as_slice()));
        }
        trace!(
            "{detector}: gathered {} SFTs with {num_bins} bins starting at {} Hz",
            sfts.len(),
            first.f0
        );

        Ok(SftVector {
            detector: detector.to_string(),
            f0: first.f0,
            df: first.df,
            epochs: sfts.iter().map(|s| s.epoch).collect(),
            data,
        })
    }

    pub fn num_sfts(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn num_bins(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    /// The index of the first bin, counted from 0 Hz.
    pub fn freq_index0(&self) -> i32 {
        freq_index(self.f0, self.df)
    }

    /// The SFT duration \[seconds\].
    pub fn tsft(&self) -> f64 {
        1.0 / self.df
    }

    /// The start times of all SFTs.
    pub fn timestamps(&self) -> &[Epoch] {
        &self.epochs
    }

    /// Get a new vector containing only the bins covering `[fmin, fmin +
    /// band]`.
    pub fn extract_band(&self, fmin: f64, band: f64) -> Result<SftVector, SftError> {
        if !(band >= 0.0) {
            return Err(SftError::BadBand { fmin, band });
        }
        // Tolerate a little floating-point slop at either end.
        let eps = 1e-6;
        let first = ((fmin - self.f0) / self.df + eps).floor();
        let last = ((fmin + band - self.f0) / self.df - eps).ceil();
        if first < 0.0 || last >= self.num_bins() as f64 {
            return Err(SftError::BandNotCovered {
                fmin,
                band,
                f0: self.f0,
                f1: self.f0 + (self.num_bins() - 1) as f64 * self.df,
            });
        }
        let (first, last) = (first as usize, last as usize);

        Ok(SftVector {
            detector: self.detector.clone(),
            f0: self.f0 + first as f64 * self.df,
            df: self.df,
            epochs: self.epochs.clone(),
            data: self.data.slice(s![.., first..=last]).to_owned(),
        })
    }
}

fn freq_index(f0: f64, df: f64) -> i32 {
    (f0 / df + 0.5) as i32
}

/// Regularly-spaced timestamps covering `[start, start + duration)`. Only
/// timestamps whose `step`-long interval fits entirely within the span are
/// produced.
pub fn make_timestamps(start: Epoch, duration: Duration, step: Duration) -> Vec<Epoch> {
    let step_s = step.to_seconds();
    if !(step_s > 0.0) {
        return vec![];
    }
    let n = (duration.to_seconds() / step_s + 1e-9).floor().max(0.0) as usize;
    (0..n).map(|i| start + step * i as i64).collect()
}

/// Per-SFT noise weights for all detectors of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiNoiseWeights {
    /// One weight per SFT, per detector.
    pub data: Vec<Vec<f64>>,

    /// The normalisation S⁻¹·Tsft, using the single-sided PSD.
    pub sinv_tsft: f64,
}

impl MultiNoiseWeights {
    /// Derive normalised weights from per-SFT (single-sided) PSD estimates.
    /// Each weight is S⁻¹ divided by the mean S⁻¹ over every SFT of every
    /// detector, so the weights average to 1.
    pub fn from_psd(psds: &[Vec<f64>], tsft: f64) -> Result<MultiNoiseWeights, SftError> {
        let mut sum = 0.0;
        let mut count = 0;
        for (i_det, psd) in psds.iter().enumerate() {
            for (i_sft, &s) in psd.iter().enumerate() {
                if !(s > 0.0) || !s.is_finite() {
                    return Err(SftError::BadPsd {
                        detector: i_det,
                        index: i_sft,
                        value: s,
                    });
                }
                sum += 1.0 / s;
                count += 1;
            }
        }
        if count == 0 {
            return Err(SftError::Empty);
        }
        let mean_sinv = sum / count as f64;

        Ok(MultiNoiseWeights {
            data: psds
                .iter()
                .map(|psd| psd.iter().map(|s| 1.0 / s / mean_sinv).collect())
                .collect(),
            sinv_tsft: tsft * mean_sinv,
        })
    }

    /// Unit weights for the given number of SFTs per detector.
    pub fn unit(num_sfts: &[usize], tsft: f64) -> MultiNoiseWeights {
        MultiNoiseWeights {
            data: num_sfts.iter().map(|&n| vec![1.0; n]).collect(),
            sinv_tsft: tsft,
        }
    }
}

/// F-statistic values over a band of frequency bins, for every segment.
#[derive(Debug, Clone, PartialEq)]
pub struct FstatBandVector {
    /// The frequency of the first bin \[Hz\].
    pub f0: f64,

    /// The spacing of the bins \[Hz\].
    pub df: f64,

    /// The first dimension is segment, the second is frequency bin.
    pub fstats: Array2<f32>,
}

impl FstatBandVector {
    pub fn new(f0: f64, df: f64, num_segments: usize, num_bins: usize) -> FstatBandVector {
        FstatBandVector {
            f0,
            df,
            fstats: Array2::zeros((num_segments, num_bins)),
        }
    }

    pub fn num_segments(&self) -> usize {
        self.fstats.len_of(Axis(0))
    }

    pub fn num_bins(&self) -> usize {
        self.fstats.len_of(Axis(1))
    }

    /// The frequency of bin `k`.
    pub fn freq(&self, k: usize) -> f64 {
        self.f0 + k as f64 * self.df
    }
}
