// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The flat, pitched layout of a batch handed to an accelerator.

use std::mem::{size_of, size_of_val};

use itertools::Itertools;
use log::debug;
use marlu::c32;
use ndarray::prelude::*;

use super::{DeviceProperties, NUM_OFFLOAD_DETECTORS};
use crate::{
    buffer::SegmentQuantities, constants::MAX_SPINDOWN_ORDER, data::MultiSftVector,
    fstat::FstatError, math::split_f64, params::SpinsF32,
};

/// Every row of a pitched array starts on a multiple of this many bytes.
const PITCH_ALIGN: usize = 256;

static_assertions::const_assert_eq!(PITCH_ALIGN % size_of::<c32>(), 0);
static_assertions::const_assert_eq!(PITCH_ALIGN % size_of::<f32>(), 0);
static_assertions::const_assert_eq!(NUM_OFFLOAD_DETECTORS, 2);

/// The number of bytes in a row of `n` elements of type `T`, rounded up to a
/// multiple of 256.
pub fn unipitch256<T>(n: usize) -> usize {
    (n * size_of::<T>() + PITCH_ALIGN - 1) & !(PITCH_ALIGN - 1)
}

/// The per-detector arrays of a batch. Each is indexed by segment first, then
/// SFT; SFT slots beyond `num_sfts[segment]` are zero.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorArrays {
    /// SFT bins, with shape (segments, max SFTs, SFT pitch).
    pub sft_data: Array3<c32>,

    /// The number of real SFTs in each segment.
    pub num_sfts: Vec<u32>,

    pub delta_t_int: Array2<f32>,
    pub delta_t_rem: Array2<f32>,
    pub tdot_m1: Array2<f32>,
    pub a: Array2<f32>,
    pub b: Array2<f32>,
}

impl DetectorArrays {
    /// The real SFT bins of a segment, without padding.
    pub fn sft_rows(&self, segment: usize, sft_length: usize) -> ArrayView2<c32> {
        let n = self.num_sfts[segment] as usize;
        self.sft_data.slice(s![segment, ..n, ..sft_length])
    }
}

/// Everything an accelerator needs to compute a band of F-statistics for
/// every segment.
#[derive(Debug, Clone, PartialEq)]
pub struct FstatBatch {
    pub num_segments: usize,

    /// The number of output frequency bins.
    pub num_bins: usize,

    /// The largest number of SFTs in any detector-segment, rounded up to the
    /// warp size.
    pub max_num_sfts: usize,

    /// The number of bins in every SFT.
    pub sft_length: usize,

    /// The length of an SFT row, in elements.
    pub sft_pitch: usize,

    /// The length of an output row, in elements.
    pub fstat_pitch: usize,

    /// The bin index of the first SFT bin.
    pub freq_index0: i32,

    /// The SFT duration \[seconds\].
    pub tsft: f32,

    pub dterms: u32,

    pub detectors: [DetectorArrays; NUM_OFFLOAD_DETECTORS],

    /// The antenna-pattern matrix of each segment.
    pub ad: Vec<f32>,
    pub bd: Vec<f32>,
    pub cd: Vec<f32>,
    pub dd_inv: Vec<f32>,

    /// The integer part of each bin's frequency.
    pub freq_main: Vec<f32>,

    /// The fractional part of each bin's frequency.
    pub fkdot0: Vec<f32>,

    /// fkdot\[1..\], zero-padded.
    pub spins_ex: [f32; MAX_SPINDOWN_ORDER],
}

impl FstatBatch {
    /// The number of bytes a device would need to hold the batch, including
    /// the output.
    pub fn device_bytes(&self) -> usize {
        let per_detector: usize = self
            .detectors
            .iter()
            .map(|d| {
                d.sft_data.len() * size_of::<c32>()
                    + d.num_sfts.len() * size_of::<u32>()
                    + (d.delta_t_int.len()
                        + d.delta_t_rem.len()
                        + d.tdot_m1.len()
                        + d.a.len()
                        + d.b.len())
                        * size_of::<f32>()
            })
            .sum();
        let per_segment = 4 * self.num_segments * size_of::<f32>();
        let per_bin = 2 * self.num_bins * size_of::<f32>();
        let output = self.num_segments * self.fstat_pitch * size_of::<f32>();
        per_detector + per_segment + per_bin + size_of_val(&self.spins_ex) + output
    }
}

/// Build a batch for bins `freq + k * dfreq` (k < `num_bins`) of every
/// segment.
///
/// Every segment must have exactly [`NUM_OFFLOAD_DETECTORS`] detectors, and
/// every SFT in the batch must share the same resolution, first bin and
/// length. The padded number of SFTs per detector, times the number of
/// detectors, must fit in a single block of `props`.
#[allow(clippy::too_many_arguments)]
pub fn flatten(
    sfts: &[MultiSftVector],
    segments: &[SegmentQuantities],
    spins: &SpinsF32,
    freq: f64,
    dfreq: f64,
    num_bins: usize,
    dterms: u32,
    props: &DeviceProperties,
) -> Result<FstatBatch, FstatError> {
    let num_segments = sfts.len();
    if num_segments == 0 {
        return Err(FstatError::NoSegments);
    }
    if segments.len() != num_segments {
        return Err(FstatError::SegmentCountMismatch {
            band: num_segments,
            sfts: num_segments,
            states: segments.len(),
        });
    }
    for (i_seg, multi) in sfts.iter().enumerate() {
        if multi.len() != NUM_OFFLOAD_DETECTORS {
            return Err(FstatError::OffloadDetectorCount {
                segment: i_seg,
                expected: NUM_OFFLOAD_DETECTORS,
                got: multi.len(),
            });
        }
    }

    let reference = sfts[0].first();
    let df = reference.df;
    let freq_index0 = reference.freq_index0();
    let sft_length = reference.num_bins();
    for (i_seg, multi) in sfts.iter().enumerate() {
        for sv in multi {
            if sv.df != df {
                return Err(FstatError::OffloadNonUniform(format!(
                    "segment {i_seg}, detector {}: resolution {} Hz differs from {df} Hz",
                    sv.detector, sv.df
                )));
            }
            if sv.freq_index0() != freq_index0 {
                return Err(FstatError::OffloadNonUniform(format!(
                    "segment {i_seg}, detector {}: first bin {} differs from {freq_index0}",
                    sv.detector,
                    sv.freq_index0()
                )));
            }
            if sv.num_bins() != sft_length {
                return Err(FstatError::OffloadNonUniform(format!(
                    "segment {i_seg}, detector {}: {} bins differs from {sft_length}",
                    sv.detector,
                    sv.num_bins()
                )));
            }
        }
    }

    let warp_size = props.warp_size.max(1);
    let max_sfts = sfts
        .iter()
        .flat_map(|multi| multi.iter().map(|sv| sv.num_sfts()))
        .max()
        .unwrap_or(0);
    let max_num_sfts = max_sfts.div_ceil(warp_size) * warp_size;
    let needed = max_num_sfts * NUM_OFFLOAD_DETECTORS;
    if needed > props.max_threads_per_block {
        return Err(FstatError::OffloadTooManyThreads {
            needed,
            max: props.max_threads_per_block,
        });
    }

    let sft_pitch = unipitch256::<c32>(sft_length) / size_of::<c32>();
    let fstat_pitch = unipitch256::<f32>(num_bins) / size_of::<f32>();
    debug!(
        "Flattening {num_segments} segments: {max_num_sfts} SFT slots per detector, SFT pitch {sft_pitch}, F-stat pitch {fstat_pitch}"
    );

    let shape = PaddedShape {
        max_num_sfts,
        sft_length,
        sft_pitch,
    };
    let detectors = [
        flatten_detector(0, sfts, segments, shape)?,
        flatten_detector(1, sfts, segments, shape)?,
    ];

    let (freq_main, fkdot0): (Vec<f32>, Vec<f32>) = (0..num_bins)
        .map(|k| {
            let (main, rem) = split_f64(freq + k as f64 * dfreq);
            (main as f32, rem)
        })
        .unzip();

    Ok(FstatBatch {
        num_segments,
        num_bins,
        max_num_sfts,
        sft_length,
        sft_pitch,
        fstat_pitch,
        freq_index0,
        tsft: (1.0 / df) as f32,
        dterms,
        detectors,
        ad: segments.iter().map(|q| q.am.mmunu.ad).collect(),
        bd: segments.iter().map(|q| q.am.mmunu.bd).collect(),
        cd: segments.iter().map(|q| q.am.mmunu.cd).collect(),
        dd_inv: segments.iter().map(|q| q.am.mmunu.dd_inv()).collect(),
        freq_main,
        fkdot0,
        spins_ex: spins.spindowns_padded(),
    })
}

#[derive(Clone, Copy)]
struct PaddedShape {
    max_num_sfts: usize,
    sft_length: usize,
    sft_pitch: usize,
}

fn flatten_detector(
    i_det: usize,
    sfts: &[MultiSftVector],
    segments: &[SegmentQuantities],
    shape: PaddedShape,
) -> Result<DetectorArrays, FstatError> {
    let num_segments = sfts.len();
    let PaddedShape {
        max_num_sfts,
        sft_length,
        sft_pitch,
    } = shape;
    let mut arrays = DetectorArrays {
        sft_data: Array3::zeros((num_segments, max_num_sfts, sft_pitch)),
        num_sfts: Vec::with_capacity(num_segments),
        delta_t_int: Array2::zeros((num_segments, max_num_sfts)),
        delta_t_rem: Array2::zeros((num_segments, max_num_sfts)),
        tdot_m1: Array2::zeros((num_segments, max_num_sfts)),
        a: Array2::zeros((num_segments, max_num_sfts)),
        b: Array2::zeros((num_segments, max_num_sfts)),
    };

    for (i_seg, (multi, quantities)) in sfts.iter().zip_eq(segments).enumerate() {
        let sv = &multi[i_det];
        let n = sv.num_sfts();
        let ssb = quantities
            .ssb
            .get(i_det)
            .ok_or(FstatError::DetectorCountMismatch {
                segment: i_seg,
                sfts: multi.len(),
                states: quantities.ssb.len(),
            })?;
        let am = quantities
            .am
            .data
            .get(i_det)
            .ok_or(FstatError::DetectorCountMismatch {
                segment: i_seg,
                sfts: multi.len(),
                states: quantities.am.data.len(),
            })?;
        for (what, got) in [("SSB times", ssb.len()), ("antenna pattern", am.len())] {
            if got != n {
                return Err(FstatError::LengthMismatch {
                    segment: i_seg,
                    detector: i_det,
                    what,
                    expected: n,
                    got,
                });
            }
        }

        arrays.num_sfts.push(n as u32);
        arrays
            .sft_data
            .slice_mut(s![i_seg, ..n, ..sft_length])
            .assign(&sv.data);
        for (dst, src) in [
            (&mut arrays.delta_t_int, &ssb.delta_t_int),
            (&mut arrays.delta_t_rem, &ssb.delta_t_rem),
            (&mut arrays.tdot_m1, &ssb.tdot_m1),
            (&mut arrays.a, &am.a),
            (&mut arrays.b, &am.b),
        ] {
            dst.slice_mut(s![i_seg, ..n])
                .assign(&ArrayView1::from(src.as_slice()));
        }
    }

    Ok(arrays)
}

/// Strip the row padding from a pitched F-statistic array, checking that it
/// has one row per segment and at least `num_bins` columns.
pub fn unflatten(
    fstats: ArrayView2<f32>,
    num_segments: usize,
    num_bins: usize,
) -> Result<Array2<f32>, FstatError> {
    let (rows, cols) = fstats.dim();
    if rows != num_segments || cols < num_bins {
        return Err(FstatError::OffloadOutputShape {
            segments: num_segments,
            bins: num_bins,
            rows,
            cols,
        });
    }
    Ok(fstats.slice(s![.., ..num_bins]).to_owned())
}
