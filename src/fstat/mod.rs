// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Computing the F-statistic over a band of frequencies, for every segment.

pub(crate) mod combine;
mod error;
mod kernel;

pub use combine::core_fstat;
pub use error::{FstatError, FstatErrorKind};
pub use kernel::{compute_fa_fb, DetectorKernelInputs, Fcomponents};

use log::{debug, trace};
use ndarray::prelude::*;
use rayon::prelude::*;

use crate::{
    antenna::{AntennaPattern, AntennaPatternMatrix},
    buffer::{FstatBuffer, SegmentQuantities},
    constants::{MAX_DTERMS, MAX_SPINDOWN_ORDER},
    data::{FstatBandVector, MultiNoiseWeights, MultiSftVector},
    detector::DetectorStatesSequence,
    gpu::{flatten, unflatten, Accelerator, GpuError, HostAccelerator},
    math::SinCosLut,
    params::{ParameterPoint, SpinsF32},
    ssb::Barycentre,
};

/// The data an F-statistic is computed from. Every slice has one element per
/// segment.
#[derive(Debug, Clone, Copy)]
pub struct FstatInputs<'a> {
    pub sfts: &'a [MultiSftVector],

    /// Noise weights for each segment. If `None`, every SFT has unit weight.
    pub weights: Option<&'a [MultiNoiseWeights]>,

    pub states: &'a DetectorStatesSequence,
}

/// Computes F-statistics for one sky scan at a time.
///
/// The sky-position-dependent quantities are buffered, so consecutive calls at
/// the same sky position (e.g. stepping over frequency or spindown) only pay
/// for the kernel. Use one computer per concurrent scan.
pub struct FstatComputer<'a> {
    lut: &'static SinCosLut,
    dterms: u32,
    barycentre: &'a dyn Barycentre,
    antenna: &'a dyn AntennaPattern,
    buffer: FstatBuffer,
}

impl<'a> FstatComputer<'a> {
    pub fn new(
        dterms: u32,
        barycentre: &'a dyn Barycentre,
        antenna: &'a dyn AntennaPattern,
    ) -> FstatComputer<'a> {
        FstatComputer {
            lut: SinCosLut::shared(),
            dterms,
            barycentre,
            antenna,
            buffer: FstatBuffer::new(),
        }
    }

    pub fn dterms(&self) -> u32 {
        self.dterms
    }

    pub fn buffer(&self) -> &FstatBuffer {
        &self.buffer
    }

    /// Drop the buffered sky-position quantities.
    pub fn release_buffer(&mut self) {
        self.buffer.release();
    }

    /// Fill `band` with the F-statistic at `point.freq + k * band.df` for
    /// every bin k and every segment.
    ///
    /// `band.f0` must be within one bin of `point.freq`; the frequencies
    /// themselves are always derived from `point.freq`. If anything fails,
    /// `band` is left untouched.
    pub fn compute_fstat_band_vector(
        &mut self,
        band: &mut FstatBandVector,
        point: &ParameterPoint,
        inputs: &FstatInputs,
    ) -> Result<(), FstatError> {
        self.check_band(band, point, inputs)?;
        let fstats = self.compute_bins(point, inputs, band.df, band.num_bins())?;
        band.fstats = fstats;
        Ok(())
    }

    /// The F-statistic at `point.freq` for every segment.
    pub fn compute_fstat_point(
        &mut self,
        point: &ParameterPoint,
        inputs: &FstatInputs,
    ) -> Result<Vec<f32>, FstatError> {
        self.check_inputs(point, inputs)?;
        let fstats = self.compute_bins(point, inputs, 0.0, 1)?;
        Ok(fstats.column(0).to_vec())
    }

    /// As [`FstatComputer::compute_fstat_band_vector`], but every segment and
    /// bin is computed in a single dispatch to `accel`.
    ///
    /// Every segment must have exactly two detectors, and every SFT must share
    /// the same resolution, first bin and length. These are checked before
    /// anything is given to the accelerator.
    pub fn compute_fstat_band_vector_gpu(
        &mut self,
        accel: &dyn Accelerator,
        band: &mut FstatBandVector,
        point: &ParameterPoint,
        inputs: &FstatInputs,
    ) -> Result<(), FstatError> {
        self.check_band(band, point, inputs)?;
        let props = accel.device_properties()?;

        let segments = self.buffer.get_or_compute(
            point.sky,
            point.ref_time,
            inputs.states,
            inputs.weights,
            self.barycentre,
            self.antenna,
        )?;
        let spins = SpinsF32::new(point.freq, &point.spindowns);
        let batch = flatten(
            inputs.sfts,
            segments,
            &spins,
            point.freq,
            band.df,
            band.num_bins(),
            self.dterms,
            &props,
        )?;
        debug!(
            "Dispatching {} segments × {} bins to {} ({} MiB)",
            batch.num_segments,
            batch.num_bins,
            props.name,
            batch.device_bytes().div_ceil(1024 * 1024)
        );

        let pitched = accel.run_fstat_batch(&batch)?;
        band.fstats = unflatten(pitched.view(), band.num_segments(), band.num_bins())?;
        Ok(())
    }

    fn check_band(
        &self,
        band: &FstatBandVector,
        point: &ParameterPoint,
        inputs: &FstatInputs,
    ) -> Result<(), FstatError> {
        if band.num_bins() == 0 {
            return Err(FstatError::EmptyBand);
        }
        if band.num_segments() != inputs.sfts.len() {
            return Err(FstatError::SegmentCountMismatch {
                band: band.num_segments(),
                sfts: inputs.sfts.len(),
                states: inputs.states.num_segments(),
            });
        }
        if (band.f0 - point.freq).abs() >= band.df {
            return Err(FstatError::BandStartMismatch {
                band_f0: band.f0,
                freq: point.freq,
                df: band.df,
            });
        }
        self.check_inputs(point, inputs)
    }

    fn check_inputs(&self, point: &ParameterPoint, inputs: &FstatInputs) -> Result<(), FstatError> {
        let num_segments = inputs.sfts.len();
        if num_segments == 0 {
            return Err(FstatError::NoSegments);
        }
        if inputs.states.num_segments() != num_segments {
            return Err(FstatError::SegmentCountMismatch {
                band: num_segments,
                sfts: num_segments,
                states: inputs.states.num_segments(),
            });
        }
        if let Some(weights) = inputs.weights {
            if weights.len() != num_segments {
                return Err(FstatError::WeightsSegmentMismatch {
                    weights: weights.len(),
                    segments: num_segments,
                });
            }
        }
        if point.spindowns.len() > MAX_SPINDOWN_ORDER {
            return Err(FstatError::TooManySpindowns(point.spindowns.len()));
        }
        if self.dterms == 0 {
            return Err(FstatError::NoDterms);
        }
        if self.dterms > MAX_DTERMS {
            return Err(FstatError::TooManyDterms(self.dterms));
        }

        for (i_seg, (multi_sfts, multi_states)) in inputs
            .sfts
            .iter()
            .zip(inputs.states.segments())
            .enumerate()
        {
            if multi_sfts.len() != multi_states.len() {
                return Err(FstatError::DetectorCountMismatch {
                    segment: i_seg,
                    sfts: multi_sfts.len(),
                    states: multi_states.len(),
                });
            }
            for (i_det, (sv, series)) in multi_sfts.iter().zip(multi_states).enumerate() {
                if sv.num_sfts() != series.len() {
                    return Err(FstatError::LengthMismatch {
                        segment: i_seg,
                        detector: i_det,
                        what: "detector states",
                        expected: sv.num_sfts(),
                        got: series.len(),
                    });
                }
            }
        }
        Ok(())
    }

    /// The F-statistic at `point.freq + k * df` for k < `num_bins`, with
    /// shape (segments, bins).
    fn compute_bins(
        &mut self,
        point: &ParameterPoint,
        inputs: &FstatInputs,
        df: f64,
        num_bins: usize,
    ) -> Result<Array2<f32>, FstatError> {
        let segments = self.buffer.get_or_compute(
            point.sky,
            point.ref_time,
            inputs.states,
            inputs.weights,
            self.barycentre,
            self.antenna,
        )?;
        let spins = SpinsF32::new(point.freq, &point.spindowns);
        let dterms = self.dterms;
        let lut = self.lut;
        debug!(
            "Computing {} segments × {num_bins} bins from {} Hz (spindown order {}, Dterms {dterms})",
            segments.len(),
            point.freq,
            spins.order()
        );

        let mut fstats = Array2::zeros((segments.len(), num_bins));
        for (i_seg, ((mut row, multi_sfts), quantities)) in fstats
            .outer_iter_mut()
            .zip(inputs.sfts)
            .zip(segments)
            .enumerate()
        {
            let detectors = detector_inputs(i_seg, multi_sfts, quantities)?;
            let mmunu = &quantities.am.mmunu;
            row.as_slice_mut()
                .expect("is contiguous")
                .par_iter_mut()
                .enumerate()
                .try_for_each(|(k, fstat)| {
                    let spins = spins.with_freq(point.freq + k as f64 * df);
                    *fstat = fstat_at(&detectors, &spins, mmunu, dterms, lut)?;
                    Ok::<(), FstatError>(())
                })?;
            trace!(
                "Segment {i_seg}: {} detectors, Ad {} Bd {} Cd {} Dd {}",
                detectors.len(),
                mmunu.ad,
                mmunu.bd,
                mmunu.cd,
                mmunu.dd
            );
        }

        Ok(fstats)
    }
}

/// Pair the SFTs of a segment with their buffered timing and antenna
/// patterns.
fn detector_inputs<'b>(
    i_seg: usize,
    multi_sfts: &'b MultiSftVector,
    quantities: &'b SegmentQuantities,
) -> Result<Vec<DetectorKernelInputs<'b>>, FstatError> {
    if quantities.ssb.len() != multi_sfts.len() || quantities.am.data.len() != multi_sfts.len() {
        return Err(FstatError::DetectorCountMismatch {
            segment: i_seg,
            sfts: multi_sfts.len(),
            states: quantities.ssb.len(),
        });
    }

    multi_sfts
        .iter()
        .zip(&quantities.ssb)
        .zip(&quantities.am.data)
        .enumerate()
        .map(|(i_det, ((sv, ssb), am))| {
            let n = sv.num_sfts();
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
            Ok(DetectorKernelInputs {
                sft_data: sv.data.view(),
                num_bins: sv.num_bins(),
                freq_index0: sv.freq_index0(),
                tsft: sv.tsft() as f32,
                delta_t_int: &ssb.delta_t_int,
                delta_t_rem: &ssb.delta_t_rem,
                tdot_m1: &ssb.tdot_m1,
                a: &am.a,
                b: &am.b,
            })
        })
        .collect()
}

fn fstat_at(
    detectors: &[DetectorKernelInputs],
    spins: &SpinsF32,
    mmunu: &AntennaPatternMatrix,
    dterms: u32,
    lut: &SinCosLut,
) -> Result<f32, FstatError> {
    let components = detectors
        .iter()
        .map(|d| compute_fa_fb(d, spins, dterms, lut))
        .collect::<Result<Vec<_>, _>>()?;
    core_fstat(&components, mmunu)
}

/// Where F-statistics are computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FstatDevice {
    /// The CPU, with bins spread over threads.
    Cpu,

    /// The batched accelerator path, emulated on the host.
    HostGpu,
}

impl FstatDevice {
    /// Get a formatted string with information on the device used for
    /// computing F-statistics.
    pub fn get_device_info(self) -> Result<String, GpuError> {
        match self {
            FstatDevice::Cpu => Ok(get_cpu_info()),
            FstatDevice::HostGpu => {
                let props = HostAccelerator::default().device_properties()?;
                Ok(format!(
                    "{} (warp size {}, {} threads per block, {} MiB)",
                    props.name, props.warp_size, props.max_threads_per_block, props.total_global_mem
                ))
            }
        }
    }
}

fn get_cpu_info() -> String {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        let avx = std::arch::is_x86_feature_detected!("avx");
        let avx2 = std::arch::is_x86_feature_detected!("avx2");
        let simd = match (avx2, avx) {
            (true, _) => "AVX2 available",
            (false, true) => "AVX available",
            (false, false) => "AVX unavailable!",
        };
        format!("{} CPU ({simd})", std::env::consts::ARCH)
    }

    #[cfg(not(any(target_arch = "x86", target_arch = "x86_64")))]
    format!("{} CPU", std::env::consts::ARCH)
}
