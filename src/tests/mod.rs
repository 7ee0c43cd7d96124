// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Helpful functions for tests: synthetic SFTs, detector states and simple
//! collaborators.

use hifitime::Epoch;
use marlu::{c32, RADec};
use vec1::Vec1;

use crate::{
    antenna::{AmCoeffs, AntennaError, AntennaPattern},
    data::{
        DetectorRecord, MultiSftVector, SegmentRecord, Sft, SftDataFile, SftRecord, SftVector,
    },
    detector::{DetectorState, DetectorStateSeries, DetectorStatesSequence},
    ssb::{Barycentre, BarycentreError, EmissionTime},
};

pub(crate) const TSFT: f64 = 1800.0;
pub(crate) const GPS_START: f64 = 1_000_000_000.0;

/// A deterministic, bin-dependent SFT value.
pub(crate) fn sft_value(seed: usize, i_sft: usize, k: usize) -> c32 {
    let re = ((seed * 3 + i_sft * 7 + k * 3) % 11) as f32 / 11.0 - 0.5;
    let im = ((seed * 5 + i_sft * 5 + k) % 13) as f32 / 13.0 - 0.5;
    c32::new(re, im)
}

pub(crate) fn make_sft_vector(
    detector: &str,
    seed: usize,
    start_gps: f64,
    num_sfts: usize,
    f0: f64,
    num_bins: usize,
) -> SftVector {
    let sfts: Vec<Sft> = (0..num_sfts)
        .map(|i_sft| Sft {
            epoch: Epoch::from_gpst_seconds(start_gps + i_sft as f64 * TSFT),
            f0,
            df: 1.0 / TSFT,
            data: (0..num_bins).map(|k| sft_value(seed, i_sft, k)).collect(),
        })
        .collect();
    SftVector::from_sfts(detector, &sfts).unwrap()
}

/// States at the midpoints of `num_sfts` contiguous SFTs starting at
/// `start_gps`.
pub(crate) fn make_state_series(
    detector: &str,
    start_gps: f64,
    num_sfts: usize,
) -> DetectorStateSeries {
    DetectorStateSeries {
        detector: detector.to_string(),
        states: (0..num_sfts)
            .map(|i| DetectorState {
                timestamp: Epoch::from_gpst_seconds(start_gps + (i as f64 + 0.5) * TSFT),
                pos_ssb: [0.0; 3],
                vel_ssb: [0.0; 3],
                tensor: [[0.0; 3]; 3],
            })
            .collect(),
    }
}

/// SFTs and detector states for `num_segments` consecutive segments, each with
/// `num_sfts` SFTs per detector. Every detector gets different data.
pub(crate) fn make_inputs(
    detectors: &[&str],
    num_segments: usize,
    num_sfts: usize,
    f0: f64,
    num_bins: usize,
) -> (Vec<MultiSftVector>, DetectorStatesSequence) {
    let mut sfts = vec![];
    let mut states = vec![];
    for i_seg in 0..num_segments {
        let start = GPS_START + (i_seg * num_sfts) as f64 * TSFT;
        let multi_sfts: Vec<SftVector> = detectors
            .iter()
            .enumerate()
            .map(|(i_det, d)| make_sft_vector(d, i_det + i_seg, start, num_sfts, f0, num_bins))
            .collect();
        let multi_states: Vec<DetectorStateSeries> = detectors
            .iter()
            .map(|d| make_state_series(d, start, num_sfts))
            .collect();
        sfts.push(Vec1::try_from_vec(multi_sfts).unwrap());
        states.push(Vec1::try_from_vec(multi_states).unwrap());
    }
    (sfts, DetectorStatesSequence::new(states))
}

/// No delay and no Doppler shift.
#[derive(Debug, Default)]
pub(crate) struct StationaryBarycentre;

impl Barycentre for StationaryBarycentre {
    fn emission_time(
        &self,
        _detector: &str,
        _state: &DetectorState,
        _sky: RADec,
    ) -> Result<EmissionTime, BarycentreError> {
        Ok(EmissionTime {
            delay: 0.0,
            tdot: 1.0,
        })
    }
}

/// A small, slowly varying delay and a constant Doppler factor, so that the
/// signal falls between bins.
#[derive(Debug)]
pub(crate) struct WobblingBarycentre {
    pub(crate) tdot_m1: f64,
}

impl Default for WobblingBarycentre {
    fn default() -> Self {
        WobblingBarycentre { tdot_m1: 2e-6 }
    }
}

impl Barycentre for WobblingBarycentre {
    fn emission_time(
        &self,
        _detector: &str,
        state: &DetectorState,
        sky: RADec,
    ) -> Result<EmissionTime, BarycentreError> {
        let t = state.timestamp.to_gpst_seconds() - GPS_START;
        Ok(EmissionTime {
            delay: 0.01 * (t / 1e4 + sky.ra).sin(),
            tdot: 1.0 + self.tdot_m1,
        })
    }
}

pub(crate) struct FailingBarycentre;

impl Barycentre for FailingBarycentre {
    fn emission_time(
        &self,
        detector: &str,
        _state: &DetectorState,
        _sky: RADec,
    ) -> Result<EmissionTime, BarycentreError> {
        Err(BarycentreError::Other {
            detector: detector.to_string(),
            msg: "ephemeris unavailable".to_string(),
        })
    }
}

/// Coefficients that depend only on the SFT index.
#[derive(Debug, Default)]
pub(crate) struct RampAntenna;

impl RampAntenna {
    pub(crate) fn a(i: usize) -> f32 {
        0.5 + 0.05 * i as f32
    }

    pub(crate) fn b(i: usize) -> f32 {
        0.3 - 0.07 * i as f32
    }
}

impl AntennaPattern for RampAntenna {
    fn am_coeffs(
        &self,
        series: &DetectorStateSeries,
        _sky: RADec,
    ) -> Result<AmCoeffs, AntennaError> {
        let n = series.len();
        AmCoeffs::new(
            (0..n).map(RampAntenna::a).collect(),
            (0..n).map(RampAntenna::b).collect(),
        )
    }
}

/// The state of a detector on the equator of a non-orbiting Earth, with one
/// arm pointing east and the other north.
pub(crate) fn rotating_state(gps: f64) -> (([f64; 3], [f64; 3]), [[f64; 3]; 3]) {
    const RADIUS: f64 = 6.4e6;
    const SIDEREAL_DAY: f64 = 86_164.1;
    let phi = std::f64::consts::TAU * (gps - GPS_START) / SIDEREAL_DAY;
    let (s, c) = phi.sin_cos();
    let speed = std::f64::consts::TAU * RADIUS / SIDEREAL_DAY;
    let pos = [RADIUS * c, RADIUS * s, 0.0];
    let vel = [-speed * s, speed * c, 0.0];

    let east = [-s, c, 0.0];
    let north = [0.0, 0.0, 1.0];
    let mut tensor = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            tensor[i][j] = 0.5 * (east[i] * east[j] - north[i] * north[j]);
        }
    }
    ((pos, vel), tensor)
}

/// A data file like [`make_inputs`], but with physically-motivated detector
/// states for use with the built-in collaborators.
pub(crate) fn make_data_file(
    detectors: &[&str],
    num_segments: usize,
    num_sfts: usize,
    f0: f64,
    num_bins: usize,
) -> SftDataFile {
    SftDataFile {
        segments: (0..num_segments)
            .map(|i_seg| SegmentRecord {
                detectors: detectors
                    .iter()
                    .enumerate()
                    .map(|(i_det, name)| DetectorRecord {
                        name: name.to_string(),
                        f0,
                        df: 1.0 / TSFT,
                        sfts: (0..num_sfts)
                            .map(|i_sft| {
                                let gps = GPS_START + ((i_seg * num_sfts + i_sft) as f64) * TSFT;
                                let ((pos_ssb, vel_ssb), tensor) =
                                    rotating_state(gps + 0.5 * TSFT);
                                let data: Vec<c32> = (0..num_bins)
                                    .map(|k| sft_value(i_det + i_seg, i_sft, k))
                                    .collect();
                                SftRecord {
                                    gps,
                                    re: data.iter().map(|c| c.re).collect(),
                                    im: data.iter().map(|c| c.im).collect(),
                                    psd: None,
                                    pos_ssb,
                                    vel_ssb,
                                    tensor,
                                }
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

/// The SFT duration of injected signals \[seconds\].
pub(crate) const SIGNAL_TSFT: f64 = 60.0;

/// The sample rate of the time series that injected SFTs are built from
/// \[Hz\].
const SIGNAL_SAMPLE_RATE: f64 = 32.0;

/// The detectors that [`SignalAntenna`] knows about.
pub(crate) const SIGNAL_DETECTORS: [&str; 2] = ["H1", "L1"];

/// A noise-free signal h(t) = A₁ a(t) cos Φ(t) + A₂ b(t) sin Φ(t), with
/// Φ(t) = 2π (f τ + ½ ḟ τ²) and τ measured from [`GPS_START`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Injection {
    pub(crate) freq: f64,
    pub(crate) spindown: f64,
    pub(crate) amp_a: f64,
    pub(crate) amp_b: f64,
}

impl Injection {
    /// The F-statistic of this signal with unit noise weights:
    /// (Tsft / 2)² (A₁² Ad + A₂² Bd).
    pub(crate) fn expected_fstat(&self, num_sfts: usize) -> f64 {
        let (mut ad, mut bd) = (0.0, 0.0);
        for i_det in 0..SIGNAL_DETECTORS.len() {
            for i_sft in 0..num_sfts {
                let (a, b) = signal_am(i_det, i_sft);
                ad += (a as f64).powi(2);
                bd += (b as f64).powi(2);
            }
        }
        (0.5 * SIGNAL_TSFT).powi(2) * (self.amp_a.powi(2) * ad + self.amp_b.powi(2) * bd)
    }
}

/// The antenna coefficients of detector `i_det` in SFT `i_sft`.
pub(crate) fn signal_am(i_det: usize, i_sft: usize) -> (f32, f32) {
    let x = i_sft as f32;
    match i_det {
        0 => ((0.2 * x).cos(), (0.2 * x).sin()),
        _ => (0.6 * (0.15 * x + 1.0).cos(), 0.8 * (0.1 * x).sin()),
    }
}

/// Antenna coefficients from [`signal_am`], for the detectors in
/// [`SIGNAL_DETECTORS`].
#[derive(Debug, Default)]
pub(crate) struct SignalAntenna;

impl AntennaPattern for SignalAntenna {
    fn am_coeffs(
        &self,
        series: &DetectorStateSeries,
        _sky: RADec,
    ) -> Result<AmCoeffs, AntennaError> {
        let i_det = SIGNAL_DETECTORS
            .iter()
            .position(|&d| d == series.detector)
            .unwrap_or(SIGNAL_DETECTORS.len());
        let (a, b): (Vec<f32>, Vec<f32>) =
            (0..series.len()).map(|i| signal_am(i_det, i)).unzip();
        AmCoeffs::new(a, b)
    }
}

/// A single segment of `num_sfts` contiguous SFTs per detector in
/// [`SIGNAL_DETECTORS`], holding bins `[first_bin, first_bin + num_bins)` of
/// the DFT of `injection`.
pub(crate) fn make_signal_file(
    injection: &Injection,
    num_sfts: usize,
    first_bin: usize,
    num_bins: usize,
) -> SftDataFile {
    let n = (SIGNAL_TSFT * SIGNAL_SAMPLE_RATE) as usize;
    let dt = 1.0 / SIGNAL_SAMPLE_RATE;
    let tau = std::f64::consts::TAU;

    let detectors = SIGNAL_DETECTORS
        .iter()
        .enumerate()
        .map(|(i_det, name)| DetectorRecord {
            name: name.to_string(),
            f0: first_bin as f64 / SIGNAL_TSFT,
            df: 1.0 / SIGNAL_TSFT,
            sfts: (0..num_sfts)
                .map(|i_sft| {
                    let start = i_sft as f64 * SIGNAL_TSFT;
                    let (a, b) = signal_am(i_det, i_sft);
                    let series: Vec<f64> = (0..n)
                        .map(|j| {
                            let t = start + j as f64 * dt;
                            let phase = tau
                                * (injection.freq * t + 0.5 * injection.spindown * t * t);
                            let (s, c) = phase.sin_cos();
                            injection.amp_a * a as f64 * c + injection.amp_b * b as f64 * s
                        })
                        .collect();
                    let (re, im): (Vec<f32>, Vec<f32>) = (first_bin..first_bin + num_bins)
                        .map(|k| {
                            let (re, im) = series.iter().enumerate().fold(
                                (0.0, 0.0),
                                |(re, im), (j, &x)| {
                                    let (s, c) = (tau * ((k * j) % n) as f64 / n as f64).sin_cos();
                                    (re + x * c, im - x * s)
                                },
                            );
                            ((re * dt) as f32, (im * dt) as f32)
                        })
                        .unzip();
                    SftRecord {
                        gps: GPS_START + start,
                        re,
                        im,
                        ..Default::default()
                    }
                })
                .collect(),
        })
        .collect();

    SftDataFile {
        segments: vec![SegmentRecord { detectors }],
    }
}
