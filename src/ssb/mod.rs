// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Solar-system-barycentre (SSB) timing.
//!
//! The kernel needs, for every SFT, the SSB arrival time of the wavefront that
//! reached the detector at the SFT's midpoint, relative to the reference time.
//! That offset is tens of millions of seconds, far beyond what an `f32` can
//! hold to sub-millisecond accuracy, so it is stored as an integer part and a
//! small remainder.

mod error;

pub use error::BarycentreError;

use hifitime::Epoch;
use log::trace;
use marlu::RADec;

use crate::{
    constants::VEL_C,
    detector::{DetectorState, DetectorStateSeries, MultiDetectorStateSeries},
};

/// The result of barycentring a single detector timestamp.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmissionTime {
    /// The SSB arrival time minus the detector time \[seconds\].
    pub delay: f64,

    /// d(SSB time) / d(detector time).
    pub tdot: f64,
}

/// Anything that can convert detector times into SSB times for a given sky
/// position.
pub trait Barycentre: Sync {
    fn emission_time(
        &self,
        detector: &str,
        state: &DetectorState,
        sky: RADec,
    ) -> Result<EmissionTime, BarycentreError>;
}

/// First-order (Roemer) barycentring using only the SSB position and velocity
/// carried by each detector state. Einstein and Shapiro delays are ignored.
#[derive(Debug, Clone, Copy, Default)]
pub struct RoemerDelay;

impl Barycentre for RoemerDelay {
    fn emission_time(
        &self,
        detector: &str,
        state: &DetectorState,
        sky: RADec,
    ) -> Result<EmissionTime, BarycentreError> {
        let n = unit_vector(sky);
        let pos = state.pos_ssb;
        let vel = state.vel_ssb;
        if pos.iter().chain(vel.iter()).any(|x| !x.is_finite()) {
            return Err(BarycentreError::NonFiniteState {
                detector: detector.to_string(),
                gps: state.timestamp.to_gpst_seconds(),
            });
        }

        let n_dot_r: f64 = n.iter().zip(pos).map(|(n, r)| n * r).sum();
        let n_dot_v: f64 = n.iter().zip(vel).map(|(n, v)| n * v).sum();
        Ok(EmissionTime {
            delay: n_dot_r / VEL_C,
            tdot: 1.0 + n_dot_v / VEL_C,
        })
    }
}

/// The unit vector pointing at `sky` in equatorial Cartesian coordinates.
pub(crate) fn unit_vector(sky: RADec) -> [f64; 3] {
    let (s_ra, c_ra) = sky.ra.sin_cos();
    let (s_dec, c_dec) = sky.dec.sin_cos();
    [c_dec * c_ra, c_dec * s_ra, s_dec]
}

/// SSB timing for every SFT of one detector, split for single-precision use.
#[derive(Debug, Clone, PartialEq)]
pub struct SsbTimesF32 {
    /// The integer part of the SSB time offset from the reference time
    /// \[seconds\]. Stored as `f32`, so it is only exact up to 2²⁴ s.
    pub delta_t_int: Vec<f32>,

    /// The remainder after subtracting the stored integer part \[seconds\].
    pub delta_t_rem: Vec<f32>,

    /// Tdot - 1.
    pub tdot_m1: Vec<f32>,

    /// The reference time these offsets are relative to.
    pub ref_time: Epoch,
}

impl SsbTimesF32 {
    pub fn len(&self) -> usize {
        self.delta_t_int.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delta_t_int.is_empty()
    }
}

/// SSB timing for all detectors of a segment.
pub type MultiSsbTimesF32 = Vec<SsbTimesF32>;

/// Get the SSB timing of every state in `series`.
pub fn get_ssb_times_f32(
    series: &DetectorStateSeries,
    sky: RADec,
    ref_time: Epoch,
    barycentre: &dyn Barycentre,
) -> Result<SsbTimesF32, BarycentreError> {
    if series.is_empty() {
        return Err(BarycentreError::NoStates(series.detector.clone()));
    }

    let n = series.len();
    let mut delta_t_int = Vec::with_capacity(n);
    let mut delta_t_rem = Vec::with_capacity(n);
    let mut tdot_m1 = Vec::with_capacity(n);
    for state in &series.states {
        let emit = barycentre.emission_time(&series.detector, state, sky)?;
        if !emit.delay.is_finite() || !emit.tdot.is_finite() {
            return Err(BarycentreError::NonFiniteEmissionTime {
                detector: series.detector.clone(),
                gps: state.timestamp.to_gpst_seconds(),
                delay: emit.delay,
                tdot: emit.tdot,
            });
        }
        let delta_t = (state.timestamp - ref_time).to_seconds() + emit.delay;
        // The remainder is relative to the demoted integer, so int + rem
        // reproduces delta_t.
        let int = (delta_t as i32) as f32;
        delta_t_int.push(int);
        delta_t_rem.push((delta_t - int as f64) as f32);
        tdot_m1.push((emit.tdot - 1.0) as f32);
    }
    trace!("{}: SSB times for {n} states", series.detector);

    Ok(SsbTimesF32 {
        delta_t_int,
        delta_t_rem,
        tdot_m1,
        ref_time,
    })
}

/// Get the SSB timing of every detector in a segment.
pub fn get_multi_ssb_times_f32(
    multi_series: &MultiDetectorStateSeries,
    sky: RADec,
    ref_time: Epoch,
    barycentre: &dyn Barycentre,
) -> Result<MultiSsbTimesF32, BarycentreError> {
    multi_series
        .iter()
        .map(|series| get_ssb_times_f32(series, sky, ref_time, barycentre))
        .collect()
}
