// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameter-space points, and their single-precision-safe representation.

mod fstat_band;

pub(crate) use fstat_band::{FstatBandError, FstatBandParams};

use hifitime::Epoch;
use marlu::RADec;

use crate::{constants::MAX_SPINDOWN_ORDER, math::split_f64};

/// A point in parameter space at which the F-statistic is evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterPoint {
    /// The sky position of the source (equatorial coordinates).
    pub sky: RADec,

    /// The signal frequency at the reference time \[Hz\].
    pub freq: f64,

    /// The frequency derivatives fkdot\[1..\] at the reference time
    /// \[Hz/s^s\]. At most [`MAX_SPINDOWN_ORDER`] are allowed.
    pub spindowns: Vec<f64>,

    /// The time at which `freq` and `spindowns` are defined.
    pub ref_time: Epoch,
}

impl ParameterPoint {
    pub fn new(sky: RADec, freq: f64, spindowns: Vec<f64>, ref_time: Epoch) -> ParameterPoint {
        ParameterPoint {
            sky,
            freq,
            spindowns,
            ref_time,
        }
    }

    /// The highest spindown order with a non-zero coefficient (0 means no
    /// spindown at all).
    pub fn spindown_order(&self) -> usize {
        self.spindowns
            .iter()
            .rposition(|&f| f != 0.0)
            .map(|i| i + 1)
            .unwrap_or(0)
    }
}

/// Frequency and spindowns in a form that can be used with single-precision
/// floats without losing the phase information.
///
/// Large frequencies are split into an integer part and a small remainder; the
/// kernel never forms their sum in single precision unless it is multiplied by
/// a small quantity.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinsF32 {
    /// The integer part of the frequency \[Hz\]. Stored as a float because it
    /// only ever participates in float arithmetic.
    pub freq_main: f32,

    /// The fractional remainder of the frequency \[Hz\].
    pub freq_rem: f32,

    /// fkdot\[1..\] down-cast to single precision and truncated at the highest
    /// non-zero order.
    pub spindowns: Vec<f32>,
}

impl SpinsF32 {
    /// Convert a double-precision frequency and spindowns. Trailing zero
    /// spindowns are dropped, so `spindowns.len()` is the effective order.
    pub fn new(freq: f64, spindowns: &[f64]) -> SpinsF32 {
        let (freq_main, freq_rem) = split_f64(freq);
        let order = spindowns
            .iter()
            .rposition(|&f| f as f32 != 0.0)
            .map(|i| i + 1)
            .unwrap_or(0);
        SpinsF32 {
            freq_main: freq_main as f32,
            freq_rem,
            spindowns: spindowns[..order].iter().map(|&f| f as f32).collect(),
        }
    }

    /// The same spindowns, but with the frequency replaced by another split
    /// frequency. Used when stepping over frequency bins.
    pub(crate) fn with_freq(&self, freq: f64) -> SpinsF32 {
        let (freq_main, freq_rem) = split_f64(freq);
        SpinsF32 {
            freq_main: freq_main as f32,
            freq_rem,
            spindowns: self.spindowns.clone(),
        }
    }

    /// The effective spindown order.
    pub fn order(&self) -> usize {
        self.spindowns.len()
    }

    /// The spindowns padded with zeros to [`MAX_SPINDOWN_ORDER`], as a device
    /// would receive them.
    pub(crate) fn spindowns_padded(&self) -> [f32; MAX_SPINDOWN_ORDER] {
        let mut out = [0.0; MAX_SPINDOWN_ORDER];
        out.iter_mut()
            .zip(self.spindowns.iter())
            .for_each(|(o, &s)| *o = s);
        out
    }
}
