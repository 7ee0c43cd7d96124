// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A single-slot cache of the sky-position-dependent quantities.
//!
//! SSB timing and antenna-pattern coefficients depend on the sky position and
//! the detector states but not on frequency or spindown, so a search that
//! steps over frequency at a fixed sky position only needs them once.

#[cfg(test)]
mod tests;

use hifitime::Epoch;
use log::debug;
use marlu::RADec;
use rayon::prelude::*;

use crate::{
    antenna::{weigh_multi_am_coeffs, AntennaPattern, MultiAmCoeffs},
    data::MultiNoiseWeights,
    detector::DetectorStatesSequence,
    fstat::FstatError,
    ssb::{get_multi_ssb_times_f32, Barycentre, MultiSsbTimesF32},
};

/// The cached quantities of one segment.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentQuantities {
    pub ssb: MultiSsbTimesF32,
    pub am: MultiAmCoeffs,
}

#[derive(Debug, Clone, PartialEq)]
struct BufferKey {
    ra: f64,
    dec: f64,
    ref_time: Epoch,
    generation: u64,
    num_segments: usize,
}

#[derive(Debug)]
struct BufferEntry {
    key: BufferKey,
    weights: Option<Vec<MultiNoiseWeights>>,
    segments: Vec<SegmentQuantities>,
}

impl BufferEntry {
    fn matches(&self, key: &BufferKey, weights: Option<&[MultiNoiseWeights]>) -> bool {
        self.key == *key && self.weights.as_deref() == weights
    }
}

/// Either empty, or holding the quantities for exactly one sky position and
/// detector-state sequence.
#[derive(Debug, Default)]
pub struct FstatBuffer {
    entry: Option<BufferEntry>,
    recompute_count: usize,
}

impl FstatBuffer {
    pub fn new() -> FstatBuffer {
        FstatBuffer::default()
    }

    /// Get the per-segment quantities for `sky`, computing them only if the
    /// buffer holds something else. Anything previously held is dropped before
    /// recomputing; if recomputing fails, the buffer is left empty.
    ///
    /// Detector states are identified by their generation number, not their
    /// contents.
    pub fn get_or_compute(
        &mut self,
        sky: RADec,
        ref_time: Epoch,
        states: &DetectorStatesSequence,
        weights: Option<&[MultiNoiseWeights]>,
        barycentre: &dyn Barycentre,
        antenna: &dyn AntennaPattern,
    ) -> Result<&[SegmentQuantities], FstatError> {
        let key = BufferKey {
            ra: sky.ra,
            dec: sky.dec,
            ref_time,
            generation: states.generation(),
            num_segments: states.num_segments(),
        };

        let entry = match self.entry.take() {
            Some(entry) if entry.matches(&key, weights) => {
                debug!(
                    "Reusing buffered SSB times and antenna patterns for RA {} Dec {}",
                    sky.ra, sky.dec
                );
                entry
            }

            stale => {
                drop(stale);
                debug!(
                    "Computing SSB times and antenna patterns for RA {} Dec {} ({} segments)",
                    sky.ra,
                    sky.dec,
                    states.num_segments()
                );
                let segments = compute_segments(sky, ref_time, states, weights, barycentre, antenna)?;
                self.recompute_count += 1;
                BufferEntry {
                    key,
                    weights: weights.map(|w| w.to_vec()),
                    segments,
                }
            }
        };

        Ok(&self.entry.insert(entry).segments)
    }

    /// Drop anything held.
    pub fn release(&mut self) {
        self.entry = None;
    }

    pub fn is_populated(&self) -> bool {
        self.entry.is_some()
    }

    /// The number of times the buffer has been (successfully) filled.
    pub fn recompute_count(&self) -> usize {
        self.recompute_count
    }
}

fn compute_segments(
    sky: RADec,
    ref_time: Epoch,
    states: &DetectorStatesSequence,
    weights: Option<&[MultiNoiseWeights]>,
    barycentre: &dyn Barycentre,
    antenna: &dyn AntennaPattern,
) -> Result<Vec<SegmentQuantities>, FstatError> {
    if let Some(weights) = weights {
        if weights.len() != states.num_segments() {
            return Err(FstatError::WeightsSegmentMismatch {
                weights: weights.len(),
                segments: states.num_segments(),
            });
        }
    }

    states
        .segments()
        .par_iter()
        .enumerate()
        .map(|(i_seg, multi_series)| {
            let ssb = get_multi_ssb_times_f32(multi_series, sky, ref_time, barycentre)?;
            let am = multi_series
                .iter()
                .map(|series| antenna.am_coeffs(series, sky))
                .collect::<Result<Vec<_>, _>>()?;
            let am = weigh_multi_am_coeffs(am, weights.map(|w| &w[i_seg]))?;
            Ok::<_, FstatError>(SegmentQuantities { ssb, am })
        })
        .collect()
}
