// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Detector states: where each detector was, how fast it was moving, and how
//! it was oriented, at the midpoint of every SFT.


use std::sync::atomic::{AtomicU64, Ordering};

use hifitime::Epoch;
use vec1::Vec1;

static NEXT_GENERATION: AtomicU64 = AtomicU64::new(0);

/// The state of a detector at a single timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorState {
    /// The time this state applies to (the midpoint of an SFT).
    pub timestamp: Epoch,

    /// Position relative to the solar-system barycentre \[metres\].
    pub pos_ssb: [f64; 3],

    /// Velocity relative to the solar-system barycentre \[metres / second\].
    pub vel_ssb: [f64; 3],

    /// The detector response tensor in equatorial coordinates.
    pub tensor: [[f64; 3]; 3],
}

/// The states of one detector, one per SFT.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorStateSeries {
    /// The detector name (e.g. "H1").
    pub detector: String,

    pub states: Vec<DetectorState>,
}

impl DetectorStateSeries {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }
}

/// The states of every detector in one segment.
pub type MultiDetectorStateSeries = Vec1<DetectorStateSeries>;

/// The detector states of every segment.
///
/// Every sequence is stamped with a generation number when it is constructed.
/// Cached per-sky quantities are keyed on this number rather than on the
/// contents, so a sequence that is rebuilt (even with identical contents)
/// invalidates the cache, and a sequence that is merely moved or cloned does
/// not.
#[derive(Debug, Clone)]
pub struct DetectorStatesSequence {
    segments: Vec<MultiDetectorStateSeries>,
    generation: u64,
}

impl DetectorStatesSequence {
    pub fn new(segments: Vec<MultiDetectorStateSeries>) -> DetectorStatesSequence {
        DetectorStatesSequence {
            segments,
            generation: NEXT_GENERATION.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// This sequence's generation number. No two sequences constructed in this
    /// process share a generation.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn segments(&self) -> &[MultiDetectorStateSeries] {
        &self.segments
    }

    pub fn num_segments(&self) -> usize {
        self.segments.len()
    }
}
