// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AntennaError {
    #[error("Detector {0} has no states")]
    NoStates(String),

    #[error("No detectors were supplied")]
    NoDetectors,

    #[error("a(t) has {a} values but b(t) has {b}")]
    LengthMismatch { a: usize, b: usize },

    #[error("Got antenna coefficients for {coeffs} detectors, but noise weights for {weights}")]
    WeightsDetectorMismatch { coeffs: usize, weights: usize },

    #[error("Detector {detector}: {coeffs} antenna coefficients, but {weights} noise weights")]
    WeightsLengthMismatch {
        detector: usize,
        coeffs: usize,
        weights: usize,
    },

    #[error("Antenna-pattern computation failed for detector {detector}: {msg}")]
    Other { detector: String, msg: String },
}
