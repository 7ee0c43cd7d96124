// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors associated with SFT data.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SftError {
    #[error("No SFTs were supplied")]
    Empty,

    #[error("SFTs must have at least one frequency bin")]
    NoBins,

    #[error("Invalid SFT frequency resolution: {0} Hz")]
    BadResolution(f64),

    #[error("SFT {index} has frequency resolution {got} Hz, but the first SFT has {expected} Hz")]
    InconsistentResolution { index: usize, expected: f64, got: f64 },

    #[error("SFT {index} has {got} bins, but the first SFT has {expected}")]
    InconsistentLength {
        index: usize,
        expected: usize,
        got: usize,
    },

    #[error("SFT {index} starts at {got} Hz, but the first SFT starts at {expected} Hz")]
    InconsistentStartFreq { index: usize, expected: f64, got: f64 },

    #[error("Invalid band: fmin = {fmin} Hz, band = {band} Hz")]
    BadBand { fmin: f64, band: f64 },

    #[error("Requested band [{fmin}, {fmin} + {band}] Hz is not covered by the SFTs ([{f0}, {f1}] Hz)")]
    BandNotCovered {
        fmin: f64,
        band: f64,
        f0: f64,
        f1: f64,
    },

    #[error("Detector {detector}, SFT {index}: invalid PSD value {value}")]
    BadPsd {
        detector: usize,
        index: usize,
        value: f64,
    },
}

#[derive(Error, Debug)]
pub enum DataFileError {
    #[error("The data file has no segments")]
    NoSegments,

    #[error("Segment {segment} of the data file has no detectors")]
    NoDetectors { segment: usize },

    #[error("Segment {segment}, detector {detector}, SFT {index}: {re} real values but {im} imaginary values")]
    ComplexLengthMismatch {
        segment: usize,
        detector: String,
        index: usize,
        re: usize,
        im: usize,
    },

    #[error("Segment {segment}: either every SFT or no SFT must have a PSD estimate")]
    PartialPsd { segment: usize },

    #[error("Segment {segment}, detector {detector}: {source}")]
    Sft {
        segment: usize,
        detector: String,
        source: SftError,
    },

    #[error("Couldn't decode data file: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    IO(#[from] std::io::Error),
}
