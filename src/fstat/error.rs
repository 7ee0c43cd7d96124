// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Errors from computing the F-statistic.

use thiserror::Error;

use crate::{antenna::AntennaError, data::SftError, gpu::GpuError, ssb::BarycentreError};

/// The broad class of an [`FstatError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FstatErrorKind {
    /// Inconsistent or malformed input.
    InvalidArgument,
    /// The Dirichlet-kernel window fell outside the SFT bins.
    Domain,
    /// A non-finite value appeared.
    Numeric,
    /// A device could not provide what was needed.
    Resource,
    /// An external collaborator (barycentring, antenna patterns) failed.
    Collaborator,
}

#[derive(Error, Debug)]
pub enum FstatError {
    #[error("No segments were supplied")]
    NoSegments,

    #[error("Segment counts differ: band has {band}, SFTs have {sfts}, detector states have {states}")]
    SegmentCountMismatch {
        band: usize,
        sfts: usize,
        states: usize,
    },

    #[error("Got noise weights for {weights} segments, but there are {segments} segments")]
    WeightsSegmentMismatch { weights: usize, segments: usize },

    #[error("Segment {segment}: {sfts} detectors have SFTs, but {states} have detector states")]
    DetectorCountMismatch {
        segment: usize,
        sfts: usize,
        states: usize,
    },

    #[error("Segment {segment}, detector {detector}: {what} has {got} entries, but there are {expected} SFTs")]
    LengthMismatch {
        segment: usize,
        detector: usize,
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("Kernel input {what} has {got} entries, but {expected} are needed")]
    KernelLengthMismatch {
        what: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("The band starts at {band_f0} Hz, which is not within one bin ({df} Hz) of the search frequency {freq} Hz")]
    BandStartMismatch { band_f0: f64, freq: f64, df: f64 },

    #[error("The output band has no frequency bins")]
    EmptyBand,

    #[error("Got {0} spindown terms, but at most {} are supported", crate::constants::MAX_SPINDOWN_ORDER)]
    TooManySpindowns(usize),

    #[error("The number of Dirichlet terms must be at least 1")]
    NoDterms,

    #[error("Got {0} Dirichlet terms, but at most {} are supported", crate::constants::MAX_DTERMS)]
    TooManyDterms(u32),

    #[error("Required frequency bins [{k0}, {k1}] are not covered by the SFT bins [{index0}, {index1})")]
    Domain {
        k0: i32,
        k1: i32,
        index0: i32,
        index1: i32,
    },

    #[error("Non-finite {what} encountered: {value}")]
    NonFinite { what: &'static str, value: f32 },

    #[error("The accelerator path requires exactly {expected} detectors in every segment; segment {segment} has {got}")]
    OffloadDetectorCount {
        segment: usize,
        expected: usize,
        got: usize,
    },

    #[error("The accelerator path requires uniform SFTs: {0}")]
    OffloadNonUniform(String),

    #[error("The accelerator returned {rows} × {cols} F-statistics, but {segments} segments × {bins} bins were dispatched")]
    OffloadOutputShape {
        segments: usize,
        bins: usize,
        rows: usize,
        cols: usize,
    },

    #[error("The accelerator can't fit {needed} threads in a block (max {max})")]
    OffloadTooManyThreads { needed: usize, max: usize },

    #[error(transparent)]
    Sft(#[from] SftError),

    #[error(transparent)]
    Barycentre(#[from] BarycentreError),

    #[error(transparent)]
    Antenna(#[from] AntennaError),

    #[error(transparent)]
    Gpu(#[from] GpuError),
}

impl FstatError {
    pub fn kind(&self) -> FstatErrorKind {
        match self {
            FstatError::Domain { .. } => FstatErrorKind::Domain,
            FstatError::NonFinite { .. } => FstatErrorKind::Numeric,
            FstatError::OffloadTooManyThreads { .. } | FstatError::Gpu(_) => {
                FstatErrorKind::Resource
            }
            FstatError::Barycentre(_) | FstatError::Antenna(_) => FstatErrorKind::Collaborator,
            FstatError::NoSegments
            | FstatError::SegmentCountMismatch { .. }
            | FstatError::WeightsSegmentMismatch { .. }
            | FstatError::DetectorCountMismatch { .. }
            | FstatError::LengthMismatch { .. }
            | FstatError::KernelLengthMismatch { .. }
            | FstatError::BandStartMismatch { .. }
            | FstatError::EmptyBand
            | FstatError::TooManySpindowns(_)
            | FstatError::NoDterms
            | FstatError::TooManyDterms(_)
            | FstatError::OffloadDetectorCount { .. }
            | FstatError::OffloadNonUniform(_)
            | FstatError::OffloadOutputShape { .. }
            | FstatError::Sft(_) => FstatErrorKind::InvalidArgument,
        }
    }
}
