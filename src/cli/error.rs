// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Error type for all cwfstat-related errors. This should be the *only* error
//! enum that is publicly visible from the CLI.

use thiserror::Error;

use super::fstat_band::FstatBandArgsError;
use crate::{
    data::{DataFileError, SftError},
    fstat::{FstatError, FstatErrorKind},
    gpu::GpuError,
    params::FstatBandError,
};

/// The *only* publicly visible error from the cwfstat binary. Each message
/// carries a hint about what to look at, unless it's "generic".
#[derive(Error, Debug)]
pub enum CwFstatError {
    /// An error related to fstat-band arguments.
    #[error("{0}\n\nSee for more info: cwfstat fstat-band --help")]
    FstatBand(String),

    /// An error related to the SFT data file.
    #[error("{0}\n\nThe data file must be JSON with \"segments\", each holding \"detectors\" with \"sfts\".")]
    DataFile(String),

    /// The inputs were fine, but the F-statistic couldn't be computed for
    /// them.
    #[error("{0}\n\nTry increasing verbosity (-v or -vv) for more details.")]
    Compute(String),

    /// An error from an accelerator device.
    #[error("{0}\n\nTry running without --gpu.")]
    Gpu(String),

    /// An error related to argument files.
    #[error("{0}\n\nArgument files may be TOML or JSON, with the same names as the long CLI arguments.")]
    ArgFile(String),

    /// A generic error that can't be clarified further, e.g. IO errors.
    #[error("{0}")]
    Generic(String),
}

// When changing the error propagation below, ensure `Self::from(e)` uses the
// correct `e`!

impl From<FstatBandArgsError> for CwFstatError {
    fn from(e: FstatBandArgsError) -> Self {
        Self::FstatBand(e.to_string())
    }
}

impl From<FstatBandError> for CwFstatError {
    fn from(e: FstatBandError) -> Self {
        match e {
            FstatBandError::Fstat(e) => Self::from(e),
            FstatBandError::DataFile(e) => Self::from(e),
        }
    }
}

impl From<FstatError> for CwFstatError {
    fn from(e: FstatError) -> Self {
        let s = e.to_string();
        match e {
            FstatError::Gpu(_) => Self::Gpu(s),
            FstatError::Sft(_) => Self::DataFile(s),
            _ => match e.kind() {
                FstatErrorKind::InvalidArgument => Self::FstatBand(s),
                FstatErrorKind::Resource => Self::Gpu(s),
                FstatErrorKind::Domain
                | FstatErrorKind::Numeric
                | FstatErrorKind::Collaborator => Self::Compute(s),
            },
        }
    }
}

impl From<DataFileError> for CwFstatError {
    fn from(e: DataFileError) -> Self {
        let s = e.to_string();
        match e {
            DataFileError::IO(_) => Self::Generic(s),
            DataFileError::NoSegments
            | DataFileError::NoDetectors { .. }
            | DataFileError::ComplexLengthMismatch { .. }
            | DataFileError::PartialPsd { .. }
            | DataFileError::Sft { .. }
            | DataFileError::Json(_) => Self::DataFile(s),
        }
    }
}

impl From<SftError> for CwFstatError {
    fn from(e: SftError) -> Self {
        Self::DataFile(e.to_string())
    }
}

impl From<GpuError> for CwFstatError {
    fn from(e: GpuError) -> Self {
        Self::Gpu(e.to_string())
    }
}

impl From<std::io::Error> for CwFstatError {
    fn from(e: std::io::Error) -> Self {
        Self::Generic(e.to_string())
    }
}
