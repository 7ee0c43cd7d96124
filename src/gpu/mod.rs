// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Offloading band F-statistic computation to an accelerator.
//!
//! An accelerator receives every segment and frequency bin of a band in one
//! batch. The batch is a set of flat, row-pitched arrays (see [`FstatBatch`])
//! so that a device kernel can index them directly; [`flatten`] builds a batch
//! from the host-side structures and [`unflatten`] strips the padding from
//! the result.

mod host;
mod layout;

pub use host::HostAccelerator;
pub use layout::{flatten, unflatten, unipitch256, DetectorArrays, FstatBatch};

use std::panic::Location;

use ndarray::Array2;
use thiserror::Error;

use crate::fstat::FstatError;

/// The number of detectors the batched kernel is written for.
pub const NUM_OFFLOAD_DETECTORS: usize = 2;

/// The properties of an accelerator that constrain the batch layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    pub name: Box<str>,

    /// The number of threads that execute in lock-step.
    pub warp_size: usize,

    /// The maximum number of threads in a single block.
    pub max_threads_per_block: usize,

    /// \[MebiBytes (MiB)\]
    pub total_global_mem: usize,
}

/// Something that can run the batched F-statistic kernel.
pub trait Accelerator {
    /// Query the device. Called before anything is transferred.
    fn device_properties(&self) -> Result<DeviceProperties, GpuError>;

    /// Run the kernel over every segment and bin of `batch`, blocking until it
    /// completes. The returned array has one row per segment, each
    /// `batch.fstat_pitch` long; only the first `batch.num_bins` values of each
    /// row are meaningful.
    fn run_fstat_batch(&self, batch: &FstatBatch) -> Result<Array2<f32>, FstatError>;
}

#[derive(Clone, Copy)]
pub(crate) enum GpuCall {
    Malloc,
    CopyToDevice,
    CopyFromDevice,
}

/// Convert a failed device call into a [`GpuError`] that records where the
/// call was made.
#[track_caller]
pub(crate) fn gpu_call_error(gpu_call: GpuCall, msg: &str) -> GpuError {
    let location = Location::caller();
    match gpu_call {
        GpuCall::Malloc => GpuError::Malloc {
            msg: msg.into(),
            file: location.file(),
            line: location.line(),
        },
        GpuCall::CopyToDevice => GpuError::CopyToDevice {
            msg: msg.into(),
            file: location.file(),
            line: location.line(),
        },
        GpuCall::CopyFromDevice => GpuError::CopyFromDevice {
            msg: msg.into(),
            file: location.file(),
            line: location.line(),
        },
    }
}

#[derive(Error, Debug, Clone)]
pub enum GpuError {
    #[error("{file}:{line}: couldn't get device properties: {msg}")]
    DeviceProperties {
        msg: Box<str>,
        file: &'static str,
        line: u32,
    },

    #[error("{file}:{line}: copy to device failed: {msg}")]
    CopyToDevice {
        msg: Box<str>,
        file: &'static str,
        line: u32,
    },

    #[error("{file}:{line}: copy from device failed: {msg}")]
    CopyFromDevice {
        msg: Box<str>,
        file: &'static str,
        line: u32,
    },

    #[error("{file}:{line}: device allocation failed: {msg}")]
    Malloc {
        msg: Box<str>,
        file: &'static str,
        line: u32,
    },
}
