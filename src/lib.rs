// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

/*!
Single-precision F-statistic computation for continuous-wave searches.

SFTs from one or more detectors are demodulated towards a sky position and
spin-frequency evolution, weighted by each detector's antenna pattern, and
combined into the F-statistic for every bin of a frequency band and every
segment of data. Bins can be computed on the CPU or batched for an
accelerator.
 */

pub mod antenna;
pub mod buffer;
mod cli;
pub mod constants;
pub mod data;
pub mod detector;
pub mod fstat;
pub mod gpu;
pub mod math;
pub mod params;
pub mod ssb;

#[cfg(test)]
mod tests;

// Re-exports.
pub use antenna::{AntennaPattern, TensorAntennaPattern};
pub use cli::{CwFstat, CwFstatError};
pub use data::{FstatBandVector, MultiNoiseWeights, MultiSftVector, Sft, SftVector};
pub use detector::{DetectorState, DetectorStateSeries, DetectorStatesSequence};
pub use fstat::{FstatComputer, FstatDevice, FstatError, FstatInputs};
pub use gpu::{Accelerator, HostAccelerator};
pub use params::ParameterPoint;
pub use ssb::{Barycentre, RoemerDelay};
