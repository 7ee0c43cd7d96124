// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::path::PathBuf;

use log::{debug, info};
use thiserror::Error;

use super::ParameterPoint;
use crate::{
    antenna::TensorAntennaPattern,
    data::{DataFileError, FstatBandRecord, FstatBandVector, FstatData},
    fstat::{FstatComputer, FstatDevice, FstatError},
    gpu::HostAccelerator,
    ssb::RoemerDelay,
};

/// Everything needed to compute and write out an F-statistic band.
pub(crate) struct FstatBandParams {
    pub(crate) data: FstatData,
    pub(crate) point: ParameterPoint,
    pub(crate) df: f64,
    pub(crate) num_bins: usize,
    pub(crate) dterms: u32,
    pub(crate) device: FstatDevice,
    pub(crate) output: PathBuf,
}

impl FstatBandParams {
    pub(crate) fn run(&self) -> Result<(), FstatBandError> {
        let band = self.compute()?;

        let (i_seg, k, max) = band
            .fstats
            .indexed_iter()
            .fold((0, 0, f32::NEG_INFINITY), |acc, ((i_seg, k), &f)| {
                if f > acc.2 {
                    (i_seg, k, f)
                } else {
                    acc
                }
            });
        info!(
            "Loudest F = {max:.3} in segment {i_seg} at {:.6} Hz",
            band.freq(k)
        );

        FstatBandRecord::from(&band).write(&self.output)?;
        info!("F-statistics written to {}", self.output.display());
        Ok(())
    }

    pub(crate) fn compute(&self) -> Result<FstatBandVector, FstatBandError> {
        let Self {
            data,
            point,
            df,
            num_bins,
            dterms,
            device,
            output: _,
        } = self;

        let barycentre = RoemerDelay;
        let antenna = TensorAntennaPattern;
        let mut computer = FstatComputer::new(*dterms, &barycentre, &antenna);
        let mut band = FstatBandVector::new(point.freq, *df, data.num_segments(), *num_bins);
        let inputs = data.inputs();

        info!(
            "Computing {} bins over {} segments",
            num_bins,
            data.num_segments()
        );
        match device {
            FstatDevice::Cpu => computer.compute_fstat_band_vector(&mut band, point, &inputs)?,
            FstatDevice::HostGpu => computer.compute_fstat_band_vector_gpu(
                &HostAccelerator::default(),
                &mut band,
                point,
                &inputs,
            )?,
        }
        debug!(
            "Sky quantities were computed {} time(s)",
            computer.buffer().recompute_count()
        );

        Ok(band)
    }
}

#[derive(Error, Debug)]
pub(crate) enum FstatBandError {
    #[error(transparent)]
    Fstat(#[from] FstatError),

    #[error(transparent)]
    DataFile(#[from] DataFileError),
}
