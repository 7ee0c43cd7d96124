// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! An emulated accelerator that runs the batched kernel on the host.

use log::debug;
use marlu::c32;
use ndarray::prelude::*;
use rayon::prelude::*;

use super::{
    gpu_call_error, Accelerator, DeviceProperties, FstatBatch, GpuCall, GpuError,
    NUM_OFFLOAD_DETECTORS,
};
use crate::{
    fstat::{combine::checked_fstat, compute_fa_fb, DetectorKernelInputs, FstatError},
    math::SinCosLut,
    params::SpinsF32,
};

/// Runs batches with the same single-precision kernel as the CPU path, but
/// only ever sees the flattened arrays, as a device would. Useful for
/// checking a batch layout without a device.
#[derive(Debug, Clone)]
pub struct HostAccelerator {
    props: DeviceProperties,
}

impl HostAccelerator {
    pub fn new(props: DeviceProperties) -> HostAccelerator {
        HostAccelerator { props }
    }
}

impl Default for HostAccelerator {
    fn default() -> Self {
        HostAccelerator::new(DeviceProperties {
            name: "host emulation".into(),
            warp_size: 32,
            max_threads_per_block: 1024,
            total_global_mem: 1024,
        })
    }
}

impl Accelerator for HostAccelerator {
    fn device_properties(&self) -> Result<DeviceProperties, GpuError> {
        if self.props.warp_size == 0 || self.props.max_threads_per_block == 0 {
            return Err(GpuError::DeviceProperties {
                msg: format!(
                    "warp size {} and max threads per block {} must be non-zero",
                    self.props.warp_size, self.props.max_threads_per_block
                )
                .into(),
                file: file!(),
                line: line!(),
            });
        }
        Ok(self.props.clone())
    }

    fn run_fstat_batch(&self, batch: &FstatBatch) -> Result<Array2<f32>, FstatError> {
        let bytes = batch.device_bytes();
        let mib = bytes.div_ceil(1024 * 1024);
        if mib > self.props.total_global_mem {
            return Err(gpu_call_error(
                GpuCall::Malloc,
                &format!(
                    "batch needs {mib} MiB, but {} has {} MiB",
                    self.props.name, self.props.total_global_mem
                ),
            )
            .into());
        }
        for d in &batch.detectors {
            let contiguous = d.sft_data.is_standard_layout()
                && [&d.delta_t_int, &d.delta_t_rem, &d.tdot_m1, &d.a, &d.b]
                    .iter()
                    .all(|a| a.is_standard_layout());
            if !contiguous {
                return Err(gpu_call_error(
                    GpuCall::CopyToDevice,
                    "batch arrays must be contiguous",
                )
                .into());
            }
        }
        debug!(
            "{}: running {} segments × {} bins ({bytes} bytes)",
            self.props.name, batch.num_segments, batch.num_bins
        );

        let lut = SinCosLut::shared();
        let order = batch
            .spins_ex
            .iter()
            .rposition(|&s| s != 0.0)
            .map(|i| i + 1)
            .unwrap_or(0);

        let mut out = vec![0.0_f32; batch.num_segments * batch.fstat_pitch];
        out.par_chunks_mut(batch.fstat_pitch)
            .enumerate()
            .try_for_each(|(i_seg, row)| {
                for (i_bin, fstat) in row[..batch.num_bins].iter_mut().enumerate() {
                    let spins = SpinsF32 {
                        freq_main: batch.freq_main[i_bin],
                        freq_rem: batch.fkdot0[i_bin],
                        spindowns: batch.spins_ex[..order].to_vec(),
                    };

                    let mut components = [Default::default(); NUM_OFFLOAD_DETECTORS];
                    for (c, d) in components.iter_mut().zip(batch.detectors.iter()) {
                        let n = d.num_sfts[i_seg] as usize;
                        let inputs = DetectorKernelInputs {
                            sft_data: d.sft_data.slice(s![i_seg, ..n, ..]),
                            num_bins: batch.sft_length,
                            freq_index0: batch.freq_index0,
                            tsft: batch.tsft,
                            delta_t_int: row_slice(&d.delta_t_int, i_seg, n),
                            delta_t_rem: row_slice(&d.delta_t_rem, i_seg, n),
                            tdot_m1: row_slice(&d.tdot_m1, i_seg, n),
                            a: row_slice(&d.a, i_seg, n),
                            b: row_slice(&d.b, i_seg, n),
                        };
                        *c = compute_fa_fb(&inputs, &spins, batch.dterms, lut)?;
                    }

                    let (fa, fb) = components
                        .iter()
                        .fold((c32::default(), c32::default()), |(fa, fb), c| {
                            (fa + c.fa, fb + c.fb)
                        });
                    *fstat = checked_fstat(
                        fa,
                        fb,
                        batch.ad[i_seg],
                        batch.bd[i_seg],
                        batch.cd[i_seg],
                        batch.dd_inv[i_seg],
                    )?;
                }
                Ok::<(), FstatError>(())
            })?;

        Array2::from_shape_vec((batch.num_segments, batch.fstat_pitch), out).map_err(|e| {
            gpu_call_error(GpuCall::CopyFromDevice, &e.to_string()).into()
        })
    }
}

/// The first `n` values of a row of a standard-layout array.
fn row_slice(a: &Array2<f32>, row: usize, n: usize) -> &[f32] {
    let start = row * a.ncols();
    &a.as_slice().expect("is contiguous")[start..start + n]
}
