// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Integration tests.
//!
//! Some help for laying out these tests was taken from:
//! https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html

mod fstat_band;
mod no_stderr;

use std::{
    path::{Path, PathBuf},
    process::Output,
    str::from_utf8,
};

use assert_cmd::{output::OutputError, Command};

use cwfstat::data::{DetectorRecord, SegmentRecord, SftDataFile, SftRecord};

const TSFT: f64 = 1800.0;
const GPS_START: f64 = 1_000_000_000.0;

fn cwfstat_bin() -> Command {
    Command::cargo_bin("cwfstat").unwrap()
}

fn get_cmd_output(result: Result<Output, OutputError>) -> (String, String) {
    let output = match result {
        Ok(o) => o,
        Err(o) => o.as_output().unwrap().clone(),
    };
    (
        from_utf8(&output.stdout).unwrap().to_string(),
        from_utf8(&output.stderr).unwrap().to_string(),
    )
}

/// Write a data file of `num_segments` segments of 8 SFTs (40 bins from
/// 99.99 Hz) for each of `detectors`. The detectors sit on the equator of a
/// rotating Earth, so their antenna patterns vary over a segment.
fn write_data_file(dir: &Path, detectors: &[&str], num_segments: usize) -> PathBuf {
    const NUM_SFTS: usize = 8;
    const NUM_BINS: usize = 40;

    let file = SftDataFile {
        segments: (0..num_segments)
            .map(|i_seg| SegmentRecord {
                detectors: detectors
                    .iter()
                    .enumerate()
                    .map(|(i_det, name)| DetectorRecord {
                        name: name.to_string(),
                        f0: 99.99,
                        df: 1.0 / TSFT,
                        sfts: (0..NUM_SFTS)
                            .map(|i_sft| {
                                let gps =
                                    GPS_START + ((i_seg * NUM_SFTS + i_sft) as f64) * TSFT;
                                let seed = i_det + i_seg;
                                // Detector states are for the SFT midpoint.
                                let mid = gps + 0.5 * TSFT;
                                let phi = std::f64::consts::TAU * (mid - GPS_START) / 86_164.1;
                                let (s, c) = phi.sin_cos();
                                // East arm minus north arm.
                                let tensor = [
                                    [0.5 * s * s, -0.5 * s * c, 0.0],
                                    [-0.5 * s * c, 0.5 * c * c, 0.0],
                                    [0.0, 0.0, -0.5],
                                ];
                                SftRecord {
                                    gps,
                                    re: (0..NUM_BINS)
                                        .map(|k| ((seed * 3 + i_sft * 7 + k * 3) % 11) as f32 / 11.0 - 0.5)
                                        .collect(),
                                    im: (0..NUM_BINS)
                                        .map(|k| ((seed * 5 + i_sft * 5 + k) % 13) as f32 / 13.0 - 0.5)
                                        .collect(),
                                    psd: Some(1.0 + 0.1 * i_det as f64),
                                    pos_ssb: [6.4e6 * c, 6.4e6 * s, 0.0],
                                    vel_ssb: [-466.7 * s, 466.7 * c, 0.0],
                                    tensor,
                                }
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect(),
    };
    let path = dir.join("sfts.json");
    file.write(&path).unwrap();
    path
}
