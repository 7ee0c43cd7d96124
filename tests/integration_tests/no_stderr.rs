// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Tests to ensure there is no stderr output for successful commands.

use tempfile::TempDir;

use crate::{cwfstat_bin, get_cmd_output, write_data_file};

#[test]
fn test_fstat_band_no_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let data = write_data_file(tmp_dir.path(), &["H1", "L1"], 1);
    let output = tmp_dir.path().join("band.json");

    #[rustfmt::skip]
    let cmd = cwfstat_bin()
        .args([
            "fstat-band",
            "--data", &data.display().to_string(),
            "--ra", "40",
            "--dec", "10",
            "--freq", "100",
            "--num-bins", "4",
            "--dterms", "8",
            "--output", &output.display().to_string(),
            "-vv",
        ])
        .ok();
    assert!(
        cmd.is_ok(),
        "fstat-band failed on simple test data: {}",
        cmd.err().unwrap()
    );
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.is_empty(), "stderr wasn't empty: {stderr}");
}
