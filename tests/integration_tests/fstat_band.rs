// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::io::Write;

use approx::assert_abs_diff_eq;
use tempfile::TempDir;

use crate::{cwfstat_bin, get_cmd_output, write_data_file, TSFT};
use cwfstat::data::FstatBandRecord;

#[test]
fn test_fstat_band_writes_output() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let data = write_data_file(tmp_dir.path(), &["H1", "L1"], 2);
    let output = tmp_dir.path().join("band.json");

    #[rustfmt::skip]
    let cmd = cwfstat_bin()
        .args([
            "fstat-band",
            "--data", &data.display().to_string(),
            "--ra", "40",
            "--dec", "-17.5",
            "--freq", "100",
            "--spindowns=-1e-10",
            "--num-bins", "5",
            "--dterms", "8",
            "--output", &output.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "fstat-band failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("fstat-band complete"), "{stdout}");

    let record = FstatBandRecord::read(&output).unwrap();
    assert_eq!(record.f0, 100.0);
    assert_abs_diff_eq!(record.df, 1.0 / TSFT);
    assert_eq!(record.fstats.len(), 2);
    assert!(record.fstats.iter().all(|row| row.len() == 5));
    assert!(record.fstats.iter().flatten().all(|f| f.is_finite()));
}

#[test]
fn test_fstat_band_gpu_matches_cpu() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let data = write_data_file(tmp_dir.path(), &["H1", "L1"], 1);
    let data = data.display().to_string();
    let cpu = tmp_dir.path().join("cpu.json");
    let gpu = tmp_dir.path().join("gpu.json");

    for (output, extra) in [(&cpu, None), (&gpu, Some("--gpu"))] {
        let output = output.display().to_string();
        #[rustfmt::skip]
        let mut args = vec![
            "fstat-band",
            "--data", &data,
            "--ra", "123.4",
            "--dec", "5.6",
            "--freq", "100.001",
            "--num-bins", "7",
            "--dterms", "8",
            "--output", &output,
        ];
        args.extend(extra);
        let cmd = cwfstat_bin().args(&args).ok();
        assert!(cmd.is_ok(), "fstat-band failed: {}", cmd.err().unwrap());
    }

    assert_eq!(
        FstatBandRecord::read(&cpu).unwrap(),
        FstatBandRecord::read(&gpu).unwrap()
    );
}

#[test]
fn test_fstat_band_arg_file_and_save_toml() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let data = write_data_file(tmp_dir.path(), &["H1"], 1);
    let output = tmp_dir.path().join("band.json");
    let saved = tmp_dir.path().join("saved.toml");

    let args_file = tmp_dir.path().join("args.toml");
    let mut f = std::fs::File::create(&args_file).unwrap();
    writeln!(f, "data = {:?}", data.display().to_string()).unwrap();
    writeln!(f, "ra = 40.0\ndec = 10.0\nfreq = 100.0\nnum_bins = 2\ndterms = 8").unwrap();
    writeln!(f, "output = {:?}", output.display().to_string()).unwrap();
    drop(f);

    let cmd = cwfstat_bin()
        .args([
            "fstat-band",
            &args_file.display().to_string(),
            "--num-bins",
            "3",
            "--save-toml",
            &saved.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_ok(), "fstat-band failed: {}", cmd.err().unwrap());

    let record = FstatBandRecord::read(&output).unwrap();
    assert_eq!(record.fstats[0].len(), 3);
    let saved = std::fs::read_to_string(saved).unwrap();
    assert!(saved.contains("num_bins = 3"), "{saved}");
}

#[test]
fn test_dry_run_writes_nothing() {
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
            "--output", &output.display().to_string(),
            "--dry-run",
        ])
        .ok();
    assert!(cmd.is_ok(), "fstat-band failed: {}", cmd.err().unwrap());
    let (stdout, _) = get_cmd_output(cmd);
    assert!(stdout.contains("Dry run -- exiting now."), "{stdout}");
    assert!(!output.exists());
}

#[test]
fn test_errors_are_reported_on_stderr() {
    let tmp_dir = TempDir::new().expect("couldn't make tmp dir");
    let data = write_data_file(tmp_dir.path(), &["H1", "L1"], 1);
    let output = tmp_dir.path().join("band.json");

    // The band runs off the end of the SFTs.
    #[rustfmt::skip]
    let cmd = cwfstat_bin()
        .args([
            "fstat-band",
            "--data", &data.display().to_string(),
            "--ra", "40",
            "--dec", "10",
            "--freq", "100",
            "--num-bins", "30",
            "--output", &output.display().to_string(),
        ])
        .ok();
    assert!(cmd.is_err());
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.starts_with("Error: "), "{stderr}");
    assert!(!output.exists());

    // No sky position.
    let cmd = cwfstat_bin()
        .args(["fstat-band", "--data", &data.display().to_string(), "--freq", "100"])
        .ok();
    let (_, stderr) = get_cmd_output(cmd);
    assert!(stderr.contains("--ra and --dec"), "{stderr}");
}
