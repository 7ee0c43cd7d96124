// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.


use std::path::PathBuf;

use clap::Parser;
use hifitime::Epoch;
use log::{debug, info, trace, warn};
use marlu::RADec;
use serde::{Deserialize, Serialize};

use super::common::{ARG_FILE_HELP, DTERMS_HELP};
use crate::{
    constants::{DEFAULT_DTERMS, MAX_DTERMS, MAX_SPINDOWN_ORDER},
    data::SftDataFile,
    fstat::FstatDevice,
    params::{FstatBandParams, ParameterPoint},
    CwFstatError,
};

const DEFAULT_OUTPUT: &str = "fstat_band.json";

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct FstatBandArgs {
    #[clap(name = "ARGUMENTS_FILE", help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// Path to the JSON file containing SFTs and detector states.
    #[clap(short, long, parse(from_os_str), help_heading = "INPUT DATA")]
    pub(super) data: Option<PathBuf>,

    /// The right ascension of the source [degrees].
    #[clap(long, help_heading = "SEARCH POINT")]
    pub(super) ra: Option<f64>,

    /// The declination of the source [degrees].
    #[clap(long, allow_hyphen_values = true, help_heading = "SEARCH POINT")]
    pub(super) dec: Option<f64>,

    /// The frequency of the first bin of the band [Hz].
    #[clap(short, long, help_heading = "SEARCH POINT")]
    pub(super) freq: Option<f64>,

    /// The frequency derivatives at the reference time, starting with the
    /// first [Hz/s, Hz/s², ...]. Separate values with commas, e.g.
    /// --spindowns=-1e-10,2e-20
    #[clap(
        long,
        allow_hyphen_values = true,
        use_value_delimiter = true,
        require_value_delimiter = true,
        help_heading = "SEARCH POINT"
    )]
    pub(super) spindowns: Option<Vec<f64>>,

    /// The reference time of the frequency and spindowns [GPS seconds]. The
    /// default is the start of the earliest SFT.
    #[clap(long, help_heading = "SEARCH POINT")]
    pub(super) ref_time: Option<f64>,

    /// The number of frequency bins in the band. Default: 1
    #[clap(short, long, help_heading = "BAND")]
    pub(super) num_bins: Option<usize>,

    /// The spacing of the band's bins [Hz]. The default is the SFT frequency
    /// resolution.
    #[clap(long, help_heading = "BAND")]
    pub(super) df: Option<f64>,

    #[clap(long, help = DTERMS_HELP.as_str(), help_heading = "BAND")]
    pub(super) dterms: Option<u32>,

    /// Path to the output JSON file of F-statistics.
    #[clap(short, long, parse(from_os_str), help_heading = "OUTPUT FILES")]
    pub(super) output: Option<PathBuf>,

    /// Compute the band with the batched accelerator kernel (emulated on the
    /// host). Requires exactly two detectors with uniform SFTs.
    #[clap(long, help_heading = "DEVICE")]
    #[serde(default)]
    pub(super) gpu: bool,
}

impl FstatBandArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified into
    /// a single struct. Where applicable, it will prefer CLI parameters over
    /// those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<FstatBandArgs, CwFstatError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let FstatBandArgs {
                args_file: _,
                data,
                ra,
                dec,
                freq,
                spindowns,
                ref_time,
                num_bins,
                df,
                dterms,
                output,
                gpu,
            } = unpack_arg_file!(arg_file);

            Ok(FstatBandArgs {
                args_file: None,
                data: cli_args.data.or(data),
                ra: cli_args.ra.or(ra),
                dec: cli_args.dec.or(dec),
                freq: cli_args.freq.or(freq),
                spindowns: cli_args.spindowns.or(spindowns),
                ref_time: cli_args.ref_time.or(ref_time),
                num_bins: cli_args.num_bins.or(num_bins),
                df: cli_args.df.or(df),
                dterms: cli_args.dterms.or(dterms),
                output: cli_args.output.or(output),
                gpu: cli_args.gpu || gpu,
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<FstatBandParams, CwFstatError> {
        debug!("{:#?}", self);

        let Self {
            args_file: _,
            data,
            ra,
            dec,
            freq,
            spindowns,
            ref_time,
            num_bins,
            df,
            dterms,
            output,
            gpu,
        } = self;

        let data_file = data.ok_or(FstatBandArgsError::NoData)?;
        let (ra, dec) = match (ra, dec) {
            (Some(ra), Some(dec)) => (ra, dec),
            _ => return Err(FstatBandArgsError::NoSkyPosition.into()),
        };
        if !ra.is_finite() || !(-90.0..=90.0).contains(&dec) {
            return Err(FstatBandArgsError::BadSkyPosition { ra, dec }.into());
        }
        let freq = freq.ok_or(FstatBandArgsError::NoFreq)?;
        if !(freq > 0.0) || !freq.is_finite() {
            return Err(FstatBandArgsError::BadFreq(freq).into());
        }
        let spindowns = spindowns.unwrap_or_default();
        if spindowns.len() > MAX_SPINDOWN_ORDER {
            return Err(FstatBandArgsError::TooManySpindowns(spindowns.len()).into());
        }
        let num_bins = num_bins.unwrap_or(1);
        if num_bins == 0 {
            return Err(FstatBandArgsError::NoBins.into());
        }
        let dterms = dterms.unwrap_or(DEFAULT_DTERMS);
        if dterms == 0 {
            return Err(FstatBandArgsError::NoDterms.into());
        }
        if dterms > MAX_DTERMS {
            return Err(FstatBandArgsError::TooManyDterms(dterms).into());
        }
        let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
        match output.extension().and_then(|e| e.to_str()) {
            Some(e) if e.eq_ignore_ascii_case("json") => (),
            _ => return Err(FstatBandArgsError::OutputNotJson(output).into()),
        }

        let data = SftDataFile::read(&data_file)?.into_data()?;
        let sft_df = data.sfts[0].first().df;
        let df = df.unwrap_or(sft_df);
        if !(df > 0.0) || !df.is_finite() {
            return Err(FstatBandArgsError::BadDf(df).into());
        }
        let ref_time = match ref_time {
            Some(gps) => Epoch::from_gpst_seconds(gps),
            None => data.first_epoch().ok_or(FstatBandArgsError::NoData)?,
        };
        if data.weights.is_none() {
            warn!("No PSD estimates in the data file; the F-statistic will be unweighted");
        }

        let device = if gpu {
            FstatDevice::HostGpu
        } else {
            FstatDevice::Cpu
        };
        info!("Using {}", device.get_device_info()?);
        info!("Data: {} ({} segments)", data_file.display(), data.num_segments());
        info!("Sky position: RA {ra}°, Dec {dec}°");
        info!(
            "Band: {num_bins} bins of {df} Hz from {freq} Hz, spindowns {:?}",
            spindowns
        );
        info!("Reference time: {} GPS", ref_time.to_gpst_seconds());

        Ok(FstatBandParams {
            data,
            point: ParameterPoint::new(
                RADec::from_degrees(ra, dec),
                freq,
                spindowns,
                ref_time,
            ),
            df,
            num_bins,
            dterms,
            device,
            output,
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), CwFstatError> {
        debug!("Converting arguments into parameters");
        trace!("{:#?}", self);
        let params = self.parse()?;

        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }

        params.run()?;
        Ok(())
    }
}

#[derive(thiserror::Error, Debug)]
pub(super) enum FstatBandArgsError {
    #[error("No SFT data file was specified")]
    NoData,

    #[error("Both --ra and --dec must be specified")]
    NoSkyPosition,

    #[error("Invalid sky position: RA {ra}°, Dec {dec}°")]
    BadSkyPosition { ra: f64, dec: f64 },

    #[error("No frequency was specified")]
    NoFreq,

    #[error("Invalid frequency: {0} Hz")]
    BadFreq(f64),

    #[error("Got {0} spindowns, but at most {MAX_SPINDOWN_ORDER} are supported")]
    TooManySpindowns(usize),

    #[error("The band must have at least one bin")]
    NoBins,

    #[error("Invalid bin spacing: {0} Hz")]
    BadDf(f64),

    #[error("The number of Dirichlet terms must be at least 1")]
    NoDterms,

    #[error("Got {0} Dirichlet terms, but at most {MAX_DTERMS} are supported")]
    TooManyDterms(u32),

    #[error("The output file '{}' must have a .json extension", .0.display())]
    OutputNotJson(PathBuf),
}
