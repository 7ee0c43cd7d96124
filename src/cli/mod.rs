// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! The `cwfstat` command line.
//!
//! Subcommand arguments are all `Option`s (or `#[serde(default)]` booleans)
//! so that any of them can come from an arguments file instead.

#[macro_use]
mod common;
mod error;
mod fstat_band;

pub use error::CwFstatError;

use std::{fs::File, io::Write, path::PathBuf};

use clap::{AppSettings, Args, Parser, Subcommand};
use log::{info, LevelFilter};

include!(concat!(env!("OUT_DIR"), "/built.rs"));

#[derive(Debug, Parser)]
#[clap(
    version,
    author,
    about = "Single-precision F-statistic computation over SFT data for continuous-wave searches"
)]
#[clap(global_setting(AppSettings::DeriveDisplayOrder))]
#[clap(disable_help_subcommand = true)]
#[clap(infer_subcommands = true)]
#[clap(propagate_version = true)]
pub struct CwFstat {
    #[clap(flatten)]
    global_opts: GlobalArgs,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Args)]
struct GlobalArgs {
    /// Log more. -v adds debug messages, -vv adds trace messages and -vvv
    /// also tags each message with its source line.
    #[clap(short, long, parse(from_occurrences), global = true)]
    verbosity: u8,

    /// Read and check the inputs, then stop before computing anything.
    #[clap(long, global = true)]
    dry_run: bool,

    /// Write the merged arguments to this TOML file, for use as an arguments
    /// file later.
    #[clap(long, global = true)]
    save_toml: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
#[clap(arg_required_else_help = true)]
enum Command {
    #[clap(alias = "band")]
    #[clap(about = "Compute the F-statistic over a band of frequency bins for every segment.")]
    FstatBand(fstat_band::FstatBandArgs),
}

impl CwFstat {
    pub fn run(self) -> Result<(), CwFstatError> {
        let GlobalArgs {
            verbosity,
            dry_run,
            save_toml,
        } = self.global_opts;
        setup_logging(verbosity).expect("Failed to initialise logging.");
        let Command::FstatBand(args) = self.command;
        info!("cwfstat fstat-band {}", env!("CARGO_PKG_VERSION"));
        log_build_info();

        let args = args.merge()?;
        if let Some(toml_file) = save_toml {
            let toml_str =
                toml::to_string(&args).map_err(|e| CwFstatError::Generic(e.to_string()))?;
            File::create(&toml_file)?.write_all(toml_str.as_bytes())?;
            info!("Saved arguments to {}", toml_file.display());
        }
        args.run(dry_run)?;

        info!("cwfstat fstat-band complete.");
        Ok(())
    }
}

/// Log to stdout at a level set by `verbosity`. Colours are only used on a
/// tty.
fn setup_logging(verbosity: u8) -> Result<(), log::SetLoggerError> {
    let level = match verbosity {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let mut builder = env_logger::Builder::from_default_env();
    builder
        .target(env_logger::Target::Stdout)
        .format_target(false)
        .filter_level(level);
    if verbosity >= 3 {
        builder.format(|buf, record| {
            let timestamp = buf.timestamp();
            writeln!(
                buf,
                "[{timestamp} {} {}:{}] {}",
                record.level(),
                record.target(),
                record.line().unwrap_or(0),
                record.args()
            )
        });
    }
    builder.try_init()
}

fn log_build_info() {
    let commit = GIT_COMMIT_HASH_SHORT.unwrap_or("<no git info>");
    let dirty = if GIT_DIRTY == Some(true) { " (dirty)" } else { "" };
    info!("Built from git commit {commit}{dirty} at {BUILT_TIME_UTC}");
    info!("Compiler: {RUSTC_VERSION}");
}
