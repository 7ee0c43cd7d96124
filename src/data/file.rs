// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A JSON file format for SFTs with their detector states, and for
//! F-statistic band output.

use std::{
    fs::File,
    io::{BufReader, BufWriter},
    path::Path,
};

use hifitime::{Duration, Epoch};
use log::debug;
use marlu::c32;
use serde::{Deserialize, Serialize};
use vec1::Vec1;

use super::{
    DataFileError, FstatBandVector, MultiNoiseWeights, MultiSftVector, Sft, SftVector,
};
use crate::{
    detector::{DetectorState, DetectorStateSeries, DetectorStatesSequence},
    fstat::FstatInputs,
};

/// The top level of an SFT data file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SftDataFile {
    pub segments: Vec<SegmentRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentRecord {
    pub detectors: Vec<DetectorRecord>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectorRecord {
    pub name: String,

    /// The frequency of the first bin of every SFT \[Hz\].
    pub f0: f64,

    /// \[Hz\]
    pub df: f64,

    pub sfts: Vec<SftRecord>,
}

/// One SFT and the state of its detector. The SSB position, velocity and
/// response tensor are those at the SFT midpoint, `gps + 0.5 / df`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SftRecord {
    /// The start of the SFT \[GPS seconds\].
    pub gps: f64,

    pub re: Vec<f32>,
    pub im: Vec<f32>,

    /// The single-sided PSD estimate for this SFT. If given, it must be given
    /// for every SFT of the segment.
    #[serde(default)]
    pub psd: Option<f64>,

    #[serde(default)]
    pub pos_ssb: [f64; 3],

    #[serde(default)]
    pub vel_ssb: [f64; 3],

    #[serde(default)]
    pub tensor: [[f64; 3]; 3],
}

/// Everything read from an [`SftDataFile`], ready for computing
/// F-statistics.
#[derive(Debug, Clone)]
pub struct FstatData {
    pub sfts: Vec<MultiSftVector>,
    pub weights: Option<Vec<MultiNoiseWeights>>,
    pub states: DetectorStatesSequence,
}

impl FstatData {
    pub fn inputs(&self) -> FstatInputs {
        FstatInputs {
            sfts: &self.sfts,
            weights: self.weights.as_deref(),
            states: &self.states,
        }
    }

    pub fn num_segments(&self) -> usize {
        self.sfts.len()
    }

    /// The start time of the earliest SFT.
    pub fn first_epoch(&self) -> Option<Epoch> {
        self.sfts
            .iter()
            .flat_map(|multi| multi.iter())
            .filter_map(|sv| sv.epochs.first().copied())
            .reduce(|a, b| if b < a { b } else { a })
    }
}

impl SftDataFile {
    pub fn read(file: &Path) -> Result<SftDataFile, DataFileError> {
        debug!("Reading SFT data from {}", file.display());
        let reader = BufReader::new(File::open(file)?);
        Ok(serde_json::from_reader(reader)?)
    }

    pub fn write(&self, file: &Path) -> Result<(), DataFileError> {
        let writer = BufWriter::new(File::create(file)?);
        serde_json::to_writer(writer, self)?;
        Ok(())
    }

    /// Validate the records and convert them. Noise weights are derived for a
    /// segment only if every SFT in it has a PSD estimate; if no segment has
    /// weights, `weights` is `None`.
    pub fn into_data(self) -> Result<FstatData, DataFileError> {
        if self.segments.is_empty() {
            return Err(DataFileError::NoSegments);
        }

        let mut sfts = Vec::with_capacity(self.segments.len());
        let mut states = Vec::with_capacity(self.segments.len());
        let mut weights = Vec::with_capacity(self.segments.len());
        for (i_seg, segment) in self.segments.into_iter().enumerate() {
            if segment.detectors.is_empty() {
                return Err(DataFileError::NoDetectors { segment: i_seg });
            }

            let mut multi_sfts = Vec::with_capacity(segment.detectors.len());
            let mut multi_states = Vec::with_capacity(segment.detectors.len());
            let mut psds = Vec::with_capacity(segment.detectors.len());
            for detector in segment.detectors {
                let (sv, series, psd) = detector.into_parts(i_seg)?;
                multi_sfts.push(sv);
                multi_states.push(series);
                psds.push(psd);
            }

            let tsft = multi_sfts[0].tsft();
            let segment_weights = if psds.iter().all(|p| p.is_some()) {
                let psds: Vec<Vec<f64>> = psds.into_iter().flatten().collect();
                Some(MultiNoiseWeights::from_psd(&psds, tsft).map_err(|source| {
                    DataFileError::Sft {
                        segment: i_seg,
                        detector: "<all>".to_string(),
                        source,
                    }
                })?)
            } else if psds.iter().all(|p| p.is_none()) {
                None
            } else {
                return Err(DataFileError::PartialPsd { segment: i_seg });
            };

            let no_detectors = |_| DataFileError::NoDetectors { segment: i_seg };
            sfts.push(Vec1::try_from_vec(multi_sfts).map_err(no_detectors)?);
            states.push(Vec1::try_from_vec(multi_states).map_err(no_detectors)?);
            weights.push((segment_weights, tsft));
        }

        // Weights are all or nothing. Segments without PSDs get unit weights
        // if any other segment has them.
        let weights = if weights.iter().any(|(w, _)| w.is_some()) {
            Some(
                weights
                    .into_iter()
                    .zip(sfts.iter())
                    .map(|((w, tsft), multi)| {
                        w.unwrap_or_else(|| {
                            let num_sfts: Vec<usize> =
                                multi.iter().map(|sv| sv.num_sfts()).collect();
                            MultiNoiseWeights::unit(&num_sfts, tsft)
                        })
                    })
                    .collect(),
            )
        } else {
            None
        };

        Ok(FstatData {
            sfts,
            weights,
            states: DetectorStatesSequence::new(states),
        })
    }
}

impl DetectorRecord {
    #[allow(clippy::type_complexity)]
    fn into_parts(
        self,
        i_seg: usize,
    ) -> Result<(SftVector, DetectorStateSeries, Option<Vec<f64>>), DataFileError> {
        let DetectorRecord { name, f0, df, sfts } = self;

        let mut psd = Vec::with_capacity(sfts.len());
        let mut geometry = Vec::with_capacity(sfts.len());
        let mut converted = Vec::with_capacity(sfts.len());
        for (index, record) in sfts.into_iter().enumerate() {
            if record.re.len() != record.im.len() {
                return Err(DataFileError::ComplexLengthMismatch {
                    segment: i_seg,
                    detector: name,
                    index,
                    re: record.re.len(),
                    im: record.im.len(),
                });
            }
            psd.push(record.psd);
            geometry.push((record.pos_ssb, record.vel_ssb, record.tensor));
            converted.push(Sft {
                epoch: Epoch::from_gpst_seconds(record.gps),
                f0,
                df,
                data: record
                    .re
                    .into_iter()
                    .zip(record.im)
                    .map(|(re, im)| c32::new(re, im))
                    .collect(),
            });
        }

        let sv = SftVector::from_sfts(&name, &converted).map_err(|source| DataFileError::Sft {
            segment: i_seg,
            detector: name.clone(),
            source,
        })?;
        // States apply to SFT midpoints.
        let half_sft = Duration::from_seconds(0.5 * sv.tsft());
        let states = sv
            .timestamps()
            .iter()
            .zip(geometry)
            .map(|(&epoch, (pos_ssb, vel_ssb, tensor))| DetectorState {
                timestamp: epoch + half_sft,
                pos_ssb,
                vel_ssb,
                tensor,
            })
            .collect();
        let psd = if psd.iter().all(|p| p.is_some()) {
            Some(psd.into_iter().flatten().collect())
        } else if psd.iter().all(|p| p.is_none()) {
            None
        } else {
            return Err(DataFileError::PartialPsd { segment: i_seg });
        };

        Ok((
            sv,
            DetectorStateSeries {
                detector: name,
                states,
            },
            psd,
        ))
    }
}

/// F-statistic output as written to disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FstatBandRecord {
    pub f0: f64,
    pub df: f64,

    /// One row per segment.
    pub fstats: Vec<Vec<f32>>,
}

impl From<&FstatBandVector> for FstatBandRecord {
    fn from(band: &FstatBandVector) -> Self {
        FstatBandRecord {
            f0: band.f0,
            df: band.df,
            fstats: band.fstats.outer_iter().map(|row| row.to_vec()).collect(),
        }
    }
}

impl FstatBandRecord {
    pub fn write(&self, file: &Path) -> Result<(), DataFileError> {
        let writer = BufWriter::new(File::create(file)?);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    pub fn read(file: &Path) -> Result<FstatBandRecord, DataFileError> {
        let reader = BufReader::new(File::open(file)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
