// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BarycentreError {
    #[error("Detector {0} has no states to barycentre")]
    NoStates(String),

    #[error("Detector {detector} has a non-finite SSB position or velocity at GPS {gps}")]
    NonFiniteState { detector: String, gps: f64 },

    #[error("Detector {detector} got a non-finite emission time at GPS {gps}: delay {delay} s, Tdot {tdot}")]
    NonFiniteEmissionTime {
        detector: String,
        gps: f64,
        delay: f64,
        tdot: f64,
    },

    #[error("Barycentring failed for detector {detector}: {msg}")]
    Other { detector: String, msg: String },
}
