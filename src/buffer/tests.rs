// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::atomic::{AtomicUsize, Ordering};

use vec1::vec1;

use super::*;
use crate::{
    antenna::{AmCoeffs, AntennaError},
    detector::{DetectorState, DetectorStateSeries},
    ssb::{BarycentreError, EmissionTime},
};

#[derive(Default)]
struct CountingBarycentre {
    calls: AtomicUsize,
}

impl Barycentre for CountingBarycentre {
    fn emission_time(
        &self,
        _detector: &str,
        _state: &DetectorState,
        _sky: RADec,
    ) -> Result<EmissionTime, BarycentreError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        Ok(EmissionTime {
            delay: 0.0,
            tdot: 1.0,
        })
    }
}

struct FailingBarycentre;

impl Barycentre for FailingBarycentre {
    fn emission_time(
        &self,
        detector: &str,
        _state: &DetectorState,
        _sky: RADec,
    ) -> Result<EmissionTime, BarycentreError> {
        Err(BarycentreError::Other {
            detector: detector.to_string(),
            msg: "ephemeris unavailable".to_string(),
        })
    }
}

#[derive(Default)]
struct CountingAntenna {
    calls: AtomicUsize,
}

impl AntennaPattern for CountingAntenna {
    fn am_coeffs(
        &self,
        series: &DetectorStateSeries,
        _sky: RADec,
    ) -> Result<AmCoeffs, AntennaError> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        let n = series.len();
        AmCoeffs::new(
            (0..n).map(|i| 0.5 + 0.1 * i as f32).collect(),
            (0..n).map(|i| -0.3 + 0.2 * i as f32).collect(),
        )
    }
}

fn states(num_segments: usize) -> DetectorStatesSequence {
    let series = DetectorStateSeries {
        detector: "H1".to_string(),
        states: (0..4)
            .map(|i| DetectorState {
                timestamp: Epoch::from_gpst_seconds(1e9 + i as f64 * 1800.0),
                pos_ssb: [0.0; 3],
                vel_ssb: [0.0; 3],
                tensor: [[0.0; 3]; 3],
            })
            .collect(),
    };
    DetectorStatesSequence::new(vec![vec1![series]; num_segments])
}

#[test]
fn repeated_sky_position_reuses_buffer() {
    let bary = CountingBarycentre::default();
    let antenna = CountingAntenna::default();
    let states = states(2);
    let sky = RADec::from_radians(1.0, 0.5);
    let ref_time = Epoch::from_gpst_seconds(1e9);
    let mut buffer = FstatBuffer::new();
    assert!(!buffer.is_populated());

    let first = buffer
        .get_or_compute(sky, ref_time, &states, None, &bary, &antenna)
        .unwrap()
        .to_vec();
    assert_eq!(first.len(), 2);
    assert_eq!(bary.calls.load(Ordering::Relaxed), 8);
    assert_eq!(antenna.calls.load(Ordering::Relaxed), 2);

    for _ in 0..3 {
        let again = buffer
            .get_or_compute(sky, ref_time, &states, None, &bary, &antenna)
            .unwrap();
        assert_eq!(again, first.as_slice());
    }
    assert_eq!(bary.calls.load(Ordering::Relaxed), 8);
    assert_eq!(antenna.calls.load(Ordering::Relaxed), 2);
    assert_eq!(buffer.recompute_count(), 1);
    assert!(buffer.is_populated());
}

#[test]
fn changed_key_rebuilds_buffer() {
    let bary = CountingBarycentre::default();
    let antenna = CountingAntenna::default();
    let states_a = states(1);
    let ref_time = Epoch::from_gpst_seconds(1e9);
    let mut buffer = FstatBuffer::new();

    let sky = RADec::from_radians(1.0, 0.5);
    buffer
        .get_or_compute(sky, ref_time, &states_a, None, &bary, &antenna)
        .unwrap();
    assert_eq!(buffer.recompute_count(), 1);

    // Different sky position.
    let sky2 = RADec::from_radians(1.0, 0.500_000_1);
    buffer
        .get_or_compute(sky2, ref_time, &states_a, None, &bary, &antenna)
        .unwrap();
    assert_eq!(buffer.recompute_count(), 2);

    // Same contents, but a new sequence.
    let states_b = states(1);
    buffer
        .get_or_compute(sky2, ref_time, &states_b, None, &bary, &antenna)
        .unwrap();
    assert_eq!(buffer.recompute_count(), 3);

    // A clone of the same sequence is not a new sequence.
    let states_b2 = states_b.clone();
    buffer
        .get_or_compute(sky2, ref_time, &states_b2, None, &bary, &antenna)
        .unwrap();
    assert_eq!(buffer.recompute_count(), 3);

    // Different weights.
    let weights = vec![MultiNoiseWeights {
        data: vec![vec![1.0, 2.0, 1.0, 0.5]],
        sinv_tsft: 1.0,
    }];
    let segs = buffer
        .get_or_compute(sky2, ref_time, &states_b2, Some(&weights), &bary, &antenna)
        .unwrap();
    assert_eq!(segs[0].am.mmunu.sinv_tsft, 1.0);
    assert_eq!(buffer.recompute_count(), 4);

    buffer.release();
    assert!(!buffer.is_populated());
    buffer
        .get_or_compute(sky2, ref_time, &states_b2, Some(&weights), &bary, &antenna)
        .unwrap();
    assert_eq!(buffer.recompute_count(), 5);
}

#[test]
fn failed_rebuild_leaves_buffer_empty() {
    let antenna = CountingAntenna::default();
    let states = states(1);
    let sky = RADec::from_radians(0.2, -0.1);
    let ref_time = Epoch::from_gpst_seconds(1e9);
    let mut buffer = FstatBuffer::new();

    buffer
        .get_or_compute(
            sky,
            ref_time,
            &states,
            None,
            &CountingBarycentre::default(),
            &antenna,
        )
        .unwrap();
    assert!(buffer.is_populated());

    let result = buffer.get_or_compute(
        RADec::from_radians(0.3, -0.1),
        ref_time,
        &states,
        None,
        &FailingBarycentre,
        &antenna,
    );
    assert!(matches!(result, Err(FstatError::Barycentre(_))));
    assert!(!buffer.is_populated());
    assert_eq!(buffer.recompute_count(), 1);
}

#[test]
fn weights_must_cover_every_segment() {
    let states = states(2);
    let weights = vec![MultiNoiseWeights {
        data: vec![vec![1.0; 4]],
        sinv_tsft: 1.0,
    }];
    let mut buffer = FstatBuffer::new();
    let result = buffer.get_or_compute(
        RADec::from_radians(0.2, -0.1),
        Epoch::from_gpst_seconds(1e9),
        &states,
        Some(&weights),
        &CountingBarycentre::default(),
        &CountingAntenna::default(),
    );
    assert!(matches!(
        result,
        Err(FstatError::WeightsSegmentMismatch {
            weights: 1,
            segments: 2
        })
    ));
    assert!(!buffer.is_populated());
}
