//! # Trajectory
//!
//! An ordered, outlier-filtered collection of [`Sample`]s supporting temporal
//! interpolation, fixed-step iteration, and sub-range extraction.
//!
//! A trajectory is immutable after construction. The only interior state is a
//! per-instance memo of `value_at` results: the query is a pure function of
//! the instant, so each bit-identical instant is computed once and cached for
//! the lifetime of the trajectory. A near-miss timestamp is a cache miss, not
//! an interpolation shortcut.

use crate::device::LapMarker;
use crate::Sample;
use chrono::{DateTime, Duration, Utc};
use std::cell::RefCell;
use std::collections::HashMap;

/// Maximum great-circle jump between consecutive retained samples. Anything
/// farther is treated as a corrupted GPS fix and dropped.
pub const OUTLIER_THRESHOLD_KM: f64 = 1.0;

/// Bracketing pairs farther apart than this indicate the sensor stopped
/// recording; interpolating across the gap would be meaningless, so the
/// earlier sample's values are held instead.
pub const GAP_FREEZE_THRESHOLD_US: i64 = 1_500_000;

/// Bracketing pairs closer than this are effectively coincident; the earlier
/// sample is returned as-is rather than dividing by a near-zero gap.
pub const MIN_INTERP_GAP_US: i64 = 100;

/// An ordered, filtered GPS/sensor track with temporal queries.
///
/// Construction filters the raw sample list (see [`Trajectory::new`]);
/// retained samples are strictly chronological and positioned. Queries for
/// instants between retained samples interpolate; queries across recording
/// gaps hold the earlier sample's values.
#[derive(Debug, Clone)]
pub struct Trajectory {
    samples: Vec<Sample>,
    laps: Vec<LapMarker>,
    cache: RefCell<HashMap<DateTime<Utc>, Option<Sample>>>,
}

impl Trajectory {
    /// Build a trajectory from decoded samples in chronological order.
    ///
    /// Filtering walks the raw sequence from the END backward: a sample is
    /// kept only if it is positioned and within [`OUTLIER_THRESHOLD_KM`] of
    /// the most recently KEPT sample. The result is reversed back to
    /// chronological order. Anchoring the filter to the tail (rather than a
    /// possibly-glitched head) is intentional.
    pub fn new(samples: Vec<Sample>) -> Self {
        Self::with_laps(samples, Vec::new())
    }

    /// Build a trajectory that also carries the device's lap markers.
    ///
    /// Lap markers take no part in filtering or interpolation; they exist
    /// solely for the anchor detector.
    pub fn with_laps(samples: Vec<Sample>, laps: Vec<LapMarker>) -> Self {
        Self {
            samples: filter_samples(samples),
            laps,
            cache: RefCell::new(HashMap::new()),
        }
    }

    /// The retained samples, in chronological order.
    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    /// The device's lap markers (possibly empty).
    pub fn laps(&self) -> &[LapMarker] {
        &self.laps
    }

    /// Number of retained samples.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Timestamp of the first retained sample.
    pub fn start_time(&self) -> Option<DateTime<Utc>> {
        self.samples.first().map(|s| s.timestamp)
    }

    /// Timestamp of the last retained sample.
    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.samples.last().map(|s| s.timestamp)
    }

    /// Covered time span (`end_time - start_time`).
    pub fn length(&self) -> Option<Duration> {
        match (self.start_time(), self.end_time()) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    /// The trajectory's value at `time`, or `None` when there is nothing to
    /// interpolate.
    ///
    /// Returns `None` when the trajectory has fewer than two samples or
    /// `time` lies outside `[start_time, end_time]`. Otherwise the bracketing
    /// sample pair is located by binary search over the sorted timestamps and
    /// one of two things happens:
    ///
    /// - the pair is closer than [`MIN_INTERP_GAP_US`] or farther apart than
    ///   [`GAP_FREEZE_THRESHOLD_US`]: the earlier sample's values are held;
    /// - otherwise the pair is linearly interpolated.
    ///
    /// In both cases the returned sample carries EXACTLY the queried
    /// timestamp. Results (including `None`) are cached per bit-identical
    /// queried instant.
    pub fn value_at(&self, time: DateTime<Utc>) -> Option<Sample> {
        if self.samples.len() < 2 {
            return None;
        }
        // Bounds are checked before consulting the cache so out-of-range
        // probes from the alignment scan never grow the memo.
        let start = self.samples[0].timestamp;
        let end = self.samples[self.samples.len() - 1].timestamp;
        if time < start || time > end {
            return None;
        }

        if let Some(hit) = self.cache.borrow().get(&time) {
            return hit.clone();
        }

        let result = self.interpolate_at(time);
        self.cache.borrow_mut().insert(time, result.clone());
        result
    }

    fn interpolate_at(&self, time: DateTime<Utc>) -> Option<Sample> {
        // First index whose timestamp exceeds `time`; the bracketing pair is
        // (idx - 1, idx). At `time == end_time` every sample tests <=, so the
        // final pair brackets.
        let idx = self.samples.partition_point(|s| s.timestamp <= time);
        let (a, b) = if idx >= self.samples.len() {
            (&self.samples[idx - 2], &self.samples[idx - 1])
        } else {
            (&self.samples[idx - 1], &self.samples[idx])
        };

        let gap_us = (b.timestamp - a.timestamp)
            .num_microseconds()
            .unwrap_or(i64::MAX);
        let result = if !(MIN_INTERP_GAP_US..=GAP_FREEZE_THRESHOLD_US).contains(&gap_us) {
            a.clone()
        } else {
            let weight_a =
                (b.timestamp - time).num_microseconds().unwrap_or(0) as f64 / gap_us as f64;
            a.weighted_average(b, 1.0 - weight_a)
        };

        Some(result.at_time(time))
    }

    /// Lazy fixed-step walk of `value_at` from `start_time`.
    ///
    /// Yields `value_at(t)` for `t = start, start + step, ...` and stops
    /// (fused, without error) at the first absent value, i.e. once `t` passes
    /// `end_time`. The walk is restartable by calling `iter_at` again.
    ///
    /// # Panics
    /// Panics if `step` is not positive.
    pub fn iter_at(&self, step: Duration) -> TrajectoryIter<'_> {
        assert!(step > Duration::zero(), "iteration step must be positive");
        TrajectoryIter {
            trajectory: self,
            next_time: self.start_time(),
            step,
        }
    }

    /// Materialize `[start, end]` at fixed `step` into a new trajectory.
    ///
    /// Walks `value_at` from `start` in increments of `step` while `t <= end`,
    /// stopping early at the first absent value. The collected samples go
    /// through the same outlier filter as any other construction.
    ///
    /// # Panics
    /// Panics if `step` is not positive.
    pub fn sub_trajectory(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        step: Duration,
    ) -> Trajectory {
        assert!(step > Duration::zero(), "resampling step must be positive");
        let mut samples = Vec::new();
        let mut t = start;
        while t <= end {
            match self.value_at(t) {
                Some(sample) => samples.push(sample),
                None => break,
            }
            t = t + step;
        }
        Trajectory::new(samples)
    }
}

/// Iterator returned by [`Trajectory::iter_at`].
pub struct TrajectoryIter<'a> {
    trajectory: &'a Trajectory,
    next_time: Option<DateTime<Utc>>,
    step: Duration,
}

impl Iterator for TrajectoryIter<'_> {
    type Item = Sample;

    fn next(&mut self) -> Option<Sample> {
        let t = self.next_time?;
        match self.trajectory.value_at(t) {
            Some(sample) => {
                self.next_time = Some(t + self.step);
                Some(sample)
            }
            None => {
                self.next_time = None;
                None
            }
        }
    }
}

/// Backward outlier filter (see [`Trajectory::new`] for the rationale).
fn filter_samples(raw: Vec<Sample>) -> Vec<Sample> {
    let mut kept: Vec<Sample> = Vec::with_capacity(raw.len());
    for sample in raw.into_iter().rev() {
        if !sample.has_position() {
            continue;
        }
        let in_range = match kept.last() {
            Some(last) => Sample::distance_km(&sample, last) < OUTLIER_THRESHOLD_KM,
            None => true,
        };
        if in_range {
            kept.push(sample);
        }
    }
    kept.reverse();
    kept
}

// ============================================================================
// Tests
// ============================================================================
