//! # Alignment Search
//!
//! Brute-force clock-offset recovery between two trajectories of the same
//! physical ride (e.g. a head-unit track and a camera GPS track).
//!
//! One track is assumed to be shifted by an unknown scalar offset within a
//! roughly-known range. The search scans candidate offsets at a fixed step,
//! scores each by mean geodesic error over the overlapping window, and keeps
//! the minimum. Candidates with no usable overlap score infinite and rank
//! worst.

use crate::{Sample, SyncError, Trajectory};
use chrono::Duration;
use log::{debug, info, warn};

/// Configuration for [`find_offset`].
///
/// Offsets are applied to the REFERENCE clock: a probe sample at `t` is
/// compared against `reference.value_at(t + candidate)`.
#[derive(Debug, Clone, Copy)]
pub struct OffsetSearchConfig {
    /// Inclusive lower bound of the candidate offset range.
    pub min_offset: Duration,
    /// Exclusive upper bound of the candidate offset range.
    pub max_offset: Duration,
    /// Spacing between candidate offsets.
    pub search_step: Duration,
    /// Spacing between comparison instants when scoring one candidate.
    pub eval_step: Duration,
}

impl Default for OffsetSearchConfig {
    fn default() -> Self {
        Self {
            min_offset: Duration::seconds(-60),
            max_offset: Duration::seconds(60),
            search_step: Duration::milliseconds(100),
            eval_step: Duration::seconds(1),
        }
    }
}

/// Outcome of an offset search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OffsetEstimate {
    /// The selected clock shift.
    pub offset: Duration,
    /// Mean geodesic error at that shift, in kilometers. Infinite when no
    /// candidate had any overlap.
    pub mean_error_km: f64,
    /// How many candidate offsets were scored.
    pub candidates: usize,
}

/// Score one candidate offset: mean geodesic error (km) between the probe
/// walked at `step` and the reference shifted by `candidate_offset`.
///
/// Instants where either side has no value are skipped while warming up (the
/// shifted window has not reached the reference yet); once at least one point
/// has been accumulated, a renewed absence means the overlap window has ended
/// and the scan stops. A transient internal dropout therefore truncates the
/// estimate at the dropout — matching the original behavior, whose intent for
/// that case is undocumented.
///
/// Returns `f64::INFINITY` when no point was ever accumulated, ranking the
/// candidate worst.
///
/// # Panics
/// Panics if `step` is not positive.
pub fn mean_offset_error(
    reference: &Trajectory,
    probe: &Trajectory,
    candidate_offset: Duration,
    step: Duration,
) -> f64 {
    assert!(step > Duration::zero(), "evaluation step must be positive");
    let (Some(start), Some(end)) = (probe.start_time(), probe.end_time()) else {
        return f64::INFINITY;
    };

    let mut total_km = 0.0;
    let mut points: u32 = 0;
    let mut t = start;
    while t <= end {
        match (probe.value_at(t), reference.value_at(t + candidate_offset)) {
            (Some(probe_value), Some(ref_value)) => {
                total_km += Sample::distance_km(&probe_value, &ref_value);
                points += 1;
            }
            _ if points > 0 => break,
            _ => {}
        }
        t = t + step;
    }

    if points == 0 {
        f64::INFINITY
    } else {
        total_km / points as f64
    }
}

/// Scan `[min_offset, max_offset)` at `search_step` and return the offset
/// minimizing [`mean_offset_error`].
///
/// Ties go to the FIRST candidate achieving the minimum (ascending scan
/// order); later equal scores do not replace it. When every candidate scores
/// infinite the first candidate is returned, with `mean_error_km` infinite,
/// so the caller can detect the zero-overlap condition.
pub fn find_offset(
    reference: &Trajectory,
    probe: &Trajectory,
    config: &OffsetSearchConfig,
) -> Result<OffsetEstimate, SyncError> {
    if config.min_offset >= config.max_offset {
        return Err(SyncError::InvalidParameter(format!(
            "offset range is empty: {} >= {}",
            config.min_offset, config.max_offset
        )));
    }
    if config.search_step <= Duration::zero() || config.eval_step <= Duration::zero() {
        return Err(SyncError::InvalidParameter(
            "search and evaluation steps must be positive".to_string(),
        ));
    }

    info!(
        "[OffsetSearch] scanning offsets {} .. {} at {}",
        config.min_offset, config.max_offset, config.search_step
    );

    let mut best: Option<(Duration, f64)> = None;
    let mut candidates = 0usize;
    let mut candidate = config.min_offset;
    while candidate < config.max_offset {
        let error_km = mean_offset_error(reference, probe, candidate, config.eval_step);
        debug!("[OffsetSearch] offset {} -> {:.6} km", candidate, error_km);
        candidates += 1;

        // Strict comparison keeps the earliest minimum on ties.
        let improved = match best {
            Some((_, best_error)) => error_km < best_error,
            None => true,
        };
        if improved {
            best = Some((candidate, error_km));
        }

        candidate = candidate + config.search_step;
    }

    // The range was validated non-empty, so at least one candidate scored.
    let (offset, mean_error_km) = best.ok_or_else(|| {
        SyncError::InvalidParameter("offset range produced no candidates".to_string())
    })?;

    if mean_error_km.is_infinite() {
        warn!("[OffsetSearch] no candidate offset had usable overlap");
    } else {
        info!(
            "[OffsetSearch] selected offset {} with mean error {:.6} km ({} candidates)",
            offset, mean_error_km, candidates
        );
    }

    Ok(OffsetEstimate {
        offset,
        mean_error_km,
        candidates,
    })
}

// ============================================================================
// Tests
// ============================================================================
