//! # Anchor Detection
//!
//! Locates a precise synchronization instant inside an approximate search
//! window, turning a coarse user-supplied event time ("the video starts
//! moving about 12 s in") into an exact clock shift.
//!
//! Two interchangeable strategies:
//! - **first motion**: the first stationary-to-moving transition in the
//!   device track;
//! - **manual lap**: the first rider-pressed lap marker.

use crate::device::{LapMarker, LapTrigger};
use crate::{metric, Sample, SyncError, Trajectory};
use chrono::{DateTime, Duration, Utc};
use log::{debug, info};

/// Speeds at or below this are "stationary". Near-zero rather than zero so a
/// GPS-drift crawl does not count as motion onset.
pub const MOTION_SPEED_THRESHOLD: f64 = 1e-4;

/// An approximate time window to search for an anchor event.
///
/// Containment is STRICT on both ends: events sitting exactly on a bound are
/// not considered inside.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SearchWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl SearchWindow {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Build a window around an approximate event time from relative bounds
    /// (e.g. `-5 s .. +5 s` around "about 12 s into the video").
    pub fn around(event: DateTime<Utc>, before: Duration, after: Duration) -> Self {
        Self {
            start: event + before,
            end: event + after,
        }
    }

    pub fn contains(&self, time: DateTime<Utc>) -> bool {
        self.start < time && time < self.end
    }
}

/// Find the first stationary-to-moving transition inside the window.
///
/// Scans consecutive retained sample pairs (a, b) with both timestamps
/// strictly inside the window; returns the first `b` whose speed is present
/// and above [`MOTION_SPEED_THRESHOLD`] while `a`'s speed is absent or below
/// it. Returns `None` when no such transition exists in the window.
pub fn first_motion(trajectory: &Trajectory, window: &SearchWindow) -> Option<Sample> {
    for pair in trajectory.samples().windows(2) {
        let (a, b) = (&pair[0], &pair[1]);
        if !window.contains(a.timestamp) || !window.contains(b.timestamp) {
            continue;
        }
        let a_still = a
            .metric(metric::SPEED)
            .map_or(true, |v| v < MOTION_SPEED_THRESHOLD);
        let b_moving = b
            .metric(metric::SPEED)
            .map_or(false, |v| v > MOTION_SPEED_THRESHOLD);
        if a_still && b_moving {
            debug!("[Anchor] first motion at {}", b.timestamp);
            return Some(b.clone());
        }
    }
    None
}

/// Find the first manually-triggered lap marker strictly inside the window.
///
/// Auto-laps are ignored: only a rider-pressed button marks an instant the
/// rider can also identify in the footage.
pub fn manual_lap<'a>(laps: &'a [LapMarker], window: &SearchWindow) -> Option<&'a LapMarker> {
    laps.iter()
        .find(|lap| lap.trigger == LapTrigger::Manual && window.contains(lap.timestamp))
}

/// Compute the exact clock shift from an anchor event.
///
/// Tries first-motion detection, then falls back to a manual lap from the
/// trajectory's recorded markers. The shift is
/// `anchor_time - probe_event_time`: add it to probe-clock instants to land
/// on the reference (device) clock.
///
/// A missing anchor is fatal to the alignment workflow — the error names the
/// window that was searched so the user can widen or move it.
pub fn anchor_shift(
    trajectory: &Trajectory,
    window: &SearchWindow,
    probe_event_time: DateTime<Utc>,
) -> Result<Duration, SyncError> {
    info!(
        "[Anchor] searching for anchor between {} and {}",
        window.start, window.end
    );

    let anchor_time = first_motion(trajectory, window)
        .map(|sample| sample.timestamp)
        .or_else(|| manual_lap(trajectory.laps(), window).map(|lap| lap.timestamp))
        .ok_or(SyncError::AnchorNotFound {
            window_start: window.start,
            window_end: window.end,
        })?;

    info!(
        "[Anchor] anchor at {}, probe event at {}",
        anchor_time, probe_event_time
    );
    Ok(anchor_time - probe_event_time)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    /// Stationary for samples 0..=4, moving from sample 5 on.
    fn standing_start_track() -> Trajectory {
        Trajectory::new(
            (0..10i64)
                .map(|i| {
                    let speed = if i < 5 { 0.0 } else { 5.0 };
                    Sample::positioned(
                        t0() + Duration::seconds(i),
                        51.5074,
                        -0.1278 + 0.00005 * i.max(5) as f64,
                    )
                    .with_metric(metric::SPEED, speed)
                })
                .collect(),
        )
    }

    fn wide_window() -> SearchWindow {
        SearchWindow::new(t0() - Duration::seconds(1), t0() + Duration::seconds(10))
    }

    #[test]
    fn test_first_motion_finds_transition() {
        let track = standing_start_track();
        let onset = first_motion(&track, &wide_window()).unwrap();
        assert_eq!(onset.timestamp, t0() + Duration::seconds(5));
    }

    #[test]
    fn test_first_motion_absent_speed_counts_as_stationary() {
        let samples: Vec<Sample> = (0..6i64)
            .map(|i| {
                let mut s = Sample::positioned(t0() + Duration::seconds(i), 51.5074, -0.1278);
                if i >= 3 {
                    s = s.with_metric(metric::SPEED, 4.0);
                }
                s
            })
            .collect();
        let track = Trajectory::new(samples);

        let onset = first_motion(&track, &wide_window()).unwrap();
        assert_eq!(onset.timestamp, t0() + Duration::seconds(3));
    }

    #[test]
    fn test_first_motion_respects_strict_window() {
        let track = standing_start_track();
        // Window ends exactly at the onset sample; strictly-inside means the
        // transition is not visible.
        let window = SearchWindow::new(t0(), t0() + Duration::seconds(5));
        assert_eq!(first_motion(&track, &window), None);
    }

    #[test]
    fn test_first_motion_none_when_always_moving() {
        let samples: Vec<Sample> = (0..5i64)
            .map(|i| {
                Sample::positioned(t0() + Duration::seconds(i), 51.5074, -0.1278)
                    .with_metric(metric::SPEED, 6.0)
            })
            .collect();
        let track = Trajectory::new(samples);
        assert_eq!(first_motion(&track, &wide_window()), None);
    }

    #[test]
    fn test_manual_lap_skips_auto_laps() {
        let laps = vec![
            LapMarker::new(LapTrigger::Auto, t0() + Duration::seconds(2)),
            LapMarker::new(LapTrigger::Manual, t0() + Duration::seconds(5)),
            LapMarker::new(LapTrigger::Manual, t0() + Duration::seconds(8)),
        ];
        let window = wide_window();
        let lap = manual_lap(&laps, &window).unwrap();
        assert_eq!(lap.timestamp, t0() + Duration::seconds(5));
    }

    #[test]
    fn test_manual_lap_none_outside_window() {
        let laps = vec![LapMarker::new(
            LapTrigger::Manual,
            t0() + Duration::seconds(30),
        )];
        assert_eq!(manual_lap(&laps, &wide_window()), None);
    }

    #[test]
    fn test_anchor_shift_from_first_motion() {
        let track = standing_start_track();
        // The rider reports first motion ~3 s into the video; video starts
        // 2 s after the device clock's t0.
        let probe_event = t0() + Duration::seconds(2) + Duration::seconds(3);
        let shift = anchor_shift(&track, &wide_window(), probe_event).unwrap();
        // Device onset at t0+5s, probe event at t0+5s: clocks agree.
        assert_eq!(shift, Duration::zero());
    }

    #[test]
    fn test_anchor_shift_falls_back_to_manual_lap() {
        let samples: Vec<Sample> = (0..10i64)
            .map(|i| {
                Sample::positioned(t0() + Duration::seconds(i), 51.5074, -0.1278)
                    .with_metric(metric::SPEED, 6.0)
            })
            .collect();
        let laps = vec![LapMarker::new(
            LapTrigger::Manual,
            t0() + Duration::seconds(4),
        )];
        let track = Trajectory::with_laps(samples, laps);

        let probe_event = t0() + Duration::seconds(1);
        let shift = anchor_shift(&track, &wide_window(), probe_event).unwrap();
        assert_eq!(shift, Duration::seconds(3));
    }

    #[test]
    fn test_anchor_shift_error_names_window() {
        let samples: Vec<Sample> = (0..5i64)
            .map(|i| {
                Sample::positioned(t0() + Duration::seconds(i), 51.5074, -0.1278)
                    .with_metric(metric::SPEED, 6.0)
            })
            .collect();
        let track = Trajectory::new(samples);
        let window = wide_window();

        let err = anchor_shift(&track, &window, t0()).unwrap_err();
        assert_eq!(
            err,
            SyncError::AnchorNotFound {
                window_start: window.start,
                window_end: window.end,
            }
        );
        assert!(err.to_string().contains("2024-06-01"));
    }
}
