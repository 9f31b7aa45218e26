//! # Render Partitioner
//!
//! Splits an aligned trajectory's time range into N contiguous sub-ranges so
//! an external frame renderer can consume them in parallel. Each worker gets
//! an independently-owned, read-only trajectory slice resampled at the frame
//! period; nothing is shared between workers, so there is no locking and no
//! ordering requirement — frames are keyed by worker index and frame counter
//! and merged externally by name.

use crate::{Sample, SyncError, Trajectory};
use chrono::{DateTime, Duration, Utc};
use log::info;

/// One worker's share of the render range.
#[derive(Debug, Clone)]
pub struct RenderSlice {
    /// Index of the worker this slice belongs to (0-based).
    pub worker: usize,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// The sub-trajectory covering `[start, end]`, resampled at the frame
    /// period. Its query cache is local to this slice.
    pub trajectory: Trajectory,
}

/// Split `[start, start + duration]` into `workers` contiguous slices.
///
/// Worker `i` receives `[start + i·sub_length, start + (i+1)·sub_length]`
/// with `sub_length = duration / workers`, resampled at `frame_period` via
/// [`Trajectory::sub_trajectory`].
///
/// The range is expected to lie inside the trajectory (the caller derived it
/// from this trajectory's own data plus the video duration); portions
/// falling outside simply produce shorter or empty slices.
pub fn partition(
    trajectory: &Trajectory,
    start: DateTime<Utc>,
    duration: Duration,
    workers: usize,
    frame_period: Duration,
) -> Result<Vec<RenderSlice>, SyncError> {
    if workers == 0 {
        return Err(SyncError::InvalidParameter(
            "worker count must be at least 1".to_string(),
        ));
    }
    if duration <= Duration::zero() {
        return Err(SyncError::InvalidParameter(
            "render duration must be positive".to_string(),
        ));
    }
    if frame_period <= Duration::zero() {
        return Err(SyncError::InvalidParameter(
            "frame period must be positive".to_string(),
        ));
    }
    if trajectory.len() < 2 {
        return Err(SyncError::DegenerateTrajectory);
    }

    let sub_length = duration / workers as i32;
    let slices: Vec<RenderSlice> = (0..workers)
        .map(|i| {
            let slice_start = start + sub_length * i as i32;
            let slice_end = start + sub_length * (i + 1) as i32;
            RenderSlice {
                worker: i,
                start: slice_start,
                end: slice_end,
                trajectory: trajectory.sub_trajectory(slice_start, slice_end, frame_period),
            }
        })
        .collect();

    info!(
        "[Partition] split {} of footage into {} slices of {}",
        duration, workers, sub_length
    );
    Ok(slices)
}

/// Drive the renderer over every slice.
///
/// Each slice is walked end-to-end at `frame_period`; `render_fn` is called
/// with the worker index, the worker-local frame counter, and the sample at
/// that frame instant. With the `parallel` feature the slices run on the
/// rayon pool, one worker per slice, otherwise sequentially; either way each
/// worker owns its slice outright.
pub fn render_partitions<F>(slices: Vec<RenderSlice>, frame_period: Duration, render_fn: F)
where
    F: Fn(usize, usize, &Sample) + Send + Sync,
{
    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        slices
            .into_par_iter()
            .for_each(|slice| render_slice(&slice, frame_period, &render_fn));
    }

    #[cfg(not(feature = "parallel"))]
    {
        for slice in slices {
            render_slice(&slice, frame_period, &render_fn);
        }
    }
}

fn render_slice<F>(slice: &RenderSlice, frame_period: Duration, render_fn: &F)
where
    F: Fn(usize, usize, &Sample),
{
    for (frame, sample) in slice.trajectory.iter_at(frame_period).enumerate() {
        render_fn(slice.worker, frame, &sample);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Mutex;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    /// 1 Hz track, one minute long.
    fn minute_track() -> Trajectory {
        Trajectory::new(
            (0..61i64)
                .map(|i| {
                    Sample::positioned(
                        t0() + Duration::seconds(i),
                        51.5074,
                        -0.1278 + 0.00005 * i as f64,
                    )
                })
                .collect(),
        )
    }

    #[test]
    fn test_partition_is_contiguous() {
        let track = minute_track();
        let slices = partition(
            &track,
            t0(),
            Duration::seconds(40),
            4,
            Duration::milliseconds(500),
        )
        .unwrap();

        assert_eq!(slices.len(), 4);
        for (i, slice) in slices.iter().enumerate() {
            assert_eq!(slice.worker, i);
            assert_eq!(slice.start, t0() + Duration::seconds(10 * i as i64));
            assert_eq!(slice.end, t0() + Duration::seconds(10 * (i as i64 + 1)));
        }
        // Consecutive slices share exactly their boundary instant.
        for pair in slices.windows(2) {
            assert_eq!(pair[0].end, pair[1].start);
        }
    }

    #[test]
    fn test_partition_slices_are_resampled() {
        let track = minute_track();
        let slices = partition(
            &track,
            t0() + Duration::seconds(5),
            Duration::seconds(20),
            2,
            Duration::milliseconds(500),
        )
        .unwrap();

        for slice in &slices {
            assert_eq!(slice.trajectory.start_time(), Some(slice.start));
            assert!(slice.trajectory.end_time().unwrap() <= slice.end);
            // 10 s at 0.5 s, endpoints inclusive
            assert_eq!(slice.trajectory.len(), 21);
        }
    }

    #[test]
    fn test_partition_rejects_bad_parameters() {
        let track = minute_track();
        assert!(matches!(
            partition(&track, t0(), Duration::seconds(10), 0, Duration::seconds(1)),
            Err(SyncError::InvalidParameter(_))
        ));
        assert!(matches!(
            partition(&track, t0(), Duration::zero(), 2, Duration::seconds(1)),
            Err(SyncError::InvalidParameter(_))
        ));
        assert!(matches!(
            partition(&track, t0(), Duration::seconds(10), 2, Duration::zero()),
            Err(SyncError::InvalidParameter(_))
        ));
    }

    #[test]
    fn test_partition_degenerate_trajectory() {
        let track = Trajectory::new(vec![]);
        assert!(matches!(
            partition(&track, t0(), Duration::seconds(10), 2, Duration::seconds(1)),
            Err(SyncError::DegenerateTrajectory)
        ));
    }

    #[test]
    fn test_render_partitions_visits_every_frame() {
        let track = minute_track();
        let frame_period = Duration::milliseconds(500);
        let slices = partition(&track, t0(), Duration::seconds(30), 3, frame_period).unwrap();

        let frames: Mutex<Vec<(usize, usize)>> = Mutex::new(Vec::new());
        render_partitions(slices, frame_period, |worker, frame, sample| {
            assert!(sample.has_position());
            frames.lock().unwrap().push((worker, frame));
        });

        let mut frames = frames.into_inner().unwrap();
        frames.sort_unstable();
        // Each 10 s slice yields 21 frames at 0.5 s (endpoints inclusive).
        assert_eq!(frames.len(), 63);
        for worker in 0..3 {
            let count = frames.iter().filter(|(w, _)| *w == worker).count();
            assert_eq!(count, 21);
        }
        // Frame counters are worker-local and dense from zero.
        assert!(frames.contains(&(0, 0)));
        assert!(frames.contains(&(2, 20)));
    }
}
