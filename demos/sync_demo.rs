//! End-to-end alignment walkthrough on synthetic data.
//!
//! Run with: cargo run --example sync_demo

use chrono::{Duration, TimeZone, Utc};
use track_sync::{
    anchor_shift, find_offset, metric, partition, render_partitions, OffsetSearchConfig, Sample,
    SearchWindow, Trajectory, VideoMetadata,
};

fn main() {
    env_logger::init();

    let device_t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

    // Synthetic device track: stationary for 5 s at a red light, then rolling
    // east at ~5 m/s for a minute.
    let device_samples: Vec<Sample> = (0..65i64)
        .map(|i| {
            let moving = i >= 5;
            let travelled = if moving { (i - 5) as f64 } else { 0.0 };
            Sample::positioned(
                device_t0 + Duration::seconds(i),
                51.5074,
                -0.1278 + 0.000072 * travelled,
            )
            .with_metric(metric::SPEED, if moving { 5.0 } else { 0.0 })
            .with_metric(metric::POWER, if moving { 210.0 } else { 0.0 })
        })
        .collect();
    let device_track = Trajectory::new(device_samples);

    // The camera clock runs 3.2 s early relative to the device.
    let camera_t0 = device_t0 - Duration::milliseconds(3200);
    let video = VideoMetadata {
        start_time: camera_t0,
        duration: Duration::seconds(60),
        fps: 30.0,
        width: 3840,
        height: 2160,
    };

    // Camera GPS track on the camera clock, same physical ride.
    let camera_samples: Vec<Sample> = (0..65i64)
        .map(|i| {
            let travelled = if i >= 5 { (i - 5) as f64 } else { 0.0 };
            Sample::positioned(
                camera_t0 + Duration::seconds(i),
                51.5074,
                -0.1278 + 0.000072 * travelled,
            )
        })
        .collect();
    let camera_track = Trajectory::new(camera_samples);

    // 1. Brute-force offset search between the two tracks.
    let config = OffsetSearchConfig {
        min_offset: Duration::seconds(-10),
        max_offset: Duration::seconds(10),
        search_step: Duration::milliseconds(100),
        eval_step: Duration::milliseconds(500),
    };
    let estimate = find_offset(&device_track, &camera_track, &config).unwrap();
    println!(
        "Offset search: shift reference by {} (mean error {:.4} km over {} candidates)",
        estimate.offset, estimate.mean_error_km, estimate.candidates
    );

    // 2. Anchor detection: the rider sees first motion ~5 s into the footage.
    let approx_event = video.start_time + Duration::seconds(5);
    let window = SearchWindow::around(approx_event, Duration::seconds(-5), Duration::seconds(5));
    let shift = anchor_shift(&device_track, &window, approx_event).unwrap();
    println!("Anchor shift: {shift}");

    // 3. Partition the aligned range and "render" it.
    let render_start = video.start_time + shift;
    let slices = partition(
        &device_track,
        render_start,
        video.duration,
        4,
        video.frame_period(),
    )
    .unwrap();

    render_partitions(slices, video.frame_period(), |worker, frame, sample| {
        if frame == 0 {
            println!(
                "worker {worker} frame {frame}: lng={:.5} speed={:?}",
                sample.longitude.unwrap_or_default(),
                sample.metric(metric::SPEED)
            );
        }
    });
}
