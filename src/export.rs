//! Diagnostic CSV export.
//!
//! Dumps a trajectory for eyeballing in a spreadsheet or plotting tool when
//! an alignment looks off. Not part of the alignment pipeline.

use crate::{metric, Trajectory};
use std::io::Write;

/// Write one CSV row per retained sample: integer epoch seconds, latitude,
/// longitude, speed. The speed column is left empty for samples without a
/// speed metric (video-derived tracks carry none).
pub fn write_csv<W: Write>(trajectory: &Trajectory, writer: &mut W) -> std::io::Result<()> {
    for sample in trajectory.samples() {
        // Retained samples are always positioned.
        let (Some(lat), Some(lng)) = (sample.latitude, sample.longitude) else {
            continue;
        };
        match sample.metric(metric::SPEED) {
            Some(speed) => writeln!(
                writer,
                "{},{},{},{}",
                sample.timestamp.timestamp(),
                lat,
                lng,
                speed
            )?,
            None => writeln!(writer, "{},{},{},", sample.timestamp.timestamp(), lat, lng)?,
        }
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Sample;
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap()
    }

    #[test]
    fn test_write_csv_rows() {
        let track = Trajectory::new(vec![
            Sample::positioned(t0(), 51.5, -0.125).with_metric(metric::SPEED, 6.5),
            Sample::positioned(t0() + Duration::seconds(1), 51.5001, -0.125),
        ]);

        let mut out = Vec::new();
        write_csv(&track, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 2);
        let epoch = t0().timestamp();
        assert_eq!(lines[0], format!("{epoch},51.5,-0.125,6.5"));
        // No speed metric: empty trailing column
        assert_eq!(lines[1], format!("{},51.5001,-0.125,", epoch + 1));
    }

    #[test]
    fn test_write_csv_empty_trajectory() {
        let track = Trajectory::new(vec![]);
        let mut out = Vec::new();
        write_csv(&track, &mut out).unwrap();
        assert!(out.is_empty());
    }
}
