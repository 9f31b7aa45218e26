//! # Device Contracts
//!
//! Types at the boundary between the core and its external collaborators:
//! the sensor-track decoder (FIT/GPX) and the video metadata provider
//! (ffprobe/exiftool). The core never parses those formats itself — decoders
//! hand over [`RawRecord`]s and [`LapMarker`]s, the video probe hands over a
//! [`VideoMetadata`].

use crate::Sample;
use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;

/// Scale factor from device-native fixed-point coordinates (semicircles) to
/// degrees: `2^31 / 180`, rounded the way the device firmware rounds it.
pub const COORD_SCALE: f64 = 11_930_465.0;

/// One decoded record as the sensor decoder produces it.
///
/// Positions arrive as fixed-point integers; [`RawRecord::into_sample`]
/// applies [`COORD_SCALE`] to reach degrees. Either component may be missing
/// (no GPS fix yet) and a record missing one loses both — a half-position is
/// useless for geodesic math.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RawRecord {
    pub timestamp: DateTime<Utc>,
    /// Fixed-point latitude (semicircles), if the device had a fix.
    pub position_lat: Option<i64>,
    /// Fixed-point longitude (semicircles), if the device had a fix.
    pub position_long: Option<i64>,
    /// Named device metrics (speed, power, heart_rate, ...).
    pub metrics: BTreeMap<String, f64>,
}

impl RawRecord {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            position_lat: None,
            position_long: None,
            metrics: BTreeMap::new(),
        }
    }

    /// Convert to a core [`Sample`], decoding the fixed-point position.
    pub fn into_sample(self) -> Sample {
        let (latitude, longitude) = match (self.position_lat, self.position_long) {
            (Some(lat), Some(lng)) => (
                Some(lat as f64 / COORD_SCALE),
                Some(lng as f64 / COORD_SCALE),
            ),
            _ => (None, None),
        };
        Sample {
            timestamp: self.timestamp,
            latitude,
            longitude,
            metrics: self.metrics,
        }
    }
}

/// What caused a lap boundary on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LapTrigger {
    /// The rider pressed the lap button — the only trigger precise enough to
    /// anchor on.
    Manual,
    /// Distance/position auto-lap.
    Auto,
    /// Anything else the decoder reports.
    Other,
}

/// A lap boundary recorded by the device.
///
/// Used only as an alignment anchor; lap markers take no part in the
/// interpolation machinery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LapMarker {
    pub trigger: LapTrigger,
    pub timestamp: DateTime<Utc>,
}

impl LapMarker {
    pub fn new(trigger: LapTrigger, timestamp: DateTime<Utc>) -> Self {
        Self { trigger, timestamp }
    }
}

/// Metadata the video prober extracts from the footage.
///
/// The core only uses this to size the render partitioner's time range and
/// frame step; it never reads video bytes.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VideoMetadata {
    /// Wall-clock instant the recording started (from the container's
    /// creation tag).
    pub start_time: DateTime<Utc>,
    pub duration: Duration,
    pub fps: f64,
    pub width: u32,
    pub height: u32,
}

impl VideoMetadata {
    pub fn end_time(&self) -> DateTime<Utc> {
        self.start_time + self.duration
    }

    /// Duration of a single frame.
    pub fn frame_period(&self) -> Duration {
        Duration::microseconds((1_000_000.0 / self.fps).round() as i64)
    }
}

// ============================================================================
// Tests
// ============================================================================
