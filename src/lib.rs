//! # Track Sync
//!
//! Time-alignment of GPS/sensor tracks with video footage for overlay rendering.
//!
//! This library provides:
//! - Gap-aware temporal interpolation of geotagged sensor samples
//! - Outlier-filtered trajectories with point-in-time queries
//! - Brute-force clock-offset search between two tracks of the same ride
//! - Anchor detection (motion onset, manual lap markers) for exact alignment
//! - Partitioning of a trajectory into per-worker slices for frame rendering
//!
//! ## Features
//!
//! - **`parallel`** - Render partitioned slices in parallel with rayon
//! - **`serde`** - Serde derives on the public data types
//!
//! ## Quick Start
//!
//! ```rust
//! use chrono::{Duration, TimeZone, Utc};
//! use track_sync::{Sample, Trajectory};
//!
//! let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();
//! let samples: Vec<Sample> = (0..10i64)
//!     .map(|i| Sample::positioned(t0 + Duration::seconds(i), 51.5074, -0.1278 + 0.0001 * i as f64))
//!     .collect();
//!
//! let track = Trajectory::new(samples);
//! let mid = track.value_at(t0 + Duration::milliseconds(1500)).unwrap();
//! assert_eq!(mid.timestamp, t0 + Duration::milliseconds(1500));
//! ```

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod align;
pub mod anchor;
pub mod device;
pub mod export;
pub mod geo_utils;
pub mod partition;
pub mod trajectory;

pub use align::{find_offset, mean_offset_error, OffsetEstimate, OffsetSearchConfig};
pub use anchor::{anchor_shift, first_motion, manual_lap, SearchWindow};
pub use device::{LapMarker, LapTrigger, RawRecord, VideoMetadata};
pub use export::write_csv;
pub use partition::{partition, render_partitions, RenderSlice};
pub use trajectory::Trajectory;

// ============================================================================
// Metric Names
// ============================================================================

/// Well-known metric field names carried by device samples.
///
/// The metric map is open: decoders may attach any named scalar, but these
/// are the names the overlay renderer and anchor detector look for.
pub mod metric {
    pub const SPEED: &str = "speed";
    pub const POWER: &str = "power";
    pub const HEART_RATE: &str = "heart_rate";
    pub const CADENCE: &str = "cadence";
    pub const ALTITUDE: &str = "altitude";
    pub const TEMPERATURE: &str = "temperature";
    pub const DISTANCE: &str = "distance";
}

// ============================================================================
// Errors
// ============================================================================

/// Errors surfaced by the alignment workflow.
///
/// No-data conditions (a query outside a trajectory's range, a candidate
/// offset with no overlap) are NOT errors; they come back as `None` or an
/// infinite mean error so callers can decide policy.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    /// No motion onset or manual lap was found inside the search window.
    /// Fatal: without an anchor there is no synchronization point.
    #[error("no motion onset or manual lap found between {window_start} and {window_end}")]
    AnchorNotFound {
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    },

    /// The trajectory has fewer than two usable samples.
    #[error("trajectory has fewer than two usable samples")]
    DegenerateTrajectory,

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

// ============================================================================
// Core Types
// ============================================================================

/// A single timestamped, optionally geolocated, optionally metric-bearing
/// data point.
///
/// Latitude and longitude are independently optional at the type level, but
/// a sample is only "positioned" when both are present; trajectory
/// construction drops everything else. Samples are immutable once built —
/// interpolation always constructs new values.
///
/// # Example
/// ```
/// use chrono::Utc;
/// use track_sync::{metric, Sample};
///
/// let point = Sample::positioned(Utc::now(), 51.5074, -0.1278)
///     .with_metric(metric::SPEED, 6.2);
/// assert!(point.has_position());
/// assert_eq!(point.metric(metric::SPEED), Some(6.2));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    /// Open set of named scalar fields (speed, power, heart_rate, ...).
    pub metrics: BTreeMap<String, f64>,
}

impl Sample {
    /// Create a sample with no position and no metrics.
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            latitude: None,
            longitude: None,
            metrics: BTreeMap::new(),
        }
    }

    /// Create a positioned sample.
    pub fn positioned(timestamp: DateTime<Utc>, latitude: f64, longitude: f64) -> Self {
        Self {
            timestamp,
            latitude: Some(latitude),
            longitude: Some(longitude),
            metrics: BTreeMap::new(),
        }
    }

    /// Attach a named metric (builder style).
    pub fn with_metric(mut self, name: &str, value: f64) -> Self {
        self.metrics.insert(name.to_string(), value);
        self
    }

    /// Look up a named metric.
    pub fn metric(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    /// Whether both latitude and longitude are present.
    pub fn has_position(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some()
    }

    /// The (latitude, longitude) pair, if both are present.
    pub fn position(&self) -> Option<(f64, f64)> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lng)) => Some((lat, lng)),
            _ => None,
        }
    }

    /// Linearly interpolate between `self` and `other`.
    ///
    /// `weight_other` is the weight given to `other`; 0.0 reproduces `self`,
    /// 1.0 reproduces `other`. The timestamp is interpolated on the epoch
    /// microsecond axis, position componentwise, and every metric present on
    /// BOTH sides pairwise. Metrics missing on either side are dropped from
    /// the result.
    ///
    /// # Panics
    /// Panics if `weight_other` is outside `[0, 1]` — that is a caller bug,
    /// not a data condition.
    pub fn weighted_average(&self, other: &Sample, weight_other: f64) -> Sample {
        assert!(
            (0.0..=1.0).contains(&weight_other),
            "interpolation weight must be within [0, 1], got {weight_other}"
        );
        let weight_self = 1.0 - weight_other;

        let span_us = (other.timestamp - self.timestamp)
            .num_microseconds()
            .unwrap_or(0);
        let timestamp =
            self.timestamp + Duration::microseconds((span_us as f64 * weight_other).round() as i64);

        let mut metrics = BTreeMap::new();
        for (name, a) in &self.metrics {
            if let Some(b) = other.metrics.get(name) {
                metrics.insert(name.clone(), a * weight_self + b * weight_other);
            }
        }

        Sample {
            timestamp,
            latitude: geo_utils::lerp_opt(self.latitude, other.latitude, weight_other),
            longitude: geo_utils::lerp_opt(self.longitude, other.longitude, weight_other),
            metrics,
        }
    }

    /// Great-circle distance between two positioned samples, in kilometers.
    ///
    /// # Panics
    /// Panics if either sample has no position. Callers must only invoke
    /// this on samples known to carry valid positions (trajectory filtering
    /// guarantees that for retained samples).
    pub fn distance_km(a: &Sample, b: &Sample) -> f64 {
        let (lat1, lng1) = a
            .position()
            .expect("distance_km requires a positioned sample");
        let (lat2, lng2) = b
            .position()
            .expect("distance_km requires a positioned sample");
        geo_utils::haversine_km(lat1, lng1, lat2, lng2)
    }

    /// Return a copy of this sample with its timestamp replaced.
    ///
    /// Used by the gap-freeze path of `Trajectory::value_at`: the values are
    /// held from a neighboring sample but the caller always gets back exactly
    /// the instant it asked for.
    pub fn at_time(&self, timestamp: DateTime<Utc>) -> Sample {
        Sample {
            timestamp,
            ..self.clone()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
