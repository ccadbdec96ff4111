//! Accelerometer sample model.
//!
//! # Invariants
//! - Axis values are expressed in g-units (1.0 == standard gravity).
//! - `t` is a monotonic millisecond timestamp supplied by the platform.

use serde::{Deserialize, Serialize};

/// One raw accelerometer reading as delivered by the platform stream.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccelerationSample {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Monotonic timestamp in milliseconds.
    #[serde(rename = "t")]
    pub timestamp_ms: u64,
}

impl AccelerationSample {
    pub fn new(x: f64, y: f64, z: f64, timestamp_ms: u64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp_ms,
        }
    }

    /// Euclidean norm of the three axes, in g.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }

    /// Returns whether every axis carries a finite value.
    ///
    /// Platforms occasionally emit NaN while the sensor warms up; such
    /// readings are skipped, never interpreted.
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }
}

/// Magnitude derived from one sample, as republished by the sampler.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeReading {
    pub magnitude: f64,
    pub timestamp_ms: u64,
}

impl MagnitudeReading {
    pub fn new(magnitude: f64, timestamp_ms: u64) -> Self {
        Self {
            magnitude,
            timestamp_ms,
        }
    }
}

impl From<&AccelerationSample> for MagnitudeReading {
    fn from(sample: &AccelerationSample) -> Self {
        Self::new(sample.magnitude(), sample.timestamp_ms)
    }
}
