//! Calibratable detector parameters.
//!
//! # Invariants
//! - A `DetectorConfig` handed to `FallDetector` has passed `validate()`.
//!
//! The default numbers are field heuristics carried over from the mobile
//! app. They have no documented calibration and need real-device tuning
//! before any safety claim is made on top of them.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const DEFAULT_IMPACT_THRESHOLD_G: f64 = 2.5;
pub const DEFAULT_ABORT_THRESHOLD_G: f64 = 4.0;
pub const DEFAULT_STILLNESS_THRESHOLD_G: f64 = 1.2;
pub const DEFAULT_GRACE_PERIOD_MS: u64 = 500;
pub const DEFAULT_STILLNESS_DURATION_MS: u64 = 2_000;
pub const DEFAULT_MAX_WINDOW_MS: u64 = 10_000;
pub const DEFAULT_SPIKE_WINDOW: usize = 1;
pub const DEFAULT_STILLNESS_WINDOW: usize = 5;
pub const DEFAULT_BUFFER_CAPACITY: usize = 32;

/// Thresholds and time windows of the fall state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Spike measure above this opens a detection cycle.
    pub impact_threshold_g: f64,
    /// Spike measure above this while monitoring means the person is mobile.
    pub abort_threshold_g: f64,
    /// Stillness measure below this counts as "at rest".
    pub stillness_threshold_g: f64,
    /// Settling delay after impact before stillness is evaluated.
    pub grace_period_ms: u64,
    /// Continuous stillness required to confirm a fall.
    pub stillness_duration_ms: u64,
    /// Cycle timeout measured from the impact.
    pub max_window_ms: u64,
    /// Samples averaged for the impact/abort comparison.
    pub spike_window: usize,
    /// Samples averaged for the stillness comparison.
    pub stillness_window: usize,
    pub buffer_capacity: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            impact_threshold_g: DEFAULT_IMPACT_THRESHOLD_G,
            abort_threshold_g: DEFAULT_ABORT_THRESHOLD_G,
            stillness_threshold_g: DEFAULT_STILLNESS_THRESHOLD_G,
            grace_period_ms: DEFAULT_GRACE_PERIOD_MS,
            stillness_duration_ms: DEFAULT_STILLNESS_DURATION_MS,
            max_window_ms: DEFAULT_MAX_WINDOW_MS,
            spike_window: DEFAULT_SPIKE_WINDOW,
            stillness_window: DEFAULT_STILLNESS_WINDOW,
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
        }
    }
}

impl DetectorConfig {
    /// Checks internal consistency of thresholds and windows.
    ///
    /// # Errors
    /// - `NonPositiveThreshold` for any threshold that is not a positive
    ///   finite number.
    /// - `AbortNotAboveImpact` when abort <= impact.
    /// - `StillnessAboveImpact` when stillness > impact.
    /// - `InvalidWindow` for zero windows or windows exceeding the buffer.
    /// - `ZeroStillnessDuration` when no stillness time is required.
    /// - `MaxWindowTooShort` when the timeout cannot fit grace + stillness.
    pub fn validate(&self) -> Result<(), DetectorConfigError> {
        for (name, value) in [
            ("impact_threshold_g", self.impact_threshold_g),
            ("abort_threshold_g", self.abort_threshold_g),
            ("stillness_threshold_g", self.stillness_threshold_g),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(DetectorConfigError::NonPositiveThreshold(name));
            }
        }

        if self.abort_threshold_g <= self.impact_threshold_g {
            return Err(DetectorConfigError::AbortNotAboveImpact {
                impact: self.impact_threshold_g,
                abort: self.abort_threshold_g,
            });
        }
        if self.stillness_threshold_g > self.impact_threshold_g {
            return Err(DetectorConfigError::StillnessAboveImpact {
                impact: self.impact_threshold_g,
                stillness: self.stillness_threshold_g,
            });
        }

        for (name, window) in [
            ("spike_window", self.spike_window),
            ("stillness_window", self.stillness_window),
        ] {
            if window == 0 || window > self.buffer_capacity {
                return Err(DetectorConfigError::InvalidWindow {
                    name,
                    window,
                    capacity: self.buffer_capacity,
                });
            }
        }

        if self.stillness_duration_ms == 0 {
            return Err(DetectorConfigError::ZeroStillnessDuration);
        }

        let minimum = self.grace_period_ms.saturating_add(self.stillness_duration_ms);
        if self.max_window_ms <= minimum {
            return Err(DetectorConfigError::MaxWindowTooShort {
                max_window_ms: self.max_window_ms,
                minimum_ms: minimum,
            });
        }

        Ok(())
    }
}

/// Detector configuration errors.
#[derive(Debug, Clone, PartialEq)]
pub enum DetectorConfigError {
    NonPositiveThreshold(&'static str),
    AbortNotAboveImpact { impact: f64, abort: f64 },
    StillnessAboveImpact { impact: f64, stillness: f64 },
    InvalidWindow {
        name: &'static str,
        window: usize,
        capacity: usize,
    },
    ZeroStillnessDuration,
    MaxWindowTooShort { max_window_ms: u64, minimum_ms: u64 },
}

impl Display for DetectorConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NonPositiveThreshold(name) => {
                write!(f, "{name} must be a positive finite number")
            }
            Self::AbortNotAboveImpact { impact, abort } => write!(
                f,
                "abort threshold {abort} must be greater than impact threshold {impact}"
            ),
            Self::StillnessAboveImpact { impact, stillness } => write!(
                f,
                "stillness threshold {stillness} must not exceed impact threshold {impact}"
            ),
            Self::InvalidWindow {
                name,
                window,
                capacity,
            } => write!(
                f,
                "{name} of {window} samples must be within 1..={capacity}"
            ),
            Self::ZeroStillnessDuration => write!(f, "stillness duration must be positive"),
            Self::MaxWindowTooShort {
                max_window_ms,
                minimum_ms,
            } => write!(
                f,
                "max window {max_window_ms}ms must exceed grace + stillness ({minimum_ms}ms)"
            ),
        }
    }
}

impl Error for DetectorConfigError {}
