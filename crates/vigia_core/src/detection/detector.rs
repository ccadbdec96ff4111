//! Stateful fall detector wrapping the pure state machine.
//!
//! # Responsibility
//! - Own the magnitude buffer and the single `FallDetectionState`.
//! - Filter malformed readings before they reach the state machine.
//! - Honour the enabled flag: disabling discards the in-flight cycle.
//!
//! # Invariants
//! - A disabled detector never changes state and never emits events.
//! - While `Confirmed`, readings are ignored until `reset()`.

use crate::detection::buffer::MagnitudeBuffer;
use crate::detection::config::{DetectorConfig, DetectorConfigError};
use crate::detection::machine::{
    advance, AbortReason, FallDetectionState, FallPhase, SignalMeasures, StepOutcome,
};
use crate::model::sample::MagnitudeReading;
use log::{debug, info};

/// Event emitted by the detector for one processed reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DetectorEvent {
    ImpactDetected { at_ms: u64, magnitude: f64 },
    MonitoringStarted { at_ms: u64 },
    Aborted { reason: AbortReason, at_ms: u64 },
    FallConfirmed { impact_at_ms: u64, confirmed_at_ms: u64 },
}

/// Fall detector fed with magnitude readings.
#[derive(Debug, Clone)]
pub struct FallDetector {
    config: DetectorConfig,
    buffer: MagnitudeBuffer,
    state: FallDetectionState,
    enabled: bool,
    last_timestamp_ms: Option<u64>,
}

impl FallDetector {
    /// Creates a disabled detector after validating `config`.
    pub fn new(config: DetectorConfig) -> Result<Self, DetectorConfigError> {
        config.validate()?;
        Ok(Self {
            buffer: MagnitudeBuffer::with_capacity(config.buffer_capacity),
            config,
            state: FallDetectionState::idle(),
            enabled: false,
            last_timestamp_ms: None,
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn state(&self) -> &FallDetectionState {
        &self.state
    }

    pub fn phase(&self) -> FallPhase {
        self.state.phase
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns whether the detector is waiting for an alert to resolve.
    pub fn is_suspended(&self) -> bool {
        self.state.phase == FallPhase::Confirmed
    }

    /// Turns detection on or off.
    ///
    /// Turning it off drops any in-flight cycle and buffered readings so no
    /// stale confirmation can fire once it is turned back on.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled == enabled {
            return;
        }
        self.enabled = enabled;
        if !enabled {
            self.reset();
        }
        info!(
            "event=detector_toggle module=detection status=ok enabled={}",
            enabled
        );
    }

    /// Returns to armed `Idle` and clears buffered readings.
    pub fn reset(&mut self) {
        let previous = self.state.phase;
        self.state = FallDetectionState::idle();
        self.buffer.clear();
        self.last_timestamp_ms = None;
        if previous != FallPhase::Idle {
            info!(
                "event=detector_reset module=detection status=ok from={}",
                previous.as_str()
            );
        }
    }

    /// Processes one reading; returns the event it produced, if any.
    ///
    /// Readings are skipped without error when the detector is disabled or
    /// suspended, when the magnitude is not a finite non-negative number, or
    /// when the timestamp goes backwards.
    pub fn ingest(&mut self, reading: MagnitudeReading) -> Option<DetectorEvent> {
        if !self.enabled || self.is_suspended() {
            return None;
        }
        if !reading.magnitude.is_finite() || reading.magnitude < 0.0 {
            debug!("event=sample_skipped module=detection reason=non_finite");
            return None;
        }
        if let Some(last) = self.last_timestamp_ms {
            if reading.timestamp_ms < last {
                debug!(
                    "event=sample_skipped module=detection reason=out_of_order t={} last={}",
                    reading.timestamp_ms, last
                );
                return None;
            }
        }
        self.last_timestamp_ms = Some(reading.timestamp_ms);
        self.buffer.push(reading.magnitude);

        let measures = self.measures()?;
        let (next, outcome) = advance(&self.state, measures, reading.timestamp_ms, &self.config);
        let event = self.event_for(outcome, &next, reading);
        if next.phase != self.state.phase {
            debug!(
                "event=fall_state module=detection from={} to={} t={}",
                self.state.phase.as_str(),
                next.phase.as_str(),
                reading.timestamp_ms
            );
        }
        self.state = next;
        event
    }

    fn measures(&self) -> Option<SignalMeasures> {
        Some(SignalMeasures {
            spike_g: self.buffer.recent_mean(self.config.spike_window)?,
            stillness_g: self.buffer.recent_mean(self.config.stillness_window)?,
        })
    }

    fn event_for(
        &self,
        outcome: StepOutcome,
        next: &FallDetectionState,
        reading: MagnitudeReading,
    ) -> Option<DetectorEvent> {
        let at_ms = reading.timestamp_ms;
        match outcome {
            StepOutcome::None => None,
            StepOutcome::ImpactDetected => {
                info!(
                    "event=impact_detected module=detection magnitude={:.2} t={}",
                    reading.magnitude, at_ms
                );
                Some(DetectorEvent::ImpactDetected {
                    at_ms,
                    magnitude: reading.magnitude,
                })
            }
            StepOutcome::MonitoringStarted => Some(DetectorEvent::MonitoringStarted { at_ms }),
            StepOutcome::Aborted(reason) => {
                info!(
                    "event=detection_aborted module=detection reason={:?} t={}",
                    reason, at_ms
                );
                Some(DetectorEvent::Aborted { reason, at_ms })
            }
            StepOutcome::Confirmed => {
                let impact_at_ms = next.impact_at_ms.unwrap_or(at_ms);
                info!(
                    "event=fall_confirmed module=detection impact_at={} t={}",
                    impact_at_ms, at_ms
                );
                Some(DetectorEvent::FallConfirmed {
                    impact_at_ms,
                    confirmed_at_ms: at_ms,
                })
            }
        }
    }
}
