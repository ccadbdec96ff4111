//! Pure fall detection state machine.
//!
//! # Responsibility
//! - Hold every flag of one detection cycle in a single value.
//! - Express each transition as `(state, measures, now) -> (state, outcome)`.
//!
//! # Invariants
//! - `impact_at_ms` and `monitor_start_at_ms` are set in every phase except
//!   `Idle`.
//! - `still_since_ms` is only set while `Monitoring`.
//! - Abort-level movement ends the cycle at any point after the impact,
//!   grace period included.
//! - `Confirmed` is absorbing; only an explicit reset leaves it.
//! - No I/O and no clock access: `now_ms` always comes from the caller.

use crate::detection::config::DetectorConfig;
use serde::{Deserialize, Serialize};

/// Detection cycle phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallPhase {
    Idle,
    ImpactDetected,
    Monitoring,
    Confirmed,
}

impl FallPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::ImpactDetected => "impact_detected",
            Self::Monitoring => "monitoring",
            Self::Confirmed => "confirmed",
        }
    }
}

/// Complete state of the detector between two samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallDetectionState {
    pub phase: FallPhase,
    pub impact_at_ms: Option<u64>,
    pub monitor_start_at_ms: Option<u64>,
    /// Start of the current uninterrupted stillness run.
    pub still_since_ms: Option<u64>,
    /// `false` after an abort until the spike measure falls below the
    /// impact threshold again.
    pub armed: bool,
}

impl FallDetectionState {
    /// Armed idle state.
    pub fn idle() -> Self {
        Self {
            phase: FallPhase::Idle,
            impact_at_ms: None,
            monitor_start_at_ms: None,
            still_since_ms: None,
            armed: true,
        }
    }

    fn aborted(spike_g: f64, config: &DetectorConfig) -> Self {
        Self {
            armed: spike_g < config.impact_threshold_g,
            ..Self::idle()
        }
    }
}

impl Default for FallDetectionState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Rolling measures computed from the magnitude buffer for one sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalMeasures {
    /// Short-window mean compared against impact/abort thresholds.
    pub spike_g: f64,
    /// Longer-window mean compared against the stillness threshold.
    pub stillness_g: f64,
}

/// Why a detection cycle ended without confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    /// Vigorous movement after the impact: the person is mobile.
    Movement,
    /// `max_window_ms` elapsed since the impact.
    Timeout,
}

/// Observable effect of one transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    None,
    ImpactDetected,
    MonitoringStarted,
    Aborted(AbortReason),
    Confirmed,
}

/// Advances the state machine by one sample.
pub fn advance(
    state: &FallDetectionState,
    measures: SignalMeasures,
    now_ms: u64,
    config: &DetectorConfig,
) -> (FallDetectionState, StepOutcome) {
    match state.phase {
        FallPhase::Idle => advance_idle(state, measures, now_ms, config),
        FallPhase::ImpactDetected | FallPhase::Monitoring => {
            advance_cycle(state, measures, now_ms, config)
        }
        FallPhase::Confirmed => (*state, StepOutcome::None),
    }
}

fn advance_idle(
    state: &FallDetectionState,
    measures: SignalMeasures,
    now_ms: u64,
    config: &DetectorConfig,
) -> (FallDetectionState, StepOutcome) {
    if !state.armed {
        if measures.spike_g < config.impact_threshold_g {
            return (FallDetectionState::idle(), StepOutcome::None);
        }
        return (*state, StepOutcome::None);
    }

    if measures.spike_g > config.impact_threshold_g {
        let next = FallDetectionState {
            phase: FallPhase::ImpactDetected,
            impact_at_ms: Some(now_ms),
            monitor_start_at_ms: Some(now_ms.saturating_add(config.grace_period_ms)),
            still_since_ms: None,
            armed: true,
        };
        return (next, StepOutcome::ImpactDetected);
    }

    (*state, StepOutcome::None)
}

fn advance_cycle(
    state: &FallDetectionState,
    measures: SignalMeasures,
    now_ms: u64,
    config: &DetectorConfig,
) -> (FallDetectionState, StepOutcome) {
    let impact_at = state.impact_at_ms.unwrap_or(now_ms);
    let monitor_start = state
        .monitor_start_at_ms
        .unwrap_or_else(|| impact_at.saturating_add(config.grace_period_ms));

    if measures.spike_g > config.abort_threshold_g {
        return (
            FallDetectionState::aborted(measures.spike_g, config),
            StepOutcome::Aborted(AbortReason::Movement),
        );
    }

    // Stillness is not evaluated while the device settles.
    if now_ms < monitor_start {
        return (*state, StepOutcome::None);
    }

    let entering = state.phase == FallPhase::ImpactDetected;
    let mut next = FallDetectionState {
        phase: FallPhase::Monitoring,
        impact_at_ms: Some(impact_at),
        monitor_start_at_ms: Some(monitor_start),
        ..*state
    };

    if measures.stillness_g < config.stillness_threshold_g {
        // A run that begins on the first monitored sample counts from the end of grace.
        let run_start = if entering { monitor_start } else { now_ms };
        let since = next.still_since_ms.unwrap_or(run_start);
        next.still_since_ms = Some(since);
        if now_ms.saturating_sub(since) >= config.stillness_duration_ms {
            next.phase = FallPhase::Confirmed;
            return (next, StepOutcome::Confirmed);
        }
    } else {
        next.still_since_ms = None;
    }

    if now_ms.saturating_sub(impact_at) > config.max_window_ms {
        return (
            FallDetectionState::aborted(measures.spike_g, config),
            StepOutcome::Aborted(AbortReason::Timeout),
        );
    }

    let outcome = if entering {
        StepOutcome::MonitoringStarted
    } else {
        StepOutcome::None
    };
    (next, outcome)
}
