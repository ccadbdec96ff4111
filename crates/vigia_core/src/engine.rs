//! Fall engine: the owned service wiring sampler, detector, alert and dialer.
//!
//! # Responsibility
//! - Process one accelerometer sample at a time, to completion.
//! - Keep the detector's enabled flag in sync with settings.
//! - Publish engine events to subscribers.
//!
//! # Invariants
//! - While an alert is open the detector receives no samples.
//! - Disabling detection discards any in-flight cycle; no stale
//!   `FallConfirmed` can follow.
//! - An unavailable sensor turns detection off for this run without
//!   touching the persisted setting.

use crate::alert::{AlertCoordinator, AlertSession};
use crate::detection::config::{DetectorConfig, DetectorConfigError};
use crate::detection::detector::{DetectorEvent, FallDetector};
use crate::detection::machine::{AbortReason, FallPhase};
use crate::dialer::{DialOutcome, EmergencyDialer, FallbackReason};
use crate::events::{Listener, ListenerSet, SubscriptionId};
use crate::model::contact::{ContactValidationError, EmergencyContact};
use crate::model::sample::{AccelerationSample, MagnitudeReading};
use crate::model::settings::Settings;
use crate::platform::{PlatformError, PlatformPorts};
use crate::repo::settings_repo::SettingsRepository;
use crate::sensor::sampler::{SamplerConfig, SamplerStatus, SamplingPurpose, SensorSampler};
use crate::service::settings_store::{SettingsStore, WriteStatus};
use log::{info, warn};
use uuid::Uuid;

/// Static engine configuration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    pub sampler: SamplerConfig,
    /// Keep a coarse stream running for the movement display while
    /// detection is off.
    pub passive_when_disabled: bool,
}

/// Event published to engine subscribers.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    ImpactDetected {
        at_ms: u64,
        magnitude: f64,
    },
    DetectionAborted {
        reason: AbortReason,
        at_ms: u64,
    },
    FallConfirmed {
        session_id: Uuid,
        contact: Option<EmergencyContact>,
        at_ms: u64,
    },
    AlertCancelled {
        session_id: Uuid,
    },
    AlertConfirmed {
        session_id: Uuid,
    },
    DialerOutcome {
        session_id: Option<Uuid>,
        outcome: DialOutcome,
    },
    SensorUnavailable {
        error: PlatformError,
    },
}

pub struct FallEngine<R: SettingsRepository> {
    settings: SettingsStore<R>,
    sampler: SensorSampler,
    detector: FallDetector,
    coordinator: AlertCoordinator,
    dialer: EmergencyDialer,
    events: ListenerSet<EngineEvent>,
    config: EngineConfig,
    last_dialed: Option<(Option<Uuid>, EmergencyContact)>,
}

impl<R: SettingsRepository> FallEngine<R> {
    /// Builds an engine; call `start()` to load settings and begin sampling.
    ///
    /// # Errors
    /// - Returns the detector configuration error when thresholds or
    ///   windows are inconsistent.
    pub fn new(
        repo: R,
        ports: PlatformPorts,
        config: EngineConfig,
    ) -> Result<Self, DetectorConfigError> {
        let detector = FallDetector::new(config.detector.clone())?;
        let dialer = EmergencyDialer::new(
            ports.dialer,
            ports.clipboard,
            ports.manual_dial,
            ports.notifier.clone(),
        );
        Ok(Self {
            settings: SettingsStore::new(repo),
            sampler: SensorSampler::new(ports.accelerometer),
            detector,
            coordinator: AlertCoordinator::new(ports.alert_surface, ports.notifier),
            dialer,
            events: ListenerSet::new(),
            config,
            last_dialed: None,
        })
    }

    /// Loads settings and applies them to the sampler and detector.
    pub fn start(&mut self) -> &Settings {
        let enabled = self.settings.load().fall_detection_enabled;
        self.apply_enabled(enabled);
        info!(
            "event=engine_start module=engine status=ok enabled={} detecting={}",
            enabled,
            self.detector.is_enabled()
        );
        self.settings.current()
    }

    /// Processes one accelerometer sample to completion.
    pub fn handle_sample(&mut self, sample: &AccelerationSample) -> Option<EngineEvent> {
        let reading = self.sampler.publish(sample)?;
        if self.coordinator.is_open() {
            return None;
        }
        let event = self.detector.ingest(reading)?;
        self.on_detector_event(event)
    }

    /// Feeds a precomputed magnitude, bypassing the sampler fan-out.
    pub fn handle_reading(&mut self, reading: MagnitudeReading) -> Option<EngineEvent> {
        if self.coordinator.is_open() {
            return None;
        }
        let event = self.detector.ingest(reading)?;
        self.on_detector_event(event)
    }

    pub fn set_fall_detection_enabled(&mut self, enabled: bool) -> WriteStatus {
        let status = self.settings.set_enabled(enabled);
        self.apply_enabled(enabled);
        status
    }

    pub fn set_emergency_contact(
        &mut self,
        raw: &str,
    ) -> Result<WriteStatus, ContactValidationError> {
        self.settings.set_contact(raw)
    }

    pub fn clear_emergency_contact(&mut self) -> WriteStatus {
        self.settings.clear_contact()
    }

    /// Dismisses the open alert as a false alarm. No-op without one.
    pub fn cancel_alert(&mut self) -> Option<AlertSession> {
        let session = self.coordinator.cancel(&mut self.detector)?;
        self.publish(EngineEvent::AlertCancelled {
            session_id: session.id,
        });
        Some(session)
    }

    /// Confirms the open alert and dials. No-op without one.
    pub fn confirm_alert(&mut self) -> Option<DialOutcome> {
        let confirmed = self
            .coordinator
            .confirm(&mut self.detector, &self.dialer)?;
        let session_id = confirmed.session.id;
        if let (DialOutcome::Launched, Some(contact)) =
            (&confirmed.outcome, &confirmed.session.contact)
        {
            self.last_dialed = Some((Some(session_id), contact.clone()));
        }
        self.publish(EngineEvent::AlertConfirmed { session_id });
        self.publish(EngineEvent::DialerOutcome {
            session_id: Some(session_id),
            outcome: confirmed.outcome.clone(),
        });
        Some(confirmed.outcome)
    }

    /// Dials the configured contact outside an alert (manual SOS).
    pub fn call_emergency_contact(&mut self) -> DialOutcome {
        let contact = self.settings.current().emergency_contact.clone();
        let outcome = self.dialer.call_configured(contact.as_ref());
        if let (DialOutcome::Launched, Some(contact)) = (&outcome, contact) {
            self.last_dialed = Some((None, contact));
        }
        self.publish(EngineEvent::DialerOutcome {
            session_id: None,
            outcome: outcome.clone(),
        });
        outcome
    }

    /// Runs the fallback chain for a launch the platform reported as failed
    /// after the fact. Returns `None` when no launch is pending.
    pub fn report_dial_failure(&mut self, message: &str) -> Option<DialOutcome> {
        let (session_id, contact) = self.last_dialed.take()?;
        warn!(
            "event=dial_failure_reported module=engine contact={}",
            contact.masked()
        );
        let outcome = self
            .dialer
            .fall_back(&contact, FallbackReason::LaunchFailed(message.to_string()));
        self.publish(EngineEvent::DialerOutcome {
            session_id,
            outcome: outcome.clone(),
        });
        Some(outcome)
    }

    /// Shows `number` for manual dialing after the host's clipboard write
    /// failed.
    ///
    /// # Errors
    /// - Returns the validation error when `number` is not a dialable contact.
    pub fn report_clipboard_failure(
        &self,
        number: &str,
        message: &str,
    ) -> Result<(), ContactValidationError> {
        let contact = EmergencyContact::parse(number)?;
        self.dialer.report_clipboard_failure(&contact, message);
        Ok(())
    }

    pub fn open_bare_dialer(&self) -> bool {
        self.dialer.open_bare_dialer()
    }

    pub fn subscribe(&mut self, listener: Listener<EngineEvent>) -> SubscriptionId {
        self.events.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe(id)
    }

    /// Subscribes to raw magnitude readings (movement display).
    pub fn subscribe_movement(&mut self, listener: Listener<MagnitudeReading>) -> SubscriptionId {
        self.sampler.subscribe(listener)
    }

    pub fn unsubscribe_movement(&mut self, id: SubscriptionId) -> bool {
        self.sampler.unsubscribe(id)
    }

    pub fn detection_phase(&self) -> FallPhase {
        self.detector.phase()
    }

    pub fn is_detecting(&self) -> bool {
        self.detector.is_enabled()
    }

    pub fn active_alert(&self) -> Option<&AlertSession> {
        self.coordinator.active()
    }

    pub fn settings(&self) -> &Settings {
        self.settings.current()
    }

    pub fn sampler_status(&self) -> &SamplerStatus {
        self.sampler.status()
    }

    fn apply_enabled(&mut self, enabled: bool) {
        if !enabled {
            self.detector.set_enabled(false);
            if self.config.passive_when_disabled {
                let interval = self.config.sampler.interval_for(SamplingPurpose::PassiveDisplay);
                self.sampler
                    .start(interval, SamplingPurpose::PassiveDisplay);
            } else {
                self.sampler.stop();
            }
            return;
        }

        let interval = self.config.sampler.interval_for(SamplingPurpose::FallDetection);
        let status = self
            .sampler
            .start(interval, SamplingPurpose::FallDetection)
            .clone();
        match status {
            SamplerStatus::Running { .. } => self.detector.set_enabled(true),
            SamplerStatus::Unavailable(error) => {
                self.detector.set_enabled(false);
                warn!(
                    "event=fall_detection module=engine status=disabled reason=sensor_unavailable error={}",
                    error
                );
                self.publish(EngineEvent::SensorUnavailable { error });
            }
            SamplerStatus::Stopped => self.detector.set_enabled(false),
        }
    }

    fn on_detector_event(&mut self, event: DetectorEvent) -> Option<EngineEvent> {
        let engine_event = match event {
            DetectorEvent::ImpactDetected { at_ms, magnitude } => {
                EngineEvent::ImpactDetected { at_ms, magnitude }
            }
            DetectorEvent::MonitoringStarted { .. } => return None,
            DetectorEvent::Aborted { reason, at_ms } => {
                EngineEvent::DetectionAborted { reason, at_ms }
            }
            DetectorEvent::FallConfirmed {
                confirmed_at_ms, ..
            } => {
                let contact = self.settings.current().emergency_contact.clone();
                match self.coordinator.show(contact.clone(), confirmed_at_ms) {
                    Ok(session) => EngineEvent::FallConfirmed {
                        session_id: session.id,
                        contact,
                        at_ms: confirmed_at_ms,
                    },
                    Err(err) => {
                        warn!(
                            "event=fall_confirmed module=engine status=dropped error={}",
                            err
                        );
                        return None;
                    }
                }
            }
        };
        self.publish(engine_event.clone());
        Some(engine_event)
    }

    fn publish(&mut self, event: EngineEvent) {
        self.events.publish(&event);
    }
}
