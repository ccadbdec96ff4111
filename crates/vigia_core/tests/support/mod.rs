//! Shared platform fakes for integration tests.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use uuid::Uuid;
use vigia_core::detection::config::DetectorConfig;
use vigia_core::platform::{
    AccelerometerPort, AlertPrompt, AlertSurface, ClipboardPort, DialerPort, ManualDialPrompt,
    ManualDialSurface, Notice, Notifier, PlatformError, PlatformPorts,
};
use vigia_core::{AccelerationSample, MagnitudeReading};

/// Knobs for how the fake platform behaves.
#[derive(Debug, Clone)]
pub struct FakeBehavior {
    pub sensor_available: bool,
    pub dialer_supported: bool,
    pub launch_fails: bool,
    pub clipboard_fails: bool,
}

impl Default for FakeBehavior {
    fn default() -> Self {
        Self {
            sensor_available: true,
            dialer_supported: true,
            launch_fails: false,
            clipboard_fails: false,
        }
    }
}

/// Everything the engine asked the platform to do.
#[derive(Debug, Default)]
pub struct Recorded {
    pub sensor_starts: Vec<u64>,
    pub sensor_stops: usize,
    pub alerts_shown: Vec<AlertPrompt>,
    pub alerts_dismissed: Vec<Uuid>,
    pub notices: Vec<Notice>,
    pub launched: Vec<String>,
    pub clipboard: Option<String>,
    pub manual_dials: Vec<ManualDialPrompt>,
}

#[derive(Clone)]
pub struct FakePlatform {
    behavior: FakeBehavior,
    recorded: Arc<Mutex<Recorded>>,
}

impl FakePlatform {
    pub fn new(behavior: FakeBehavior) -> Self {
        Self {
            behavior,
            recorded: Arc::new(Mutex::new(Recorded::default())),
        }
    }

    pub fn recorded(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded.lock().unwrap()
    }

    pub fn ports(&self) -> PlatformPorts {
        let shared = Arc::new(self.clone());
        PlatformPorts {
            accelerometer: Box::new(self.clone()),
            alert_surface: shared.clone(),
            notifier: shared.clone(),
            dialer: shared.clone(),
            clipboard: shared.clone(),
            manual_dial: shared,
        }
    }

    pub fn notice_messages(&self) -> Vec<String> {
        self.recorded()
            .notices
            .iter()
            .map(|notice| notice.message.clone())
            .collect()
    }
}

impl AccelerometerPort for FakePlatform {
    fn start(&mut self, interval_ms: u64) -> Result<(), PlatformError> {
        if !self.behavior.sensor_available {
            return Err(PlatformError::PermissionDenied);
        }
        self.recorded().sensor_starts.push(interval_ms);
        Ok(())
    }

    fn stop(&mut self) {
        self.recorded().sensor_stops += 1;
    }
}

impl AlertSurface for FakePlatform {
    fn show_alert(&self, prompt: &AlertPrompt) {
        self.recorded().alerts_shown.push(prompt.clone());
    }

    fn dismiss_alert(&self, session_id: Uuid) {
        self.recorded().alerts_dismissed.push(session_id);
    }
}

impl Notifier for FakePlatform {
    fn notify(&self, notice: &Notice) {
        self.recorded().notices.push(notice.clone());
    }
}

impl DialerPort for FakePlatform {
    fn is_supported(&self) -> bool {
        self.behavior.dialer_supported
    }

    fn launch(&self, uri: &str) -> Result<(), PlatformError> {
        self.recorded().launched.push(uri.to_string());
        if self.behavior.launch_fails {
            return Err(PlatformError::Failed("no activity handles tel:".to_string()));
        }
        Ok(())
    }
}

impl ClipboardPort for FakePlatform {
    fn write_text(&self, text: &str) -> Result<(), PlatformError> {
        if self.behavior.clipboard_fails {
            return Err(PlatformError::PermissionDenied);
        }
        self.recorded().clipboard = Some(text.to_string());
        Ok(())
    }
}

impl ManualDialSurface for FakePlatform {
    fn show_manual_dial(&self, prompt: &ManualDialPrompt) {
        self.recorded().manual_dials.push(prompt.clone());
    }
}

/// Detector settings used by the worked scenarios: impact 2.5 g,
/// stillness 2.5 g, 500 ms grace, 2000 ms stillness.
pub fn scenario_config() -> DetectorConfig {
    DetectorConfig {
        impact_threshold_g: 2.5,
        abort_threshold_g: 4.0,
        stillness_threshold_g: 2.5,
        grace_period_ms: 500,
        stillness_duration_ms: 2_000,
        ..DetectorConfig::default()
    }
}

/// Magnitude readings spaced `interval_ms` apart, starting at t=0.
pub fn readings(magnitudes: &[f64], interval_ms: u64) -> Vec<MagnitudeReading> {
    magnitudes
        .iter()
        .enumerate()
        .map(|(index, magnitude)| MagnitudeReading::new(*magnitude, index as u64 * interval_ms))
        .collect()
}

/// Vertical-axis samples whose magnitude equals each value.
pub fn samples(magnitudes: &[f64], interval_ms: u64) -> Vec<AccelerationSample> {
    magnitudes
        .iter()
        .enumerate()
        .map(|(index, magnitude)| {
            AccelerationSample::new(0.0, 0.0, *magnitude, index as u64 * interval_ms)
        })
        .collect()
}

/// Fall trace: three calm samples, a 3 g impact, then 12 samples lying still.
pub fn fall_trace() -> Vec<f64> {
    let mut magnitudes = vec![1.0, 1.0, 1.0, 3.0, 3.0];
    magnitudes.extend(std::iter::repeat(0.4).take(12));
    magnitudes
}
