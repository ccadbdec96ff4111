//! Sensor sampler: accelerometer subscription plus magnitude fan-out.

use crate::events::{Listener, ListenerSet, SubscriptionId};
use crate::model::sample::{AccelerationSample, MagnitudeReading};
use crate::platform::{AccelerometerPort, PlatformError};
use log::{info, warn};

/// Upper bound on the sampling interval while fall detection runs.
pub const FALL_DETECTION_MAX_INTERVAL_MS: u64 = 300;
pub const DEFAULT_FALL_DETECTION_INTERVAL_MS: u64 = 100;
pub const DEFAULT_PASSIVE_INTERVAL_MS: u64 = 2_000;

/// Why the stream is running; drives the interval policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplingPurpose {
    /// Safety path: interval clamped to `FALL_DETECTION_MAX_INTERVAL_MS`.
    FallDetection,
    /// Movement display only; coarse intervals are fine.
    PassiveDisplay,
}

/// Sampling intervals per purpose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerConfig {
    pub fall_detection_interval_ms: u64,
    pub passive_interval_ms: u64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            fall_detection_interval_ms: DEFAULT_FALL_DETECTION_INTERVAL_MS,
            passive_interval_ms: DEFAULT_PASSIVE_INTERVAL_MS,
        }
    }
}

impl SamplerConfig {
    pub fn interval_for(&self, purpose: SamplingPurpose) -> u64 {
        match purpose {
            SamplingPurpose::FallDetection => self.fall_detection_interval_ms,
            SamplingPurpose::PassiveDisplay => self.passive_interval_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SamplerStatus {
    Stopped,
    Running {
        interval_ms: u64,
        purpose: SamplingPurpose,
    },
    /// Sticky: the platform refused the subscription.
    Unavailable(PlatformError),
}

/// Coarse movement classification for the passive display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MovementLevel {
    Still,
    Light,
    Active,
}

impl MovementLevel {
    /// Classifies a magnitude by its distance from 1 g (gravity at rest).
    pub fn classify(magnitude: f64) -> Self {
        let deviation = (magnitude - 1.0).abs();
        if deviation < 0.15 {
            Self::Still
        } else if deviation < 0.6 {
            Self::Light
        } else {
            Self::Active
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Still => "still",
            Self::Light => "light",
            Self::Active => "active",
        }
    }
}

/// Owns the accelerometer subscription and fans readings out to listeners.
pub struct SensorSampler {
    port: Box<dyn AccelerometerPort>,
    status: SamplerStatus,
    listeners: ListenerSet<MagnitudeReading>,
}

impl SensorSampler {
    pub fn new(port: Box<dyn AccelerometerPort>) -> Self {
        Self {
            port,
            status: SamplerStatus::Stopped,
            listeners: ListenerSet::new(),
        }
    }

    pub fn status(&self) -> &SamplerStatus {
        &self.status
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, SamplerStatus::Running { .. })
    }

    pub fn is_unavailable(&self) -> bool {
        matches!(self.status, SamplerStatus::Unavailable(_))
    }

    /// Starts (or re-targets) the accelerometer stream.
    ///
    /// A `FallDetection` request above `FALL_DETECTION_MAX_INTERVAL_MS` is
    /// clamped. Once the platform has refused, later calls return the same
    /// `Unavailable` status without asking again.
    pub fn start(&mut self, interval_ms: u64, purpose: SamplingPurpose) -> &SamplerStatus {
        if self.is_unavailable() {
            return &self.status;
        }

        let interval_ms = effective_interval(interval_ms, purpose);
        if let SamplerStatus::Running {
            interval_ms: current,
            purpose: current_purpose,
        } = self.status
        {
            if current == interval_ms && current_purpose == purpose {
                return &self.status;
            }
            self.port.stop();
        }

        match self.port.start(interval_ms) {
            Ok(()) => {
                info!(
                    "event=sampler_start module=sensor status=ok interval_ms={} purpose={:?}",
                    interval_ms, purpose
                );
                self.status = SamplerStatus::Running {
                    interval_ms,
                    purpose,
                };
            }
            Err(err) => {
                warn!(
                    "event=sampler_start module=sensor status=unavailable error={}",
                    err
                );
                self.status = SamplerStatus::Unavailable(err);
            }
        }
        &self.status
    }

    pub fn stop(&mut self) {
        if self.is_running() {
            self.port.stop();
            self.status = SamplerStatus::Stopped;
            info!("event=sampler_stop module=sensor status=ok");
        }
    }

    /// Converts one platform sample and republishes it.
    ///
    /// Returns `None` (and notifies nobody) when the sampler is not running
    /// or the sample has a non-finite axis.
    pub fn publish(&mut self, sample: &AccelerationSample) -> Option<MagnitudeReading> {
        if !self.is_running() || !sample.is_finite() {
            return None;
        }
        let reading = MagnitudeReading::from(sample);
        self.listeners.publish(&reading);
        Some(reading)
    }

    pub fn subscribe(&mut self, listener: Listener<MagnitudeReading>) -> SubscriptionId {
        self.listeners.subscribe(listener)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.unsubscribe(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

fn effective_interval(interval_ms: u64, purpose: SamplingPurpose) -> u64 {
    let interval_ms = interval_ms.max(1);
    if purpose == SamplingPurpose::FallDetection && interval_ms > FALL_DETECTION_MAX_INTERVAL_MS {
        warn!(
            "event=sampler_interval_clamped module=sensor requested_ms={} applied_ms={}",
            interval_ms, FALL_DETECTION_MAX_INTERVAL_MS
        );
        return FALL_DETECTION_MAX_INTERVAL_MS;
    }
    interval_ms
}

#[cfg(test)]
mod tests {
    use super::{MovementLevel, SamplerStatus, SamplingPurpose, SensorSampler};
    use crate::model::sample::{AccelerationSample, MagnitudeReading};
    use crate::platform::{AccelerometerPort, PlatformError};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct PortLog {
        starts: Vec<u64>,
        stops: usize,
    }

    struct FakePort {
        log: Arc<Mutex<PortLog>>,
        fail_with: Option<PlatformError>,
    }

    impl AccelerometerPort for FakePort {
        fn start(&mut self, interval_ms: u64) -> Result<(), PlatformError> {
            self.log.lock().expect("lock").starts.push(interval_ms);
            match &self.fail_with {
                Some(err) => Err(err.clone()),
                None => Ok(()),
            }
        }

        fn stop(&mut self) {
            self.log.lock().expect("lock").stops += 1;
        }
    }

    fn sampler(fail_with: Option<PlatformError>) -> (SensorSampler, Arc<Mutex<PortLog>>) {
        let log = Arc::new(Mutex::new(PortLog::default()));
        let port = FakePort {
            log: Arc::clone(&log),
            fail_with,
        };
        (SensorSampler::new(Box::new(port)), log)
    }

    #[test]
    fn fall_detection_interval_is_clamped() {
        let (mut sampler, log) = sampler(None);
        let status = sampler.start(2_000, SamplingPurpose::FallDetection).clone();
        assert_eq!(
            status,
            SamplerStatus::Running {
                interval_ms: 300,
                purpose: SamplingPurpose::FallDetection
            }
        );
        assert_eq!(log.lock().expect("lock").starts, vec![300]);
    }

    #[test]
    fn passive_display_keeps_coarse_interval() {
        let (mut sampler, _) = sampler(None);
        let status = sampler.start(2_000, SamplingPurpose::PassiveDisplay).clone();
        assert!(matches!(
            status,
            SamplerStatus::Running {
                interval_ms: 2_000,
                ..
            }
        ));
    }

    #[test]
    fn unavailable_sensor_is_sticky_and_not_retried() {
        let (mut sampler, log) = sampler(Some(PlatformError::PermissionDenied));
        sampler.start(100, SamplingPurpose::FallDetection);
        sampler.start(100, SamplingPurpose::FallDetection);
        assert_eq!(
            sampler.status(),
            &SamplerStatus::Unavailable(PlatformError::PermissionDenied)
        );
        assert_eq!(log.lock().expect("lock").starts.len(), 1);

        let sample = AccelerationSample::new(0.0, 0.0, 1.0, 0);
        assert!(sampler.publish(&sample).is_none());
    }

    #[test]
    fn retargeting_restarts_the_stream() {
        let (mut sampler, log) = sampler(None);
        sampler.start(2_000, SamplingPurpose::PassiveDisplay);
        sampler.start(100, SamplingPurpose::FallDetection);
        sampler.start(100, SamplingPurpose::FallDetection);
        let log = log.lock().expect("lock");
        assert_eq!(log.starts, vec![2_000, 100]);
        assert_eq!(log.stops, 1);
    }

    #[test]
    fn publish_notifies_listeners_only_while_running() {
        let (mut sampler, _) = sampler(None);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        sampler.subscribe(Box::new(move |reading: &MagnitudeReading| {
            sink.lock().expect("lock").push(reading.magnitude);
        }));

        let sample = AccelerationSample::new(0.0, 3.0, 4.0, 10);
        assert!(sampler.publish(&sample).is_none());

        sampler.start(100, SamplingPurpose::FallDetection);
        let reading = sampler.publish(&sample).expect("running sampler publishes");
        assert!((reading.magnitude - 5.0).abs() < 1e-9);

        sampler.stop();
        assert!(sampler.publish(&sample).is_none());
        assert_eq!(seen.lock().expect("lock").len(), 1);
    }

    #[test]
    fn movement_levels_follow_distance_from_gravity() {
        assert_eq!(MovementLevel::classify(1.05), MovementLevel::Still);
        assert_eq!(MovementLevel::classify(1.4), MovementLevel::Light);
        assert_eq!(MovementLevel::classify(2.5), MovementLevel::Active);
        assert_eq!(MovementLevel::classify(0.2), MovementLevel::Active);
    }
}
