//! Core domain logic for Vigia fall detection and emergency escalation.
//! This crate is the single source of truth for detection and dialing
//! invariants.

pub mod alert;
pub mod db;
pub mod detection;
pub mod dialer;
pub mod engine;
pub mod events;
pub mod logging;
pub mod model;
pub mod platform;
pub mod repo;
pub mod sensor;
pub mod service;

pub use alert::{AlertCoordinator, AlertError, AlertSession, ConfirmedAlert};
pub use detection::config::{DetectorConfig, DetectorConfigError};
pub use detection::detector::{DetectorEvent, FallDetector};
pub use detection::machine::{AbortReason, FallDetectionState, FallPhase};
pub use dialer::{DialOutcome, DialerError, EmergencyDialer, FallbackReason};
pub use engine::{EngineConfig, EngineEvent, FallEngine};
pub use events::{Listener, SubscriptionId};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::contact::{ContactValidationError, EmergencyContact};
pub use model::sample::{AccelerationSample, MagnitudeReading};
pub use model::settings::Settings;
pub use platform::capability::{CapabilitySet, PlatformCapability};
pub use platform::{PlatformError, PlatformPorts};
pub use repo::settings_repo::{
    RepoError, RepoResult, SettingsRepository, SqliteSettingsRepository,
};
pub use sensor::sampler::{MovementLevel, SamplerConfig, SamplerStatus, SamplingPurpose};
pub use service::settings_store::{SettingsStore, WriteStatus};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
