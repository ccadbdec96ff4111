//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose the fall engine to Dart via FRB as sync calls.
//! - Translate platform port calls into directives the Dart side drains
//!   and executes (alerts, toasts, dialer, clipboard, sensor control).
//!
//! # Invariants
//! - Exported functions must not panic across the FFI boundary.
//! - One engine per process; every call holds the engine lock for a single
//!   synchronous step.
//! - Directives are drained in the order they were produced.

use log::{info, warn};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};
use uuid::Uuid;
use vigia_core::platform::{
    AccelerometerPort, AlertPrompt, AlertSurface, ClipboardPort, DialerPort, ManualDialPrompt,
    ManualDialSurface, Notice, Notifier,
};
use vigia_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, ping as ping_inner,
    AccelerationSample, CapabilitySet, DialOutcome, EngineConfig, EngineEvent, FallEngine,
    MagnitudeReading, MovementLevel, PlatformCapability, PlatformError, PlatformPorts,
    SamplerStatus, SqliteSettingsRepository, WriteStatus,
};

const DB_FILE_NAME: &str = "vigia_settings.sqlite3";
const DB_PATH_ENV: &str = "VIGIA_DB_PATH";
static DEFAULT_DB_PATH: OnceLock<PathBuf> = OnceLock::new();
static ENGINE: OnceLock<Mutex<Option<FfiEngine>>> = OnceLock::new();

struct FfiEngine {
    engine: FallEngine<SqliteSettingsRepository>,
    outbox: Outbox,
    /// Classification of the latest reading, for the movement display.
    movement: Arc<Mutex<Option<MovementLevel>>>,
}

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Safe to call repeatedly with the same `level + log_dir`.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err.to_string(),
    }
}

/// Work item for the Dart side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformDirective {
    StartAccelerometer {
        interval_ms: u64,
    },
    StopAccelerometer,
    ShowAlert {
        session_id: String,
        title: String,
        message: String,
        confirm_label: String,
        cancel_label: String,
    },
    DismissAlert {
        session_id: String,
    },
    ShowNotice {
        kind: String,
        message: String,
        description: Option<String>,
        duration_ms: u32,
    },
    LaunchUri {
        uri: String,
    },
    /// Host reports a failed write through `engine_report_clipboard_failure`.
    CopyToClipboard {
        text: String,
    },
    ShowManualDial {
        number: String,
        copied_to_clipboard: bool,
        offer_open_dialer: bool,
        message: String,
    },
    /// Engine event mirrored for UI state (`impact_detected`, `fall_confirmed`, ...).
    EngineEvent {
        kind: String,
        session_id: Option<String>,
        detail: String,
    },
}

/// Generic action response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineActionResponse {
    /// Whether operation succeeded.
    pub ok: bool,
    /// Human-readable response message for diagnostics/UI.
    pub message: String,
}

impl EngineActionResponse {
    fn success(message: impl Into<String>) -> Self {
        Self {
            ok: true,
            message: message.into(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            message: message.into(),
        }
    }
}

/// Settings snapshot for the settings screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineSettingsResponse {
    pub ok: bool,
    pub fall_detection_enabled: bool,
    /// Digits only; `None` when no contact is configured.
    pub emergency_contact: Option<String>,
    pub message: String,
}

/// Runtime status snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineStatusResponse {
    pub initialized: bool,
    pub detecting: bool,
    /// `idle|impact_detected|monitoring|confirmed`.
    pub phase: String,
    pub alert_session_id: Option<String>,
    /// `stopped|running|unavailable`.
    pub sampler: String,
    /// `still|light|active` for the latest reading; `None` before any sample.
    pub movement: Option<String>,
}

/// Creates (or replaces) the process engine and applies stored settings.
///
/// Input semantics:
/// - `db_path`: settings database file; `None` uses `VIGIA_DB_PATH` or a
///   temp-dir default.
/// - `capabilities`: platform capabilities the host provides
///   (`accelerometer|telephony|clipboard|notification`).
/// - `passive_display`: keep a coarse sensor stream for the movement display
///   while fall detection is off.
///
/// # FFI contract
/// - Sync call; opens the settings database.
/// - Never panics; invalid capabilities or DB errors return `ok=false`.
#[flutter_rust_bridge::frb(sync)]
pub fn engine_init(
    db_path: Option<String>,
    capabilities: Vec<String>,
    passive_display: bool,
) -> EngineActionResponse {
    let capabilities = match CapabilitySet::parse(capabilities.as_slice()) {
        Ok(capabilities) => capabilities,
        Err(err) => return EngineActionResponse::failure(format!("engine_init failed: {err}")),
    };
    let db_path = resolve_db_path(db_path);
    let repo = match SqliteSettingsRepository::open(&db_path) {
        Ok(repo) => repo,
        Err(err) => return EngineActionResponse::failure(format!("engine_init failed: {err}")),
    };

    let outbox = Outbox::default();
    let ports = outbox_ports(&outbox, &capabilities);
    let config = EngineConfig {
        passive_when_disabled: passive_display,
        ..EngineConfig::default()
    };
    let mut engine = match FallEngine::new(repo, ports, config) {
        Ok(engine) => engine,
        Err(err) => return EngineActionResponse::failure(format!("engine_init failed: {err}")),
    };
    let events = outbox.clone();
    engine.subscribe(Box::new(move |event: &EngineEvent| {
        events.push(event_directive(event));
    }));
    let movement = Arc::new(Mutex::new(None));
    let latest = Arc::clone(&movement);
    engine.subscribe_movement(Box::new(move |reading: &MagnitudeReading| {
        *latest.lock().unwrap_or_else(|poisoned| poisoned.into_inner()) =
            Some(MovementLevel::classify(reading.magnitude));
    }));
    let settings = engine.start().clone();

    for capability in capabilities.missing() {
        warn!(
            "event=capability_missing module=ffi capability={} degradation={}",
            capability.as_str(),
            capability.degradation()
        );
    }
    info!(
        "event=engine_init module=ffi status=ok db_path={} enabled={}",
        db_path.display(),
        settings.fall_detection_enabled
    );

    *lock_engine() = Some(FfiEngine {
        engine,
        outbox,
        movement,
    });
    EngineActionResponse::success("Engine ready.")
}

/// Pushes one accelerometer sample (g-units, monotonic ms timestamp).
///
/// # FFI contract
/// - Sync call; runs detection for this sample to completion.
/// - Returns the number of directives waiting to be drained; `0` when the
///   engine is not initialized.
#[flutter_rust_bridge::frb(sync)]
pub fn engine_push_sample(x: f64, y: f64, z: f64, t_ms: u64) -> u32 {
    with_engine(|ffi| {
        ffi.engine
            .handle_sample(&AccelerationSample::new(x, y, z, t_ms));
        ffi.outbox.len()
    })
    .unwrap_or(0)
}

/// Turns fall detection on or off and persists the choice.
#[flutter_rust_bridge::frb(sync)]
pub fn engine_set_enabled(enabled: bool) -> EngineActionResponse {
    action(|ffi| {
        let status = ffi.engine.set_fall_detection_enabled(enabled);
        let detecting = ffi.engine.is_detecting();
        if enabled && !detecting {
            return EngineActionResponse::failure(
                "Fall detection unavailable: motion sensor not accessible.",
            );
        }
        EngineActionResponse::success(write_message(
            if enabled {
                "Fall detection enabled."
            } else {
                "Fall detection disabled."
            },
            status,
        ))
    })
}

/// Validates and stores the emergency contact.
#[flutter_rust_bridge::frb(sync)]
pub fn engine_set_contact(contact: String) -> EngineActionResponse {
    action(|ffi| match ffi.engine.set_emergency_contact(&contact) {
        Ok(status) => EngineActionResponse::success(write_message("Contact saved.", status)),
        Err(err) => EngineActionResponse::failure(format!("Invalid contact: {err}")),
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn engine_clear_contact() -> EngineActionResponse {
    action(|ffi| {
        let status = ffi.engine.clear_emergency_contact();
        EngineActionResponse::success(write_message("Contact removed.", status))
    })
}

/// Returns current settings; defaults when the engine is not initialized.
#[flutter_rust_bridge::frb(sync)]
pub fn engine_load_settings() -> EngineSettingsResponse {
    match with_engine(|ffi| ffi.engine.settings().clone()) {
        Ok(settings) => EngineSettingsResponse {
            ok: true,
            fall_detection_enabled: settings.fall_detection_enabled,
            emergency_contact: settings
                .emergency_contact
                .map(|contact| contact.digits().to_string()),
            message: String::new(),
        },
        Err(message) => EngineSettingsResponse {
            ok: false,
            fall_detection_enabled: false,
            emergency_contact: None,
            message,
        },
    }
}

/// "I'm okay": dismisses the open alert. No-op without one.
#[flutter_rust_bridge::frb(sync)]
pub fn engine_cancel_alert() -> EngineActionResponse {
    action(|ffi| match ffi.engine.cancel_alert() {
        Some(_) => EngineActionResponse::success("Alert cancelled."),
        None => EngineActionResponse::success("No open alert."),
    })
}

/// Confirms the open alert and dials the snapshotted contact.
#[flutter_rust_bridge::frb(sync)]
pub fn engine_confirm_alert() -> EngineActionResponse {
    action(|ffi| match ffi.engine.confirm_alert() {
        Some(outcome) => outcome_response(&outcome),
        None => EngineActionResponse::success("No open alert."),
    })
}

/// Dials the configured contact without an alert (manual SOS).
#[flutter_rust_bridge::frb(sync)]
pub fn engine_call_contact() -> EngineActionResponse {
    action(|ffi| outcome_response(&ffi.engine.call_emergency_contact()))
}

/// Reports that a previously directed `LaunchUri` failed on the Dart side.
#[flutter_rust_bridge::frb(sync)]
pub fn engine_report_dial_failure(message: String) -> EngineActionResponse {
    action(|ffi| match ffi.engine.report_dial_failure(message.trim()) {
        Some(outcome) => outcome_response(&outcome),
        None => EngineActionResponse::failure("No pending call to fall back from."),
    })
}

/// Reports that a directed `CopyToClipboard` failed on the Dart side; the
/// number is shown again as not copied.
#[flutter_rust_bridge::frb(sync)]
pub fn engine_report_clipboard_failure(number: String, message: String) -> EngineActionResponse {
    action(|ffi| {
        match ffi
            .engine
            .report_clipboard_failure(number.trim(), message.trim())
        {
            Ok(()) => EngineActionResponse::success("Number shown for manual dialing."),
            Err(err) => EngineActionResponse::failure(format!("Invalid contact: {err}")),
        }
    })
}

/// Opens the OS dialer without a number (manual-dial offer accepted).
#[flutter_rust_bridge::frb(sync)]
pub fn engine_open_bare_dialer() -> EngineActionResponse {
    action(|ffi| {
        if ffi.engine.open_bare_dialer() {
            EngineActionResponse::success("Dialer opened.")
        } else {
            EngineActionResponse::failure("Could not open the dialer.")
        }
    })
}

#[flutter_rust_bridge::frb(sync)]
pub fn engine_status() -> EngineStatusResponse {
    with_engine(|ffi| EngineStatusResponse {
        initialized: true,
        detecting: ffi.engine.is_detecting(),
        phase: ffi.engine.detection_phase().as_str().to_string(),
        alert_session_id: ffi
            .engine
            .active_alert()
            .map(|session| session_label(session.id)),
        sampler: sampler_label(ffi.engine.sampler_status()).to_string(),
        movement: (*ffi
            .movement
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()))
        .map(|level| level.as_str().to_string()),
    })
    .unwrap_or_else(|_| EngineStatusResponse {
        initialized: false,
        detecting: false,
        phase: "idle".to_string(),
        alert_session_id: None,
        sampler: "stopped".to_string(),
        movement: None,
    })
}

/// Takes every pending directive, oldest first.
#[flutter_rust_bridge::frb(sync)]
pub fn engine_drain_directives() -> Vec<PlatformDirective> {
    with_engine(|ffi| ffi.outbox.drain()).unwrap_or_default()
}

fn resolve_db_path(explicit: Option<String>) -> PathBuf {
    if let Some(raw) = explicit {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            return PathBuf::from(trimmed);
        }
    }
    DEFAULT_DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn lock_engine() -> MutexGuard<'static, Option<FfiEngine>> {
    ENGINE
        .get_or_init(|| Mutex::new(None))
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn with_engine<T>(f: impl FnOnce(&mut FfiEngine) -> T) -> Result<T, String> {
    let mut guard = lock_engine();
    match guard.as_mut() {
        Some(ffi) => Ok(f(ffi)),
        None => Err("engine not initialized; call engine_init first".to_string()),
    }
}

fn action(f: impl FnOnce(&mut FfiEngine) -> EngineActionResponse) -> EngineActionResponse {
    with_engine(f).unwrap_or_else(EngineActionResponse::failure)
}

fn write_message(message: &str, status: WriteStatus) -> String {
    match status {
        WriteStatus::Persisted => message.to_string(),
        WriteStatus::MemoryOnly => format!("{message} (not saved; storage unavailable)"),
    }
}

fn outcome_response(outcome: &DialOutcome) -> EngineActionResponse {
    match outcome {
        DialOutcome::Launched => EngineActionResponse::success("Dialer launched."),
        DialOutcome::FellBack { reason, .. } => {
            EngineActionResponse::success(format!("Manual dial offered: {reason}."))
        }
        DialOutcome::Failed(err) => EngineActionResponse::failure(err.to_string()),
    }
}

fn session_label(id: Uuid) -> String {
    id.hyphenated().to_string()
}

fn sampler_label(status: &SamplerStatus) -> &'static str {
    match status {
        SamplerStatus::Stopped => "stopped",
        SamplerStatus::Running { .. } => "running",
        SamplerStatus::Unavailable(_) => "unavailable",
    }
}

fn event_directive(event: &EngineEvent) -> PlatformDirective {
    let (kind, session_id, detail) = match event {
        EngineEvent::ImpactDetected { at_ms, magnitude } => (
            "impact_detected",
            None,
            format!("at_ms={at_ms} magnitude={magnitude:.2}"),
        ),
        EngineEvent::DetectionAborted { reason, at_ms } => (
            "detection_aborted",
            None,
            format!("at_ms={at_ms} reason={reason:?}"),
        ),
        EngineEvent::FallConfirmed {
            session_id,
            contact,
            at_ms,
        } => (
            "fall_confirmed",
            Some(*session_id),
            format!("at_ms={at_ms} has_contact={}", contact.is_some()),
        ),
        EngineEvent::AlertCancelled { session_id } => {
            ("alert_cancelled", Some(*session_id), String::new())
        }
        EngineEvent::AlertConfirmed { session_id } => {
            ("alert_confirmed", Some(*session_id), String::new())
        }
        EngineEvent::DialerOutcome {
            session_id,
            outcome,
        } => ("dialer_outcome", *session_id, outcome.as_str().to_string()),
        EngineEvent::SensorUnavailable { error } => {
            ("sensor_unavailable", None, error.to_string())
        }
    };
    PlatformDirective::EngineEvent {
        kind: kind.to_string(),
        session_id: session_id.map(session_label),
        detail,
    }
}

/// Shared FIFO of directives written by the port adapters.
#[derive(Clone, Default)]
struct Outbox(Arc<Mutex<Vec<PlatformDirective>>>);

impl Outbox {
    fn queue(&self) -> MutexGuard<'_, Vec<PlatformDirective>> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn push(&self, directive: PlatformDirective) {
        self.queue().push(directive);
    }

    fn drain(&self) -> Vec<PlatformDirective> {
        std::mem::take(&mut *self.queue())
    }

    fn len(&self) -> u32 {
        u32::try_from(self.queue().len()).unwrap_or(u32::MAX)
    }
}

/// Port adapters that turn calls into directives, gated by host capabilities.
#[derive(Clone)]
struct OutboxPorts {
    outbox: Outbox,
    capabilities: CapabilitySet,
}

impl OutboxPorts {
    fn supports(&self, capability: PlatformCapability) -> bool {
        self.capabilities.contains(capability)
    }
}

impl AccelerometerPort for OutboxPorts {
    fn start(&mut self, interval_ms: u64) -> Result<(), PlatformError> {
        if !self.supports(PlatformCapability::Accelerometer) {
            return Err(PlatformError::Unsupported);
        }
        self.outbox
            .push(PlatformDirective::StartAccelerometer { interval_ms });
        Ok(())
    }

    fn stop(&mut self) {
        self.outbox.push(PlatformDirective::StopAccelerometer);
    }
}

impl AlertSurface for OutboxPorts {
    fn show_alert(&self, prompt: &AlertPrompt) {
        self.outbox.push(PlatformDirective::ShowAlert {
            session_id: session_label(prompt.session_id),
            title: prompt.title.clone(),
            message: prompt.message.clone(),
            confirm_label: prompt.confirm_label.clone(),
            cancel_label: prompt.cancel_label.clone(),
        });
    }

    fn dismiss_alert(&self, session_id: Uuid) {
        self.outbox.push(PlatformDirective::DismissAlert {
            session_id: session_label(session_id),
        });
    }
}

impl Notifier for OutboxPorts {
    fn notify(&self, notice: &Notice) {
        if !self.supports(PlatformCapability::Notification) {
            info!(
                "event=notice_dropped module=ffi kind={} reason=no_notification_capability",
                notice.kind.as_str()
            );
            return;
        }
        self.outbox.push(PlatformDirective::ShowNotice {
            kind: notice.kind.as_str().to_string(),
            message: notice.message.clone(),
            description: notice.description.clone(),
            duration_ms: notice.duration_ms,
        });
    }
}

impl DialerPort for OutboxPorts {
    fn is_supported(&self) -> bool {
        self.supports(PlatformCapability::Telephony)
    }

    fn launch(&self, uri: &str) -> Result<(), PlatformError> {
        if !self.is_supported() {
            return Err(PlatformError::Unsupported);
        }
        self.outbox.push(PlatformDirective::LaunchUri {
            uri: uri.to_string(),
        });
        Ok(())
    }
}

impl ClipboardPort for OutboxPorts {
    fn write_text(&self, text: &str) -> Result<(), PlatformError> {
        if !self.supports(PlatformCapability::Clipboard) {
            return Err(PlatformError::Unsupported);
        }
        self.outbox.push(PlatformDirective::CopyToClipboard {
            text: text.to_string(),
        });
        Ok(())
    }
}

impl ManualDialSurface for OutboxPorts {
    fn show_manual_dial(&self, prompt: &ManualDialPrompt) {
        self.outbox.push(PlatformDirective::ShowManualDial {
            number: prompt.number.clone(),
            copied_to_clipboard: prompt.copied_to_clipboard,
            offer_open_dialer: prompt.offer_open_dialer,
            message: prompt.message.clone(),
        });
    }
}

fn outbox_ports(outbox: &Outbox, capabilities: &CapabilitySet) -> PlatformPorts {
    let ports = OutboxPorts {
        outbox: outbox.clone(),
        capabilities: capabilities.clone(),
    };
    let shared = Arc::new(ports.clone());
    PlatformPorts {
        accelerometer: Box::new(ports),
        alert_surface: shared.clone(),
        notifier: shared.clone(),
        dialer: shared.clone(),
        clipboard: shared.clone(),
        manual_dial: shared,
    }
}
