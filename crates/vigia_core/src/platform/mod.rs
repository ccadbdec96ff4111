//! Platform ports consumed by the engine.
//!
//! # Responsibility
//! - Describe every native capability the engine needs as a narrow trait.
//! - Keep UI rendering, telephony and sensors outside core.
//!
//! # Invariants
//! - Port failures are values (`PlatformError`), never panics.
//! - The manual-dial fallback (`ClipboardPort`, `ManualDialSurface`) shares
//!   no port with the primary dial path (`DialerPort`).

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

pub mod capability;

/// Failure reported by a platform port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformError {
    /// The capability does not exist in this runtime (sandbox, emulator).
    Unsupported,
    PermissionDenied,
    Failed(String),
}

impl Display for PlatformError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "capability is not supported on this platform"),
            Self::PermissionDenied => write!(f, "permission denied"),
            Self::Failed(message) => write!(f, "platform call failed: {message}"),
        }
    }
}

impl Error for PlatformError {}

/// Accelerometer subscription control.
///
/// Samples themselves are pushed into the engine by the host event loop.
pub trait AccelerometerPort: Send {
    fn start(&mut self, interval_ms: u64) -> Result<(), PlatformError>;
    fn stop(&mut self);
}

/// Modal surface for the fall confirmation alert.
pub trait AlertSurface: Send + Sync {
    fn show_alert(&self, prompt: &AlertPrompt);
    fn dismiss_alert(&self, session_id: Uuid);
}

/// Transient toast/notification surface.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: &Notice);
}

/// Launches URIs such as `tel:11987654321` in the OS dialer.
pub trait DialerPort: Send + Sync {
    /// Structural availability; `false` skips straight to the fallback.
    fn is_supported(&self) -> bool;
    fn launch(&self, uri: &str) -> Result<(), PlatformError>;
}

pub trait ClipboardPort: Send + Sync {
    fn write_text(&self, text: &str) -> Result<(), PlatformError>;
}

/// Plain alert that shows a number for manual dialing.
pub trait ManualDialSurface: Send + Sync {
    fn show_manual_dial(&self, prompt: &ManualDialPrompt);
}

/// Content of the fall confirmation modal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertPrompt {
    pub session_id: Uuid,
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    Info,
    Success,
    Warning,
    Error,
}

impl NoticeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

/// One transient status message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    pub description: Option<String>,
    pub duration_ms: u32,
}

impl Notice {
    pub const DEFAULT_DURATION_MS: u32 = 3_000;

    pub fn new(kind: NoticeKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            description: None,
            duration_ms: Self::DEFAULT_DURATION_MS,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_duration_ms(mut self, duration_ms: u32) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Content of the manual-dial fallback alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualDialPrompt {
    /// Always visible, even when the clipboard write failed.
    pub number: String,
    pub copied_to_clipboard: bool,
    /// Whether to offer an "open dialer" action (bare dialer, no pre-fill).
    pub offer_open_dialer: bool,
    pub message: String,
}

/// Bundle of every port the engine needs.
pub struct PlatformPorts {
    pub accelerometer: Box<dyn AccelerometerPort>,
    pub alert_surface: Arc<dyn AlertSurface>,
    pub notifier: Arc<dyn Notifier>,
    pub dialer: Arc<dyn DialerPort>,
    pub clipboard: Arc<dyn ClipboardPort>,
    pub manual_dial: Arc<dyn ManualDialSurface>,
}
