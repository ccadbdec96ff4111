//! Emergency call execution with a manual-dial fallback chain.
//!
//! # Responsibility
//! - Validate the target number before any platform call.
//! - Launch the OS dialer pre-filled with `tel:<digits>`.
//! - On failure, surface the number for manual dialing and copy it to the
//!   clipboard.
//!
//! # Invariants
//! - An invalid contact never reaches `DialerPort::launch`.
//! - The fallback path uses only `ClipboardPort` and `ManualDialSurface`.
//! - The number stays visible to the user even when the clipboard write
//!   fails.

use crate::model::contact::{ContactValidationError, EmergencyContact};
use crate::platform::{
    ClipboardPort, DialerPort, ManualDialPrompt, ManualDialSurface, Notice, NoticeKind, Notifier,
};
use log::{error, info, warn};
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const BARE_DIALER_URI: &str = "tel:";

/// Why the primary dial path was abandoned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FallbackReason {
    DialerUnsupported,
    LaunchFailed(String),
}

impl Display for FallbackReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DialerUnsupported => write!(f, "dialer not available"),
            Self::LaunchFailed(message) => write!(f, "dialer launch failed: {message}"),
        }
    }
}

/// Errors that stop a call before any platform interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialerError {
    MissingContact,
    InvalidContact(ContactValidationError),
}

impl Display for DialerError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingContact => write!(f, "no emergency contact configured"),
            Self::InvalidContact(err) => write!(f, "invalid emergency contact: {err}"),
        }
    }
}

impl Error for DialerError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::MissingContact => None,
            Self::InvalidContact(err) => Some(err),
        }
    }
}

impl From<ContactValidationError> for DialerError {
    fn from(value: ContactValidationError) -> Self {
        Self::InvalidContact(value)
    }
}

/// Result of one call attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialOutcome {
    /// The OS dialer was opened pre-filled.
    Launched,
    /// The manual-dial alert was shown instead.
    FellBack {
        reason: FallbackReason,
        copied_to_clipboard: bool,
    },
    Failed(DialerError),
}

impl DialOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Launched => "launched",
            Self::FellBack { .. } => "fell_back",
            Self::Failed(_) => "failed",
        }
    }
}

/// Outbound call executor.
#[derive(Clone)]
pub struct EmergencyDialer {
    dialer: Arc<dyn DialerPort>,
    clipboard: Arc<dyn ClipboardPort>,
    manual_dial: Arc<dyn ManualDialSurface>,
    notifier: Arc<dyn Notifier>,
}

impl EmergencyDialer {
    pub fn new(
        dialer: Arc<dyn DialerPort>,
        clipboard: Arc<dyn ClipboardPort>,
        manual_dial: Arc<dyn ManualDialSurface>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            dialer,
            clipboard,
            manual_dial,
            notifier,
        }
    }

    /// Validates raw input and calls it.
    pub fn call(&self, raw: &str) -> DialOutcome {
        match EmergencyContact::parse(raw) {
            Ok(contact) => self.call_contact(&contact),
            Err(err) => {
                warn!(
                    "event=dial_attempt module=dialer status=rejected error={}",
                    err
                );
                self.notifier.notify(
                    &Notice::new(NoticeKind::Error, "Invalid emergency number")
                        .with_description(err.to_string()),
                );
                DialOutcome::Failed(DialerError::InvalidContact(err))
            }
        }
    }

    /// Calls the configured contact, or reports that none is configured.
    pub fn call_configured(&self, contact: Option<&EmergencyContact>) -> DialOutcome {
        match contact {
            Some(contact) => self.call_contact(contact),
            None => {
                warn!("event=dial_attempt module=dialer status=no_contact");
                self.notifier.notify(
                    &Notice::new(NoticeKind::Error, "No emergency contact configured")
                        .with_description("Add an emergency contact in settings."),
                );
                DialOutcome::Failed(DialerError::MissingContact)
            }
        }
    }

    /// Calls an already validated contact.
    pub fn call_contact(&self, contact: &EmergencyContact) -> DialOutcome {
        if !self.dialer.is_supported() {
            info!(
                "event=dial_attempt module=dialer status=unsupported contact={}",
                contact.masked()
            );
            return self.fall_back(contact, FallbackReason::DialerUnsupported);
        }

        self.notifier.notify(
            &Notice::new(NoticeKind::Info, "Dialing emergency contact...")
                .with_description(contact.digits()),
        );
        match self.dialer.launch(&contact.tel_uri()) {
            Ok(()) => {
                info!(
                    "event=dial_attempt module=dialer status=ok contact={}",
                    contact.masked()
                );
                self.notifier
                    .notify(&Notice::new(NoticeKind::Success, "Call started"));
                DialOutcome::Launched
            }
            Err(err) => {
                warn!(
                    "event=dial_attempt module=dialer status=launch_failed contact={} error={}",
                    contact.masked(),
                    err
                );
                self.fall_back(contact, FallbackReason::LaunchFailed(err.to_string()))
            }
        }
    }

    /// Runs the manual-dial chain: clipboard copy plus a visible number.
    pub fn fall_back(&self, contact: &EmergencyContact, reason: FallbackReason) -> DialOutcome {
        let copied_to_clipboard = match self.clipboard.write_text(contact.digits()) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    "event=clipboard_write module=dialer status=error contact={} error={}",
                    contact.masked(),
                    err
                );
                false
            }
        };

        let message = if copied_to_clipboard {
            format!(
                "Could not open the dialer. The number {} was copied; dial it manually.",
                contact.digits()
            )
        } else {
            format!(
                "Could not open the dialer. Dial {} manually.",
                contact.digits()
            )
        };
        self.show_number(contact, copied_to_clipboard, message);
        info!(
            "event=dial_fallback module=dialer status=ok reason={} copied={}",
            reason, copied_to_clipboard
        );

        DialOutcome::FellBack {
            reason,
            copied_to_clipboard,
        }
    }

    /// Re-shows the number as a plain manual-dial prompt after the host
    /// reports that its clipboard write failed.
    pub fn report_clipboard_failure(&self, contact: &EmergencyContact, message: &str) {
        error!(
            "event=clipboard_write module=dialer status=error source=host contact={} error={}",
            contact.masked(),
            message
        );
        self.show_number(
            contact,
            false,
            format!(
                "The number could not be copied. Dial {} manually.",
                contact.digits()
            ),
        );
    }

    fn show_number(&self, contact: &EmergencyContact, copied_to_clipboard: bool, message: String) {
        // The bare dialer goes through the same launcher; only offer it when that works.
        self.manual_dial.show_manual_dial(&ManualDialPrompt {
            number: contact.digits().to_string(),
            copied_to_clipboard,
            offer_open_dialer: self.dialer.is_supported(),
            message,
        });
    }

    /// Opens the OS dialer without a pre-filled number.
    pub fn open_bare_dialer(&self) -> bool {
        match self.dialer.launch(BARE_DIALER_URI) {
            Ok(()) => {
                info!("event=bare_dialer module=dialer status=ok");
                true
            }
            Err(err) => {
                warn!("event=bare_dialer module=dialer status=error error={}", err);
                self.notifier.notify(
                    &Notice::new(NoticeKind::Error, "Could not open the phone app")
                        .with_description(err.to_string()),
                );
                false
            }
        }
    }
}
