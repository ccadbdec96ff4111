//! Fall confirmation alert lifecycle.
//!
//! # Responsibility
//! - Own the single active `AlertSession`.
//! - Bridge a confirmed fall to the confirm/cancel surface and back to the
//!   detector and dialer.
//!
//! # Invariants
//! - At most one session is open at any time.
//! - The contact is snapshotted when the session opens; later settings edits
//!   do not change its target.
//! - `cancel` and `confirm` are no-ops without an open session.
//! - Resolving a session always resets the detector to `Idle`.

use crate::detection::detector::FallDetector;
use crate::dialer::{DialOutcome, EmergencyDialer};
use crate::model::contact::EmergencyContact;
use crate::platform::{AlertPrompt, AlertSurface, Notice, NoticeKind, Notifier};
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use uuid::Uuid;

const ALERT_TITLE: &str = "Possible fall detected";
const CONFIRM_LABEL: &str = "Call emergency contact";
const CANCEL_LABEL: &str = "I'm okay";

/// One open confirmation alert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertSession {
    pub id: Uuid,
    pub opened_at_ms: u64,
    /// Contact at confirmation time; `None` when none was configured.
    pub contact: Option<EmergencyContact>,
    pub resolved: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlertError {
    AlreadyOpen { session_id: Uuid },
}

impl Display for AlertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AlreadyOpen { session_id } => {
                write!(f, "alert session `{session_id}` is already open")
            }
        }
    }
}

impl Error for AlertError {}

/// Session resolved by `confirm`, with the dial result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedAlert {
    pub session: AlertSession,
    pub outcome: DialOutcome,
}

pub struct AlertCoordinator {
    surface: Arc<dyn AlertSurface>,
    notifier: Arc<dyn Notifier>,
    active: Option<AlertSession>,
}

impl AlertCoordinator {
    pub fn new(surface: Arc<dyn AlertSurface>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            surface,
            notifier,
            active: None,
        }
    }

    pub fn active(&self) -> Option<&AlertSession> {
        self.active.as_ref()
    }

    pub fn is_open(&self) -> bool {
        self.active.is_some()
    }

    /// Opens a session and shows the confirmation alert.
    ///
    /// # Errors
    /// - `AlreadyOpen` when a session is open; the open one is untouched.
    pub fn show(
        &mut self,
        contact: Option<EmergencyContact>,
        opened_at_ms: u64,
    ) -> Result<&AlertSession, AlertError> {
        if let Some(open) = &self.active {
            warn!(
                "event=alert_show module=alert status=rejected open_session={}",
                open.id
            );
            return Err(AlertError::AlreadyOpen {
                session_id: open.id,
            });
        }

        let session = AlertSession {
            id: Uuid::new_v4(),
            opened_at_ms,
            contact,
            resolved: false,
        };
        self.surface.show_alert(&prompt_for(&session));
        info!(
            "event=alert_show module=alert status=ok session={} has_contact={}",
            session.id,
            session.contact.is_some()
        );
        Ok(self.active.insert(session))
    }

    /// Resolves the open session as a false alarm.
    pub fn cancel(&mut self, detector: &mut FallDetector) -> Option<AlertSession> {
        let session = self.resolve(detector, "cancelled")?;
        self.notifier
            .notify(&Notice::new(NoticeKind::Info, "Alert cancelled"));
        Some(session)
    }

    /// Resolves the open session and calls the snapshotted contact.
    pub fn confirm(
        &mut self,
        detector: &mut FallDetector,
        dialer: &EmergencyDialer,
    ) -> Option<ConfirmedAlert> {
        let session = self.resolve(detector, "confirmed")?;
        let outcome = dialer.call_configured(session.contact.as_ref());
        Some(ConfirmedAlert { session, outcome })
    }

    fn resolve(&mut self, detector: &mut FallDetector, how: &str) -> Option<AlertSession> {
        let mut session = self.active.take()?;
        session.resolved = true;
        self.surface.dismiss_alert(session.id);
        detector.reset();
        info!(
            "event=alert_resolve module=alert status={} session={}",
            how, session.id
        );
        Some(session)
    }
}

fn prompt_for(session: &AlertSession) -> AlertPrompt {
    let message = match &session.contact {
        Some(contact) => format!(
            "Are you okay? Confirm to call your emergency contact ({}).",
            contact.digits()
        ),
        None => "Are you okay? No emergency contact is configured.".to_string(),
    };
    AlertPrompt {
        session_id: session.id,
        title: ALERT_TITLE.to_string(),
        message,
        confirm_label: CONFIRM_LABEL.to_string(),
        cancel_label: CANCEL_LABEL.to_string(),
    }
}
