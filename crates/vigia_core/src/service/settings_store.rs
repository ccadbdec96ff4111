//! Settings use-case service.
//!
//! # Responsibility
//! - Load persisted settings with field-level fallback to defaults.
//! - Validate before writing through to the repository.
//!
//! # Invariants
//! - `load()` never fails; unreadable or corrupt fields fall back to defaults.
//! - An invalid contact is rejected before persistence and never stored.
//! - A persistence failure keeps the new value in memory and never
//!   propagates to the caller.

use crate::model::contact::{ContactValidationError, EmergencyContact};
use crate::model::settings::Settings;
use crate::repo::settings_repo::{
    RepoResult, SettingsRepository, KEY_EMERGENCY_CONTACT, KEY_FALL_DETECTION_ENABLED,
};
use log::{error, info, warn};

/// Where a setter's value ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStatus {
    Persisted,
    /// Durable write failed; the value lives only for this process.
    MemoryOnly,
}

/// Settings facade over a key-value repository.
pub struct SettingsStore<R: SettingsRepository> {
    repo: R,
    current: Settings,
}

impl<R: SettingsRepository> SettingsStore<R> {
    /// Creates a store holding default settings until `load()` runs.
    pub fn new(repo: R) -> Self {
        Self {
            repo,
            current: Settings::default(),
        }
    }

    /// Reads persisted settings, replacing the in-memory copy.
    pub fn load(&mut self) -> &Settings {
        let fall_detection_enabled = self.load_enabled();
        let emergency_contact = self.load_contact();
        self.current = Settings::new(fall_detection_enabled, emergency_contact);
        info!(
            "event=settings_load module=service status=ok enabled={} has_contact={}",
            self.current.fall_detection_enabled,
            self.current.emergency_contact.is_some()
        );
        &self.current
    }

    pub fn current(&self) -> &Settings {
        &self.current
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn set_enabled(&mut self, enabled: bool) -> WriteStatus {
        self.current.fall_detection_enabled = enabled;
        let status = self.write(
            KEY_FALL_DETECTION_ENABLED,
            self.repo
                .put_value(KEY_FALL_DETECTION_ENABLED, bool_value(enabled)),
        );
        info!(
            "event=settings_set_enabled module=service enabled={} write={:?}",
            enabled, status
        );
        status
    }

    /// Validates and stores the emergency contact.
    ///
    /// # Errors
    /// - Returns the validation error unchanged; nothing is written.
    pub fn set_contact(&mut self, raw: &str) -> Result<WriteStatus, ContactValidationError> {
        let contact = EmergencyContact::parse(raw).inspect_err(|err| {
            warn!(
                "event=settings_set_contact module=service status=rejected error={}",
                err
            );
        })?;
        let status = self.write(
            KEY_EMERGENCY_CONTACT,
            self.repo.put_value(KEY_EMERGENCY_CONTACT, contact.digits()),
        );
        info!(
            "event=settings_set_contact module=service contact={} write={:?}",
            contact.masked(),
            status
        );
        self.current.emergency_contact = Some(contact);
        Ok(status)
    }

    pub fn clear_contact(&mut self) -> WriteStatus {
        self.current.emergency_contact = None;
        self.write(
            KEY_EMERGENCY_CONTACT,
            self.repo.delete_value(KEY_EMERGENCY_CONTACT),
        )
    }

    fn write(&self, key: &str, result: RepoResult<()>) -> WriteStatus {
        match result {
            Ok(()) => WriteStatus::Persisted,
            Err(err) => {
                error!(
                    "event=settings_write module=service status=error key={} error={}",
                    key, err
                );
                WriteStatus::MemoryOnly
            }
        }
    }

    fn load_enabled(&self) -> bool {
        match self.repo.get_value(KEY_FALL_DETECTION_ENABLED) {
            Ok(None) => false,
            Ok(Some(raw)) => parse_bool(&raw).unwrap_or_else(|| {
                warn!(
                    "event=settings_load module=service status=corrupt key={} fallback=false",
                    KEY_FALL_DETECTION_ENABLED
                );
                false
            }),
            Err(err) => {
                error!(
                    "event=settings_load module=service status=error key={} error={}",
                    KEY_FALL_DETECTION_ENABLED, err
                );
                false
            }
        }
    }

    fn load_contact(&self) -> Option<EmergencyContact> {
        match self.repo.get_value(KEY_EMERGENCY_CONTACT) {
            Ok(None) => None,
            Ok(Some(raw)) => match EmergencyContact::parse(&raw) {
                Ok(contact) => Some(contact),
                Err(err) => {
                    warn!(
                        "event=settings_load module=service status=corrupt key={} error={}",
                        KEY_EMERGENCY_CONTACT, err
                    );
                    None
                }
            },
            Err(err) => {
                error!(
                    "event=settings_load module=service status=error key={} error={}",
                    KEY_EMERGENCY_CONTACT, err
                );
                None
            }
        }
    }
}

fn bool_value(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_bool, SettingsStore, WriteStatus};
    use crate::model::contact::ContactValidationError;
    use crate::repo::settings_repo::{
        SettingsRepository, SqliteSettingsRepository, KEY_EMERGENCY_CONTACT,
        KEY_FALL_DETECTION_ENABLED,
    };

    fn store() -> SettingsStore<SqliteSettingsRepository> {
        SettingsStore::new(SqliteSettingsRepository::open_in_memory().expect("open repo"))
    }

    #[test]
    fn empty_storage_loads_defaults() {
        let mut store = store();
        let settings = store.load();
        assert!(!settings.fall_detection_enabled);
        assert!(settings.emergency_contact.is_none());
    }

    #[test]
    fn setters_write_through() {
        let mut store = store();
        assert_eq!(store.set_enabled(true), WriteStatus::Persisted);
        assert_eq!(
            store.set_contact("(11) 98765-4321").expect("valid contact"),
            WriteStatus::Persisted
        );

        let repo = store.repository();
        assert_eq!(
            repo.get_value(KEY_FALL_DETECTION_ENABLED)
                .expect("read")
                .as_deref(),
            Some("true")
        );
        assert_eq!(
            repo.get_value(KEY_EMERGENCY_CONTACT).expect("read").as_deref(),
            Some("11987654321")
        );
    }

    #[test]
    fn invalid_contact_is_not_written() {
        let mut store = store();
        let err = store.set_contact("12345").expect_err("too short");
        assert_eq!(err, ContactValidationError::InvalidLength(5));
        assert_eq!(
            store
                .repository()
                .get_value(KEY_EMERGENCY_CONTACT)
                .expect("read"),
            None
        );
        assert!(store.current().emergency_contact.is_none());
    }

    #[test]
    fn corrupt_fields_fall_back_individually() {
        let mut store = store();
        store.set_contact("11987654321").expect("valid contact");
        store
            .repository()
            .put_value(KEY_FALL_DETECTION_ENABLED, "yes")
            .expect("write raw");

        let settings = store.load().clone();
        assert!(!settings.fall_detection_enabled);
        assert_eq!(
            settings.emergency_contact.as_ref().map(|c| c.digits()),
            Some("11987654321")
        );
    }

    #[test]
    fn parse_bool_accepts_only_canonical_values() {
        assert_eq!(parse_bool("true"), Some(true));
        assert_eq!(parse_bool(" false "), Some(false));
        assert_eq!(parse_bool("1"), None);
    }
}
