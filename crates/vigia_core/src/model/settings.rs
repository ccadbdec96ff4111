//! User settings for the fall detection feature.

use crate::model::contact::EmergencyContact;
use serde::{Deserialize, Serialize};

/// Persisted user preferences.
///
/// `Default` is the safe fallback used whenever storage is empty or
/// unreadable: detection off, no contact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub fall_detection_enabled: bool,
    pub emergency_contact: Option<EmergencyContact>,
}

impl Settings {
    pub fn new(fall_detection_enabled: bool, emergency_contact: Option<EmergencyContact>) -> Self {
        Self {
            fall_detection_enabled,
            emergency_contact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Settings;

    #[test]
    fn default_is_disabled_without_contact() {
        let settings = Settings::default();
        assert!(!settings.fall_detection_enabled);
        assert!(settings.emergency_contact.is_none());
    }
}
