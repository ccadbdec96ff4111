//! Native capability declarations reported by the host app.

use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Native capability the host runtime may or may not provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PlatformCapability {
    Accelerometer,
    Telephony,
    Clipboard,
    Notification,
}

impl PlatformCapability {
    /// Stable string id used by the host declaration.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accelerometer => PLATFORM_CAPABILITY_ACCELEROMETER,
            Self::Telephony => PLATFORM_CAPABILITY_TELEPHONY,
            Self::Clipboard => PLATFORM_CAPABILITY_CLIPBOARD,
            Self::Notification => PLATFORM_CAPABILITY_NOTIFICATION,
        }
    }

    /// What degrades when the capability is missing.
    pub fn degradation(self) -> &'static str {
        match self {
            Self::Accelerometer => "Fall detection is disabled; no motion readings are available.",
            Self::Telephony => "Emergency calls fall back to showing the number for manual dialing.",
            Self::Clipboard => "The emergency number is shown but cannot be copied.",
            Self::Notification => "Status messages such as \"dialing\" are not displayed.",
        }
    }
}

pub const PLATFORM_CAPABILITY_ACCELEROMETER: &str = "accelerometer";
pub const PLATFORM_CAPABILITY_TELEPHONY: &str = "telephony";
pub const PLATFORM_CAPABILITY_CLIPBOARD: &str = "clipboard";
pub const PLATFORM_CAPABILITY_NOTIFICATION: &str = "notification";

const SUPPORTED_PLATFORM_CAPABILITY_STRINGS: &[&str] = &[
    PLATFORM_CAPABILITY_ACCELEROMETER,
    PLATFORM_CAPABILITY_TELEPHONY,
    PLATFORM_CAPABILITY_CLIPBOARD,
    PLATFORM_CAPABILITY_NOTIFICATION,
];

pub fn supported_platform_capability_strings() -> &'static [&'static str] {
    SUPPORTED_PLATFORM_CAPABILITY_STRINGS
}

/// Parses one capability id. Ids are lowercase and matched exactly.
pub fn parse_platform_capability(
    value: &str,
) -> Result<PlatformCapability, PlatformCapabilityError> {
    let normalized = value.trim();
    if normalized.is_empty() {
        return Err(PlatformCapabilityError::EmptyCapability);
    }

    match normalized {
        PLATFORM_CAPABILITY_ACCELEROMETER => Ok(PlatformCapability::Accelerometer),
        PLATFORM_CAPABILITY_TELEPHONY => Ok(PlatformCapability::Telephony),
        PLATFORM_CAPABILITY_CLIPBOARD => Ok(PlatformCapability::Clipboard),
        PLATFORM_CAPABILITY_NOTIFICATION => Ok(PlatformCapability::Notification),
        other => Err(PlatformCapabilityError::UnsupportedCapability(
            other.to_string(),
        )),
    }
}

/// Set of capabilities declared by the host.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet {
    declared: BTreeSet<PlatformCapability>,
}

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every capability; useful for hosts with the full native stack.
    pub fn all() -> Self {
        [
            PlatformCapability::Accelerometer,
            PlatformCapability::Telephony,
            PlatformCapability::Clipboard,
            PlatformCapability::Notification,
        ]
        .into_iter()
        .collect()
    }

    /// Parses host declarations, rejecting the first unknown id.
    pub fn parse<S: AsRef<str>>(values: &[S]) -> Result<Self, PlatformCapabilityError> {
        values
            .iter()
            .map(|value| parse_platform_capability(value.as_ref()))
            .collect()
    }

    pub fn contains(&self, capability: PlatformCapability) -> bool {
        self.declared.contains(&capability)
    }

    pub fn insert(&mut self, capability: PlatformCapability) {
        self.declared.insert(capability);
    }

    /// Capabilities the host did not declare, in stable order.
    pub fn missing(&self) -> Vec<PlatformCapability> {
        Self::all()
            .declared
            .into_iter()
            .filter(|capability| !self.declared.contains(capability))
            .collect()
    }
}

impl FromIterator<PlatformCapability> for CapabilitySet {
    fn from_iter<T: IntoIterator<Item = PlatformCapability>>(iter: T) -> Self {
        Self {
            declared: iter.into_iter().collect(),
        }
    }
}

/// Capability parse errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlatformCapabilityError {
    EmptyCapability,
    UnsupportedCapability(String),
}

impl Display for PlatformCapabilityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCapability => write!(f, "platform capability value must not be empty"),
            Self::UnsupportedCapability(value) => {
                write!(f, "platform capability is unsupported: {value}")
            }
        }
    }
}

impl Error for PlatformCapabilityError {}
