//! Emergency contact model and validation.
//!
//! # Responsibility
//! - Normalize user-entered phone numbers into bare digit strings.
//! - Reject anything that is not a Brazilian number with area code.
//!
//! # Invariants
//! - A constructed `EmergencyContact` always matches `^[0-9]{10,11}$`.
//! - Log output only ever shows the masked form (`masked()`).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const CONTACT_MIN_DIGITS: usize = 10;
pub const CONTACT_MAX_DIGITS: usize = 11;

static CONTACT_DIGITS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{10,11}$").expect("valid contact regex"));

/// Formatting characters accepted in user input and stripped before validation.
const FORMATTING_CHARS: &[char] = &[' ', '(', ')', '-', '.'];

/// Validated emergency phone number (digits only, with area code).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmergencyContact(String);

impl EmergencyContact {
    /// Parses user input such as `"(11) 98765-4321"` into a contact.
    ///
    /// # Errors
    /// - `Empty` when nothing remains after trimming.
    /// - `InvalidCharacter` when input holds anything besides digits and
    ///   common formatting characters.
    /// - `InvalidLength` when the digit count is outside 10..=11.
    pub fn parse(raw: &str) -> Result<Self, ContactValidationError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(ContactValidationError::Empty);
        }

        if let Some(bad) = trimmed
            .chars()
            .find(|ch| !ch.is_ascii_digit() && !FORMATTING_CHARS.contains(ch))
        {
            return Err(ContactValidationError::InvalidCharacter(bad));
        }

        let digits: String = trimmed.chars().filter(|ch| ch.is_ascii_digit()).collect();
        if !CONTACT_DIGITS_RE.is_match(&digits) {
            return Err(ContactValidationError::InvalidLength(digits.len()));
        }

        Ok(Self(digits))
    }

    /// Bare digit string, as persisted and dialed.
    pub fn digits(&self) -> &str {
        &self.0
    }

    /// `tel:` URI pre-filled with this number.
    pub fn tel_uri(&self) -> String {
        format!("tel:{}", self.0)
    }

    /// Masked form for diagnostics: only the last four digits are visible.
    pub fn masked(&self) -> String {
        let visible = self.0.len().saturating_sub(4);
        format!("{}{}", "*".repeat(visible), &self.0[visible..])
    }
}

impl Display for EmergencyContact {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmergencyContact {
    type Error = ContactValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmergencyContact> for String {
    fn from(value: EmergencyContact) -> Self {
        value.0
    }
}

/// Contact validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    Empty,
    InvalidCharacter(char),
    InvalidLength(usize),
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "emergency contact must not be empty"),
            Self::InvalidCharacter(ch) => {
                write!(f, "emergency contact contains invalid character `{ch}`")
            }
            Self::InvalidLength(len) => write!(
                f,
                "emergency contact must have {CONTACT_MIN_DIGITS}-{CONTACT_MAX_DIGITS} digits, got {len}"
            ),
        }
    }
}

impl Error for ContactValidationError {}
