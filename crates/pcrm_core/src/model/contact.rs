//! Contact domain model.
//!
//! # Responsibility
//! - Define the canonical person record scored and linked by the engine.
//! - Validate user-editable fields before they reach storage.
//!
//! # Invariants
//! - `id` is stable and never reused for another contact.
//! - `importance` is a finite value within `[0, 1]`.
//! - `display_name` is non-empty after trimming.

use crate::model::date::PartialDate;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a contact.
pub type ContactId = Uuid;

/// Importance assigned when the caller does not provide one.
///
/// Uniform weight: every contact starts with the same tilt.
pub const DEFAULT_IMPORTANCE: f64 = 0.5;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Person tracked by the relationship manager.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: ContactId,
    pub display_name: String,
    pub email: Option<String>,
    /// Year is optional; month/day drive the yearly birthday occasion.
    pub birthday: Option<PartialDate>,
    pub how_met: Option<String>,
    /// Free-form notes in insertion order.
    pub notes: Vec<String>,
    /// Weight in `[0, 1]` tilting the engagement score toward urgency.
    pub importance: f64,
    /// Day the contact was added; anchors the new-contact grace period.
    pub created_on: NaiveDate,
    /// Normalized lowercase tags.
    pub tags: Vec<String>,
}

/// Validation failures for contact fields.
#[derive(Debug, Clone, PartialEq)]
pub enum ContactValidationError {
    EmptyDisplayName,
    InvalidEmail(String),
    ImportanceOutOfRange(f64),
    InvalidBirthday(PartialDate),
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDisplayName => write!(f, "contact display name cannot be empty"),
            Self::InvalidEmail(value) => write!(f, "invalid email address `{value}`"),
            Self::ImportanceOutOfRange(value) => {
                write!(f, "importance must be within [0, 1], got {value}")
            }
            Self::InvalidBirthday(date) => write!(f, "invalid birthday `{date}`"),
        }
    }
}

impl Error for ContactValidationError {}

impl Contact {
    /// Creates a contact with a generated id and default importance.
    pub fn new(display_name: impl Into<String>, created_on: NaiveDate) -> Self {
        Self::with_id(Uuid::new_v4(), display_name, created_on)
    }

    /// Creates a contact with a caller-provided stable id.
    pub fn with_id(id: ContactId, display_name: impl Into<String>, created_on: NaiveDate) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            email: None,
            birthday: None,
            how_met: None,
            notes: Vec::new(),
            importance: DEFAULT_IMPORTANCE,
            created_on,
            tags: Vec::new(),
        }
    }

    /// Validates user-editable fields.
    ///
    /// # Errors
    /// - Empty display name.
    /// - Email present but not shaped like an address.
    /// - Importance outside `[0, 1]` or not finite.
    /// - Birthday that is not a real calendar date.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.display_name.trim().is_empty() {
            return Err(ContactValidationError::EmptyDisplayName);
        }
        if let Some(email) = self.email.as_deref() {
            if !email.is_empty() && !is_valid_email(email) {
                return Err(ContactValidationError::InvalidEmail(email.to_string()));
            }
        }
        if !self.importance.is_finite() || !(0.0..=1.0).contains(&self.importance) {
            return Err(ContactValidationError::ImportanceOutOfRange(
                self.importance,
            ));
        }
        if let Some(birthday) = self.birthday {
            if !birthday.is_valid() {
                return Err(ContactValidationError::InvalidBirthday(birthday));
            }
        }
        Ok(())
    }

    /// Returns whether `query` names this contact.
    ///
    /// Case-insensitive; a single word matches any word of the display name,
    /// several words must match the full name.
    pub fn matches_name(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return false;
        }
        let name = self.display_name.trim().to_lowercase();
        if query.split_whitespace().count() == 1 {
            return name.split_whitespace().any(|part| part == query);
        }
        let normalized_query = query.split_whitespace().collect::<Vec<_>>().join(" ");
        let normalized_name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        normalized_query == normalized_name
    }
}

/// Returns whether `email` looks like a deliverable address.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::{Contact, ContactValidationError};
    use crate::model::date::PartialDate;
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn new_contact_is_valid_with_defaults() {
        let contact = Contact::new("Ada Lovelace", day(2024, 1, 1));
        assert!(contact.validate().is_ok());
        assert_eq!(contact.importance, super::DEFAULT_IMPORTANCE);
    }

    #[test]
    fn validate_rejects_out_of_range_importance() {
        let mut contact = Contact::new("Ada", day(2024, 1, 1));
        contact.importance = 1.5;
        assert!(matches!(
            contact.validate(),
            Err(ContactValidationError::ImportanceOutOfRange(_))
        ));
        contact.importance = f64::NAN;
        assert!(contact.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_email_and_birthday() {
        let mut contact = Contact::new("Ada", day(2024, 1, 1));
        contact.email = Some("not-an-email".to_string());
        assert!(matches!(
            contact.validate(),
            Err(ContactValidationError::InvalidEmail(_))
        ));

        contact.email = Some("ada@example.org".to_string());
        contact.birthday = Some(PartialDate::month_day(4, 31));
        assert!(matches!(
            contact.validate(),
            Err(ContactValidationError::InvalidBirthday(_))
        ));
    }

    #[test]
    fn matches_name_is_case_insensitive() {
        let contact = Contact::new("Grace  Hopper", day(2024, 1, 1));
        assert!(contact.matches_name("grace"));
        assert!(contact.matches_name("HOPPER"));
        assert!(contact.matches_name("grace hopper"));
        assert!(!contact.matches_name("grace kelly"));
        assert!(!contact.matches_name(""));
    }
}
