//! Recurring and one-shot personal dates.
//!
//! # Responsibility
//! - Describe birthdays, anniversaries and custom reminders attached to a
//!   contact.
//! - Validate write-side input; read-side calendar checks belong to the
//!   recurrence resolver so corrupt rows surface as render diagnostics.
//!
//! # Invariants
//! - `Recurrence::Once` occasions carry a full date (year set).
//! - `acknowledged_on`, when set, marks every occurrence on or before that day
//!   as handled.

use crate::model::contact::ContactId;
use crate::model::date::PartialDate;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for an occasion.
pub type OccasionId = Uuid;

/// What the occasion celebrates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccasionKind {
    Birthday,
    Anniversary,
    Custom,
}

impl OccasionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Birthday => "birthday",
            Self::Anniversary => "anniversary",
            Self::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "birthday" => Some(Self::Birthday),
            "anniversary" => Some(Self::Anniversary),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

/// How often an occasion repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recurrence {
    #[default]
    Yearly,
    /// Single dated reminder.
    Once,
}

impl Recurrence {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Yearly => "yearly",
            Self::Once => "once",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "yearly" => Some(Self::Yearly),
            "once" => Some(Self::Once),
            _ => None,
        }
    }
}

/// Dated event attached to one contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occasion {
    pub id: OccasionId,
    pub contact_id: ContactId,
    pub kind: OccasionKind,
    /// Human-readable label, e.g. "Birthday" or a reminder message.
    pub label: String,
    /// Stored month/day (plus year for one-shot reminders).
    pub date: PartialDate,
    pub recurrence: Recurrence,
    /// Days of advance notice; falls back to the engine default when `None`.
    pub lead_days: Option<u32>,
    pub acknowledged_on: Option<NaiveDate>,
}

/// Validation failures for occasion writes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OccasionValidationError {
    EmptyLabel,
    InvalidDate(PartialDate),
    MissingYear(PartialDate),
}

impl Display for OccasionValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyLabel => write!(f, "occasion label cannot be empty"),
            Self::InvalidDate(date) => write!(f, "occasion date `{date}` is not a calendar date"),
            Self::MissingYear(date) => {
                write!(f, "one-shot occasion date `{date}` must include a year")
            }
        }
    }
}

impl Error for OccasionValidationError {}

impl Occasion {
    /// Creates a yearly occasion with a generated id.
    pub fn yearly(
        contact_id: ContactId,
        kind: OccasionKind,
        label: impl Into<String>,
        date: PartialDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_id,
            kind,
            label: label.into(),
            date,
            recurrence: Recurrence::Yearly,
            lead_days: None,
            acknowledged_on: None,
        }
    }

    /// Creates the yearly birthday occasion for a contact.
    pub fn birthday(contact_id: ContactId, date: PartialDate) -> Self {
        Self::yearly(contact_id, OccasionKind::Birthday, "Birthday", date)
    }

    /// Creates a one-shot custom reminder due on `due_on`.
    pub fn reminder(contact_id: ContactId, message: impl Into<String>, due_on: NaiveDate) -> Self {
        Self {
            recurrence: Recurrence::Once,
            ..Self::yearly(contact_id, OccasionKind::Custom, message, due_on.into())
        }
    }

    /// Sets the advance-notice window.
    pub fn with_lead_days(mut self, lead_days: u32) -> Self {
        self.lead_days = Some(lead_days);
        self
    }

    /// Validates write-side invariants.
    pub fn validate(&self) -> Result<(), OccasionValidationError> {
        if self.label.trim().is_empty() {
            return Err(OccasionValidationError::EmptyLabel);
        }
        if self.recurrence == Recurrence::Once && self.date.year.is_none() {
            return Err(OccasionValidationError::MissingYear(self.date));
        }
        if !self.date.is_valid() {
            return Err(OccasionValidationError::InvalidDate(self.date));
        }
        Ok(())
    }

    /// Returns whether the occurrence scheduled on `scheduled` was handled.
    pub fn is_acknowledged_for(&self, scheduled: NaiveDate) -> bool {
        self.acknowledged_on
            .is_some_and(|acknowledged| acknowledged >= scheduled)
    }
}

#[cfg(test)]
mod tests {
    use super::{Occasion, OccasionValidationError, Recurrence};
    use crate::model::date::PartialDate;
    use chrono::NaiveDate;
    use uuid::Uuid;

    #[test]
    fn reminder_is_one_shot_with_full_date() {
        let due = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
        let occasion = Occasion::reminder(Uuid::new_v4(), "call about the move", due);
        assert_eq!(occasion.recurrence, Recurrence::Once);
        assert_eq!(occasion.date.to_full_date(), Some(due));
        assert!(occasion.validate().is_ok());
    }

    #[test]
    fn validate_rejects_bad_dates() {
        let mut occasion = Occasion::birthday(Uuid::new_v4(), PartialDate::month_day(2, 30));
        assert!(matches!(
            occasion.validate(),
            Err(OccasionValidationError::InvalidDate(_))
        ));

        occasion.date = PartialDate::month_day(5, 5);
        occasion.recurrence = Recurrence::Once;
        assert!(matches!(
            occasion.validate(),
            Err(OccasionValidationError::MissingYear(_))
        ));
    }

    #[test]
    fn acknowledgement_covers_earlier_occurrences() {
        let mut occasion = Occasion::birthday(Uuid::new_v4(), PartialDate::month_day(3, 1));
        let scheduled = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert!(!occasion.is_acknowledged_for(scheduled));
        occasion.acknowledged_on = NaiveDate::from_ymd_opt(2025, 3, 2);
        assert!(occasion.is_acknowledged_for(scheduled));
        assert!(!occasion.is_acknowledged_for(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap()));
    }
}
