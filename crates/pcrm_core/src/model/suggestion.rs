//! Derived dashboard items. Never persisted.

use crate::model::contact::ContactId;
use chrono::NaiveDate;
use serde::Serialize;

/// Feed section an item belongs to.
///
/// Declaration order is the feed order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionCategory {
    /// A scheduled date passed without being acknowledged.
    OverdueReminder,
    /// Adjusted engagement score above the overdue threshold.
    OverdueContact,
    /// An occasion falls inside its advance-notice window.
    UpcomingOccasion,
    /// Top-ranked contact that is not yet overdue.
    Suggested,
}

impl SuggestionCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OverdueReminder => "overdue_reminder",
            Self::OverdueContact => "overdue_contact",
            Self::UpcomingOccasion => "upcoming_occasion",
            Self::Suggested => "suggested",
        }
    }
}

/// One row of the suggestion feed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuggestionItem {
    pub contact_id: ContactId,
    pub category: SuggestionCategory,
    /// Adjusted engagement score of the contact, in `[0, 1]`.
    pub score: f64,
    pub rationale: String,
    /// Scheduled date for occasion-derived items.
    pub due_on: Option<NaiveDate>,
}
