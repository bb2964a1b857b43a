//! Gifts exchanged with a contact.
//!
//! # Invariants
//! - `contact_id` always references a live contact.
//! - `occasion_id`, when set, names an occasion of the same contact; deleting
//!   that occasion clears the link and keeps the gift.

use crate::model::contact::ContactId;
use crate::model::occasion::OccasionId;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier for a gift.
pub type GiftId = Uuid;

/// Whether the gift went to the contact or came from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GiftDirection {
    Given,
    Received,
}

impl GiftDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Given => "given",
            Self::Received => "received",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "given" => Some(Self::Given),
            "received" => Some(Self::Received),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gift {
    pub id: GiftId,
    pub contact_id: ContactId,
    pub description: String,
    pub direction: GiftDirection,
    pub exchanged_on: Option<NaiveDate>,
    pub occasion_id: Option<OccasionId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GiftValidationError {
    EmptyDescription,
}

impl Display for GiftValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDescription => write!(f, "gift description cannot be empty"),
        }
    }
}

impl Error for GiftValidationError {}

impl Gift {
    /// Creates an undated gift with a generated id and no occasion link.
    pub fn new(
        contact_id: ContactId,
        description: impl Into<String>,
        direction: GiftDirection,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_id,
            description: description.into(),
            direction,
            exchanged_on: None,
            occasion_id: None,
        }
    }

    pub fn on(mut self, date: NaiveDate) -> Self {
        self.exchanged_on = Some(date);
        self
    }

    pub fn for_occasion(mut self, occasion_id: OccasionId) -> Self {
        self.occasion_id = Some(occasion_id);
        self
    }

    pub fn validate(&self) -> Result<(), GiftValidationError> {
        if self.description.trim().is_empty() {
            return Err(GiftValidationError::EmptyDescription);
        }
        Ok(())
    }
}
