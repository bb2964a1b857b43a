//! Interaction log entries.
//!
//! # Invariants
//! - Interactions are append-only; the only mutation is deletion.
//! - `contact_id` always references a live contact.

use crate::model::contact::ContactId;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier for an interaction.
pub type InteractionId = Uuid;

/// Channel used for an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Call,
    Meeting,
    Message,
    Other,
}

impl InteractionKind {
    /// Storage/export name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Meeting => "meeting",
            Self::Message => "message",
            Self::Other => "other",
        }
    }

    /// Parses a storage name. Returns `None` for unknown values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "call" => Some(Self::Call),
            "meeting" => Some(Self::Meeting),
            "message" => Some(Self::Message),
            "other" => Some(Self::Other),
            _ => None,
        }
    }
}

/// One logged touchpoint with a contact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: InteractionId,
    pub contact_id: ContactId,
    pub occurred_at: NaiveDateTime,
    pub kind: InteractionKind,
    pub note: String,
}

impl Interaction {
    /// Creates an interaction with a generated id.
    pub fn new(
        contact_id: ContactId,
        occurred_at: NaiveDateTime,
        kind: InteractionKind,
        note: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact_id,
            occurred_at,
            kind,
            note: note.into(),
        }
    }
}
