//! Core domain logic for the personal relationship manager.
//! This crate is the single source of truth for contact data, engagement
//! scoring and the relationship graph.

pub mod config;
pub mod db;
pub mod engine;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod sync;

pub use config::{ConfigurationError, EngineConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use engine::dashboard::{
    build_graph, export_graph, render_dashboard, DashboardRender, DiagnosticKind,
    RenderDiagnostic,
};
pub use engine::graph::{GraphError, GraphExport, RelationshipGraph, UnknownContactError};
pub use engine::recurrence::{
    next_occurrence, previous_occurrence, validate_month_day, InvalidDateError,
};
pub use engine::scorer::{score, score_detail, EngagementScore};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::contact::{Contact, ContactId, ContactValidationError, DEFAULT_IMPORTANCE};
pub use model::date::PartialDate;
pub use model::gift::{Gift, GiftDirection, GiftId, GiftValidationError};
pub use model::interaction::{Interaction, InteractionId, InteractionKind};
pub use model::occasion::{
    Occasion, OccasionId, OccasionKind, OccasionValidationError, Recurrence,
};
pub use model::relationship::{EdgeValidationError, RelationshipEdge, RelationshipKind};
pub use model::suggestion::{SuggestionCategory, SuggestionItem};
pub use repo::contact_repo::{
    ContactRepository, ContactStore, RepoError, RepoResult, SqliteContactRepository,
};
pub use service::contact_service::{ContactService, ServiceError, ServiceResult};
pub use sync::notification_sink::{
    push_due_reminders, NotificationSink, PushReport, ReminderNotice, SinkError, SinkRegistry,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::core_version;

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
