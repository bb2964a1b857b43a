//! Outbound reminder notifications.
//!
//! # Responsibility
//! - Define the `NotificationSink` seam for delivering due reminders to an
//!   external channel (desktop notification, mail, calendar).
//! - Hold registered sinks keyed by a stable id.
//! - Push the occasion-derived part of a dashboard render to a sink.
//!
//! # Invariants
//! - Sink ids are non-empty `[a-z0-9_-]` after trimming and unique per
//!   registry.
//! - One failing notice never aborts a push; failures are collected in the
//!   report.

use crate::config::EngineConfig;
use crate::engine::dashboard::render_dashboard;
use crate::model::contact::ContactId;
use crate::model::suggestion::{SuggestionCategory, SuggestionItem};
use crate::repo::contact_repo::{ContactStore, RepoResult};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// One reminder handed to a sink.
#[derive(Debug, Clone, PartialEq)]
pub struct ReminderNotice {
    pub contact_id: ContactId,
    pub contact_name: String,
    pub category: SuggestionCategory,
    pub due_on: Option<NaiveDate>,
    pub message: String,
}

/// Delivery failure reported by a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// Channel is not reachable right now.
    Unavailable(String),
    /// Channel refused this notice.
    Rejected(String),
}

impl Display for SinkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "notification sink unavailable: {message}"),
            Self::Rejected(message) => write!(f, "notification rejected: {message}"),
        }
    }
}

impl Error for SinkError {}

/// Delivery channel for due reminders.
pub trait NotificationSink {
    /// Stable sink identifier, e.g. `desktop` or `mail`.
    fn sink_id(&self) -> &str;

    /// Delivers one notice.
    fn push_reminder(&self, notice: &ReminderNotice) -> Result<(), SinkError>;
}

/// Outcome of one push run.
#[derive(Debug, Default)]
pub struct PushReport {
    pub delivered: usize,
    pub failures: Vec<(ContactId, SinkError)>,
    /// Render diagnostics carried over from the dashboard pass.
    pub skipped: usize,
}

/// Renders the dashboard for `as_of` and pushes every overdue-reminder and
/// upcoming-occasion item to `sink`.
///
/// # Errors
/// - Store failures from the render. Sink failures land in the report.
pub fn push_due_reminders<S, N>(
    store: &S,
    sink: &N,
    as_of: NaiveDate,
    config: &EngineConfig,
) -> RepoResult<PushReport>
where
    S: ContactStore + ?Sized,
    N: NotificationSink + ?Sized,
{
    let render = render_dashboard(store, as_of, config)?;
    let names: HashMap<ContactId, String> = store
        .list_contacts()?
        .into_iter()
        .map(|contact| (contact.id, contact.display_name))
        .collect();

    let mut report = PushReport {
        skipped: render.diagnostics.len(),
        ..PushReport::default()
    };
    for item in render.items.iter().filter(|item| is_reminder(item)) {
        let notice = ReminderNotice {
            contact_id: item.contact_id,
            contact_name: names.get(&item.contact_id).cloned().unwrap_or_default(),
            category: item.category,
            due_on: item.due_on,
            message: item.rationale.clone(),
        };
        match sink.push_reminder(&notice) {
            Ok(()) => report.delivered += 1,
            Err(err) => {
                warn!(
                    "event=reminder_push module=sync status=error sink={} contact={} error={err}",
                    sink.sink_id(),
                    item.contact_id
                );
                report.failures.push((item.contact_id, err));
            }
        }
    }

    info!(
        "event=reminder_push module=sync status=ok sink={} delivered={} failed={}",
        sink.sink_id(),
        report.delivered,
        report.failures.len()
    );
    Ok(report)
}

fn is_reminder(item: &SuggestionItem) -> bool {
    matches!(
        item.category,
        SuggestionCategory::OverdueReminder | SuggestionCategory::UpcomingOccasion
    )
}

/// Sink registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SinkRegistryError {
    InvalidSinkId(String),
    DuplicateSinkId(String),
}

impl Display for SinkRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSinkId(value) => write!(f, "sink id is invalid: {value}"),
            Self::DuplicateSinkId(value) => write!(f, "sink id already registered: {value}"),
        }
    }
}

impl Error for SinkRegistryError {}

/// Runtime registry of notification sinks.
#[derive(Default)]
pub struct SinkRegistry {
    sinks: BTreeMap<String, Arc<dyn NotificationSink>>,
}

impl SinkRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one sink.
    pub fn register(&mut self, sink: Arc<dyn NotificationSink>) -> Result<(), SinkRegistryError> {
        let sink_id = sink.sink_id().trim().to_string();
        if !is_valid_sink_id(&sink_id) {
            return Err(SinkRegistryError::InvalidSinkId(sink_id));
        }
        if self.sinks.contains_key(sink_id.as_str()) {
            return Err(SinkRegistryError::DuplicateSinkId(sink_id));
        }
        self.sinks.insert(sink_id, sink);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Returns sorted sink ids.
    pub fn sink_ids(&self) -> Vec<String> {
        self.sinks.keys().cloned().collect()
    }

    pub fn get(&self, sink_id: &str) -> Option<Arc<dyn NotificationSink>> {
        self.sinks.get(sink_id.trim()).cloned()
    }

    /// Pushes due reminders to every registered sink, in id order.
    ///
    /// # Errors
    /// - The first store failure; later sinks are not attempted.
    pub fn push_all<S: ContactStore + ?Sized>(
        &self,
        store: &S,
        as_of: NaiveDate,
        config: &EngineConfig,
    ) -> RepoResult<BTreeMap<String, PushReport>> {
        let mut reports = BTreeMap::new();
        for (sink_id, sink) in &self.sinks {
            let report = push_due_reminders(store, sink.as_ref(), as_of, config)?;
            reports.insert(sink_id.clone(), report);
        }
        Ok(reports)
    }
}

fn is_valid_sink_id(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}

#[cfg(test)]
mod tests {
    use super::{NotificationSink, ReminderNotice, SinkError, SinkRegistry, SinkRegistryError};
    use std::sync::Arc;

    struct NullSink {
        sink_id: String,
    }

    impl NullSink {
        fn new(sink_id: &str) -> Self {
            Self {
                sink_id: sink_id.to_string(),
            }
        }
    }

    impl NotificationSink for NullSink {
        fn sink_id(&self) -> &str {
            &self.sink_id
        }

        fn push_reminder(&self, _notice: &ReminderNotice) -> Result<(), SinkError> {
            Ok(())
        }
    }

    #[test]
    fn registers_sinks_in_id_order() {
        let mut registry = SinkRegistry::new();
        registry
            .register(Arc::new(NullSink::new("mail")))
            .expect("mail sink should register");
        registry
            .register(Arc::new(NullSink::new(" desktop ")))
            .expect("trimmed sink id should register");
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.sink_ids(), vec!["desktop", "mail"]);
        assert!(registry.get("  desktop ").is_some());
    }

    #[test]
    fn rejects_invalid_or_duplicate_sink_id() {
        let mut registry = SinkRegistry::new();
        assert!(matches!(
            registry.register(Arc::new(NullSink::new("Desktop Popup"))),
            Err(SinkRegistryError::InvalidSinkId(_))
        ));
        assert!(matches!(
            registry.register(Arc::new(NullSink::new("   "))),
            Err(SinkRegistryError::InvalidSinkId(_))
        ));

        registry
            .register(Arc::new(NullSink::new("desktop")))
            .expect("first sink should register");
        assert!(matches!(
            registry.register(Arc::new(NullSink::new("desktop"))),
            Err(SinkRegistryError::DuplicateSinkId(_))
        ));
        assert!(registry.get("   ").is_none());
        assert!(!registry.is_empty());
    }
}
