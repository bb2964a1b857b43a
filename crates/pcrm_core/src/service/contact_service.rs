//! Contact use-case service.
//!
//! # Responsibility
//! - Provide contact, interaction, occasion, gift and relationship entry
//!   points for core callers.
//! - Keep the contact birthday and its yearly `Birthday` occasion in step.
//! - Run dashboard renders and graph exports with the service's config.
//!
//! # Invariants
//! - Service APIs never bypass repository validation/persistence contracts.
//! - The engine config held by a service has passed `validate()`.
//! - A contact has at most one `Birthday` occasion, mirroring
//!   `Contact::birthday`. Creation writes both in one transaction; every
//!   `update_contact` reconciles the mirror from the stored occasions.

use crate::config::{ConfigurationError, EngineConfig};
use crate::engine::dashboard::{self, DashboardRender, RenderDiagnostic};
use crate::engine::graph::{GraphExport, RelationshipGraph};
use crate::model::contact::{Contact, ContactId};
use crate::model::gift::{Gift, GiftId};
use crate::model::interaction::{Interaction, InteractionId, InteractionKind};
use crate::model::occasion::{Occasion, OccasionId, OccasionKind};
use crate::model::relationship::{RelationshipEdge, RelationshipKind};
use crate::repo::contact_repo::{ContactRepository, RepoError};
use chrono::{NaiveDate, NaiveDateTime};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Service error for contact use-cases.
#[derive(Debug)]
pub enum ServiceError {
    /// Engine config failed validation.
    Config(ConfigurationError),
    /// Target contact does not exist.
    ContactNotFound(ContactId),
    /// Target record (interaction, occasion, gift) does not exist.
    NotFound(Uuid),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for ServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "{err}"),
            Self::ContactNotFound(id) => write!(f, "contact not found: {id}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::ContactNotFound(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<RepoError> for ServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::UnknownContact(id) => Self::ContactNotFound(id),
            RepoError::NotFound(id) => Self::NotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ConfigurationError> for ServiceError {
    fn from(value: ConfigurationError) -> Self {
        Self::Config(value)
    }
}

/// Use-case service wrapper for the contact store and engine.
pub struct ContactService<R: ContactRepository> {
    repo: R,
    config: EngineConfig,
}

impl<R: ContactRepository> ContactService<R> {
    /// Creates a service with a validated engine config.
    pub fn new(repo: R, config: EngineConfig) -> ServiceResult<Self> {
        config.validate()?;
        Ok(Self { repo, config })
    }

    /// Creates a service with the default engine config.
    pub fn with_defaults(repo: R) -> Self {
        Self {
            repo,
            config: EngineConfig::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Persists a new contact together with its birthday occasion.
    pub fn add_contact(&self, contact: &Contact) -> ServiceResult<ContactId> {
        let birthday: Vec<Occasion> = contact
            .birthday
            .map(|date| Occasion::birthday(contact.id, date))
            .into_iter()
            .collect();
        Ok(self.repo.create_contact_with_occasions(contact, &birthday)?)
    }

    /// Replaces a contact and re-syncs its birthday occasion.
    ///
    /// An existing birthday occasion keeps its id, lead and acknowledgement
    /// when only the date changes.
    pub fn update_contact(&self, contact: &Contact) -> ServiceResult<()> {
        self.repo.update_contact(contact).map_err(|err| match err {
            RepoError::NotFound(id) => ServiceError::ContactNotFound(id),
            other => ServiceError::from(other),
        })?;

        let mut birthdays = self
            .repo
            .list_occasions(contact.id)?
            .into_iter()
            .filter(|occasion| occasion.kind == OccasionKind::Birthday);
        let current = birthdays.next();
        for duplicate in birthdays {
            self.repo.delete_occasion(duplicate.id)?;
        }

        match (current, contact.birthday) {
            (Some(mut occasion), Some(birthday)) => {
                if occasion.date != birthday {
                    occasion.date = birthday;
                    self.repo.update_occasion(&occasion)?;
                }
            }
            (Some(occasion), None) => self.repo.delete_occasion(occasion.id)?,
            (None, Some(birthday)) => {
                self.repo
                    .add_occasion(&Occasion::birthday(contact.id, birthday))?;
            }
            (None, None) => {}
        }
        Ok(())
    }

    pub fn get_contact(&self, id: ContactId) -> ServiceResult<Option<Contact>> {
        Ok(self.repo.get_contact(id)?)
    }

    /// Returns a contact or `ContactNotFound`.
    pub fn require_contact(&self, id: ContactId) -> ServiceResult<Contact> {
        self.repo
            .get_contact(id)?
            .ok_or(ServiceError::ContactNotFound(id))
    }

    pub fn list_contacts(&self) -> ServiceResult<Vec<Contact>> {
        Ok(self.repo.list_contacts()?)
    }

    /// Deletes a contact with its interactions, occasions, gifts, tags and edges.
    pub fn delete_contact(&self, id: ContactId) -> ServiceResult<()> {
        self.repo.delete_contact(id).map_err(|err| match err {
            RepoError::NotFound(id) => ServiceError::ContactNotFound(id),
            other => ServiceError::from(other),
        })
    }

    pub fn find_contacts_by_name(&self, query: &str) -> ServiceResult<Vec<Contact>> {
        Ok(self.repo.find_contacts_by_name(query)?)
    }

    pub fn list_contacts_by_tag(&self, tag: &str) -> ServiceResult<Vec<Contact>> {
        Ok(self.repo.list_contacts_by_tag(tag)?)
    }

    pub fn list_tags(&self) -> ServiceResult<Vec<String>> {
        Ok(self.repo.list_tags()?)
    }

    /// Records one interaction. The latest interaction drives recency.
    pub fn log_interaction(
        &self,
        contact_id: ContactId,
        occurred_at: NaiveDateTime,
        kind: InteractionKind,
        note: impl Into<String>,
    ) -> ServiceResult<InteractionId> {
        let interaction = Interaction::new(contact_id, occurred_at, kind, note);
        Ok(self.repo.add_interaction(&interaction)?)
    }

    pub fn list_interactions(&self, contact_id: ContactId) -> ServiceResult<Vec<Interaction>> {
        self.require_contact(contact_id)?;
        Ok(self.repo.list_interactions(contact_id)?)
    }

    pub fn delete_interaction(&self, id: InteractionId) -> ServiceResult<()> {
        Ok(self.repo.delete_interaction(id)?)
    }

    pub fn add_occasion(&self, occasion: &Occasion) -> ServiceResult<OccasionId> {
        Ok(self.repo.add_occasion(occasion)?)
    }

    /// Adds a one-shot reminder due on `due_on`.
    pub fn add_reminder(
        &self,
        contact_id: ContactId,
        message: impl Into<String>,
        due_on: NaiveDate,
    ) -> ServiceResult<OccasionId> {
        Ok(self
            .repo
            .add_occasion(&Occasion::reminder(contact_id, message, due_on))?)
    }

    pub fn list_occasions(&self, contact_id: ContactId) -> ServiceResult<Vec<Occasion>> {
        self.require_contact(contact_id)?;
        Ok(self.repo.list_occasions(contact_id)?)
    }

    pub fn delete_occasion(&self, id: OccasionId) -> ServiceResult<()> {
        Ok(self.repo.delete_occasion(id)?)
    }

    /// Marks occurrences of an occasion up to `on` as handled.
    pub fn acknowledge_occasion(&self, id: OccasionId, on: NaiveDate) -> ServiceResult<()> {
        Ok(self.repo.acknowledge_occasion(id, on)?)
    }

    /// Records a gift given to or received from a contact.
    pub fn add_gift(&self, gift: &Gift) -> ServiceResult<GiftId> {
        Ok(self.repo.add_gift(gift)?)
    }

    pub fn list_gifts(&self, contact_id: ContactId) -> ServiceResult<Vec<Gift>> {
        self.require_contact(contact_id)?;
        Ok(self.repo.list_gifts(contact_id)?)
    }

    pub fn delete_gift(&self, id: GiftId) -> ServiceResult<()> {
        Ok(self.repo.delete_gift(id)?)
    }

    /// Links two contacts, or updates the existing link.
    pub fn relate(
        &self,
        a: ContactId,
        b: ContactId,
        kind: RelationshipKind,
        strength: f64,
    ) -> ServiceResult<()> {
        Ok(self
            .repo
            .upsert_edge(&RelationshipEdge::new(a, b, kind, strength))?)
    }

    /// Removes the link between two contacts. Returns whether one existed.
    pub fn unrelate(&self, a: ContactId, b: ContactId) -> ServiceResult<bool> {
        Ok(self.repo.remove_edge(a, b)?)
    }

    /// Renders the dashboard feed for `as_of`.
    pub fn render_dashboard(&self, as_of: NaiveDate) -> ServiceResult<DashboardRender> {
        Ok(dashboard::render_dashboard(&self.repo, as_of, &self.config)?)
    }

    /// Loads the stored graph with diagnostics for dropped edges.
    pub fn load_graph(&self) -> ServiceResult<(RelationshipGraph, Vec<RenderDiagnostic>)> {
        Ok(dashboard::build_graph(&self.repo, &self.config)?)
    }

    pub fn export_graph(&self) -> ServiceResult<GraphExport> {
        Ok(dashboard::export_graph(&self.repo)?)
    }

    /// Read access for store-level consumers such as notification pushes.
    pub fn store(&self) -> &R {
        &self.repo
    }
}
