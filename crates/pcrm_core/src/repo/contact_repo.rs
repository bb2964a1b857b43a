//! Contact store contracts and SQLite implementation.
//!
//! # Responsibility
//! - Define the read contract consumed by the engagement engine
//!   (`ContactStore`) and the write contract used by services
//!   (`ContactRepository`).
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - Write paths validate domain objects before SQL mutations.
//! - Read paths reject undecodable rows (bad uuid, unknown enum text) but keep
//!   occasion month/day as stored; calendar validity is the recurrence
//!   resolver's call so one corrupt row cannot break a whole render. Integers
//!   outside the date field ranges decode to month/day 0.
//! - A gift's occasion belongs to the gift's contact.
//! - Deleting a contact cascades through foreign keys.
//! - Relationship rows are stored with `contact_low < contact_high`.

use crate::db::migrations::{latest_version, schema_version};
use crate::db::DbError;
use crate::model::contact::{Contact, ContactId, ContactValidationError};
use crate::model::date::PartialDate;
use crate::model::gift::{Gift, GiftDirection, GiftId, GiftValidationError};
use crate::model::interaction::{Interaction, InteractionId, InteractionKind};
use crate::model::occasion::{
    Occasion, OccasionId, OccasionKind, OccasionValidationError, Recurrence,
};
use crate::model::relationship::{
    canonical_pair, EdgeValidationError, RelationshipEdge, RelationshipKind,
};
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

const CONTACT_SELECT_SQL: &str = "SELECT
    uuid,
    display_name,
    email,
    birthday_year,
    birthday_month,
    birthday_day,
    how_met,
    importance,
    created_on
FROM contacts";

const OCCASION_SELECT_SQL: &str = "SELECT
    uuid,
    contact_uuid,
    kind,
    label,
    year,
    month,
    day,
    recurrence,
    lead_days,
    acknowledged_on
FROM occasions";

const GIFT_SELECT_SQL: &str = "SELECT
    uuid,
    contact_uuid,
    occasion_uuid,
    description,
    direction,
    exchanged_on
FROM gifts";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for contact persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Contact(ContactValidationError),
    Occasion(OccasionValidationError),
    Edge(EdgeValidationError),
    Gift(GiftValidationError),
    Db(DbError),
    /// Target row does not exist.
    NotFound(Uuid),
    /// A write referenced a contact the store does not know.
    UnknownContact(ContactId),
    /// A gift was linked to an occasion owned by another contact.
    ForeignOccasion {
        occasion_id: OccasionId,
        contact_id: ContactId,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Contact(err) => write!(f, "{err}"),
            Self::Occasion(err) => write!(f, "{err}"),
            Self::Edge(err) => write!(f, "{err}"),
            Self::Gift(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::UnknownContact(id) => write!(f, "unknown contact: {id}"),
            Self::ForeignOccasion {
                occasion_id,
                contact_id,
            } => write!(
                f,
                "occasion {occasion_id} does not belong to contact {contact_id}"
            ),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "contact repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted contact data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Contact(err) => Some(err),
            Self::Occasion(err) => Some(err),
            Self::Edge(err) => Some(err),
            Self::Gift(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_)
            | Self::UnknownContact(_)
            | Self::ForeignOccasion { .. }
            | Self::UninitializedConnection { .. }
            | Self::InvalidData(_) => None,
        }
    }
}

impl From<ContactValidationError> for RepoError {
    fn from(value: ContactValidationError) -> Self {
        Self::Contact(value)
    }
}

impl From<OccasionValidationError> for RepoError {
    fn from(value: OccasionValidationError) -> Self {
        Self::Occasion(value)
    }
}

impl From<EdgeValidationError> for RepoError {
    fn from(value: EdgeValidationError) -> Self {
        Self::Edge(value)
    }
}

impl From<GiftValidationError> for RepoError {
    fn from(value: GiftValidationError) -> Self {
        Self::Gift(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read contract consumed by the engagement engine.
pub trait ContactStore {
    /// All live contacts, ordered by id.
    fn list_contacts(&self) -> RepoResult<Vec<Contact>>;
    /// Interactions of one contact, oldest first.
    fn list_interactions(&self, contact_id: ContactId) -> RepoResult<Vec<Interaction>>;
    /// Occasions of one contact.
    fn list_occasions(&self, contact_id: ContactId) -> RepoResult<Vec<Occasion>>;
    /// Every relationship edge.
    fn list_edges(&self) -> RepoResult<Vec<RelationshipEdge>>;
}

/// Write contract for contact management use-cases.
pub trait ContactRepository: ContactStore {
    fn create_contact(&self, contact: &Contact) -> RepoResult<ContactId> {
        self.create_contact_with_occasions(contact, &[])
    }
    /// Creates a contact and its initial occasions atomically: either every
    /// row lands or none does.
    fn create_contact_with_occasions(
        &self,
        contact: &Contact,
        occasions: &[Occasion],
    ) -> RepoResult<ContactId>;
    /// Replaces all editable fields, notes and tags. `id` and `created_on` are kept.
    fn update_contact(&self, contact: &Contact) -> RepoResult<()>;
    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>>;
    /// Hard-deletes a contact and everything it owns.
    fn delete_contact(&self, id: ContactId) -> RepoResult<()>;
    /// Case-insensitive name lookup.
    fn find_contacts_by_name(&self, query: &str) -> RepoResult<Vec<Contact>>;
    fn list_contacts_by_tag(&self, tag: &str) -> RepoResult<Vec<Contact>>;
    /// Returns every known tag, sorted.
    fn list_tags(&self) -> RepoResult<Vec<String>>;

    fn add_interaction(&self, interaction: &Interaction) -> RepoResult<InteractionId>;
    fn delete_interaction(&self, id: InteractionId) -> RepoResult<()>;

    fn add_occasion(&self, occasion: &Occasion) -> RepoResult<OccasionId>;
    fn update_occasion(&self, occasion: &Occasion) -> RepoResult<()>;
    fn get_occasion(&self, id: OccasionId) -> RepoResult<Option<Occasion>>;
    fn delete_occasion(&self, id: OccasionId) -> RepoResult<()>;
    /// Marks occurrences up to and including `on` as handled.
    fn acknowledge_occasion(&self, id: OccasionId, on: NaiveDate) -> RepoResult<()>;

    /// Records a gift. A linked occasion must belong to the same contact.
    fn add_gift(&self, gift: &Gift) -> RepoResult<GiftId>;
    /// Gifts of one contact, most recent first; undated gifts last.
    fn list_gifts(&self, contact_id: ContactId) -> RepoResult<Vec<Gift>>;
    fn delete_gift(&self, id: GiftId) -> RepoResult<()>;

    /// Inserts an edge, or updates kind/strength for an existing pair.
    fn upsert_edge(&self, edge: &RelationshipEdge) -> RepoResult<()>;
    /// Removes the edge for a pair. Returns whether one existed.
    fn remove_edge(&self, a: ContactId, b: ContactId) -> RepoResult<bool>;
}

/// SQLite-backed contact repository.
pub struct SqliteContactRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContactRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn)?;
        Ok(Self { conn })
    }

    fn contact_exists(&self, id: ContactId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM contacts WHERE uuid = ?1);",
            [id.to_string()],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn require_contact(&self, id: ContactId) -> RepoResult<()> {
        if self.contact_exists(id)? {
            Ok(())
        } else {
            Err(RepoError::UnknownContact(id))
        }
    }

    fn load_contacts(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> RepoResult<Vec<Contact>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params)?;
        let mut contacts = Vec::new();
        while let Some(row) = rows.next()? {
            let mut contact = parse_contact_row(row)?;
            contact.notes = load_notes(self.conn, contact.id)?;
            contact.tags = load_tags(self.conn, contact.id)?;
            contacts.push(contact);
        }
        Ok(contacts)
    }
}

impl ContactStore for SqliteContactRepository<'_> {
    fn list_contacts(&self) -> RepoResult<Vec<Contact>> {
        self.load_contacts(&format!("{CONTACT_SELECT_SQL} ORDER BY uuid ASC;"), &[])
    }

    fn list_interactions(&self, contact_id: ContactId) -> RepoResult<Vec<Interaction>> {
        let mut stmt = self.conn.prepare(
            "SELECT uuid, contact_uuid, occurred_at, kind, note
             FROM interactions
             WHERE contact_uuid = ?1
             ORDER BY occurred_at ASC, uuid ASC;",
        )?;
        let mut rows = stmt.query([contact_id.to_string()])?;
        let mut interactions = Vec::new();
        while let Some(row) = rows.next()? {
            interactions.push(parse_interaction_row(row)?);
        }
        Ok(interactions)
    }

    fn list_occasions(&self, contact_id: ContactId) -> RepoResult<Vec<Occasion>> {
        let mut stmt = self.conn.prepare(&format!(
            "{OCCASION_SELECT_SQL}
             WHERE contact_uuid = ?1
             ORDER BY month ASC, day ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([contact_id.to_string()])?;
        let mut occasions = Vec::new();
        while let Some(row) = rows.next()? {
            occasions.push(parse_occasion_row(row)?);
        }
        Ok(occasions)
    }

    fn list_edges(&self) -> RepoResult<Vec<RelationshipEdge>> {
        let mut stmt = self.conn.prepare(
            "SELECT contact_low, contact_high, kind, strength
             FROM relationships
             ORDER BY contact_low ASC, contact_high ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut edges = Vec::new();
        while let Some(row) = rows.next()? {
            let kind_text: String = row.get("kind")?;
            let kind = RelationshipKind::parse(&kind_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid relationship kind `{kind_text}` in relationships.kind"
                ))
            })?;
            edges.push(RelationshipEdge::new(
                parse_uuid(&row.get::<_, String>("contact_low")?, "relationships.contact_low")?,
                parse_uuid(&row.get::<_, String>("contact_high")?, "relationships.contact_high")?,
                kind,
                row.get("strength")?,
            ));
        }
        Ok(edges)
    }
}

impl ContactRepository for SqliteContactRepository<'_> {
    fn create_contact_with_occasions(
        &self,
        contact: &Contact,
        occasions: &[Occasion],
    ) -> RepoResult<ContactId> {
        contact.validate()?;
        for occasion in occasions {
            occasion.validate()?;
            if occasion.contact_id != contact.id {
                return Err(RepoError::UnknownContact(occasion.contact_id));
            }
        }

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute(
            "INSERT INTO contacts (
                uuid,
                display_name,
                email,
                birthday_year,
                birthday_month,
                birthday_day,
                how_met,
                importance,
                created_on
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                contact.id.to_string(),
                contact.display_name.trim(),
                contact.email.as_deref(),
                contact.birthday.and_then(|date| date.year),
                contact.birthday.map(|date| date.month),
                contact.birthday.map(|date| date.day),
                contact.how_met.as_deref(),
                contact.importance,
                contact.created_on.format(DATE_FORMAT).to_string(),
            ],
        )?;
        replace_notes(&tx, contact.id, &contact.notes)?;
        replace_tags(&tx, contact.id, &contact.tags)?;
        for occasion in occasions {
            insert_occasion(&tx, occasion)?;
        }
        tx.commit()?;

        Ok(contact.id)
    }

    fn update_contact(&self, contact: &Contact) -> RepoResult<()> {
        contact.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let changed = tx.execute(
            "UPDATE contacts
             SET
                display_name = ?1,
                email = ?2,
                birthday_year = ?3,
                birthday_month = ?4,
                birthday_day = ?5,
                how_met = ?6,
                importance = ?7,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?8;",
            params![
                contact.display_name.trim(),
                contact.email.as_deref(),
                contact.birthday.and_then(|date| date.year),
                contact.birthday.map(|date| date.month),
                contact.birthday.map(|date| date.day),
                contact.how_met.as_deref(),
                contact.importance,
                contact.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(contact.id));
        }
        replace_notes(&tx, contact.id, &contact.notes)?;
        replace_tags(&tx, contact.id, &contact.tags)?;
        tx.commit()?;

        Ok(())
    }

    fn get_contact(&self, id: ContactId) -> RepoResult<Option<Contact>> {
        let id_text = id.to_string();
        let mut contacts = self.load_contacts(
            &format!("{CONTACT_SELECT_SQL} WHERE uuid = ?1;"),
            &[&id_text],
        )?;
        Ok(contacts.pop())
    }

    fn delete_contact(&self, id: ContactId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM contacts WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn find_contacts_by_name(&self, query: &str) -> RepoResult<Vec<Contact>> {
        let mut matches = self.list_contacts()?;
        matches.retain(|contact| contact.matches_name(query));
        matches.sort_by(|a, b| {
            a.display_name
                .to_lowercase()
                .cmp(&b.display_name.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        Ok(matches)
    }

    fn list_contacts_by_tag(&self, tag: &str) -> RepoResult<Vec<Contact>> {
        let Some(tag) = normalize_tag(tag) else {
            return Ok(Vec::new());
        };
        self.load_contacts(
            &format!(
                "{CONTACT_SELECT_SQL}
                 WHERE EXISTS (
                    SELECT 1
                    FROM contact_tags ct
                    INNER JOIN tags t ON t.id = ct.tag_id
                    WHERE ct.contact_uuid = contacts.uuid
                      AND t.name = ?1 COLLATE NOCASE
                 )
                 ORDER BY display_name COLLATE NOCASE ASC, uuid ASC;"
            ),
            &[&tag],
        )
    }

    fn list_tags(&self) -> RepoResult<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name FROM tags ORDER BY name COLLATE NOCASE ASC;")?;
        let mut rows = stmt.query([])?;
        let mut tags = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get("name")?;
            tags.push(value.to_lowercase());
        }
        Ok(tags)
    }

    fn add_interaction(&self, interaction: &Interaction) -> RepoResult<InteractionId> {
        self.require_contact(interaction.contact_id)?;
        self.conn.execute(
            "INSERT INTO interactions (uuid, contact_uuid, occurred_at, kind, note)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                interaction.id.to_string(),
                interaction.contact_id.to_string(),
                interaction.occurred_at.format(TIMESTAMP_FORMAT).to_string(),
                interaction.kind.as_str(),
                interaction.note.as_str(),
            ],
        )?;
        Ok(interaction.id)
    }

    fn delete_interaction(&self, id: InteractionId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM interactions WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn add_occasion(&self, occasion: &Occasion) -> RepoResult<OccasionId> {
        occasion.validate()?;
        self.require_contact(occasion.contact_id)?;
        insert_occasion(self.conn, occasion)?;
        Ok(occasion.id)
    }

    fn update_occasion(&self, occasion: &Occasion) -> RepoResult<()> {
        occasion.validate()?;
        let changed = self.conn.execute(
            "UPDATE occasions
             SET
                kind = ?1,
                label = ?2,
                year = ?3,
                month = ?4,
                day = ?5,
                recurrence = ?6,
                lead_days = ?7,
                acknowledged_on = ?8
             WHERE uuid = ?9
               AND contact_uuid = ?10;",
            params![
                occasion.kind.as_str(),
                occasion.label.trim(),
                occasion.date.year,
                occasion.date.month,
                occasion.date.day,
                occasion.recurrence.as_str(),
                occasion.lead_days,
                occasion
                    .acknowledged_on
                    .map(|date| date.format(DATE_FORMAT).to_string()),
                occasion.id.to_string(),
                occasion.contact_id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(occasion.id));
        }
        Ok(())
    }

    fn get_occasion(&self, id: OccasionId) -> RepoResult<Option<Occasion>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{OCCASION_SELECT_SQL} WHERE uuid = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_occasion_row(row)?));
        }
        Ok(None)
    }

    fn delete_occasion(&self, id: OccasionId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM occasions WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn acknowledge_occasion(&self, id: OccasionId, on: NaiveDate) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE occasions SET acknowledged_on = ?1 WHERE uuid = ?2;",
            params![on.format(DATE_FORMAT).to_string(), id.to_string()],
        )?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn add_gift(&self, gift: &Gift) -> RepoResult<GiftId> {
        gift.validate()?;
        self.require_contact(gift.contact_id)?;
        if let Some(occasion_id) = gift.occasion_id {
            let owner: Option<String> = self
                .conn
                .query_row(
                    "SELECT contact_uuid FROM occasions WHERE uuid = ?1;",
                    [occasion_id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            match owner {
                None => return Err(RepoError::NotFound(occasion_id)),
                Some(owner) if owner != gift.contact_id.to_string() => {
                    return Err(RepoError::ForeignOccasion {
                        occasion_id,
                        contact_id: gift.contact_id,
                    });
                }
                Some(_) => {}
            }
        }
        self.conn.execute(
            "INSERT INTO gifts (uuid, contact_uuid, occasion_uuid, description, direction, exchanged_on)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6);",
            params![
                gift.id.to_string(),
                gift.contact_id.to_string(),
                gift.occasion_id.map(|id| id.to_string()),
                gift.description.trim(),
                gift.direction.as_str(),
                gift.exchanged_on
                    .map(|date| date.format(DATE_FORMAT).to_string()),
            ],
        )?;
        Ok(gift.id)
    }

    fn list_gifts(&self, contact_id: ContactId) -> RepoResult<Vec<Gift>> {
        let mut stmt = self.conn.prepare(&format!(
            "{GIFT_SELECT_SQL}
             WHERE contact_uuid = ?1
             ORDER BY exchanged_on IS NULL ASC, exchanged_on DESC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([contact_id.to_string()])?;
        let mut gifts = Vec::new();
        while let Some(row) = rows.next()? {
            gifts.push(parse_gift_row(row)?);
        }
        Ok(gifts)
    }

    fn delete_gift(&self, id: GiftId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM gifts WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }
        Ok(())
    }

    fn upsert_edge(&self, edge: &RelationshipEdge) -> RepoResult<()> {
        edge.validate()?;
        self.require_contact(edge.low)?;
        self.require_contact(edge.high)?;
        let (low, high) = canonical_pair(edge.low, edge.high);
        self.conn.execute(
            "INSERT INTO relationships (contact_low, contact_high, kind, strength)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT (contact_low, contact_high)
             DO UPDATE SET kind = excluded.kind, strength = excluded.strength;",
            params![
                low.to_string(),
                high.to_string(),
                edge.kind.as_str(),
                edge.strength,
            ],
        )?;
        Ok(())
    }

    fn remove_edge(&self, a: ContactId, b: ContactId) -> RepoResult<bool> {
        let (low, high) = canonical_pair(a, b);
        let changed = self.conn.execute(
            "DELETE FROM relationships WHERE contact_low = ?1 AND contact_high = ?2;",
            params![low.to_string(), high.to_string()],
        )?;
        Ok(changed > 0)
    }
}

/// Normalizes one tag value: trimmed, lowercase, `None` when empty.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let trimmed = tag.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_lowercase())
    }
}

/// Normalizes and deduplicates tag values.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    tags.iter()
        .filter_map(|tag| normalize_tag(tag))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn insert_occasion(conn: &Connection, occasion: &Occasion) -> RepoResult<()> {
    conn.execute(
        "INSERT INTO occasions (
            uuid,
            contact_uuid,
            kind,
            label,
            year,
            month,
            day,
            recurrence,
            lead_days,
            acknowledged_on
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10);",
        params![
            occasion.id.to_string(),
            occasion.contact_id.to_string(),
            occasion.kind.as_str(),
            occasion.label.trim(),
            occasion.date.year,
            occasion.date.month,
            occasion.date.day,
            occasion.recurrence.as_str(),
            occasion.lead_days,
            occasion
                .acknowledged_on
                .map(|date| date.format(DATE_FORMAT).to_string()),
        ],
    )?;
    Ok(())
}

fn replace_notes(tx: &Transaction<'_>, contact_id: ContactId, notes: &[String]) -> RepoResult<()> {
    let id_text = contact_id.to_string();
    tx.execute(
        "DELETE FROM contact_notes WHERE contact_uuid = ?1;",
        [id_text.as_str()],
    )?;
    for (position, body) in notes.iter().enumerate() {
        tx.execute(
            "INSERT INTO contact_notes (contact_uuid, position, body) VALUES (?1, ?2, ?3);",
            params![id_text.as_str(), position as i64, body.as_str()],
        )?;
    }
    Ok(())
}

fn replace_tags(tx: &Transaction<'_>, contact_id: ContactId, tags: &[String]) -> RepoResult<()> {
    let id_text = contact_id.to_string();
    tx.execute(
        "DELETE FROM contact_tags WHERE contact_uuid = ?1;",
        [id_text.as_str()],
    )?;
    for tag in normalize_tags(tags) {
        tx.execute(
            "INSERT OR IGNORE INTO tags (name) VALUES (?1);",
            [tag.as_str()],
        )?;
        tx.execute(
            "INSERT INTO contact_tags (contact_uuid, tag_id)
             SELECT ?1, id
             FROM tags
             WHERE name = ?2 COLLATE NOCASE;",
            params![id_text.as_str(), tag.as_str()],
        )?;
    }
    Ok(())
}

fn load_notes(conn: &Connection, contact_id: ContactId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT body FROM contact_notes WHERE contact_uuid = ?1 ORDER BY position ASC;",
    )?;
    let mut rows = stmt.query([contact_id.to_string()])?;
    let mut notes = Vec::new();
    while let Some(row) = rows.next()? {
        notes.push(row.get(0)?);
    }
    Ok(notes)
}

fn load_tags(conn: &Connection, contact_id: ContactId) -> RepoResult<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT t.name
         FROM contact_tags ct
         INNER JOIN tags t ON t.id = ct.tag_id
         WHERE ct.contact_uuid = ?1
         ORDER BY t.name COLLATE NOCASE ASC;",
    )?;
    let mut rows = stmt.query([contact_id.to_string()])?;
    let mut tags = Vec::new();
    while let Some(row) = rows.next()? {
        let value: String = row.get(0)?;
        tags.push(value.to_lowercase());
    }
    Ok(tags)
}

fn parse_contact_row(row: &Row<'_>) -> RepoResult<Contact> {
    let id = parse_uuid(&row.get::<_, String>("uuid")?, "contacts.uuid")?;
    let birthday = match (
        row.get::<_, Option<u32>>("birthday_month")?,
        row.get::<_, Option<u32>>("birthday_day")?,
    ) {
        (Some(month), Some(day)) => Some(PartialDate {
            year: row.get("birthday_year")?,
            month,
            day,
        }),
        (None, None) => None,
        _ => {
            return Err(RepoError::InvalidData(format!(
                "contact {id} has a partial birthday month/day"
            )));
        }
    };
    let created_on_text: String = row.get("created_on")?;

    Ok(Contact {
        id,
        display_name: row.get("display_name")?,
        email: row.get("email")?,
        birthday,
        how_met: row.get("how_met")?,
        notes: Vec::new(),
        importance: row.get("importance")?,
        created_on: parse_date(&created_on_text, "contacts.created_on")?,
        tags: Vec::new(),
    })
}

fn parse_interaction_row(row: &Row<'_>) -> RepoResult<Interaction> {
    let kind_text: String = row.get("kind")?;
    let kind = InteractionKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid interaction kind `{kind_text}` in interactions.kind"))
    })?;
    let occurred_text: String = row.get("occurred_at")?;
    let occurred_at = NaiveDateTime::parse_from_str(&occurred_text, TIMESTAMP_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid timestamp `{occurred_text}` in interactions.occurred_at"
        ))
    })?;

    Ok(Interaction {
        id: parse_uuid(&row.get::<_, String>("uuid")?, "interactions.uuid")?,
        contact_id: parse_uuid(
            &row.get::<_, String>("contact_uuid")?,
            "interactions.contact_uuid",
        )?,
        occurred_at,
        kind,
        note: row.get("note")?,
    })
}

fn parse_occasion_row(row: &Row<'_>) -> RepoResult<Occasion> {
    let kind_text: String = row.get("kind")?;
    let kind = OccasionKind::parse(&kind_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid occasion kind `{kind_text}` in occasions.kind"))
    })?;
    let recurrence_text: String = row.get("recurrence")?;
    let recurrence = Recurrence::parse(&recurrence_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid recurrence `{recurrence_text}` in occasions.recurrence"
        ))
    })?;
    let acknowledged_on = match row.get::<_, Option<String>>("acknowledged_on")? {
        Some(text) => Some(parse_date(&text, "occasions.acknowledged_on")?),
        None => None,
    };

    Ok(Occasion {
        id: parse_uuid(&row.get::<_, String>("uuid")?, "occasions.uuid")?,
        contact_id: parse_uuid(
            &row.get::<_, String>("contact_uuid")?,
            "occasions.contact_uuid",
        )?,
        kind,
        label: row.get("label")?,
        date: stored_occasion_date(row.get("year")?, row.get("month")?, row.get("day")?),
        recurrence,
        lead_days: row.get("lead_days")?,
        acknowledged_on,
    })
}

fn parse_gift_row(row: &Row<'_>) -> RepoResult<Gift> {
    let direction_text: String = row.get("direction")?;
    let direction = GiftDirection::parse(&direction_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid gift direction `{direction_text}` in gifts.direction"))
    })?;
    let exchanged_on = match row.get::<_, Option<String>>("exchanged_on")? {
        Some(text) => Some(parse_date(&text, "gifts.exchanged_on")?),
        None => None,
    };
    let occasion_id = match row.get::<_, Option<String>>("occasion_uuid")? {
        Some(text) => Some(parse_uuid(&text, "gifts.occasion_uuid")?),
        None => None,
    };

    Ok(Gift {
        id: parse_uuid(&row.get::<_, String>("uuid")?, "gifts.uuid")?,
        contact_id: parse_uuid(&row.get::<_, String>("contact_uuid")?, "gifts.contact_uuid")?,
        description: row.get("description")?,
        direction,
        exchanged_on,
        occasion_id,
    })
}

/// Integers that cannot be a calendar component decode to month/day 0, which
/// every date check rejects.
fn stored_occasion_date(year: Option<i64>, month: i64, day: i64) -> PartialDate {
    let year = year.map(i32::try_from).transpose();
    match (year, u32::try_from(month), u32::try_from(day)) {
        (Ok(year), Ok(month), Ok(day)) => PartialDate { year, month, day },
        _ => PartialDate::month_day(0, 0),
    }
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn parse_date(value: &str, column: &'static str) -> RepoResult<NaiveDate> {
    NaiveDate::parse_from_str(value, DATE_FORMAT)
        .map_err(|_| RepoError::InvalidData(format!("invalid date `{value}` in {column}")))
}

fn ensure_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = schema_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
