//! Suggestion and dashboard aggregator.
//!
//! # Responsibility
//! - Run one render cycle: resolve occasions, score contacts, apply the
//!   graph proximity boost, rank and partition into feed categories.
//! - Build the relationship graph from the store for rendering and export.
//!
//! # Invariants
//! - Per-item failures (bad occasion dates, stale edges) never abort a render;
//!   they are skipped and reported as diagnostics.
//! - Store failures are fatal and returned unchanged.
//! - The feed holds at most one item per contact per category and is ordered
//!   by category, then by due date or score.

use crate::config::{EngineConfig, DEFAULT_MAX_PROXIMITY_BOOST};
use crate::engine::graph::{GraphError, GraphExport, RelationshipGraph};
use crate::engine::recurrence::{next_occurrence, previous_occurrence, InvalidDateError};
use crate::engine::scorer::{score_detail, EngagementScore};
use crate::model::contact::{Contact, ContactId};
use crate::model::occasion::{Occasion, Recurrence};
use crate::model::relationship::RelationshipEdge;
use crate::model::suggestion::{SuggestionCategory, SuggestionItem};
use crate::repo::contact_repo::{ContactStore, RepoResult};
use chrono::{Days, NaiveDate};
use log::{info, warn};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Instant;

/// Why an item or edge was left out of a render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// Stored occasion date does not exist on the calendar.
    InvalidOccasionDate,
    /// Edge references a contact missing from the store.
    StaleEdge,
    /// Edge failed graph validation (self loop, strength range).
    InvalidEdge,
}

/// Warning attached to a render result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderDiagnostic {
    pub contact_id: Option<ContactId>,
    pub kind: DiagnosticKind,
    pub message: String,
}

/// Feed plus the warnings collected while producing it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DashboardRender {
    pub items: Vec<SuggestionItem>,
    pub diagnostics: Vec<RenderDiagnostic>,
}

impl DashboardRender {
    /// Items of one category, in feed order.
    pub fn items_in(&self, category: SuggestionCategory) -> impl Iterator<Item = &SuggestionItem> {
        self.items
            .iter()
            .filter(move |item| item.category == category)
    }
}

struct RankedContact<'a> {
    contact: &'a Contact,
    detail: EngagementScore,
    boost: f64,
    adjusted: f64,
}

struct OccasionHit {
    due_on: NaiveDate,
    label: String,
}

/// Renders the dashboard feed for `as_of`.
///
/// # Errors
/// - Any `RepoError` raised by the store. Per-item problems become
///   diagnostics instead.
pub fn render_dashboard<S: ContactStore + ?Sized>(
    store: &S,
    as_of: NaiveDate,
    config: &EngineConfig,
) -> RepoResult<DashboardRender> {
    let started_at = Instant::now();
    let contacts = store.list_contacts()?;
    let mut diagnostics = Vec::new();
    let graph = assemble_graph(
        &contacts,
        store.list_edges()?,
        config.max_proximity_boost,
        &mut diagnostics,
    );

    let mut base_scores = HashMap::with_capacity(contacts.len());
    let mut details = Vec::with_capacity(contacts.len());
    for contact in &contacts {
        let interactions = store.list_interactions(contact.id)?;
        let detail = score_detail(contact, &interactions, as_of, config);
        base_scores.insert(contact.id, detail.score);
        details.push((contact, detail));
    }

    let mut ranked: Vec<RankedContact<'_>> = details
        .into_iter()
        .map(|(contact, detail)| {
            let boost = match graph.proximity_boost(contact.id, &base_scores) {
                Ok(boost) => boost,
                Err(err) => {
                    warn!(
                        "event=dashboard_render module=engine status=skipped step=proximity_boost error={err}"
                    );
                    0.0
                }
            };
            RankedContact {
                contact,
                detail,
                boost,
                adjusted: (detail.score + boost).clamp(0.0, 1.0),
            }
        })
        .collect();
    ranked.sort_by(|a, b| {
        b.adjusted
            .total_cmp(&a.adjusted)
            .then_with(|| a.contact.id.cmp(&b.contact.id))
    });

    let adjusted_by_id: HashMap<ContactId, f64> = ranked
        .iter()
        .map(|entry| (entry.contact.id, entry.adjusted))
        .collect();

    let mut hits: BTreeMap<(SuggestionCategory, ContactId), Vec<OccasionHit>> = BTreeMap::new();
    for contact in &contacts {
        for occasion in store.list_occasions(contact.id)? {
            match classify_occasion(&occasion, as_of, config) {
                Ok(found) => {
                    for (category, due_on) in found {
                        hits.entry((category, contact.id))
                            .or_default()
                            .push(OccasionHit {
                                due_on,
                                label: occasion.label.clone(),
                            });
                    }
                }
                Err(err) => {
                    warn!(
                        "event=dashboard_render module=engine status=skipped step=occasion contact={} error={err}",
                        contact.id
                    );
                    diagnostics.push(RenderDiagnostic {
                        contact_id: Some(contact.id),
                        kind: DiagnosticKind::InvalidOccasionDate,
                        message: err.to_string(),
                    });
                }
            }
        }
    }

    let mut items = occasion_items(hits, as_of, &adjusted_by_id);
    items.extend(contact_items(&ranked, config));
    items.sort_by(|a, b| a.category.cmp(&b.category));

    info!(
        "event=dashboard_render module=engine status=ok as_of={as_of} contacts={} items={} diagnostics={} duration_ms={}",
        contacts.len(),
        items.len(),
        diagnostics.len(),
        started_at.elapsed().as_millis()
    );

    Ok(DashboardRender { items, diagnostics })
}

/// Loads contacts and edges into a graph. Stale or invalid edges are dropped
/// and reported.
///
/// # Errors
/// - Any `RepoError` raised by the store.
pub fn build_graph<S: ContactStore + ?Sized>(
    store: &S,
    config: &EngineConfig,
) -> RepoResult<(RelationshipGraph, Vec<RenderDiagnostic>)> {
    let contacts = store.list_contacts()?;
    let mut diagnostics = Vec::new();
    let graph = assemble_graph(
        &contacts,
        store.list_edges()?,
        config.max_proximity_boost,
        &mut diagnostics,
    );
    Ok((graph, diagnostics))
}

/// Snapshot of the stored graph for external layout.
pub fn export_graph<S: ContactStore + ?Sized>(store: &S) -> RepoResult<GraphExport> {
    let contacts = store.list_contacts()?;
    let mut diagnostics = Vec::new();
    let graph = assemble_graph(
        &contacts,
        store.list_edges()?,
        DEFAULT_MAX_PROXIMITY_BOOST,
        &mut diagnostics,
    );
    Ok(graph.export())
}

fn assemble_graph(
    contacts: &[Contact],
    edges: Vec<RelationshipEdge>,
    max_proximity_boost: f64,
    diagnostics: &mut Vec<RenderDiagnostic>,
) -> RelationshipGraph {
    let mut graph = RelationshipGraph::new(max_proximity_boost);
    for contact in contacts {
        graph.add_contact(contact.id, contact.display_name.clone());
    }
    for edge in edges {
        let Err(err) = graph.add_edge(&edge) else {
            continue;
        };
        let (kind, contact_id) = match &err {
            GraphError::UnknownContact(missing) => (DiagnosticKind::StaleEdge, missing.0),
            GraphError::SelfLoop(id) => (DiagnosticKind::InvalidEdge, *id),
            GraphError::InvalidStrength(_) => (DiagnosticKind::InvalidEdge, edge.low),
        };
        warn!(
            "event=graph_load module=engine status=skipped low={} high={} error={err}",
            edge.low, edge.high
        );
        diagnostics.push(RenderDiagnostic {
            contact_id: Some(contact_id),
            kind,
            message: format!("edge {} - {} dropped: {err}", edge.low, edge.high),
        });
    }
    graph
}

/// Returns the feed categories an occasion contributes to for `as_of`.
fn classify_occasion(
    occasion: &Occasion,
    as_of: NaiveDate,
    config: &EngineConfig,
) -> Result<Vec<(SuggestionCategory, NaiveDate)>, InvalidDateError> {
    let next = next_occurrence(occasion, as_of)?;
    let previous = previous_occurrence(occasion, as_of)?;
    let lead = occasion.lead_days.unwrap_or(config.occasion_lead_days);
    let horizon = as_of
        .checked_add_days(Days::new(u64::from(lead)))
        .unwrap_or(NaiveDate::MAX);

    let mut found = Vec::new();
    if let Some(missed) = previous {
        let within_window = match occasion.recurrence {
            Recurrence::Once => true,
            Recurrence::Yearly => (as_of - missed).num_days() <= i64::from(lead),
        };
        if within_window && !occasion.is_acknowledged_for(missed) {
            found.push((SuggestionCategory::OverdueReminder, missed));
        }
    }
    if next >= as_of && next <= horizon && !occasion.is_acknowledged_for(next) {
        found.push((SuggestionCategory::UpcomingOccasion, next));
    }
    Ok(found)
}

fn occasion_items(
    hits: BTreeMap<(SuggestionCategory, ContactId), Vec<OccasionHit>>,
    as_of: NaiveDate,
    adjusted_by_id: &HashMap<ContactId, f64>,
) -> Vec<SuggestionItem> {
    let mut items: Vec<SuggestionItem> = hits
        .into_iter()
        .filter_map(|((category, contact_id), mut group)| {
            group.sort_by(|a, b| a.due_on.cmp(&b.due_on).then_with(|| a.label.cmp(&b.label)));
            let extra = group.len() - 1;
            let first = group.into_iter().next()?;
            let mut rationale = occasion_rationale(category, &first, as_of);
            if extra > 0 {
                rationale.push_str(&format!(" (+{extra} more)"));
            }
            Some(SuggestionItem {
                contact_id,
                category,
                score: adjusted_by_id.get(&contact_id).copied().unwrap_or(0.0),
                rationale,
                due_on: Some(first.due_on),
            })
        })
        .collect();
    items.sort_by(|a, b| {
        a.category
            .cmp(&b.category)
            .then_with(|| a.due_on.cmp(&b.due_on))
            .then_with(|| a.contact_id.cmp(&b.contact_id))
    });
    items
}

fn occasion_rationale(category: SuggestionCategory, hit: &OccasionHit, as_of: NaiveDate) -> String {
    let offset = (hit.due_on - as_of).num_days();
    match category {
        SuggestionCategory::OverdueReminder => {
            format!("{} was due {} ({} days ago)", hit.label, hit.due_on, -offset)
        }
        _ if offset == 0 => format!("{} is today", hit.label),
        _ => format!("{} on {} (in {} days)", hit.label, hit.due_on, offset),
    }
}

fn contact_items(ranked: &[RankedContact<'_>], config: &EngineConfig) -> Vec<SuggestionItem> {
    let (overdue, rest): (Vec<_>, Vec<_>) = ranked
        .iter()
        .partition(|entry| entry.adjusted > config.overdue_threshold);

    overdue
        .into_iter()
        .map(|entry| contact_item(entry, SuggestionCategory::OverdueContact))
        .chain(
            rest.into_iter()
                .take(config.top_k_suggestions)
                .map(|entry| contact_item(entry, SuggestionCategory::Suggested)),
        )
        .collect()
}

fn contact_item(entry: &RankedContact<'_>, category: SuggestionCategory) -> SuggestionItem {
    let mut rationale = match entry.detail.days_since_last {
        Some(0) => "talked today".to_string(),
        Some(days) => format!("last interaction {days} days ago"),
        None => format!("no interactions since added on {}", entry.contact.created_on),
    };
    if entry.boost > 0.0 {
        rationale.push_str(&format!(", network boost +{:.2}", entry.boost));
    }
    SuggestionItem {
        contact_id: entry.contact.id,
        category,
        score: entry.adjusted,
        rationale,
        due_on: None,
    }
}

#[cfg(test)]
mod tests {
    use super::{build_graph, export_graph, render_dashboard, DiagnosticKind};
    use crate::config::EngineConfig;
    use crate::model::contact::{Contact, ContactId};
    use crate::model::date::PartialDate;
    use crate::model::interaction::{Interaction, InteractionKind};
    use crate::model::occasion::Occasion;
    use crate::model::relationship::{RelationshipEdge, RelationshipKind};
    use crate::model::suggestion::SuggestionCategory;
    use crate::repo::contact_repo::{ContactStore, RepoResult};
    use chrono::{Duration, NaiveDate};
    use uuid::Uuid;

    #[derive(Default)]
    struct MemoryStore {
        contacts: Vec<Contact>,
        interactions: Vec<Interaction>,
        occasions: Vec<Occasion>,
        edges: Vec<RelationshipEdge>,
    }

    impl ContactStore for MemoryStore {
        fn list_contacts(&self) -> RepoResult<Vec<Contact>> {
            Ok(self.contacts.clone())
        }

        fn list_interactions(&self, contact_id: ContactId) -> RepoResult<Vec<Interaction>> {
            Ok(self
                .interactions
                .iter()
                .filter(|item| item.contact_id == contact_id)
                .cloned()
                .collect())
        }

        fn list_occasions(&self, contact_id: ContactId) -> RepoResult<Vec<Occasion>> {
            Ok(self
                .occasions
                .iter()
                .filter(|item| item.contact_id == contact_id)
                .cloned()
                .collect())
        }

        fn list_edges(&self) -> RepoResult<Vec<RelationshipEdge>> {
            Ok(self.edges.clone())
        }
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn talked(contact: &Contact, on: NaiveDate) -> Interaction {
        Interaction::new(
            contact.id,
            on.and_hms_opt(12, 0, 0).unwrap(),
            InteractionKind::Meeting,
            "lunch",
        )
    }

    #[test]
    fn malformed_occasion_is_skipped_with_one_diagnostic() {
        let as_of = day(2025, 6, 15);
        let mut store = MemoryStore::default();
        for index in 0..10u32 {
            let contact = Contact::new(format!("Friend {index}"), day(2024, 1, 1));
            let date = if index == 3 {
                PartialDate::month_day(2, 30)
            } else {
                PartialDate::month_day(6, 16 + index % 5)
            };
            store.occasions.push(Occasion::birthday(contact.id, date));
            store.interactions.push(talked(&contact, as_of));
            store.contacts.push(contact);
        }

        let render = render_dashboard(&store, as_of, &EngineConfig::default()).unwrap();
        assert_eq!(render.items_in(SuggestionCategory::UpcomingOccasion).count(), 9);
        assert_eq!(render.diagnostics.len(), 1);
        assert_eq!(
            render.diagnostics[0].kind,
            DiagnosticKind::InvalidOccasionDate
        );
        assert_eq!(render.diagnostics[0].contact_id, Some(store.contacts[3].id));
    }

    #[test]
    fn feed_is_grouped_by_category_in_fixed_order() {
        let as_of = day(2025, 6, 15);
        let mut store = MemoryStore::default();

        let mut stale = Contact::new("Stale", day(2020, 1, 1));
        stale.importance = 1.0;
        store
            .interactions
            .push(talked(&stale, as_of - Duration::days(200)));

        let upcoming = Contact::new("Upcoming", day(2020, 1, 1));
        store
            .occasions
            .push(Occasion::birthday(upcoming.id, PartialDate::month_day(6, 18)));
        store.interactions.push(talked(&upcoming, as_of));

        let reminded = Contact::new("Reminded", day(2020, 1, 1));
        store
            .occasions
            .push(Occasion::reminder(reminded.id, "return the book", day(2025, 6, 1)));
        store.interactions.push(talked(&reminded, as_of));

        store.contacts = vec![stale.clone(), upcoming.clone(), reminded.clone()];

        let render = render_dashboard(&store, as_of, &EngineConfig::default()).unwrap();
        let categories: Vec<_> = render.items.iter().map(|item| item.category).collect();
        let mut sorted = categories.clone();
        sorted.sort();
        assert_eq!(categories, sorted);

        assert_eq!(render.items[0].category, SuggestionCategory::OverdueReminder);
        assert_eq!(render.items[0].contact_id, reminded.id);
        assert_eq!(render.items[0].due_on, Some(day(2025, 6, 1)));
        assert_eq!(render.items[1].category, SuggestionCategory::OverdueContact);
        assert_eq!(render.items[1].contact_id, stale.id);

        let upcoming_items: Vec<_> = render
            .items_in(SuggestionCategory::UpcomingOccasion)
            .collect();
        assert_eq!(upcoming_items.len(), 1);
        assert_eq!(upcoming_items[0].contact_id, upcoming.id);
        assert!(upcoming_items[0].rationale.contains("in 3 days"));

        assert!(render
            .items_in(SuggestionCategory::Suggested)
            .all(|item| item.contact_id != stale.id));
        assert!(render.diagnostics.is_empty());
    }

    #[test]
    fn ranking_breaks_ties_by_contact_id_and_respects_top_k() {
        let as_of = day(2025, 6, 15);
        let mut store = MemoryStore::default();
        for index in 0..4 {
            let contact = Contact::with_id(
                Uuid::from_u128(10 - index as u128),
                format!("Peer {index}"),
                day(2020, 1, 1),
            );
            store
                .interactions
                .push(talked(&contact, as_of - Duration::days(20)));
            store.contacts.push(contact);
        }
        let config = EngineConfig {
            top_k_suggestions: 3,
            ..EngineConfig::default()
        };

        let render = render_dashboard(&store, as_of, &config).unwrap();
        let suggested: Vec<_> = render
            .items_in(SuggestionCategory::Suggested)
            .map(|item| item.contact_id)
            .collect();
        assert_eq!(
            suggested,
            vec![Uuid::from_u128(7), Uuid::from_u128(8), Uuid::from_u128(9)]
        );
    }

    #[test]
    fn dedup_keeps_earliest_occasion_per_contact() {
        let as_of = day(2025, 6, 15);
        let contact = Contact::new("Busy", day(2020, 1, 1));
        let mut store = MemoryStore::default();
        store.interactions.push(talked(&contact, as_of));
        store
            .occasions
            .push(Occasion::birthday(contact.id, PartialDate::month_day(6, 20)));
        store.occasions.push(Occasion::yearly(
            contact.id,
            crate::model::occasion::OccasionKind::Anniversary,
            "Wedding",
            PartialDate::ymd(2010, 6, 17),
        ));
        store.contacts.push(contact.clone());

        let render = render_dashboard(&store, as_of, &EngineConfig::default()).unwrap();
        let upcoming: Vec<_> = render
            .items_in(SuggestionCategory::UpcomingOccasion)
            .collect();
        assert_eq!(upcoming.len(), 1);
        assert_eq!(upcoming[0].due_on, Some(day(2025, 6, 17)));
        assert!(upcoming[0].rationale.starts_with("Wedding"));
        assert!(upcoming[0].rationale.ends_with("(+1 more)"));
    }

    #[test]
    fn acknowledged_yearly_occasion_is_not_overdue() {
        let as_of = day(2025, 6, 15);
        let contact = Contact::new("Ada", day(2020, 1, 1));
        let mut missed = Occasion::birthday(contact.id, PartialDate::month_day(6, 12));
        let mut store = MemoryStore::default();
        store.interactions.push(talked(&contact, as_of));
        store.contacts.push(contact.clone());
        store.occasions.push(missed.clone());

        let render = render_dashboard(&store, as_of, &EngineConfig::default()).unwrap();
        assert_eq!(render.items_in(SuggestionCategory::OverdueReminder).count(), 1);

        missed.acknowledged_on = Some(day(2025, 6, 13));
        store.occasions = vec![missed];
        let render = render_dashboard(&store, as_of, &EngineConfig::default()).unwrap();
        assert_eq!(render.items_in(SuggestionCategory::OverdueReminder).count(), 0);
    }

    #[test]
    fn proximity_boost_lifts_neighbor_of_stale_contact() {
        let as_of = day(2025, 6, 15);
        let mut store = MemoryStore::default();
        let mut stale = Contact::new("Stale", day(2020, 1, 1));
        stale.importance = 1.0;
        let fresh = Contact::new("Fresh", day(2020, 1, 1));
        store
            .interactions
            .push(talked(&stale, as_of - Duration::days(365)));
        store.interactions.push(talked(&fresh, as_of));
        store.edges.push(RelationshipEdge::new(
            stale.id,
            fresh.id,
            RelationshipKind::Friend,
            0.5,
        ));
        store.contacts = vec![stale, fresh.clone()];

        let render = render_dashboard(&store, as_of, &EngineConfig::default()).unwrap();
        let item = render
            .items
            .iter()
            .find(|item| item.contact_id == fresh.id)
            .unwrap();
        assert!((item.score - 0.7).abs() < 1e-9);
        assert!(item.rationale.contains("network boost +0.20"));
    }

    #[test]
    fn stale_edges_are_dropped_and_reported() {
        let ada = Contact::new("Ada", day(2020, 1, 1));
        let ghost = Uuid::new_v4();
        let mut store = MemoryStore::default();
        store.edges.push(RelationshipEdge::new(
            ada.id,
            ghost,
            RelationshipKind::Colleague,
            0.4,
        ));
        store.contacts.push(ada);

        let (graph, diagnostics) = build_graph(&store, &EngineConfig::default()).unwrap();
        assert_eq!(graph.edge_count(), 0);
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::StaleEdge);

        let render = render_dashboard(&store, day(2025, 6, 15), &EngineConfig::default()).unwrap();
        assert_eq!(render.diagnostics.len(), 1);

        let export = export_graph(&store).unwrap();
        assert_eq!(export.nodes.len(), 1);
        assert!(export.edges.is_empty());
    }

    #[test]
    fn empty_store_renders_empty_feed() {
        let render =
            render_dashboard(&MemoryStore::default(), day(2025, 6, 15), &EngineConfig::default())
                .unwrap();
        assert!(render.items.is_empty());
        assert!(render.diagnostics.is_empty());
    }
}
