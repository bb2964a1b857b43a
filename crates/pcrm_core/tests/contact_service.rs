use chrono::NaiveDate;
use pcrm_core::db::open_db_in_memory;
use pcrm_core::{
    ConfigurationError, Contact, ContactService, EngineConfig, Gift, GiftDirection,
    InteractionKind, OccasionKind,
    PartialDate, Recurrence, RelationshipKind, ServiceError, SqliteContactRepository,
    SuggestionCategory,
};
use uuid::Uuid;

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

#[test]
fn birthday_is_mirrored_into_one_yearly_occasion() {
    let conn = open_db_in_memory().unwrap();
    let service = ContactService::with_defaults(SqliteContactRepository::try_new(&conn).unwrap());

    let mut contact = Contact::new("Ada", day(2024, 1, 1));
    contact.birthday = Some(PartialDate::ymd(1990, 6, 20));
    let id = service.add_contact(&contact).unwrap();

    let occasions = service.list_occasions(id).unwrap();
    assert_eq!(occasions.len(), 1);
    assert_eq!(occasions[0].kind, OccasionKind::Birthday);
    assert_eq!(occasions[0].recurrence, Recurrence::Yearly);
    let occasion_id = occasions[0].id;

    service
        .acknowledge_occasion(occasion_id, day(2025, 6, 20))
        .unwrap();
    contact.birthday = Some(PartialDate::month_day(6, 21));
    service.update_contact(&contact).unwrap();
    let occasions = service.list_occasions(id).unwrap();
    assert_eq!(occasions.len(), 1);
    assert_eq!(occasions[0].id, occasion_id);
    assert_eq!(occasions[0].date, PartialDate::month_day(6, 21));
    assert_eq!(occasions[0].acknowledged_on, Some(day(2025, 6, 20)));

    contact.birthday = None;
    service.update_contact(&contact).unwrap();
    assert!(service.list_occasions(id).unwrap().is_empty());
}

#[test]
fn reminders_and_interactions_flow_into_the_dashboard() {
    let conn = open_db_in_memory().unwrap();
    let service = ContactService::with_defaults(SqliteContactRepository::try_new(&conn).unwrap());
    let as_of = day(2025, 6, 15);

    let id = service
        .add_contact(&Contact::new("Grace", day(2024, 1, 1)))
        .unwrap();
    service
        .log_interaction(
            id,
            day(2025, 6, 14).and_hms_opt(20, 0, 0).unwrap(),
            InteractionKind::Message,
            "congrats on the launch",
        )
        .unwrap();
    service
        .add_reminder(id, "ask about the new job", day(2025, 6, 17))
        .unwrap();

    let render = service.render_dashboard(as_of).unwrap();
    let upcoming: Vec<_> = render
        .items_in(SuggestionCategory::UpcomingOccasion)
        .collect();
    assert_eq!(upcoming.len(), 1);
    assert!(upcoming[0].rationale.starts_with("ask about the new job"));
    assert_eq!(service.list_interactions(id).unwrap().len(), 1);
}

#[test]
fn relate_and_load_graph() {
    let conn = open_db_in_memory().unwrap();
    let service = ContactService::with_defaults(SqliteContactRepository::try_new(&conn).unwrap());
    let a = service
        .add_contact(&Contact::new("A", day(2024, 1, 1)))
        .unwrap();
    let b = service
        .add_contact(&Contact::new("B", day(2024, 1, 1)))
        .unwrap();
    let c = service
        .add_contact(&Contact::new("C", day(2024, 1, 1)))
        .unwrap();

    service.relate(a, b, RelationshipKind::Friend, 0.6).unwrap();
    service.relate(b, c, RelationshipKind::Colleague, 0.3).unwrap();

    let (graph, diagnostics) = service.load_graph().unwrap();
    assert!(diagnostics.is_empty());
    assert_eq!(graph.connected_component(a).unwrap().len(), 3);
    assert_eq!(graph.degree_centrality(b).unwrap(), 1.0);

    assert!(service.unrelate(c, b).unwrap());
    let export = service.export_graph().unwrap();
    assert_eq!(export.edges.len(), 1);

    service.delete_contact(a).unwrap();
    let (graph, _) = service.load_graph().unwrap();
    assert_eq!(graph.contact_count(), 2);
    assert_eq!(graph.edge_count(), 0);
}

#[test]
fn gifts_can_be_tied_to_the_mirrored_birthday() {
    let conn = open_db_in_memory().unwrap();
    let service = ContactService::with_defaults(SqliteContactRepository::try_new(&conn).unwrap());
    let mut contact = Contact::new("Lin", day(2024, 1, 1));
    contact.birthday = Some(PartialDate::month_day(9, 3));
    let id = service.add_contact(&contact).unwrap();
    let birthday_id = service.list_occasions(id).unwrap()[0].id;

    service
        .add_gift(
            &Gift::new(id, "concert tickets", GiftDirection::Given)
                .on(day(2025, 9, 3))
                .for_occasion(birthday_id),
        )
        .unwrap();
    let gifts = service.list_gifts(id).unwrap();
    assert_eq!(gifts.len(), 1);
    assert_eq!(gifts[0].occasion_id, Some(birthday_id));

    // Clearing the birthday drops the mirrored occasion, not the gift.
    contact.birthday = None;
    service.update_contact(&contact).unwrap();
    let gifts = service.list_gifts(id).unwrap();
    assert_eq!(gifts.len(), 1);
    assert_eq!(gifts[0].occasion_id, None);

    assert!(matches!(
        service.list_gifts(Uuid::new_v4()),
        Err(ServiceError::ContactNotFound(_))
    ));
}

#[test]
fn missing_contacts_map_to_contact_not_found() {
    let conn = open_db_in_memory().unwrap();
    let service = ContactService::with_defaults(SqliteContactRepository::try_new(&conn).unwrap());
    let ghost = Uuid::new_v4();

    assert!(matches!(
        service.delete_contact(ghost),
        Err(ServiceError::ContactNotFound(id)) if id == ghost
    ));
    assert!(matches!(
        service.add_reminder(ghost, "call", day(2025, 1, 1)),
        Err(ServiceError::ContactNotFound(_))
    ));
    assert!(matches!(
        service.update_contact(&Contact::with_id(ghost, "Ghost", day(2024, 1, 1))),
        Err(ServiceError::ContactNotFound(_))
    ));
    assert!(matches!(
        service.list_occasions(ghost),
        Err(ServiceError::ContactNotFound(_))
    ));
}

#[test]
fn service_rejects_invalid_config() {
    let conn = open_db_in_memory().unwrap();
    let config = EngineConfig {
        max_proximity_boost: 2.0,
        ..EngineConfig::default()
    };
    let result = ContactService::new(SqliteContactRepository::try_new(&conn).unwrap(), config);
    assert!(matches!(
        result,
        Err(ServiceError::Config(ConfigurationError::OutOfRange {
            field: "max_proximity_boost",
            ..
        }))
    ));
}
