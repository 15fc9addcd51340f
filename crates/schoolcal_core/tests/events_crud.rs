use schoolcal_core::db::open_db_in_memory;
use schoolcal_core::{
    Calendar, CalendarError, CoreConfig, ErrorKind, EventPatch, EventScope, EventValidationError,
};
use uuid::Uuid;

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn create_normalizes_time_of_day_and_lists_by_date() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();

    let later = calendar.create_event("Exams", "2024-06-10T09:00:00", None).unwrap();
    let earlier = calendar.create_event("Sports", "2024-05-01", None).unwrap();
    assert_eq!(later.date.to_string(), "2024-06-10");

    let listed = calendar.list_events_for_unit(None).unwrap();
    assert_eq!(listed, vec![earlier, later]);
}

#[test]
fn same_day_different_time_collides_on_direct_create() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let unit = calendar.create_unit("Riverside").unwrap().unit;

    let first = calendar
        .create_event("Parents Night", "2024-03-05T18:30:00", Some(unit.id))
        .unwrap();
    let err = calendar
        .create_event("Parents Night", "2024-03-05T00:00:00", Some(unit.id))
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Duplicate);
    assert!(matches!(err, CalendarError::Duplicate(existing) if existing.id == first.id));
}

#[test]
fn same_key_in_different_scopes_does_not_collide() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let unit = calendar.create_unit("Riverside").unwrap().unit;

    calendar.create_event("Concert", "2024-04-01", None).unwrap();
    let scoped = calendar
        .create_event("Concert", "2024-04-01", Some(unit.id))
        .unwrap();
    assert_eq!(scoped.scope, EventScope::Unit(unit.id));
}

#[test]
fn create_for_unknown_unit_is_scope_error() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();

    let err = calendar
        .create_event("Concert", "2024-04-01", Some(Uuid::new_v4()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scope);
}

#[test]
fn create_rejects_unparseable_date() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();

    let err = calendar.create_event("Concert", "soon", None).unwrap_err();
    assert!(matches!(
        err,
        CalendarError::InvalidEvent(EventValidationError::UnparseableDate(_))
    ));
    assert!(!err.is_retryable());
}

#[test]
fn update_changes_title_and_date_only() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let unit = calendar.create_unit("Hillcrest").unwrap().unit;
    let event = calendar
        .create_event("Play", "2024-04-01", Some(unit.id))
        .unwrap();

    let patch = EventPatch {
        date: Some("2024-04-02T15:45:00".to_string()),
        scope: Some(EventScope::Unit(unit.id)),
        ..EventPatch::default()
    };
    let updated = calendar.update_event(event.id, &patch).unwrap();
    assert_eq!(updated.title, "Play");
    assert_eq!(updated.date.to_string(), "2024-04-02");
    assert_eq!(updated.scope, EventScope::Unit(unit.id));

    let listed = calendar.list_events_for_unit(Some(unit.id)).unwrap();
    assert_eq!(listed, vec![updated]);
}

#[test]
fn update_into_existing_key_is_rejected() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let first = calendar.create_event("Play", "2024-04-01", None).unwrap();
    let second = calendar.create_event("Play", "2024-04-02", None).unwrap();

    let patch = EventPatch {
        date: Some("2024-04-01".to_string()),
        ..EventPatch::default()
    };
    let err = calendar.update_event(second.id, &patch).unwrap_err();
    assert!(matches!(err, CalendarError::Duplicate(existing) if existing.id == first.id));
}

#[test]
fn update_rejects_moving_to_another_scope() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let unit = calendar.create_unit("Hillcrest").unwrap().unit;
    let event = calendar.create_event("Play", "2024-04-01", None).unwrap();

    let patch = EventPatch {
        scope: Some(EventScope::Unit(unit.id)),
        ..EventPatch::default()
    };
    let err = calendar.update_event(event.id, &patch).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Scope);
}

#[test]
fn update_and_delete_missing_event_are_not_found() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let missing = Uuid::new_v4();

    let err = calendar
        .update_event(missing, &EventPatch::default())
        .unwrap_err();
    assert!(matches!(err, CalendarError::EventNotFound(id) if id == missing));

    let err = calendar.delete_event(missing).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn delete_removes_event_and_frees_its_key() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let event = calendar.create_event("Play", "2024-04-01", None).unwrap();

    calendar.delete_event(event.id).unwrap();
    assert!(calendar.list_events_for_unit(None).unwrap().is_empty());
    calendar.create_event("Play", "2024-04-01", None).unwrap();
}

#[test]
fn listing_unknown_unit_is_not_found() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();

    let err = calendar
        .list_events_for_unit(Some(Uuid::new_v4()))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[test]
fn calendar_view_resolves_unit_name_and_marks_all_day() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let unit = calendar.create_unit("Hillcrest").unwrap().unit;
    calendar
        .create_event("Play", "2024-04-01", Some(unit.id))
        .unwrap();

    let entries = calendar.calendar_for_unit(Some(unit.id)).unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].unit_name.as_deref(), Some("Hillcrest"));
    assert!(entries[0].all_day);

    let json = serde_json::to_value(&entries[0]).unwrap();
    assert_eq!(json["date"], "2024-04-01");
    assert_eq!(json["unitName"], "Hillcrest");
    assert_eq!(json["allDay"], true);
}
