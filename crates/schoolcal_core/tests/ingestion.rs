use schoolcal_core::db::{open_db, open_db_in_memory};
use schoolcal_core::{
    BatchStatus, Calendar, CoreConfig, ErrorKind, EventScope, IngestOptions, JsonRowSource,
    RowRecord, WriteOutcome,
};
use std::collections::HashSet;
use std::thread;

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

fn all_events(calendar: &Calendar<'_>) -> Vec<schoolcal_core::Event> {
    let mut events = calendar.list_events_for_unit(None).unwrap();
    for unit in calendar.list_units().unwrap() {
        events.extend(calendar.list_events_for_unit(Some(unit.id)).unwrap());
    }
    events
}

#[test]
fn partial_batch_keeps_rows_before_the_bad_one() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let rows = vec![
        RowRecord::new("A", "2024-01-01", "allschool"),
        RowRecord::new("B", "not-a-date", "X"),
        RowRecord::new("C", "2024-01-03", "allschool"),
    ];

    let report = calendar.ingest_batch(&rows);
    assert_eq!(report.status, BatchStatus::Aborted);
    assert_eq!(report.committed_count, 1);
    assert_eq!(report.first_error_row(), Some(1));
    assert_eq!(report.first_error.unwrap().kind, ErrorKind::Validation);

    let titles: Vec<String> = calendar
        .list_events_for_unit(None)
        .unwrap()
        .into_iter()
        .map(|event| event.title)
        .collect();
    assert_eq!(titles, vec!["A".to_string()]);
}

#[test]
fn reingesting_same_rows_skips_everything() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    calendar.create_unit("North").unwrap();
    let rows = vec![
        RowRecord::new("Fair", "2024-02-01", "North"),
        RowRecord::new("Holiday", "2024-02-05", "ALLSCHOOL"),
        RowRecord::new("Fair", "2024-02-01T14:00:00", "North"),
    ];

    let first = calendar.ingest_batch(&rows);
    assert!(first.is_completed());
    assert_eq!(first.inserted_count, 2);
    assert_eq!(first.skipped_count, 1);
    let after_first: HashSet<_> = all_events(&calendar).into_iter().map(|e| e.id).collect();

    let second = calendar.ingest_batch(&rows);
    assert!(second.is_completed());
    assert_eq!(second.inserted_count, 0);
    assert_eq!(second.committed_count, 3);
    assert!(second
        .outcomes
        .iter()
        .all(|outcome| matches!(outcome, WriteOutcome::DuplicateSkipped(_))));

    let after_second: HashSet<_> = all_events(&calendar).into_iter().map(|e| e.id).collect();
    assert_eq!(after_first, after_second);
}

#[test]
fn unknown_unit_aborts_and_names_it() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    calendar.create_unit("North").unwrap();
    let rows = vec![
        RowRecord::new("Fair", "2024-02-01", "North"),
        RowRecord::new("Fair", "2024-02-01", "Southside"),
        RowRecord::new("Later", "2024-02-09", "North"),
    ];

    let report = calendar.ingest_batch(&rows);
    assert_eq!(report.status, BatchStatus::Aborted);
    assert_eq!(report.committed_count, 1);
    let failure = report.first_error.unwrap();
    assert_eq!(failure.row, 1);
    assert_eq!(failure.kind, ErrorKind::Scope);
    assert!(failure.reason.contains("Southside"));
}

#[test]
fn rows_resolve_units_by_name_and_global_token() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let north = calendar.create_unit("North").unwrap().unit;
    let rows = vec![
        RowRecord::new("Fair", "2024-02-01", " North "),
        RowRecord::new("Holiday", "2024-02-05", "AllSchool"),
    ];

    let report = calendar.ingest_batch(&rows);
    assert!(report.is_completed());
    assert_eq!(report.outcomes[0].event().scope, EventScope::Unit(north.id));
    assert_eq!(report.outcomes[1].event().scope, EventScope::Global);
}

#[test]
fn ingested_globals_reach_units_registered_afterwards() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let rows = vec![RowRecord::new("Holiday", "2024-02-05", "allschool")];
    calendar.ingest_batch(&rows);

    let unit = calendar.create_unit("Late Comer").unwrap().unit;
    let events = calendar.list_events_for_unit(Some(unit.id)).unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].title, "Holiday");
}

#[test]
fn custom_global_token_is_honored() {
    let conn = setup();
    let config = CoreConfig {
        global_scope_token: "district".to_string(),
        ..CoreConfig::default()
    };
    let calendar = Calendar::new(&conn, config).unwrap();
    let rows = vec![RowRecord::new("Holiday", "2024-02-05", "District")];

    let report = calendar.ingest_batch(&rows);
    assert!(report.is_completed());
    assert_eq!(report.outcomes[0].event().scope, EventScope::Global);

    let rows = vec![RowRecord::new("Holiday", "2024-02-06", "allschool")];
    let report = calendar.ingest_batch(&rows);
    assert_eq!(report.first_error.unwrap().kind, ErrorKind::Scope);
}

#[test]
fn json_upload_accepts_event_column_and_reports_bad_payload_at_row_zero() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();

    let source = JsonRowSource::new(
        r#"[{"event": "Picture Day", "date": "2024-10-02", "school": "allschool"}]"#,
    );
    let report = calendar.ingest_source(&source, IngestOptions::default());
    assert!(report.is_completed());
    assert_eq!(report.outcomes[0].event().title, "Picture Day");

    let report = calendar.ingest_source(&JsonRowSource::new("[1, 2"), IngestOptions::default());
    assert_eq!(report.status, BatchStatus::Aborted);
    assert_eq!(report.first_error_row(), Some(0));
}

#[test]
fn blank_title_aborts_the_batch() {
    let conn = setup();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let rows = vec![RowRecord::new("  ", "2024-02-05", "allschool")];

    let report = calendar.ingest_batch(&rows);
    assert_eq!(report.first_error_row(), Some(0));
    assert_eq!(report.first_error.unwrap().kind, ErrorKind::Validation);
}

#[test]
fn concurrent_uploads_of_same_rows_never_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shared.db");
    {
        let conn = open_db(&path).unwrap();
        let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
        calendar.create_unit("North").unwrap();
    }

    let rows: Vec<RowRecord> = (1..=20)
        .map(|day| {
            let unit = if day % 2 == 0 { "North" } else { "allschool" };
            RowRecord::new(format!("Day {day}"), format!("2024-03-{day:02}"), unit)
        })
        .collect();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let path = path.clone();
            let rows = rows.clone();
            thread::spawn(move || {
                let conn = open_db(&path).unwrap();
                let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
                calendar.ingest_batch(&rows)
            })
        })
        .collect();

    let mut inserted = 0;
    for handle in handles {
        let report = handle.join().unwrap();
        assert!(report.is_completed(), "batch failed: {:?}", report.first_error);
        inserted += report.inserted_count;
    }
    assert_eq!(inserted, 20);

    let conn = open_db(&path).unwrap();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    assert_eq!(all_events(&calendar).len(), 20);
}
