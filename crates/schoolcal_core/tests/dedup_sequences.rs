use rusqlite::Connection;
use schoolcal_core::db::open_db_in_memory;
use schoolcal_core::{Calendar, CalendarError, CoreConfig, EventPatch, RowRecord, UnitId};
use std::collections::HashSet;

const TITLES: [&str; 3] = ["Assembly", "Picture Day", "Science Fair"];
const DATES: [&str; 3] = ["2024-11-04", "2024-11-05T08:30:00", "11/06/2024"];

fn stored_keys(conn: &Connection) -> Vec<(String, String, String)> {
    let mut stmt = conn
        .prepare("SELECT title, event_date, scope_key FROM events;")
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
        .unwrap();
    rows.map(Result::unwrap).collect()
}

fn assert_no_duplicate_keys(conn: &Connection, step: usize) {
    let keys = stored_keys(conn);
    let distinct: HashSet<_> = keys.iter().collect();
    assert_eq!(distinct.len(), keys.len(), "duplicate key after step {step}");
}

fn rows_for(step: usize, units: &[(UnitId, String)]) -> Vec<RowRecord> {
    (0..4)
        .map(|offset| {
            let pick = step + offset;
            let unit = match units.get(pick % (units.len() + 1)) {
                Some((_, name)) => name.clone(),
                None => "allschool".to_string(),
            };
            RowRecord::new(TITLES[pick % TITLES.len()], DATES[pick % DATES.len()], unit)
        })
        .collect()
}

#[test]
fn mixed_creates_syncs_and_uploads_never_store_a_key_twice() {
    let conn = open_db_in_memory().unwrap();
    let calendar = Calendar::new(&conn, CoreConfig::default()).unwrap();
    let mut units: Vec<(UnitId, String)> = Vec::new();
    let mut uploaded: Vec<Vec<RowRecord>> = Vec::new();

    for step in 0..24 {
        match step % 6 {
            0 => {
                let name = format!("School {}", units.len());
                let unit = calendar.create_unit(&name).unwrap().unit;
                units.push((unit.id, name));
            }
            1 => {
                let scope = units.get(step % 3).map(|(id, _)| *id);
                match calendar.create_event(TITLES[step % 3], DATES[step % 3], scope) {
                    Ok(_) | Err(CalendarError::Duplicate(_)) => {}
                    Err(other) => panic!("unexpected error at step {step}: {other}"),
                }
            }
            2 | 3 => {
                let rows = rows_for(step, &units);
                let report = calendar.ingest_batch(&rows);
                assert!(report.is_completed(), "step {step}: {:?}", report.first_error);
                uploaded.push(rows);
            }
            4 => {
                for (id, _) in &units {
                    assert!(calendar.sync_unit(*id).unwrap().is_clean());
                }
            }
            _ => {
                let globals = calendar.list_events_for_unit(None).unwrap();
                if let [first, second, ..] = globals.as_slice() {
                    let patch = EventPatch {
                        title: Some(second.title.clone()),
                        date: Some(second.date.to_string()),
                        ..EventPatch::default()
                    };
                    match calendar.update_event(first.id, &patch) {
                        Ok(_) | Err(CalendarError::Duplicate(_)) => {}
                        Err(other) => panic!("unexpected error at step {step}: {other}"),
                    }
                }
            }
        }
        assert_no_duplicate_keys(&conn, step);
    }

    let before = stored_keys(&conn).len();
    for rows in &uploaded {
        let report = calendar.ingest_batch(rows);
        assert!(report.is_completed());
        assert_eq!(report.inserted_count, 0);
        assert_eq!(report.skipped_count, rows.len());
    }
    assert_eq!(stored_keys(&conn).len(), before);
    assert_no_duplicate_keys(&conn, 24);
}
