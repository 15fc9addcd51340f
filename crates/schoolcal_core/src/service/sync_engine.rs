//! Propagation of global events into newly registered units.
//!
//! # Responsibility
//! - Copy every global event into a unit's own scope when the unit is
//!   registered.
//!
//! # Invariants
//! - Propagation is additive and idempotent: re-running it for the same
//!   unit inserts nothing new.
//! - Propagation is point-in-time. Global events created later are not
//!   pushed into existing units.
//! - One failed copy does not stop the others; only unreachable storage
//!   aborts the run.

use crate::error::{CalendarError, CalendarResult, ErrorKind};
use crate::model::event::{EventId, EventKey, EventScope};
use crate::model::unit::{Unit, UnitId};
use crate::repo::event_repo::EventRepository;
use crate::service::conflict::{ConflictResolver, WriteOutcome};
use log::{info, warn};
use std::time::Instant;

/// One global event that could not be copied into the unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncFailure {
    pub source_event: EventId,
    pub kind: ErrorKind,
    pub reason: String,
}

/// Summary of one propagation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub unit_id: UnitId,
    /// Number of global events considered.
    pub global_events: usize,
    /// Ids of the unit-scoped copies created by this run.
    pub inherited: Vec<EventId>,
    /// Global events the unit already had.
    pub skipped: usize,
    pub failures: Vec<SyncFailure>,
}

impl SyncReport {
    fn new(unit_id: UnitId) -> Self {
        Self {
            unit_id,
            global_events: 0,
            inherited: Vec::new(),
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct SyncEngine<E: EventRepository> {
    events: E,
}

impl<E: EventRepository> SyncEngine<E> {
    pub fn new(events: E) -> Self {
        Self { events }
    }

    /// Copies all current global events into `unit`'s scope.
    ///
    /// # Errors
    /// - `StorageUnavailable` when storage cannot be reached; copies made
    ///   before the failure are kept and a re-run completes the rest.
    pub fn on_unit_created(&self, unit: &Unit) -> CalendarResult<SyncReport> {
        let started_at = Instant::now();
        let globals = self.events.list_events_by_scope(EventScope::Global)?;
        let resolver = ConflictResolver::new(&self.events);
        let mut report = SyncReport::new(unit.id);
        report.global_events = globals.len();

        for global in globals {
            let key = EventKey {
                title: global.title,
                date: global.date,
                scope: EventScope::Unit(unit.id),
            };

            match resolver.insert_or_skip(key) {
                Ok(WriteOutcome::Inserted(copy)) => report.inherited.push(copy.id),
                Ok(WriteOutcome::DuplicateSkipped(_)) => report.skipped += 1,
                Err(err) => {
                    let err = CalendarError::from(err);
                    if err.is_retryable() {
                        warn!(
                            "event=unit_sync module=sync status=error unit_id={} inherited={} error_code={}",
                            unit.id,
                            report.inherited.len(),
                            err.kind()
                        );
                        return Err(err);
                    }
                    warn!(
                        "event=unit_sync_item module=sync status=error unit_id={} source_event={} error_code={}",
                        unit.id,
                        global.id,
                        err.kind()
                    );
                    report.failures.push(SyncFailure {
                        source_event: global.id,
                        kind: err.kind(),
                        reason: err.to_string(),
                    });
                }
            }
        }

        info!(
            "event=unit_sync module=sync status=ok unit_id={} globals={} inherited={} skipped={} failed={} duration_ms={}",
            unit.id,
            report.global_events,
            report.inherited.len(),
            report.skipped,
            report.failures.len(),
            started_at.elapsed().as_millis()
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::SyncEngine;
    use crate::db::open_db_in_memory;
    use crate::error::ErrorKind;
    use crate::repo::event_repo::testing::{busy, corrupt, FailingInserts};
    use crate::model::event::{Event, EventDate, EventKey, EventScope};
    use crate::model::unit::Unit;
    use crate::repo::event_repo::{EventRepository, SqliteEventRepository};

    fn global(repo: &SqliteEventRepository<'_>, title: &str, date: &str) -> Event {
        let key = EventKey::new(title, EventDate::parse(date).unwrap(), EventScope::Global).unwrap();
        let event = Event::from_key(key);
        repo.insert_event(&event).unwrap();
        event
    }

    #[test]
    fn copies_every_global_event_into_unit_scope() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteEventRepository::try_new(&conn).unwrap();
        global(&repo, "Winter Break", "2024-12-20");
        global(&repo, "New Year", "2025-01-01");
        let unit = Unit::new("West").unwrap();

        let report = SyncEngine::new(&repo).on_unit_created(&unit).unwrap();
        assert_eq!(report.global_events, 2);
        assert_eq!(report.inherited.len(), 2);
        assert!(report.is_clean());

        let copies = repo.list_events_by_scope(EventScope::Unit(unit.id)).unwrap();
        let titles: Vec<&str> = copies.iter().map(|event| event.title.as_str()).collect();
        assert_eq!(titles, vec!["Winter Break", "New Year"]);
    }

    #[test]
    fn rerun_is_idempotent() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteEventRepository::try_new(&conn).unwrap();
        global(&repo, "Winter Break", "2024-12-20");
        let unit = Unit::new("West").unwrap();
        let engine = SyncEngine::new(&repo);

        engine.on_unit_created(&unit).unwrap();
        let second = engine.on_unit_created(&unit).unwrap();
        assert!(second.inherited.is_empty());
        assert_eq!(second.skipped, 1);
        assert_eq!(
            repo.list_events_by_scope(EventScope::Unit(unit.id)).unwrap().len(),
            1
        );
    }

    #[test]
    fn no_globals_yields_empty_report() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteEventRepository::try_new(&conn).unwrap();
        let unit = Unit::new("West").unwrap();

        let report = SyncEngine::new(&repo).on_unit_created(&unit).unwrap();
        assert_eq!(report.global_events, 0);
        assert!(report.inherited.is_empty());
    }

    #[test]
    fn failed_copy_is_recorded_and_remaining_globals_still_copied() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteEventRepository::try_new(&conn).unwrap();
        global(&repo, "A", "2024-01-01");
        let failing = global(&repo, "B", "2024-01-02");
        global(&repo, "C", "2024-01-03");
        let unit = Unit::new("West").unwrap();
        let events = FailingInserts {
            inner: &repo,
            fail_title: "B",
            error: corrupt,
        };

        let report = SyncEngine::new(&events).on_unit_created(&unit).unwrap();
        assert_eq!(report.global_events, 3);
        assert_eq!(report.inherited.len(), 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].source_event, failing.id);
        assert_eq!(report.failures[0].kind, ErrorKind::Storage);
        assert!(!report.is_clean());

        let copies = repo.list_events_by_scope(EventScope::Unit(unit.id)).unwrap();
        let titles: Vec<&str> = copies.iter().map(|event| event.title.as_str()).collect();
        assert_eq!(titles, vec!["A", "C"]);
    }

    #[test]
    fn busy_storage_aborts_run_and_keeps_earlier_copies() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteEventRepository::try_new(&conn).unwrap();
        global(&repo, "A", "2024-01-01");
        global(&repo, "B", "2024-01-02");
        global(&repo, "C", "2024-01-03");
        let unit = Unit::new("West").unwrap();
        let events = FailingInserts {
            inner: &repo,
            fail_title: "B",
            error: busy,
        };

        let err = SyncEngine::new(&events).on_unit_created(&unit).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::StorageUnavailable);
        assert!(err.is_retryable());

        let copies = repo.list_events_by_scope(EventScope::Unit(unit.id)).unwrap();
        let titles: Vec<&str> = copies.iter().map(|event| event.title.as_str()).collect();
        assert_eq!(titles, vec!["A"]);

        let resumed = SyncEngine::new(&repo).on_unit_created(&unit).unwrap();
        assert_eq!(resumed.inherited.len(), 2);
        assert_eq!(resumed.skipped, 1);
    }
}
