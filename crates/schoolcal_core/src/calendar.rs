//! Calendar entry points for transport layers.
//!
//! # Responsibility
//! - Bundle repositories and configuration for one connection.
//! - Expose the operations an upload/admin endpoint calls, each returning a
//!   result or a named error.
//!
//! # Invariants
//! - Holds no process-wide state; each `Calendar` borrows one connection.
//! - Direct creates consult the conflict resolver and report duplicates as
//!   errors; sync and ingestion skip them.

use crate::config::CoreConfig;
use crate::error::CalendarResult;
use crate::ingest::pipeline::{BatchReport, IngestOptions, IngestionPipeline};
use crate::ingest::row::{RowRecord, RowSource};
use crate::model::event::{Event, EventId, EventScope};
use crate::model::unit::{Unit, UnitId};
use crate::repo::event_repo::SqliteEventRepository;
use crate::repo::unit_repo::SqliteUnitRepository;
use crate::service::event_store::{CalendarEntry, EventPatch, EventStore};
use crate::service::sync_engine::{SyncEngine, SyncReport};
use crate::service::unit_registry::{UnitRegistration, UnitRegistry};
use rusqlite::Connection;

type UnitRepo<'a, 'conn> = &'a SqliteUnitRepository<'conn>;
type EventRepo<'a, 'conn> = &'a SqliteEventRepository<'conn>;

pub struct Calendar<'conn> {
    units: SqliteUnitRepository<'conn>,
    events: SqliteEventRepository<'conn>,
    config: CoreConfig,
}

impl<'conn> Calendar<'conn> {
    /// Binds to a migrated connection.
    pub fn new(conn: &'conn Connection, config: CoreConfig) -> CalendarResult<Self> {
        Ok(Self {
            units: SqliteUnitRepository::try_new(conn)?,
            events: SqliteEventRepository::try_new(conn)?,
            config,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn registry(&self) -> UnitRegistry<'_, UnitRepo<'_, 'conn>, EventRepo<'_, 'conn>> {
        UnitRegistry::new(&self.units, &self.events, &self.config)
    }

    pub fn store(&self) -> EventStore<UnitRepo<'_, 'conn>, EventRepo<'_, 'conn>> {
        EventStore::new(&self.units, &self.events)
    }

    pub fn pipeline(&self) -> IngestionPipeline<'_, UnitRepo<'_, 'conn>, EventRepo<'_, 'conn>> {
        IngestionPipeline::new(&self.units, &self.events, &self.config)
    }

    /// Registers a unit; it inherits every current global event.
    pub fn create_unit(&self, name: &str) -> CalendarResult<UnitRegistration> {
        self.registry().create_unit(name)
    }

    pub fn list_units(&self) -> CalendarResult<Vec<Unit>> {
        self.registry().list_units()
    }

    pub fn share_link(&self, unit_id: UnitId) -> CalendarResult<String> {
        self.registry().share_link(unit_id)
    }

    /// Re-runs propagation for an existing unit, e.g. after a storage
    /// failure interrupted registration.
    pub fn sync_unit(&self, unit_id: UnitId) -> CalendarResult<SyncReport> {
        let unit = self.registry().find_unit(unit_id)?;
        SyncEngine::new(&self.events).on_unit_created(&unit)
    }

    pub fn ingest_batch(&self, rows: &[RowRecord]) -> BatchReport {
        self.pipeline().ingest_batch(rows)
    }

    pub fn ingest_global_batch(&self, rows: &[RowRecord]) -> BatchReport {
        self.pipeline().ingest_global_batch(rows)
    }

    pub fn ingest_source(&self, source: &dyn RowSource, options: IngestOptions<'_>) -> BatchReport {
        self.pipeline().ingest_source(source, options)
    }

    /// Events of one unit (or the global scope for `None`), by date.
    ///
    /// A unit id that does not resolve is `UnitNotFound`.
    pub fn list_events_for_unit(&self, unit_id: Option<UnitId>) -> CalendarResult<Vec<Event>> {
        let scope = EventScope::from_unit(unit_id);
        if let Some(unit_id) = unit_id {
            self.registry().find_unit(unit_id)?;
        }
        self.store().find_events_by_scope(scope)
    }

    pub fn calendar_for_unit(&self, unit_id: Option<UnitId>) -> CalendarResult<Vec<CalendarEntry>> {
        self.store().calendar_for(EventScope::from_unit(unit_id))
    }

    /// Creates one event, failing with `Duplicate` when its key is taken.
    pub fn create_event(
        &self,
        title: &str,
        date: &str,
        unit_id: Option<UnitId>,
    ) -> CalendarResult<Event> {
        self.store()
            .create_event(title, date, EventScope::from_unit(unit_id))
    }

    pub fn update_event(&self, id: EventId, patch: &EventPatch) -> CalendarResult<Event> {
        self.store().update_event(id, patch)
    }

    pub fn delete_event(&self, id: EventId) -> CalendarResult<()> {
        self.store().delete_event(id)
    }
}
