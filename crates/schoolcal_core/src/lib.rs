//! Core domain logic for the school calendar.
//! This crate is the single source of truth for scope, dedup and
//! propagation invariants.

pub mod calendar;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use calendar::Calendar;
pub use config::{ConfigError, CoreConfig};
pub use error::{CalendarError, CalendarResult, ErrorKind};
pub use ingest::pipeline::{
    BatchReport, BatchStatus, IngestMode, IngestOptions, IngestionPipeline, RowFailure,
};
pub use ingest::row::{JsonRowSource, RowRecord, RowSource, RowSourceError};
pub use logging::{default_log_level, init_logging, init_logging_from_config, logging_status};
pub use model::event::{Event, EventDate, EventId, EventKey, EventScope, EventValidationError};
pub use model::unit::{Unit, UnitId, UnitValidationError};
pub use repo::event_repo::{EventRepository, SqliteEventRepository};
pub use repo::unit_repo::{SqliteUnitRepository, UnitRepository};
pub use repo::{RepoError, RepoResult};
pub use service::conflict::{ConflictResolver, Resolution, WriteOutcome};
pub use service::event_store::{CalendarEntry, EventPatch, EventStore};
pub use service::sync_engine::{SyncEngine, SyncFailure, SyncReport};
pub use service::unit_registry::{UnitRegistration, UnitRegistry};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
