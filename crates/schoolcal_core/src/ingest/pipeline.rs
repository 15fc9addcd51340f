//! Bulk load of uploaded rows into events.
//!
//! # Responsibility
//! - Validate each row, resolve its unit token and apply the shared
//!   duplicate policy.
//! - Report how far a batch got and why it stopped.
//!
//! # Invariants
//! - Rows are processed strictly in order; row indexes are 0-based and
//!   stable for error reporting.
//! - The first invalid row aborts the batch. Rows before it stay committed
//!   and rows after it are never looked at.
//! - Re-uploading the same rows never fails and never duplicates: existing
//!   keys are skipped.

use crate::config::CoreConfig;
use crate::error::{CalendarError, CalendarResult, ErrorKind};
use crate::ingest::row::{RowRecord, RowSource};
use crate::model::event::{EventDate, EventKey, EventScope};
use crate::repo::event_repo::EventRepository;
use crate::repo::unit_repo::UnitRepository;
use crate::service::conflict::{ConflictResolver, WriteOutcome};
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// How row unit tokens are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IngestMode {
    /// Each row names its unit, or the global token.
    #[default]
    PerRow,
    /// Every row is a global event; unit columns are ignored.
    AllGlobal,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IngestOptions<'a> {
    pub mode: IngestMode,
    /// Checked before each row. Once set, the batch stops and keeps what it
    /// already committed.
    pub cancel: Option<&'a AtomicBool>,
}

/// Terminal state of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchStatus {
    Completed,
    Aborted,
    Cancelled,
}

/// The row that aborted a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowFailure {
    /// 0-based index into the uploaded rows.
    pub row: usize,
    pub kind: ErrorKind,
    pub reason: String,
    /// The failure was transient storage trouble; retrying the upload may
    /// succeed without edits.
    pub retryable: bool,
}

/// Outcome of one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub status: BatchStatus,
    /// Rows processed successfully, inserted or skipped as duplicates.
    pub committed_count: usize,
    pub inserted_count: usize,
    pub skipped_count: usize,
    pub first_error: Option<RowFailure>,
    /// Per-row outcome, in row order, for committed rows.
    pub outcomes: Vec<WriteOutcome>,
}

impl BatchReport {
    fn start() -> Self {
        Self {
            status: BatchStatus::Completed,
            committed_count: 0,
            inserted_count: 0,
            skipped_count: 0,
            first_error: None,
            outcomes: Vec::new(),
        }
    }

    fn record(&mut self, outcome: WriteOutcome) {
        if outcome.is_inserted() {
            self.inserted_count += 1;
        } else {
            self.skipped_count += 1;
        }
        self.committed_count += 1;
        self.outcomes.push(outcome);
    }

    fn abort(&mut self, row: usize, err: &CalendarError) {
        self.status = BatchStatus::Aborted;
        self.first_error = Some(RowFailure {
            row,
            kind: err.kind(),
            reason: err.to_string(),
            retryable: err.is_retryable(),
        });
    }

    pub fn first_error_row(&self) -> Option<usize> {
        self.first_error.as_ref().map(|failure| failure.row)
    }

    pub fn is_completed(&self) -> bool {
        self.status == BatchStatus::Completed
    }
}

pub struct IngestionPipeline<'cfg, U: UnitRepository, E: EventRepository> {
    units: U,
    events: E,
    config: &'cfg CoreConfig,
}

impl<'cfg, U: UnitRepository, E: EventRepository> IngestionPipeline<'cfg, U, E> {
    pub fn new(units: U, events: E, config: &'cfg CoreConfig) -> Self {
        Self {
            units,
            events,
            config,
        }
    }

    /// Loads rows whose unit column names a unit or the global token.
    pub fn ingest_batch(&self, rows: &[RowRecord]) -> BatchReport {
        self.ingest_with_options(rows, IngestOptions::default())
    }

    /// Loads rows as global events regardless of any unit column.
    pub fn ingest_global_batch(&self, rows: &[RowRecord]) -> BatchReport {
        self.ingest_with_options(
            rows,
            IngestOptions {
                mode: IngestMode::AllGlobal,
                cancel: None,
            },
        )
    }

    /// Pulls rows from `source` and loads them.
    ///
    /// A source that cannot produce rows aborts at row 0 before any row is
    /// processed.
    pub fn ingest_source(&self, source: &dyn RowSource, options: IngestOptions<'_>) -> BatchReport {
        match source.rows() {
            Ok(rows) => self.ingest_with_options(&rows, options),
            Err(err) => {
                warn!(
                    "event=ingest_batch module=ingest status=aborted row=0 error_code=invalid_source"
                );
                let mut report = BatchReport::start();
                report.status = BatchStatus::Aborted;
                report.first_error = Some(RowFailure {
                    row: 0,
                    kind: ErrorKind::Validation,
                    reason: err.to_string(),
                    retryable: false,
                });
                report
            }
        }
    }

    pub fn ingest_with_options(&self, rows: &[RowRecord], options: IngestOptions<'_>) -> BatchReport {
        let started_at = Instant::now();
        info!(
            "event=ingest_batch module=ingest status=start rows={} mode={:?}",
            rows.len(),
            options.mode
        );

        let resolver = ConflictResolver::new(&self.events);
        let mut report = BatchReport::start();

        for (index, row) in rows.iter().enumerate() {
            if options
                .cancel
                .is_some_and(|flag| flag.load(Ordering::SeqCst))
            {
                report.status = BatchStatus::Cancelled;
                break;
            }

            let outcome = self
                .row_key(row, options.mode)
                .and_then(|key| resolver.insert_or_skip(key).map_err(CalendarError::from));

            match outcome {
                Ok(outcome) => report.record(outcome),
                Err(err) => {
                    warn!(
                        "event=ingest_row module=ingest status=error row={} error_code={} retryable={}",
                        index,
                        err.kind(),
                        err.is_retryable()
                    );
                    report.abort(index, &err);
                    break;
                }
            }
        }

        info!(
            "event=ingest_batch module=ingest status={:?} rows={} committed={} inserted={} skipped={} duration_ms={}",
            report.status,
            rows.len(),
            report.committed_count,
            report.inserted_count,
            report.skipped_count,
            started_at.elapsed().as_millis()
        );
        report
    }

    fn row_key(&self, row: &RowRecord, mode: IngestMode) -> CalendarResult<EventKey> {
        let date = EventDate::parse(row.date_text().unwrap_or_default())?;
        let scope = match mode {
            IngestMode::AllGlobal => EventScope::Global,
            IngestMode::PerRow => self.resolve_scope(row)?,
        };
        Ok(EventKey::new(
            row.title_text().unwrap_or_default(),
            date,
            scope,
        )?)
    }

    fn resolve_scope(&self, row: &RowRecord) -> CalendarResult<EventScope> {
        let token = row
            .unit_token()
            .ok_or(CalendarError::MissingRowField("unit"))?;
        if self.config.is_global_token(token) {
            return Ok(EventScope::Global);
        }

        let name = token.trim();
        match self.units.find_unit_by_name(name)? {
            Some(unit) => Ok(EventScope::Unit(unit.id)),
            None => Err(CalendarError::UnknownUnitName(name.to_string())),
        }
    }
}
