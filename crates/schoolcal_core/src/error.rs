//! Service-level error model.
//!
//! # Responsibility
//! - Give every failure path a structured reason: a kind plus a
//!   human-readable detail.
//! - Separate retryable storage failures from caller mistakes.
//!
//! # Invariants
//! - `StorageUnavailable` is the only retryable kind.
//! - A duplicate skipped by sync or ingestion is an outcome, never an error.

use crate::model::event::{Event, EventId, EventScope, EventValidationError};
use crate::model::unit::{UnitId, UnitValidationError};
use crate::repo::RepoError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CalendarResult<T> = Result<T, CalendarError>;

/// Coarse error classification exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input. Never retried.
    Validation,
    /// Invalid unit reference or attempt to change an event's scope.
    Scope,
    /// Referenced unit or event is absent.
    NotFound,
    /// Direct write collides with an existing event.
    Duplicate,
    /// Storage busy, locked or unreachable. Safe to retry with backoff.
    StorageUnavailable,
    /// Any other storage fault.
    Storage,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Scope => "scope",
            Self::NotFound => "not_found",
            Self::Duplicate => "duplicate",
            Self::StorageUnavailable => "storage_unavailable",
            Self::Storage => "storage",
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors returned by calendar services.
#[derive(Debug)]
pub enum CalendarError {
    InvalidEvent(EventValidationError),
    InvalidUnit(UnitValidationError),
    /// Strict naming mode rejected a name already registered.
    DuplicateUnitName(String),
    /// Share links need a configured frontend URL.
    MissingFrontendUrl,
    /// Uploaded row lacks a required column value.
    MissingRowField(&'static str),
    UnitNotFound(UnitId),
    EventNotFound(EventId),
    /// Event references a unit that does not exist.
    UnknownScopeUnit(UnitId),
    /// Ingestion row names a unit that is not registered.
    UnknownUnitName(String),
    /// Update tried to move an event to another scope.
    ScopeImmutable {
        event_id: EventId,
        stored: EventScope,
        requested: EventScope,
    },
    /// Direct create/update collides with this existing event.
    Duplicate(Box<Event>),
    StorageUnavailable(RepoError),
    Storage(RepoError),
}

impl CalendarError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidEvent(_)
            | Self::InvalidUnit(_)
            | Self::DuplicateUnitName(_)
            | Self::MissingFrontendUrl
            | Self::MissingRowField(_) => ErrorKind::Validation,
            Self::UnknownScopeUnit(_) | Self::UnknownUnitName(_) | Self::ScopeImmutable { .. } => {
                ErrorKind::Scope
            }
            Self::UnitNotFound(_) | Self::EventNotFound(_) => ErrorKind::NotFound,
            Self::Duplicate(_) => ErrorKind::Duplicate,
            Self::StorageUnavailable(_) => ErrorKind::StorageUnavailable,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::StorageUnavailable
    }
}

impl Display for CalendarError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidEvent(err) => write!(f, "{err}"),
            Self::InvalidUnit(err) => write!(f, "{err}"),
            Self::DuplicateUnitName(name) => write!(f, "unit name already registered: `{name}`"),
            Self::MissingFrontendUrl => write!(f, "frontend url is not configured"),
            Self::MissingRowField(field) => write!(f, "row is missing `{field}`"),
            Self::UnitNotFound(id) => write!(f, "unit not found: {id}"),
            Self::EventNotFound(id) => write!(f, "event not found: {id}"),
            Self::UnknownScopeUnit(id) => write!(f, "event references unknown unit: {id}"),
            Self::UnknownUnitName(name) => write!(f, "unit not found: `{name}`"),
            Self::ScopeImmutable {
                event_id,
                stored,
                requested,
            } => write!(
                f,
                "event {event_id} belongs to {stored}; cannot move it to {requested}"
            ),
            Self::Duplicate(existing) => write!(
                f,
                "event already exists on {} in scope {}: {}",
                existing.date, existing.scope, existing.id
            ),
            Self::StorageUnavailable(err) => write!(f, "storage unavailable: {err}"),
            Self::Storage(err) => write!(f, "storage failure: {err}"),
        }
    }
}

impl Error for CalendarError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidEvent(err) => Some(err),
            Self::InvalidUnit(err) => Some(err),
            Self::StorageUnavailable(err) | Self::Storage(err) => Some(err),
            _ => None,
        }
    }
}

impl From<EventValidationError> for CalendarError {
    fn from(value: EventValidationError) -> Self {
        Self::InvalidEvent(value)
    }
}

impl From<UnitValidationError> for CalendarError {
    fn from(value: UnitValidationError) -> Self {
        Self::InvalidUnit(value)
    }
}

impl From<RepoError> for CalendarError {
    fn from(value: RepoError) -> Self {
        if value.is_transient() {
            Self::StorageUnavailable(value)
        } else {
            Self::Storage(value)
        }
    }
}
