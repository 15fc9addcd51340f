//! Event domain model.
//!
//! # Responsibility
//! - Define calendar events and their scope (global or one unit).
//! - Parse and normalize input dates to a plain calendar day.
//! - Define the dedup key `(title, date, scope)` shared by every write path.
//!
//! # Invariants
//! - `EventDate` never carries time-of-day; two inputs on the same calendar
//!   day normalize to equal values.
//! - Titles are trimmed and non-empty.
//! - `EventScope::Global` and `EventScope::Unit(_)` never compare equal.

use crate::model::unit::UnitId;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a calendar event.
pub type EventId = Uuid;

/// Storage key used for the global scope in the `events.scope_key` column.
pub(crate) const GLOBAL_SCOPE_KEY: &str = "global";

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y"];

/// Event scope: applies to every unit, or to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "unit_id", rename_all = "snake_case")]
pub enum EventScope {
    Global,
    Unit(UnitId),
}

impl EventScope {
    /// Maps a nullable unit reference to a scope (`None` is global).
    pub fn from_unit(unit_id: Option<UnitId>) -> Self {
        match unit_id {
            Some(id) => Self::Unit(id),
            None => Self::Global,
        }
    }

    pub fn unit_id(&self) -> Option<UnitId> {
        match self {
            Self::Global => None,
            Self::Unit(id) => Some(*id),
        }
    }

    pub fn is_global(&self) -> bool {
        matches!(self, Self::Global)
    }

    /// Non-null key used by the storage uniqueness constraint.
    pub(crate) fn storage_key(&self) -> String {
        match self {
            Self::Global => GLOBAL_SCOPE_KEY.to_string(),
            Self::Unit(id) => id.to_string(),
        }
    }
}

impl Display for EventScope {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Global => write!(f, "global"),
            Self::Unit(id) => write!(f, "unit:{id}"),
        }
    }
}

/// A calendar day with time-of-day cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventDate(NaiveDate);

impl EventDate {
    /// Parses user input into a normalized date.
    ///
    /// Accepts plain dates (`2024-03-05`, `2024/03/05`, `03/05/2024`),
    /// local date-times (`2024-03-05T18:30:00`, `2024-03-05 18:30`) and
    /// RFC 3339 timestamps. Offsets are not converted: the calendar day is
    /// the one written in the input.
    pub fn parse(input: &str) -> Result<Self, EventValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(EventValidationError::EmptyDate);
        }

        if let Ok(value) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self(value.date_naive()));
        }

        for format in DATE_TIME_FORMATS {
            if let Ok(value) = NaiveDateTime::parse_from_str(trimmed, format) {
                return Ok(Self::from_datetime(value));
            }
        }

        for format in DATE_FORMATS {
            if let Ok(value) = NaiveDate::parse_from_str(trimmed, format) {
                return Ok(Self(value));
            }
        }

        Err(EventValidationError::UnparseableDate(trimmed.to_string()))
    }

    /// Drops time-of-day from a date-time.
    pub fn from_datetime(value: NaiveDateTime) -> Self {
        Self(value.date())
    }

    pub fn from_naive(value: NaiveDate) -> Self {
        Self(value)
    }

    pub fn as_naive(&self) -> NaiveDate {
        self.0
    }

    /// The normalized instant: this day at 00:00:00.
    pub fn midnight(&self) -> NaiveDateTime {
        self.0.and_time(NaiveTime::MIN)
    }

    /// Storage representation, `YYYY-MM-DD`. Sorts chronologically as text.
    pub(crate) fn to_storage(self) -> String {
        self.0.format("%Y-%m-%d").to_string()
    }

    pub(crate) fn from_storage(value: &str) -> Option<Self> {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").ok().map(Self)
    }
}

impl Display for EventDate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y-%m-%d"))
    }
}

impl From<NaiveDate> for EventDate {
    fn from(value: NaiveDate) -> Self {
        Self(value)
    }
}

/// Validation failures for event input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventValidationError {
    /// Title is empty after trim.
    EmptyTitle,
    /// Date input is missing or blank.
    EmptyDate,
    /// Date input matches no supported format.
    UnparseableDate(String),
}

impl Display for EventValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyTitle => write!(f, "event title must not be empty"),
            Self::EmptyDate => write!(f, "event date must not be empty"),
            Self::UnparseableDate(value) => write!(f, "invalid date format: `{value}`"),
        }
    }
}

impl Error for EventValidationError {}

/// Trims an event title and rejects blank values.
pub fn normalize_title(title: &str) -> Result<String, EventValidationError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(EventValidationError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}

/// Dedup key of an event: no two stored events share one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventKey {
    pub title: String,
    pub date: EventDate,
    pub scope: EventScope,
}

impl EventKey {
    /// Builds a key with a normalized title.
    pub fn new(
        title: &str,
        date: EventDate,
        scope: EventScope,
    ) -> Result<Self, EventValidationError> {
        Ok(Self {
            title: normalize_title(title)?,
            date,
            scope,
        })
    }
}

/// A single calendar entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    pub date: EventDate,
    pub scope: EventScope,
}

impl Event {
    /// Creates a new event with a generated id from a validated key.
    pub fn from_key(key: EventKey) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: key.title,
            date: key.date,
            scope: key.scope,
        }
    }

    pub fn key(&self) -> EventKey {
        EventKey {
            title: self.title.clone(),
            date: self.date,
            scope: self.scope,
        }
    }

    pub fn is_global(&self) -> bool {
        self.scope.is_global()
    }
}
