//! Event use-case service.
//!
//! # Responsibility
//! - Validate event input (title, date, scope) before persistence.
//! - Provide create/update/delete/list entry points for direct API callers.
//! - Build the calendar read model with resolved unit names.
//!
//! # Invariants
//! - Dates are normalized to a calendar day before any write or lookup.
//! - A unit-scoped event must reference a unit that exists at write time.
//! - `update_event` never changes an event's scope.
//! - Direct writes that collide with an existing dedup key fail with
//!   `CalendarError::Duplicate`; they are never silently skipped.

use crate::error::{CalendarError, CalendarResult};
use crate::model::event::{normalize_title, Event, EventDate, EventId, EventKey, EventScope};
use crate::model::unit::UnitId;
use crate::repo::event_repo::EventRepository;
use crate::repo::unit_repo::UnitRepository;
use crate::repo::RepoError;
use crate::service::conflict::{ConflictResolver, Resolution};
use log::info;
use serde::Serialize;

/// Partial update for an event. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventPatch {
    pub title: Option<String>,
    pub date: Option<String>,
    /// Accepted only when equal to the stored scope.
    pub scope: Option<EventScope>,
}

/// Calendar read model: one all-day entry with its unit name resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEntry {
    pub id: EventId,
    pub title: String,
    pub date: EventDate,
    /// `None` for global events.
    pub unit_name: Option<String>,
    pub all_day: bool,
}

/// Event service over unit and event repositories.
pub struct EventStore<U: UnitRepository, E: EventRepository> {
    units: U,
    events: E,
}

impl<U: UnitRepository, E: EventRepository> EventStore<U, E> {
    pub fn new(units: U, events: E) -> Self {
        Self { units, events }
    }

    /// Validates raw input into a dedup key.
    ///
    /// # Errors
    /// - `InvalidEvent` for a blank title or unparseable date.
    /// - `UnknownScopeUnit` when the scope names a missing unit.
    pub fn prepare(&self, title: &str, date: &str, scope: EventScope) -> CalendarResult<EventKey> {
        let title = normalize_title(title)?;
        let date = EventDate::parse(date)?;
        self.ensure_scope_exists(scope)?;
        Ok(EventKey { title, date, scope })
    }

    /// Creates an event after validation.
    ///
    /// # Errors
    /// - `Duplicate` carrying the stored event when the key is taken, found
    ///   either by the conflict resolver or by the storage constraint.
    pub fn create_event(&self, title: &str, date: &str, scope: EventScope) -> CalendarResult<Event> {
        let key = self.prepare(title, date, scope)?;
        match ConflictResolver::new(&self.events).resolve(&key)? {
            Resolution::Skip { existing } => Err(CalendarError::Duplicate(Box::new(existing))),
            Resolution::Proceed => self.insert_key(key),
        }
    }

    /// Inserts an already validated key.
    pub fn insert_key(&self, key: EventKey) -> CalendarResult<Event> {
        let event = Event::from_key(key);
        match self.events.insert_event(&event) {
            Ok(()) => {
                info!(
                    "event=event_create module=event_store status=ok event_id={} scope={} date={}",
                    event.id, event.scope, event.date
                );
                Ok(event)
            }
            Err(RepoError::Duplicate(key)) => Err(self.duplicate_error(&key)?),
            Err(err) => Err(err.into()),
        }
    }

    /// Applies a partial update to title and/or date.
    ///
    /// # Errors
    /// - `EventNotFound` when `id` does not exist.
    /// - `ScopeImmutable` when `patch.scope` differs from the stored scope.
    /// - `Duplicate` when the new key belongs to another event.
    pub fn update_event(&self, id: EventId, patch: &EventPatch) -> CalendarResult<Event> {
        let stored = self
            .events
            .get_event(id)?
            .ok_or(CalendarError::EventNotFound(id))?;

        if let Some(requested) = patch.scope {
            if requested != stored.scope {
                return Err(CalendarError::ScopeImmutable {
                    event_id: id,
                    stored: stored.scope,
                    requested,
                });
            }
        }

        let mut updated = stored.clone();
        if let Some(title) = patch.title.as_deref() {
            updated.title = normalize_title(title)?;
        }
        if let Some(date) = patch.date.as_deref() {
            updated.date = EventDate::parse(date)?;
        }

        if updated == stored {
            return Ok(stored);
        }

        let resolver = ConflictResolver::new(&self.events);
        if let Resolution::Skip { existing } = resolver.resolve(&updated.key())? {
            if existing.id != id {
                return Err(CalendarError::Duplicate(Box::new(existing)));
            }
        }

        match self.events.update_event(&updated) {
            Ok(()) => {}
            Err(RepoError::NotFound(id)) => return Err(CalendarError::EventNotFound(id)),
            Err(RepoError::Duplicate(key)) => return Err(self.duplicate_error(&key)?),
            Err(err) => return Err(err.into()),
        }

        info!(
            "event=event_update module=event_store status=ok event_id={} scope={}",
            id, updated.scope
        );
        Ok(updated)
    }

    pub fn delete_event(&self, id: EventId) -> CalendarResult<()> {
        match self.events.delete_event(id) {
            Ok(()) => {
                info!("event=event_delete module=event_store status=ok event_id={id}");
                Ok(())
            }
            Err(RepoError::NotFound(id)) => Err(CalendarError::EventNotFound(id)),
            Err(err) => Err(err.into()),
        }
    }

    pub fn get_event(&self, id: EventId) -> CalendarResult<Event> {
        self.events
            .get_event(id)?
            .ok_or(CalendarError::EventNotFound(id))
    }

    /// Exact dedup lookup; `key.date` is already normalized.
    pub fn find_event(&self, key: &EventKey) -> CalendarResult<Option<Event>> {
        Ok(self.events.find_event(key)?)
    }

    /// Events of one scope sorted by date ascending.
    pub fn find_events_by_scope(&self, scope: EventScope) -> CalendarResult<Vec<Event>> {
        Ok(self.events.list_events_by_scope(scope)?)
    }

    /// Calendar entries of one scope. A missing unit is `UnitNotFound`.
    pub fn calendar_for(&self, scope: EventScope) -> CalendarResult<Vec<CalendarEntry>> {
        let unit_name = match scope {
            EventScope::Global => None,
            EventScope::Unit(unit_id) => Some(
                self.units
                    .get_unit(unit_id)?
                    .ok_or(CalendarError::UnitNotFound(unit_id))?
                    .name,
            ),
        };

        let entries = self
            .events
            .list_events_by_scope(scope)?
            .into_iter()
            .map(|event| CalendarEntry {
                id: event.id,
                title: event.title,
                date: event.date,
                unit_name: unit_name.clone(),
                all_day: true,
            })
            .collect();
        Ok(entries)
    }

    fn ensure_scope_exists(&self, scope: EventScope) -> CalendarResult<()> {
        if let EventScope::Unit(unit_id) = scope {
            self.ensure_unit_exists(unit_id)?;
        }
        Ok(())
    }

    fn ensure_unit_exists(&self, unit_id: UnitId) -> CalendarResult<()> {
        match self.units.get_unit(unit_id)? {
            Some(_) => Ok(()),
            None => Err(CalendarError::UnknownScopeUnit(unit_id)),
        }
    }

    fn duplicate_error(&self, key: &EventKey) -> CalendarResult<CalendarError> {
        match self.events.find_event(key)? {
            Some(existing) => Ok(CalendarError::Duplicate(Box::new(existing))),
            None => Err(CalendarError::Storage(RepoError::Duplicate(key.clone()))),
        }
    }
}
