//! Duplicate policy shared by every event write path.
//!
//! # Responsibility
//! - Decide insert-vs-skip for a candidate dedup key.
//! - Close the check-then-act race: when a concurrent writer inserts the
//!   same key between lookup and insert, the storage uniqueness violation
//!   is turned into a skip carrying the winner's row.
//!
//! # Invariants
//! - The resolver never deletes or rewrites existing events.
//! - A `Skip` always carries the stored event that owns the key.

use crate::model::event::{Event, EventKey};
use crate::repo::event_repo::EventRepository;
use crate::repo::{RepoError, RepoResult};
use log::debug;

/// Decision for one candidate key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Proceed,
    Skip { existing: Event },
}

/// Result of a resolved write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted(Event),
    DuplicateSkipped(Event),
}

impl WriteOutcome {
    pub fn event(&self) -> &Event {
        match self {
            Self::Inserted(event) | Self::DuplicateSkipped(event) => event,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted(_))
    }
}

pub struct ConflictResolver<E: EventRepository> {
    events: E,
}

impl<E: EventRepository> ConflictResolver<E> {
    pub fn new(events: E) -> Self {
        Self { events }
    }

    /// Looks up the dedup key and decides whether a write may proceed.
    pub fn resolve(&self, key: &EventKey) -> RepoResult<Resolution> {
        match self.events.find_event(key)? {
            Some(existing) => Ok(Resolution::Skip { existing }),
            None => Ok(Resolution::Proceed),
        }
    }

    /// Inserts a new event for `key` unless one already exists.
    ///
    /// Callers are responsible for scope validation; this only applies the
    /// duplicate policy.
    pub fn insert_or_skip(&self, key: EventKey) -> RepoResult<WriteOutcome> {
        if let Resolution::Skip { existing } = self.resolve(&key)? {
            return Ok(WriteOutcome::DuplicateSkipped(existing));
        }

        let event = Event::from_key(key);
        match self.events.insert_event(&event) {
            Ok(()) => Ok(WriteOutcome::Inserted(event)),
            Err(RepoError::Duplicate(key)) => {
                debug!(
                    "event=dedup_race module=conflict status=skip scope={} date={}",
                    key.scope, key.date
                );
                match self.events.find_event(&key)? {
                    Some(existing) => Ok(WriteOutcome::DuplicateSkipped(existing)),
                    None => Err(RepoError::Duplicate(key)),
                }
            }
            Err(err) => Err(err),
        }
    }
}
