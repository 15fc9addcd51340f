//! Event repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Provide insert/update/delete/lookup APIs over the `events` table.
//! - Translate dedup-key constraint violations into `RepoError::Duplicate`.
//!
//! # Invariants
//! - Dates are stored as `YYYY-MM-DD`; there is no time component to compare.
//! - `scope_key` always mirrors `unit_id` (`global` when null).
//! - Scope is never rewritten by `update_event`.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::is_unique_violation;
use crate::model::event::{Event, EventDate, EventId, EventKey, EventScope};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoError, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const EVENT_SELECT_SQL: &str = "SELECT id, title, event_date, unit_id FROM events";

/// Repository interface for event persistence.
pub trait EventRepository {
    /// Inserts one event. Fails with `Duplicate` when the key is taken.
    fn insert_event(&self, event: &Event) -> RepoResult<()>;
    /// Rewrites title and date of an existing event.
    fn update_event(&self, event: &Event) -> RepoResult<()>;
    fn delete_event(&self, id: EventId) -> RepoResult<()>;
    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>>;
    /// Exact dedup lookup.
    fn find_event(&self, key: &EventKey) -> RepoResult<Option<Event>>;
    /// Events of one scope sorted by date ascending.
    fn list_events_by_scope(&self, scope: EventScope) -> RepoResult<Vec<Event>>;
}

impl<T: EventRepository + ?Sized> EventRepository for &T {
    fn insert_event(&self, event: &Event) -> RepoResult<()> {
        (**self).insert_event(event)
    }

    fn update_event(&self, event: &Event) -> RepoResult<()> {
        (**self).update_event(event)
    }

    fn delete_event(&self, id: EventId) -> RepoResult<()> {
        (**self).delete_event(id)
    }

    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        (**self).get_event(id)
    }

    fn find_event(&self, key: &EventKey) -> RepoResult<Option<Event>> {
        (**self).find_event(key)
    }

    fn list_events_by_scope(&self, scope: EventScope) -> RepoResult<Vec<Event>> {
        (**self).list_events_by_scope(scope)
    }
}

/// SQLite-backed event repository.
pub struct SqliteEventRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteEventRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "events")?;
        Ok(Self { conn })
    }
}

impl EventRepository for SqliteEventRepository<'_> {
    fn insert_event(&self, event: &Event) -> RepoResult<()> {
        let result = self.conn.execute(
            "INSERT INTO events (id, title, event_date, unit_id, scope_key)
             VALUES (?1, ?2, ?3, ?4, ?5);",
            params![
                event.id.to_string(),
                event.title.as_str(),
                event.date.to_storage(),
                event.scope.unit_id().map(|id| id.to_string()),
                event.scope.storage_key(),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => Err(RepoError::Duplicate(event.key())),
            Err(err) => Err(err.into()),
        }
    }

    fn update_event(&self, event: &Event) -> RepoResult<()> {
        let result = self.conn.execute(
            "UPDATE events
             SET
                title = ?2,
                event_date = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                event.id.to_string(),
                event.title.as_str(),
                event.date.to_storage(),
            ],
        );

        let changed = match result {
            Ok(changed) => changed,
            Err(err) if is_unique_violation(&err) => {
                return Err(RepoError::Duplicate(event.key()));
            }
            Err(err) => return Err(err.into()),
        };

        if changed == 0 {
            return Err(RepoError::NotFound(event.id));
        }

        Ok(())
    }

    fn delete_event(&self, id: EventId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM events WHERE id = ?1;", [id.to_string()])?;

        if changed == 0 {
            return Err(RepoError::NotFound(id));
        }

        Ok(())
    }

    fn get_event(&self, id: EventId) -> RepoResult<Option<Event>> {
        let row = self
            .conn
            .query_row(
                &format!("{EVENT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_event_row,
            )
            .optional()?;
        row.map(into_event).transpose()
    }

    fn find_event(&self, key: &EventKey) -> RepoResult<Option<Event>> {
        let row = self
            .conn
            .query_row(
                &format!(
                    "{EVENT_SELECT_SQL}
                     WHERE title = ?1
                       AND event_date = ?2
                       AND scope_key = ?3;"
                ),
                params![
                    key.title.as_str(),
                    key.date.to_storage(),
                    key.scope.storage_key(),
                ],
                read_event_row,
            )
            .optional()?;
        row.map(into_event).transpose()
    }

    fn list_events_by_scope(&self, scope: EventScope) -> RepoResult<Vec<Event>> {
        let mut stmt = self.conn.prepare(&format!(
            "{EVENT_SELECT_SQL}
             WHERE scope_key = ?1
             ORDER BY event_date ASC, created_at ASC, rowid ASC;"
        ))?;
        let mut rows = stmt.query([scope.storage_key()])?;
        let mut events = Vec::new();
        while let Some(row) = rows.next()? {
            events.push(into_event(read_event_row(row)?)?);
        }
        Ok(events)
    }
}

struct EventRow {
    id: String,
    title: String,
    event_date: String,
    unit_id: Option<String>,
}

fn read_event_row(row: &Row<'_>) -> rusqlite::Result<EventRow> {
    Ok(EventRow {
        id: row.get("id")?,
        title: row.get("title")?,
        event_date: row.get("event_date")?,
        unit_id: row.get("unit_id")?,
    })
}

fn into_event(row: EventRow) -> RepoResult<Event> {
    let id = parse_uuid(&row.id, "events.id")?;
    let date = EventDate::from_storage(&row.event_date).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid date `{}` in events.event_date",
            row.event_date
        ))
    })?;
    let scope = match row.unit_id {
        Some(value) => EventScope::Unit(parse_uuid(&value, "events.unit_id")?),
        None => EventScope::Global,
    };

    Ok(Event {
        id,
        title: row.title,
        date,
        scope,
    })
}
