//! Unit repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist and look up organizational units.
//!
//! # Invariants
//! - Units are insert-only from the core's point of view.
//! - Name lookups that match several units return the oldest one.
//! - `insert_unit_if_name_free` checks and inserts in one statement, so two
//!   writers cannot both claim a name.

use crate::model::unit::{Unit, UnitId};
use crate::repo::{ensure_connection_ready, parse_uuid, RepoResult};
use rusqlite::{params, Connection, OptionalExtension, Row};

const UNIT_SELECT_SQL: &str = "SELECT id, name FROM units";

/// Repository interface for unit persistence.
pub trait UnitRepository {
    fn insert_unit(&self, unit: &Unit) -> RepoResult<()>;
    fn get_unit(&self, id: UnitId) -> RepoResult<Option<Unit>>;
    /// Exact (case-sensitive) name lookup.
    fn find_unit_by_name(&self, name: &str) -> RepoResult<Option<Unit>>;
    /// Inserts `unit` unless a unit with the same name (case-insensitive)
    /// exists. Returns whether the row was written.
    fn insert_unit_if_name_free(&self, unit: &Unit) -> RepoResult<bool>;
    /// All units in registration order.
    fn list_units(&self) -> RepoResult<Vec<Unit>>;
}

impl<T: UnitRepository + ?Sized> UnitRepository for &T {
    fn insert_unit(&self, unit: &Unit) -> RepoResult<()> {
        (**self).insert_unit(unit)
    }

    fn get_unit(&self, id: UnitId) -> RepoResult<Option<Unit>> {
        (**self).get_unit(id)
    }

    fn find_unit_by_name(&self, name: &str) -> RepoResult<Option<Unit>> {
        (**self).find_unit_by_name(name)
    }

    fn insert_unit_if_name_free(&self, unit: &Unit) -> RepoResult<bool> {
        (**self).insert_unit_if_name_free(unit)
    }

    fn list_units(&self) -> RepoResult<Vec<Unit>> {
        (**self).list_units()
    }
}

/// SQLite-backed unit repository.
pub struct SqliteUnitRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUnitRepository<'conn> {
    /// Constructs a repository from a migrated/ready connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_connection_ready(conn, "units")?;
        Ok(Self { conn })
    }
}

impl UnitRepository for SqliteUnitRepository<'_> {
    fn insert_unit(&self, unit: &Unit) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO units (id, name) VALUES (?1, ?2);",
            params![unit.id.to_string(), unit.name.as_str()],
        )?;
        Ok(())
    }

    fn get_unit(&self, id: UnitId) -> RepoResult<Option<Unit>> {
        let row = self
            .conn
            .query_row(
                &format!("{UNIT_SELECT_SQL} WHERE id = ?1;"),
                [id.to_string()],
                read_unit_row,
            )
            .optional()?;
        row.map(into_unit).transpose()
    }

    fn find_unit_by_name(&self, name: &str) -> RepoResult<Option<Unit>> {
        let row = self
            .conn
            .query_row(
                &format!("{UNIT_SELECT_SQL} WHERE name = ?1 ORDER BY created_at ASC, rowid ASC LIMIT 1;"),
                [name],
                read_unit_row,
            )
            .optional()?;
        row.map(into_unit).transpose()
    }

    fn insert_unit_if_name_free(&self, unit: &Unit) -> RepoResult<bool> {
        // INSERT ... SELECT takes the write lock before reading.
        let inserted = self.conn.execute(
            "INSERT INTO units (id, name)
             SELECT ?1, ?2
             WHERE NOT EXISTS (SELECT 1 FROM units WHERE name = ?2 COLLATE NOCASE);",
            params![unit.id.to_string(), unit.name.as_str()],
        )?;
        Ok(inserted == 1)
    }

    fn list_units(&self) -> RepoResult<Vec<Unit>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{UNIT_SELECT_SQL} ORDER BY created_at ASC, rowid ASC;"))?;
        let mut rows = stmt.query([])?;
        let mut units = Vec::new();
        while let Some(row) = rows.next()? {
            units.push(into_unit(read_unit_row(row)?)?);
        }
        Ok(units)
    }
}

fn read_unit_row(row: &Row<'_>) -> rusqlite::Result<(String, String)> {
    Ok((row.get("id")?, row.get("name")?))
}

fn into_unit((id, name): (String, String)) -> RepoResult<Unit> {
    Ok(Unit {
        id: parse_uuid(&id, "units.id")?,
        name,
    })
}
