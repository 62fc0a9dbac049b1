//! SQLite implementation of the academy facade.
//!
//! One `Store` wraps one workspace connection. Every facade call is a single
//! statement or a single transaction; there is no caching, so each read sees
//! the latest committed write.

mod clases;
mod cursos;
mod dashboard;
mod estudiantes;
mod matriculas;
mod pagos;
mod tutores;

use chrono::{Local, NaiveDateTime};
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;

use crate::db;
use crate::error::FacadeError;
use crate::model::Id;

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    pub fn open(workspace: &Path, busy_timeout: Duration) -> anyhow::Result<Self> {
        Ok(Self::new(db::open_db(workspace, busy_timeout)?))
    }

    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::new(db::open_in_memory()?))
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn workspace_id(&self) -> anyhow::Result<String> {
        db::workspace_id(&self.conn)
    }
}

fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

fn exists(conn: &Connection, table: &str, id: Id) -> rusqlite::Result<bool> {
    let sql = format!("SELECT 1 FROM {} WHERE id = ?", table);
    let hit: Option<i64> = conn.query_row(&sql, [id], |r| r.get(0)).optional()?;
    Ok(hit.is_some())
}

fn ensure_found(
    conn: &Connection,
    table: &str,
    entity: &'static str,
    id: Id,
) -> Result<(), FacadeError> {
    if !exists(conn, table, id)? {
        return Err(FacadeError::not_found(entity, id));
    }
    Ok(())
}

/// A write that points at another row must point at one that exists.
fn ensure_ref(
    conn: &Connection,
    table: &str,
    entity: &'static str,
    field: &'static str,
    id: Id,
) -> Result<(), FacadeError> {
    if !exists(conn, table, id)? {
        return Err(FacadeError::Referential { entity, field, id });
    }
    Ok(())
}

/// A dependent table that blocks deletion while it still points at `id`.
struct Dependents {
    table: &'static str,
    column: &'static str,
}

fn ensure_unreferenced(
    conn: &Connection,
    entity: &'static str,
    id: Id,
    deps: &[Dependents],
) -> Result<(), FacadeError> {
    for dep in deps {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {} = ?", dep.table, dep.column);
        let count: i64 = conn.query_row(&sql, [id], |r| r.get(0))?;
        if count > 0 {
            return Err(FacadeError::InUse {
                entity,
                id,
                dependents: dep.table,
                count,
            });
        }
    }
    Ok(())
}
