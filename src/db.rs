use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use std::path::Path;
use std::time::Duration;
use uuid::Uuid;

pub const DB_FILE: &str = "linguistika.sqlite3";

pub fn open_db(workspace: &Path, busy_timeout: Duration) -> anyhow::Result<Connection> {
    std::fs::create_dir_all(workspace).with_context(|| {
        format!("failed to create workspace {}", workspace.to_string_lossy())
    })?;
    let db_path = workspace.join(DB_FILE);
    let conn = Connection::open(&db_path)
        .with_context(|| format!("failed to open database {}", db_path.to_string_lossy()))?;
    conn.busy_timeout(busy_timeout)?;
    init_schema(&conn).context("failed to initialize schema")?;
    Ok(conn)
}

/// Fresh in-memory database with the full schema; used by tests and tooling.
pub fn open_in_memory() -> anyhow::Result<Connection> {
    let conn = Connection::open_in_memory()?;
    init_schema(&conn)?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> anyhow::Result<()> {
    conn.execute("PRAGMA foreign_keys = ON", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS settings(
            key TEXT PRIMARY KEY,
            value_json TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS tutores(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL,
            email TEXT NOT NULL,
            telefono TEXT NOT NULL,
            especialidad TEXT NOT NULL,
            tarifa_por_hora REAL NOT NULL CHECK(tarifa_por_hora >= 0),
            estado INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS cursos(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL,
            descripcion TEXT NOT NULL,
            nivel TEXT NOT NULL,
            max_estudiantes INTEGER NOT NULL CHECK(max_estudiantes > 0),
            estado INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS estudiantes(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            nombre TEXT NOT NULL,
            email TEXT NOT NULL,
            telefono TEXT NOT NULL,
            fecha_inscripcion TEXT NOT NULL,
            estado INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL
        )",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS matriculas(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            estudiante_id INTEGER NOT NULL,
            curso_id INTEGER NOT NULL,
            tutor_id INTEGER NOT NULL,
            fecha_inscripcion TEXT NOT NULL,
            estado INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            FOREIGN KEY(estudiante_id) REFERENCES estudiantes(id),
            FOREIGN KEY(curso_id) REFERENCES cursos(id),
            FOREIGN KEY(tutor_id) REFERENCES tutores(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_matriculas_estudiante ON matriculas(estudiante_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_matriculas_curso ON matriculas(curso_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_matriculas_tutor ON matriculas(tutor_id)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS clases(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            matricula_id INTEGER NOT NULL,
            fecha TEXT NOT NULL,
            hora_inicio TEXT NOT NULL,
            hora_fin TEXT NOT NULL,
            estado TEXT NOT NULL,
            notas TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(matricula_id) REFERENCES matriculas(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_clases_matricula ON clases(matricula_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_clases_fecha ON clases(fecha, hora_inicio)",
        [],
    )?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS pagos(
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            tutor_id INTEGER NOT NULL,
            clase_id INTEGER,
            cantidad_clases INTEGER,
            monto REAL NOT NULL CHECK(monto > 0),
            fecha_pago TEXT NOT NULL,
            estado TEXT NOT NULL,
            descripcion TEXT NOT NULL,
            created_at TEXT NOT NULL,
            FOREIGN KEY(tutor_id) REFERENCES tutores(id),
            FOREIGN KEY(clase_id) REFERENCES clases(id)
        )",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_pagos_tutor ON pagos(tutor_id)",
        [],
    )?;
    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_pagos_clase ON pagos(clase_id)",
        [],
    )?;

    Ok(())
}

pub fn settings_get_json(conn: &Connection, key: &str) -> anyhow::Result<Option<serde_json::Value>> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT value_json FROM settings WHERE key = ?",
            [key],
            |r| r.get(0),
        )
        .optional()?;
    match raw {
        Some(s) => Ok(Some(serde_json::from_str(&s)?)),
        None => Ok(None),
    }
}

pub fn settings_set_json(conn: &Connection, key: &str, value: &serde_json::Value) -> anyhow::Result<()> {
    conn.execute(
        "INSERT INTO settings(key, value_json) VALUES(?, ?)
         ON CONFLICT(key) DO UPDATE SET value_json = excluded.value_json",
        (key, serde_json::to_string(value)?),
    )?;
    Ok(())
}

/// Stable identity of a workspace database, minted on first open.
pub fn workspace_id(conn: &Connection) -> anyhow::Result<String> {
    if let Some(v) = settings_get_json(conn, "workspace.id")? {
        if let Some(s) = v.as_str() {
            return Ok(s.to_string());
        }
    }
    let id = Uuid::new_v4().to_string();
    settings_set_json(conn, "workspace.id", &serde_json::json!(id))?;
    Ok(id)
}
