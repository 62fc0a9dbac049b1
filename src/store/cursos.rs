use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ensure_found, ensure_unreferenced, now, Dependents, Store};
use crate::error::FacadeError;
use crate::facade::Facade;
use crate::model::{Curso, CursoInput, Entity, Id, Validate};

const SELECT: &str = "SELECT id, nombre, descripcion, nivel, max_estudiantes, estado, created_at
                      FROM cursos";

fn row_to_curso(row: &Row<'_>) -> rusqlite::Result<Curso> {
    Ok(Curso {
        id: row.get(0)?,
        datos: CursoInput {
            nombre: row.get(1)?,
            descripcion: row.get(2)?,
            nivel: row.get(3)?,
            max_estudiantes: row.get(4)?,
            estado: row.get(5)?,
        },
        created_at: row.get(6)?,
    })
}

fn fetch_one(conn: &Connection, id: Id) -> Result<Curso, FacadeError> {
    conn.query_row(&format!("{SELECT} WHERE id = ?"), [id], row_to_curso)
        .optional()?
        .ok_or_else(|| FacadeError::not_found(Curso::SINGULAR, id))
}

impl Facade<Curso> for Store {
    fn get_all(&self) -> Result<Vec<Curso>, FacadeError> {
        let mut stmt = self.conn.prepare(&format!("{SELECT} ORDER BY id"))?;
        let rows = stmt
            .query_map([], row_to_curso)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get(&self, id: Id) -> Result<Curso, FacadeError> {
        fetch_one(&self.conn, id)
    }

    fn create(&self, input: &CursoInput) -> Result<Curso, FacadeError> {
        input.invariants()?;
        self.conn.execute(
            "INSERT INTO cursos(nombre, descripcion, nivel, max_estudiantes, estado, created_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            params![
                input.nombre,
                input.descripcion,
                input.nivel,
                input.max_estudiantes,
                input.estado,
                now(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, nivel = input.nivel.as_str(), "curso created");
        fetch_one(&self.conn, id)
    }

    fn update(&self, id: Id, input: &CursoInput) -> Result<Curso, FacadeError> {
        input.invariants()?;
        let changed = self.conn.execute(
            "UPDATE cursos
             SET nombre = ?, descripcion = ?, nivel = ?, max_estudiantes = ?, estado = ?
             WHERE id = ?",
            params![
                input.nombre,
                input.descripcion,
                input.nivel,
                input.max_estudiantes,
                input.estado,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(FacadeError::not_found(Curso::SINGULAR, id));
        }
        tracing::info!(id, "curso updated");
        fetch_one(&self.conn, id)
    }

    fn delete(&self, id: Id) -> Result<(), FacadeError> {
        ensure_found(&self.conn, "cursos", Curso::SINGULAR, id)?;
        ensure_unreferenced(
            &self.conn,
            Curso::SINGULAR,
            id,
            &[Dependents {
                table: "matriculas",
                column: "curso_id",
            }],
        )?;
        self.conn.execute("DELETE FROM cursos WHERE id = ?", [id])?;
        tracing::info!(id, "curso deleted");
        Ok(())
    }
}
