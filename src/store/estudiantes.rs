use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ensure_found, ensure_unreferenced, now, Dependents, Store};
use crate::error::FacadeError;
use crate::facade::Facade;
use crate::model::{Entity, Estudiante, EstudianteInput, Id, Validate};

const SELECT: &str = "SELECT id, nombre, email, telefono, fecha_inscripcion, estado, created_at
                      FROM estudiantes";

fn row_to_estudiante(row: &Row<'_>) -> rusqlite::Result<Estudiante> {
    Ok(Estudiante {
        id: row.get(0)?,
        datos: EstudianteInput {
            nombre: row.get(1)?,
            email: row.get(2)?,
            telefono: row.get(3)?,
            fecha_inscripcion: row.get(4)?,
            estado: row.get(5)?,
        },
        created_at: row.get(6)?,
    })
}

fn fetch_one(conn: &Connection, id: Id) -> Result<Estudiante, FacadeError> {
    conn.query_row(&format!("{SELECT} WHERE id = ?"), [id], row_to_estudiante)
        .optional()?
        .ok_or_else(|| FacadeError::not_found(Estudiante::SINGULAR, id))
}

impl Facade<Estudiante> for Store {
    fn get_all(&self) -> Result<Vec<Estudiante>, FacadeError> {
        let mut stmt = self.conn.prepare(&format!("{SELECT} ORDER BY id"))?;
        let rows = stmt
            .query_map([], row_to_estudiante)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get(&self, id: Id) -> Result<Estudiante, FacadeError> {
        fetch_one(&self.conn, id)
    }

    fn create(&self, input: &EstudianteInput) -> Result<Estudiante, FacadeError> {
        input.invariants()?;
        self.conn.execute(
            "INSERT INTO estudiantes(nombre, email, telefono, fecha_inscripcion, estado, created_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            params![
                input.nombre,
                input.email,
                input.telefono,
                input.fecha_inscripcion,
                input.estado,
                now(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, "estudiante created");
        fetch_one(&self.conn, id)
    }

    fn update(&self, id: Id, input: &EstudianteInput) -> Result<Estudiante, FacadeError> {
        input.invariants()?;
        let changed = self.conn.execute(
            "UPDATE estudiantes
             SET nombre = ?, email = ?, telefono = ?, fecha_inscripcion = ?, estado = ?
             WHERE id = ?",
            params![
                input.nombre,
                input.email,
                input.telefono,
                input.fecha_inscripcion,
                input.estado,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(FacadeError::not_found(Estudiante::SINGULAR, id));
        }
        tracing::info!(id, "estudiante updated");
        fetch_one(&self.conn, id)
    }

    fn delete(&self, id: Id) -> Result<(), FacadeError> {
        ensure_found(&self.conn, "estudiantes", Estudiante::SINGULAR, id)?;
        ensure_unreferenced(
            &self.conn,
            Estudiante::SINGULAR,
            id,
            &[Dependents {
                table: "matriculas",
                column: "estudiante_id",
            }],
        )?;
        self.conn
            .execute("DELETE FROM estudiantes WHERE id = ?", [id])?;
        tracing::info!(id, "estudiante deleted");
        Ok(())
    }
}
