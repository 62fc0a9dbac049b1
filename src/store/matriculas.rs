use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ensure_found, ensure_ref, now, Store};
use crate::error::FacadeError;
use crate::facade::Facade;
use crate::model::{Entity, Id, Matricula, MatriculaInput, MatriculaVista, Validate};

const SELECT: &str = "SELECT
                        m.id, m.estudiante_id, m.curso_id, m.tutor_id, m.fecha_inscripcion, m.estado, m.created_at,
                        COALESCE(e.nombre, ''),
                        COALESCE(c.nombre, ''),
                        COALESCE(t.nombre, ''),
                        COALESCE(t.tarifa_por_hora, 0)
                      FROM matriculas m
                      LEFT JOIN estudiantes e ON e.id = m.estudiante_id
                      LEFT JOIN cursos c ON c.id = m.curso_id
                      LEFT JOIN tutores t ON t.id = m.tutor_id";

fn row_to_matricula(row: &Row<'_>) -> rusqlite::Result<Matricula> {
    Ok(Matricula {
        id: row.get(0)?,
        datos: MatriculaInput {
            estudiante_id: row.get(1)?,
            curso_id: row.get(2)?,
            tutor_id: row.get(3)?,
            fecha_inscripcion: row.get(4)?,
            estado: row.get(5)?,
        },
        created_at: row.get(6)?,
        vista: MatriculaVista {
            estudiante_nombre: row.get(7)?,
            curso_nombre: row.get(8)?,
            tutor_nombre: row.get(9)?,
            tarifa_por_hora: row.get(10)?,
        },
    })
}

fn fetch_one(conn: &Connection, id: Id) -> Result<Matricula, FacadeError> {
    conn.query_row(&format!("{SELECT} WHERE m.id = ?"), [id], row_to_matricula)
        .optional()?
        .ok_or_else(|| FacadeError::not_found(Matricula::SINGULAR, id))
}

fn check_refs(conn: &Connection, input: &MatriculaInput) -> Result<(), FacadeError> {
    ensure_ref(
        conn,
        "estudiantes",
        "estudiante",
        "estudiante_id",
        input.estudiante_id,
    )?;
    ensure_ref(conn, "cursos", "curso", "curso_id", input.curso_id)?;
    ensure_ref(conn, "tutores", "tutor", "tutor_id", input.tutor_id)
}

impl Facade<Matricula> for Store {
    fn get_all(&self) -> Result<Vec<Matricula>, FacadeError> {
        let mut stmt = self.conn.prepare(&format!("{SELECT} ORDER BY m.id"))?;
        let rows = stmt
            .query_map([], row_to_matricula)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get(&self, id: Id) -> Result<Matricula, FacadeError> {
        fetch_one(&self.conn, id)
    }

    fn create(&self, input: &MatriculaInput) -> Result<Matricula, FacadeError> {
        input.invariants()?;
        check_refs(&self.conn, input)?;
        self.conn.execute(
            "INSERT INTO matriculas(estudiante_id, curso_id, tutor_id, fecha_inscripcion, estado, created_at)
             VALUES(?, ?, ?, ?, ?, ?)",
            params![
                input.estudiante_id,
                input.curso_id,
                input.tutor_id,
                input.fecha_inscripcion,
                input.estado,
                now(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(
            id,
            estudiante_id = input.estudiante_id,
            curso_id = input.curso_id,
            tutor_id = input.tutor_id,
            "matricula created"
        );
        fetch_one(&self.conn, id)
    }

    fn update(&self, id: Id, input: &MatriculaInput) -> Result<Matricula, FacadeError> {
        input.invariants()?;
        ensure_found(&self.conn, "matriculas", Matricula::SINGULAR, id)?;
        check_refs(&self.conn, input)?;
        self.conn.execute(
            "UPDATE matriculas
             SET estudiante_id = ?, curso_id = ?, tutor_id = ?, fecha_inscripcion = ?, estado = ?
             WHERE id = ?",
            params![
                input.estudiante_id,
                input.curso_id,
                input.tutor_id,
                input.fecha_inscripcion,
                input.estado,
                id,
            ],
        )?;
        tracing::info!(id, "matricula updated");
        fetch_one(&self.conn, id)
    }

    /// Sessions belong to their enrollment and go with it. Payments are kept
    /// and lose their link to the removed sessions.
    fn delete(&self, id: Id) -> Result<(), FacadeError> {
        ensure_found(&self.conn, "matriculas", Matricula::SINGULAR, id)?;

        let tx = self.conn.unchecked_transaction()?;
        let detached = tx.execute(
            "UPDATE pagos SET clase_id = NULL
             WHERE clase_id IN (SELECT id FROM clases WHERE matricula_id = ?)",
            [id],
        )?;
        let sessions = tx.execute("DELETE FROM clases WHERE matricula_id = ?", [id])?;
        tx.execute("DELETE FROM matriculas WHERE id = ?", [id])?;
        tx.commit()?;

        tracing::info!(id, sessions, detached, "matricula deleted");
        Ok(())
    }
}
