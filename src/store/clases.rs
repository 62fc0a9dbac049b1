use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ensure_found, ensure_ref, now, Store};
use crate::error::{FacadeError, ValidationError};
use crate::facade::Facade;
use crate::model::{Clase, ClaseInput, ClaseVista, Entity, EstadoClase, Id, Validate};

const SELECT: &str = "SELECT
                        cl.id, cl.matricula_id, cl.fecha, cl.hora_inicio, cl.hora_fin, cl.estado, cl.notas, cl.created_at,
                        COALESCE(e.nombre, ''),
                        COALESCE(m.tutor_id, 0),
                        COALESCE(t.nombre, ''),
                        COALESCE(c.nombre, ''),
                        COALESCE(t.tarifa_por_hora, 0)
                      FROM clases cl
                      LEFT JOIN matriculas m ON m.id = cl.matricula_id
                      LEFT JOIN estudiantes e ON e.id = m.estudiante_id
                      LEFT JOIN cursos c ON c.id = m.curso_id
                      LEFT JOIN tutores t ON t.id = m.tutor_id";

fn row_to_clase(row: &Row<'_>) -> rusqlite::Result<Clase> {
    Ok(Clase {
        id: row.get(0)?,
        datos: ClaseInput {
            matricula_id: row.get(1)?,
            fecha: row.get(2)?,
            hora_inicio: row.get(3)?,
            hora_fin: row.get(4)?,
            estado: row.get(5)?,
            notas: row.get(6)?,
        },
        created_at: row.get(7)?,
        vista: ClaseVista {
            estudiante_nombre: row.get(8)?,
            tutor_id: row.get(9)?,
            tutor_nombre: row.get(10)?,
            curso_nombre: row.get(11)?,
            tarifa_por_hora: row.get(12)?,
        },
    })
}

fn fetch_one(conn: &Connection, id: Id) -> Result<Clase, FacadeError> {
    conn.query_row(&format!("{SELECT} WHERE cl.id = ?"), [id], row_to_clase)
        .optional()?
        .ok_or_else(|| FacadeError::not_found(Clase::SINGULAR, id))
}

/// Sessions on one day, earliest first.
pub(super) fn fetch_by_date(conn: &Connection, fecha: NaiveDate) -> Result<Vec<Clase>, FacadeError> {
    let mut stmt = conn.prepare(&format!(
        "{SELECT} WHERE cl.fecha = ? ORDER BY cl.hora_inicio, cl.id"
    ))?;
    let rows = stmt
        .query_map([fecha], row_to_clase)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

impl Facade<Clase> for Store {
    fn get_all(&self) -> Result<Vec<Clase>, FacadeError> {
        let mut stmt = self.conn.prepare(&format!("{SELECT} ORDER BY cl.id"))?;
        let rows = stmt
            .query_map([], row_to_clase)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get(&self, id: Id) -> Result<Clase, FacadeError> {
        fetch_one(&self.conn, id)
    }

    fn create(&self, input: &ClaseInput) -> Result<Clase, FacadeError> {
        input.invariants()?;
        ensure_ref(
            &self.conn,
            "matriculas",
            "matricula",
            "matricula_id",
            input.matricula_id,
        )?;
        self.conn.execute(
            "INSERT INTO clases(matricula_id, fecha, hora_inicio, hora_fin, estado, notas, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            params![
                input.matricula_id,
                input.fecha,
                input.hora_inicio,
                input.hora_fin,
                input.estado,
                input.notas,
                now(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, fecha = %input.fecha, "clase created");
        fetch_one(&self.conn, id)
    }

    fn update(&self, id: Id, input: &ClaseInput) -> Result<Clase, FacadeError> {
        input.invariants()?;
        let current: Option<EstadoClase> = self
            .conn
            .query_row("SELECT estado FROM clases WHERE id = ?", [id], |r| r.get(0))
            .optional()?;
        let Some(current) = current else {
            return Err(FacadeError::not_found(Clase::SINGULAR, id));
        };
        if !current.can_transition_to(input.estado) {
            return Err(ValidationError::new(
                "estado",
                format!(
                    "a {} session cannot become {}",
                    current.as_str(),
                    input.estado.as_str()
                ),
            )
            .into());
        }
        ensure_ref(
            &self.conn,
            "matriculas",
            "matricula",
            "matricula_id",
            input.matricula_id,
        )?;
        self.conn.execute(
            "UPDATE clases
             SET matricula_id = ?, fecha = ?, hora_inicio = ?, hora_fin = ?, estado = ?, notas = ?
             WHERE id = ?",
            params![
                input.matricula_id,
                input.fecha,
                input.hora_inicio,
                input.hora_fin,
                input.estado,
                input.notas,
                id,
            ],
        )?;
        tracing::info!(id, estado = input.estado.as_str(), "clase updated");
        fetch_one(&self.conn, id)
    }

    fn delete(&self, id: Id) -> Result<(), FacadeError> {
        ensure_found(&self.conn, "clases", Clase::SINGULAR, id)?;

        let tx = self.conn.unchecked_transaction()?;
        let detached = tx.execute("UPDATE pagos SET clase_id = NULL WHERE clase_id = ?", [id])?;
        tx.execute("DELETE FROM clases WHERE id = ?", [id])?;
        tx.commit()?;

        tracing::info!(id, detached, "clase deleted");
        Ok(())
    }
}
