use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ensure_found, ensure_unreferenced, now, Dependents, Store};
use crate::error::FacadeError;
use crate::facade::Facade;
use crate::model::{Entity, Id, Tutor, TutorInput, Validate};

const SELECT: &str = "SELECT id, nombre, email, telefono, especialidad, tarifa_por_hora, estado, created_at
                      FROM tutores";

fn row_to_tutor(row: &Row<'_>) -> rusqlite::Result<Tutor> {
    Ok(Tutor {
        id: row.get(0)?,
        datos: TutorInput {
            nombre: row.get(1)?,
            email: row.get(2)?,
            telefono: row.get(3)?,
            especialidad: row.get(4)?,
            tarifa_por_hora: row.get(5)?,
            estado: row.get(6)?,
        },
        created_at: row.get(7)?,
    })
}

fn fetch_one(conn: &Connection, id: Id) -> Result<Tutor, FacadeError> {
    conn.query_row(&format!("{SELECT} WHERE id = ?"), [id], row_to_tutor)
        .optional()?
        .ok_or_else(|| FacadeError::not_found(Tutor::SINGULAR, id))
}

impl Facade<Tutor> for Store {
    fn get_all(&self) -> Result<Vec<Tutor>, FacadeError> {
        let mut stmt = self.conn.prepare(&format!("{SELECT} ORDER BY id"))?;
        let rows = stmt
            .query_map([], row_to_tutor)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get(&self, id: Id) -> Result<Tutor, FacadeError> {
        fetch_one(&self.conn, id)
    }

    fn create(&self, input: &TutorInput) -> Result<Tutor, FacadeError> {
        input.invariants()?;
        self.conn.execute(
            "INSERT INTO tutores(nombre, email, telefono, especialidad, tarifa_por_hora, estado, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?)",
            params![
                input.nombre,
                input.email,
                input.telefono,
                input.especialidad,
                input.tarifa_por_hora,
                input.estado,
                now(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(id, "tutor created");
        fetch_one(&self.conn, id)
    }

    fn update(&self, id: Id, input: &TutorInput) -> Result<Tutor, FacadeError> {
        input.invariants()?;
        let changed = self.conn.execute(
            "UPDATE tutores
             SET nombre = ?, email = ?, telefono = ?, especialidad = ?, tarifa_por_hora = ?, estado = ?
             WHERE id = ?",
            params![
                input.nombre,
                input.email,
                input.telefono,
                input.especialidad,
                input.tarifa_por_hora,
                input.estado,
                id,
            ],
        )?;
        if changed == 0 {
            return Err(FacadeError::not_found(Tutor::SINGULAR, id));
        }
        tracing::info!(id, "tutor updated");
        fetch_one(&self.conn, id)
    }

    fn delete(&self, id: Id) -> Result<(), FacadeError> {
        ensure_found(&self.conn, "tutores", Tutor::SINGULAR, id)?;
        ensure_unreferenced(
            &self.conn,
            Tutor::SINGULAR,
            id,
            &[
                Dependents {
                    table: "matriculas",
                    column: "tutor_id",
                },
                Dependents {
                    table: "pagos",
                    column: "tutor_id",
                },
            ],
        )?;
        self.conn.execute("DELETE FROM tutores WHERE id = ?", [id])?;
        tracing::info!(id, "tutor deleted");
        Ok(())
    }
}
