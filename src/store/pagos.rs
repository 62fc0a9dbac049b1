use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{ensure_found, ensure_ref, now, Store};
use crate::error::FacadeError;
use crate::facade::Facade;
use crate::model::{Entity, Id, Pago, PagoInput, PagoVista, Validate};

const SELECT: &str = "SELECT
                        p.id, p.tutor_id, p.clase_id, p.cantidad_clases, p.monto, p.fecha_pago, p.estado,
                        p.descripcion, p.created_at,
                        COALESCE(t.nombre, ''),
                        COALESCE(t.email, '')
                      FROM pagos p
                      LEFT JOIN tutores t ON t.id = p.tutor_id";

fn row_to_pago(row: &Row<'_>) -> rusqlite::Result<Pago> {
    Ok(Pago {
        id: row.get(0)?,
        datos: PagoInput {
            tutor_id: row.get(1)?,
            clase_id: row.get(2)?,
            cantidad_clases: row.get(3)?,
            monto: row.get(4)?,
            fecha_pago: row.get(5)?,
            estado: row.get(6)?,
            descripcion: row.get(7)?,
        },
        created_at: row.get(8)?,
        vista: PagoVista {
            tutor_nombre: row.get(9)?,
            tutor_email: row.get(10)?,
        },
    })
}

fn fetch_one(conn: &Connection, id: Id) -> Result<Pago, FacadeError> {
    conn.query_row(&format!("{SELECT} WHERE p.id = ?"), [id], row_to_pago)
        .optional()?
        .ok_or_else(|| FacadeError::not_found(Pago::SINGULAR, id))
}

fn check_refs(conn: &Connection, input: &PagoInput) -> Result<(), FacadeError> {
    ensure_ref(conn, "tutores", "tutor", "tutor_id", input.tutor_id)?;
    if let Some(clase_id) = input.clase_id {
        ensure_ref(conn, "clases", "clase", "clase_id", clase_id)?;
    }
    Ok(())
}

impl Facade<Pago> for Store {
    fn get_all(&self) -> Result<Vec<Pago>, FacadeError> {
        let mut stmt = self.conn.prepare(&format!("{SELECT} ORDER BY p.id"))?;
        let rows = stmt
            .query_map([], row_to_pago)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    fn get(&self, id: Id) -> Result<Pago, FacadeError> {
        fetch_one(&self.conn, id)
    }

    fn create(&self, input: &PagoInput) -> Result<Pago, FacadeError> {
        input.invariants()?;
        check_refs(&self.conn, input)?;
        self.conn.execute(
            "INSERT INTO pagos(tutor_id, clase_id, cantidad_clases, monto, fecha_pago, estado, descripcion, created_at)
             VALUES(?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                input.tutor_id,
                input.clase_id,
                input.cantidad_clases,
                input.monto,
                input.fecha_pago,
                input.estado,
                input.descripcion,
                now(),
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        tracing::info!(
            id,
            tutor_id = input.tutor_id,
            monto = input.monto,
            estado = input.estado.as_str(),
            "pago created"
        );
        fetch_one(&self.conn, id)
    }

    fn update(&self, id: Id, input: &PagoInput) -> Result<Pago, FacadeError> {
        input.invariants()?;
        ensure_found(&self.conn, "pagos", Pago::SINGULAR, id)?;
        check_refs(&self.conn, input)?;
        self.conn.execute(
            "UPDATE pagos
             SET tutor_id = ?, clase_id = ?, cantidad_clases = ?, monto = ?, fecha_pago = ?, estado = ?, descripcion = ?
             WHERE id = ?",
            params![
                input.tutor_id,
                input.clase_id,
                input.cantidad_clases,
                input.monto,
                input.fecha_pago,
                input.estado,
                input.descripcion,
                id,
            ],
        )?;
        tracing::info!(id, estado = input.estado.as_str(), "pago updated");
        fetch_one(&self.conn, id)
    }

    fn delete(&self, id: Id) -> Result<(), FacadeError> {
        ensure_found(&self.conn, "pagos", Pago::SINGULAR, id)?;
        self.conn.execute("DELETE FROM pagos WHERE id = ?", [id])?;
        tracing::info!(id, "pago deleted");
        Ok(())
    }
}
