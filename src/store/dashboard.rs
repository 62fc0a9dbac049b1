use chrono::NaiveDate;

use super::{clases, Store};
use crate::dashboard::summarize_tutors;
use crate::error::FacadeError;
use crate::facade::DashboardFacade;
use crate::model::{Clase, ResumenTutor, Stats};

impl DashboardFacade for Store {
    fn stats(&self) -> Result<Stats, FacadeError> {
        // Correlated subqueries keep each count independent of the others.
        let stats = self.conn.query_row(
            "SELECT
               (SELECT COUNT(*) FROM tutores WHERE estado = 1),
               (SELECT COUNT(*) FROM estudiantes WHERE estado = 1),
               (SELECT COUNT(*) FROM cursos WHERE estado = 1),
               (SELECT COUNT(*) FROM matriculas WHERE estado = 1),
               (SELECT COUNT(*) FROM clases),
               (SELECT COALESCE(SUM(monto), 0.0) FROM pagos WHERE estado = 'pendiente')",
            [],
            |row| {
                Ok(Stats {
                    tutores_activos: row.get(0)?,
                    estudiantes_activos: row.get(1)?,
                    cursos_activos: row.get(2)?,
                    matriculas_activas: row.get(3)?,
                    total_clases: row.get(4)?,
                    ingresos_pendientes: row.get(5)?,
                })
            },
        )?;
        Ok(stats)
    }

    fn agenda(&self, fecha: NaiveDate) -> Result<Vec<Clase>, FacadeError> {
        clases::fetch_by_date(&self.conn, fecha)
    }

    fn resumen_tutores(&self, fecha: NaiveDate) -> Result<Vec<ResumenTutor>, FacadeError> {
        let agenda = self.agenda(fecha)?;
        Ok(summarize_tutors(&agenda, fecha))
    }
}
