//! Dashboard aggregation and its refresh state.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::config::RetryPolicy;
use crate::error::FacadeError;
use crate::facade::DashboardFacade;
use crate::model::{Clase, Id, ResumenTutor, Stats};
use crate::view::{with_retry, Banner, RequestToken, Tokens};

/// Group one day's sessions by tutor.
///
/// Course and student names are listed once each, in the order they first
/// appear, joined with ", ". Tutors without sessions that day are absent.
/// The result is ordered by tutor name.
pub fn summarize_tutors(sessions: &[Clase], fecha: NaiveDate) -> Vec<ResumenTutor> {
    struct Acc {
        resumen: ResumenTutor,
        cursos: Vec<String>,
        estudiantes: Vec<String>,
    }

    fn push_distinct(names: &mut Vec<String>, name: &str) {
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }

    let mut index: HashMap<Id, usize> = HashMap::new();
    let mut accs: Vec<Acc> = Vec::new();
    for clase in sessions.iter().filter(|c| c.datos.fecha == fecha) {
        let i = *index.entry(clase.vista.tutor_id).or_insert_with(|| {
            accs.push(Acc {
                resumen: ResumenTutor {
                    tutor_id: clase.vista.tutor_id,
                    tutor_nombre: clase.vista.tutor_nombre.clone(),
                    ..ResumenTutor::default()
                },
                cursos: Vec::new(),
                estudiantes: Vec::new(),
            });
            accs.len() - 1
        });
        let acc = &mut accs[i];
        acc.resumen.total_clases += 1;
        push_distinct(&mut acc.cursos, &clase.vista.curso_nombre);
        push_distinct(&mut acc.estudiantes, &clase.vista.estudiante_nombre);
    }

    let mut out: Vec<ResumenTutor> = accs
        .into_iter()
        .map(|acc| ResumenTutor {
            cursos: acc.cursos.join(", "),
            estudiantes: acc.estudiantes.join(", "),
            ..acc.resumen
        })
        .collect();
    out.sort_by(|a, b| {
        a.tutor_nombre
            .cmp(&b.tutor_nombre)
            .then(a.tutor_id.cmp(&b.tutor_id))
    });
    out
}

/// Everything the dashboard shows for one date.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSnapshot {
    pub fecha: NaiveDate,
    pub stats: Stats,
    pub agenda: Vec<Clase>,
    pub resumen: Vec<ResumenTutor>,
}

/// Run the three dashboard queries. Any failure fails the whole snapshot.
pub fn fetch_snapshot<F: DashboardFacade>(
    facade: &F,
    fecha: NaiveDate,
) -> Result<DashboardSnapshot, FacadeError> {
    let stats = facade.stats()?;
    let agenda = facade.agenda(fecha)?;
    let resumen = facade.resumen_tutores(fecha)?;
    Ok(DashboardSnapshot {
        fecha,
        stats,
        agenda,
        resumen,
    })
}

pub struct DashboardView {
    fecha: NaiveDate,
    snapshot: Option<DashboardSnapshot>,
    loading: bool,
    banner: Option<Banner>,
    tokens: Tokens,
    retry: RetryPolicy,
}

impl DashboardView {
    pub fn new(fecha: NaiveDate, retry: RetryPolicy) -> Self {
        Self {
            fecha,
            snapshot: None,
            loading: false,
            banner: None,
            tokens: Tokens::default(),
            retry,
        }
    }

    pub fn fecha(&self) -> NaiveDate {
        self.fecha
    }

    /// Last committed snapshot. Its `fecha` can lag behind [`Self::fecha`]
    /// while a refresh for a newly selected date is pending.
    pub fn snapshot(&self) -> Option<&DashboardSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn banner(&self) -> Option<&Banner> {
        self.banner.as_ref()
    }

    /// Pick a new date. Any refresh still pending for the old one is
    /// superseded by the returned token.
    pub fn select_date(&mut self, fecha: NaiveDate) -> RequestToken {
        self.fecha = fecha;
        self.begin_refresh()
    }

    pub fn begin_refresh(&mut self) -> RequestToken {
        self.loading = true;
        self.tokens.issue()
    }

    /// Commit a snapshot, or record the failure. A superseded token is
    /// ignored and `false` returned.
    pub fn finish_refresh(
        &mut self,
        token: RequestToken,
        result: Result<DashboardSnapshot, FacadeError>,
    ) -> bool {
        if !self.tokens.is_latest(token) {
            tracing::debug!(?token, "discarding superseded dashboard refresh");
            return false;
        }
        self.loading = false;
        match result {
            Ok(snapshot) => {
                self.snapshot = Some(snapshot);
                self.banner = None;
            }
            Err(e) => {
                tracing::warn!(fecha = %self.fecha, error = %e, "dashboard refresh failed");
                self.banner = Some(Banner::from(&e));
            }
        }
        true
    }

    /// Refresh for the selected date.
    pub fn refresh<F: DashboardFacade>(&mut self, facade: &F) -> Result<(), Banner> {
        let token = self.begin_refresh();
        let fecha = self.fecha;
        let result = with_retry(self.retry, || fetch_snapshot(facade, fecha));
        let outcome = match &result {
            Ok(_) => Ok(()),
            Err(e) => Err(Banner::from(e)),
        };
        self.finish_refresh(token, result);
        outcome
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use chrono::{NaiveDateTime, NaiveTime};

    use super::*;
    use crate::model::{ClaseInput, ClaseVista};

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, day).expect("valid date")
    }

    fn session(
        id: Id,
        fecha: NaiveDate,
        hour: u32,
        tutor: (Id, &str),
        curso: &str,
        estudiante: &str,
    ) -> Clase {
        Clase {
            id,
            datos: ClaseInput {
                matricula_id: 1,
                fecha,
                hora_inicio: NaiveTime::from_hms_opt(hour, 0, 0).expect("time"),
                hora_fin: NaiveTime::from_hms_opt(hour + 1, 0, 0).expect("time"),
                ..ClaseInput::default()
            },
            created_at: NaiveDateTime::default(),
            vista: ClaseVista {
                estudiante_nombre: estudiante.into(),
                tutor_id: tutor.0,
                tutor_nombre: tutor.1.into(),
                curso_nombre: curso.into(),
                tarifa_por_hora: 20.0,
            },
        }
    }

    #[test]
    fn summary_groups_by_tutor_with_distinct_names() {
        let marc = (2, "Marc Puig");
        let ana = (1, "Ana García");
        let sessions = vec![
            session(1, d(20), 9, marc, "Inglés B1", "Lucía"),
            session(2, d(20), 10, ana, "Francés A1", "Tomás"),
            session(3, d(20), 11, marc, "Inglés C1", "Lucía"),
            session(4, d(20), 12, marc, "Inglés B1", "Pau"),
            session(5, d(21), 9, ana, "Alemán A2", "Nuria"),
        ];

        let resumen = summarize_tutors(&sessions, d(20));
        assert_eq!(resumen.len(), 2);

        assert_eq!(resumen[0].tutor_nombre, "Ana García");
        assert_eq!(resumen[0].total_clases, 1);
        assert_eq!(resumen[0].cursos, "Francés A1");

        assert_eq!(resumen[1].tutor_id, 2);
        assert_eq!(resumen[1].total_clases, 3);
        assert_eq!(resumen[1].cursos, "Inglés B1, Inglés C1");
        assert_eq!(resumen[1].estudiantes, "Lucía, Pau");
    }

    #[test]
    fn summary_of_an_empty_day_is_empty() {
        let sessions = vec![session(1, d(20), 9, (1, "Ana"), "Inglés", "Lucía")];
        assert!(summarize_tutors(&sessions, d(22)).is_empty());
        assert!(summarize_tutors(&[], d(20)).is_empty());
    }

    /// Serves canned data; can be told to fail the tutor summary.
    struct Canned {
        agenda: Vec<Clase>,
        fail_resumen: Cell<bool>,
    }

    impl DashboardFacade for Canned {
        fn stats(&self) -> Result<Stats, FacadeError> {
            Ok(Stats {
                total_clases: self.agenda.len() as i64,
                ..Stats::default()
            })
        }

        fn agenda(&self, fecha: NaiveDate) -> Result<Vec<Clase>, FacadeError> {
            Ok(self
                .agenda
                .iter()
                .filter(|c| c.datos.fecha == fecha)
                .cloned()
                .collect())
        }

        fn resumen_tutores(&self, fecha: NaiveDate) -> Result<Vec<ResumenTutor>, FacadeError> {
            if self.fail_resumen.get() {
                return Err(FacadeError::Storage(rusqlite::Error::InvalidQuery));
            }
            Ok(summarize_tutors(&self.agenda, fecha))
        }
    }

    fn canned() -> Canned {
        Canned {
            agenda: vec![
                session(1, d(20), 9, (1, "Ana"), "Inglés", "Lucía"),
                session(2, d(21), 9, (1, "Ana"), "Inglés", "Tomás"),
            ],
            fail_resumen: Cell::new(false),
        }
    }

    #[test]
    fn refresh_commits_all_three_results_together() {
        let facade = canned();
        let mut view = DashboardView::new(d(20), RetryPolicy::none());
        view.refresh(&facade).expect("refresh");

        let snap = view.snapshot().expect("snapshot");
        assert_eq!(snap.fecha, d(20));
        assert_eq!(snap.stats.total_clases, 2);
        assert_eq!(snap.agenda.len(), 1);
        assert_eq!(snap.resumen.len(), 1);
        assert!(!view.is_loading());
    }

    #[test]
    fn partial_failure_leaves_the_previous_snapshot() {
        let facade = canned();
        let mut view = DashboardView::new(d(20), RetryPolicy::none());
        view.refresh(&facade).expect("refresh");

        facade.fail_resumen.set(true);
        view.select_date(d(21));
        assert!(view.refresh(&facade).is_err());

        let snap = view.snapshot().expect("previous snapshot kept");
        assert_eq!(snap.fecha, d(20));
        assert_eq!(snap.agenda[0].id, 1);
        assert!(!view.is_loading());
        assert_eq!(view.banner().map(|b| b.code), Some("db_failed"));
    }

    #[test]
    fn result_for_an_earlier_date_is_discarded() {
        let facade = canned();
        let mut view = DashboardView::new(d(20), RetryPolicy::none());

        let old = view.select_date(d(20));
        let new = view.select_date(d(21));
        let late = fetch_snapshot(&facade, d(20));
        assert!(!view.finish_refresh(old, late));
        assert!(view.snapshot().is_none());
        assert!(view.is_loading());

        assert!(view.finish_refresh(new, fetch_snapshot(&facade, d(21))));
        let snap = view.snapshot().expect("snapshot");
        assert_eq!(snap.fecha, d(21));
        assert_eq!(snap.agenda[0].id, 2);
        assert!(!view.is_loading());
    }
}
