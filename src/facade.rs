//! The boundary every console screen talks to.
//!
//! `Store` implements these over SQLite; anything else that can honour the
//! same contract (a remote client, a test double) can stand in for it.

use chrono::NaiveDate;

use crate::error::FacadeError;
use crate::model::{Clase, Entity, Id, ResumenTutor, Stats};

pub trait Facade<E: Entity> {
    /// Every record, ordered by id. The order is stable for a given state.
    fn get_all(&self) -> Result<Vec<E>, FacadeError>;

    fn get(&self, id: Id) -> Result<E, FacadeError>;

    /// Checks invariants and references, assigns id and timestamp, and returns
    /// the stored record with its joined fields.
    fn create(&self, input: &E::Input) -> Result<E, FacadeError>;

    /// Replaces the editable fields of `id`. Joined fields are recomputed.
    fn update(&self, id: Id, input: &E::Input) -> Result<E, FacadeError>;

    fn delete(&self, id: Id) -> Result<(), FacadeError>;
}

/// Read-only cross-entity queries behind the dashboard.
pub trait DashboardFacade {
    fn stats(&self) -> Result<Stats, FacadeError>;

    /// Sessions on `fecha`, joined, ordered by start time.
    fn agenda(&self, fecha: NaiveDate) -> Result<Vec<Clase>, FacadeError>;

    /// One entry per tutor with at least one session on `fecha`.
    fn resumen_tutores(&self, fecha: NaiveDate) -> Result<Vec<ResumenTutor>, FacadeError>;
}
