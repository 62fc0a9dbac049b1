use crate::error::FacadeError;
use crate::facade::Facade;
use crate::model::{Clase, Curso, Estudiante, Id, Matricula, Pago, Tutor};

use super::CollectionView;

/// Collections a screen's form needs besides its own, fetched with it.
pub trait Related<F>: Sized {
    fn fetch(facade: &F) -> Result<Self, FacadeError>;
}

impl<F> Related<F> for () {
    fn fetch(_: &F) -> Result<(), FacadeError> {
        Ok(())
    }
}

/// Selects for the enrollment form.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnrollmentOptions {
    pub estudiantes: Vec<Estudiante>,
    pub cursos: Vec<Curso>,
    pub tutores: Vec<Tutor>,
}

impl<F> Related<F> for EnrollmentOptions
where
    F: Facade<Estudiante> + Facade<Curso> + Facade<Tutor>,
{
    fn fetch(facade: &F) -> Result<Self, FacadeError> {
        Ok(Self {
            estudiantes: Facade::<Estudiante>::get_all(facade)?,
            cursos: Facade::<Curso>::get_all(facade)?,
            tutores: Facade::<Tutor>::get_all(facade)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionOptions {
    pub matriculas: Vec<Matricula>,
}

impl<F: Facade<Matricula>> Related<F> for SessionOptions {
    fn fetch(facade: &F) -> Result<Self, FacadeError> {
        Ok(Self {
            matriculas: Facade::<Matricula>::get_all(facade)?,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaymentOptions {
    pub tutores: Vec<Tutor>,
}

impl<F: Facade<Tutor>> Related<F> for PaymentOptions {
    fn fetch(facade: &F) -> Result<Self, FacadeError> {
        Ok(Self {
            tutores: Facade::<Tutor>::get_all(facade)?,
        })
    }
}

pub type TutoresView = CollectionView<Tutor>;
pub type CursosView = CollectionView<Curso>;
pub type EstudiantesView = CollectionView<Estudiante>;
pub type MatriculasView = CollectionView<Matricula, EnrollmentOptions>;
pub type ClasesView = CollectionView<Clase, SessionOptions>;
pub type PagosView = CollectionView<Pago, PaymentOptions>;

/// Payments for one tutor, or all of them for `None`.
pub fn pagos_for_tutor(pagos: &[Pago], tutor: Option<Id>) -> Vec<&Pago> {
    pagos
        .iter()
        .filter(|p| tutor.map_or(true, |t| p.datos.tutor_id == t))
        .collect()
}

pub fn total_monto<'a>(pagos: impl IntoIterator<Item = &'a Pago>) -> f64 {
    pagos.into_iter().map(|p| p.datos.monto).sum()
}

impl PagosView {
    pub fn filtered(&self, tutor: Option<Id>) -> Vec<&Pago> {
        pagos_for_tutor(self.items(), tutor)
    }

    /// Sum of `monto` over the same rows `filtered` shows.
    pub fn total(&self, tutor: Option<Id>) -> f64 {
        total_monto(self.filtered(tutor))
    }
}
