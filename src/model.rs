//! Academy entities as the facade hands them out.
//!
//! Every entity is split in two: the editable input (`TutorInput`, ...) that a
//! form draft holds and that `create`/`update` accept, and the record that adds
//! the server-assigned id, the creation timestamp and, for relational entities,
//! a read-only `*Vista` with display names joined from related rows. Nothing in
//! an input can carry a joined value, so a draft can never write one back.

use chrono::{Local, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

pub type Id = i64;

macro_rules! sql_text_enum {
    ($ty:ty) => {
        impl ToSql for $ty {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                Ok(ToSqlOutput::from(self.as_str()))
            }
        }

        impl FromSql for $ty {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                let raw = value.as_str()?;
                <$ty>::parse(raw).ok_or_else(|| {
                    FromSqlError::Other(
                        format!("unknown {} value: {}", stringify!($ty), raw).into(),
                    )
                })
            }
        }
    };
}

/// CEFR proficiency level. Ordered A1 < A2 < ... < C2.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Nivel {
    #[default]
    A1,
    A2,
    B1,
    B2,
    C1,
    C2,
}

impl Nivel {
    pub const ALL: [Nivel; 6] = [
        Nivel::A1,
        Nivel::A2,
        Nivel::B1,
        Nivel::B2,
        Nivel::C1,
        Nivel::C2,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Nivel::A1 => "A1",
            Nivel::A2 => "A2",
            Nivel::B1 => "B1",
            Nivel::B2 => "B2",
            Nivel::C1 => "C1",
            Nivel::C2 => "C2",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        let up = raw.trim().to_ascii_uppercase();
        Nivel::ALL.into_iter().find(|n| n.as_str() == up)
    }
}

sql_text_enum!(Nivel);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstadoPago {
    Pendiente,
    #[default]
    Pagado,
}

impl EstadoPago {
    pub fn as_str(self) -> &'static str {
        match self {
            EstadoPago::Pendiente => "pendiente",
            EstadoPago::Pagado => "pagado",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "pendiente" => Some(EstadoPago::Pendiente),
            "pagado" => Some(EstadoPago::Pagado),
            _ => None,
        }
    }
}

sql_text_enum!(EstadoPago);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstadoClase {
    #[default]
    Programada,
    Completada,
    Cancelada,
}

impl EstadoClase {
    pub fn as_str(self) -> &'static str {
        match self {
            EstadoClase::Programada => "programada",
            EstadoClase::Completada => "completada",
            EstadoClase::Cancelada => "cancelada",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "programada" => Some(EstadoClase::Programada),
            "completada" => Some(EstadoClase::Completada),
            "cancelada" => Some(EstadoClase::Cancelada),
            _ => None,
        }
    }

    /// Sessions only move forward: a scheduled session may be completed or
    /// cancelled, and a finished one keeps its state.
    pub fn can_transition_to(self, next: EstadoClase) -> bool {
        self == next || self == EstadoClase::Programada
    }
}

sql_text_enum!(EstadoClase);

/// Integer active flag carried by tutors, courses, students and enrollments.
///
/// `Inactivo` means suspended: the row stays listed and referenceable, it only
/// drops out of the dashboard's active counts. Removal is always `delete`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum Estado {
    #[default]
    Activo,
    Inactivo,
}

impl From<i64> for Estado {
    fn from(v: i64) -> Self {
        if v != 0 {
            Estado::Activo
        } else {
            Estado::Inactivo
        }
    }
}

impl From<Estado> for i64 {
    fn from(v: Estado) -> Self {
        match v {
            Estado::Activo => 1,
            Estado::Inactivo => 0,
        }
    }
}

impl ToSql for Estado {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(i64::from(*self)))
    }
}

impl FromSql for Estado {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        i64::column_result(value).map(Estado::from)
    }
}

/// Wall-clock session times travel as `HH:MM`, whole minutes only.
pub fn parse_hora(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M").ok()
}

mod hora {
    use chrono::NaiveTime;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(t: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&t.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_hora(&raw).ok_or_else(|| de::Error::custom(format!("invalid time: {raw}")))
    }
}

pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn at(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or_default()
}

fn require_text(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new(field, "must not be empty"));
    }
    Ok(())
}

fn require_whole_minute(field: &'static str, t: NaiveTime) -> Result<(), ValidationError> {
    if t.second() != 0 || t.nanosecond() != 0 {
        return Err(ValidationError::new(field, "must be a whole minute"));
    }
    Ok(())
}

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

fn require_ref(field: &'static str, id: Id) -> Result<(), ValidationError> {
    if id <= 0 {
        return Err(ValidationError::new(field, "must be selected"));
    }
    Ok(())
}

/// Rules an input must satisfy.
///
/// `invariants` is what the facade enforces on every write. `form` is what a
/// console form checks before it is allowed to send anything, and is never
/// weaker than `invariants`.
pub trait Validate {
    fn invariants(&self) -> Result<(), ValidationError>;

    /// Tidy user-typed text before the form rules run. The facade stores
    /// whatever it is given.
    fn normalize(&mut self) {}

    fn form(&self) -> Result<(), ValidationError> {
        self.invariants()
    }
}

/// A collection the console lists, edits and deletes.
pub trait Entity: Clone + Serialize + DeserializeOwned {
    type Input: Clone + Default + PartialEq + std::fmt::Debug + Serialize + DeserializeOwned + Validate;

    /// Name used in messages and as the single-record key in IPC results.
    const SINGULAR: &'static str;
    /// Method family and list key in IPC results.
    const PLURAL: &'static str;

    fn id(&self) -> Id;

    fn datos(&self) -> &Self::Input;

    /// Copy of the editable fields, for pre-populating an edit draft.
    fn editable(&self) -> Self::Input {
        self.datos().clone()
    }
}

macro_rules! entity {
    ($ty:ty, $input:ty, $singular:literal, $plural:literal) => {
        impl Entity for $ty {
            type Input = $input;
            const SINGULAR: &'static str = $singular;
            const PLURAL: &'static str = $plural;

            fn id(&self) -> Id {
                self.id
            }

            fn datos(&self) -> &$input {
                &self.datos
            }
        }
    };
}

// ---------------------------------------------------------------------------
// Tutor

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TutorInput {
    pub nombre: String,
    pub email: String,
    pub telefono: String,
    pub especialidad: String,
    pub tarifa_por_hora: f64,
    pub estado: Estado,
}

impl Default for TutorInput {
    fn default() -> Self {
        Self {
            nombre: String::new(),
            email: String::new(),
            telefono: String::new(),
            especialidad: "Inglés".to_string(),
            tarifa_por_hora: 0.0,
            estado: Estado::Activo,
        }
    }
}

impl Validate for TutorInput {
    fn normalize(&mut self) {
        trim_in_place(&mut self.nombre);
        trim_in_place(&mut self.email);
        trim_in_place(&mut self.telefono);
        trim_in_place(&mut self.especialidad);
    }

    fn invariants(&self) -> Result<(), ValidationError> {
        require_text("nombre", &self.nombre)?;
        if !self.tarifa_por_hora.is_finite() || self.tarifa_por_hora < 0.0 {
            return Err(ValidationError::new(
                "tarifa_por_hora",
                "must be a non-negative amount",
            ));
        }
        Ok(())
    }

    fn form(&self) -> Result<(), ValidationError> {
        self.invariants()?;
        require_text("especialidad", &self.especialidad)?;
        if self.tarifa_por_hora <= 0.0 {
            return Err(ValidationError::new(
                "tarifa_por_hora",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tutor {
    pub id: Id,
    #[serde(flatten)]
    pub datos: TutorInput,
    pub created_at: NaiveDateTime,
}

entity!(Tutor, TutorInput, "tutor", "tutores");

// ---------------------------------------------------------------------------
// Curso

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CursoInput {
    pub nombre: String,
    pub descripcion: String,
    pub nivel: Nivel,
    pub max_estudiantes: i64,
    pub estado: Estado,
}

impl Default for CursoInput {
    fn default() -> Self {
        Self {
            nombre: String::new(),
            descripcion: String::new(),
            nivel: Nivel::A1,
            max_estudiantes: 10,
            estado: Estado::Activo,
        }
    }
}

impl Validate for CursoInput {
    fn normalize(&mut self) {
        trim_in_place(&mut self.nombre);
    }

    fn invariants(&self) -> Result<(), ValidationError> {
        require_text("nombre", &self.nombre)?;
        if self.max_estudiantes <= 0 {
            return Err(ValidationError::new(
                "max_estudiantes",
                "must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Curso {
    pub id: Id,
    #[serde(flatten)]
    pub datos: CursoInput,
    pub created_at: NaiveDateTime,
}

entity!(Curso, CursoInput, "curso", "cursos");

// ---------------------------------------------------------------------------
// Estudiante

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstudianteInput {
    pub nombre: String,
    pub email: String,
    pub telefono: String,
    pub fecha_inscripcion: NaiveDate,
    pub estado: Estado,
}

impl Default for EstudianteInput {
    fn default() -> Self {
        Self {
            nombre: String::new(),
            email: String::new(),
            telefono: String::new(),
            fecha_inscripcion: today(),
            estado: Estado::Activo,
        }
    }
}

impl Validate for EstudianteInput {
    fn normalize(&mut self) {
        trim_in_place(&mut self.nombre);
        trim_in_place(&mut self.email);
        trim_in_place(&mut self.telefono);
    }

    fn invariants(&self) -> Result<(), ValidationError> {
        require_text("nombre", &self.nombre)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estudiante {
    pub id: Id,
    #[serde(flatten)]
    pub datos: EstudianteInput,
    pub created_at: NaiveDateTime,
}

entity!(Estudiante, EstudianteInput, "estudiante", "estudiantes");

// ---------------------------------------------------------------------------
// Matricula

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatriculaInput {
    pub estudiante_id: Id,
    pub curso_id: Id,
    pub tutor_id: Id,
    pub fecha_inscripcion: NaiveDate,
    pub estado: Estado,
}

impl Default for MatriculaInput {
    fn default() -> Self {
        Self {
            estudiante_id: 0,
            curso_id: 0,
            tutor_id: 0,
            fecha_inscripcion: today(),
            estado: Estado::Activo,
        }
    }
}

impl Validate for MatriculaInput {
    // Reference existence is checked by the facade against stored rows.
    fn invariants(&self) -> Result<(), ValidationError> {
        Ok(())
    }

    fn form(&self) -> Result<(), ValidationError> {
        require_ref("estudiante_id", self.estudiante_id)?;
        require_ref("curso_id", self.curso_id)?;
        require_ref("tutor_id", self.tutor_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatriculaVista {
    pub estudiante_nombre: String,
    pub curso_nombre: String,
    pub tutor_nombre: String,
    pub tarifa_por_hora: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Matricula {
    pub id: Id,
    #[serde(flatten)]
    pub datos: MatriculaInput,
    pub created_at: NaiveDateTime,
    #[serde(flatten)]
    pub vista: MatriculaVista,
}

entity!(Matricula, MatriculaInput, "matricula", "matriculas");

// ---------------------------------------------------------------------------
// Clase

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaseInput {
    pub matricula_id: Id,
    pub fecha: NaiveDate,
    #[serde(with = "hora")]
    pub hora_inicio: NaiveTime,
    #[serde(with = "hora")]
    pub hora_fin: NaiveTime,
    pub estado: EstadoClase,
    pub notas: String,
}

impl Default for ClaseInput {
    fn default() -> Self {
        Self {
            matricula_id: 0,
            fecha: today(),
            hora_inicio: at(9, 0),
            hora_fin: at(10, 0),
            estado: EstadoClase::Programada,
            notas: String::new(),
        }
    }
}

impl Validate for ClaseInput {
    fn invariants(&self) -> Result<(), ValidationError> {
        require_whole_minute("hora_inicio", self.hora_inicio)?;
        require_whole_minute("hora_fin", self.hora_fin)?;
        if self.hora_fin <= self.hora_inicio {
            return Err(ValidationError::new(
                "hora_fin",
                "must be later than hora_inicio",
            ));
        }
        Ok(())
    }

    fn form(&self) -> Result<(), ValidationError> {
        require_ref("matricula_id", self.matricula_id)?;
        self.invariants()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClaseVista {
    pub estudiante_nombre: String,
    pub tutor_id: Id,
    pub tutor_nombre: String,
    pub curso_nombre: String,
    pub tarifa_por_hora: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clase {
    pub id: Id,
    #[serde(flatten)]
    pub datos: ClaseInput,
    pub created_at: NaiveDateTime,
    #[serde(flatten)]
    pub vista: ClaseVista,
}

entity!(Clase, ClaseInput, "clase", "clases");

// ---------------------------------------------------------------------------
// Pago

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PagoInput {
    pub tutor_id: Id,
    pub clase_id: Option<Id>,
    pub cantidad_clases: Option<i64>,
    pub monto: f64,
    pub fecha_pago: NaiveDate,
    pub estado: EstadoPago,
    pub descripcion: String,
}

impl Default for PagoInput {
    fn default() -> Self {
        Self {
            tutor_id: 0,
            clase_id: None,
            cantidad_clases: None,
            monto: 0.0,
            fecha_pago: today(),
            estado: EstadoPago::Pagado,
            descripcion: String::new(),
        }
    }
}

impl Validate for PagoInput {
    fn invariants(&self) -> Result<(), ValidationError> {
        if !self.monto.is_finite() || self.monto <= 0.0 {
            return Err(ValidationError::new("monto", "must be greater than zero"));
        }
        if let Some(n) = self.cantidad_clases {
            if n <= 0 {
                return Err(ValidationError::new(
                    "cantidad_clases",
                    "must be greater than zero",
                ));
            }
        }
        Ok(())
    }

    fn form(&self) -> Result<(), ValidationError> {
        require_ref("tutor_id", self.tutor_id)?;
        self.invariants()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagoVista {
    pub tutor_nombre: String,
    pub tutor_email: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pago {
    pub id: Id,
    #[serde(flatten)]
    pub datos: PagoInput,
    pub created_at: NaiveDateTime,
    #[serde(flatten)]
    pub vista: PagoVista,
}

entity!(Pago, PagoInput, "pago", "pagos");

// ---------------------------------------------------------------------------
// Dashboard aggregates

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub tutores_activos: i64,
    pub estudiantes_activos: i64,
    pub cursos_activos: i64,
    pub matriculas_activas: i64,
    pub total_clases: i64,
    pub ingresos_pendientes: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResumenTutor {
    pub tutor_id: Id,
    pub tutor_nombre: String,
    pub total_clases: i64,
    pub cursos: String,
    pub estudiantes: String,
}
