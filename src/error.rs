use thiserror::Error;

use crate::model::Id;

/// A field-level rule violation. Raised locally by a form before anything is
/// sent, or by the facade when a write breaks an entity invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// What a console should do about a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    /// Keep the form open; the user must change the input.
    FixInput,
    /// The record changed underneath the view; drop the draft and reload.
    Reload,
    /// Transient; the same call may succeed if repeated.
    Retry,
    /// Nothing the user can do from the form; show it and stop.
    Report,
}

#[derive(Debug, Error)]
pub enum FacadeError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Id },

    #[error("{entity} {id} referenced by {field} does not exist")]
    Referential {
        entity: &'static str,
        field: &'static str,
        id: Id,
    },

    #[error("{entity} {id} is still referenced by {count} {dependents}")]
    InUse {
        entity: &'static str,
        id: Id,
        dependents: &'static str,
        count: i64,
    },

    #[error("storage: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl FacadeError {
    pub fn not_found(entity: &'static str, id: Id) -> Self {
        FacadeError::NotFound { entity, id }
    }

    /// Stable machine code used on the IPC wire.
    pub fn code(&self) -> &'static str {
        match self {
            FacadeError::Validation(_) => "validation_failed",
            FacadeError::NotFound { .. } => "not_found",
            FacadeError::Referential { .. } => "referential",
            FacadeError::InUse { .. } => "in_use",
            FacadeError::Storage(_) => "db_failed",
        }
    }

    /// Only a busy or locked database is worth repeating.
    pub fn is_transient(&self) -> bool {
        match self {
            FacadeError::Storage(rusqlite::Error::SqliteFailure(e, _)) => matches!(
                e.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ),
            _ => false,
        }
    }

    pub fn recovery(&self) -> Recovery {
        match self {
            FacadeError::Validation(_)
            | FacadeError::Referential { .. }
            | FacadeError::InUse { .. } => Recovery::FixInput,
            FacadeError::NotFound { .. } => Recovery::Reload,
            FacadeError::Storage(_) if self.is_transient() => Recovery::Retry,
            FacadeError::Storage(_) => Recovery::Report,
        }
    }
}
