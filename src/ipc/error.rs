use serde_json::json;

use crate::error::FacadeError;

pub fn ok(id: &str, result: serde_json::Value) -> serde_json::Value {
    json!({
        "id": id,
        "ok": true,
        "result": result
    })
}

pub fn err(
    id: &str,
    code: &str,
    message: impl Into<String>,
    details: Option<serde_json::Value>,
) -> serde_json::Value {
    let mut error = json!({
        "code": code,
        "message": message.into(),
    });
    if let Some(d) = details {
        error["details"] = d;
    }
    json!({
        "id": id,
        "ok": false,
        "error": error,
    })
}

/// Facade failures carry their code, a `retryable` flag, and whatever
/// identifies the offending field or record.
pub fn facade_err(id: &str, e: &FacadeError) -> serde_json::Value {
    let mut details = json!({ "retryable": e.is_transient() });
    match e {
        FacadeError::Validation(v) => {
            details["field"] = json!(v.field);
        }
        FacadeError::NotFound { entity, id } => {
            details["entity"] = json!(entity);
            details["id"] = json!(id);
        }
        FacadeError::Referential { entity, field, id } => {
            details["entity"] = json!(entity);
            details["field"] = json!(field);
            details["id"] = json!(id);
        }
        FacadeError::InUse {
            entity,
            id,
            dependents,
            count,
        } => {
            details["entity"] = json!(entity);
            details["id"] = json!(id);
            details["dependents"] = json!(dependents);
            details["count"] = json!(count);
        }
        FacadeError::Storage(_) => {}
    }
    err(id, e.code(), e.to_string(), Some(details))
}
