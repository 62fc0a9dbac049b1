use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;

use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::model::{today, Id};
use crate::store::Store;

pub fn require_store<'a>(
    state: &'a AppState,
    req: &Request,
) -> Result<&'a Store, serde_json::Value> {
    state
        .store
        .as_ref()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn param_str<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn param_id(req: &Request, key: &str) -> Result<Id, serde_json::Value> {
    req.params
        .get(key)
        .and_then(|v| v.as_i64())
        .ok_or_else(|| err(&req.id, "bad_params", format!("missing {key}"), None))
}

pub fn param_opt_id(req: &Request, key: &str) -> Result<Option<Id>, serde_json::Value> {
    match req.params.get(key) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(v) => v.as_i64().map(Some).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                format!("{key} must be an integer"),
                None,
            )
        }),
    }
}

/// `YYYY-MM-DD`; today when absent.
pub fn param_date(req: &Request, key: &str) -> Result<NaiveDate, serde_json::Value> {
    let Some(raw) = param_str(req, key) else {
        return Ok(today());
    };
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| {
        err(
            &req.id,
            "bad_params",
            format!("{key}: {e}"),
            Some(json!({ "value": raw })),
        )
    })
}

pub fn decode<T: DeserializeOwned>(
    req: &Request,
    key: &str,
    value: serde_json::Value,
) -> Result<T, serde_json::Value> {
    serde_json::from_value(value)
        .map_err(|e| err(&req.id, "bad_params", format!("invalid {key}: {e}"), None))
}

/// Shallow merge: every key in `patch` replaces the same key in `base`.
pub fn merge_patch(base: &mut serde_json::Value, patch: &serde_json::Value) {
    let (Some(base), Some(patch)) = (base.as_object_mut(), patch.as_object()) else {
        return;
    };
    for (k, v) in patch {
        base.insert(k.clone(), v.clone());
    }
}

/// `{ key: value }` for a key only known at run time.
pub fn keyed(
    req: &Request,
    key: &str,
    value: impl Serialize,
) -> Result<serde_json::Value, serde_json::Value> {
    let value = serde_json::to_value(value)
        .map_err(|e| err(&req.id, "serialize_failed", e.to_string(), None))?;
    let mut map = serde_json::Map::new();
    map.insert(key.to_string(), value);
    Ok(serde_json::Value::Object(map))
}
