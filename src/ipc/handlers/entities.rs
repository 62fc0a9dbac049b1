//! `<family>.list|get|create|update|delete` for every collection.

use serde_json::json;

use crate::facade::Facade;
use crate::ipc::error::{err, facade_err, ok};
use crate::ipc::helpers::{decode, keyed, merge_patch, param_id, param_opt_id, require_store};
use crate::ipc::types::{AppState, Request};
use crate::model::{Clase, Curso, Entity, Estudiante, Matricula, Pago, Tutor, Validate};
use crate::store::Store;
use crate::view::screens::{pagos_for_tutor, total_monto};

type Reply = Result<serde_json::Value, serde_json::Value>;

fn list<E: Entity>(store: &Store, req: &Request) -> Reply
where
    Store: Facade<E>,
{
    let rows = Facade::<E>::get_all(store).map_err(|e| facade_err(&req.id, &e))?;
    keyed(req, E::PLURAL, rows)
}

fn get<E: Entity>(store: &Store, req: &Request) -> Reply
where
    Store: Facade<E>,
{
    let id = param_id(req, "id")?;
    let row = Facade::<E>::get(store, id).map_err(|e| facade_err(&req.id, &e))?;
    keyed(req, E::SINGULAR, row)
}

fn create<E: Entity>(store: &Store, req: &Request) -> Reply
where
    Store: Facade<E>,
{
    let raw = req.params.get("input").cloned().unwrap_or(json!({}));
    let mut input: E::Input = decode(req, "input", raw)?;
    input.normalize();
    let row = Facade::<E>::create(store, &input).map_err(|e| facade_err(&req.id, &e))?;
    keyed(req, E::SINGULAR, row)
}

/// `input` replaces every editable field; `patch` is merged over the
/// current ones. Typed text is trimmed before the write either way.
fn update<E: Entity>(store: &Store, req: &Request) -> Reply
where
    Store: Facade<E>,
{
    let id = param_id(req, "id")?;
    let mut input: E::Input = if let Some(raw) = req.params.get("input") {
        decode(req, "input", raw.clone())?
    } else if let Some(patch) = req.params.get("patch") {
        let current = Facade::<E>::get(store, id).map_err(|e| facade_err(&req.id, &e))?;
        let mut merged = serde_json::to_value(current.datos())
            .map_err(|e| err(&req.id, "serialize_failed", e.to_string(), None))?;
        merge_patch(&mut merged, patch);
        decode(req, "patch", merged)?
    } else {
        return Err(err(
            &req.id,
            "bad_params",
            "missing input or patch",
            None,
        ));
    };
    input.normalize();
    let row = Facade::<E>::update(store, id, &input).map_err(|e| facade_err(&req.id, &e))?;
    keyed(req, E::SINGULAR, row)
}

fn delete<E: Entity>(store: &Store, req: &Request) -> Reply
where
    Store: Facade<E>,
{
    let id = param_id(req, "id")?;
    Facade::<E>::delete(store, id).map_err(|e| facade_err(&req.id, &e))?;
    Ok(json!({ "deleted": id }))
}

/// Payments, optionally for one tutor, with their summed amount.
fn list_pagos(store: &Store, req: &Request) -> Reply {
    let tutor = param_opt_id(req, "tutorId")?;
    let all = Facade::<Pago>::get_all(store).map_err(|e| facade_err(&req.id, &e))?;
    let rows = pagos_for_tutor(&all, tutor);
    let total = total_monto(rows.iter().copied());
    Ok(json!({ "pagos": rows, "total": total }))
}

fn dispatch<E: Entity>(state: &AppState, req: &Request, action: &str) -> Option<serde_json::Value>
where
    Store: Facade<E>,
{
    let handler: fn(&Store, &Request) -> Reply = match action {
        "list" => list::<E>,
        "get" => get::<E>,
        "create" => create::<E>,
        "update" => update::<E>,
        "delete" => delete::<E>,
        _ => return None,
    };
    let reply = require_store(state, req).and_then(|store| handler(store, req));
    Some(match reply {
        Ok(result) => ok(&req.id, result),
        Err(resp) => resp,
    })
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let (family, action) = req.method.split_once('.')?;
    if family == Tutor::PLURAL {
        dispatch::<Tutor>(state, req, action)
    } else if family == Curso::PLURAL {
        dispatch::<Curso>(state, req, action)
    } else if family == Estudiante::PLURAL {
        dispatch::<Estudiante>(state, req, action)
    } else if family == Matricula::PLURAL {
        dispatch::<Matricula>(state, req, action)
    } else if family == Clase::PLURAL {
        dispatch::<Clase>(state, req, action)
    } else if family == Pago::PLURAL {
        if action == "list" {
            let reply = require_store(state, req).and_then(|store| list_pagos(store, req));
            return Some(match reply {
                Ok(result) => ok(&req.id, result),
                Err(resp) => resp,
            });
        }
        dispatch::<Pago>(state, req, action)
    } else {
        None
    }
}
