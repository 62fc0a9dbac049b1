use serde_json::json;

use crate::dashboard::fetch_snapshot;
use crate::facade::DashboardFacade;
use crate::ipc::error::{err, facade_err, ok};
use crate::ipc::helpers::{param_date, require_store};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;

type Reply = Result<serde_json::Value, serde_json::Value>;

fn stats(store: &Store, req: &Request) -> Reply {
    let stats = store.stats().map_err(|e| facade_err(&req.id, &e))?;
    Ok(json!({ "stats": stats }))
}

fn agenda(store: &Store, req: &Request) -> Reply {
    let fecha = param_date(req, "fecha")?;
    let clases = store.agenda(fecha).map_err(|e| facade_err(&req.id, &e))?;
    Ok(json!({ "fecha": fecha, "clases": clases }))
}

fn resumen_tutores(store: &Store, req: &Request) -> Reply {
    let fecha = param_date(req, "fecha")?;
    let resumen = store
        .resumen_tutores(fecha)
        .map_err(|e| facade_err(&req.id, &e))?;
    Ok(json!({ "fecha": fecha, "resumen": resumen }))
}

fn snapshot(store: &Store, req: &Request) -> Reply {
    let fecha = param_date(req, "fecha")?;
    let snapshot = fetch_snapshot(store, fecha).map_err(|e| facade_err(&req.id, &e))?;
    serde_json::to_value(snapshot)
        .map_err(|e| err(&req.id, "serialize_failed", e.to_string(), None))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let handler: fn(&Store, &Request) -> Reply = match req.method.as_str() {
        "dashboard.stats" => stats,
        "dashboard.agenda" => agenda,
        "dashboard.resumenTutores" => resumen_tutores,
        "dashboard.snapshot" => snapshot,
        _ => return None,
    };
    let reply = require_store(state, req).and_then(|store| handler(store, req));
    Some(match reply {
        Ok(result) => ok(&req.id, result),
        Err(resp) => resp,
    })
}
