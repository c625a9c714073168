use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{
    client_failed, client_mut, id_param, local_now, now_iso, now_ms, opt_str_param,
    validation_failed,
};
use crate::ipc::types::{AppState, Request};
use crate::notifications::{self, NewNotification};
use serde_json::{json, Value};

fn handle_add(state: &mut AppState, req: &Request) -> Value {
    let new = NewNotification {
        title: opt_str_param(req, "title").unwrap_or_default().to_string(),
        when: opt_str_param(req, "when").map(str::to_string),
        description: opt_str_param(req, "description").map(str::to_string),
    };
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match notifications::add(client, new, local_now(), now_ms(), &now_iso()) {
        Ok(record) => ok(&req.id, json!({ "record": record })),
        Err(fields) => validation_failed(req, fields),
    }
}

fn handle_toggle(state: &mut AppState, req: &Request) -> Value {
    let id = match id_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match notifications::toggle(client, &id) {
        Ok(Some(record)) => ok(&req.id, json!({ "record": record })),
        Ok(None) => err(
            &req.id,
            "not_found",
            "notification not found",
            Some(json!({ "id": id })),
        ),
        Err(e) => client_failed(req, e, "db_update_failed"),
    }
}

fn handle_mark_all_read(state: &mut AppState, req: &Request) -> Value {
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match notifications::mark_all_read(client) {
        Ok(n) => ok(&req.id, json!({ "updated": n })),
        Err(e) => client_failed(req, e, "db_update_failed"),
    }
}

fn handle_clear_all(state: &mut AppState, req: &Request) -> Value {
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match notifications::clear_all(client) {
        Ok(n) => ok(&req.id, json!({ "removed": n })),
        Err(e) => client_failed(req, e, "db_update_failed"),
    }
}

fn handle_weekly(state: &mut AppState, req: &Request) -> Value {
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match notifications::weekly(client, local_now()) {
        Ok(view) => ok(&req.id, json!(view)),
        Err(e) => client_failed(req, e, "db_query_failed"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "notifications.add" => Some(handle_add(state, req)),
        "notifications.toggle" => Some(handle_toggle(state, req)),
        "notifications.markAllRead" => Some(handle_mark_all_read(state, req)),
        "notifications.clearAll" => Some(handle_clear_all(state, req)),
        "notifications.weekly" => Some(handle_weekly(state, req)),
        _ => None,
    }
}
