use crate::ipc::error::ok;
use crate::ipc::helpers::{
    client_failed, client_mut, id_param, now_iso, obj_param, today, validation_failed,
};
use crate::ipc::types::{AppState, Request};
use crate::records::Collection;
use crate::validate::{self, Validation};
use serde_json::{json, Map, Value};

#[derive(Clone, Copy)]
enum Op {
    List,
    Create,
    Update,
    Patch,
    Delete,
}

fn parse_method(method: &str) -> Option<(Collection, Op)> {
    let (prefix, op) = method.split_once('.')?;
    let collection = Collection::parse(prefix)?;
    let op = match op {
        "list" => Op::List,
        "create" => Op::Create,
        "update" => Op::Update,
        "patch" => Op::Patch,
        "delete" => Op::Delete,
        _ => return None,
    };
    Some((collection, op))
}

fn validate_record(collection: Collection, op: Op, rec: &Map<String, Value>) -> Validation {
    match collection {
        Collection::Students => validate::student(rec),
        Collection::Forwarding => validate::forwarding(rec, today()),
        Collection::InternalControl => validate::internal_control(rec, today()),
        Collection::Notifications => validate::notification(rec),
        Collection::Users if matches!(op, Op::Update) => validate::user_profile(rec),
        Collection::Users => validate::register(rec),
        Collection::Evaluations | Collection::Reports => Ok(()),
    }
}

fn timestamp_field(collection: Collection) -> Option<&'static str> {
    match collection {
        Collection::Evaluations => Some("submittedAt"),
        Collection::Reports => None,
        _ => Some("createdAt"),
    }
}

fn handle_list(state: &mut AppState, req: &Request, c: Collection) -> Value {
    let client = match client_mut(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match client.get(c.path(), c.cache_key()) {
        Ok(items) => ok(&req.id, json!({ "items": items })),
        Err(e) => client_failed(req, e, "db_query_failed"),
    }
}

fn handle_create(state: &mut AppState, req: &Request, c: Collection) -> Value {
    let mut record = match obj_param(req, "record") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(fields) = validate_record(c, Op::Create, &record) {
        return validation_failed(req, fields);
    }
    let client = match client_mut(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Some(field) = timestamp_field(c) {
        record
            .entry(field)
            .or_insert_with(|| Value::String(now_iso()));
    }
    let created = client.create(c.path(), record, c.cache_key());
    ok(&req.id, json!({ "record": created }))
}

fn handle_update(state: &mut AppState, req: &Request, c: Collection) -> Value {
    let record = match obj_param(req, "record") {
        Ok(v) => v,
        Err(e) => return e,
    };
    if let Err(fields) = validate_record(c, Op::Update, &record) {
        return validation_failed(req, fields);
    }
    let client = match client_mut(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match client.update(c.path(), record, c.cache_key()) {
        Ok(stored) => ok(&req.id, json!({ "record": stored })),
        Err(e) => client_failed(req, e, "db_update_failed"),
    }
}

fn handle_patch(state: &mut AppState, req: &Request, c: Collection) -> Value {
    let id = match id_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let mut partial = match obj_param(req, "changes") {
        Ok(v) => v,
        Err(e) => return e,
    };
    partial.insert("id".into(), id.to_value());
    let client = match client_mut(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match client.patch(c.path(), partial, c.cache_key()) {
        Ok(merged) => ok(&req.id, json!({ "record": merged })),
        Err(e) => client_failed(req, e, "db_update_failed"),
    }
}

fn handle_delete(state: &mut AppState, req: &Request, c: Collection) -> Value {
    let id = match id_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let client = match client_mut(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    match client.delete(c.path(), &id, c.cache_key()) {
        Ok(removed) => ok(&req.id, json!({ "id": removed })),
        Err(e) => client_failed(req, e, "db_update_failed"),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let (collection, op) = parse_method(&req.method)?;
    Some(match op {
        Op::List => handle_list(state, req, collection),
        Op::Create => handle_create(state, req, collection),
        Op::Update => handle_update(state, req, collection),
        Op::Patch => handle_patch(state, req, collection),
        Op::Delete => handle_delete(state, req, collection),
    })
}
