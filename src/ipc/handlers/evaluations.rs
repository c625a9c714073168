use crate::drafts::{self, DraftUpdate, SubmitError, SubmitRequest};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{client_mut, now_iso, validation_failed};
use crate::ipc::types::{AppState, Request};
use crate::records::{Answers, RecordId};
use crate::suggestion::compute_suggestion;
use serde_json::{json, Value};

fn answers_param(req: &Request) -> Result<Option<Answers>, Value> {
    match req.params.get("answers") {
        None | Some(Value::Null) => Ok(None),
        Some(v) => serde_json::from_value(v.clone())
            .map(Some)
            .map_err(|_| err(&req.id, "bad_params", "answers must be an object", None)),
    }
}

fn handle_suggestion(req: &Request) -> Value {
    let answers = match answers_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    ok(&req.id, json!(compute_suggestion(answers.as_ref())))
}

fn handle_draft_get(state: &mut AppState, req: &Request) -> Value {
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match drafts::load(client.store()) {
        Ok(d) => ok(&req.id, json!({ "draft": d })),
        Err(e) => err(&req.id, "db_query_failed", format!("{e:#}"), None),
    }
}

fn draft_update(req: &Request) -> Result<DraftUpdate, Value> {
    let mut update = DraftUpdate::default();
    if let Some(answer) = req.params.get("answer") {
        let index = match answer.get("index") {
            Some(Value::String(s)) if !s.is_empty() => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            _ => return Err(err(&req.id, "bad_params", "answer.index is required", None)),
        };
        let value = answer.get("value").cloned().unwrap_or(Value::Null);
        update.answer = Some((index, value));
    }
    if let Some(page) = req.params.get("page") {
        let Some(page) = page.as_u64().and_then(|p| u32::try_from(p).ok()) else {
            return Err(err(&req.id, "bad_params", "page must be a non-negative integer", None));
        };
        update.page = Some(page);
    }
    if let Some(student) = req.params.get("selectedStudent") {
        let selected = match student {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Null => String::new(),
            _ => return Err(err(&req.id, "bad_params", "selectedStudent must be an id", None)),
        };
        update.selected_student = Some(selected);
    }
    Ok(update)
}

fn handle_draft_save(state: &mut AppState, req: &Request) -> Value {
    let update = match draft_update(req) {
        Ok(u) => u,
        Err(e) => return e,
    };
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match drafts::save(client.store_mut(), update, &now_iso()) {
        Ok(d) => ok(&req.id, json!({ "draft": d })),
        Err(e) => err(&req.id, "db_update_failed", format!("{e:#}"), None),
    }
}

fn handle_draft_clear(state: &mut AppState, req: &Request) -> Value {
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match drafts::clear(client.store_mut()) {
        Ok(()) => ok(&req.id, json!({ "ok": true })),
        Err(e) => err(&req.id, "db_update_failed", format!("{e:#}"), None),
    }
}

fn handle_submit(state: &mut AppState, req: &Request) -> Value {
    let answers = match answers_param(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let submit = SubmitRequest {
        student_id: req.params.get("studentId").and_then(RecordId::from_value),
        student_name: req
            .params
            .get("studentName")
            .and_then(Value::as_str)
            .map(str::to_string),
        answers,
    };
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match drafts::submit(client, submit, &now_iso()) {
        Ok(done) => ok(&req.id, json!(done)),
        Err(SubmitError::Invalid(fields)) => validation_failed(req, fields),
        Err(SubmitError::Store(e)) => err(&req.id, "db_update_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "evaluations.suggestion" => Some(handle_suggestion(req)),
        "evaluations.draft.get" => Some(handle_draft_get(state, req)),
        "evaluations.draft.save" => Some(handle_draft_save(state, req)),
        "evaluations.draft.clear" => Some(handle_draft_clear(state, req)),
        "evaluations.submit" => Some(handle_submit(state, req)),
        _ => None,
    }
}
