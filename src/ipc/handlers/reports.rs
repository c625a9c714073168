use crate::client::{ClientError, DataClient};
use crate::ipc::error::ok;
use crate::ipc::helpers::{client_failed, client_mut, opt_str_param, today};
use crate::ipc::types::{AppState, Request};
use crate::records::{parse_all, Collection};
use crate::reports::student_rows;
use serde_json::{json, Value};

/// Secondary collections only enrich the rows; losing them is not fatal.
fn optional_collection(client: &mut DataClient, c: Collection) -> Result<Vec<Value>, ClientError> {
    match client.get(c.path(), c.cache_key()) {
        Err(ClientError::Unavailable { key, .. }) => {
            tracing::warn!("{} unavailable; report rows built without it", key);
            Ok(Vec::new())
        }
        other => other,
    }
}

fn handle_reports_students(state: &mut AppState, req: &Request) -> Value {
    let query = opt_str_param(req, "query").map(str::to_string);
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };

    let students = match client.get(Collection::Students.path(), Collection::Students.cache_key()) {
        Ok(v) => v,
        Err(e) => return client_failed(req, e, "db_query_failed"),
    };
    let evaluations = match optional_collection(client, Collection::Evaluations) {
        Ok(v) => v,
        Err(e) => return client_failed(req, e, "db_query_failed"),
    };
    let entries = match optional_collection(client, Collection::Reports) {
        Ok(v) => v,
        Err(e) => return client_failed(req, e, "db_query_failed"),
    };

    let rows = student_rows(
        &parse_all(&students),
        &parse_all(&evaluations),
        &parse_all(&entries),
        query.as_deref(),
        today(),
    );
    ok(&req.id, json!({ "rows": rows }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.students" => Some(handle_reports_students(state, req)),
        _ => None,
    }
}
