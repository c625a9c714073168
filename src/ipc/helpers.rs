use crate::client::{ClientError, DataClient};
use crate::config::RemoteSettings;
use crate::ipc::error::err;
use crate::ipc::types::{AppState, Request};
use crate::records::RecordId;
use crate::remote::{build_remote, OfflineRemote, Remote};
use crate::validate::FieldError;
use chrono::{Local, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

pub fn client_mut<'a>(state: &'a mut AppState, req: &Request) -> Result<&'a mut DataClient, Value> {
    state
        .client
        .as_mut()
        .ok_or_else(|| err(&req.id, "no_workspace", "select a workspace first", None))
}

pub fn str_param<'a>(req: &'a Request, key: &str) -> Result<&'a str, Value> {
    match req.params.get(key).and_then(Value::as_str) {
        Some(v) if !v.trim().is_empty() => Ok(v.trim()),
        _ => Err(err(&req.id, "bad_params", format!("missing {}", key), None)),
    }
}

pub fn opt_str_param<'a>(req: &'a Request, key: &str) -> Option<&'a str> {
    req.params
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

pub fn obj_param(req: &Request, key: &str) -> Result<Map<String, Value>, Value> {
    match req.params.get(key) {
        Some(Value::Object(m)) => Ok(m.clone()),
        _ => Err(err(
            &req.id,
            "bad_params",
            format!("{} must be an object", key),
            None,
        )),
    }
}

pub fn id_param(req: &Request) -> Result<RecordId, Value> {
    req.params
        .get("id")
        .and_then(RecordId::from_value)
        .ok_or_else(|| err(&req.id, "bad_params", "missing id", None))
}

pub fn validation_failed(req: &Request, fields: Vec<FieldError>) -> Value {
    err(
        &req.id,
        "validation_failed",
        "validation failed",
        Some(json!({ "fields": fields })),
    )
}

/// `store_code` names the storage failure for the calling operation
/// (`db_query_failed` for reads, `db_update_failed` for writes).
pub fn client_failed(req: &Request, e: ClientError, store_code: &str) -> Value {
    match e {
        ClientError::Unavailable { key, source } => err(
            &req.id,
            "unavailable",
            format!("{}", source),
            Some(json!({ "cacheKey": key })),
        ),
        ClientError::MissingId => err(&req.id, "bad_params", "record has no id", None),
        ClientError::Store(e) => err(&req.id, store_code, format!("{:#}", e), None),
    }
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn today() -> NaiveDate {
    local_now().date()
}

/// Builds the transport for `settings`, degrading to offline mode when the
/// HTTP client cannot be created.
pub fn remote_for(settings: &RemoteSettings) -> Box<dyn Remote> {
    match build_remote(settings) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("{:#}; continuing offline", e);
            Box::new(OfflineRemote)
        }
    }
}
