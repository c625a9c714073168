//! Remote-first data access with a local cache fallback.
//!
//! Every operation makes exactly one remote attempt. On success the cache at
//! the given key is brought in line with the server's answer; on failure the
//! failure is logged and the operation is carried out against the cache
//! alone. Only `get` with nothing cached reports the outage to the caller.

use crate::records::{merge_into, RecordId};
use crate::remote::{Method, Remote, RemoteError};
use crate::store::LocalStore;
use serde_json::{Map, Value};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("server unavailable and nothing cached under {key}")]
    Unavailable {
        key: String,
        #[source]
        source: RemoteError,
    },

    #[error("record has no id")]
    MissingId,

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct DataClient {
    remote: Box<dyn Remote>,
    store: LocalStore,
}

impl DataClient {
    pub fn new(remote: Box<dyn Remote>, store: LocalStore) -> Self {
        Self { remote, store }
    }

    pub fn store(&self) -> &LocalStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut LocalStore {
        &mut self.store
    }

    pub fn set_remote(&mut self, remote: Box<dyn Remote>) {
        self.remote = remote;
    }

    /// Reachability probe; never touches the cache.
    pub fn check_server(&self) -> bool {
        match self.remote.request(Method::Head, "/users", None) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("server check failed: {}", e);
                false
            }
        }
    }

    pub fn get(&mut self, path: &str, key: &str) -> Result<Vec<Value>, ClientError> {
        let failure = match self.remote.request(Method::Get, path, None) {
            Ok(Value::Array(items)) => {
                if let Err(e) = self.store.write_collection(key, &items) {
                    tracing::warn!("failed to refresh cache {}: {:#}", key, e);
                }
                return Ok(items);
            }
            Ok(other) => RemoteError::InvalidBody {
                method: Method::Get,
                path: path.to_string(),
                reason: format!("expected a JSON array, got {}", short_kind(&other)),
            },
            Err(e) => e,
        };

        tracing::warn!("{}; reading cached {}", failure, key);
        match self.store.read_collection(key)? {
            Some(items) => Ok(items),
            None => Err(ClientError::Unavailable {
                key: key.to_string(),
                source: failure,
            }),
        }
    }

    /// Never fails: when the server cannot confirm the record it is stored
    /// locally (with a synthesized id if it had none) and returned as-is.
    pub fn create(&mut self, path: &str, record: Map<String, Value>, key: &str) -> Value {
        let body = Value::Object(record);
        match self.remote.request(Method::Post, path, Some(&body)) {
            Ok(confirmed) if confirmed.is_object() => {
                if let Err(e) = self.prepend_cached(key, confirmed.clone()) {
                    tracing::warn!("failed to cache created record in {}: {:#}", key, e);
                }
                return confirmed;
            }
            Ok(other) => tracing::warn!(
                "POST {} answered with {}; storing locally only",
                path,
                short_kind(&other)
            ),
            Err(e) => tracing::warn!("{}; storing locally only", e),
        }

        let mut record = body;
        let existing = match self.store.read_collection(key) {
            Ok(items) => items.unwrap_or_default(),
            Err(e) => {
                tracing::error!("cannot read {} for offline create: {:#}", key, e);
                return record;
            }
        };
        let now_ms = chrono::Utc::now().timestamp_millis();
        match RecordId::of(&record) {
            None => record["id"] = synthesize_id(&existing, now_ms).to_value(),
            Some(wanted) if existing.iter().any(|item| wanted.matches(item)) => {
                let id = next_free_id(&existing, &wanted, now_ms);
                tracing::warn!("id {} already cached in {}; storing as {}", wanted, key, id);
                record["id"] = id.to_value();
            }
            Some(_) => {}
        }

        let mut items = Vec::with_capacity(existing.len() + 1);
        items.push(record.clone());
        items.extend(existing);
        if let Err(e) = self.store.write_collection(key, &items) {
            tracing::error!("failed to store offline record in {}: {:#}", key, e);
        }
        record
    }

    pub fn update(
        &mut self,
        path: &str,
        record: Map<String, Value>,
        key: &str,
    ) -> Result<Value, ClientError> {
        let id = map_id(&record).ok_or(ClientError::MissingId)?;
        let body = Value::Object(record);
        let url = item_path(path, &id);

        let stored = match self.remote.request(Method::Put, &url, Some(&body)) {
            Ok(result) if result.is_object() => result,
            Ok(other) => {
                tracing::warn!(
                    "PUT {} answered with {}; updating locally only",
                    url,
                    short_kind(&other)
                );
                body
            }
            Err(e) => {
                tracing::warn!("{}; updating locally only", e);
                body
            }
        };

        self.map_cached(key, &id, |item| *item = stored.clone())?;
        Ok(stored)
    }

    /// Returns the server's answer when reachable; otherwise the cached entry
    /// after merging, or the partial itself when nothing was cached for `id`.
    pub fn patch(
        &mut self,
        path: &str,
        partial: Map<String, Value>,
        key: &str,
    ) -> Result<Value, ClientError> {
        let id = map_id(&partial).ok_or(ClientError::MissingId)?;
        let body = Value::Object(partial);
        let url = item_path(path, &id);

        match self.remote.request(Method::Patch, &url, Some(&body)) {
            Ok(Value::Object(result)) => {
                self.map_cached(key, &id, |item| merge_into(item, &result))?;
                return Ok(Value::Object(result));
            }
            Ok(other) => tracing::warn!(
                "PATCH {} answered with {}; patching locally only",
                url,
                short_kind(&other)
            ),
            Err(e) => tracing::warn!("{}; patching locally only", e),
        }

        let Value::Object(partial) = body else {
            return Err(ClientError::MissingId);
        };
        let merged = self.map_cached(key, &id, |item| merge_into(item, &partial))?;
        Ok(merged.unwrap_or(Value::Object(partial)))
    }

    /// Idempotent: the cache drops `id` whatever the server says, and an
    /// absent id is not an error.
    pub fn delete(&mut self, path: &str, id: &RecordId, key: &str) -> Result<RecordId, ClientError> {
        if let Err(e) = self.remote.request(Method::Delete, &item_path(path, id), None) {
            tracing::warn!("{}; removing locally only", e);
        }

        if let Some(mut items) = self.store.read_collection(key)? {
            let before = items.len();
            items.retain(|item| !id.matches(item));
            if items.len() != before {
                self.store.write_collection(key, &items)?;
            }
        }
        Ok(id.clone())
    }

    fn prepend_cached(&mut self, key: &str, record: Value) -> anyhow::Result<()> {
        let existing = self.store.read_collection(key)?.unwrap_or_default();
        let mut items = Vec::with_capacity(existing.len() + 1);
        items.push(record);
        items.extend(existing);
        self.store.write_collection(key, &items)
    }

    /// Applies `f` to the cached entries matching `id` and returns the last
    /// one touched. A missing key or id leaves the cache as it was.
    fn map_cached<F>(&mut self, key: &str, id: &RecordId, mut f: F) -> anyhow::Result<Option<Value>>
    where
        F: FnMut(&mut Value),
    {
        let Some(mut items) = self.store.read_collection(key)? else {
            return Ok(None);
        };
        let mut touched = None;
        for item in items.iter_mut().filter(|item| id.matches(item)) {
            f(item);
            touched = Some(item.clone());
        }
        if touched.is_some() {
            self.store.write_collection(key, &items)?;
        }
        Ok(touched)
    }
}

/// Wall-clock millisecond id for records created while offline. Two creates
/// inside the same millisecond would collide, so the candidate is bumped
/// past any id already present in the target collection.
pub fn synthesize_id(existing: &[Value], now_ms: i64) -> RecordId {
    let mut candidate = now_ms;
    loop {
        let id = RecordId::Text(candidate.to_string());
        if !existing.iter().any(|item| id.matches(item)) {
            return id;
        }
        candidate += 1;
    }
}

/// First id after `taken` that is free in `existing`. Numeric ids stay
/// numeric; text ids fall back to a synthesized one.
fn next_free_id(existing: &[Value], taken: &RecordId, now_ms: i64) -> RecordId {
    let RecordId::Num(n) = taken else {
        return synthesize_id(existing, now_ms);
    };
    let mut candidate = n + 1;
    while existing
        .iter()
        .any(|item| RecordId::Num(candidate).matches(item))
    {
        candidate += 1;
    }
    RecordId::Num(candidate)
}

fn map_id(record: &Map<String, Value>) -> Option<RecordId> {
    record.get("id").and_then(RecordId::from_value)
}

fn item_path(path: &str, id: &RecordId) -> String {
    format!("{}/{}", path.trim_end_matches('/'), id)
}

fn short_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "an empty body",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
        _ => "a scalar",
    }
}
