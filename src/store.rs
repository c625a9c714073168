use crate::db;
use anyhow::anyhow;
use rusqlite::Connection;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::sync::mpsc::{channel, Receiver, Sender};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreChange {
    Written,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreEvent {
    pub key: String,
    pub change: StoreChange,
}

/// Key-value cache backing the data client. One instance per open workspace.
///
/// Every write and remove publishes a [`StoreEvent`] to the receivers handed out
/// by [`LocalStore::subscribe`]. Receivers that have been dropped are pruned on
/// the next publish.
pub struct LocalStore {
    conn: Connection,
    subscribers: Vec<Sender<StoreEvent>>,
}

impl LocalStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        Ok(Self::from_connection(db::open_db(workspace)?))
    }

    #[cfg(test)]
    pub fn in_memory() -> anyhow::Result<Self> {
        Ok(Self::from_connection(db::open_in_memory()?))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn,
            subscribers: Vec::new(),
        }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn contains(&self, key: &str) -> anyhow::Result<bool> {
        Ok(db::cache_get_json(&self.conn, key)?.is_some())
    }

    /// `Ok(None)` means the key has never been written (or was removed).
    pub fn read_collection(&self, key: &str) -> anyhow::Result<Option<Vec<Value>>> {
        match db::cache_get_json(&self.conn, key)? {
            None => Ok(None),
            Some(Value::Array(items)) => Ok(Some(items)),
            Some(other) => Err(anyhow!(
                "cache entry {} is not a collection (found {})",
                key,
                json_kind(&other)
            )),
        }
    }

    pub fn write_collection(&mut self, key: &str, items: &[Value]) -> anyhow::Result<()> {
        db::cache_set_json(&self.conn, key, &Value::Array(items.to_vec()))?;
        self.publish(key, StoreChange::Written);
        Ok(())
    }

    pub fn read_object(&self, key: &str) -> anyhow::Result<Option<Value>> {
        db::cache_get_json(&self.conn, key)
    }

    pub fn write_object(&mut self, key: &str, value: &Value) -> anyhow::Result<()> {
        db::cache_set_json(&self.conn, key, value)?;
        self.publish(key, StoreChange::Written);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        if db::cache_delete(&self.conn, key)? {
            self.publish(key, StoreChange::Removed);
        }
        Ok(())
    }

    pub fn keys(&self) -> anyhow::Result<Vec<String>> {
        db::cache_keys(&self.conn)
    }

    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, key: &str, change: StoreChange) {
        let event = StoreEvent {
            key: key.to_string(),
            change,
        };
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
