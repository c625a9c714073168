use crate::db;
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const REMOTE_SECTION_KEY: &str = "setup.remote";
pub const DEFAULT_API_BASE: &str = "http://localhost:3001";

pub const ENV_API_BASE: &str = "ONGD_API_BASE";
pub const ENV_OFFLINE: &str = "ONGD_OFFLINE";
pub const ENV_LOG: &str = "ONGD_LOG";

/// Where the data client sends remote calls. Stored per workspace in the
/// settings table; environment overrides are applied on top when a workspace
/// is selected and are never written back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSettings {
    pub api_base: String,
    pub timeout_ms: u64,
    pub offline: bool,
}

impl Default for RemoteSettings {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout_ms: 5000,
            offline: false,
        }
    }
}

impl RemoteSettings {
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    pub fn apply_patch(&mut self, patch: &Map<String, Value>) -> Result<(), String> {
        // Validate everything before touching self so a bad field leaves no partial update.
        let mut next = self.clone();
        for (k, v) in patch {
            match k.as_str() {
                "apiBase" => {
                    let s = v
                        .as_str()
                        .ok_or_else(|| "apiBase must be string".to_string())?
                        .trim();
                    if !(s.starts_with("http://") || s.starts_with("https://")) {
                        return Err("apiBase must start with http:// or https://".into());
                    }
                    if s.len() > 200 {
                        return Err("apiBase length must be <= 200".into());
                    }
                    next.api_base = s.trim_end_matches('/').to_string();
                }
                "timeoutMs" => {
                    let n = v
                        .as_u64()
                        .ok_or_else(|| "timeoutMs must be integer".to_string())?;
                    if !(100..=60_000).contains(&n) {
                        return Err("timeoutMs must be in 100..=60000".into());
                    }
                    next.timeout_ms = n;
                }
                "offline" => {
                    next.offline = v
                        .as_bool()
                        .ok_or_else(|| "offline must be boolean".to_string())?;
                }
                _ => return Err(format!("unknown remote field: {}", k)),
            }
        }
        *self = next;
        Ok(())
    }

    /// Defaults overlaid with whatever the workspace saved.
    pub fn load(conn: &Connection) -> anyhow::Result<Self> {
        let mut current = Self::default();
        if let Some(saved) = db::settings_get_json(conn, REMOTE_SECTION_KEY)? {
            if let Some(obj) = saved.as_object() {
                if let Err(e) = current.apply_patch(obj) {
                    // A malformed saved section must not keep the workspace from opening.
                    tracing::warn!("ignoring saved remote settings: {}", e);
                }
            }
        }
        Ok(current)
    }

    pub fn save(&self, conn: &Connection) -> anyhow::Result<()> {
        db::settings_set_json(conn, REMOTE_SECTION_KEY, &self.to_json())
    }

    pub fn apply_env(&mut self) {
        self.apply_overrides(|k| std::env::var(k).ok());
    }

    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(base) = lookup(ENV_API_BASE) {
            let base = base.trim();
            if !base.is_empty() {
                self.api_base = base.trim_end_matches('/').to_string();
            }
        }
        if let Some(flag) = lookup(ENV_OFFLINE) {
            self.offline = matches!(flag.trim(), "1" | "true" | "yes");
        }
    }
}
