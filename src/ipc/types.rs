use std::path::PathBuf;
use std::sync::mpsc::Receiver;

use crate::client::DataClient;
use crate::config::RemoteSettings;
use crate::store::StoreEvent;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

#[derive(Default)]
pub struct AppState {
    pub workspace: Option<PathBuf>,
    pub client: Option<DataClient>,
    /// Effective remote settings (saved values plus environment overrides).
    pub settings: RemoteSettings,
    /// Set while the UI is subscribed to cache change events.
    pub events: Option<Receiver<StoreEvent>>,
}

impl AppState {
    /// Pending change events, oldest first. Empty when not subscribed.
    pub fn drain_events(&mut self) -> Vec<StoreEvent> {
        match &self.events {
            Some(rx) => rx.try_iter().collect(),
            None => Vec::new(),
        }
    }
}
