use crate::client::DataClient;
use crate::config::RemoteSettings;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{client_mut, remote_for};
use crate::ipc::types::{AppState, Request};
use crate::seed;
use crate::store::LocalStore;
use serde_json::json;
use std::path::{Path, PathBuf};

fn handle_health(state: &mut AppState, req: &Request) -> serde_json::Value {
    let cached = match state.client.as_ref().map(|c| c.store().keys()) {
        Some(Ok(keys)) => keys,
        Some(Err(e)) => {
            tracing::warn!("failed to list cache keys: {:#}", e);
            Vec::new()
        }
        None => Vec::new(),
    };
    ok(
        &req.id,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "workspacePath": state.workspace.as_ref().map(|p| p.to_string_lossy().to_string()),
            "offline": state.client.is_some() && state.settings.offline,
            "cacheKeys": cached,
        }),
    )
}

/// Opens (or reopens) the workspace at `path`: store, saved settings plus
/// environment overrides, remote transport, and the seed fixture for any
/// collection not cached yet. Returns the seeded collection names.
pub(crate) fn open_workspace(
    state: &mut AppState,
    path: &Path,
) -> Result<Vec<&'static str>, (&'static str, String)> {
    // Release the previous workspace before opening the next one.
    state.client = None;
    state.workspace = None;

    let mut store = LocalStore::open(path).map_err(|e| ("db_open_failed", format!("{e:#}")))?;
    let mut settings =
        RemoteSettings::load(store.conn()).map_err(|e| ("db_query_failed", format!("{e:#}")))?;
    settings.apply_env();

    if state.events.is_some() {
        state.events = Some(store.subscribe());
    }
    let seeded =
        seed::seed_if_empty(&mut store).map_err(|e| ("db_update_failed", format!("{e:#}")))?;

    tracing::info!(
        "workspace opened: {} (api {}, offline {})",
        path.display(),
        settings.api_base,
        settings.offline
    );
    state.client = Some(DataClient::new(remote_for(&settings), store));
    state.workspace = Some(path.to_path_buf());
    state.settings = settings;
    Ok(seeded)
}

fn handle_workspace_select(state: &mut AppState, req: &Request) -> serde_json::Value {
    let p = req
        .params
        .get("path")
        .and_then(|v| v.as_str())
        .map(PathBuf::from);
    let Some(path) = p else {
        return err(&req.id, "bad_params", "missing params.path", None);
    };

    match open_workspace(state, &path) {
        Ok(seeded) => ok(
            &req.id,
            json!({
                "workspacePath": path.to_string_lossy(),
                "seeded": seeded,
                "remote": state.settings.to_json(),
            }),
        ),
        Err((code, message)) => err(&req.id, code, message, None),
    }
}

fn handle_server_check(state: &mut AppState, req: &Request) -> serde_json::Value {
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    let online = client.check_server();
    ok(
        &req.id,
        json!({ "online": online, "apiBase": state.settings.api_base }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "health" => Some(handle_health(state, req)),
        "workspace.select" => Some(handle_workspace_select(state, req)),
        "server.check" => Some(handle_server_check(state, req)),
        _ => None,
    }
}
