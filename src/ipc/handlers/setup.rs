use crate::config::RemoteSettings;
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::remote_for;
use crate::ipc::types::{AppState, Request};
use serde_json::json;

#[derive(Clone, Copy)]
enum SetupSection {
    Remote,
}

impl SetupSection {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "remote" => Some(Self::Remote),
            _ => None,
        }
    }
}

fn handle_setup_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(client) = state.client.as_ref() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let saved = match RemoteSettings::load(client.store().conn()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };

    ok(
        &req.id,
        json!({
            "remote": saved.to_json(),
            "effective": { "remote": state.settings.to_json() }
        }),
    )
}

fn handle_setup_update(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(client) = state.client.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    let Some(section_raw) = req.params.get("section").and_then(|v| v.as_str()) else {
        return err(&req.id, "bad_params", "missing section", None);
    };
    let Some(SetupSection::Remote) = SetupSection::parse(section_raw) else {
        return err(&req.id, "bad_params", "unknown section", None);
    };
    let Some(patch_obj) = req.params.get("patch").and_then(|v| v.as_object()) else {
        return err(&req.id, "bad_params", "patch must be an object", None);
    };

    let mut saved = match RemoteSettings::load(client.store().conn()) {
        Ok(v) => v,
        Err(e) => return err(&req.id, "db_query_failed", e.to_string(), None),
    };
    if let Err(msg) = saved.apply_patch(patch_obj) {
        return err(&req.id, "bad_params", msg, None);
    }
    if let Err(e) = saved.save(client.store().conn()) {
        return err(&req.id, "db_update_failed", e.to_string(), None);
    }

    // Environment overrides keep winning over whatever was just saved.
    let mut effective = saved;
    effective.apply_env();
    client.set_remote(remote_for(&effective));
    tracing::info!(
        "remote settings updated (api {}, offline {})",
        effective.api_base,
        effective.offline
    );
    let remote = effective.to_json();
    state.settings = effective;
    ok(&req.id, json!({ "ok": true, "effective": { "remote": remote } }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "setup.get" => Some(handle_setup_get(state, req)),
        "setup.update" => Some(handle_setup_update(state, req)),
        _ => None,
    }
}
