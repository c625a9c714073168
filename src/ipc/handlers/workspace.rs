use crate::backup;
use crate::ipc::error::{err, ok};
use crate::ipc::handlers::core::open_workspace;
use crate::ipc::helpers::{client_mut, str_param};
use crate::ipc::types::{AppState, Request};
use crate::seed;
use serde_json::json;
use std::path::PathBuf;

fn handle_export_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let out_path = match str_param(req, "outPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(workspace_path) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    if let Some(client) = state.client.as_ref() {
        let _ = client
            .store()
            .conn()
            .execute_batch("PRAGMA wal_checkpoint(FULL)");
    }

    let out = PathBuf::from(out_path);
    let export = match backup::export_workspace_bundle(&workspace_path, &out) {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "backup_failed",
                format!("{e:#}"),
                Some(json!({ "path": out_path })),
            )
        }
    };
    tracing::info!("exported workspace bundle to {}", out_path);

    ok(
        &req.id,
        json!({
            "path": out_path,
            "bundleFormat": export.bundle_format,
            "entryCount": export.entry_count,
            "dbSha256": export.db_sha256,
        }),
    )
}

fn handle_import_bundle(state: &mut AppState, req: &Request) -> serde_json::Value {
    let in_path = match str_param(req, "inPath") {
        Ok(v) => v,
        Err(e) => return e,
    };
    let Some(workspace_path) = state.workspace.clone() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };

    let src = PathBuf::from(in_path);
    if !src.is_file() {
        return err(
            &req.id,
            "not_found",
            "bundle file not found",
            Some(json!({ "path": in_path })),
        );
    }

    // Drop open handle before replacing file.
    state.client = None;

    let import = backup::import_workspace_bundle(&src, &workspace_path);
    // Reopen whatever is on disk now: the restored copy, or the untouched
    // original when the import was rejected.
    let reopened = open_workspace(state, &workspace_path);

    let import = match import {
        Ok(v) => v,
        Err(e) => {
            return err(
                &req.id,
                "backup_failed",
                format!("{e:#}"),
                Some(json!({ "path": src.to_string_lossy() })),
            )
        }
    };
    if let Err((code, message)) = reopened {
        return err(&req.id, code, message, None);
    }
    tracing::info!(
        "restored workspace from {} ({})",
        in_path,
        import.bundle_format_detected
    );

    ok(
        &req.id,
        json!({
            "workspacePath": workspace_path.to_string_lossy(),
            "bundleFormatDetected": import.bundle_format_detected,
            "verified": import.verified,
        }),
    )
}

fn handle_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    let client = match client_mut(state, req) {
        Ok(c) => c,
        Err(e) => return e,
    };
    match seed::reset(client.store_mut()) {
        Ok(n) => ok(&req.id, json!({ "collections": n })),
        Err(e) => err(&req.id, "db_update_failed", format!("{e:#}"), None),
    }
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "workspace.exportBundle" => Some(handle_export_bundle(state, req)),
        "workspace.importBundle" => Some(handle_import_bundle(state, req)),
        "workspace.reset" => Some(handle_reset(state, req)),
        _ => None,
    }
}
