use crate::ipc::error::{err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

fn handle_events_subscribe(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(client) = state.client.as_mut() else {
        return err(&req.id, "no_workspace", "select a workspace first", None);
    };
    if state.events.is_none() {
        state.events = Some(client.store_mut().subscribe());
    }
    ok(&req.id, json!({ "subscribed": true }))
}

fn handle_events_unsubscribe(state: &mut AppState, req: &Request) -> serde_json::Value {
    // Dropping the receiver lets the store prune its sender on the next write.
    let was = state.events.take().is_some();
    ok(&req.id, json!({ "subscribed": false, "wasSubscribed": was }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "events.subscribe" => Some(handle_events_subscribe(state, req)),
        "events.unsubscribe" => Some(handle_events_unsubscribe(state, req)),
        _ => None,
    }
}
